//! Pipeline statistics and metrics.

use std::collections::BTreeMap;
use std::time::Duration;

use compressor::evaluate::ReplayError;
use contracts::{DelaySummary, TrajectoryId};
use observability::CompressionMetricsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Samples read from the input
    pub samples_read: usize,

    /// Distinct trajectories in the input
    pub trajectories: usize,

    /// Total duration of the run
    pub duration: Duration,

    /// Commit delay distribution
    pub delays: Option<DelaySummary>,

    /// Replay error per trajectory (only with `--evaluate`)
    pub replay: BTreeMap<TrajectoryId, ReplayError>,

    /// Compression metrics aggregator
    pub metrics: CompressionMetricsAggregator,
}

impl PipelineStats {
    /// Samples processed per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.samples_read as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary to stderr
    pub fn print_summary(&self) {
        eprintln!("\n=== Run Statistics ===\n");
        eprintln!("Overview");
        eprintln!("   ├─ Duration: {:.3}s", self.duration.as_secs_f64());
        eprintln!("   ├─ Samples read: {}", self.samples_read);
        eprintln!("   ├─ Trajectories: {}", self.trajectories);
        eprintln!("   └─ Throughput: {:.0} samples/s", self.throughput());

        eprintln!("\n{}", self.metrics.summary());

        if let Some(delays) = &self.delays {
            eprintln!("Commit delay");
            eprintln!("   ├─ mean: {:.2}s", delays.mean_s);
            eprintln!("   ├─ p50: {:.2}s", delays.p50_s);
            eprintln!("   ├─ p95: {:.2}s", delays.p95_s);
            eprintln!("   └─ max: {:.2}s", delays.max_s);
        }

        if !self.replay.is_empty() {
            eprintln!("\nReplay error (m)");
            for (id, error) in &self.replay {
                eprintln!(
                    "   ├─ {}: mean {:.2}, max {:.2} over {} instants",
                    id, error.mean_m, error.max_m, error.count
                );
            }
        }

        eprintln!();
    }
}
