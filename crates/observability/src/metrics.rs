//! Compression metrics
//!
//! Run-level metrics derived from a finished `CompressionOutput`, plus an
//! in-memory aggregator for printable summaries.

use std::collections::BTreeMap;

use contracts::{CompressionOutput, DataQualityKind};
use metrics::{counter, gauge, histogram};

/// Record run-level metrics from a finished compression
///
/// The engine records its streaming counters itself; this adds the
/// per-trajectory and ratio views that only exist once the run is over.
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_compression_output;
///
/// let output = compressor.finish();
/// record_compression_output(&output, "st_trace");
/// ```
pub fn record_compression_output(output: &CompressionOutput, strategy: &str) {
    let stats = &output.stats;

    counter!("bwc_runs_total", "strategy" => strategy.to_string()).increment(1);
    gauge!("bwc_compression_ratio", "strategy" => strategy.to_string())
        .set(stats.compression_ratio());
    gauge!("bwc_retained_points", "strategy" => strategy.to_string())
        .set(stats.retained_total() as f64);
    gauge!("bwc_max_queue_depth").set(stats.max_queue_depth as f64);

    for retained in stats.retained_per_trajectory.values() {
        histogram!("bwc_retained_per_trajectory").record(*retained as f64);
    }
}

/// Record one replay error measurement (metres)
pub fn record_replay_error(mean_m: f64, max_m: f64) {
    histogram!("bwc_replay_error_mean_m").record(mean_m);
    histogram!("bwc_replay_error_max_m").record(max_m);
}

/// Compression metrics aggregator
///
/// Aggregates one or more finished runs in memory.
#[derive(Debug, Clone, Default)]
pub struct CompressionMetricsAggregator {
    /// Finished runs
    pub runs: u64,

    /// Samples received
    pub samples_in: u64,

    /// Samples retained
    pub retained: u64,

    /// Points evicted
    pub evictions: u64,

    /// Samples rejected by the admission filter
    pub rejected: u64,

    /// Windows closed
    pub windows_closed: u64,

    /// Commit delay (seconds)
    pub delay_stats: RunningStats,

    /// Retained points per trajectory
    pub retained_stats: RunningStats,

    /// Replay error per trajectory (metres)
    pub replay_error_stats: RunningStats,

    /// Data-quality issues by kind
    pub issue_counts: BTreeMap<&'static str, u64>,
}

impl CompressionMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one finished run
    pub fn update(&mut self, output: &CompressionOutput) {
        let stats = &output.stats;
        self.runs += 1;
        self.samples_in += stats.samples_in;
        self.retained += stats.retained_total() as u64;
        self.evictions += stats.evictions;
        self.rejected += stats.samples_rejected;
        self.windows_closed += stats.windows_closed;

        for delay in &stats.delays_s {
            self.delay_stats.push(*delay);
        }
        for retained in stats.retained_per_trajectory.values() {
            self.retained_stats.push(*retained as f64);
        }
        for issue in &output.issues {
            *self.issue_counts.entry(issue.kind.as_str()).or_insert(0) += 1;
        }
    }

    /// Fold in one trajectory's mean replay error
    pub fn record_replay_error(&mut self, mean_m: f64) {
        self.replay_error_stats.push(mean_m);
    }

    /// Count of one issue kind
    pub fn issues(&self, kind: DataQualityKind) -> u64 {
        self.issue_counts.get(kind.as_str()).copied().unwrap_or(0)
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            runs: self.runs,
            samples_in: self.samples_in,
            retained: self.retained,
            evictions: self.evictions,
            rejected: self.rejected,
            windows_closed: self.windows_closed,
            compression_ratio: if self.samples_in > 0 {
                self.retained as f64 / self.samples_in as f64
            } else {
                1.0
            },
            commit_delay_s: StatsSummary::from(&self.delay_stats),
            retained_per_trajectory: StatsSummary::from(&self.retained_stats),
            replay_error_m: StatsSummary::from(&self.replay_error_stats),
            issue_counts: self.issue_counts.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub runs: u64,
    pub samples_in: u64,
    pub retained: u64,
    pub evictions: u64,
    pub rejected: u64,
    pub windows_closed: u64,
    pub compression_ratio: f64,
    pub commit_delay_s: StatsSummary,
    pub retained_per_trajectory: StatsSummary,
    pub replay_error_m: StatsSummary,
    pub issue_counts: BTreeMap<&'static str, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Compression Summary ===")?;
        writeln!(f, "Samples in: {}", self.samples_in)?;
        writeln!(
            f,
            "Retained: {} ({:.2}%)",
            self.retained,
            self.compression_ratio * 100.0
        )?;
        writeln!(f, "Evictions: {}", self.evictions)?;
        writeln!(f, "Rejected by admission filter: {}", self.rejected)?;
        writeln!(f, "Windows closed: {}", self.windows_closed)?;
        writeln!(f, "Commit delay (s): {}", self.commit_delay_s)?;
        writeln!(f, "Retained per trajectory: {}", self.retained_per_trajectory)?;
        writeln!(f, "Replay error (m): {}", self.replay_error_m)?;

        if !self.issue_counts.is_empty() {
            writeln!(f, "Data-quality issues:")?;
            for (kind, count) in &self.issue_counts {
                writeln!(f, "  {}: {}", kind, count)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{CompressionStats, DataQualityIssue};

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    fn output() -> CompressionOutput {
        let mut stats = CompressionStats {
            samples_in: 20,
            evictions: 12,
            samples_rejected: 3,
            windows_closed: 2,
            delays_s: vec![1.0, 3.0],
            ..Default::default()
        };
        stats.retained_per_trajectory.insert("a".into(), 3);
        stats.retained_per_trajectory.insert("b".into(), 2);

        CompressionOutput {
            issues: vec![DataQualityIssue {
                trajectory_id: "a".into(),
                kind: DataQualityKind::NonIncreasingTimestamp,
                timestamp: Some(4.0),
            }],
            stats,
            ..Default::default()
        }
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = CompressionMetricsAggregator::new();
        aggregator.update(&output());

        assert_eq!(aggregator.runs, 1);
        assert_eq!(aggregator.samples_in, 20);
        assert_eq!(aggregator.retained, 5);
        assert_eq!(aggregator.rejected, 3);
        assert_eq!(aggregator.issues(DataQualityKind::NonIncreasingTimestamp), 1);
        assert_eq!(aggregator.issues(DataQualityKind::EmptyTrajectory), 0);
        assert!((aggregator.delay_stats.mean() - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = CompressionMetricsAggregator::new();
        aggregator.update(&output());
        aggregator.record_replay_error(1.5);

        let text = format!("{}", aggregator.summary());
        assert!(text.contains("Samples in: 20"));
        assert!(text.contains("25.00%"));
        assert!(text.contains("non_increasing_timestamp: 1"));
    }
}
