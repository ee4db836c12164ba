//! CompressionOutput - Compressor output
//!
//! Finalized trajectories plus diagnostics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Sample, TrajectoryId};

/// Non-fatal data-quality defect kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQualityKind {
    /// Timestamp not strictly greater than the previous one of the same trajectory
    NonIncreasingTimestamp,
    /// Trajectory with no retained point at finalize
    EmptyTrajectory,
    /// Optimal-replay evaluation found no ground truth for this trajectory
    MissingReference,
    /// NaN or infinite timestamp; the sample is dropped
    NonFiniteTimestamp,
}

impl DataQualityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NonIncreasingTimestamp => "non_increasing_timestamp",
            Self::EmptyTrajectory => "empty_trajectory",
            Self::MissingReference => "missing_reference",
            Self::NonFiniteTimestamp => "non_finite_timestamp",
        }
    }
}

/// Reported (never fatal) data-quality defect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityIssue {
    pub trajectory_id: TrajectoryId,
    pub kind: DataQualityKind,
    /// Timestamp of the offending sample, when there is one
    pub timestamp: Option<f64>,
}

/// Engine counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompressionStats {
    /// Samples pushed into the engine
    pub samples_in: u64,

    /// Samples discarded by the admission filter
    pub samples_rejected: u64,

    /// Points popped from the eviction structure
    pub evictions: u64,

    /// Window closes, including the final one
    pub windows_closed: u64,

    /// Highest eviction structure size observed after a push returned
    pub max_queue_depth: usize,

    /// Retained point count per trajectory
    pub retained_per_trajectory: BTreeMap<TrajectoryId, usize>,

    /// Commit delay (seconds between arrival and commitment) of every retained point
    pub delays_s: Vec<f64>,
}

impl CompressionStats {
    /// Total retained points
    pub fn retained_total(&self) -> usize {
        self.retained_per_trajectory.values().sum()
    }

    /// Retained / received
    pub fn compression_ratio(&self) -> f64 {
        if self.samples_in == 0 {
            return 1.0;
        }
        self.retained_total() as f64 / self.samples_in as f64
    }

    /// Summary of the commit delay distribution
    pub fn delay_summary(&self) -> Option<DelaySummary> {
        if self.delays_s.is_empty() {
            return None;
        }
        let mut sorted = self.delays_s.clone();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let percentile = |p: f64| {
            let rank = ((p / 100.0) * (count - 1) as f64).round() as usize;
            sorted[rank.min(count - 1)]
        };

        Some(DelaySummary {
            count,
            mean_s: mean,
            p50_s: percentile(50.0),
            p95_s: percentile(95.0),
            max_s: sorted[count - 1],
        })
    }
}

/// Commit delay distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelaySummary {
    pub count: usize,
    pub mean_s: f64,
    pub p50_s: f64,
    pub p95_s: f64,
    pub max_s: f64,
}

/// Finalized result of one compression pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompressionOutput {
    /// Retained samples per trajectory, strictly time ordered
    pub trajectories: BTreeMap<TrajectoryId, Vec<Sample>>,

    /// Data-quality defects found along the way
    pub issues: Vec<DataQualityIssue>,

    /// Engine counters
    pub stats: CompressionStats,
}

impl CompressionOutput {
    /// Retained samples of one trajectory
    pub fn trajectory(&self, id: &str) -> Option<&[Sample]> {
        self.trajectories.get(id).map(Vec::as_slice)
    }
}
