//! Dead reckoning: predictive, queue-free simplification.
//!
//! A sample is committed only when it diverges from the position
//! extrapolated from the trajectory's last committed point by more than
//! half the configured threshold. Samples that follow the prediction are
//! held; a later divergence commits the held point ahead of the new one.

use std::collections::{BTreeMap, HashMap};

use contracts::{CompressionStats, DeadReckoningConfig, Sample, TrajectoryId};
use tracing::{instrument, trace};

use crate::geometry::{extrapolate, Geometry};

/// What happened to a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reckoning {
    /// First sample of its trajectory
    Anchored,
    /// Diverged from the prediction and was committed
    Committed,
    /// Followed the prediction, held as the newest point
    Held,
}

#[derive(Debug, Default)]
struct ReckoningState {
    committed: Vec<Sample>,
    held: Option<Sample>,
}

/// Per-trajectory dead-reckoning filter
#[derive(Debug)]
pub struct DeadReckoner {
    /// Divergence that triggers a commit (half the configured threshold)
    trigger_m: f64,
    trajectories: HashMap<TrajectoryId, ReckoningState>,
}

impl DeadReckoner {
    pub fn new(config: &DeadReckoningConfig) -> Self {
        Self {
            trigger_m: config.threshold_m / 2.0,
            trajectories: HashMap::new(),
        }
    }

    /// Effective divergence trigger in metres
    #[inline]
    pub fn trigger_m(&self) -> f64 {
        self.trigger_m
    }

    /// Distance between `sample` and the position predicted for its timestamp
    pub fn divergence(&self, geometry: &dyn Geometry, sample: &Sample) -> Option<f64> {
        let state = self.trajectories.get(&sample.trajectory_id)?;
        divergence(geometry, &state.committed, sample)
    }

    #[instrument(
        level = "trace",
        name = "dead_reckoning_push",
        skip(self, geometry, sample, stats),
        fields(trajectory_id = %sample.trajectory_id, timestamp = sample.timestamp)
    )]
    pub fn push(
        &mut self,
        geometry: &dyn Geometry,
        sample: Sample,
        stats: &mut CompressionStats,
    ) -> Reckoning {
        let state = self
            .trajectories
            .entry(sample.trajectory_id.clone())
            .or_default();

        let Some(divergence) = divergence(geometry, &state.committed, &sample) else {
            state.committed.push(sample);
            metrics::counter!("bwc_points_committed_total").increment(1);
            return Reckoning::Anchored;
        };

        if divergence > self.trigger_m {
            trace!(divergence, trigger = self.trigger_m, "prediction broken");
            let mut committed = 1;
            if let Some(held) = state.held.take() {
                stats.delays_s.push(sample.timestamp - held.timestamp);
                state.committed.push(held);
                committed += 1;
            }
            stats.delays_s.push(0.0);
            state.committed.push(sample);
            metrics::counter!("bwc_points_committed_total").increment(committed);
            Reckoning::Committed
        } else {
            // a superseded held point is dropped
            if state.held.replace(sample).is_some() {
                stats.evictions += 1;
                metrics::counter!("bwc_evictions_total", "strategy" => "dead_reckoning")
                    .increment(1);
            }
            Reckoning::Held
        }
    }

    pub fn committed(&self, id: &str) -> &[Sample] {
        self.trajectories
            .get(id)
            .map(|state| state.committed.as_slice())
            .unwrap_or_default()
    }

    pub fn held(&self, id: &str) -> Option<&Sample> {
        self.trajectories.get(id).and_then(|state| state.held.as_ref())
    }

    /// Append every held point and assemble the trajectories
    pub fn finish(
        self,
        time: f64,
        stats: &mut CompressionStats,
    ) -> BTreeMap<TrajectoryId, Vec<Sample>> {
        self.trajectories
            .into_iter()
            .map(|(id, mut state)| {
                if let Some(held) = state.held.take() {
                    stats.delays_s.push(time - held.timestamp);
                    metrics::counter!("bwc_points_committed_total").increment(1);
                    state.committed.push(held);
                }
                (id, state.committed)
            })
            .collect()
    }
}

/// Divergence from the constant-velocity prediction, `None` without history
fn divergence(geometry: &dyn Geometry, committed: &[Sample], sample: &Sample) -> Option<f64> {
    let (anchor, previous) = match committed {
        [] => return None,
        [anchor] => (anchor, None),
        [.., previous, anchor] => (anchor, Some(previous)),
    };
    let expected = extrapolate(geometry, anchor, previous, sample.timestamp);
    Some(geometry.distance(expected, sample.position))
}
