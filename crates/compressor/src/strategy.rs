//! Priority strategies driving the windowed engine.
//!
//! Every strategy answers two questions:
//! - what is the priority of a point given its surviving neighbours
//! - what happens to the neighbours' priorities once a point is evicted

use contracts::{CompressorConfig, Sample, StrategyKind};

use crate::geometry::{position_on_three_point, sed, Geometry};
use crate::reference::ReferenceTrajectories;

/// Provisional priority of a trajectory's newest windowed point
pub const NEWEST_PRIORITY: f64 = 1e20;

/// Where the replay error is sampled inside a gap
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplaySampling {
    /// At the reference trajectory's own instants
    ReferenceInstants,
    /// Every `delta_s` seconds after the left neighbour
    Regular { delta_s: f64 },
}

/// Closed set of queue-based priority policies
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriorityStrategy {
    /// SED on insert, removed priority added to the neighbours
    Squish,
    /// SED on insert, neighbours recomputed after every removal
    StTrace { admission_filter: bool },
    /// Replay error gain against ground truth, neighbours recomputed
    StTraceOptimal { sampling: ReplaySampling },
}

/// Neighbour treatment after an eviction
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NeighborUpdate {
    /// Add the removed priority to each neighbour
    Add(f64),
    /// Re-evaluate each neighbour from its new surroundings
    Recompute,
}

/// Collaborators available to an evaluation
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub geometry: &'a dyn Geometry,
    pub reference: Option<&'a ReferenceTrajectories>,
}

impl PriorityStrategy {
    /// Queue-based strategy for a configuration, `None` for dead reckoning
    pub fn from_config(config: &CompressorConfig) -> Option<Self> {
        match config.strategy {
            StrategyKind::Squish => Some(Self::Squish),
            StrategyKind::StTrace => Some(Self::StTrace {
                admission_filter: config.admission_filter,
            }),
            StrategyKind::StTraceOptimal => Some(Self::StTraceOptimal {
                sampling: ReplaySampling::ReferenceInstants,
            }),
            // validated upstream; a missing delta degrades to the adaptive cadence
            StrategyKind::StTraceOptimalRegular => Some(Self::StTraceOptimal {
                sampling: config
                    .eval_delta_s
                    .map(|delta_s| ReplaySampling::Regular { delta_s })
                    .unwrap_or(ReplaySampling::ReferenceInstants),
            }),
            StrategyKind::DeadReckoning => None,
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::Squish => StrategyKind::Squish,
            Self::StTrace { .. } => StrategyKind::StTrace,
            Self::StTraceOptimal {
                sampling: ReplaySampling::ReferenceInstants,
            } => StrategyKind::StTraceOptimal,
            Self::StTraceOptimal {
                sampling: ReplaySampling::Regular { .. },
            } => StrategyKind::StTraceOptimalRegular,
        }
    }

    /// Whether evicted priority is carried over to the neighbours
    #[inline]
    pub fn accumulates(&self) -> bool {
        matches!(self, Self::Squish)
    }

    #[inline]
    pub fn admission_filter(&self) -> bool {
        matches!(
            self,
            Self::StTrace {
                admission_filter: true
            }
        )
    }

    /// Priority of `point` between its surviving neighbours.
    ///
    /// A point without a left or right neighbour anchors its trajectory and
    /// is never evicted. Returns `None` when a replay evaluation finds no
    /// ground truth for the trajectory.
    pub fn evaluate(
        &self,
        ctx: &EvalContext<'_>,
        left: Option<&Sample>,
        point: &Sample,
        right: Option<&Sample>,
    ) -> Option<f64> {
        let (Some(left), Some(right)) = (left, right) else {
            return Some(f64::INFINITY);
        };
        match self {
            Self::Squish | Self::StTrace { .. } => Some(sed(ctx.geometry, left, point, right)),
            Self::StTraceOptimal { sampling } => replay_gain(ctx, *sampling, left, point, right),
        }
    }

    /// Neighbour treatment once a point with `removed_priority` is evicted
    #[inline]
    pub fn on_remove(&self, removed_priority: f64) -> NeighborUpdate {
        match self {
            Self::Squish => NeighborUpdate::Add(removed_priority),
            Self::StTrace { .. } | Self::StTraceOptimal { .. } => NeighborUpdate::Recompute,
        }
    }
}

/// Sampled replay error of the segment `left -> right` minus that of the
/// polyline `left -> point -> right`, both against ground truth.
fn replay_gain(
    ctx: &EvalContext<'_>,
    sampling: ReplaySampling,
    left: &Sample,
    point: &Sample,
    right: &Sample,
) -> Option<f64> {
    let reference = ctx.reference?;
    let id = point.trajectory_id.as_str();
    if !reference.contains(id) {
        return None;
    }

    let geometry = ctx.geometry;
    let gain_at = |timestamp: f64, truth| {
        let simplified = geometry.position_at(left, right, timestamp);
        let kept = position_on_three_point(geometry, left, point, right, timestamp);
        geometry.distance(truth, simplified) - geometry.distance(truth, kept)
    };

    let mut gain = 0.0;
    match sampling {
        ReplaySampling::ReferenceInstants => {
            for instant in reference.instants_between(id, left.timestamp, right.timestamp) {
                gain += gain_at(instant.timestamp, instant.position);
            }
        }
        ReplaySampling::Regular { delta_s } => {
            let end = right.timestamp;
            let mut step = 1.0;
            let mut timestamp = left.timestamp + delta_s;
            // nothing to sample when the first step already reaches the end
            while timestamp < end {
                let truth = reference.position_at(geometry, id, timestamp)?;
                gain += gain_at(timestamp, truth);
                step += 1.0;
                timestamp = left.timestamp + step * delta_s;
            }
        }
    }
    Some(gain)
}
