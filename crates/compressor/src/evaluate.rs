//! Replay error of a compressed trajectory against its original instants.

use contracts::{Position, Sample};
use serde::{Deserialize, Serialize};

use crate::geometry::Geometry;

/// Synchronized distance statistics, metres
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayError {
    pub count: usize,
    pub mean_m: f64,
    pub max_m: f64,
}

/// Distance of every original instant to the compressed polyline at the
/// same timestamp. Both inputs must be time ordered.
pub fn replay_error(geometry: &dyn Geometry, original: &[Sample], compressed: &[Sample]) -> ReplayError {
    if original.is_empty() || compressed.is_empty() {
        return ReplayError::default();
    }

    let mut total = 0.0;
    let mut max: f64 = 0.0;
    for instant in original {
        let replayed = polyline_position(geometry, compressed, instant.timestamp);
        let distance = geometry.distance(instant.position, replayed);
        total += distance;
        max = max.max(distance);
    }

    ReplayError {
        count: original.len(),
        mean_m: total / original.len() as f64,
        max_m: max,
    }
}

fn polyline_position(geometry: &dyn Geometry, polyline: &[Sample], timestamp: f64) -> Position {
    let upper = polyline.partition_point(|s| s.timestamp <= timestamp);
    match upper {
        0 => polyline[0].position,
        n if n == polyline.len() => polyline[n - 1].position,
        n => geometry.position_at(&polyline[n - 1], &polyline[n], timestamp),
    }
}
