//! Sample - Ingestion output
//!
//! One position report ("instant") of one moving object.

use serde::{Deserialize, Serialize};

use crate::TrajectoryId;

/// Knots to metres per second.
pub const KNOTS_TO_MPS: f64 = 1852.0 / 3600.0;

/// 2D position.
///
/// Projected metres for planar geometry, or longitude (`x`) / latitude (`y`)
/// degrees for geodesic geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Reported motion (AIS style).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    /// Speed over ground in knots
    pub speed: f64,
    /// Course over ground in degrees, clockwise from true north
    pub heading: f64,
}

impl Motion {
    /// Speed converted to m/s
    #[inline]
    pub fn speed_mps(&self) -> f64 {
        self.speed * KNOTS_TO_MPS
    }

    /// Heading normalised to [0, 360) and converted to radians
    #[inline]
    pub fn heading_rad(&self) -> f64 {
        self.heading.rem_euclid(360.0).to_radians()
    }
}

/// Immutable position report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Owning trajectory
    pub trajectory_id: TrajectoryId,

    /// Seconds on the shared clock
    pub timestamp: f64,

    /// Reported position
    pub position: Position,

    /// Optional speed/heading pair
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion: Option<Motion>,
}

impl Sample {
    /// Create a sample without motion information
    pub fn new(trajectory_id: impl Into<TrajectoryId>, timestamp: f64, x: f64, y: f64) -> Self {
        Self {
            trajectory_id: trajectory_id.into(),
            timestamp,
            position: Position::new(x, y),
            motion: None,
        }
    }

    /// Attach a speed (knots) / heading (degrees) pair
    pub fn with_motion(mut self, speed: f64, heading: f64) -> Self {
        self.motion = Some(Motion { speed, heading });
        self
    }
}
