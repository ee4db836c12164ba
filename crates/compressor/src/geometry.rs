//! Geometry and error primitives.
//!
//! - segment interpolation at a timestamp
//! - synchronized Euclidean distance (SED)
//! - constant-velocity extrapolation (reported motion or estimated from two points)

use std::fmt;

use contracts::{DistanceMetric, Position, Sample};
use nalgebra::Vector2;

/// Mean earth radius in metres (IUGG)
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Pluggable distance / interpolation model.
///
/// Every quantity handed back is in metres, whatever the coordinate system.
pub trait Geometry: fmt::Debug + Send + Sync {
    /// Distance in metres
    fn distance(&self, a: Position, b: Position) -> f64;

    /// Displacement from `from` to `to` as (east, north) metres
    fn offset(&self, from: Position, to: Position) -> Vector2<f64>;

    /// Move `origin` by an (east, north) metre vector
    fn displace(&self, origin: Position, by: Vector2<f64>) -> Position;

    /// Position at `timestamp` along the two-point segment `from -> to`.
    ///
    /// Linear in coordinates. The ratio is clamped to [0, 1]; a zero-length
    /// segment in time yields `from`.
    fn position_at(&self, from: &Sample, to: &Sample, timestamp: f64) -> Position {
        let span = to.timestamp - from.timestamp;
        if span <= 0.0 {
            return from.position;
        }
        let ratio = ((timestamp - from.timestamp) / span).clamp(0.0, 1.0);
        Position::new(
            from.position.x + ratio * (to.position.x - from.position.x),
            from.position.y + ratio * (to.position.y - from.position.y),
        )
    }
}

/// Euclidean geometry on projected metre coordinates
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanarGeometry;

impl Geometry for PlanarGeometry {
    #[inline]
    fn distance(&self, a: Position, b: Position) -> f64 {
        (b.x - a.x).hypot(b.y - a.y)
    }

    #[inline]
    fn offset(&self, from: Position, to: Position) -> Vector2<f64> {
        Vector2::new(to.x - from.x, to.y - from.y)
    }

    #[inline]
    fn displace(&self, origin: Position, by: Vector2<f64>) -> Position {
        Position::new(origin.x + by.x, origin.y + by.y)
    }
}

/// Great-circle geometry on longitude (`x`) / latitude (`y`) degrees.
///
/// Offsets and displacements use a local tangent plane at the origin, which
/// is accurate for the few kilometres separating consecutive reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct HaversineGeometry;

impl Geometry for HaversineGeometry {
    fn distance(&self, a: Position, b: Position) -> f64 {
        let (lat1, lat2) = (a.y.to_radians(), b.y.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (b.x - a.x).to_radians();

        let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
    }

    fn offset(&self, from: Position, to: Position) -> Vector2<f64> {
        let mean_lat = ((from.y + to.y) / 2.0).to_radians();
        Vector2::new(
            (to.x - from.x).to_radians() * EARTH_RADIUS_M * mean_lat.cos(),
            (to.y - from.y).to_radians() * EARTH_RADIUS_M,
        )
    }

    fn displace(&self, origin: Position, by: Vector2<f64>) -> Position {
        let lat = origin.y.to_radians();
        // at the poles east/west displacement is undefined
        let cos_lat = lat.cos().max(1e-12);
        Position::new(
            origin.x + (by.x / (EARTH_RADIUS_M * cos_lat)).to_degrees(),
            origin.y + (by.y / EARTH_RADIUS_M).to_degrees(),
        )
    }
}

/// Build the geometry matching a configured metric
pub fn for_metric(metric: DistanceMetric) -> Box<dyn Geometry> {
    match metric {
        DistanceMetric::Planar => Box::new(PlanarGeometry),
        DistanceMetric::Haversine => Box::new(HaversineGeometry),
    }
}

/// Synchronized Euclidean distance of `point` to the segment `left -> right`.
///
/// A point identical (same time, same position) to one of its neighbours is
/// redundant and scores 0.
pub fn sed(geometry: &dyn Geometry, left: &Sample, point: &Sample, right: &Sample) -> f64 {
    if is_duplicate(point, left) || is_duplicate(point, right) {
        return 0.0;
    }
    let synchronized = geometry.position_at(left, right, point.timestamp);
    geometry.distance(point.position, synchronized)
}

/// Position at `timestamp` along the polyline `left -> point -> right`
pub fn position_on_three_point(
    geometry: &dyn Geometry,
    left: &Sample,
    point: &Sample,
    right: &Sample,
    timestamp: f64,
) -> Position {
    if timestamp <= point.timestamp {
        geometry.position_at(left, point, timestamp)
    } else {
        geometry.position_at(point, right, timestamp)
    }
}

/// Constant-velocity position expected at `timestamp`, starting from `anchor`.
///
/// Uses the anchor's reported speed/heading when present, otherwise the
/// velocity between `previous` and `anchor`, otherwise no motion at all.
pub fn extrapolate(
    geometry: &dyn Geometry,
    anchor: &Sample,
    previous: Option<&Sample>,
    timestamp: f64,
) -> Position {
    let dt = timestamp - anchor.timestamp;
    let velocity = match (anchor.motion, previous) {
        (Some(motion), _) => reported_velocity(motion.speed_mps(), motion.heading_rad()),
        (None, Some(previous)) => estimated_velocity(geometry, previous, anchor),
        (None, None) => Vector2::zeros(),
    };
    geometry.displace(anchor.position, velocity * dt)
}

/// (east, north) m/s from speed and heading clockwise from north
#[inline]
fn reported_velocity(speed_mps: f64, heading_rad: f64) -> Vector2<f64> {
    Vector2::new(speed_mps * heading_rad.sin(), speed_mps * heading_rad.cos())
}

fn estimated_velocity(geometry: &dyn Geometry, previous: &Sample, anchor: &Sample) -> Vector2<f64> {
    let dt = anchor.timestamp - previous.timestamp;
    if dt <= 0.0 {
        return Vector2::zeros();
    }
    geometry.offset(previous.position, anchor.position) / dt
}

#[inline]
fn is_duplicate(a: &Sample, b: &Sample) -> bool {
    a.timestamp == b.timestamp && a.position == b.position
}
