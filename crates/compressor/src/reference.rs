//! Ground-truth trajectories for the replay-error strategies.

use std::collections::HashMap;

use contracts::{Position, Sample, TrajectoryId};

use crate::geometry::Geometry;

/// Full, unsimplified trajectories keyed by id, each sorted by timestamp
#[derive(Debug, Clone, Default)]
pub struct ReferenceTrajectories {
    trajectories: HashMap<TrajectoryId, Vec<Sample>>,
}

impl ReferenceTrajectories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group a sample stream by trajectory
    pub fn from_samples<'a>(samples: impl IntoIterator<Item = &'a Sample>) -> Self {
        let mut reference = Self::new();
        for sample in samples {
            reference
                .trajectories
                .entry(sample.trajectory_id.clone())
                .or_default()
                .push(sample.clone());
        }
        for samples in reference.trajectories.values_mut() {
            samples.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        }
        reference
    }

    /// Register (or replace) one trajectory
    pub fn insert(&mut self, id: impl Into<TrajectoryId>, mut samples: Vec<Sample>) {
        samples.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        self.trajectories.insert(id.into(), samples);
    }

    pub fn get(&self, id: &str) -> Option<&[Sample]> {
        self.trajectories.get(id).map(Vec::as_slice)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.trajectories.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    /// Ground-truth position at `timestamp`, clamped to the trajectory's ends
    pub fn position_at(&self, geometry: &dyn Geometry, id: &str, timestamp: f64) -> Option<Position> {
        let samples = self.get(id)?;
        let first = samples.first()?;
        let last = samples.last()?;
        if timestamp <= first.timestamp {
            return Some(first.position);
        }
        if timestamp >= last.timestamp {
            return Some(last.position);
        }

        // first index with t > timestamp; 1..len by the checks above
        let upper = samples.partition_point(|s| s.timestamp <= timestamp);
        Some(geometry.position_at(&samples[upper - 1], &samples[upper], timestamp))
    }

    /// Samples with `start < t < end`
    pub fn instants_between(&self, id: &str, start: f64, end: f64) -> &[Sample] {
        let Some(samples) = self.get(id) else {
            return &[];
        };
        let lo = samples.partition_point(|s| s.timestamp <= start);
        let hi = samples.partition_point(|s| s.timestamp < end);
        if lo >= hi {
            &[]
        } else {
            &samples[lo..hi]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PlanarGeometry;

    fn reference() -> ReferenceTrajectories {
        let samples = vec![
            Sample::new("a", 10.0, 10.0, 0.0),
            Sample::new("a", 0.0, 0.0, 0.0),
            Sample::new("b", 0.0, 5.0, 5.0),
            Sample::new("a", 20.0, 10.0, 10.0),
        ];
        ReferenceTrajectories::from_samples(&samples)
    }

    #[test]
    fn test_from_samples_sorts_and_groups() {
        let reference = reference();
        assert_eq!(reference.len(), 2);
        let a: Vec<f64> = reference.get("a").unwrap().iter().map(|s| s.timestamp).collect();
        assert_eq!(a, vec![0.0, 10.0, 20.0]);
    }

    #[test]
    fn test_position_at_interpolates() {
        let reference = reference();
        let p = reference.position_at(&PlanarGeometry, "a", 15.0).unwrap();
        assert_eq!(p, Position::new(10.0, 5.0));

        let p = reference.position_at(&PlanarGeometry, "a", 10.0).unwrap();
        assert_eq!(p, Position::new(10.0, 0.0));
    }

    #[test]
    fn test_position_at_clamps() {
        let reference = reference();
        assert_eq!(
            reference.position_at(&PlanarGeometry, "a", -5.0),
            Some(Position::new(0.0, 0.0))
        );
        assert_eq!(
            reference.position_at(&PlanarGeometry, "a", 99.0),
            Some(Position::new(10.0, 10.0))
        );
        assert_eq!(reference.position_at(&PlanarGeometry, "missing", 0.0), None);
    }

    #[test]
    fn test_instants_between_is_exclusive() {
        let reference = reference();
        let inside = reference.instants_between("a", 0.0, 20.0);
        assert_eq!(inside.len(), 1);
        assert_eq!(inside[0].timestamp, 10.0);

        assert!(reference.instants_between("a", 10.0, 10.0).is_empty());
        assert!(reference.instants_between("missing", 0.0, 100.0).is_empty());
    }
}
