//! Mock trajectories
//!
//! Constant-speed tracks on planar metre coordinates, for tests and demos.

use contracts::{Position, Sample, TrajectoryId, KNOTS_TO_MPS};

/// Mock trajectory generator
///
/// Heading follows the navigational convention: degrees clockwise from
/// north, so 0 moves along +y and 90 along +x.
#[derive(Debug, Clone)]
pub struct MockTrajectory {
    id: TrajectoryId,
    count: usize,
    start: Position,
    start_time: f64,
    interval_s: f64,
    speed_mps: f64,
    heading_deg: f64,
    turn_rate_deg_s: f64,
    report_motion: bool,
}

impl MockTrajectory {
    /// Straight northbound track at 5 m/s, one sample per second
    pub fn straight(id: impl Into<TrajectoryId>, count: usize) -> Self {
        Self {
            id: id.into(),
            count,
            start: Position::default(),
            start_time: 0.0,
            interval_s: 1.0,
            speed_mps: 5.0,
            heading_deg: 0.0,
            turn_rate_deg_s: 0.0,
            report_motion: false,
        }
    }

    /// Constant-rate turn
    pub fn turning(id: impl Into<TrajectoryId>, count: usize, turn_rate_deg_s: f64) -> Self {
        Self::straight(id, count).turn_rate(turn_rate_deg_s)
    }

    pub fn start(mut self, x: f64, y: f64) -> Self {
        self.start = Position::new(x, y);
        self
    }

    pub fn start_time(mut self, start_time: f64) -> Self {
        self.start_time = start_time;
        self
    }

    pub fn interval_s(mut self, interval_s: f64) -> Self {
        self.interval_s = interval_s;
        self
    }

    pub fn speed_mps(mut self, speed_mps: f64) -> Self {
        self.speed_mps = speed_mps;
        self
    }

    pub fn heading(mut self, heading_deg: f64) -> Self {
        self.heading_deg = heading_deg;
        self
    }

    pub fn turn_rate(mut self, turn_rate_deg_s: f64) -> Self {
        self.turn_rate_deg_s = turn_rate_deg_s;
        self
    }

    /// Attach speed (knots) and heading to every sample
    pub fn with_motion(mut self) -> Self {
        self.report_motion = true;
        self
    }

    pub fn generate(&self) -> Vec<Sample> {
        let mut samples = Vec::with_capacity(self.count);
        let mut position = self.start;
        let mut heading = self.heading_deg;

        for i in 0..self.count {
            let timestamp = self.start_time + i as f64 * self.interval_s;
            let mut sample = Sample::new(self.id.clone(), timestamp, position.x, position.y);
            if self.report_motion {
                sample = sample.with_motion(self.speed_mps / KNOTS_TO_MPS, heading.rem_euclid(360.0));
            }
            samples.push(sample);

            let distance = self.speed_mps * self.interval_s;
            let radians = heading.to_radians();
            position.x += distance * radians.sin();
            position.y += distance * radians.cos();
            heading += self.turn_rate_deg_s * self.interval_s;
        }

        samples
    }
}
