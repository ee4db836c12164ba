//! Fixed-length window clock.

/// Tracks the end of the currently open window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowClock {
    length: f64,
    end: Option<f64>,
}

impl WindowClock {
    pub fn new(length: f64) -> Self {
        Self { length, end: None }
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.length
    }

    /// End of the open window, `None` before the first sample
    #[inline]
    pub fn end(&self) -> Option<f64> {
        self.end
    }

    /// Observe a sample timestamp.
    ///
    /// The first timestamp opens the first window at `t + length`. Returns
    /// true when `t` lies past the open window, in which case the window
    /// must be closed; the end then moves forward by whole window lengths
    /// until `end >= t`.
    pub fn advance(&mut self, t: f64) -> bool {
        let Some(end) = self.end else {
            self.end = Some(t + self.length);
            return false;
        };
        if t <= end {
            return false;
        }

        let windows = ((t - end) / self.length).ceil().max(1.0);
        let mut next = end + windows * self.length;
        // rounding in the division can land one window short
        if next < t {
            next += self.length;
        }
        self.end = Some(next);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_opens_window() {
        let mut clock = WindowClock::new(10.0);
        assert_eq!(clock.end(), None);
        assert!(!clock.advance(5.0));
        assert_eq!(clock.end(), Some(15.0));
    }

    #[test]
    fn test_boundary_sample_stays_in_window() {
        let mut clock = WindowClock::new(10.0);
        clock.advance(0.0);
        assert!(!clock.advance(10.0));
        assert_eq!(clock.end(), Some(10.0));
    }

    #[test]
    fn test_advance_one_window() {
        let mut clock = WindowClock::new(10.0);
        clock.advance(0.0);
        assert!(clock.advance(10.5));
        assert_eq!(clock.end(), Some(20.0));
    }

    #[test]
    fn test_advance_skips_empty_windows() {
        let mut clock = WindowClock::new(10.0);
        clock.advance(0.0);
        assert!(clock.advance(45.0));
        assert_eq!(clock.end(), Some(50.0));

        // exactly on a later boundary
        assert!(clock.advance(70.0));
        assert_eq!(clock.end(), Some(70.0));
    }
}
