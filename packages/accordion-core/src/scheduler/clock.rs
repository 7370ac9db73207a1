//! Audio clock access

/// The monotonic clock of the audio output.
pub trait AudioClock {
    /// Current audio time in seconds.
    fn current_time(&self) -> f64;

    /// False while the output is suspended (e.g. before the first user gesture).
    fn is_running(&self) -> bool;
}

/// A clock that only moves when told to.
///
/// Hosts that receive the audio time from outside (the browser bindings, tests)
/// set it before every call into the instrument.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManualClock {
    time: f64,
    running: bool,
}

impl ManualClock {
    /// A running clock at `time`.
    pub fn new(time: f64) -> Self {
        Self {
            time,
            running: true,
        }
    }

    /// A clock whose output has not been resumed yet.
    pub fn suspended() -> Self {
        Self::default()
    }

    /// Move to `time`. The clock never runs backwards.
    pub fn set_time(&mut self, time: f64) {
        if time.is_finite() && time > self.time {
            self.time = time;
        }
    }

    pub fn advance(&mut self, seconds: f64) {
        self.set_time(self.time + seconds);
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }
}

impl AudioClock for ManualClock {
    fn current_time(&self) -> f64 {
        self.time
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_is_monotonic() {
        let mut clock = ManualClock::new(2.0);
        clock.set_time(1.0);
        assert_eq!(clock.current_time(), 2.0);
        clock.advance(0.5);
        assert_eq!(clock.current_time(), 2.5);
        clock.set_time(f64::NAN);
        assert_eq!(clock.current_time(), 2.5);
    }

    #[test]
    fn test_suspended_clock() {
        let mut clock = ManualClock::suspended();
        assert!(!clock.is_running());
        clock.set_running(true);
        assert!(clock.is_running());
    }
}
