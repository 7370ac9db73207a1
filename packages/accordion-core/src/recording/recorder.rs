//! Live performance capture

use super::{RecordedEvent, Recording};
use crate::tuning::{ButtonId, Direction};

/// Appends live events while a recording is in progress.
///
/// Every method takes the current audio clock time; events are stored relative
/// to the time passed to [`Recorder::start`].
#[derive(Debug, Clone)]
pub struct Recorder {
    started_at: f64,
    events: Vec<RecordedEvent>,
}

impl Recorder {
    pub fn start(now: f64) -> Self {
        log::info!(target: "Recording", "Recording started at {:.3}", now);
        Self {
            started_at: now,
            events: Vec::new(),
        }
    }

    /// Seconds since the recording started, never negative.
    pub fn elapsed(&self, now: f64) -> f64 {
        (now - self.started_at).max(0.0)
    }

    pub fn press(&mut self, now: f64, id: &ButtonId, mode: Direction) {
        let time = self.elapsed(now);
        self.events.push(RecordedEvent::Press {
            time,
            id: id.clone(),
            mode,
        });
    }

    pub fn release(&mut self, now: f64, id: &ButtonId) {
        let time = self.elapsed(now);
        self.events.push(RecordedEvent::Release { time, id: id.clone() });
    }

    pub fn bellows(&mut self, now: f64, mode: Direction) {
        let time = self.elapsed(now);
        self.events.push(RecordedEvent::Bellows { time, mode });
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn finish(self) -> Recording {
        let recording = Recording::from_events(self.events);
        log::info!(target: "Recording",
            "Recording finished ({} events, {:.1}s)", recording.len(), recording.total_duration());
        recording
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_times_are_relative_to_start() {
        let b1 = ButtonId::from("B1");
        let mut recorder = Recorder::start(10.0);
        recorder.press(10.5, &b1, Direction::Pull);
        recorder.bellows(11.0, Direction::Push);
        recorder.release(11.25, &b1);

        let recording = recorder.finish();
        assert_eq!(
            recording.events(),
            &[
                RecordedEvent::Press {
                    time: 0.5,
                    id: b1.clone(),
                    mode: Direction::Pull
                },
                RecordedEvent::Bellows {
                    time: 1.0,
                    mode: Direction::Push
                },
                RecordedEvent::Release { time: 1.25, id: b1 },
            ]
        );
        assert_eq!(recording.total_duration(), 1.25);
    }

    #[test]
    fn test_clock_before_start_clamps_to_zero() {
        let mut recorder = Recorder::start(5.0);
        recorder.bellows(4.0, Direction::Pull);
        assert_eq!(recorder.finish().events()[0].time(), 0.0);
    }

    #[test]
    fn test_empty_recorder() {
        let recorder = Recorder::start(0.0);
        assert!(recorder.is_empty());
        assert!(recorder.finish().is_empty());
    }
}
