//! # Recording Module
//!
//! Capture and replay of a live performance.
//!
//! A recording is a flat list of timed events: button presses (with the bellows
//! direction at the time of the press), button releases and bellows changes.
//! Times are seconds since the recording started.
//!
//! ## JSON Format
//! Recordings are exchanged with the recording store as a JSON array:
//!
//! ```json
//! [
//!   { "type": "press", "time": 0.0, "id": "B3", "mode": "push" },
//!   { "type": "bellows", "time": 0.8, "mode": "pull" },
//!   { "type": "release", "time": 1.2, "id": "B3" }
//! ]
//! ```
//!
//! A press without `mode` is read as a push. Decoded events are sorted by time
//! (stable, so simultaneous events keep their file order).
//!
//! ## Example
//! ```rust
//! use accordion_core::recording::{RecordedEvent, Recording};
//! use accordion_core::Direction;
//!
//! let json = r#"[
//!     {"type": "release", "time": 1.5, "id": "B1"},
//!     {"type": "press", "time": 0.25, "id": "B1"}
//! ]"#;
//!
//! let recording = Recording::from_json(json).unwrap();
//! assert_eq!(recording.total_duration(), 1.5);
//! assert!(matches!(
//!     &recording.events()[0],
//!     RecordedEvent::Press { mode: Direction::Push, .. }
//! ));
//! ```

mod recorder;

pub use recorder::Recorder;

use crate::error::AccordionError;
use crate::tuning::{ButtonId, Direction};
use serde::{Deserialize, Serialize};

/// One captured performance event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RecordedEvent {
    Press {
        time: f64,
        id: ButtonId,
        #[serde(default)]
        mode: Direction,
    },
    Release {
        time: f64,
        id: ButtonId,
    },
    Bellows {
        time: f64,
        mode: Direction,
    },
}

impl RecordedEvent {
    pub fn time(&self) -> f64 {
        match self {
            RecordedEvent::Press { time, .. }
            | RecordedEvent::Release { time, .. }
            | RecordedEvent::Bellows { time, .. } => *time,
        }
    }

    /// Button the event concerns, if any
    pub fn button(&self) -> Option<&ButtonId> {
        match self {
            RecordedEvent::Press { id, .. } | RecordedEvent::Release { id, .. } => Some(id),
            RecordedEvent::Bellows { .. } => None,
        }
    }
}

/// A finished recording
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recording {
    events: Vec<RecordedEvent>,
    total_duration: f64,
}

impl Recording {
    /// Build a recording, sorting the events by time.
    pub fn from_events(mut events: Vec<RecordedEvent>) -> Self {
        events.sort_by(|a, b| a.time().total_cmp(&b.time()));
        let total_duration = events.iter().map(RecordedEvent::time).fold(0.0, f64::max);
        Self {
            events,
            total_duration,
        }
    }

    /// Decode the JSON exchange format.
    pub fn from_json(json: &str) -> Result<Self, AccordionError> {
        let events: Vec<RecordedEvent> = serde_json::from_str(json)?;

        for (index, event) in events.iter().enumerate() {
            let time = event.time();
            if !time.is_finite() || time < 0.0 {
                return Err(AccordionError::InvalidRecording(format!(
                    "event {} has invalid time {}",
                    index, time
                )));
            }
            if let Some(id) = event.button() {
                if id.as_str().is_empty() {
                    return Err(AccordionError::InvalidRecording(format!(
                        "event {} has an empty button id",
                        index
                    )));
                }
            }
        }

        let recording = Self::from_events(events);
        log::debug!(target: "Recording",
            "Decoded {} events ({:.2}s)", recording.len(), recording.total_duration);
        Ok(recording)
    }

    /// Encode to the JSON exchange format.
    pub fn to_json(&self) -> Result<String, AccordionError> {
        Ok(serde_json::to_string(&self.events)?)
    }

    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    /// Time of the latest event (0 when empty)
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events with `start <= time <= end`, in order.
    pub fn events_between(&self, start: f64, end: f64) -> impl Iterator<Item = &RecordedEvent> {
        self.events
            .iter()
            .filter(move |e| e.time() >= start && e.time() <= end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn press(time: f64, id: &str, mode: Direction) -> RecordedEvent {
        RecordedEvent::Press {
            time,
            id: ButtonId::from(id),
            mode,
        }
    }

    #[test]
    fn test_decode_all_event_kinds() {
        let json = r#"[
            {"type": "press", "time": 0.0, "id": "B3", "mode": "pull"},
            {"type": "bellows", "time": 0.5, "mode": "push"},
            {"type": "release", "time": 1.0, "id": "B3"}
        ]"#;
        let recording = Recording::from_json(json).unwrap();

        assert_eq!(
            recording.events(),
            &[
                press(0.0, "B3", Direction::Pull),
                RecordedEvent::Bellows {
                    time: 0.5,
                    mode: Direction::Push
                },
                RecordedEvent::Release {
                    time: 1.0,
                    id: ButtonId::from("B3")
                },
            ]
        );
        assert_eq!(recording.total_duration(), 1.0);
    }

    #[test]
    fn test_press_without_mode_is_push() {
        let recording = Recording::from_json(r#"[{"type":"press","time":0.1,"id":"B1"}]"#).unwrap();
        assert_eq!(recording.events()[0], press(0.1, "B1", Direction::Push));
    }

    #[test]
    fn test_sort_is_stable() {
        let json = r#"[
            {"type": "press", "time": 1.0, "id": "B2"},
            {"type": "press", "time": 0.0, "id": "B1"},
            {"type": "release", "time": 1.0, "id": "B1"}
        ]"#;
        let recording = Recording::from_json(json).unwrap();
        let ids: Vec<&str> = recording
            .events()
            .iter()
            .filter_map(|e| e.button().map(ButtonId::as_str))
            .collect();
        assert_eq!(ids, vec!["B1", "B2", "B1"]);
    }

    #[test]
    fn test_rejects_non_array() {
        let err = Recording::from_json(r#"{"type": "press"}"#).unwrap_err();
        assert!(matches!(err, AccordionError::InvalidRecording(_)));
    }

    #[test]
    fn test_rejects_unknown_type_and_missing_fields() {
        assert!(Recording::from_json(r#"[{"type":"tap","time":0}]"#).is_err());
        assert!(Recording::from_json(r#"[{"type":"release","time":0}]"#).is_err());
        assert!(Recording::from_json(r#"[{"type":"bellows","time":0}]"#).is_err());
        assert!(Recording::from_json(r#"[{"type":"press","time":0,"id":"B1","mode":"squeeze"}]"#).is_err());
    }

    #[test]
    fn test_rejects_negative_time_and_empty_id() {
        assert!(Recording::from_json(r#"[{"type":"release","time":-1,"id":"B1"}]"#).is_err());
        assert!(Recording::from_json(r#"[{"type":"release","time":1,"id":""}]"#).is_err());
    }

    #[test]
    fn test_empty_recording() {
        let recording = Recording::from_json("[]").unwrap();
        assert!(recording.is_empty());
        assert_eq!(recording.total_duration(), 0.0);
        assert_eq!(recording.to_json().unwrap(), "[]");
    }

    #[test]
    fn test_json_round_trip() {
        let original = Recording::from_events(vec![
            press(0.0, "B7", Direction::Pull),
            RecordedEvent::Bellows {
                time: 0.75,
                mode: Direction::Push,
            },
            RecordedEvent::Release {
                time: 1.125,
                id: ButtonId::from("B7"),
            },
        ]);
        let decoded = Recording::from_json(&original.to_json().unwrap()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_encoded_shape() {
        let recording = Recording::from_events(vec![RecordedEvent::Release {
            time: 2.0,
            id: ButtonId::from("B2"),
        }]);
        assert_eq!(
            recording.to_json().unwrap(),
            r#"[{"type":"release","time":2.0,"id":"B2"}]"#
        );
    }

    #[test]
    fn test_events_between_is_inclusive() {
        let recording = Recording::from_events(vec![
            press(0.0, "B1", Direction::Push),
            press(1.0, "B2", Direction::Push),
            press(2.0, "B3", Direction::Push),
        ]);
        assert_eq!(recording.events_between(1.0, 2.0).count(), 2);
    }
}
