//! Scheduler session types

use super::segment::{MeasureRange, RecordingSelection, ScoreSelection, Segment};
use crate::playback::ScoreEvent;
use crate::recording::RecordedEvent;
use crate::tuning::{ButtonId, Direction};
use serde::Serialize;
use std::fmt;

/// The two kinds of playback session. At most one of each exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Score,
    Recording,
}

impl SessionKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "score" | "music" => Some(SessionKind::Score),
            "recording" => Some(SessionKind::Recording),
            _ => None,
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKind::Score => write!(f, "score"),
            SessionKind::Recording => write!(f, "recording"),
        }
    }
}

/// Lifecycle of a session
///
/// `Scheduled` covers the time between `start` and the first action firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Idle,
    Scheduled,
    Running,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The player pressed stop
    Requested,
    /// The segment played to the end without looping
    Finished,
    /// The segment ended and is starting over
    Looped,
    /// Another session is starting
    Superseded,
    /// The speed factor changed and the session restarts
    SpeedChange,
    /// The player touched a button
    ManualInput,
}

impl StopReason {
    /// Whether the stop leaves the instrument silent, as opposed to handing
    /// over to a new session.
    pub fn is_final(self) -> bool {
        !matches!(self, StopReason::Looped | StopReason::Superseded)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::Requested => "requested",
            StopReason::Finished => "finished",
            StopReason::Looped => "loop restart",
            StopReason::Superseded => "superseded",
            StopReason::SpeedChange => "speed change",
            StopReason::ManualInput => "manual input",
        };
        f.write_str(text)
    }
}

/// Key of a sound a session started
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NoteKey {
    /// Score note by index in the session's events
    Event(usize),
    /// Recorded press, one per button
    Button(ButtonId),
}

/// What a session plays
#[derive(Debug, Clone, PartialEq)]
pub enum PlanEvents {
    Score {
        events: Vec<ScoreEvent>,
        measures: MeasureRange,
        bounded: bool,
    },
    Recording {
        events: Vec<RecordedEvent>,
        /// Bellows direction when the session starts
        bellows: Direction,
    },
}

/// Everything needed to start (and restart) a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPlan {
    pub events: PlanEvents,
    pub segment: Segment,
    pub speed: f64,
    pub looping: bool,
}

impl SessionPlan {
    pub fn score(selection: ScoreSelection, speed: f64, looping: bool) -> Self {
        Self {
            events: PlanEvents::Score {
                events: selection.events,
                measures: selection.measures,
                bounded: selection.bounded,
            },
            segment: selection.segment,
            speed,
            looping,
        }
    }

    pub fn recording(selection: RecordingSelection, bellows: Direction, speed: f64, looping: bool) -> Self {
        Self {
            events: PlanEvents::Recording {
                events: selection.events,
                bellows,
            },
            segment: selection.segment,
            speed,
            looping,
        }
    }

    pub fn kind(&self) -> SessionKind {
        match self.events {
            PlanEvents::Score { .. } => SessionKind::Score,
            PlanEvents::Recording { .. } => SessionKind::Recording,
        }
    }

    pub fn len(&self) -> usize {
        match &self.events {
            PlanEvents::Score { events, .. } => events.len(),
            PlanEvents::Recording { events, .. } => events.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Segment length in audio seconds at the plan's speed
    pub fn scaled_duration(&self) -> f64 {
        self.segment.duration() / self.speed
    }

    /// Status line shown while the session plays
    pub fn status(&self) -> String {
        match &self.events {
            PlanEvents::Score { measures, bounded, .. } => {
                if self.looping || *bounded {
                    let verb = if self.looping { "Looping" } else { "Playing" };
                    format!("{} Music {}-{}...", verb, measures.first, measures.last)
                } else {
                    "Playing Music...".to_string()
                }
            }
            PlanEvents::Recording { .. } => format!(
                "{} Recording ({:.1}s-{:.1}s)...",
                if self.looping { "Looping" } else { "Playing" },
                self.segment.start,
                self.segment.end
            ),
        }
    }
}
