//! # Scheduler Module
//!
//! Plays translated scores and recordings against the audio clock.
//!
//! ## Model
//! Playback is cooperative and single-threaded. Starting a session computes
//! the audio time of every action it will ever need (sound starts, button
//! highlights, cursor moves, progress updates, the end of the segment) from one
//! origin, and puts them on a queue. The host calls [`Scheduler::pump`] from
//! its event loop; each call performs the actions that are due.
//!
//! Sound starts are handed to the [`SoundTrigger`] `lookahead` seconds early,
//! carrying their exact start time, so a late pump never shifts the audio. Only
//! the visual updates follow the pump.
//!
//! ## Sessions
//! There is one session slot per [`SessionKind`]. Starting a session stops both
//! slots first; stopping cancels every queued action of the session, fades out
//! whatever it is playing and clears its highlights. A looping session restarts
//! itself as a fresh session when its segment ends.
//!
//! ## Sub-modules
//! - `clock` - AudioClock, ManualClock
//! - `timer` - TaskQueue, CancelToken
//! - `host` - Sound and visual collaborators, CommandBuffer
//! - `segment` - Which events a session plays
//! - `types` - SessionPlan, SessionKind, SessionState, StopReason
//! - `engine` - The Scheduler
//!
//! ## Example
//! ```rust
//! use accordion_core::config::PlayerConfig;
//! use accordion_core::scheduler::{
//!     select_recording_segment, CommandBuffer, Host, ManualClock, Scheduler, SessionKind, SessionPlan,
//! };
//! use accordion_core::{Direction, Recording};
//!
//! let recording = Recording::from_json(
//!     r#"[{"type":"press","time":0,"id":"B1"},{"type":"release","time":1,"id":"B1"}]"#,
//! ).unwrap();
//! let selection = select_recording_segment(&recording, None, None).unwrap();
//!
//! let mut clock = ManualClock::new(5.0);
//! let mut output = CommandBuffer::new();
//! let mut scheduler = Scheduler::new(&PlayerConfig::default());
//!
//! let plan = SessionPlan::recording(selection, Direction::Push, 1.0, false);
//! scheduler.start(&mut Host::new(&clock, &mut output), plan).unwrap();
//!
//! scheduler.pump(&mut Host::new(&clock, &mut output));
//! assert_eq!(output.sounding(5.5).len(), 1);
//!
//! clock.set_time(6.0);
//! scheduler.pump(&mut Host::new(&clock, &mut output));
//! assert!(output.sounding(6.5).is_empty());
//!
//! clock.set_time(7.5);
//! scheduler.pump(&mut Host::new(&clock, &mut output));
//! assert!(!scheduler.is_active(SessionKind::Recording));
//! ```

mod clock;
mod engine;
mod host;
mod segment;
mod timer;
mod types;

#[cfg(test)]
mod tests;

pub use clock::{AudioClock, ManualClock};
pub use engine::Scheduler;
pub use host::{
    CommandBuffer, Host, HostCommand, HostOutput, NoteRelease, PlayRequest, SoundHandle, SoundTrigger, StopMode,
    VisualFeedback,
};
pub use segment::{
    select_recording_segment, select_score_segment, MeasureRange, RecordingSelection, ScoreSelection, Segment,
};
pub use timer::{CancelToken, TaskQueue};
pub use types::{NoteKey, PlanEvents, SessionKind, SessionPlan, SessionState, StopReason};
