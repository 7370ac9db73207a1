//! Core of a virtual button accordion.
//!
//! Maps pitches to buttons and bellows directions for a tuning, turns MusicXML
//! scores into timed button presses, and plays scores and recorded
//! performances against an audio clock. Audio output and visuals stay with the
//! host, behind the traits in [`scheduler`].
//!
//! Start with [`instrument::Instrument`] for a complete player, or with the
//! functions in [`api`] for one-off conversions.

pub mod api;
pub mod config;
pub mod error;
pub mod instrument;
pub mod musicxml;
pub mod playback;
pub mod recording;
pub mod resolver;
pub mod scheduler;
pub mod score;
pub mod tuning;

pub use api::*;
pub use error::AccordionError;
pub use instrument::{Instrument, RecordingPlayRequest, ScorePlayRequest, ScoreSummary};
pub use musicxml::parse_musicxml;
pub use playback::{translate, ScoreEvent, Translation, TranslationMode};
pub use recording::{RecordedEvent, Recorder, Recording};
pub use resolver::{PitchResolver, Resolution};
pub use score::{ParsedScore, ScoreSource, SourceNote};
pub use tuning::{ButtonId, Direction, Reeds, Tuning, TuningMap};
