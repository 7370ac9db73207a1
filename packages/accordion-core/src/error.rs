//! # Error Types
//!
//! This module defines all error types for the accordion core.
//!
//! Every message is written so it can be shown directly as the instrument's
//! status line: session preconditions are reported to the player and leave the
//! scheduler untouched.
//!
//! ## Error Types
//! - `AudioNotReady` - The audio output has not been resumed yet (retry after a user gesture)
//! - `NoScoreLoaded` / `NoRecordingLoaded` - Nothing to play
//! - `EmptySegment` - The requested range contains no events
//! - `MalformedScore` - The MusicXML reader could not make sense of the input
//! - `InvalidRecording` - Recording JSON does not have the expected shape
//! - `PitchUnresolvable` - A single note cannot be played (counted, never fatal)
//!
//! ## Usage
//! ```rust
//! use accordion_core::{AccordionError, Recording};
//!
//! match Recording::from_json("{\"not\": \"an array\"}") {
//!     Ok(recording) => println!("{} events", recording.events().len()),
//!     Err(AccordionError::InvalidRecording(message)) => eprintln!("Bad file: {}", message),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AccordionError {
    /// The audio output is suspended or was never created.
    ///
    /// Browsers only allow audio to start after a user gesture, so this is
    /// recoverable: resume the output and try again.
    ///
    /// # Example
    /// ```
    /// # use accordion_core::AccordionError;
    /// let err = AccordionError::AudioNotReady;
    /// assert_eq!(err.to_string(), "Audio not ready. Click Play again.");
    /// ```
    #[error("Audio not ready. Click Play again.")]
    AudioNotReady,

    #[error("No score loaded.")]
    NoScoreLoaded,

    #[error("No recording available.")]
    NoRecordingLoaded,

    /// A pitch that neither a direct mapping nor substitution could place.
    #[error("Pitch {pitch} cannot be played on the {tuning} tuning")]
    PitchUnresolvable { pitch: i32, tuning: String },

    /// The requested segment contains no playable events.
    ///
    /// # Example
    /// ```
    /// # use accordion_core::AccordionError;
    /// let err = AccordionError::EmptySegment("measures 3-5".to_string());
    /// assert_eq!(err.to_string(), "No notes in measures 3-5.");
    /// ```
    #[error("No notes in {0}.")]
    EmptySegment(String),

    #[error("Could not parse score: {0}")]
    MalformedScore(String),

    #[error("Invalid recording data: {0}")]
    InvalidRecording(String),

    #[error("Invalid playback speed {0}")]
    InvalidSpeed(f64),

    #[error("Unknown tuning: {0}")]
    UnknownTuning(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Stop playback before recording.")]
    PlaybackActive,

    #[error("Cannot start playback while recording.")]
    RecordingBusy,
}

impl From<serde_yaml::Error> for AccordionError {
    fn from(e: serde_yaml::Error) -> Self {
        AccordionError::Config(e.to_string())
    }
}

impl From<serde_json::Error> for AccordionError {
    fn from(e: serde_json::Error) -> Self {
        AccordionError::InvalidRecording(e.to_string())
    }
}

impl From<quick_xml::Error> for AccordionError {
    fn from(e: quick_xml::Error) -> Self {
        AccordionError::MalformedScore(e.to_string())
    }
}
