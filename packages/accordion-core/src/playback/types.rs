//! Translation result types
//!
//! This module defines the playable events a score turns into for one tuning.

use crate::tuning::{ButtonId, Direction};
use serde::{Deserialize, Serialize};

/// Which of the two translations of a loaded score to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationMode {
    /// Only pitches the tuning can play directly
    #[default]
    Strict,
    /// Unplayable pitches replaced by the nearest playable one
    Lenient,
}

impl TranslationMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(TranslationMode::Strict),
            "lenient" | "substitute" => Some(TranslationMode::Lenient),
            _ => None,
        }
    }

    pub fn allows_substitution(self) -> bool {
        matches!(self, TranslationMode::Lenient)
    }
}

/// A single playable note of a translated score
///
/// # Fields
/// - `start_time`: Seconds from the start of the score at 1x speed
/// - `duration`: Seconds at 1x speed, always positive
/// - `button_id` / `direction`: Where the note is played
/// - `resolved_pitch`: The pitch that actually sounds
/// - `original_pitch`: The pitch written in the score
/// - `was_substituted`: `resolved_pitch` differs because the written pitch is unplayable
/// - `measure_number`: 1-indexed measure the note belongs to
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEvent {
    pub start_time: f64,
    pub duration: f64,
    pub button_id: ButtonId,
    pub direction: Direction,
    pub resolved_pitch: i32,
    pub original_pitch: i32,
    pub was_substituted: bool,
    pub measure_number: usize,
}

impl ScoreEvent {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// A score translated for one tuning
///
/// # Fields
/// - `events`: Playable notes sorted by start time (ties keep score order)
/// - `total_duration`: Latest note end in seconds at 1x speed
/// - `measure_count`: Measures in the score, including ones without playable notes
/// - `tempo`: Quarter notes per minute used for the conversion
/// - `dropped_notes`: Pitched notes that could not be placed on the tuning
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub events: Vec<ScoreEvent>,
    pub total_duration: f64,
    pub measure_count: usize,
    pub tempo: f64,
    pub dropped_notes: usize,
}

impl Translation {
    /// Nothing to play.
    pub fn empty(tempo: f64) -> Self {
        Self {
            events: Vec::new(),
            total_duration: 0.0,
            measure_count: 0,
            tempo,
            dropped_notes: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn substituted_count(&self) -> usize {
        self.events.iter().filter(|e| e.was_substituted).count()
    }

    /// Events whose measure lies in `first..=last`.
    pub fn events_in_measures(&self, first: usize, last: usize) -> impl Iterator<Item = &ScoreEvent> {
        self.events
            .iter()
            .filter(move |e| e.measure_number >= first && e.measure_number <= last)
    }

    /// Start of the earliest event in a measure after `measure`.
    pub fn first_start_after_measure(&self, measure: usize) -> Option<f64> {
        self.events
            .iter()
            .filter(|e| e.measure_number > measure)
            .map(|e| e.start_time)
            .reduce(f64::min)
    }
}
