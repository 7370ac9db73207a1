//! Score source types
//!
//! The translator only needs a flat, ordered list of notes with quarter-note
//! timing, the declared tempo and the measure count. Anything that can supply
//! those implements [`ScoreSource`]; [`ParsedScore`] is the implementation the
//! MusicXML reader produces.

use serde::Serialize;

/// One note or rest as read from a score.
///
/// Times are in quarter notes from the start of the score.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceNote {
    /// MIDI pitch; `None` for rests and unpitched notes
    pub pitch: Option<i32>,
    pub is_rest: bool,
    pub start_time: f64,
    pub duration: f64,
    /// 1-indexed
    pub measure_number: usize,
}

impl SourceNote {
    pub fn note(pitch: i32, start_time: f64, duration: f64, measure_number: usize) -> Self {
        Self {
            pitch: Some(pitch),
            is_rest: false,
            start_time,
            duration,
            measure_number,
        }
    }

    pub fn rest(start_time: f64, duration: f64, measure_number: usize) -> Self {
        Self {
            pitch: None,
            is_rest: true,
            start_time,
            duration,
            measure_number,
        }
    }
}

/// What the translator reads from a loaded score.
pub trait ScoreSource {
    /// Notes in encounter order.
    fn notes(&self) -> &[SourceNote];

    /// Declared playback tempo in quarter notes per minute.
    fn tempo(&self) -> Option<f64>;

    fn measure_count(&self) -> usize;

    fn title(&self) -> Option<&str> {
        None
    }
}

/// A score read into memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedScore {
    pub title: Option<String>,
    pub tempo: Option<f64>,
    pub measure_count: usize,
    pub notes: Vec<SourceNote>,
}

impl ScoreSource for ParsedScore {
    fn notes(&self) -> &[SourceNote] {
        &self.notes
    }

    fn tempo(&self) -> Option<f64> {
        self.tempo
    }

    fn measure_count(&self) -> usize {
        self.measure_count
    }

    fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }
}
