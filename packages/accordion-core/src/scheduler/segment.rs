//! Segment selection
//!
//! Decides which events a session plays and where its timeline starts and
//! ends, for scores (by measure) and recordings (by time).

use crate::error::AccordionError;
use crate::playback::{ScoreEvent, Translation};
use crate::recording::{RecordedEvent, Recording};
use serde::{Deserialize, Serialize};

/// Inclusive, 1-indexed measure range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureRange {
    pub first: usize,
    pub last: usize,
}

impl MeasureRange {
    pub fn new(first: usize, last: usize) -> Self {
        Self { first, last }
    }

    /// Valid when `1 <= first <= last <= measure_count`.
    pub fn fits(&self, measure_count: usize) -> bool {
        self.first >= 1 && self.first <= self.last && self.last <= measure_count
    }
}

/// Time window in seconds at 1x speed
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
}

impl Segment {
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// Events and window of a score session
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSelection {
    pub events: Vec<ScoreEvent>,
    pub segment: Segment,
    pub measures: MeasureRange,
    /// The window ends at a measure boundary rather than at the end of the piece
    pub bounded: bool,
}

/// Events and window of a recording session
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSelection {
    pub events: Vec<RecordedEvent>,
    pub segment: Segment,
}

/// Select the part of a translated score to play.
///
/// `active` is the translation being played; `reference` is the lenient
/// translation of the same score, which holds every note that has a place on
/// the instrument and is used to find where the window ends.
///
/// # Window
/// Without a measure range and without looping the whole piece plays, from 0
/// to the end of the last note. Otherwise the window starts at the first note
/// in range and ends:
/// 1. at the start of the first note after the range
/// 2. at the end of the piece if there is none
/// 3. at the end of the last note in range if that still leaves nothing
///
/// A range outside the score is replaced by the whole score.
pub fn select_score_segment(
    active: &Translation,
    reference: &Translation,
    measures: Option<MeasureRange>,
    looping: bool,
) -> Result<ScoreSelection, AccordionError> {
    let measure_count = active.measure_count.max(reference.measure_count);
    if measure_count == 0 {
        return Err(AccordionError::EmptySegment("this score".to_string()));
    }

    let whole = MeasureRange::new(1, measure_count);
    let explicit = measures.filter(|range| range.fits(measure_count));
    if let (Some(range), None) = (measures, explicit) {
        log::warn!(target: "Scheduler",
            "Measures {}-{} are outside 1-{}, playing the whole piece",
            range.first, range.last, measure_count);
    }
    let range = explicit.unwrap_or(whole);

    let events: Vec<ScoreEvent> = active.events_in_measures(range.first, range.last).cloned().collect();
    let Some(first) = events.first() else {
        return Err(AccordionError::EmptySegment(format!(
            "measures {}-{}",
            range.first, range.last
        )));
    };

    let bounded = looping || explicit.is_some();
    let segment = if bounded {
        let start = first.start_time;
        let mut end = reference
            .first_start_after_measure(range.last)
            .unwrap_or(reference.total_duration)
            .max(start);
        if end <= start {
            end = events.iter().map(ScoreEvent::end_time).fold(start, f64::max);
        }
        Segment { start, end }
    } else {
        Segment {
            start: 0.0,
            end: active.total_duration,
        }
    };

    log::debug!(target: "Scheduler",
        "Score segment {:.3}s - {:.3}s, measures {}-{}, {} notes",
        segment.start, segment.end, range.first, range.last, events.len());

    Ok(ScoreSelection {
        events,
        segment,
        measures: range,
        bounded,
    })
}

/// Select the part of a recording to play.
///
/// A start outside `[0, total)` becomes 0; an end outside `(start, total]`
/// becomes the total duration. Events exactly on either bound are included.
pub fn select_recording_segment(
    recording: &Recording,
    start: Option<f64>,
    end: Option<f64>,
) -> Result<RecordingSelection, AccordionError> {
    let total = recording.total_duration();

    let start = start
        .filter(|s| s.is_finite() && *s >= 0.0 && *s < total)
        .unwrap_or(0.0);
    let end = end
        .filter(|e| e.is_finite() && *e > start && *e <= total)
        .unwrap_or(total);

    let events: Vec<RecordedEvent> = recording.events_between(start, end).cloned().collect();
    if events.is_empty() {
        return Err(AccordionError::EmptySegment(format!(
            "time range {:.1}s - {:.1}s",
            start, end
        )));
    }

    Ok(RecordingSelection {
        events,
        segment: Segment { start, end },
    })
}
