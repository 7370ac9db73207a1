//! Score translation engine
//!
//! Converts score notes into button/direction events with timing in seconds.

use super::types::{ScoreEvent, Translation};
use crate::musicxml::parse_musicxml;
use crate::resolver::PitchResolver;
use crate::score::ScoreSource;

/// Tempo assumed when a score declares none (quarter notes per minute)
pub const DEFAULT_TEMPO: f64 = 120.0;

/// Translate a score for the resolver's tuning.
///
/// # Timing
/// Score times are in quarter notes. The tempo is read once from the score
/// (falling back to [`DEFAULT_TEMPO`]) and every time is multiplied by
/// `60 / tempo` seconds per quarter note.
///
/// # Dropped Notes
/// Rests and unpitched notes are skipped silently. Pitched notes the resolver
/// cannot place are dropped and counted in `dropped_notes`.
///
/// # Ordering
/// The result is sorted by start time with a stable sort, so simultaneous
/// notes keep the order they appear in the score.
///
/// # Example
/// ```rust
/// use accordion_core::playback::translate;
/// use accordion_core::{ParsedScore, PitchResolver, SourceNote, TuningMap};
///
/// let score = ParsedScore {
///     title: None,
///     tempo: Some(120.0),
///     measure_count: 1,
///     notes: vec![SourceNote::note(60, 0.0, 1.0, 1)],
/// };
/// let resolver = PitchResolver::new(TuningMap::new("T").with_button("B1", Some(60), None));
///
/// let translation = translate(&score, &resolver, false);
/// assert_eq!(translation.events[0].start_time, 0.0);
/// assert_eq!(translation.events[0].duration, 0.5);
/// ```
pub fn translate<S: ScoreSource + ?Sized>(
    score: &S,
    resolver: &PitchResolver,
    allow_substitution: bool,
) -> Translation {
    translate_with_default_tempo(score, resolver, allow_substitution, DEFAULT_TEMPO)
}

/// [`translate`] with a caller-chosen fallback tempo.
pub fn translate_with_default_tempo<S: ScoreSource + ?Sized>(
    score: &S,
    resolver: &PitchResolver,
    allow_substitution: bool,
    default_tempo: f64,
) -> Translation {
    let tempo = score
        .tempo()
        .filter(|bpm| bpm.is_finite() && *bpm > 0.0)
        .unwrap_or(default_tempo);

    if score.measure_count() == 0 {
        log::warn!(target: "Translator", "Score has no measures, nothing to play");
        return Translation::empty(tempo);
    }

    let seconds_per_quarter = 60.0 / tempo;
    let mut events = Vec::new();
    let mut total_duration: f64 = 0.0;
    let mut dropped_notes = 0;

    for note in score.notes() {
        if note.is_rest {
            continue;
        }
        let Some(pitch) = note.pitch else {
            continue;
        };
        if note.duration <= 0.0 || note.start_time < 0.0 {
            log::debug!(target: "Translator",
                "Skipping note {} with invalid timing (start {}, duration {})",
                pitch, note.start_time, note.duration);
            continue;
        }

        let resolution = match resolver.try_resolve(pitch, allow_substitution) {
            Ok(resolution) => resolution,
            Err(e) => {
                log::debug!(target: "Translator", "Dropping note in measure {}: {}", note.measure_number, e);
                dropped_notes += 1;
                continue;
            }
        };

        let start_time = note.start_time * seconds_per_quarter;
        let duration = note.duration * seconds_per_quarter;
        total_duration = total_duration.max(start_time + duration);

        events.push(ScoreEvent {
            start_time,
            duration,
            button_id: resolution.button_id,
            direction: resolution.direction,
            resolved_pitch: resolution.resolved_pitch,
            original_pitch: resolution.original_pitch,
            was_substituted: resolution.substituted,
            measure_number: note.measure_number.max(1),
        });
    }

    events.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    log::info!(target: "Translator",
        "Translated {} notes for {} ({}), {} dropped, {:.2}s at 1x",
        events.len(),
        resolver.tuning().name(),
        if allow_substitution { "with substitutions" } else { "strict mapping" },
        dropped_notes,
        total_duration);

    Translation {
        events,
        total_duration,
        measure_count: score.measure_count(),
        tempo,
        dropped_notes,
    }
}

/// Read a MusicXML document and translate it.
///
/// An unreadable document is logged and yields an empty translation, which
/// callers treat as "nothing to play".
pub fn translate_musicxml(xml: &str, resolver: &PitchResolver, allow_substitution: bool) -> Translation {
    match parse_musicxml(xml) {
        Ok(score) => translate(&score, resolver, allow_substitution),
        Err(e) => {
            log::warn!(target: "Translator", "{}", e);
            Translation::empty(DEFAULT_TEMPO)
        }
    }
}
