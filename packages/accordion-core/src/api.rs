//! # Public API
//!
//! One-shot conversions for hosts that do not keep an
//! [`Instrument`](crate::instrument::Instrument) around: the CLI and the
//! stateless WASM exports.
//!
//! ## Functions
//! - [`tuning_by_name()`] - Built-in tuning table by name
//! - [`resolve_pitch()`] - Where one pitch is played
//! - [`translate_score()`] - MusicXML to timed button presses
//! - [`normalize_recording()`] - Validate and re-encode recording JSON
//!
//! ## Typical Usage
//!
//! ```rust
//! use accordion_core::{translate_score, Tuning, TranslationMode};
//!
//! let xml = r#"<score-partwise><part id="P1"><measure number="1">
//!   <note><pitch><step>D</step><octave>4</octave></pitch><duration>1</duration></note>
//! </measure></part></score-partwise>"#;
//!
//! let translation = translate_score(xml, Tuning::Fbe, TranslationMode::Strict);
//! assert_eq!(translation.events[0].button_id.as_str(), "B1");
//! ```

use crate::error::AccordionError;
use crate::playback::{translate_musicxml, Translation, TranslationMode};
use crate::recording::Recording;
use crate::resolver::{PitchResolver, Resolution};
use crate::tuning::{Tuning, TuningMap};

/// Look up a built-in tuning by name ("FBE", "gcf", ...).
///
/// # Errors
/// [`AccordionError::UnknownTuning`] for any other name.
pub fn tuning_by_name(name: &str) -> Result<TuningMap, AccordionError> {
    Tuning::from_str(name)
        .map(Tuning::map)
        .ok_or_else(|| AccordionError::UnknownTuning(name.to_string()))
}

/// Find the button and bellows direction for a MIDI pitch.
///
/// # Example
/// ```rust
/// use accordion_core::{resolve_pitch, Direction, Tuning};
///
/// let exact = resolve_pitch(Tuning::Gcf, 55, false).unwrap();
/// assert_eq!((exact.button_id.as_str(), exact.direction), ("B1", Direction::Push));
///
/// assert!(resolve_pitch(Tuning::Gcf, 40, false).is_none());
/// assert!(resolve_pitch(Tuning::Gcf, 40, true).unwrap().substituted);
/// ```
pub fn resolve_pitch(tuning: Tuning, pitch: i32, allow_substitution: bool) -> Option<Resolution> {
    PitchResolver::new(tuning.map()).resolve(pitch, allow_substitution)
}

/// Translate a MusicXML document for a built-in tuning.
///
/// Unreadable documents give an empty translation.
pub fn translate_score(xml: &str, tuning: Tuning, mode: TranslationMode) -> Translation {
    let resolver = PitchResolver::new(tuning.map());
    translate_musicxml(xml, &resolver, mode.allows_substitution())
}

/// Decode recording JSON, sort it by time and encode it again.
///
/// # Errors
/// [`AccordionError::InvalidRecording`] if the input is not a list of
/// recorded events.
pub fn normalize_recording(json: &str) -> Result<String, AccordionError> {
    Recording::from_json(json)?.to_json()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tuning_by_name() {
        assert_eq!(tuning_by_name("gcf").unwrap().name(), "GCF");
        assert!(matches!(
            tuning_by_name("ADG"),
            Err(AccordionError::UnknownTuning(name)) if name == "ADG"
        ));
    }

    #[test]
    fn test_normalize_sorts_events() {
        let json = r#"[{"type":"release","time":1,"id":"B1"},{"type":"press","time":0,"id":"B1"}]"#;
        let normalized = normalize_recording(json).unwrap();
        assert_eq!(
            normalized,
            r#"[{"type":"press","time":0.0,"id":"B1","mode":"push"},{"type":"release","time":1.0,"id":"B1"}]"#
        );
    }

    #[test]
    fn test_normalize_rejects_objects() {
        assert!(matches!(
            normalize_recording(r#"{"events":[]}"#),
            Err(AccordionError::InvalidRecording(_))
        ));
    }

    #[test]
    fn test_translate_unreadable_score() {
        let translation = translate_score("not xml at all", Tuning::Fbe, TranslationMode::Lenient);
        assert!(translation.is_empty());
    }
}
