//! # Playback Module
//!
//! Translate a loaded score into the button presses that play it on one tuning.
//!
//! ## Purpose
//! The scheduler only understands "press this button in this bellows direction
//! at this time for this long". This module produces that list from a score:
//! 1. **Timing** - quarter-note positions become seconds at 1x speed
//! 2. **Mapping** - every pitch goes through the [`PitchResolver`](crate::PitchResolver)
//! 3. **Ordering** - events are sorted by start time for the scheduler
//!
//! ## Sub-modules
//! - `types` - ScoreEvent, Translation, TranslationMode
//! - `engine` - Translation logic
//!
//! ## Strict and Lenient
//! Every score is translated twice when it is loaded: once with substitution
//! off (only notes the tuning plays exactly) and once with substitution on
//! (unplayable notes moved to the nearest playable pitch). Both results are kept
//! so the player can switch between them without re-reading the score.
//!
//! ## Example
//! ```rust
//! use accordion_core::playback::translate_musicxml;
//! use accordion_core::{PitchResolver, Tuning};
//!
//! let xml = r#"<score-partwise><part id="P1"><measure number="1">
//!   <note><pitch><step>D</step><octave>4</octave></pitch><duration>1</duration></note>
//!   <note><pitch><step>G</step><octave>3</octave></pitch><duration>1</duration></note>
//! </measure></part></score-partwise>"#;
//!
//! let resolver = PitchResolver::new(Tuning::Fbe.map());
//! let strict = translate_musicxml(xml, &resolver, false);
//! let lenient = translate_musicxml(xml, &resolver, true);
//!
//! assert_eq!(strict.events.len(), 1);  // D4 (62) is B1 push; G3 (55) is not on FBE
//! assert_eq!(lenient.events.len(), 2);
//! assert!(lenient.events[1].was_substituted);
//! ```

mod engine;
mod types;


pub use engine::{translate, translate_musicxml, translate_with_default_tempo, DEFAULT_TEMPO};
pub use types::{ScoreEvent, Translation, TranslationMode};
