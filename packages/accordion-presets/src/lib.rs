//! Preset scores for the accordion player
//!
//! Every `.musicxml` file under `scores/` is embedded at build time. The
//! preset name is the file path relative to that directory, without the
//! extension.

include!(concat!(env!("OUT_DIR"), "/presets.rs"));

/// A preset score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub musicxml: &'static str,
}

/// Get all presets, sorted by name
pub fn all_presets() -> Vec<Preset> {
    PRESETS
        .iter()
        .map(|&(name, musicxml)| Preset { name, musicxml })
        .collect()
}

/// Get a preset by name
pub fn get_preset(name: &str) -> Option<Preset> {
    PRESETS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|&(name, musicxml)| Preset { name, musicxml })
}

/// List all preset names
pub fn list_presets() -> Vec<&'static str> {
    PRESETS.iter().map(|(name, _)| *name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use accordion_core::{parse_musicxml, translate_score, Tuning, TranslationMode};

    #[test]
    fn test_presets_are_listed() {
        let names = list_presets();
        assert!(names.contains(&"f-major-scale"));
        assert!(names.contains(&"waltz-etude"));
        assert!(get_preset("missing").is_none());
    }

    #[test]
    fn test_every_preset_parses() {
        for preset in all_presets() {
            let score = parse_musicxml(preset.musicxml)
                .unwrap_or_else(|e| panic!("{} does not parse: {}", preset.name, e));
            assert!(score.measure_count > 0, "{} has no measures", preset.name);
            assert!(score.tempo.is_some(), "{} has no tempo", preset.name);
        }
    }

    #[test]
    fn test_every_preset_plays_on_every_tuning() {
        for preset in all_presets() {
            for tuning in Tuning::ALL {
                let translation = translate_score(preset.musicxml, tuning, TranslationMode::Lenient);
                assert!(!translation.is_empty(), "{} is silent on {}", preset.name, tuning.name());
            }
        }
    }

    #[test]
    fn test_scale_needs_no_substitution() {
        let preset = get_preset("f-major-scale").unwrap();
        for tuning in Tuning::ALL {
            let strict = translate_score(preset.musicxml, tuning, TranslationMode::Strict);
            assert_eq!(strict.events.len(), 8);
            assert_eq!(strict.dropped_notes, 0);
        }
    }
}
