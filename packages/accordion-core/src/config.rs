//! Player configuration
//!
//! All timing constants of the scheduler and the sound envelope live here so a
//! host can tune them from a YAML file. Every field has a default; an empty
//! document is a valid configuration.
//!
//! ```yaml
//! tuning: GCF
//! sustain-gain: 0.6
//! lookahead: 0.1
//! score-speed: 0.75
//! ```

use crate::error::AccordionError;
use crate::tuning::Tuning;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct PlayerConfig {
    /// Tuning selected at startup
    pub tuning: Tuning,
    /// Gain every sample is started at
    pub sustain_gain: f64,
    /// Fade at the end of a scheduled score note (seconds)
    pub note_fade: f64,
    /// Fade applied to sounding notes when a session is stopped (seconds)
    pub stop_fade: f64,
    /// Fade when a live or recorded button is released (seconds)
    pub release_fade: f64,
    /// How far ahead of their start time sound triggers are handed to the audio output (seconds)
    pub lookahead: f64,
    /// Progress display refresh period (seconds)
    pub progress_interval: f64,
    /// Delay after the segment end before a loop restarts (seconds)
    pub loop_padding: f64,
    /// Delay after the segment end before a finished session stops (seconds)
    pub end_padding: f64,
    /// Shortest segment the scheduler will wait for (seconds)
    pub min_segment: f64,
    /// Delay after a note ends before the score position highlight is hidden (seconds)
    pub position_hide_delay: f64,
    /// Tempo used when a score declares none (quarter notes per minute)
    pub default_tempo: f64,
    pub score_speed: f64,
    pub recording_speed: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            tuning: Tuning::Fbe,
            sustain_gain: 0.6,
            note_fade: 0.05,
            stop_fade: 0.03,
            release_fade: 0.05,
            lookahead: 0.1,
            progress_interval: 1.0 / 60.0,
            loop_padding: 0.0,
            end_padding: 0.1,
            min_segment: 0.01,
            position_hide_delay: 0.05,
            default_tempo: 120.0,
            score_speed: 1.0,
            recording_speed: 1.0,
        }
    }
}

impl PlayerConfig {
    /// Parse and validate a YAML configuration.
    pub fn from_yaml(content: &str) -> Result<Self, AccordionError> {
        let config: PlayerConfig = if content.trim().is_empty() {
            PlayerConfig::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AccordionError> {
        let non_negative = [
            ("note-fade", self.note_fade),
            ("stop-fade", self.stop_fade),
            ("release-fade", self.release_fade),
            ("lookahead", self.lookahead),
            ("loop-padding", self.loop_padding),
            ("end-padding", self.end_padding),
            ("min-segment", self.min_segment),
            ("position-hide-delay", self.position_hide_delay),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(AccordionError::Config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        let positive = [
            ("sustain-gain", self.sustain_gain),
            ("progress-interval", self.progress_interval),
            ("default-tempo", self.default_tempo),
            ("score-speed", self.score_speed),
            ("recording-speed", self.recording_speed),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(AccordionError::Config(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(PlayerConfig::from_yaml("").unwrap(), PlayerConfig::default());
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = PlayerConfig::from_yaml("tuning: GCF\nscore-speed: 0.5\n").unwrap();
        assert_eq!(config.tuning, Tuning::Gcf);
        assert_eq!(config.score_speed, 0.5);
        assert_eq!(config.sustain_gain, 0.6);
    }

    #[test]
    fn test_rejects_unknown_field() {
        let err = PlayerConfig::from_yaml("tempo: 90\n").unwrap_err();
        assert!(matches!(err, AccordionError::Config(_)));
    }

    #[test]
    fn test_rejects_non_positive_speed() {
        let err = PlayerConfig::from_yaml("recording-speed: 0\n").unwrap_err();
        assert!(err.to_string().contains("recording-speed"));
    }

    #[test]
    fn test_rejects_negative_fade() {
        assert!(PlayerConfig::from_yaml("stop-fade: -0.1\n").is_err());
    }
}
