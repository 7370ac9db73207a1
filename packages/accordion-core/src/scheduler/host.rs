//! Host collaborators
//!
//! The core never touches audio or the screen itself. It calls a
//! [`SoundTrigger`] to start and stop samples and a [`VisualFeedback`] to
//! update button highlights, the progress display and the score cursor.
//! [`CommandBuffer`] implements both by recording [`HostCommand`]s, which the
//! browser bindings forward as JSON and the tests inspect directly.

use super::clock::AudioClock;
use crate::tuning::{ButtonId, Direction};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Identifies one started sample instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SoundHandle(pub u64);

/// Envelope end of a scheduled note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteRelease {
    /// Audio time at which the note is silent
    pub end_at: f64,
    /// Length of the linear fade ending at `end_at`
    pub fade: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayRequest {
    /// Precise audio time the sample starts
    pub start_at: f64,
    pub gain: f64,
    /// `None` sustains until [`SoundTrigger::stop`]
    pub release: Option<NoteRelease>,
    /// Loop the sample body for as long as the button is held
    pub sustain_loop: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopMode {
    Immediate,
    /// Linear fade to silence over the given seconds, then stop
    Fade(f64),
}

/// Starts and stops button samples.
pub trait SoundTrigger {
    /// Start the sample of `button` in `direction`. `None` when there is no
    /// sample for that reed.
    fn play(&mut self, button: &ButtonId, direction: Direction, request: PlayRequest) -> Option<SoundHandle>;

    /// Stop a sample starting at audio time `at`. Stopping a handle that
    /// already ended is harmless.
    fn stop(&mut self, handle: SoundHandle, mode: StopMode, at: f64);
}

/// Fire-and-forget display updates.
pub trait VisualFeedback {
    fn show_pressed(&mut self, button: &ButtonId, direction: Direction, substituted: bool);
    fn show_released(&mut self, button: &ButtonId);
    fn show_progress(&mut self, elapsed: f64, total: f64);
    /// Move the score cursor to the note starting at `time` (seconds at 1x).
    fn show_score_position(&mut self, measure: usize, time: f64);
    fn hide_score_position(&mut self);
    fn show_bellows(&mut self, direction: Direction);
    fn show_status(&mut self, message: &str);
}

/// Everything the instrument drives.
pub trait HostOutput: SoundTrigger + VisualFeedback {}

impl<T: SoundTrigger + VisualFeedback> HostOutput for T {}

/// The collaborators lent to the scheduler for one call.
pub struct Host<'a> {
    pub clock: &'a dyn AudioClock,
    pub out: &'a mut dyn HostOutput,
}

impl<'a> Host<'a> {
    pub fn new(clock: &'a dyn AudioClock, out: &'a mut dyn HostOutput) -> Self {
        Self { clock, out }
    }

    pub fn now(&self) -> f64 {
        self.clock.current_time()
    }
}

/// One recorded host call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum HostCommand {
    #[serde(rename_all = "camelCase")]
    Play {
        handle: SoundHandle,
        button: ButtonId,
        direction: Direction,
        start_at: f64,
        gain: f64,
        end_at: Option<f64>,
        fade: Option<f64>,
        sustain_loop: bool,
    },
    Stop {
        handle: SoundHandle,
        /// `None` for an immediate stop
        fade: Option<f64>,
        at: f64,
    },
    Pressed {
        button: ButtonId,
        direction: Direction,
        substituted: bool,
    },
    Released {
        button: ButtonId,
    },
    Progress {
        elapsed: f64,
        total: f64,
    },
    ScorePosition {
        measure: usize,
        time: f64,
    },
    HideScorePosition,
    Bellows {
        direction: Direction,
    },
    Status {
        message: String,
    },
}

#[derive(Debug, Clone)]
struct Voice {
    button: ButtonId,
    end_at: Option<f64>,
}

/// A host that records every call instead of performing it.
///
/// It also keeps track of which sounds would still be audible, so callers can
/// check that nothing is left ringing.
#[derive(Debug, Clone, Default)]
pub struct CommandBuffer {
    commands: Vec<HostCommand>,
    voices: HashMap<SoundHandle, Voice>,
    missing: HashSet<(ButtonId, Direction)>,
    next_handle: u64,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend there is no sample for one reed.
    pub fn without_sample(mut self, button: impl Into<ButtonId>, direction: Direction) -> Self {
        self.missing.insert((button.into(), direction));
        self
    }

    pub fn commands(&self) -> &[HostCommand] {
        &self.commands
    }

    /// Remove and return everything recorded so far.
    pub fn take(&mut self) -> Vec<HostCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Handles still audible at audio time `now`, in handle order.
    pub fn sounding(&self, now: f64) -> Vec<(SoundHandle, ButtonId)> {
        let mut sounding: Vec<(SoundHandle, ButtonId)> = self
            .voices
            .iter()
            .filter(|(_, voice)| voice.end_at.map_or(true, |end| end > now))
            .map(|(handle, voice)| (*handle, voice.button.clone()))
            .collect();
        sounding.sort();
        sounding
    }
}

impl SoundTrigger for CommandBuffer {
    fn play(&mut self, button: &ButtonId, direction: Direction, request: PlayRequest) -> Option<SoundHandle> {
        if self.missing.contains(&(button.clone(), direction)) {
            return None;
        }

        let handle = SoundHandle(self.next_handle);
        self.next_handle += 1;

        let end_at = request.release.map(|release| release.end_at);
        self.voices.insert(
            handle,
            Voice {
                button: button.clone(),
                end_at,
            },
        );
        self.commands.push(HostCommand::Play {
            handle,
            button: button.clone(),
            direction,
            start_at: request.start_at,
            gain: request.gain,
            end_at,
            fade: request.release.map(|release| release.fade),
            sustain_loop: request.sustain_loop,
        });
        Some(handle)
    }

    fn stop(&mut self, handle: SoundHandle, mode: StopMode, at: f64) {
        let fade = match mode {
            StopMode::Immediate => None,
            StopMode::Fade(seconds) => Some(seconds),
        };
        if let Some(voice) = self.voices.get_mut(&handle) {
            let silent_at = at + fade.unwrap_or(0.0);
            voice.end_at = Some(voice.end_at.map_or(silent_at, |end| end.min(silent_at)));
        }
        self.commands.push(HostCommand::Stop { handle, fade, at });
    }
}

impl VisualFeedback for CommandBuffer {
    fn show_pressed(&mut self, button: &ButtonId, direction: Direction, substituted: bool) {
        self.commands.push(HostCommand::Pressed {
            button: button.clone(),
            direction,
            substituted,
        });
    }

    fn show_released(&mut self, button: &ButtonId) {
        self.commands.push(HostCommand::Released { button: button.clone() });
    }

    fn show_progress(&mut self, elapsed: f64, total: f64) {
        self.commands.push(HostCommand::Progress { elapsed, total });
    }

    fn show_score_position(&mut self, measure: usize, time: f64) {
        self.commands.push(HostCommand::ScorePosition { measure, time });
    }

    fn hide_score_position(&mut self) {
        self.commands.push(HostCommand::HideScorePosition);
    }

    fn show_bellows(&mut self, direction: Direction) {
        self.commands.push(HostCommand::Bellows { direction });
    }

    fn show_status(&mut self, message: &str) {
        self.commands.push(HostCommand::Status {
            message: message.to_string(),
        });
    }
}
