//! # Instrument
//!
//! The state of one virtual accordion: tuning, bellows, held buttons, the
//! loaded score and recording, the recorder and the playback scheduler.
//!
//! All state lives in [`Instrument`]; the host supplies the audio clock and an
//! output implementing [`SoundTrigger`](crate::scheduler::SoundTrigger) and
//! [`VisualFeedback`](crate::scheduler::VisualFeedback). Every operation reads
//! the clock when it is called, so the host only has to keep the clock current
//! and call [`Instrument::pump`] from its event loop.
//!
//! Errors are also shown on the status line before they are returned.
//!
//! ## Example
//! ```rust
//! use accordion_core::instrument::{Instrument, ScorePlayRequest};
//! use accordion_core::scheduler::{CommandBuffer, ManualClock, SessionKind};
//! use accordion_core::config::PlayerConfig;
//!
//! let xml = r#"<score-partwise><part id="P1"><measure number="1">
//!   <note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration></note>
//! </measure></part></score-partwise>"#;
//!
//! let mut instrument = Instrument::new(PlayerConfig::default(), ManualClock::new(0.0), CommandBuffer::new());
//! let summary = instrument.load_score(xml);
//! assert_eq!(summary.measure_count, 1);
//!
//! instrument.play_score(ScorePlayRequest::default()).unwrap();
//! assert!(instrument.is_playing(SessionKind::Score));
//! ```

use crate::config::PlayerConfig;
use crate::error::AccordionError;
use crate::musicxml::parse_musicxml;
use crate::playback::{translate_with_default_tempo, Translation, TranslationMode};
use crate::recording::{Recorder, Recording};
use crate::resolver::PitchResolver;
use crate::scheduler::{
    select_recording_segment, select_score_segment, AudioClock, Host, HostOutput, MeasureRange, PlayRequest,
    Scheduler, SessionKind, SessionPlan, SoundHandle, StopMode, StopReason,
};
use crate::score::{ParsedScore, ScoreSource};
use crate::tuning::{ButtonId, Direction, TuningMap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How to play the loaded score
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScorePlayRequest {
    pub mode: TranslationMode,
    /// Measures to play; `None` for the whole piece
    pub measures: Option<MeasureRange>,
    pub looping: bool,
}

/// How to play the loaded recording
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecordingPlayRequest {
    /// Window start in seconds; invalid values fall back to the beginning
    pub start: Option<f64>,
    /// Window end in seconds; invalid values fall back to the end
    pub end: Option<f64>,
    pub looping: bool,
}

/// What loading a score produced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSummary {
    pub title: Option<String>,
    pub tuning: String,
    pub measure_count: usize,
    pub tempo: f64,
    /// Notes playable without substitution
    pub strict_notes: usize,
    /// Notes playable with substitution
    pub lenient_notes: usize,
    pub substituted_notes: usize,
    /// Notes the strict translation could not place
    pub dropped_notes: usize,
    /// Length in seconds at 1x
    pub duration: f64,
}

#[derive(Debug, Clone)]
struct LoadedScore {
    source: ParsedScore,
    strict: Translation,
    lenient: Translation,
}

impl LoadedScore {
    fn translate(source: ParsedScore, resolver: &PitchResolver, default_tempo: f64) -> Self {
        let strict = translate_with_default_tempo(&source, resolver, false, default_tempo);
        let lenient = translate_with_default_tempo(&source, resolver, true, default_tempo);
        Self {
            source,
            strict,
            lenient,
        }
    }

    fn translation(&self, mode: TranslationMode) -> &Translation {
        match mode {
            TranslationMode::Strict => &self.strict,
            TranslationMode::Lenient => &self.lenient,
        }
    }

    fn summary(&self, tuning: &str) -> ScoreSummary {
        ScoreSummary {
            title: self.source.title().map(str::to_string),
            tuning: tuning.to_string(),
            measure_count: self.lenient.measure_count,
            tempo: self.lenient.tempo,
            strict_notes: self.strict.events.len(),
            lenient_notes: self.lenient.events.len(),
            substituted_notes: self.lenient.substituted_count(),
            dropped_notes: self.strict.dropped_notes,
            duration: self.lenient.total_duration,
        }
    }
}

/// One virtual button accordion.
pub struct Instrument<C: AudioClock, O: HostOutput> {
    config: PlayerConfig,
    resolver: PitchResolver,
    bellows: Direction,
    /// Live held buttons and their sounds (`None` when the reed has no sample)
    held: BTreeMap<ButtonId, Option<SoundHandle>>,
    recorder: Option<Recorder>,
    score: Option<LoadedScore>,
    recording: Option<Recording>,
    scheduler: Scheduler,
    score_request: Option<ScorePlayRequest>,
    recording_request: Option<RecordingPlayRequest>,
    score_speed: f64,
    recording_speed: f64,
    clock: C,
    output: O,
}

impl<C: AudioClock, O: HostOutput> Instrument<C, O> {
    /// Create an instrument with the configured tuning.
    pub fn new(config: PlayerConfig, clock: C, output: O) -> Self {
        let tuning = config.tuning.map();
        Self::with_tuning(config, tuning, clock, output)
    }

    /// Create an instrument with a custom tuning.
    pub fn with_tuning(config: PlayerConfig, tuning: TuningMap, clock: C, output: O) -> Self {
        Self {
            resolver: PitchResolver::new(tuning),
            bellows: Direction::Push,
            held: BTreeMap::new(),
            recorder: None,
            score: None,
            recording: None,
            scheduler: Scheduler::new(&config),
            score_request: None,
            recording_request: None,
            score_speed: config.score_speed,
            recording_speed: config.recording_speed,
            config,
            clock,
            output,
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn resolver(&self) -> &PitchResolver {
        &self.resolver
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The host moves the clock through here.
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    pub fn bellows(&self) -> Direction {
        self.bellows
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    pub fn is_playing(&self, kind: SessionKind) -> bool {
        self.scheduler.is_active(kind)
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Strict or lenient translation of the loaded score
    pub fn translation(&self, mode: TranslationMode) -> Option<&Translation> {
        self.score.as_ref().map(|score| score.translation(mode))
    }

    pub fn score_summary(&self) -> Option<ScoreSummary> {
        self.score
            .as_ref()
            .map(|score| score.summary(self.resolver.tuning().name()))
    }

    pub fn recording(&self) -> Option<&Recording> {
        self.recording.as_ref()
    }

    pub fn speed(&self, kind: SessionKind) -> f64 {
        match kind {
            SessionKind::Score => self.score_speed,
            SessionKind::Recording => self.recording_speed,
        }
    }

    /// Switch to another tuning.
    ///
    /// Held buttons are silenced, any playback stops and the loaded score is
    /// translated again for the new tuning.
    pub fn set_tuning(&mut self, tuning: TuningMap) {
        self.silence_held();
        self.stop_all();

        log::info!(target: "Instrument", "Tuning changed to {}", tuning.name());
        self.resolver = PitchResolver::new(tuning);
        let default_tempo = self.config.default_tempo;
        if let Some(loaded) = self.score.take() {
            self.score = Some(LoadedScore::translate(loaded.source, &self.resolver, default_tempo));
        }
        let name = self.resolver.tuning().name().to_string();
        self.output.show_status(&format!("Tuning: {}", name));
    }

    /// Read a MusicXML score and translate it for the current tuning.
    ///
    /// An unreadable document loads as an empty score; the problem is shown on
    /// the status line.
    pub fn load_score(&mut self, xml: &str) -> ScoreSummary {
        match parse_musicxml(xml) {
            Ok(source) => self.load_score_source(&source),
            Err(e) => {
                log::warn!(target: "Instrument", "{}", e);
                self.output.show_status(&e.to_string());
                self.load_score_source(&ParsedScore::default())
            }
        }
    }

    /// Translate an already parsed score for the current tuning.
    pub fn load_score_source<S: ScoreSource + ?Sized>(&mut self, source: &S) -> ScoreSummary {
        self.stop(SessionKind::Score);
        self.score_request = None;

        let source = ParsedScore {
            title: source.title().map(str::to_string),
            tempo: source.tempo(),
            measure_count: source.measure_count(),
            notes: source.notes().to_vec(),
        };
        let loaded = LoadedScore::translate(source, &self.resolver, self.config.default_tempo);
        let summary = loaded.summary(self.resolver.tuning().name());
        self.score = Some(loaded);

        log::info!(target: "Instrument",
            "Loaded score with {} measures: {} strict, {} lenient notes",
            summary.measure_count, summary.strict_notes, summary.lenient_notes);
        summary
    }

    /// Press a button live.
    ///
    /// Any running playback stops first. The button sounds in the current
    /// bellows direction until released.
    pub fn press(&mut self, button: &ButtonId) -> Result<(), AccordionError> {
        if !self.clock.is_running() {
            return self.fail(AccordionError::AudioNotReady);
        }
        if self.scheduler.any_active() {
            log::debug!(target: "Instrument", "Live input, stopping playback");
            let mut host = Host::new(&self.clock, &mut self.output);
            self.scheduler.stop_all(&mut host, StopReason::ManualInput);
        }

        let now = self.clock.current_time();
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.press(now, button, self.bellows);
        }

        if let Some(Some(previous)) = self.held.remove(button) {
            self.output.stop(previous, StopMode::Immediate, now);
        }
        let handle = self.start_live_sound(button, now);
        self.held.insert(button.clone(), handle);
        self.output.show_pressed(button, self.bellows, false);
        Ok(())
    }

    /// Release a live button. Releasing a button that is not held does nothing.
    pub fn release(&mut self, button: &ButtonId) {
        let Some(handle) = self.held.remove(button) else {
            return;
        };
        let now = self.clock.current_time();
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.release(now, button);
        }
        if let Some(handle) = handle {
            self.output.stop(handle, StopMode::Fade(self.config.release_fade), now);
        }
        self.output.show_released(button);
    }

    /// Change the bellows direction. Held buttons switch to the other reed.
    pub fn set_bellows(&mut self, direction: Direction) {
        if direction == self.bellows {
            return;
        }
        let now = self.clock.current_time();
        self.bellows = direction;
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.bellows(now, direction);
        }
        self.output.show_bellows(direction);

        let held: Vec<ButtonId> = self.held.keys().cloned().collect();
        for button in held {
            if let Some(Some(previous)) = self.held.remove(&button) {
                self.output.stop(previous, StopMode::Fade(self.config.release_fade), now);
            }
            let handle = self.start_live_sound(&button, now);
            self.held.insert(button.clone(), handle);
            self.output.show_pressed(&button, direction, false);
        }
    }

    pub fn toggle_bellows(&mut self) {
        self.set_bellows(self.bellows.opposite());
    }

    /// Start capturing live input. Does nothing if already recording.
    pub fn start_recording(&mut self) -> Result<(), AccordionError> {
        if self.recorder.is_some() {
            return Ok(());
        }
        if !self.clock.is_running() {
            return self.fail(AccordionError::AudioNotReady);
        }
        if self.scheduler.any_active() {
            return self.fail(AccordionError::PlaybackActive);
        }

        self.recorder = Some(Recorder::start(self.clock.current_time()));
        self.output.show_status("Recording...");
        Ok(())
    }

    /// Finish capturing. The recording becomes the loaded recording; `None` if
    /// nothing was being recorded.
    pub fn stop_recording(&mut self) -> Option<&Recording> {
        let recorder = self.recorder.take()?;
        let recording = recorder.finish();
        self.output.show_status(&format!(
            "Recording finished ({} events, {:.1}s).",
            recording.len(),
            recording.total_duration()
        ));
        self.output.show_progress(0.0, recording.total_duration() / self.recording_speed);
        self.recording_request = None;
        self.recording = Some(recording);
        self.recording.as_ref()
    }

    pub fn load_recording(&mut self, recording: Recording) {
        self.stop(SessionKind::Recording);
        self.recording_request = None;
        log::info!(target: "Instrument",
            "Loaded recording ({} events, {:.1}s)", recording.len(), recording.total_duration());
        self.recording = Some(recording);
    }

    /// The loaded recording in its JSON exchange format
    pub fn recording_json(&self) -> Result<String, AccordionError> {
        self.recording
            .as_ref()
            .ok_or(AccordionError::NoRecordingLoaded)?
            .to_json()
    }

    /// Play the loaded score.
    pub fn play_score(&mut self, request: ScorePlayRequest) -> Result<(), AccordionError> {
        let result = self.start_score(request);
        self.report(result)
    }

    fn start_score(&mut self, request: ScorePlayRequest) -> Result<(), AccordionError> {
        if self.recorder.is_some() {
            return Err(AccordionError::RecordingBusy);
        }
        let score = self.score.as_ref().ok_or(AccordionError::NoScoreLoaded)?;
        if !self.clock.is_running() {
            return Err(AccordionError::AudioNotReady);
        }

        let selection = select_score_segment(
            score.translation(request.mode),
            &score.lenient,
            request.measures,
            request.looping,
        )?;
        let plan = SessionPlan::score(selection, self.score_speed, request.looping);

        self.silence_held();
        let mut host = Host::new(&self.clock, &mut self.output);
        self.scheduler.start(&mut host, plan)?;
        self.score_request = Some(request);
        Ok(())
    }

    /// Play the loaded recording.
    pub fn play_recording(&mut self, request: RecordingPlayRequest) -> Result<(), AccordionError> {
        let result = self.start_recording_playback(request);
        self.report(result)
    }

    fn start_recording_playback(&mut self, request: RecordingPlayRequest) -> Result<(), AccordionError> {
        if self.recorder.is_some() {
            return Err(AccordionError::RecordingBusy);
        }
        let recording = match &self.recording {
            Some(recording) if !recording.is_empty() => recording,
            _ => return Err(AccordionError::NoRecordingLoaded),
        };
        if !self.clock.is_running() {
            return Err(AccordionError::AudioNotReady);
        }

        let selection = select_recording_segment(recording, request.start, request.end)?;
        let plan = SessionPlan::recording(selection, self.bellows, self.recording_speed, request.looping);

        self.silence_held();
        let mut host = Host::new(&self.clock, &mut self.output);
        self.scheduler.start(&mut host, plan)?;
        self.recording_request = Some(request);
        Ok(())
    }

    /// Stop one kind of playback. Returns false if it was not playing.
    pub fn stop(&mut self, kind: SessionKind) -> bool {
        let mut host = Host::new(&self.clock, &mut self.output);
        self.scheduler.stop(&mut host, kind, StopReason::Requested)
    }

    pub fn stop_all(&mut self) -> bool {
        let mut host = Host::new(&self.clock, &mut self.output);
        self.scheduler.stop_all(&mut host, StopReason::Requested)
    }

    /// Turn looping of a running session on or off.
    pub fn set_looping(&mut self, kind: SessionKind, looping: bool) {
        self.scheduler.set_looping(kind, looping);
        match kind {
            SessionKind::Score => {
                if let Some(request) = self.score_request.as_mut() {
                    request.looping = looping;
                }
            }
            SessionKind::Recording => {
                if let Some(request) = self.recording_request.as_mut() {
                    request.looping = looping;
                }
            }
        }
    }

    /// Change the speed factor of one playback kind.
    ///
    /// A running session of that kind restarts from the beginning of its
    /// segment at the new speed.
    pub fn set_speed(&mut self, kind: SessionKind, factor: f64) -> Result<(), AccordionError> {
        if !factor.is_finite() || factor <= 0.0 {
            return self.fail(AccordionError::InvalidSpeed(factor));
        }
        match kind {
            SessionKind::Score => self.score_speed = factor,
            SessionKind::Recording => self.recording_speed = factor,
        }
        log::info!(target: "Instrument", "{} speed set to {:.2}x", kind, factor);

        if !self.scheduler.is_active(kind) {
            return Ok(());
        }
        {
            let mut host = Host::new(&self.clock, &mut self.output);
            self.scheduler.stop(&mut host, kind, StopReason::SpeedChange);
        }
        match kind {
            SessionKind::Score => match self.score_request {
                Some(request) => self.play_score(request),
                None => Ok(()),
            },
            SessionKind::Recording => match self.recording_request {
                Some(request) => self.play_recording(request),
                None => Ok(()),
            },
        }
    }

    /// Perform everything due at the current clock time. Returns how many
    /// scheduled actions ran.
    pub fn pump(&mut self) -> usize {
        let fired = {
            let mut host = Host::new(&self.clock, &mut self.output);
            self.scheduler.pump(&mut host)
        };
        if let Some(direction) = self.scheduler.take_bellows_change() {
            log::debug!(target: "Instrument", "Bellows follows playback: {}", direction);
            self.bellows = direction;
        }
        fired
    }

    fn start_live_sound(&mut self, button: &ButtonId, now: f64) -> Option<SoundHandle> {
        let request = PlayRequest {
            start_at: now,
            gain: self.config.sustain_gain,
            release: None,
            sustain_loop: true,
        };
        let handle = self.output.play(button, self.bellows, request);
        if handle.is_none() {
            log::warn!(target: "Instrument", "No sample for button {} ({})", button, self.bellows);
        }
        handle
    }

    /// Stop every live sound at once and clear the held buttons.
    fn silence_held(&mut self) {
        let now = self.clock.current_time();
        for (button, handle) in std::mem::take(&mut self.held) {
            if let Some(handle) = handle {
                self.output.stop(handle, StopMode::Immediate, now);
            }
            self.output.show_released(&button);
        }
    }

    fn report<T>(&mut self, result: Result<T, AccordionError>) -> Result<T, AccordionError> {
        if let Err(e) = &result {
            log::warn!(target: "Instrument", "{}", e);
            self.output.show_status(&e.to_string());
        }
        result
    }

    fn fail<T>(&mut self, error: AccordionError) -> Result<T, AccordionError> {
        self.report(Err(error))
    }
}
