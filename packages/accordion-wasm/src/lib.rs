use accordion_core::config::PlayerConfig;
use accordion_core::instrument::{Instrument, RecordingPlayRequest, ScorePlayRequest};
use accordion_core::scheduler::{AudioClock, CommandBuffer, HostCommand, ManualClock, SessionKind};
use accordion_core::{AccordionError, ButtonId, Direction, Recording, TranslationMode, Tuning, TuningMap};
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// What a failed call throws, as JSON
#[derive(Debug, Serialize)]
struct PlayerError {
    message: String,
    recoverable: bool,
    /// Host commands produced before the failure (status line, fades)
    commands: Vec<HostCommand>,
}

impl PlayerError {
    fn new(e: &AccordionError, commands: Vec<HostCommand>) -> Self {
        PlayerError {
            message: e.to_string(),
            recoverable: matches!(e, AccordionError::AudioNotReady),
            commands,
        }
    }

    fn into_js(self) -> JsValue {
        JsValue::from_str(&serde_json::to_string(&self).unwrap_or_else(|_| self.message.clone()))
    }
}

fn to_js_error(e: AccordionError) -> JsValue {
    PlayerError::new(&e, Vec::new()).into_js()
}

fn to_json<T: Serialize>(value: &T) -> Result<String, AccordionError> {
    serde_json::to_string(value).map_err(|e| AccordionError::Config(e.to_string()))
}

/// A built-in tuning name ("FBE", "GCF") or a YAML tuning document
fn tuning_map(source: &str) -> Result<TuningMap, AccordionError> {
    match Tuning::from_str(source) {
        Some(tuning) => Ok(tuning.map()),
        None if source.contains(':') => TuningMap::from_yaml(source),
        None => Err(AccordionError::UnknownTuning(source.to_string())),
    }
}

fn session_kind(kind: &str) -> Result<SessionKind, AccordionError> {
    SessionKind::from_str(kind).ok_or_else(|| AccordionError::Config(format!("unknown playback kind '{}'", kind)))
}

fn resolve_pitch_json(tuning: &str, pitch: i32, substitute: bool) -> Result<String, AccordionError> {
    let resolver = accordion_core::PitchResolver::new(tuning_map(tuning)?);
    to_json(&resolver.resolve(pitch, substitute))
}

fn translate_score_json(xml: &str, tuning: &str, substitute: bool) -> Result<String, AccordionError> {
    let resolver = accordion_core::PitchResolver::new(tuning_map(tuning)?);
    let translation = accordion_core::playback::translate_musicxml(xml, &resolver, substitute);
    to_json(&translation)
}

/// Button and bellows direction for a MIDI pitch, as JSON (`null` if unplayable)
#[wasm_bindgen]
pub fn resolve_pitch(tuning: &str, pitch: i32, substitute: bool) -> Result<String, JsValue> {
    resolve_pitch_json(tuning, pitch, substitute).map_err(to_js_error)
}

/// Translate MusicXML into timed button presses, as JSON
#[wasm_bindgen]
pub fn translate_score(xml: &str, tuning: &str, substitute: bool) -> Result<String, JsValue> {
    translate_score_json(xml, tuning, substitute).map_err(to_js_error)
}

/// Validate recording JSON and return it sorted by time
#[wasm_bindgen]
pub fn normalize_recording(json: &str) -> Result<String, JsValue> {
    accordion_core::normalize_recording(json).map_err(to_js_error)
}

/// Names of the bundled preset scores as a JSON array
#[wasm_bindgen]
pub fn list_presets() -> String {
    serde_json::to_string(&accordion_presets::list_presets()).unwrap_or_else(|_| "[]".to_string())
}

/// MusicXML of a bundled preset
#[wasm_bindgen]
pub fn get_preset(name: &str) -> Option<String> {
    accordion_presets::get_preset(name).map(|preset| preset.musicxml.to_string())
}

/// The instrument as seen from a browser.
///
/// The page owns the real audio context. Every method takes the context's
/// current time and returns the host commands produced since the previous
/// call, as a JSON array, for the page to carry out.
#[wasm_bindgen]
pub struct Player {
    instrument: Instrument<ManualClock, CommandBuffer>,
}

impl Player {
    fn create(tuning: &str, config: PlayerConfig) -> Result<Player, AccordionError> {
        let map = tuning_map(tuning)?;
        Ok(Player {
            instrument: Instrument::with_tuning(config, map, ManualClock::suspended(), CommandBuffer::new()),
        })
    }

    fn at(&mut self, now: f64) -> &mut Instrument<ManualClock, CommandBuffer> {
        self.instrument.clock_mut().set_time(now);
        &mut self.instrument
    }

    fn drain(&mut self) -> String {
        to_json(&self.instrument.output_mut().take()).unwrap_or_else(|_| "[]".to_string())
    }

    /// Hand over the buffered commands whether the call worked or not.
    fn settle(&mut self, result: Result<(), AccordionError>) -> Result<String, PlayerError> {
        match result {
            Ok(()) => Ok(self.drain()),
            Err(e) => Err(PlayerError::new(&e, self.instrument.output_mut().take())),
        }
    }

    fn press_button(&mut self, now: f64, button: &str) -> Result<String, PlayerError> {
        let result = self.at(now).press(&ButtonId::from(button));
        self.settle(result)
    }

    fn play_score_request(&mut self, now: f64, request: ScorePlayRequest) -> Result<String, PlayerError> {
        let result = self.at(now).play_score(request);
        self.settle(result)
    }

    fn play_recording_request(&mut self, now: f64, request: RecordingPlayRequest) -> Result<String, PlayerError> {
        let result = self.at(now).play_recording(request);
        self.settle(result)
    }

    fn speed(&mut self, now: f64, kind: &str, factor: f64) -> Result<String, PlayerError> {
        let result = match session_kind(kind) {
            Ok(kind) => self.at(now).set_speed(kind, factor),
            Err(e) => Err(e),
        };
        self.settle(result)
    }
}

#[wasm_bindgen]
impl Player {
    /// `tuning` is "FBE", "GCF" or a YAML tuning; `config` is an optional
    /// YAML player configuration.
    #[wasm_bindgen(constructor)]
    pub fn new(tuning: &str, config: Option<String>) -> Result<Player, JsValue> {
        let config = match config {
            Some(yaml) => PlayerConfig::from_yaml(&yaml).map_err(to_js_error)?,
            None => PlayerConfig::default(),
        };
        Player::create(tuning, config).map_err(to_js_error)
    }

    /// Tell the player whether the audio context is running.
    pub fn set_audio_running(&mut self, running: bool) {
        self.instrument.clock_mut().set_running(running);
    }

    pub fn set_tuning(&mut self, now: f64, tuning: &str) -> Result<String, JsValue> {
        let map = tuning_map(tuning).map_err(to_js_error)?;
        self.at(now).set_tuning(map);
        Ok(self.drain())
    }

    /// Load MusicXML; returns the score summary as JSON.
    pub fn load_score(&mut self, xml: &str) -> Result<String, JsValue> {
        let summary = self.instrument.load_score(xml);
        to_json(&summary).map_err(to_js_error)
    }

    /// Load a bundled preset; returns the score summary as JSON.
    pub fn load_preset(&mut self, name: &str) -> Result<String, JsValue> {
        let preset = accordion_presets::get_preset(name)
            .ok_or_else(|| to_js_error(AccordionError::MalformedScore(format!("no preset named '{}'", name))))?;
        self.load_score(preset.musicxml)
    }

    pub fn press(&mut self, now: f64, button: &str) -> Result<String, JsValue> {
        self.press_button(now, button).map_err(PlayerError::into_js)
    }

    pub fn release(&mut self, now: f64, button: &str) -> String {
        self.at(now).release(&ButtonId::from(button));
        self.drain()
    }

    /// `direction` is "push" or "pull"; anything else toggles.
    pub fn set_bellows(&mut self, now: f64, direction: &str) -> String {
        let instrument = self.at(now);
        match Direction::from_str(direction) {
            Some(direction) => instrument.set_bellows(direction),
            None => instrument.toggle_bellows(),
        }
        self.drain()
    }

    pub fn start_recording(&mut self, now: f64) -> Result<String, JsValue> {
        let result = self.at(now).start_recording();
        self.settle(result).map_err(PlayerError::into_js)
    }

    pub fn stop_recording(&mut self, now: f64) -> String {
        self.at(now).stop_recording();
        self.drain()
    }

    /// The last recording as JSON
    pub fn recording_json(&self) -> Result<String, JsValue> {
        self.instrument.recording_json().map_err(to_js_error)
    }

    pub fn load_recording(&mut self, json: &str) -> Result<(), JsValue> {
        let recording = Recording::from_json(json).map_err(to_js_error)?;
        self.instrument.load_recording(recording);
        Ok(())
    }

    /// `request` is `{mode?: "strict"|"lenient", measures?: {first, last}, looping?}`.
    pub fn play_score(&mut self, now: f64, request: JsValue) -> Result<String, JsValue> {
        let request: ScorePlayRequest = if request.is_undefined() || request.is_null() {
            ScorePlayRequest::default()
        } else {
            serde_wasm_bindgen::from_value(request)?
        };
        self.play_score_request(now, request).map_err(PlayerError::into_js)
    }

    /// `request` is `{start?, end?, looping?}` in seconds of the recording.
    pub fn play_recording(&mut self, now: f64, request: JsValue) -> Result<String, JsValue> {
        let request: RecordingPlayRequest = if request.is_undefined() || request.is_null() {
            RecordingPlayRequest::default()
        } else {
            serde_wasm_bindgen::from_value(request)?
        };
        self.play_recording_request(now, request).map_err(PlayerError::into_js)
    }

    /// `kind` is "score" or "recording".
    pub fn stop(&mut self, now: f64, kind: &str) -> Result<String, JsValue> {
        let kind = session_kind(kind).map_err(to_js_error)?;
        self.at(now).stop(kind);
        Ok(self.drain())
    }

    pub fn stop_all(&mut self, now: f64) -> String {
        self.at(now).stop_all();
        self.drain()
    }

    pub fn set_speed(&mut self, now: f64, kind: &str, factor: f64) -> Result<String, JsValue> {
        self.speed(now, kind, factor).map_err(PlayerError::into_js)
    }

    pub fn set_looping(&mut self, kind: &str, looping: bool) -> Result<(), JsValue> {
        let kind = session_kind(kind).map_err(to_js_error)?;
        self.instrument.set_looping(kind, looping);
        Ok(())
    }

    /// Run everything due by `now`. Call from `requestAnimationFrame`.
    pub fn pump(&mut self, now: f64) -> String {
        self.at(now).pump();
        self.drain()
    }

    /// Audio time of the next scheduled action, if any
    pub fn next_due(&self) -> Option<f64> {
        self.instrument.scheduler().next_due()
    }

    pub fn is_playing(&self, kind: &str) -> bool {
        session_kind(kind).map_or(false, |kind| self.instrument.is_playing(kind))
    }

    pub fn is_recording(&self) -> bool {
        self.instrument.is_recording()
    }

    pub fn audio_running(&self) -> bool {
        self.instrument.clock().is_running()
    }

    /// Strict or lenient translation of the loaded score as JSON
    pub fn translation(&self, mode: &str) -> Option<String> {
        let mode = TranslationMode::from_str(mode)?;
        self.instrument
            .translation(mode)
            .and_then(|translation| to_json(translation).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accordion_core::scheduler::MeasureRange;

    fn player() -> Player {
        let mut player = Player::create("FBE", PlayerConfig::default()).unwrap();
        player.set_audio_running(true);
        player
    }

    fn commands(json: &str) -> Vec<serde_json::Value> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_resolve_pitch_json() {
        let json = resolve_pitch_json("GCF", 55, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["buttonId"], "B1");
        assert_eq!(value["direction"], "push");
        assert_eq!(value["substituted"], false);

        assert_eq!(resolve_pitch_json("GCF", 20, false).unwrap(), "null");
        assert!(matches!(
            resolve_pitch_json("ADG", 60, false),
            Err(AccordionError::UnknownTuning(_))
        ));
    }

    #[test]
    fn test_custom_tuning_yaml() {
        let yaml = "name: One\nbuttons:\n  - { id: X, push: 60 }\n";
        let json = resolve_pitch_json(yaml, 61, true).unwrap();
        assert!(json.contains("\"buttonId\":\"X\""));
    }

    #[test]
    fn test_translate_preset() {
        let preset = accordion_presets::get_preset("f-major-scale").unwrap();
        let json = translate_score_json(preset.musicxml, "FBE", false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["events"].as_array().map(Vec::len), Some(8));
        assert_eq!(value["tempo"], 100.0);
    }

    #[test]
    fn test_player_command_stream() {
        let mut player = player();
        let preset = accordion_presets::get_preset("f-major-scale").unwrap();
        player.instrument.load_score(preset.musicxml);

        let started = commands(
            &player
                .play_score_request(
                    1.0,
                    ScorePlayRequest {
                        measures: Some(MeasureRange::new(1, 1)),
                        ..Default::default()
                    },
                )
                .unwrap(),
        );
        assert!(started
            .iter()
            .any(|c| c["command"] == "status" && c["message"] == "Playing Music 1-1..."));

        let first = commands(&player.pump(1.0));
        let play = first.iter().find(|c| c["command"] == "play").unwrap();
        assert_eq!(play["button"], "B5");
        assert_eq!(play["startAt"], 1.0);

        // Everything already handed over is not repeated
        assert!(commands(&player.pump(1.0)).is_empty());

        let stopped = commands(&player.stop_all(1.2));
        assert!(stopped.iter().any(|c| c["command"] == "stop"));
        assert!(!player.is_playing("score"));
    }

    #[test]
    fn test_live_play_and_recording() {
        let mut player = player();
        player.instrument.clock_mut().set_time(2.0);
        player.instrument.start_recording().unwrap();
        player.instrument.press(&ButtonId::from("B3")).unwrap();
        let released = commands(&player.release(2.5, "B3"));
        assert!(released.iter().any(|c| c["command"] == "released" && c["button"] == "B3"));
        player.stop_recording(3.0);

        let json = player.recording_json().unwrap();
        let events: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1]["time"], 0.5);

        let replay = player
            .play_recording_request(4.0, RecordingPlayRequest::default())
            .unwrap();
        assert!(replay.contains("Playing Recording (0.0s-0.5s)..."));
    }

    #[test]
    fn test_bellows_toggle() {
        let mut player = player();
        let out = commands(&player.set_bellows(0.0, "toggle"));
        assert_eq!(out[0]["command"], "bellows");
        assert_eq!(out[0]["direction"], "pull");
    }

    #[test]
    fn test_speed_validation() {
        let mut player = player();
        let err = player.speed(0.0, "music", -1.0).unwrap_err();
        assert_eq!(err.message, AccordionError::InvalidSpeed(-1.0).to_string());
        assert!(player.speed(0.0, "video", 1.0).unwrap_err().message.contains("video"));
        assert!(player.speed(0.0, "recording", 1.5).is_ok());
    }

    #[test]
    fn test_failure_status_is_not_left_behind() {
        let mut player = player();
        player.set_audio_running(false);

        let err = player.press_button(1.0, "B1").unwrap_err();
        assert!(err.recoverable);
        assert!(err
            .commands
            .iter()
            .any(|c| matches!(c, HostCommand::Status { message } if *message == err.message)));

        let err = player.play_score_request(1.0, ScorePlayRequest::default()).unwrap_err();
        assert_eq!(err.message, "No score loaded.");
        assert_eq!(err.commands.len(), 1);

        // The next call starts from an empty buffer
        assert!(commands(&player.pump(1.0)).is_empty());
    }
}
