//! Command line front end: argument parsing and the score and recording
//! reports.

pub mod error;

pub use error::CliError;

use accordion_core::config::PlayerConfig;
use accordion_core::instrument::{Instrument, ScoreSummary};
use accordion_core::scheduler::{CommandBuffer, ManualClock};
use accordion_core::{RecordedEvent, Recording, ScoreEvent, Tuning, TranslationMode, TuningMap};
use serde::Serialize;
use std::fmt::Write;
use std::fs;

pub const USAGE: &str = "\
Usage: accordion <score.musicxml> [--tuning FBE|GCF|file.yaml] [--substitute] [--config file.yaml] [--json]
       accordion --preset <name> [options]
       accordion --list-presets
       accordion --recording <file.json> [--json]

Options:
  --tuning <t>     Built-in tuning name or a YAML tuning file (default from config, else FBE)
  --substitute     Replace unplayable pitches with the nearest playable one
  --config <file>  YAML player configuration
  --json           Print JSON instead of a table
  --verbose        Log translation details to stderr";

/// What to inspect
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Score(String),
    Preset(String),
    Recording(String),
    ListPresets,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub input: Input,
    pub tuning: Option<String>,
    pub substitute: bool,
    pub config: Option<String>,
    pub json: bool,
    pub verbose: bool,
}

impl Options {
    pub fn mode(&self) -> TranslationMode {
        if self.substitute {
            TranslationMode::Lenient
        } else {
            TranslationMode::Strict
        }
    }
}

/// Parse command line arguments (without the program name).
pub fn parse_args<I, S>(args: I) -> Result<Options, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut args = args.into_iter().map(Into::into);
    let mut input = None;
    let mut tuning = None;
    let mut config = None;
    let mut substitute = false;
    let mut json = false;
    let mut verbose = false;

    while let Some(arg) = args.next() {
        let found = match arg.as_str() {
            "--tuning" => {
                tuning = Some(value("--tuning", args.next())?);
                None
            }
            "--config" => {
                config = Some(value("--config", args.next())?);
                None
            }
            "--substitute" => {
                substitute = true;
                None
            }
            "--json" => {
                json = true;
                None
            }
            "--verbose" | "-v" => {
                verbose = true;
                None
            }
            "--list-presets" => Some(Input::ListPresets),
            "--preset" => Some(Input::Preset(value("--preset", args.next())?)),
            "--recording" => Some(Input::Recording(value("--recording", args.next())?)),
            "--help" | "-h" => return Err(CliError::Usage(USAGE.to_string())),
            flag if flag.starts_with("--") => {
                return Err(CliError::Usage(format!("Unknown option {}\n\n{}", flag, USAGE)))
            }
            _ => Some(Input::Score(arg.clone())),
        };

        if let Some(found) = found {
            if input.is_some() {
                return Err(CliError::Usage(format!("Only one input at a time\n\n{}", USAGE)));
            }
            input = Some(found);
        }
    }

    Ok(Options {
        input: input.ok_or_else(|| CliError::Usage(USAGE.to_string()))?,
        tuning,
        substitute,
        config,
        json,
        verbose,
    })
}

fn value(flag: &str, next: Option<String>) -> Result<String, CliError> {
    next.ok_or_else(|| CliError::Usage(format!("{} needs a value\n\n{}", flag, USAGE)))
}

fn read_file(path: &str) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_string(),
        source,
    })
}

/// The player configuration from `--config`, or the defaults.
pub fn load_config(options: &Options) -> Result<PlayerConfig, CliError> {
    match &options.config {
        Some(path) => Ok(PlayerConfig::from_yaml(&read_file(path)?)?),
        None => Ok(PlayerConfig::default()),
    }
}

/// `--tuning` as a built-in name or a YAML file; the configured tuning otherwise.
pub fn load_tuning(options: &Options, config: &PlayerConfig) -> Result<TuningMap, CliError> {
    match options.tuning.as_deref() {
        None => Ok(config.tuning.map()),
        Some(arg) => match Tuning::from_str(arg) {
            Some(tuning) => Ok(tuning.map()),
            None if arg.ends_with(".yaml") || arg.ends_with(".yml") => Ok(TuningMap::from_yaml(&read_file(arg)?)?),
            None => Err(accordion_core::AccordionError::UnknownTuning(arg.to_string()).into()),
        },
    }
}

/// A translated score as printed by `--json`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub summary: ScoreSummary,
    pub mode: TranslationMode,
    pub events: Vec<ScoreEvent>,
}

/// Translate a MusicXML score the way the player would.
pub fn score_report(xml: &str, tuning: TuningMap, config: PlayerConfig, mode: TranslationMode) -> ScoreReport {
    let mut instrument = Instrument::with_tuning(config, tuning, ManualClock::new(0.0), CommandBuffer::new());
    let summary = instrument.load_score(xml);
    let events = instrument
        .translation(mode)
        .map(|translation| translation.events.clone())
        .unwrap_or_default();
    ScoreReport { summary, mode, events }
}

pub fn format_score_report(report: &ScoreReport) -> String {
    let summary = &report.summary;
    let mut out = String::new();

    if let Some(title) = &summary.title {
        let _ = writeln!(out, "{}", title);
    }
    let _ = writeln!(
        out,
        "Tuning {}  Tempo {} BPM  {} measures  {:.2}s",
        summary.tuning, summary.tempo, summary.measure_count, summary.duration
    );
    let _ = match report.mode {
        TranslationMode::Strict => writeln!(
            out,
            "{} notes playable, {} not on this tuning",
            summary.strict_notes, summary.dropped_notes
        ),
        TranslationMode::Lenient => writeln!(
            out,
            "{} notes playable, {} substituted",
            summary.lenient_notes, summary.substituted_notes
        ),
    };

    if report.events.is_empty() {
        return out;
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{:>8} {:>7} {:>4}  {:<6} {:<5} {}", "time", "dur", "bar", "button", "dir", "pitch");
    for event in &report.events {
        let pitch = if event.was_substituted {
            format!("{} (for {})", event.resolved_pitch, event.original_pitch)
        } else {
            event.resolved_pitch.to_string()
        };
        let _ = writeln!(
            out,
            "{:>8.3} {:>7.3} {:>4}  {:<6} {:<5} {}",
            event.start_time,
            event.duration,
            event.measure_number,
            event.button_id,
            event.direction.as_str(),
            pitch
        );
    }
    out
}

pub fn format_recording_report(recording: &Recording) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} events, {:.2}s",
        recording.len(),
        recording.total_duration()
    );
    for event in recording.events() {
        let _ = match event {
            RecordedEvent::Press { time, id, mode } => {
                writeln!(out, "{:>8.3}  press    {:<6} {}", time, id, mode.as_str())
            }
            RecordedEvent::Release { time, id } => writeln!(out, "{:>8.3}  release  {}", time, id),
            RecordedEvent::Bellows { time, mode } => writeln!(out, "{:>8.3}  bellows  {}", time, mode.as_str()),
        };
    }
    out
}

/// Run the command and return what to print.
pub fn run(options: &Options) -> Result<String, CliError> {
    match &options.input {
        Input::ListPresets => Ok(accordion_presets::list_presets().join("\n")),
        Input::Recording(path) => {
            let recording = Recording::from_json(&read_file(path)?)?;
            if options.json {
                Ok(recording.to_json()?)
            } else {
                Ok(format_recording_report(&recording))
            }
        }
        Input::Preset(name) => {
            let preset = accordion_presets::get_preset(name).ok_or_else(|| CliError::UnknownPreset(name.clone()))?;
            score_output(options, preset.musicxml)
        }
        Input::Score(path) => score_output(options, &read_file(path)?),
    }
}

fn score_output(options: &Options, xml: &str) -> Result<String, CliError> {
    let config = load_config(options)?;
    let tuning = load_tuning(options, &config)?;
    log::info!(target: "Cli", "Translating for {} ({:?})", tuning.name(), options.mode());
    let report = score_report(xml, tuning, config, options.mode());
    if options.json {
        Ok(serde_json::to_string_pretty(&report)?)
    } else {
        Ok(format_score_report(&report))
    }
}
