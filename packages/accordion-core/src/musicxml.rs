//! # MusicXML Reader
//!
//! Reads `score-partwise` MusicXML into a [`ParsedScore`].
//!
//! ## What Is Read
//! - `<divisions>` per part (defaults to 1 when missing)
//! - `<note>` with `<pitch>` (`step`, `alter`, `octave`), `<rest/>`, `<chord/>`,
//!   `<grace/>`, `<duration>` and `<tie>`
//! - `<backup>` / `<forward>` for multi-voice measures
//! - Tempo from the first `<sound tempo="…">`, falling back to the first
//!   `<metronome>` marking
//! - `<work-title>` / `<movement-title>`
//!
//! ## Timing
//! Every note gets an absolute start time in quarter notes. Chord members share
//! the start of the note before them. A measure lasts as long as the furthest
//! position any voice reached in it.
//!
//! ## Ties
//! A note carrying `<tie type="stop"/>` that continues a pending tie on the same
//! pitch is folded into the first note of the group: only the first note is
//! played, with the combined duration.
//!
//! ## Measure Numbers
//! Measures are numbered by position (first measure = 1) rather than by their
//! `number` attribute, so pickup measures numbered 0 and "X1"-style labels
//! still produce a contiguous 1-based sequence.

use crate::error::AccordionError;
use crate::score::{ParsedScore, SourceNote};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;

/// Parse a MusicXML document.
///
/// # Example
/// ```rust
/// use accordion_core::musicxml::parse_musicxml;
///
/// let xml = r#"<?xml version="1.0"?>
/// <score-partwise version="4.0">
///   <part id="P1">
///     <measure number="1">
///       <attributes><divisions>2</divisions></attributes>
///       <sound tempo="90"/>
///       <note><pitch><step>C</step><octave>4</octave></pitch><duration>2</duration></note>
///       <note><rest/><duration>2</duration></note>
///     </measure>
///   </part>
/// </score-partwise>"#;
///
/// let score = parse_musicxml(xml).unwrap();
/// assert_eq!(score.tempo, Some(90.0));
/// assert_eq!(score.measure_count, 1);
/// assert_eq!(score.notes[0].pitch, Some(60));
/// assert_eq!(score.notes[1].start_time, 1.0);
/// ```
///
/// # Errors
/// Returns [`AccordionError::MalformedScore`] when the input is not XML, has
/// no `score-partwise` root, or contains unreadable numbers.
pub fn parse_musicxml(xml: &str) -> Result<ParsedScore, AccordionError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut state = ReaderState::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = element_name(&e);
                state.open(&name, &e)?;
                state.path.push(name);
            }
            Event::Empty(e) => {
                let name = element_name(&e);
                state.open(&name, &e)?;
                state.path.push(name.clone());
                state.close(&name);
                state.path.pop();
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                state.text(text.trim())?;
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                state.close(&name);
                state.path.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    state.finish()
}

fn element_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart, name: &str) -> Result<Option<String>, AccordionError> {
    let attr = e
        .try_get_attribute(name)
        .map_err(|err| AccordionError::MalformedScore(err.to_string()))?;
    match attr {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

fn number(text: &str, what: &str) -> Result<f64, AccordionError> {
    text.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| AccordionError::MalformedScore(format!("invalid {}: '{}'", what, text)))
}

/// Semitone offset of a note step from C
fn step_semitone(step: &str) -> Option<i32> {
    match step {
        "C" => Some(0),
        "D" => Some(2),
        "E" => Some(4),
        "F" => Some(5),
        "G" => Some(7),
        "A" => Some(9),
        "B" => Some(11),
        _ => None,
    }
}

/// A `<note>` while it is being read
#[derive(Default)]
struct NoteDraft {
    step: Option<i32>,
    alter: f64,
    octave: Option<i32>,
    is_rest: bool,
    is_chord: bool,
    is_grace: bool,
    duration: f64,
    tie_start: bool,
    tie_stop: bool,
}

impl NoteDraft {
    fn midi(&self) -> Option<i32> {
        let step = self.step?;
        let octave = self.octave?;
        Some((octave + 1) * 12 + step + self.alter.round() as i32)
    }
}

/// A `<metronome>` while it is being read
#[derive(Default)]
struct MetronomeDraft {
    beat_unit: Option<String>,
    dotted: bool,
    per_minute: Option<f64>,
}

impl MetronomeDraft {
    /// Convert the marking to quarter notes per minute.
    fn quarter_bpm(&self) -> Option<f64> {
        let per_minute = self.per_minute?;
        let unit = match self.beat_unit.as_deref()? {
            "whole" => 4.0,
            "half" => 2.0,
            "quarter" => 1.0,
            "eighth" => 0.5,
            "16th" => 0.25,
            _ => return None,
        };
        let unit = if self.dotted { unit * 1.5 } else { unit };
        Some(per_minute * unit)
    }
}

struct ReaderState {
    path: Vec<String>,
    saw_root: bool,
    title: Option<String>,
    sound_tempo: Option<f64>,
    metronome_tempo: Option<f64>,
    metronome: Option<MetronomeDraft>,
    notes: Vec<SourceNote>,
    measure_count: usize,

    // Per part
    divisions: f64,
    measure_index: usize,
    measure_start: f64,
    cursor: f64,
    extent: f64,
    last_start: f64,
    pending_ties: HashMap<i32, usize>,
    note: Option<NoteDraft>,
    shift: f64,
}

impl Default for ReaderState {
    fn default() -> Self {
        Self {
            path: Vec::new(),
            saw_root: false,
            title: None,
            sound_tempo: None,
            metronome_tempo: None,
            metronome: None,
            notes: Vec::new(),
            measure_count: 0,
            divisions: 1.0,
            measure_index: 0,
            measure_start: 0.0,
            cursor: 0.0,
            extent: 0.0,
            last_start: 0.0,
            pending_ties: HashMap::new(),
            note: None,
            shift: 0.0,
        }
    }
}

impl ReaderState {
    fn current(&self) -> Option<&str> {
        self.path.last().map(String::as_str)
    }

    fn parent(&self) -> Option<&str> {
        self.path.len().checked_sub(2).map(|i| self.path[i].as_str())
    }

    fn open(&mut self, name: &str, e: &BytesStart) -> Result<(), AccordionError> {
        if self.path.is_empty() {
            match name {
                "score-partwise" => self.saw_root = true,
                "score-timewise" => {
                    return Err(AccordionError::MalformedScore(
                        "timewise MusicXML is not supported".to_string(),
                    ))
                }
                other => {
                    return Err(AccordionError::MalformedScore(format!(
                        "unexpected root element <{}>",
                        other
                    )))
                }
            }
        }

        match name {
            "part" => self.start_part(),
            "note" => self.note = Some(NoteDraft::default()),
            "backup" | "forward" => self.shift = 0.0,
            "metronome" => self.metronome = Some(MetronomeDraft::default()),
            "beat-unit-dot" => {
                if let Some(m) = self.metronome.as_mut() {
                    m.dotted = true;
                }
            }
            "sound" => {
                if self.sound_tempo.is_none() {
                    if let Some(tempo) = attribute(e, "tempo")? {
                        let bpm = number(&tempo, "tempo")?;
                        if bpm > 0.0 {
                            self.sound_tempo = Some(bpm);
                        }
                    }
                }
            }
            "rest" => {
                if let Some(n) = self.note.as_mut() {
                    n.is_rest = true;
                }
            }
            "chord" => {
                if let Some(n) = self.note.as_mut() {
                    n.is_chord = true;
                }
            }
            "grace" => {
                if let Some(n) = self.note.as_mut() {
                    n.is_grace = true;
                }
            }
            "tie" => {
                if let Some(kind) = attribute(e, "type")? {
                    if let Some(n) = self.note.as_mut() {
                        match kind.as_str() {
                            "start" => n.tie_start = true,
                            "stop" => n.tie_stop = true,
                            _ => {}
                        }
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<(), AccordionError> {
        if text.is_empty() {
            return Ok(());
        }
        let Some(current) = self.current().map(str::to_owned) else {
            return Ok(());
        };
        let parent = self.parent().map(str::to_owned);

        match (current.as_str(), parent.as_deref()) {
            ("work-title", _) | ("movement-title", _) => {
                if self.title.is_none() {
                    self.title = Some(text.to_string());
                }
            }
            ("divisions", Some("attributes")) => {
                let divisions = number(text, "divisions")?;
                if divisions > 0.0 {
                    self.divisions = divisions;
                }
            }
            ("step", Some("pitch")) => {
                let step = step_semitone(text)
                    .ok_or_else(|| AccordionError::MalformedScore(format!("invalid step: '{}'", text)))?;
                if let Some(n) = self.note.as_mut() {
                    n.step = Some(step);
                }
            }
            ("alter", Some("pitch")) => {
                let alter = number(text, "alter")?;
                if let Some(n) = self.note.as_mut() {
                    n.alter = alter;
                }
            }
            ("octave", Some("pitch")) => {
                let octave = number(text, "octave")? as i32;
                if let Some(n) = self.note.as_mut() {
                    n.octave = Some(octave);
                }
            }
            ("duration", Some("note")) => {
                let duration = number(text, "duration")?;
                if let Some(n) = self.note.as_mut() {
                    n.duration = duration;
                }
            }
            ("duration", Some("backup")) | ("duration", Some("forward")) => {
                self.shift = number(text, "duration")?;
            }
            ("beat-unit", Some("metronome")) => {
                if let Some(m) = self.metronome.as_mut() {
                    m.beat_unit = Some(text.to_string());
                }
            }
            ("per-minute", Some("metronome")) => {
                let per_minute = number(text, "per-minute")?;
                if let Some(m) = self.metronome.as_mut() {
                    m.per_minute = Some(per_minute);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &str) {
        match name {
            "note" => {
                if let Some(draft) = self.note.take() {
                    self.finish_note(draft);
                }
            }
            "backup" => {
                self.cursor = (self.cursor - self.shift / self.divisions).max(0.0);
            }
            "forward" => {
                self.cursor += self.shift / self.divisions;
                self.extent = self.extent.max(self.cursor);
            }
            "metronome" => {
                if let Some(m) = self.metronome.take() {
                    if self.metronome_tempo.is_none() {
                        self.metronome_tempo = m.quarter_bpm().filter(|bpm| *bpm > 0.0);
                    }
                }
            }
            "measure" => {
                self.measure_start += self.extent.max(self.cursor);
                self.measure_index += 1;
                self.cursor = 0.0;
                self.extent = 0.0;
                self.last_start = self.measure_start;
                self.measure_count = self.measure_count.max(self.measure_index);
            }
            _ => {}
        }
    }

    fn start_part(&mut self) {
        self.divisions = 1.0;
        self.measure_index = 0;
        self.measure_start = 0.0;
        self.cursor = 0.0;
        self.extent = 0.0;
        self.last_start = 0.0;
        self.pending_ties.clear();
    }

    fn finish_note(&mut self, draft: NoteDraft) {
        if draft.is_grace {
            return;
        }

        let duration = draft.duration / self.divisions;
        let start = if draft.is_chord {
            self.last_start
        } else {
            let start = self.measure_start + self.cursor;
            self.last_start = start;
            self.cursor += duration;
            self.extent = self.extent.max(self.cursor);
            start
        };

        let pitch = if draft.is_rest { None } else { draft.midi() };

        if draft.tie_stop {
            if let Some(p) = pitch {
                if let Some(&idx) = self.pending_ties.get(&p) {
                    self.notes[idx].duration += duration;
                    if !draft.tie_start {
                        self.pending_ties.remove(&p);
                    }
                    return;
                }
            }
        }

        let measure_number = self.measure_index + 1;
        let note = match pitch {
            Some(p) => SourceNote::note(p, start, duration, measure_number),
            None => SourceNote {
                pitch: None,
                is_rest: draft.is_rest,
                start_time: start,
                duration,
                measure_number,
            },
        };
        self.notes.push(note);

        if draft.tie_start {
            if let Some(p) = pitch {
                self.pending_ties.insert(p, self.notes.len() - 1);
            }
        }
    }

    fn finish(self) -> Result<ParsedScore, AccordionError> {
        if !self.saw_root {
            return Err(AccordionError::MalformedScore(
                "no <score-partwise> element found".to_string(),
            ));
        }

        Ok(ParsedScore {
            title: self.title,
            tempo: self.sound_tempo.or(self.metronome_tempo),
            measure_count: self.measure_count,
            notes: self.notes,
        })
    }
}
