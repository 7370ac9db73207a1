//! Session scheduling engine
//!
//! Turns a [`SessionPlan`] into timed actions on the shared [`TaskQueue`] and
//! performs them as the host pumps the queue.

use super::host::{Host, NoteRelease, PlayRequest, SoundHandle, StopMode};
use super::timer::{CancelToken, TaskQueue};
use super::types::{NoteKey, PlanEvents, SessionKind, SessionPlan, SessionState, StopReason};
use crate::config::PlayerConfig;
use crate::error::AccordionError;
use crate::playback::ScoreEvent;
use crate::recording::RecordedEvent;
use crate::tuning::{ButtonId, Direction};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Envelope and timing constants copied out of the configuration
#[derive(Debug, Clone, Copy)]
struct Timing {
    gain: f64,
    note_fade: f64,
    stop_fade: f64,
    release_fade: f64,
    lookahead: f64,
    progress_interval: f64,
    loop_padding: f64,
    end_padding: f64,
    min_segment: f64,
    position_hide_delay: f64,
}

impl From<&PlayerConfig> for Timing {
    fn from(config: &PlayerConfig) -> Self {
        Self {
            gain: config.sustain_gain,
            note_fade: config.note_fade,
            stop_fade: config.stop_fade,
            release_fade: config.release_fade,
            lookahead: config.lookahead,
            progress_interval: config.progress_interval,
            loop_padding: config.loop_padding,
            end_padding: config.end_padding,
            min_segment: config.min_segment,
            position_hide_delay: config.position_hide_delay,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Action {
    /// Hand a score note to the sound trigger (fires `lookahead` early)
    StartNote(usize),
    /// Highlight a score note's button and move the score cursor
    PressNote(usize),
    /// Un-highlight a score note's button and forget its sound
    NoteOff(usize),
    HidePosition,
    /// Replay one recorded event
    Recorded(usize),
    Progress,
    SegmentEnd,
}

#[derive(Debug, Clone, Copy)]
struct Task {
    kind: SessionKind,
    action: Action,
}

#[derive(Debug, Default)]
struct Session {
    state: SessionState,
    plan: Option<SessionPlan>,
    /// Audio time of 0 s on the plan's timeline
    origin: f64,
    /// Audio time the session started; progress is measured from here, not
    /// from `origin`
    anchor: f64,
    tokens: HashSet<CancelToken>,
    sounds: BTreeMap<NoteKey, SoundHandle>,
    pressed: BTreeSet<ButtonId>,
    bellows: Direction,
}

impl Session {
    fn trigger_time(&self, plan_time: f64) -> f64 {
        let speed = self.plan.as_ref().map_or(1.0, |plan| plan.speed);
        self.origin + plan_time / speed
    }
}

/// Plays score and recording sessions against the audio clock.
///
/// The scheduler owns a single queue for both session kinds; every action it
/// queues is remembered by the session that created it so [`Scheduler::stop`]
/// can cancel all of them at once. Nothing happens between calls: the host
/// must call [`Scheduler::pump`] regularly (every animation frame is enough,
/// sound starts are handed over ahead of time with their exact start time).
#[derive(Debug)]
pub struct Scheduler {
    timing: Timing,
    queue: TaskQueue<Task>,
    score: Session,
    recording: Session,
    /// Last bellows direction a replayed recording switched to, not yet
    /// collected by the owner of the live bellows
    bellows_change: Option<Direction>,
}

impl Scheduler {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            timing: Timing::from(config),
            queue: TaskQueue::new(),
            score: Session::default(),
            recording: Session::default(),
            bellows_change: None,
        }
    }

    /// Bellows direction recording playback switched to since the last call.
    /// The owner of the live bellows adopts it.
    pub fn take_bellows_change(&mut self) -> Option<Direction> {
        self.bellows_change.take()
    }

    /// Apply new timing constants. Running sessions keep the envelopes they
    /// were started with until they restart.
    pub fn set_config(&mut self, config: &PlayerConfig) {
        self.timing = Timing::from(config);
    }

    pub fn state(&self, kind: SessionKind) -> SessionState {
        self.session(kind).state
    }

    pub fn is_active(&self, kind: SessionKind) -> bool {
        self.state(kind) != SessionState::Idle
    }

    pub fn any_active(&self) -> bool {
        self.is_active(SessionKind::Score) || self.is_active(SessionKind::Recording)
    }

    /// Plan of the running session of `kind`
    pub fn plan(&self, kind: SessionKind) -> Option<&SessionPlan> {
        self.session(kind).plan.as_ref()
    }

    /// Turn looping on or off for a running session. Takes effect at the end
    /// of the current pass.
    pub fn set_looping(&mut self, kind: SessionKind, looping: bool) {
        if let Some(plan) = self.session_mut(kind).plan.as_mut() {
            plan.looping = looping;
        }
    }

    /// Actions waiting in the queue
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Audio time of the next action, for hosts that sleep between pumps
    pub fn next_due(&self) -> Option<f64> {
        self.queue.next_due()
    }

    /// Start a session.
    ///
    /// Both session kinds are stopped first. On error nothing is stopped and
    /// nothing is scheduled.
    pub fn start(&mut self, host: &mut Host<'_>, plan: SessionPlan) -> Result<(), AccordionError> {
        if !host.clock.is_running() {
            return Err(AccordionError::AudioNotReady);
        }
        if !plan.speed.is_finite() || plan.speed <= 0.0 {
            return Err(AccordionError::InvalidSpeed(plan.speed));
        }
        if plan.is_empty() {
            return Err(AccordionError::EmptySegment(format!(
                "{:.1}s - {:.1}s",
                plan.segment.start, plan.segment.end
            )));
        }

        self.stop_all(host, StopReason::Superseded);
        self.launch(host, plan);
        Ok(())
    }

    fn launch(&mut self, host: &mut Host<'_>, plan: SessionPlan) {
        let now = host.now();
        let timing = self.timing;
        let kind = plan.kind();
        let speed = plan.speed;
        let origin = now - plan.segment.start / speed;
        let scaled_duration = plan.scaled_duration();

        let queue = &mut self.queue;
        let mut tokens = HashSet::new();
        let mut schedule = |at: f64, action: Action| {
            tokens.insert(queue.schedule(at, Task { kind, action }));
        };

        let bellows = match &plan.events {
            PlanEvents::Score { events, .. } => {
                for (index, event) in events.iter().enumerate() {
                    if event.button_id.as_str().is_empty() {
                        continue;
                    }
                    let trigger = origin + event.start_time / speed;
                    let end = trigger + event.duration / speed;

                    schedule(trigger - timing.lookahead, Action::StartNote(index));
                    schedule(trigger, Action::PressNote(index));
                    schedule(end, Action::NoteOff(index));
                    schedule(end + timing.position_hide_delay, Action::HidePosition);
                }
                Direction::default()
            }
            PlanEvents::Recording { events, bellows } => {
                for (index, event) in events.iter().enumerate() {
                    schedule(origin + event.time() / speed, Action::Recorded(index));
                }
                *bellows
            }
        };

        let padding = if plan.looping {
            timing.loop_padding
        } else {
            timing.end_padding
        };
        schedule(now, Action::Progress);
        schedule(now + scaled_duration.max(timing.min_segment) + padding, Action::SegmentEnd);

        log::info!(target: "Scheduler",
            "Starting {} session: {} events, {:.3}s - {:.3}s at {:.2}x{}",
            kind, plan.len(), plan.segment.start, plan.segment.end, speed,
            if plan.looping { ", looping" } else { "" });

        host.out.show_progress(0.0, scaled_duration);
        host.out.show_status(&plan.status());

        *self.session_mut(kind) = Session {
            state: SessionState::Scheduled,
            plan: Some(plan),
            origin,
            anchor: now,
            tokens,
            sounds: BTreeMap::new(),
            pressed: BTreeSet::new(),
            bellows,
        };
    }

    /// Stop a session: cancel everything it still has queued, fade out what it
    /// is playing and clear its highlights. Returns false if it was idle.
    pub fn stop(&mut self, host: &mut Host<'_>, kind: SessionKind, reason: StopReason) -> bool {
        let now = host.now();
        let timing = self.timing;
        let session = match kind {
            SessionKind::Score => &mut self.score,
            SessionKind::Recording => &mut self.recording,
        };
        if session.state == SessionState::Idle {
            return false;
        }

        let session = std::mem::take(session);
        let canceled = self.queue.cancel_all(session.tokens);

        for handle in session.sounds.into_values() {
            host.out.stop(handle, StopMode::Fade(timing.stop_fade), now);
        }
        for button in &session.pressed {
            host.out.show_released(button);
        }
        if kind == SessionKind::Score {
            host.out.hide_score_position();
        }

        let total = session.plan.as_ref().map_or(0.0, SessionPlan::scaled_duration);
        host.out.show_progress(0.0, total);
        if reason.is_final() {
            host.out.show_status(match kind {
                SessionKind::Score => "Music playback stopped.",
                SessionKind::Recording => "Recording playback stopped.",
            });
        }

        log::info!(target: "Scheduler",
            "Stopped {} session ({}), {} pending actions canceled", kind, reason, canceled);
        true
    }

    /// Stop both sessions. Returns true if either was active.
    pub fn stop_all(&mut self, host: &mut Host<'_>, reason: StopReason) -> bool {
        let score = self.stop(host, SessionKind::Score, reason);
        let recording = self.stop(host, SessionKind::Recording, reason);
        score || recording
    }

    /// Perform every action that is due. Returns how many ran.
    pub fn pump(&mut self, host: &mut Host<'_>) -> usize {
        let now = host.now();
        let mut fired = 0;

        while let Some((token, task)) = self.queue.pop_due(now) {
            let session = self.session_mut(task.kind);
            if !session.tokens.remove(&token) {
                continue;
            }
            if session.state == SessionState::Scheduled {
                session.state = SessionState::Running;
            }
            self.fire(host, task, now);
            fired += 1;
        }

        fired
    }

    fn fire(&mut self, host: &mut Host<'_>, task: Task, now: f64) {
        let timing = self.timing;
        let kind = task.kind;

        match task.action {
            Action::SegmentEnd => {
                let session = self.session(kind);
                let Some(mut plan) = session.plan.clone() else {
                    return;
                };
                // The next pass starts from the bellows the display shows now
                if let PlanEvents::Recording { bellows, .. } = &mut plan.events {
                    *bellows = session.bellows;
                }
                if plan.looping {
                    log::debug!(target: "Scheduler", "Looping {} segment", kind);
                    self.stop(host, kind, StopReason::Looped);
                    self.launch(host, plan);
                } else {
                    self.stop(host, kind, StopReason::Finished);
                }
            }
            Action::Progress => {
                let session = self.session_mut(kind);
                let total = session.plan.as_ref().map_or(0.0, SessionPlan::scaled_duration);
                let elapsed = (now - session.anchor).clamp(0.0, total);
                host.out.show_progress(elapsed, total);

                let token = self.queue.schedule(
                    now + timing.progress_interval,
                    Task {
                        kind,
                        action: Action::Progress,
                    },
                );
                self.session_mut(kind).tokens.insert(token);
            }
            Action::StartNote(index) => {
                let session = self.session_mut(kind);
                let Some(event) = score_event(session, index) else {
                    return;
                };
                let start_at = session.trigger_time(event.start_time);
                let end_at = session.trigger_time(event.end_time());
                let request = PlayRequest {
                    start_at,
                    gain: timing.gain,
                    release: Some(NoteRelease {
                        end_at,
                        fade: timing.note_fade.min(end_at - start_at),
                    }),
                    sustain_loop: false,
                };
                let button = event.button_id.clone();
                let direction = event.direction;
                match host.out.play(&button, direction, request) {
                    Some(handle) => {
                        session.sounds.insert(NoteKey::Event(index), handle);
                    }
                    None => log::warn!(target: "Scheduler",
                        "No sample for button {} ({})", button, direction),
                }
            }
            Action::PressNote(index) => {
                let session = self.session_mut(kind);
                let Some(event) = score_event(session, index) else {
                    return;
                };
                let (button, direction) = (event.button_id.clone(), event.direction);
                let (substituted, measure, time) = (event.was_substituted, event.measure_number, event.start_time);
                host.out.show_pressed(&button, direction, substituted);
                host.out.show_score_position(measure, time);
                session.pressed.insert(button);
            }
            Action::NoteOff(index) => {
                let session = self.session_mut(kind);
                let Some(button) = score_event(session, index).map(|event| event.button_id.clone()) else {
                    return;
                };
                host.out.show_released(&button);
                session.pressed.remove(&button);
                session.sounds.remove(&NoteKey::Event(index));
            }
            Action::HidePosition => host.out.hide_score_position(),
            Action::Recorded(index) => {
                let session = self.session_mut(kind);
                let event = match &session.plan {
                    Some(SessionPlan {
                        events: PlanEvents::Recording { events, .. },
                        ..
                    }) => events.get(index).cloned(),
                    _ => None,
                };
                if let Some(event) = event {
                    let before = session.bellows;
                    replay(session, host, &timing, &event);
                    let after = session.bellows;
                    if after != before {
                        self.bellows_change = Some(after);
                    }
                }
            }
        }
    }

    fn session(&self, kind: SessionKind) -> &Session {
        match kind {
            SessionKind::Score => &self.score,
            SessionKind::Recording => &self.recording,
        }
    }

    fn session_mut(&mut self, kind: SessionKind) -> &mut Session {
        match kind {
            SessionKind::Score => &mut self.score,
            SessionKind::Recording => &mut self.recording,
        }
    }
}

fn score_event(session: &Session, index: usize) -> Option<&ScoreEvent> {
    match &session.plan {
        Some(SessionPlan {
            events: PlanEvents::Score { events, .. },
            ..
        }) => events.get(index),
        _ => None,
    }
}

/// Perform one recorded event the way the player performed it live.
fn replay(session: &mut Session, host: &mut Host<'_>, timing: &Timing, event: &RecordedEvent) {
    let at = session.trigger_time(event.time());

    match event {
        RecordedEvent::Press { id, mode, .. } => {
            host.out.show_pressed(id, *mode, false);
            session.pressed.insert(id.clone());
            if *mode != session.bellows {
                change_bellows(session, host, timing, *mode, at);
            }
            restart_button(session, host, timing, id, at);
        }
        RecordedEvent::Release { id, .. } => {
            host.out.show_released(id);
            session.pressed.remove(id);
            if let Some(handle) = session.sounds.remove(&NoteKey::Button(id.clone())) {
                host.out.stop(handle, StopMode::Fade(timing.release_fade), at);
            }
        }
        RecordedEvent::Bellows { mode, .. } => change_bellows(session, host, timing, *mode, at),
    }
}

/// Switch the playback bellows and move every held button to the new reed.
fn change_bellows(session: &mut Session, host: &mut Host<'_>, timing: &Timing, mode: Direction, at: f64) {
    if mode == session.bellows {
        return;
    }
    log::debug!(target: "Scheduler", "Playback bellows now {}", mode);
    session.bellows = mode;
    host.out.show_bellows(mode);

    let held: Vec<ButtonId> = session
        .sounds
        .keys()
        .filter_map(|key| match key {
            NoteKey::Button(id) => Some(id.clone()),
            NoteKey::Event(_) => None,
        })
        .collect();
    for id in held {
        restart_button(session, host, timing, &id, at);
        host.out.show_pressed(&id, mode, false);
    }
}

/// Stop whatever the button is sounding and start it again in the current
/// bellows direction.
fn restart_button(session: &mut Session, host: &mut Host<'_>, timing: &Timing, id: &ButtonId, at: f64) {
    let key = NoteKey::Button(id.clone());
    if let Some(previous) = session.sounds.remove(&key) {
        host.out.stop(previous, StopMode::Fade(timing.release_fade), at);
    }

    let request = PlayRequest {
        start_at: at,
        gain: timing.gain,
        release: None,
        sustain_loop: false,
    };
    match host.out.play(id, session.bellows, request) {
        Some(handle) => {
            session.sounds.insert(key, handle);
        }
        None => log::warn!(target: "Scheduler",
            "No sample for button {} ({})", id, session.bellows),
    }
}
