use super::*;
use crate::config::PlayerConfig;
use crate::error::AccordionError;
use crate::playback::{ScoreEvent, Translation};
use crate::recording::{RecordedEvent, Recording};
use crate::tuning::{ButtonId, Direction};
use pretty_assertions::assert_eq;

struct Rig {
    clock: ManualClock,
    out: CommandBuffer,
    scheduler: Scheduler,
}

impl Rig {
    fn new() -> Self {
        Self {
            clock: ManualClock::new(10.0),
            out: CommandBuffer::new(),
            scheduler: Scheduler::new(&PlayerConfig::default()),
        }
    }

    fn start(&mut self, plan: SessionPlan) -> Result<(), AccordionError> {
        let mut host = Host::new(&self.clock, &mut self.out);
        self.scheduler.start(&mut host, plan)
    }

    fn stop_at(&mut self, time: f64, kind: SessionKind) -> bool {
        self.clock.set_time(time);
        let mut host = Host::new(&self.clock, &mut self.out);
        self.scheduler.stop(&mut host, kind, StopReason::Requested)
    }

    fn pump_at(&mut self, time: f64) -> usize {
        self.clock.set_time(time);
        let mut host = Host::new(&self.clock, &mut self.out);
        self.scheduler.pump(&mut host)
    }

    fn plays(&self) -> Vec<(ButtonId, Direction, f64, Option<f64>)> {
        self.out
            .commands()
            .iter()
            .filter_map(|command| match command {
                HostCommand::Play {
                    button,
                    direction,
                    start_at,
                    end_at,
                    ..
                } => Some((button.clone(), *direction, *start_at, *end_at)),
                _ => None,
            })
            .collect()
    }

    fn last_status(&self) -> Option<String> {
        self.out.commands().iter().rev().find_map(|command| match command {
            HostCommand::Status { message } => Some(message.clone()),
            _ => None,
        })
    }
}

fn note(start_time: f64, duration: f64, measure_number: usize, button: &str) -> ScoreEvent {
    ScoreEvent {
        start_time,
        duration,
        button_id: ButtonId::from(button),
        direction: Direction::Pull,
        resolved_pitch: 60,
        original_pitch: 60,
        was_substituted: false,
        measure_number,
    }
}

fn score_plan(events: Vec<ScoreEvent>, end: f64, speed: f64, looping: bool) -> SessionPlan {
    SessionPlan {
        events: PlanEvents::Score {
            events,
            measures: MeasureRange::new(1, 1),
            bounded: false,
        },
        segment: Segment { start: 0.0, end },
        speed,
        looping,
    }
}

fn recording_plan(events: Vec<RecordedEvent>) -> SessionPlan {
    let recording = Recording::from_events(events);
    let selection = select_recording_segment(&recording, None, None).unwrap();
    SessionPlan::recording(selection, Direction::Push, 1.0, false)
}

fn press(time: f64, id: &str, mode: Direction) -> RecordedEvent {
    RecordedEvent::Press {
        time,
        id: ButtonId::from(id),
        mode,
    }
}

fn release(time: f64, id: &str) -> RecordedEvent {
    RecordedEvent::Release {
        time,
        id: ButtonId::from(id),
    }
}

#[test]
fn test_segment_at_double_speed_then_stop() {
    let translation = Translation {
        events: vec![
            note(0.0, 1.0, 1, "B1"),
            note(2.0, 1.0, 2, "B2"),
            note(3.0, 2.0, 2, "B3"),
            note(5.0, 1.0, 3, "B4"),
        ],
        total_duration: 6.0,
        measure_count: 3,
        tempo: 120.0,
        dropped_notes: 0,
    };
    let selection =
        select_score_segment(&translation, &translation, Some(MeasureRange::new(2, 2)), true).unwrap();
    assert_eq!(selection.segment, Segment { start: 2.0, end: 5.0 });

    let mut rig = Rig::new();
    rig.start(SessionPlan::score(selection, 2.0, true)).unwrap();
    assert_eq!(rig.scheduler.state(SessionKind::Score), SessionState::Scheduled);

    // origin = 10 - 2.0 / 2.0, so the first note in range sounds right away
    rig.pump_at(10.0);
    assert_eq!(rig.scheduler.state(SessionKind::Score), SessionState::Running);
    assert_eq!(rig.plays(), vec![(ButtonId::from("B2"), Direction::Pull, 10.0, Some(10.5))]);

    rig.pump_at(10.5);
    assert_eq!(rig.plays().len(), 2);
    assert_eq!(rig.plays()[1], (ButtonId::from("B3"), Direction::Pull, 10.5, Some(11.5)));

    assert!(rig.stop_at(11.0, SessionKind::Score));
    assert_eq!(rig.scheduler.state(SessionKind::Score), SessionState::Idle);
    assert_eq!(rig.scheduler.pending(), 0);
    assert!(rig.out.sounding(11.1).is_empty());
    assert_eq!(rig.last_status().as_deref(), Some("Music playback stopped."));

    // Nothing fires late
    assert_eq!(rig.pump_at(20.0), 0);
    assert_eq!(rig.plays().len(), 2);
}

#[test]
fn test_sound_starts_ahead_with_exact_time() {
    let mut rig = Rig::new();
    rig.start(score_plan(vec![note(0.5, 0.5, 1, "B1")], 1.0, 1.0, false)).unwrap();

    rig.pump_at(10.45);
    assert_eq!(rig.plays(), vec![(ButtonId::from("B1"), Direction::Pull, 10.5, Some(11.0))]);
    assert!(!rig
        .out
        .commands()
        .iter()
        .any(|command| matches!(command, HostCommand::Pressed { .. })));

    rig.pump_at(10.5);
    let visuals: Vec<&HostCommand> = rig
        .out
        .commands()
        .iter()
        .filter(|command| matches!(command, HostCommand::Pressed { .. } | HostCommand::ScorePosition { .. }))
        .collect();
    assert_eq!(
        visuals,
        vec![
            &HostCommand::Pressed {
                button: ButtonId::from("B1"),
                direction: Direction::Pull,
                substituted: false
            },
            &HostCommand::ScorePosition { measure: 1, time: 0.5 },
        ]
    );
}

#[test]
fn test_note_off_releases_and_hides_position() {
    let mut rig = Rig::new();
    rig.start(score_plan(vec![note(0.0, 0.5, 1, "B1")], 0.5, 1.0, false)).unwrap();
    rig.pump_at(10.0);
    rig.out.take();

    rig.pump_at(10.5);
    assert!(rig.out.commands().contains(&HostCommand::Released {
        button: ButtonId::from("B1")
    }));
    assert!(!rig.out.commands().contains(&HostCommand::HideScorePosition));

    rig.pump_at(10.56);
    assert!(rig.out.commands().contains(&HostCommand::HideScorePosition));
}

#[test]
fn test_finishes_after_end_padding() {
    let mut rig = Rig::new();
    rig.start(score_plan(vec![note(0.0, 0.5, 1, "B1")], 0.5, 1.0, false)).unwrap();

    rig.pump_at(10.55);
    assert!(rig.scheduler.is_active(SessionKind::Score));

    rig.pump_at(10.61);
    assert!(!rig.scheduler.is_active(SessionKind::Score));
    assert_eq!(rig.scheduler.pending(), 0);
    assert_eq!(rig.last_status().as_deref(), Some("Music playback stopped."));
}

#[test]
fn test_loop_restarts_at_segment_end() {
    let mut rig = Rig::new();
    rig.start(score_plan(vec![note(0.0, 0.5, 1, "B1")], 1.0, 1.0, true)).unwrap();

    rig.pump_at(10.0);
    rig.pump_at(11.0);

    assert_eq!(rig.scheduler.state(SessionKind::Score), SessionState::Running);
    let starts: Vec<f64> = rig.plays().iter().map(|play| play.2).collect();
    assert_eq!(starts, vec![10.0, 11.0]);
    assert_eq!(rig.last_status().as_deref(), Some("Looping Music 1-1..."));
}

#[test]
fn test_loop_can_be_turned_off_while_running() {
    let mut rig = Rig::new();
    rig.start(score_plan(vec![note(0.0, 0.5, 1, "B1")], 1.0, 1.0, true)).unwrap();
    rig.pump_at(10.0);

    rig.scheduler.set_looping(SessionKind::Score, false);
    rig.pump_at(11.0);

    assert!(!rig.scheduler.is_active(SessionKind::Score));
    assert_eq!(rig.plays().len(), 1);
}

#[test]
fn test_progress_is_clamped_to_scaled_segment() {
    let mut rig = Rig::new();
    rig.start(score_plan(vec![note(0.0, 1.0, 1, "B1")], 1.0, 2.0, true)).unwrap();

    rig.pump_at(10.25);
    let progress = rig.out.commands().iter().rev().find_map(|command| match command {
        HostCommand::Progress { elapsed, total } => Some((*elapsed, *total)),
        _ => None,
    });
    assert_eq!(progress, Some((0.25, 0.5)));
}

#[test]
fn test_start_requires_running_audio() {
    let mut rig = Rig::new();
    rig.clock.set_running(false);

    let err = rig
        .start(score_plan(vec![note(0.0, 1.0, 1, "B1")], 1.0, 1.0, false))
        .unwrap_err();
    assert!(matches!(err, AccordionError::AudioNotReady));
    assert_eq!(rig.scheduler.pending(), 0);
    assert!(rig.out.commands().is_empty());
}

#[test]
fn test_start_rejects_bad_speed_and_empty_plan() {
    let mut rig = Rig::new();
    assert!(matches!(
        rig.start(score_plan(vec![note(0.0, 1.0, 1, "B1")], 1.0, 0.0, false)),
        Err(AccordionError::InvalidSpeed(_))
    ));
    assert!(matches!(
        rig.start(score_plan(Vec::new(), 1.0, 1.0, false)),
        Err(AccordionError::EmptySegment(_))
    ));
    assert!(!rig.scheduler.any_active());
}

#[test]
fn test_stop_when_idle_is_noop() {
    let mut rig = Rig::new();
    assert!(!rig.stop_at(10.0, SessionKind::Recording));
    assert!(rig.out.commands().is_empty());
}

#[test]
fn test_recording_start_supersedes_score() {
    let mut rig = Rig::new();
    rig.start(score_plan(vec![note(0.0, 2.0, 1, "B1")], 2.0, 1.0, false)).unwrap();
    rig.pump_at(10.0);
    assert_eq!(rig.out.sounding(10.5).len(), 1);

    rig.clock.set_time(10.5);
    rig.start(recording_plan(vec![press(0.0, "B9", Direction::Push), release(1.0, "B9")]))
        .unwrap();
    assert!(!rig.scheduler.is_active(SessionKind::Score));
    assert!(rig.scheduler.is_active(SessionKind::Recording));

    rig.pump_at(10.6);
    let sounding: Vec<ButtonId> = rig.out.sounding(10.6).into_iter().map(|(_, button)| button).collect();
    assert_eq!(sounding, vec![ButtonId::from("B9")]);
}

#[test]
fn test_recording_replays_bellows_changes() {
    let mut rig = Rig::new();
    rig.start(recording_plan(vec![
        press(0.0, "B1", Direction::Pull),
        RecordedEvent::Bellows {
            time: 0.5,
            mode: Direction::Push,
        },
        release(1.0, "B1"),
    ]))
    .unwrap();

    rig.pump_at(10.0);
    rig.pump_at(10.5);
    let directions: Vec<Direction> = rig.plays().iter().map(|play| play.1).collect();
    assert_eq!(directions, vec![Direction::Pull, Direction::Push]);
    assert_eq!(rig.out.sounding(10.6).len(), 1);

    rig.pump_at(11.0);
    assert!(rig.out.sounding(11.1).is_empty());
    assert!(rig.out.commands().contains(&HostCommand::Bellows {
        direction: Direction::Pull
    }));
}

#[test]
fn test_recording_window_timing() {
    let recording = Recording::from_events(vec![
        press(0.0, "B1", Direction::Push),
        release(1.0, "B1"),
        press(2.0, "B2", Direction::Push),
        release(3.0, "B2"),
    ]);
    let selection = select_recording_segment(&recording, Some(2.0), None).unwrap();

    let mut rig = Rig::new();
    rig.start(SessionPlan::recording(selection, Direction::Push, 2.0, false))
        .unwrap();

    // The first event in the window plays at once, the next 0.5s later at 2x
    rig.pump_at(10.0);
    assert_eq!(rig.plays(), vec![(ButtonId::from("B2"), Direction::Push, 10.0, None)]);
    rig.pump_at(10.5);
    assert!(rig.out.sounding(10.6).is_empty());
}

#[test]
fn test_missing_sample_is_skipped() {
    let mut rig = Rig::new();
    rig.out = CommandBuffer::new().without_sample("B1", Direction::Pull);
    rig.start(score_plan(vec![note(0.0, 0.5, 1, "B1")], 0.5, 1.0, false)).unwrap();

    rig.pump_at(10.0);
    assert!(rig.plays().is_empty());
    assert!(rig.out.commands().contains(&HostCommand::Pressed {
        button: ButtonId::from("B1"),
        direction: Direction::Pull,
        substituted: false
    }));
}

#[test]
fn test_progress_starts_empty_for_later_segment() {
    let mut rig = Rig::new();
    let mut plan = score_plan(vec![note(2.0, 2.0, 2, "B2")], 4.0, 1.0, true);
    plan.segment = Segment { start: 2.0, end: 4.0 };
    rig.start(plan).unwrap();

    rig.pump_at(10.5);
    let progress = rig.out.commands().iter().rev().find_map(|command| match command {
        HostCommand::Progress { elapsed, total } => Some((*elapsed, *total)),
        _ => None,
    });
    assert_eq!(progress, Some((0.5, 2.0)));
}

#[test]
fn test_recording_bellows_is_handed_over() {
    let recording = Recording::from_events(vec![
        press(0.0, "B1", Direction::Push),
        release(0.5, "B1"),
        RecordedEvent::Bellows {
            time: 1.0,
            mode: Direction::Pull,
        },
    ]);
    let selection = select_recording_segment(&recording, None, None).unwrap();

    let mut rig = Rig::new();
    rig.start(SessionPlan::recording(selection, Direction::Push, 1.0, false))
        .unwrap();
    rig.pump_at(10.0);
    assert_eq!(rig.scheduler.take_bellows_change(), None);

    rig.pump_at(11.0);
    assert_eq!(rig.scheduler.take_bellows_change(), Some(Direction::Pull));
    assert_eq!(rig.scheduler.take_bellows_change(), None);
}

#[test]
fn test_loop_restart_keeps_shown_bellows() {
    let recording = Recording::from_events(vec![
        press(0.0, "B1", Direction::Push),
        release(0.5, "B1"),
        RecordedEvent::Bellows {
            time: 1.0,
            mode: Direction::Pull,
        },
    ]);
    let selection = select_recording_segment(&recording, None, None).unwrap();

    let mut rig = Rig::new();
    rig.start(SessionPlan::recording(selection, Direction::Push, 1.0, true))
        .unwrap();
    rig.pump_at(10.0);
    rig.pump_at(10.5);

    // The pass ends on pull; the second pass presses B1 on push again
    rig.pump_at(11.0);
    let shown = rig.out.commands().iter().rev().find_map(|command| match command {
        HostCommand::Bellows { direction } => Some(*direction),
        _ => None,
    });
    let played = rig.plays().last().map(|play| play.1);
    assert_eq!(played, Some(Direction::Push));
    assert_eq!(shown, played);
    assert_eq!(rig.scheduler.take_bellows_change(), Some(Direction::Push));
}
