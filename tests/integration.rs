//! Integration tests for Reaction Time Tester
//!
//! These tests drive the full App pipeline: input through the arbiter, the
//! trial machine and the timer queue, on a hand-driven clock.

use crossterm::event::{
    Event, KeyCode as TermKey, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers,
};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use ratatui::layout::Rect;
use reaction_time_tester::clock::ManualClock;
use reaction_time_tester::config::{Config, EntryPolicy};
use reaction_time_tester::input::terminal::{
    translate, InputWiring, KeyboardSource, MouseSource, TerminalAction,
};
use reaction_time_tester::input::{InputEvent, KeyCode, KeyEventType};
use reaction_time_tester::scheduler::TimerTag;
use reaction_time_tester::trial::TrialPhase;
use reaction_time_tester::trial_log::TrialLog;
use reaction_time_tester::ui::App;
use std::fs;

type TestApp = App<ManualClock, StdRng>;

const KEY_A: KeyCode = KeyCode(30);
const KEY_S: KeyCode = KeyCode(31);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn config(min_delay_ms: u64, max_delay_ms: u64, averaging_window: usize) -> Config {
    let mut config = Config::default();
    config.delays.min_delay_ms = min_delay_ms;
    config.delays.max_delay_ms = max_delay_ms;
    config.delays.virtual_debounce_ms = 0;
    config.trial.averaging_window = averaging_window;
    config
}

fn started(config: Config) -> (ManualClock, TestApp) {
    let clock = ManualClock::new();
    let mut app = App::with_parts(config, clock.clone(), StdRng::seed_from_u64(11));
    app.start().unwrap();
    (clock, app)
}

fn input(app: &mut TestApp, event: InputEvent) {
    app.process_input(&event).unwrap();
}

/// Press and release a key
fn tap(app: &mut TestApp, key: KeyCode) {
    input(app, InputEvent::key_press(key));
    input(app, InputEvent::key_release(key));
}

/// Advance the clock and deliver due timers
fn advance(clock: &ManualClock, app: &mut TestApp, ms: u64) {
    clock.advance_ms(ms);
    app.fire_due_timers().unwrap();
}

/// From READY or RESULT, run one trial with a fixed 1000 ms cue and respond
/// after `reaction_ms`
fn trial(clock: &ManualClock, app: &mut TestApp, reaction_ms: u64) {
    if app.phase() != TrialPhase::Ready {
        tap(app, KEY_A);
    }
    advance(clock, app, 1000);
    assert_eq!(app.phase(), TrialPhase::React);
    advance(clock, app, reaction_ms);
    tap(app, KEY_A);
    assert_eq!(app.phase(), TrialPhase::Result);
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn scenario_a_single_trial() {
    let (clock, mut app) = started(config(1000, 1000, 3));
    assert_eq!(app.phase(), TrialPhase::Initial);

    tap(&mut app, KEY_A);
    assert_eq!(app.phase(), TrialPhase::Ready);

    advance(&clock, &mut app, 999);
    assert_eq!(app.phase(), TrialPhase::Ready);
    advance(&clock, &mut app, 1);
    assert_eq!(app.phase(), TrialPhase::React);

    advance(&clock, &mut app, 250);
    tap(&mut app, KEY_A);

    let recorder = app.machine().recorder();
    assert_eq!(app.phase(), TrialPhase::Result);
    assert!((recorder.window()[0] - 250.0).abs() < 1e-9);
    assert_eq!(recorder.current_attempt(), 1);
    assert!(app.timers().is_empty());
}

#[test]
fn scenario_b_early_click_auto_resets() {
    let mut cfg = config(1000, 1000, 3);
    cfg.delays.early_reset_delay_ms = 500;
    let (clock, mut app) = started(cfg);

    tap(&mut app, KEY_A);
    tap(&mut app, KEY_S);
    assert_eq!(app.phase(), TrialPhase::Early);
    assert_eq!(app.timers().pending_tags(), vec![TimerTag::EarlyReset]);

    advance(&clock, &mut app, 499);
    assert_eq!(app.phase(), TrialPhase::Early);
    advance(&clock, &mut app, 1);
    assert_eq!(app.phase(), TrialPhase::Ready);
    assert_eq!(app.timers().pending_tags(), vec![TimerTag::React]);
    assert_eq!(app.machine().trial_iteration(), 0);
}

#[test]
fn scenario_c_window_wraps() {
    let (clock, mut app) = started(config(1000, 1000, 2));
    tap(&mut app, KEY_A);

    trial(&clock, &mut app, 100);
    trial(&clock, &mut app, 200);
    assert_eq!(app.machine().recorder().average(), Some(150.0));
    assert_eq!(
        app.view().lines[1],
        "Average (last 2): 150.00ms".to_string()
    );

    trial(&clock, &mut app, 300);
    let recorder = app.machine().recorder();
    assert_eq!(recorder.window(), &[300.0, 0.0]);
    assert_eq!(recorder.current_attempt(), 1);
    assert_eq!(recorder.average(), Some(300.0));
    assert_eq!(app.machine().trial_iteration(), 3);
}

#[test]
fn scenario_d_mouse_outside_signal_area() {
    let (_clock, mut app) = started(config(1000, 1000, 3));
    tap(&mut app, KEY_A);
    assert_eq!(app.phase(), TrialPhase::Ready);

    input(&mut app, InputEvent::Pointer { inside: false });
    input(&mut app, InputEvent::MouseButton(KeyEventType::Press));
    assert_eq!(app.phase(), TrialPhase::Ready);
    assert_eq!(app.machine().recorder().current_attempt(), 0);

    // Same click once the pointer is back inside
    input(&mut app, InputEvent::MouseButton(KeyEventType::Release));
    input(&mut app, InputEvent::Pointer { inside: true });
    input(&mut app, InputEvent::MouseButton(KeyEventType::Press));
    assert_eq!(app.phase(), TrialPhase::Early);
}

// ---------------------------------------------------------------------------
// Suppression and edge detection
// ---------------------------------------------------------------------------

#[test]
fn activations_during_debounce_change_nothing() {
    let mut cfg = config(1000, 1000, 3);
    cfg.delays.virtual_debounce_ms = 80;
    let (clock, mut app) = started(cfg);

    tap(&mut app, KEY_A);
    advance(&clock, &mut app, 1000);
    advance(&clock, &mut app, 180);
    tap(&mut app, KEY_A);
    assert_eq!(app.phase(), TrialPhase::Result);

    for _ in 0..20 {
        tap(&mut app, KEY_S);
        input(&mut app, InputEvent::Pointer { inside: true });
        input(&mut app, InputEvent::MouseButton(KeyEventType::Press));
        input(&mut app, InputEvent::MouseButton(KeyEventType::Release));
    }
    assert_eq!(app.phase(), TrialPhase::Result);
    assert_eq!(app.machine().recorder().current_attempt(), 1);
    assert_eq!(app.machine().trial_iteration(), 1);

    advance(&clock, &mut app, 80);
    tap(&mut app, KEY_S);
    assert_eq!(app.phase(), TrialPhase::Ready);
}

#[test]
fn held_key_polled_many_times_counts_once() {
    let (clock, mut app) = started(config(1000, 1000, 3));
    tap(&mut app, KEY_A);
    advance(&clock, &mut app, 1000);
    advance(&clock, &mut app, 150);

    for _ in 0..100 {
        input(&mut app, InputEvent::KeyboardPoll(vec![KEY_A]));
    }
    // One trial recorded, the held key did not start another cycle
    assert_eq!(app.phase(), TrialPhase::Result);
    assert_eq!(app.machine().trial_iteration(), 1);

    input(&mut app, InputEvent::KeyboardPoll(vec![]));
    input(&mut app, InputEvent::KeyboardPoll(vec![KEY_A]));
    assert_eq!(app.phase(), TrialPhase::Ready);
}

#[test]
fn non_alphanumeric_keys_never_respond() {
    let (_clock, mut app) = started(config(1000, 1000, 3));
    // Space, Enter, Esc
    for code in [57, 28, 1] {
        tap(&mut app, KeyCode(code));
    }
    assert_eq!(app.phase(), TrialPhase::Initial);
}

// ---------------------------------------------------------------------------
// Terminal and background input
// ---------------------------------------------------------------------------

/// Route one terminal event the way the event loop does
fn feed_terminal(app: &mut TestApp, event: &Event, wiring: &InputWiring) {
    for action in translate(event, wiring, Rect::new(0, 0, 80, 23)) {
        match action {
            TerminalAction::Input(event) => input(app, event),
            TerminalAction::HeldPress(key) => app.process_held_press(key).unwrap(),
            other => panic!("unexpected action {:?}", other),
        }
    }
}

fn legacy_press(c: char) -> Event {
    Event::Key(KeyEvent {
        code: TermKey::Char(c),
        modifiers: KeyModifiers::NONE,
        kind: KeyEventKind::Press,
        state: KeyEventState::NONE,
    })
}

#[test]
fn held_key_without_release_events_activates_once() {
    let mut cfg = Config::default();
    cfg.delays.min_delay_ms = 5000;
    cfg.delays.max_delay_ms = 5000;
    let (clock, mut app) = started(cfg);
    let wiring = InputWiring {
        keyboard: KeyboardSource::Terminal { releases: false },
        mouse: MouseSource::Terminal,
    };

    // Auto-repeat every 33 ms, each repeat a fresh press
    let mut phases = Vec::new();
    for _ in 0..12 {
        feed_terminal(&mut app, &legacy_press('a'), &wiring);
        phases.push(app.phase());
        advance(&clock, &mut app, 33);
    }
    assert_eq!(phases, vec![TrialPhase::Ready; 12]);
    assert_eq!(app.arbiter().suppressed_count(), 0);

    // Released once the repeats have stopped for the hold period
    advance(&clock, &mut app, 600);
    assert!(!app.arbiter().is_key_down(KEY_A));
    feed_terminal(&mut app, &legacy_press('a'), &wiring);
    assert_eq!(app.phase(), TrialPhase::Early);
}

#[test]
fn background_samples_never_activate() {
    let (_clock, mut app) = started(config(1000, 1000, 3));
    input(&mut app, InputEvent::Pointer { inside: true });

    // Pointer left the terminal unseen, then a click and typing elsewhere
    input(&mut app, InputEvent::MouseResync { left_pressed: true });
    input(&mut app, InputEvent::KeyboardResync(vec![KEY_A]));
    assert_eq!(app.phase(), TrialPhase::Initial);

    // A terminal key event triggers the poll that counts
    input(&mut app, InputEvent::KeyboardPoll(vec![KEY_A]));
    assert_eq!(app.phase(), TrialPhase::Ready);

    input(&mut app, InputEvent::KeyboardResync(vec![KEY_A]));
    input(&mut app, InputEvent::KeyboardPoll(vec![KEY_A]));
    assert_eq!(app.phase(), TrialPhase::Ready);

    input(&mut app, InputEvent::KeyboardResync(vec![]));
    input(&mut app, InputEvent::KeyboardPoll(vec![KEY_A]));
    assert_eq!(app.phase(), TrialPhase::Early);
}

// ---------------------------------------------------------------------------
// Timers and entry policy
// ---------------------------------------------------------------------------

#[test]
fn early_without_auto_reset_waits_for_input() {
    let mut cfg = config(1000, 1000, 3);
    cfg.delays.early_reset_delay_ms = 0;
    let (clock, mut app) = started(cfg);

    tap(&mut app, KEY_A);
    tap(&mut app, KEY_A);
    assert_eq!(app.phase(), TrialPhase::Early);
    assert!(app.timers().is_empty());

    advance(&clock, &mut app, 60_000);
    assert_eq!(app.phase(), TrialPhase::Early);

    tap(&mut app, KEY_A);
    assert_eq!(app.phase(), TrialPhase::Ready);
}

#[test]
fn cancelled_cue_never_fires_into_early() {
    let mut cfg = config(1000, 1000, 3);
    cfg.delays.early_reset_delay_ms = 5000;
    let (clock, mut app) = started(cfg);

    tap(&mut app, KEY_A);
    advance(&clock, &mut app, 900);
    tap(&mut app, KEY_A);
    advance(&clock, &mut app, 200);
    assert_eq!(app.phase(), TrialPhase::Early);
}

#[test]
fn auto_start_arms_cue_without_input() {
    let mut cfg = config(1000, 1000, 3);
    cfg.trial.entry = EntryPolicy::AutoStart;
    let (clock, mut app) = started(cfg);

    assert_eq!(app.phase(), TrialPhase::Ready);
    advance(&clock, &mut app, 1000);
    assert_eq!(app.phase(), TrialPhase::React);
}

#[test]
fn staged_arming_waits_for_both_delays() {
    let mut cfg = config(1000, 1000, 3);
    cfg.delays.staged_arming = true;
    let (clock, mut app) = started(cfg);

    tap(&mut app, KEY_A);
    assert_eq!(app.timers().pending_tags(), vec![TimerTag::Ready]);

    advance(&clock, &mut app, 1000);
    assert_eq!(app.phase(), TrialPhase::Ready);
    assert_eq!(app.timers().pending_tags(), vec![TimerTag::React]);

    advance(&clock, &mut app, 1000);
    assert_eq!(app.phase(), TrialPhase::React);
}

#[test]
fn random_delays_stay_in_range() {
    let (clock, mut app) = started(config(1000, 3000, 5));
    tap(&mut app, KEY_A);

    for _ in 0..20 {
        let wait = app.next_deadline().unwrap().unwrap();
        assert!(wait.as_millis() >= 1000 && wait.as_millis() <= 3000);

        // Respond early, then come back to READY
        tap(&mut app, KEY_A);
        tap(&mut app, KEY_A);
        assert_eq!(app.phase(), TrialPhase::Ready);
        clock.advance_ms(1);
    }
}

// ---------------------------------------------------------------------------
// Trial log
// ---------------------------------------------------------------------------

#[test]
fn trials_are_appended_to_the_log() {
    let dir = std::env::temp_dir().join(format!(
        "reaction-time-tester-integration-{}",
        std::process::id()
    ));
    let (clock, mut app) = started(config(1000, 1000, 3));
    app.attach_trial_log(TrialLog::create(&dir).unwrap());

    tap(&mut app, KEY_A);
    trial(&clock, &mut app, 200);
    trial(&clock, &mut app, 300);

    let path = app.trial_log().unwrap().path().to_path_buf();
    let contents = fs::read_to_string(&path).unwrap();
    assert_eq!(contents, "Trial 1: 200.000000\nTrial 2: 300.000000\n");

    let _ = fs::remove_dir_all(&dir);
}
