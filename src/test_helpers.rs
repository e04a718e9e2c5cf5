//! Shared test utilities
//!
//! Builds apps on a [`ManualClock`] with a seeded generator so timing and
//! delays are fully deterministic.

use crate::clock::ManualClock;
use crate::config::Config;
use crate::input::{InputEvent, KeyCode};
use crate::ui::App;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Default key used in tests (KeyCode 30 = 'A')
pub const DEFAULT_KEY: KeyCode = KeyCode(30);

/// Seed for every generator built here
pub const SEED: u64 = 42;

pub type TestApp = App<ManualClock, StdRng>;

/// Config with a fixed cue delay
pub fn fixed_delay_config(delay_ms: u64, averaging_window: usize) -> Config {
    let mut config = Config::default();
    config.delays.min_delay_ms = delay_ms;
    config.delays.max_delay_ms = delay_ms;
    config.trial.averaging_window = averaging_window;
    config
}

pub fn seeded_rng() -> StdRng {
    StdRng::seed_from_u64(SEED)
}

/// Started app plus a handle on its clock
pub fn started_app(config: Config) -> (ManualClock, TestApp) {
    let clock = ManualClock::new();
    let mut app = App::with_parts(config, clock.clone(), seeded_rng());
    app.start().unwrap();
    (clock, app)
}

/// Press and release a key
pub fn tap(app: &mut TestApp, key: KeyCode) {
    app.process_input(&InputEvent::key_press(key)).unwrap();
    app.process_input(&InputEvent::key_release(key)).unwrap();
}
