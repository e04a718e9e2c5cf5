//! Reaction Time Tester - terminal reaction time measurement
//!
//! Shows a colored signal, switches it to the react color after a random
//! delay and measures how long the user takes to respond with a key press or
//! a mouse click. Keeps a fixed window of recent trials and their average.

pub mod clock;
pub mod config;
pub mod error;
pub mod input;
pub mod scheduler;
pub mod trial;
pub mod trial_log;
pub mod ui;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::Config;
