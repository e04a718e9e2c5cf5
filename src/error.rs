//! Error types shared by the trial loop and the fatal error path

use crate::clock::ClockError;
use crate::scheduler::{SchedulerError, TimerTag};
use thiserror::Error;

/// Failures that stop the trial loop
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrialError {
    /// The performance counter could not be read
    #[error("failed to read the performance counter: {0}")]
    Clock(#[from] ClockError),
    /// A timer could not be scheduled
    #[error("failed to schedule {tag} timer: {source}")]
    Schedule {
        tag: TimerTag,
        source: SchedulerError,
    },
}

/// Surfaces failures that do not stop the trial loop
pub trait ErrorReporter {
    fn report(&mut self, message: &str);
}

/// Report an unrecoverable error and terminate the process.
///
/// The terminal must already be restored when this is called. Nothing runs
/// after it.
pub fn report_fatal(err: &anyhow::Error) -> ! {
    log::error!("fatal: {:#}", err);
    eprintln!("Error: {:#}", err);
    std::process::exit(1);
}
