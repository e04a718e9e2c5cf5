//! Monotonic time sources
//!
//! Reaction times are measured in ticks of a monotonic counter with a fixed
//! frequency, never wall-clock time.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;
use thiserror::Error;

/// Raw reading of a monotonic counter
pub type Ticks = u64;

/// Failure to read the monotonic counter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    /// The counter no longer fits in a tick value
    #[error("monotonic counter overflowed")]
    Overflow,
}

/// A monotonic counter with a fixed reporting frequency
pub trait Clock {
    /// Current counter value
    fn now(&self) -> Result<Ticks, ClockError>;

    /// Counter frequency in ticks per second
    fn ticks_per_second(&self) -> u64;

    /// Milliseconds between two readings
    fn elapsed_ms(&self, start: Ticks, end: Ticks) -> f64 {
        end.saturating_sub(start) as f64 / self.ticks_per_second() as f64 * 1000.0
    }

    /// Convert milliseconds to ticks at this clock's frequency, `None` on
    /// overflow
    fn ms_to_ticks(&self, ms: u64) -> Option<Ticks> {
        ms.checked_mul(self.ticks_per_second()).map(|t| t / 1000)
    }
}

/// Nanosecond counter anchored at creation
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Result<Ticks, ClockError> {
        u64::try_from(self.origin.elapsed().as_nanos()).map_err(|_| ClockError::Overflow)
    }

    fn ticks_per_second(&self) -> u64 {
        1_000_000_000
    }
}

/// Hand-driven clock counting in microseconds.
///
/// Clones share the same counter, so a test can keep one handle and give
/// another to the scheduler and the app.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_us: Rc<Cell<Ticks>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward
    pub fn advance_ms(&self, ms: u64) {
        self.advance_us(ms * 1000);
    }

    pub fn advance_us(&self, us: u64) {
        self.now_us.set(self.now_us.get() + us);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Result<Ticks, ClockError> {
        Ok(self.now_us.get())
    }

    fn ticks_per_second(&self) -> u64 {
        1_000_000
    }
}
