//! Reaction time capture and rolling window bookkeeping

use crate::clock::{Clock, ClockError, Ticks};

/// Stores measured reaction times in a fixed-capacity circular buffer.
///
/// Values are written at `current_attempt % averaging_window`. The buffer is
/// never grown; the window is cleared as a whole by [`TrialRecorder::reset`].
#[derive(Debug, Clone)]
pub struct TrialRecorder {
    /// Reaction times in milliseconds
    reaction_times: Box<[f64]>,
    /// Number of slots averaged
    averaging_window: usize,
    /// Trials recorded since the last reset
    current_attempt: usize,
    /// Most recent reaction time
    last_value: Option<f64>,
    /// Counter value when the react cue appeared
    start_time: Option<Ticks>,
    /// Counter value of the most recent response
    end_time: Option<Ticks>,
}

impl TrialRecorder {
    /// Create a recorder. The window is clamped to `1..=capacity`.
    pub fn new(capacity: usize, averaging_window: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            reaction_times: vec![0.0; capacity].into_boxed_slice(),
            averaging_window: averaging_window.clamp(1, capacity),
            current_attempt: 0,
            last_value: None,
            start_time: None,
            end_time: None,
        }
    }

    /// Capture the start of a trial
    pub fn begin(&mut self, clock: &dyn Clock) -> Result<(), ClockError> {
        self.start_time = Some(clock.now()?);
        self.end_time = None;
        Ok(())
    }

    /// Capture the response, store the elapsed time and return it in ms
    pub fn record(&mut self, clock: &dyn Clock) -> Result<f64, ClockError> {
        let end = clock.now()?;
        let start = match self.start_time.take() {
            Some(start) => start,
            None => {
                log::warn!("response recorded without a trial start");
                end
            }
        };
        self.end_time = Some(end);
        Ok(self.store(clock.elapsed_ms(start, end)))
    }

    /// Store a measured value in the next slot and advance the attempt count
    pub fn store(&mut self, value_ms: f64) -> f64 {
        let slot = self.current_attempt % self.averaging_window;
        self.reaction_times[slot] = value_ms;
        self.last_value = Some(value_ms);
        self.current_attempt += 1;
        value_ms
    }

    /// Mean of the recorded slots, `None` before the first trial
    pub fn average(&self) -> Option<f64> {
        let count = self.filled();
        if count == 0 {
            return None;
        }
        Some(self.reaction_times[..count].iter().sum::<f64>() / count as f64)
    }

    /// Clear the averaging window and the attempt count
    pub fn reset(&mut self) {
        self.reaction_times[..self.averaging_window].fill(0.0);
        self.current_attempt = 0;
    }

    /// Whether a full window has been recorded since the last reset
    pub fn window_complete(&self) -> bool {
        self.current_attempt >= self.averaging_window
    }

    /// Number of slots holding recorded values
    pub fn filled(&self) -> usize {
        self.current_attempt.min(self.averaging_window)
    }

    /// The averaging window slots
    pub fn window(&self) -> &[f64] {
        &self.reaction_times[..self.averaging_window]
    }

    pub fn current_attempt(&self) -> usize {
        self.current_attempt
    }

    pub fn averaging_window(&self) -> usize {
        self.averaging_window
    }

    pub fn capacity(&self) -> usize {
        self.reaction_times.len()
    }

    pub fn last(&self) -> Option<f64> {
        self.last_value
    }

    pub fn start_time(&self) -> Option<Ticks> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<Ticks> {
        self.end_time
    }
}
