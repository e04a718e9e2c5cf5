//! Session controller
//!
//! Owns the trial machine, the input arbiter and the timer queue, and
//! executes the commands each transition returns. Every event is handled to
//! completion before the next one is looked at.

use super::ThemeColors;
use crate::clock::{Clock, MonotonicClock};
use crate::config::Config;
use crate::error::{ErrorReporter, TrialError};
use crate::input::{InputArbiter, InputEvent, KeyCode};
use crate::scheduler::{Scheduler, TimerHandle, TimerQueue, TimerTag};
use crate::trial::{Command, PhaseView, TrialEvent, TrialMachine, TrialPhase, Transition};
use crate::trial_log::{LogEntry, TrialLog};
use rand::rngs::StdRng;
use rand::Rng;
use ratatui::layout::Rect;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// How long a status message stays visible
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// Application running state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Running,
    Quitting,
}

/// Main application
pub struct App<C: Clock = MonotonicClock, R: Rng = StdRng> {
    /// Application state
    pub state: AppState,
    /// Configuration
    pub config: Config,
    /// Signal colors
    pub colors: ThemeColors,
    machine: TrialMachine<R>,
    arbiter: InputArbiter,
    timers: TimerQueue<C>,
    /// Pending timer per tag
    handles: HashMap<TimerTag, TimerHandle>,
    trial_log: Option<TrialLog>,
    /// Hit-test area for mouse containment, set on every draw
    signal_area: Rect,
    needs_redraw: bool,
    /// Application start time
    start_time: Instant,
    /// Last status message
    status_message: Option<String>,
    /// Status message timestamp
    status_time: Option<Instant>,
}

impl App<MonotonicClock, StdRng> {
    pub fn new(config: Config) -> Self {
        let machine = TrialMachine::new(&config);
        Self::with_machine(config, MonotonicClock::new(), machine)
    }
}

impl<C: Clock, R: Rng> App<C, R> {
    /// App on an explicit clock and random source
    pub fn with_parts(config: Config, clock: C, rng: R) -> Self {
        let machine = TrialMachine::with_rng(&config, rng);
        Self::with_machine(config, clock, machine)
    }

    fn with_machine(config: Config, clock: C, machine: TrialMachine<R>) -> Self {
        Self {
            state: AppState::Running,
            colors: ThemeColors::from_config(&config.colors),
            arbiter: InputArbiter::new(config.delays.virtual_debounce_ms),
            machine,
            timers: TimerQueue::new(clock),
            handles: HashMap::new(),
            trial_log: None,
            signal_area: Rect::default(),
            needs_redraw: true,
            start_time: Instant::now(),
            status_message: None,
            status_time: None,
            config,
        }
    }

    /// Write completed trials and reported errors to `log`
    pub fn attach_trial_log(&mut self, log: TrialLog) {
        self.trial_log = Some(log);
    }

    /// Open the trial log if enabled. Failure is reported, not fatal.
    pub fn open_trial_log(&mut self) {
        if !self.config.logging.trial_log {
            return;
        }
        match TrialLog::create(&self.config.logging.log_dir()) {
            Ok(log) => self.attach_trial_log(log),
            Err(e) => self.report(&format!("trial log disabled: {}", e)),
        }
    }

    /// Enter the session
    pub fn start(&mut self) -> Result<(), TrialError> {
        let transition = self.machine.start();
        self.apply(transition)
    }

    /// Feed one input event through the arbiter and, if it becomes an
    /// activation, through the machine
    pub fn process_input(&mut self, event: &InputEvent) -> Result<(), TrialError> {
        if self.state != AppState::Running {
            return Ok(());
        }
        let Some(activation) = self.arbiter.process(event) else {
            return Ok(());
        };
        log::trace!("{:?} activation", activation.source);

        let transition = self
            .machine
            .handle(TrialEvent::Activation, self.timers.clock())?;
        if let Some(delay_ms) = activation.debounce_ms {
            self.schedule(TimerTag::Debounce, delay_ms)?;
        }
        self.apply(transition)
    }

    /// Press from a terminal that never reports releases. Auto-repeat
    /// arrives as more presses, so the key stays latched until none has
    /// arrived for `input.key_hold_ms`.
    pub fn process_held_press(&mut self, key: KeyCode) -> Result<(), TrialError> {
        self.process_input(&InputEvent::key_press(key))?;
        if self.state == AppState::Running {
            self.schedule(TimerTag::KeyHold(key), self.config.input.key_hold_ms)?;
        }
        Ok(())
    }

    /// Deliver every timer whose deadline has passed, earliest first.
    /// Returns the number delivered.
    pub fn fire_due_timers(&mut self) -> Result<usize, TrialError> {
        let mut fired = 0;
        while let Some(tag) = self.timers.pop_due()? {
            self.handles.remove(&tag);
            fired += 1;

            match tag {
                TimerTag::Debounce => {
                    self.arbiter.end_debounce();
                    continue;
                }
                TimerTag::KeyHold(key) => {
                    self.arbiter.process(&InputEvent::key_release(key));
                    continue;
                }
                _ => {}
            }
            let transition = self
                .machine
                .handle(TrialEvent::TimerFired(tag), self.timers.clock())?;
            self.apply(transition)?;
        }
        Ok(fired)
    }

    /// Time until the next timer is due
    pub fn next_deadline(&self) -> Result<Option<Duration>, TrialError> {
        Ok(self.timers.next_deadline_in()?)
    }

    fn apply(&mut self, transition: Transition) -> Result<(), TrialError> {
        for command in transition.commands {
            match command {
                Command::Schedule { tag, delay_ms } => self.schedule(tag, delay_ms)?,
                Command::Cancel(tag) => {
                    if let Some(handle) = self.handles.remove(&tag) {
                        self.timers.cancel(handle);
                    }
                }
                Command::Repaint => self.needs_redraw = true,
                Command::LogTrial {
                    iteration,
                    value_ms,
                } => self.log_entry(LogEntry::Trial {
                    iteration,
                    value_ms,
                }),
            }
        }
        Ok(())
    }

    /// Schedule `tag`, replacing a pending timer with the same tag
    fn schedule(&mut self, tag: TimerTag, delay_ms: u64) -> Result<(), TrialError> {
        if let Some(handle) = self.handles.remove(&tag) {
            self.timers.cancel(handle);
        }
        let handle = self
            .timers
            .schedule(delay_ms, tag)
            .map_err(|source| TrialError::Schedule { tag, source })?;
        self.handles.insert(tag, handle);
        Ok(())
    }

    fn log_entry(&mut self, entry: LogEntry) {
        let Some(log) = self.trial_log.as_mut() else {
            return;
        };
        if let Err(e) = log.append(&entry) {
            log::warn!("{}", e);
            self.set_status(format!("Trial log write failed: {}", e));
        }
    }

    /// Whether a redraw was requested since the last call
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.needs_redraw)
    }

    /// Request a redraw
    pub fn invalidate(&mut self) {
        self.needs_redraw = true;
    }

    /// What the signal panel should show
    pub fn view(&self) -> PhaseView {
        self.machine.view()
    }

    pub fn phase(&self) -> TrialPhase {
        self.machine.phase()
    }

    pub fn machine(&self) -> &TrialMachine<R> {
        &self.machine
    }

    pub fn arbiter(&self) -> &InputArbiter {
        &self.arbiter
    }

    pub fn timers(&self) -> &TimerQueue<C> {
        &self.timers
    }

    pub fn trial_log(&self) -> Option<&TrialLog> {
        self.trial_log.as_ref()
    }

    pub fn signal_area(&self) -> Rect {
        self.signal_area
    }

    pub fn set_signal_area(&mut self, area: Rect) {
        self.signal_area = area;
    }

    /// Trial counters for the status bar
    pub fn trial_summary(&self) -> String {
        let view = self.machine.view();
        format!(
            "Trial {} | Window {}/{}",
            view.trial_iteration, view.current_attempt, view.averaging_window
        )
    }

    /// Request quit
    pub fn quit(&mut self) {
        self.state = AppState::Quitting;
    }

    pub fn is_running(&self) -> bool {
        self.state == AppState::Running
    }

    /// Set a status message
    pub fn set_status(&mut self, message: String) {
        self.status_message = Some(message);
        self.status_time = Some(Instant::now());
        self.needs_redraw = true;
    }

    /// Get status message if still valid (within 3 seconds)
    pub fn get_status(&self) -> Option<&str> {
        match (&self.status_message, self.status_time) {
            (Some(msg), Some(time)) if time.elapsed() < STATUS_TIMEOUT => Some(msg),
            _ => None,
        }
    }

    /// Get elapsed time formatted
    pub fn elapsed_formatted(&self) -> String {
        let secs = self.start_time.elapsed().as_secs();
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }
}

impl<C: Clock, R: Rng> ErrorReporter for App<C, R> {
    fn report(&mut self, message: &str) {
        log::warn!("{}", message);
        self.set_status(message.to_string());
        self.log_entry(LogEntry::Error {
            message: message.to_string(),
        });
    }
}
