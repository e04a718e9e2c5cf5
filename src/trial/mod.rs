//! Trial state machine
//!
//! Sequences READY → REACT → RESULT (or READY → EARLY → READY). Each event
//! goes through [`TrialMachine::handle`], which commits the new phase and
//! returns the side effects (timers, repaint, logging) as [`Command`]s for
//! the caller to execute. The machine never touches timers or the screen
//! itself.

mod delay;
mod recorder;

pub use delay::DelaySampler;
pub use recorder::TrialRecorder;

use crate::clock::Clock;
use crate::config::{Config, EntryPolicy};
use crate::error::TrialError;
use crate::scheduler::TimerTag;
use rand::rngs::StdRng;
use rand::Rng;

/// Phase of the current trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrialPhase {
    /// Waiting for the first activation of the session
    Initial,
    /// Cue pending
    Ready,
    /// Cue shown, measuring
    React,
    /// Activation arrived before the cue
    Early,
    /// Showing the last measurement
    Result,
}

impl TrialPhase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initial => "START",
            Self::Ready => "READY",
            Self::React => "REACT",
            Self::Early => "EARLY",
            Self::Result => "RESULT",
        }
    }
}

/// Event delivered to the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialEvent {
    /// The user responded (after input filtering)
    Activation,
    /// A scheduled timer fired
    TimerFired(TimerTag),
}

/// Side effect requested by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Schedule `tag`, replacing any pending timer with the same tag
    Schedule { tag: TimerTag, delay_ms: u64 },
    /// Cancel the pending timer with this tag, if any
    Cancel(TimerTag),
    /// Redraw the signal
    Repaint,
    /// Append a completed trial to the trial log
    LogTrial { iteration: u64, value_ms: f64 },
}

/// Result of handling one event
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: TrialPhase,
    pub to: TrialPhase,
    pub commands: Vec<Command>,
}

impl Transition {
    /// True when the event had no effect
    pub fn is_noop(&self) -> bool {
        self.from == self.to && self.commands.is_empty()
    }
}

/// What the renderer needs to draw the current phase
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseView {
    pub phase: TrialPhase,
    /// Centered text lines
    pub lines: Vec<String>,
    pub last_ms: Option<f64>,
    pub average_ms: Option<f64>,
    pub trial_iteration: u64,
    pub current_attempt: usize,
    pub averaging_window: usize,
}

/// Machine settings taken from the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineSettings {
    pub early_reset_delay_ms: u64,
    pub staged_arming: bool,
    pub entry: EntryPolicy,
}

impl From<&Config> for MachineSettings {
    fn from(config: &Config) -> Self {
        Self {
            early_reset_delay_ms: config.delays.early_reset_delay_ms,
            staged_arming: config.delays.staged_arming,
            entry: config.trial.entry,
        }
    }
}

/// Owns the trial phase and the recorder; sole writer of both
#[derive(Debug)]
pub struct TrialMachine<R: Rng = StdRng> {
    phase: TrialPhase,
    /// Trials completed this session, never reset
    trial_iteration: u64,
    recorder: TrialRecorder,
    sampler: DelaySampler<R>,
    settings: MachineSettings,
}

impl TrialMachine<StdRng> {
    pub fn new(config: &Config) -> Self {
        let sampler =
            DelaySampler::from_os_rng(config.delays.min_delay_ms, config.delays.max_delay_ms);
        Self::with_sampler(config, sampler)
    }
}

impl<R: Rng> TrialMachine<R> {
    /// Machine drawing delays from the given generator
    pub fn with_rng(config: &Config, rng: R) -> Self {
        let sampler =
            DelaySampler::with_rng(rng, config.delays.min_delay_ms, config.delays.max_delay_ms);
        Self::with_sampler(config, sampler)
    }

    fn with_sampler(config: &Config, sampler: DelaySampler<R>) -> Self {
        Self {
            phase: TrialPhase::Initial,
            trial_iteration: 0,
            recorder: TrialRecorder::new(
                config.trial.buffer_capacity,
                config.trial.averaging_window,
            ),
            sampler,
            settings: MachineSettings::from(config),
        }
    }

    /// Enter the session according to the entry policy
    pub fn start(&mut self) -> Transition {
        let from = self.phase;
        let mut commands = Vec::new();
        match self.settings.entry {
            EntryPolicy::AutoStart => self.reset_logic(&mut commands),
            EntryPolicy::ClickToBegin => commands.push(Command::Repaint),
        }
        Transition {
            from,
            to: self.phase,
            commands,
        }
    }

    /// Handle one event. Either the whole transition commits or nothing
    /// changes.
    pub fn handle(
        &mut self,
        event: TrialEvent,
        clock: &dyn Clock,
    ) -> Result<Transition, TrialError> {
        let from = self.phase;
        let mut commands = Vec::new();

        match (self.phase, event) {
            (TrialPhase::Initial, TrialEvent::Activation) => {
                self.reset_logic(&mut commands);
            }

            (TrialPhase::Ready, TrialEvent::TimerFired(TimerTag::Ready)) => {
                commands.push(Command::Cancel(TimerTag::Ready));
                commands.push(Command::Schedule {
                    tag: TimerTag::React,
                    delay_ms: self.sampler.next_delay_ms(),
                });
            }

            (TrialPhase::Ready, TrialEvent::TimerFired(TimerTag::React)) => {
                self.recorder.begin(clock)?;
                self.phase = TrialPhase::React;
                commands.push(Command::Repaint);
            }

            (TrialPhase::Ready, TrialEvent::Activation) => {
                commands.push(Command::Cancel(TimerTag::Ready));
                commands.push(Command::Cancel(TimerTag::React));
                if self.settings.early_reset_delay_ms > 0 {
                    commands.push(Command::Schedule {
                        tag: TimerTag::EarlyReset,
                        delay_ms: self.settings.early_reset_delay_ms,
                    });
                }
                self.phase = TrialPhase::Early;
                commands.push(Command::Repaint);
            }

            (TrialPhase::React, TrialEvent::Activation) => {
                let value_ms = self.recorder.record(clock)?;
                self.trial_iteration += 1;
                self.phase = TrialPhase::Result;
                log::info!(
                    "trial {}: {:.2} ms ({}/{})",
                    self.trial_iteration,
                    value_ms,
                    self.recorder.current_attempt(),
                    self.recorder.averaging_window()
                );
                commands.push(Command::Repaint);
                commands.push(Command::LogTrial {
                    iteration: self.trial_iteration,
                    value_ms,
                });
            }

            (TrialPhase::Early, TrialEvent::Activation)
            | (TrialPhase::Early, TrialEvent::TimerFired(TimerTag::EarlyReset)) => {
                self.reset_logic(&mut commands);
            }

            (TrialPhase::Result, TrialEvent::Activation) => {
                if self.recorder.window_complete() {
                    log::debug!(
                        "averaging window of {} complete, starting over",
                        self.recorder.averaging_window()
                    );
                    self.recorder.reset();
                }
                self.reset_logic(&mut commands);
            }

            // Stale timers and debounce expiry leave the phase alone
            (_, TrialEvent::TimerFired(tag)) => {
                log::trace!("ignoring {} timer in {}", tag, self.phase.name());
            }
        }

        if from != self.phase {
            log::debug!("{} -> {}", from.name(), self.phase.name());
        }
        Ok(Transition {
            from,
            to: self.phase,
            commands,
        })
    }

    /// Cancel phase timers, enter READY and arm a fresh random delay.
    /// Trial history is left alone.
    fn reset_logic(&mut self, commands: &mut Vec<Command>) {
        commands.extend(TimerTag::PHASE_TIMERS.into_iter().map(Command::Cancel));
        self.phase = TrialPhase::Ready;
        let tag = if self.settings.staged_arming {
            TimerTag::Ready
        } else {
            TimerTag::React
        };
        commands.push(Command::Schedule {
            tag,
            delay_ms: self.sampler.next_delay_ms(),
        });
        commands.push(Command::Repaint);
    }

    /// Renderer state for the current phase
    pub fn view(&self) -> PhaseView {
        let recorder = &self.recorder;
        let window = recorder.averaging_window();
        let lines = match self.phase {
            TrialPhase::Initial => vec!["Click or press a key to begin".to_string()],
            TrialPhase::Ready | TrialPhase::React => Vec::new(),
            TrialPhase::Early => vec![
                "Too early!".to_string(),
                format!("Trials so far: {}", self.trial_iteration),
            ],
            TrialPhase::Result => {
                let last = recorder.last().unwrap_or_default();
                let summary = match recorder.average() {
                    Some(avg) if recorder.window_complete() => {
                        format!("Average (last {}): {:.2}ms", window, avg)
                    }
                    _ => format!("Complete {} trials for average.", window),
                };
                vec![
                    format!("Last: {:.2}ms", last),
                    summary,
                    format!("Trials so far: {}", self.trial_iteration),
                ]
            }
        };

        PhaseView {
            phase: self.phase,
            lines,
            last_ms: recorder.last(),
            average_ms: recorder.average(),
            trial_iteration: self.trial_iteration,
            current_attempt: recorder.current_attempt(),
            averaging_window: window,
        }
    }

    pub fn phase(&self) -> TrialPhase {
        self.phase
    }

    pub fn trial_iteration(&self) -> u64 {
        self.trial_iteration
    }

    pub fn recorder(&self) -> &TrialRecorder {
        &self.recorder
    }
}
