//! One-shot timers for the trial loop
//!
//! The trial loop never sleeps. Every wait is a timer scheduled here and
//! delivered back as a [`TimerTag`] once its deadline has passed.

use crate::clock::{Clock, ClockError, Ticks};
use crate::input::KeyCode;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Most timers that may be pending at once: the phase timers, debounce and
/// one hold timer per alphanumeric key
pub const MAX_PENDING_TIMERS: usize = 64;

/// What a timer is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerTag {
    /// Arming delay before the react delay is drawn
    Ready,
    /// Switch from READY to REACT
    React,
    /// Automatic return from EARLY to READY
    EarlyReset,
    /// End of the input suppression window
    Debounce,
    /// Presumed release of a key whose terminal never reports releases
    KeyHold(KeyCode),
}

impl TimerTag {
    /// Timers owned by the trial phases (everything except debounce)
    pub const PHASE_TIMERS: [TimerTag; 3] =
        [TimerTag::Ready, TimerTag::React, TimerTag::EarlyReset];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::React => "react",
            Self::EarlyReset => "early-reset",
            Self::Debounce => "debounce",
            Self::KeyHold(_) => "key-hold",
        }
    }
}

impl fmt::Display for TimerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifies one scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// Failure to schedule a timer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("could not read clock: {0}")]
    Clock(#[from] ClockError),
    #[error("timer deadline for {0} ms is out of range")]
    DeadlineOverflow(u64),
    #[error("too many pending timers (limit {})", MAX_PENDING_TIMERS)]
    QueueFull,
}

/// Schedules one-shot timers that fire no earlier than requested
pub trait Scheduler {
    /// Schedule `tag` to fire after `delay_ms`
    fn schedule(&mut self, delay_ms: u64, tag: TimerTag) -> Result<TimerHandle, SchedulerError>;

    /// Cancel a pending timer. Cancelling a fired or unknown handle is a no-op.
    fn cancel(&mut self, handle: TimerHandle);
}

#[derive(Debug, Clone, Copy)]
struct PendingTimer {
    handle: TimerHandle,
    tag: TimerTag,
    deadline: Ticks,
}

/// Deadline-ordered timer queue driven by a [`Clock`]
#[derive(Debug)]
pub struct TimerQueue<C: Clock> {
    clock: C,
    pending: Vec<PendingTimer>,
    next_id: u64,
}

impl<C: Clock> TimerQueue<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            pending: Vec::with_capacity(MAX_PENDING_TIMERS),
            next_id: 0,
        }
    }

    /// Pop the earliest timer whose deadline has passed.
    ///
    /// Timers are popped one at a time so a timer cancelled while handling an
    /// earlier one never fires.
    pub fn pop_due(&mut self) -> Result<Option<TimerTag>, ClockError> {
        let now = self.clock.now()?;
        let due = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, t)| t.deadline <= now)
            .min_by_key(|(_, t)| (t.deadline, t.handle))
            .map(|(i, _)| i);

        Ok(due.map(|i| self.pending.remove(i).tag))
    }

    /// Time until the earliest pending deadline, zero if already due
    pub fn next_deadline_in(&self) -> Result<Option<Duration>, ClockError> {
        let now = self.clock.now()?;
        let tps = self.clock.ticks_per_second();
        Ok(self.pending.iter().map(|t| t.deadline).min().map(|deadline| {
            let ticks = deadline.saturating_sub(now);
            Duration::from_nanos((ticks as u128 * 1_000_000_000 / tps as u128) as u64)
        }))
    }

    /// Whether any timer with this tag is pending
    pub fn is_pending(&self, tag: TimerTag) -> bool {
        self.pending.iter().any(|t| t.tag == tag)
    }

    /// Tags of all pending timers, earliest first
    pub fn pending_tags(&self) -> Vec<TimerTag> {
        let mut timers = self.pending.clone();
        timers.sort_by_key(|t| (t.deadline, t.handle));
        timers.into_iter().map(|t| t.tag).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

impl<C: Clock> Scheduler for TimerQueue<C> {
    fn schedule(&mut self, delay_ms: u64, tag: TimerTag) -> Result<TimerHandle, SchedulerError> {
        if self.pending.len() >= MAX_PENDING_TIMERS {
            return Err(SchedulerError::QueueFull);
        }
        let now = self.clock.now()?;
        let delay = self
            .clock
            .ms_to_ticks(delay_ms)
            .ok_or(SchedulerError::DeadlineOverflow(delay_ms))?;
        let deadline = now
            .checked_add(delay)
            .ok_or(SchedulerError::DeadlineOverflow(delay_ms))?;

        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.pending.push(PendingTimer {
            handle,
            tag,
            deadline,
        });
        log::trace!("scheduled {} timer in {} ms", tag, delay_ms);
        Ok(handle)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.pending.retain(|t| t.handle != handle);
    }
}
