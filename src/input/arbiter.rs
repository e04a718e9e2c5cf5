//! Input arbitration
//!
//! Turns raw edges and polled levels from any device into at most one
//! activation per physical action. Two rules gate every activation:
//!
//! - debounce: after an accepted activation nothing gets through until
//!   [`InputArbiter::end_debounce`] is called
//! - containment: mouse activations only count while the pointer is inside
//!   the signal area
//!
//! Latches are updated before suppression is checked, so a press swallowed by
//! debounce still has to be released before that key can fire again.
//!
//! Polled levels are global device state. Only a poll triggered by input the
//! terminal received may latch a press; background resyncs only release.

use super::{InputEvent, InputSource, KeyCode, KeyEventType, KEYSPACE};

/// An activation that passed both suppression rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activation {
    pub source: InputSource,
    /// Length of the debounce window that was just armed, if any
    pub debounce_ms: Option<u64>,
}

/// Normalizes device input into activations
#[derive(Debug, Clone)]
pub struct InputArbiter {
    /// Keys currently latched down, indexed by scancode
    key_states: Box<[bool]>,
    /// Left button latch for raw edges
    raw_mouse_down: bool,
    /// Left button latch for polled levels
    polled_mouse_down: bool,
    /// Input is suppressed until the debounce timer fires
    debounce_active: bool,
    /// Pointer is inside the signal area
    mouse_active: bool,
    virtual_debounce_ms: u64,
    /// Activations dropped by debounce or containment
    suppressed: u64,
}

impl InputArbiter {
    /// `virtual_debounce_ms == 0` disables debounce
    pub fn new(virtual_debounce_ms: u64) -> Self {
        Self {
            key_states: vec![false; KEYSPACE].into_boxed_slice(),
            raw_mouse_down: false,
            polled_mouse_down: false,
            debounce_active: false,
            mouse_active: false,
            virtual_debounce_ms,
            suppressed: 0,
        }
    }

    /// Feed one input event, returning the activation it produced, if any
    pub fn process(&mut self, event: &InputEvent) -> Option<Activation> {
        let edge = match event {
            InputEvent::Key { key, kind } => self.key_edge(*key, *kind),
            InputEvent::KeyboardPoll(down) => self.poll_keyboard(down),
            InputEvent::MouseButton(kind) => {
                Self::latch_edge(&mut self.raw_mouse_down, *kind == KeyEventType::Press)
            }
            InputEvent::MousePoll { left_pressed } => {
                Self::latch_edge(&mut self.polled_mouse_down, *left_pressed)
            }
            InputEvent::KeyboardResync(down) => {
                self.resync_keyboard(down);
                false
            }
            InputEvent::MouseResync { left_pressed } => {
                self.polled_mouse_down &= *left_pressed;
                false
            }
            InputEvent::Pointer { inside } => {
                self.mouse_active = *inside;
                false
            }
        };
        if !edge {
            return None;
        }
        let source = event.source()?;
        self.admit(source)
    }

    /// Close the debounce window
    pub fn end_debounce(&mut self) {
        if self.debounce_active {
            log::trace!("debounce window closed");
        }
        self.debounce_active = false;
    }

    fn key_edge(&mut self, key: KeyCode, kind: KeyEventType) -> bool {
        let Some(slot) = key.index().and_then(|i| self.key_states.get_mut(i)) else {
            return false;
        };
        match kind {
            KeyEventType::Press if key.is_alphanumeric() => Self::latch_edge(slot, true),
            KeyEventType::Press => false,
            KeyEventType::Release => {
                *slot = false;
                false
            }
        }
    }

    /// Compare the polled key levels against the latch table. Any number of
    /// keys going down in the same poll count as a single edge.
    fn poll_keyboard(&mut self, down: &[KeyCode]) -> bool {
        let mut pressed = [false; KEYSPACE];
        for index in down
            .iter()
            .filter(|key| key.is_alphanumeric())
            .filter_map(KeyCode::index)
        {
            pressed[index] = true;
        }

        let mut edge = false;
        for (latch, now_down) in self.key_states.iter_mut().zip(pressed) {
            edge |= Self::latch_edge(latch, now_down);
        }
        edge
    }

    /// Release every latched key missing from `down`
    fn resync_keyboard(&mut self, down: &[KeyCode]) {
        let mut held = [false; KEYSPACE];
        for index in down.iter().filter_map(KeyCode::index) {
            held[index] = true;
        }
        for (latch, still_down) in self.key_states.iter_mut().zip(held) {
            *latch &= still_down;
        }
    }

    /// Update a latch from a level, true on the up-to-down edge only
    fn latch_edge(latch: &mut bool, down: bool) -> bool {
        let edge = down && !*latch;
        *latch = down;
        edge
    }

    fn admit(&mut self, source: InputSource) -> Option<Activation> {
        if self.debounce_active {
            self.suppressed += 1;
            log::trace!("{:?} activation dropped during debounce", source);
            return None;
        }
        if source == InputSource::Mouse && !self.mouse_active {
            self.suppressed += 1;
            log::trace!("mouse activation outside the signal area dropped");
            return None;
        }

        let debounce_ms = (self.virtual_debounce_ms > 0).then(|| {
            self.debounce_active = true;
            self.virtual_debounce_ms
        });
        Some(Activation {
            source,
            debounce_ms,
        })
    }

    pub fn debounce_active(&self) -> bool {
        self.debounce_active
    }

    pub fn mouse_active(&self) -> bool {
        self.mouse_active
    }

    /// Whether a key is latched down
    pub fn is_key_down(&self, key: KeyCode) -> bool {
        key.index()
            .map(|i| self.key_states[i])
            .unwrap_or(false)
    }

    pub fn suppressed_count(&self) -> u64 {
        self.suppressed
    }

    pub fn virtual_debounce_ms(&self) -> u64 {
        self.virtual_debounce_ms
    }
}
