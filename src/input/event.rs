//! Input events delivered to the arbiter

use super::KeyCode;

/// Edge direction of a key or button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventType {
    /// Key or button went down
    Press,
    /// Key or button went up
    Release,
}

/// Device family an activation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Keyboard,
    Mouse,
}

/// Input as delivered by the raw and polled sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Raw keyboard make/break
    Key { key: KeyCode, kind: KeyEventType },
    /// Raw left mouse button edge
    MouseButton(KeyEventType),
    /// Polled keyboard: every key currently held down
    KeyboardPoll(Vec<KeyCode>),
    /// Polled left mouse button level
    MousePoll { left_pressed: bool },
    /// Background keyboard sample: releases latches of keys no longer held,
    /// never presses one
    KeyboardResync(Vec<KeyCode>),
    /// Background left button sample, release only
    MouseResync { left_pressed: bool },
    /// Pointer hit test result
    Pointer { inside: bool },
}

impl InputEvent {
    pub fn key_press(key: KeyCode) -> Self {
        Self::Key {
            key,
            kind: KeyEventType::Press,
        }
    }

    pub fn key_release(key: KeyCode) -> Self {
        Self::Key {
            key,
            kind: KeyEventType::Release,
        }
    }

    /// Device family, `None` for pointer movement
    pub fn source(&self) -> Option<InputSource> {
        match self {
            Self::Key { .. } | Self::KeyboardPoll(_) | Self::KeyboardResync(_) => {
                Some(InputSource::Keyboard)
            }
            Self::MouseButton(_) | Self::MousePoll { .. } | Self::MouseResync { .. } => {
                Some(InputSource::Mouse)
            }
            Self::Pointer { .. } => None,
        }
    }
}
