//! Polled keyboard and mouse state via `device_query`
//!
//! Level-triggered: each poll reports what is held right now. The arbiter's
//! latches turn these levels into edges. The state is global, so a sample
//! taken without a terminal event behind it is only good for releases.

use super::{InputEvent, KeyCode};
use device_query::{DeviceQuery, DeviceState};

/// Index of the left button in `MouseState::button_pressed`
const LEFT_BUTTON: usize = 1;

/// Samples global keyboard and mouse state
pub struct DevicePoller {
    device_state: DeviceState,
}

impl DevicePoller {
    /// Connect to the display server, `None` when there is no usable one
    /// (for example on a bare console or over SSH)
    pub fn try_new() -> Option<Self> {
        open_device_state().map(|device_state| Self { device_state })
    }

    /// Keys currently held down, sampled for a terminal key event
    pub fn keyboard(&self) -> InputEvent {
        InputEvent::KeyboardPoll(self.held_keys())
    }

    /// Left button level, sampled for a terminal click
    pub fn mouse(&self) -> InputEvent {
        InputEvent::MousePoll {
            left_pressed: self.left_pressed(),
        }
    }

    /// Background keyboard sample
    pub fn keyboard_resync(&self) -> InputEvent {
        InputEvent::KeyboardResync(self.held_keys())
    }

    /// Background left button sample
    pub fn mouse_resync(&self) -> InputEvent {
        InputEvent::MouseResync {
            left_pressed: self.left_pressed(),
        }
    }

    fn held_keys(&self) -> Vec<KeyCode> {
        self.device_state
            .get_keys()
            .into_iter()
            .map(KeyCode::from)
            .collect()
    }

    fn left_pressed(&self) -> bool {
        self.device_state
            .get_mouse()
            .button_pressed
            .get(LEFT_BUTTON)
            .copied()
            .unwrap_or(false)
    }
}

#[cfg(target_os = "linux")]
fn open_device_state() -> Option<DeviceState> {
    DeviceState::checked_new()
}

#[cfg(not(target_os = "linux"))]
fn open_device_state() -> Option<DeviceState> {
    Some(DeviceState::new())
}
