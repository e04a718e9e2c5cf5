//! Input sources and arbitration

mod arbiter;
mod event;
pub mod keymap;
pub mod poller;
pub mod terminal;
#[cfg(target_os = "linux")]
pub mod evdev_listener;

pub use arbiter::{Activation, InputArbiter};
pub use event::{InputEvent, InputSource, KeyEventType};
pub use keymap::{KeyCode, KEYSPACE};
