//! Raw keyboard make/break events from Linux evdev devices
//!
//! Devices are discovered with the `evdev` crate and then read directly in
//! non-blocking mode, so polling never stalls the event loop.

use super::{InputEvent, KeyCode, KeyEventType};
use evdev::Key;
use nix::libc;
use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;
use std::sync::mpsc;
use thiserror::Error;

const EV_KEY: u16 = 0x01;
const KEY_REPEAT: i32 = 2;
const EVENT_SIZE: usize = std::mem::size_of::<libc::input_event>();

/// Error type for evdev operations
#[derive(Debug, Error)]
pub enum EvdevError {
    #[error("no keyboard devices found")]
    NoDevices,
    #[error("permission denied reading keyboard devices; add the user to the 'input' group")]
    PermissionDenied,
    #[error("failed to open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
}

/// One decoded kernel input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RawEvent {
    event_type: u16,
    code: u16,
    value: i32,
}

impl RawEvent {
    /// Decode one `struct input_event`. The timestamp is skipped; the trial
    /// clock is read when the event is handled.
    fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != EVENT_SIZE {
            return None;
        }
        let tail = &bytes[EVENT_SIZE - 8..];
        Some(Self {
            event_type: u16::from_ne_bytes([tail[0], tail[1]]),
            code: u16::from_ne_bytes([tail[2], tail[3]]),
            value: i32::from_ne_bytes([tail[4], tail[5], tail[6], tail[7]]),
        })
    }

    /// Key make/break as an input event. Repeats and non-key events yield
    /// nothing.
    fn to_input(self) -> Option<InputEvent> {
        if self.event_type != EV_KEY || self.value == KEY_REPEAT {
            return None;
        }
        let kind = if self.value == 0 {
            KeyEventType::Release
        } else {
            KeyEventType::Press
        };
        Some(InputEvent::Key {
            key: KeyCode::new(self.code),
            kind,
        })
    }
}

/// Paths of devices that report letter keys
fn find_keyboard_devices() -> Result<Vec<PathBuf>, EvdevError> {
    let keyboards: Vec<PathBuf> = evdev::enumerate()
        .filter(|(_, device)| {
            device
                .supported_keys()
                .is_some_and(|keys| keys.contains(Key::KEY_A) && keys.contains(Key::KEY_Z))
        })
        .map(|(path, _)| path)
        .collect();

    if keyboards.is_empty() {
        // enumerate() silently skips devices it cannot open
        return Err(EvdevError::NoDevices);
    }
    Ok(keyboards)
}

/// Reads raw key events from every keyboard device
pub struct EvdevListener {
    devices: Vec<File>,
    device_paths: Vec<PathBuf>,
    event_tx: mpsc::Sender<InputEvent>,
    buffer: Vec<u8>,
    /// Reads whose length was not a whole number of events
    malformed: u64,
}

impl EvdevListener {
    pub fn new(event_tx: mpsc::Sender<InputEvent>) -> Result<Self, EvdevError> {
        let candidates = find_keyboard_devices()?;
        let mut devices = Vec::new();
        let mut device_paths = Vec::new();

        for path in candidates {
            let opened = OpenOptions::new()
                .read(true)
                .custom_flags(libc::O_NONBLOCK)
                .open(&path);
            match opened {
                Ok(file) => {
                    log::debug!("reading raw keyboard input from {}", path.display());
                    devices.push(file);
                    device_paths.push(path);
                }
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => continue,
                Err(source) => return Err(EvdevError::Open { path, source }),
            }
        }

        if devices.is_empty() {
            return Err(EvdevError::PermissionDenied);
        }

        Ok(Self {
            devices,
            device_paths,
            event_tx,
            buffer: vec![0u8; EVENT_SIZE * 64],
            malformed: 0,
        })
    }

    /// Listener if any keyboard device is readable
    pub fn try_new(event_tx: mpsc::Sender<InputEvent>) -> Option<Self> {
        match Self::new(event_tx) {
            Ok(listener) => Some(listener),
            Err(e) => {
                log::info!("raw keyboard input unavailable: {}", e);
                None
            }
        }
    }

    /// Drain pending events from all devices.
    /// Returns the number of events forwarded.
    pub fn poll(&mut self) -> usize {
        let mut event_count = 0;

        for (device, path) in self.devices.iter_mut().zip(&self.device_paths) {
            loop {
                let bytes_read = match device.read(&mut self.buffer) {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                    Err(e) => {
                        log::warn!("read from {} failed: {}", path.display(), e);
                        break;
                    }
                };

                if bytes_read % EVENT_SIZE != 0 {
                    self.malformed += 1;
                    log::warn!(
                        "dropping {} trailing bytes of malformed input from {}",
                        bytes_read % EVENT_SIZE,
                        path.display()
                    );
                }

                for event in self.buffer[..bytes_read]
                    .chunks_exact(EVENT_SIZE)
                    .filter_map(RawEvent::decode)
                    .filter_map(RawEvent::to_input)
                {
                    if self.event_tx.send(event).is_ok() {
                        event_count += 1;
                    }
                }
            }
        }

        event_count
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn device_paths(&self) -> &[PathBuf] {
        &self.device_paths
    }

    pub fn malformed_count(&self) -> u64 {
        self.malformed
    }
}

/// Short description of raw keyboard availability
pub fn evdev_status() -> String {
    match find_keyboard_devices() {
        Ok(devices) => format!("{} keyboard device(s) found", devices.len()),
        Err(e) => e.to_string(),
    }
}
