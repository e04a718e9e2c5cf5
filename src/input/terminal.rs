//! Translation of crossterm events into input events and loop actions

use super::{InputEvent, KeyCode, KeyEventType};
use crate::config::InputConfig;
use crossterm::event::{
    Event, KeyCode as TermKey, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use ratatui::layout::{Position, Rect};

/// Where keyboard activations come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyboardSource {
    /// Raw make/break read from evdev; terminal keys only quit
    Evdev,
    /// Terminal key events used as raw make/break. Without release
    /// reporting, auto-repeat arrives as more presses, so a key stays latched
    /// until its presses stop for `input.key_hold_ms`.
    Terminal { releases: bool },
    /// A terminal key event triggers a `device_query` keyboard poll
    Polled,
}

/// Where mouse button activations come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseSource {
    /// Terminal left button down/up used as raw edges
    Terminal,
    /// A terminal click triggers a `device_query` button poll
    Polled,
}

/// How terminal events are wired to the arbiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputWiring {
    pub keyboard: KeyboardSource,
    pub mouse: MouseSource,
}

/// Input paths that could be opened for this session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputAvailability {
    /// An evdev listener is reading keyboard devices
    pub evdev: bool,
    /// `device_query` can sample keyboard and mouse state
    pub poller: bool,
    /// The terminal reports key release events
    pub key_releases: bool,
}

impl InputWiring {
    /// Pick the sources for the configured input mode, falling back to what
    /// is available. Terminal keys without release events are the last
    /// resort for the keyboard.
    pub fn select(input: &InputConfig, available: InputAvailability) -> Self {
        let keyboard = if input.raw_keyboard && available.evdev {
            KeyboardSource::Evdev
        } else if input.raw_keyboard && available.key_releases {
            KeyboardSource::Terminal { releases: true }
        } else if available.poller {
            KeyboardSource::Polled
        } else {
            KeyboardSource::Terminal {
                releases: available.key_releases,
            }
        };
        let mouse = if input.raw_mouse || !available.poller {
            MouseSource::Terminal
        } else {
            MouseSource::Polled
        };
        Self { keyboard, mouse }
    }

    pub fn describe(&self) -> String {
        let keyboard = match self.keyboard {
            KeyboardSource::Evdev => "evdev",
            KeyboardSource::Terminal { releases: true } => "terminal",
            KeyboardSource::Terminal { releases: false } => "terminal (no release events)",
            KeyboardSource::Polled => "polled",
        };
        let mouse = match self.mouse {
            MouseSource::Terminal => "terminal",
            MouseSource::Polled => "polled",
        };
        format!("keyboard: {}, mouse: {}", keyboard, mouse)
    }
}

/// What the event loop should do with one terminal event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalAction {
    /// Hand this event to the arbiter
    Input(InputEvent),
    /// Key press from a terminal that never reports the release
    HeldPress(KeyCode),
    /// Sample the keyboard now
    PollKeyboard,
    /// Sample the mouse button now
    PollMouse,
    /// Layout changed, redraw
    Resize,
    Quit,
}

/// Translate a terminal event. `signal_area` is the hit-test rectangle for
/// mouse containment.
pub fn translate(event: &Event, wiring: &InputWiring, signal_area: Rect) -> Vec<TerminalAction> {
    match event {
        Event::Key(key) => translate_key(key, wiring.keyboard),
        Event::Mouse(mouse) => translate_mouse(mouse, wiring.mouse, signal_area),
        Event::Resize(_, _) => vec![TerminalAction::Resize],
        _ => Vec::new(),
    }
}

fn is_quit(key: &KeyEvent) -> bool {
    key.kind != KeyEventKind::Release
        && (key.code == TermKey::Esc
            || (key.code == TermKey::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)))
}

fn translate_key(key: &KeyEvent, source: KeyboardSource) -> Vec<TerminalAction> {
    if is_quit(key) {
        return vec![TerminalAction::Quit];
    }
    let TermKey::Char(c) = key.code else {
        return Vec::new();
    };

    match source {
        KeyboardSource::Evdev => Vec::new(),
        KeyboardSource::Polled => match key.kind {
            KeyEventKind::Repeat => Vec::new(),
            _ => vec![TerminalAction::PollKeyboard],
        },
        KeyboardSource::Terminal { releases } => {
            let Some(code) = KeyCode::from_char(c) else {
                return Vec::new();
            };
            match key.kind {
                KeyEventKind::Press if releases => {
                    vec![TerminalAction::Input(InputEvent::key_press(code))]
                }
                KeyEventKind::Press => vec![TerminalAction::HeldPress(code)],
                KeyEventKind::Release => {
                    vec![TerminalAction::Input(InputEvent::key_release(code))]
                }
                KeyEventKind::Repeat => Vec::new(),
            }
        }
    }
}

fn translate_mouse(mouse: &MouseEvent, source: MouseSource, area: Rect) -> Vec<TerminalAction> {
    let inside = area.contains(Position::new(mouse.column, mouse.row));
    let mut actions = vec![TerminalAction::Input(InputEvent::Pointer { inside })];

    let edge = match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => Some(KeyEventType::Press),
        MouseEventKind::Up(MouseButton::Left) => Some(KeyEventType::Release),
        _ => None,
    };
    if let Some(kind) = edge {
        actions.push(match source {
            MouseSource::Terminal => TerminalAction::Input(InputEvent::MouseButton(kind)),
            MouseSource::Polled => TerminalAction::PollMouse,
        });
    }
    actions
}
