//! Key codes and the alphanumeric key set
//!
//! Codes are Linux evdev scancodes so evdev, `device_query` and the terminal
//! all agree on which physical key was pressed.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Size of the key code space tracked by the latch table
pub const KEYSPACE: usize = 256;

/// A physical key code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub u16);

/// Digits and letters with their scancodes, in keyboard row order
#[rustfmt::skip]
const ALPHANUMERIC: [(char, u16); 36] = [
    ('1', 2), ('2', 3), ('3', 4), ('4', 5), ('5', 6),
    ('6', 7), ('7', 8), ('8', 9), ('9', 10), ('0', 11),
    ('Q', 16), ('W', 17), ('E', 18), ('R', 19), ('T', 20),
    ('Y', 21), ('U', 22), ('I', 23), ('O', 24), ('P', 25),
    ('A', 30), ('S', 31), ('D', 32), ('F', 33), ('G', 34),
    ('H', 35), ('J', 36), ('K', 37), ('L', 38),
    ('Z', 44), ('X', 45), ('C', 46), ('V', 47), ('B', 48),
    ('N', 49), ('M', 50),
];

static CHAR_TO_CODE: LazyLock<HashMap<char, u16>> =
    LazyLock::new(|| ALPHANUMERIC.iter().copied().collect());

impl KeyCode {
    pub fn new(code: u16) -> Self {
        Self(code)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Code for a digit or letter, case-insensitive
    pub fn from_char(c: char) -> Option<Self> {
        CHAR_TO_CODE
            .get(&c.to_ascii_uppercase())
            .copied()
            .map(Self)
    }

    /// Whether this is a digit or a letter A-Z. All other keys are ignored
    /// as responses.
    pub fn is_alphanumeric(&self) -> bool {
        matches!(self.0, 2..=11 | 16..=25 | 30..=38 | 44..=50)
    }

    /// Printable name of the key, if alphanumeric
    pub fn name(&self) -> Option<char> {
        ALPHANUMERIC
            .iter()
            .find(|(_, code)| *code == self.0)
            .map(|(c, _)| *c)
    }

    /// Slot in the latch table, `None` outside the tracked keyspace
    pub fn index(&self) -> Option<usize> {
        let index = self.0 as usize;
        (index < KEYSPACE).then_some(index)
    }
}

impl From<u16> for KeyCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl From<device_query::Keycode> for KeyCode {
    fn from(keycode: device_query::Keycode) -> Self {
        use device_query::Keycode as DK;
        let code = match keycode {
            DK::Escape => 1,
            DK::Key1 => 2,
            DK::Key2 => 3,
            DK::Key3 => 4,
            DK::Key4 => 5,
            DK::Key5 => 6,
            DK::Key6 => 7,
            DK::Key7 => 8,
            DK::Key8 => 9,
            DK::Key9 => 10,
            DK::Key0 => 11,
            DK::Q => 16,
            DK::W => 17,
            DK::E => 18,
            DK::R => 19,
            DK::T => 20,
            DK::Y => 21,
            DK::U => 22,
            DK::I => 23,
            DK::O => 24,
            DK::P => 25,
            DK::Enter => 28,
            DK::A => 30,
            DK::S => 31,
            DK::D => 32,
            DK::F => 33,
            DK::G => 34,
            DK::H => 35,
            DK::J => 36,
            DK::K => 37,
            DK::L => 38,
            DK::Z => 44,
            DK::X => 45,
            DK::C => 46,
            DK::V => 47,
            DK::B => 48,
            DK::N => 49,
            DK::M => 50,
            DK::Space => 57,
            _ => 0,
        };
        Self(code)
    }
}
