// NiceType Input Layer - Key Events
// The engine-facing key event and the raw key state it is built from

use std::fmt;
use std::time::Instant;

/// State carried by a raw evdev key event.
///
/// From `evtest` output: 0 == released, 1 == pressed, 2 == auto-repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum KeyState {
    Release = 0,
    Press = 1,
    Repeat = 2,
}

impl KeyState {
    /// Press or auto-repeat: both type a character in the focused application
    pub fn is_pressed(self) -> bool {
        matches!(self, KeyState::Press | KeyState::Repeat)
    }

    /// Create from the evdev event value
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(KeyState::Release),
            1 => Some(KeyState::Press),
            2 => Some(KeyState::Repeat),
            _ => None,
        }
    }
}

impl fmt::Display for KeyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyState::Release => write!(f, "release"),
            KeyState::Press => write!(f, "press"),
            KeyState::Repeat => write!(f, "repeat"),
        }
    }
}

/// One observed key press, as the substitution engine sees it.
///
/// `character` is `None` for keys that do not type text (arrows, Enter,
/// Backspace, function keys, shortcut chords). Timestamps come from a
/// monotonic clock and never decrease across a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub character: Option<char>,
    pub timestamp: Instant,
}

impl KeyEvent {
    pub fn character(ch: char, timestamp: Instant) -> Self {
        Self {
            character: Some(ch),
            timestamp,
        }
    }

    pub fn non_character(timestamp: Instant) -> Self {
        Self {
            character: None,
            timestamp,
        }
    }

    pub fn is_character(&self) -> bool {
        self.character.is_some()
    }
}
