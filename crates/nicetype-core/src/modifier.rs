// NiceType Modifier Tracking
// Shift/Ctrl/Alt/Meta held state and the Caps Lock toggle

use std::collections::HashSet;

use crate::Key;

/// Keyboard modifier families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Shift,
    Ctrl,
    Alt,
    AltGr,
    Meta,
}

impl Modifier {
    /// Modifier family for a key, if the key is a modifier
    pub fn from_key(key: Key) -> Option<Modifier> {
        match key {
            Key::LEFT_SHIFT | Key::RIGHT_SHIFT => Some(Modifier::Shift),
            Key::LEFT_CTRL | Key::RIGHT_CTRL => Some(Modifier::Ctrl),
            Key::LEFT_ALT => Some(Modifier::Alt),
            Key::RIGHT_ALT => Some(Modifier::AltGr),
            Key::LEFT_META | Key::RIGHT_META => Some(Modifier::Meta),
            _ => None,
        }
    }

    pub fn is_key_modifier(key: Key) -> bool {
        Self::from_key(key).is_some() || key == Key::CAPSLOCK
    }
}

/// Held modifier keys plus the Caps Lock latch.
///
/// Both sides of a modifier are tracked separately so releasing one Shift
/// while the other is still down keeps Shift active.
#[derive(Debug, Clone, Default)]
pub struct ModifierState {
    held: HashSet<Key>,
    caps_lock: bool,
}

impl ModifierState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a press of `key`. Returns true if the key was a modifier.
    pub fn press(&mut self, key: Key) -> bool {
        if key == Key::CAPSLOCK {
            self.caps_lock = !self.caps_lock;
            return true;
        }
        if Modifier::from_key(key).is_some() {
            self.held.insert(key);
            return true;
        }
        false
    }

    /// Record a release of `key`. Returns true if the key was a modifier.
    pub fn release(&mut self, key: Key) -> bool {
        if key == Key::CAPSLOCK {
            return true;
        }
        if Modifier::from_key(key).is_some() {
            self.held.remove(&key);
            return true;
        }
        false
    }

    pub fn is_active(&self, modifier: Modifier) -> bool {
        self.held
            .iter()
            .any(|key| Modifier::from_key(*key) == Some(modifier))
    }

    pub fn caps_lock(&self) -> bool {
        self.caps_lock
    }

    pub fn set_caps_lock(&mut self, on: bool) {
        self.caps_lock = on;
    }

    /// Ctrl, Alt, AltGr or Meta held: the key is a shortcut, not text
    pub fn is_chording(&self) -> bool {
        self.is_active(Modifier::Ctrl)
            || self.is_active(Modifier::Alt)
            || self.is_active(Modifier::AltGr)
            || self.is_active(Modifier::Meta)
    }

    pub fn held_keys(&self) -> Vec<Key> {
        self.held.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.held.clear();
    }
}
