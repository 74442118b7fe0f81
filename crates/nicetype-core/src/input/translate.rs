// NiceType Input Layer - Key Translation
// Raw key code + state -> engine KeyEvent, US layout

use std::time::Instant;

use crate::input::{KeyEvent, KeyState};
use crate::key::{char_for_key, is_letter_key};
use crate::modifier::{Modifier, ModifierState};
use crate::Key;

/// Turns the raw key stream of one keyboard into engine events.
///
/// - releases produce nothing
/// - modifier presses only update the modifier state and produce nothing
/// - printable keys without Ctrl/Alt/Meta produce a character event
/// - everything else produces a non-character event
#[derive(Debug, Clone, Default)]
pub struct KeyTranslator {
    modifiers: ModifierState,
}

impl KeyTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a known Caps Lock state (e.g. read from the device LEDs)
    pub fn with_caps_lock(caps_lock: bool) -> Self {
        let mut modifiers = ModifierState::new();
        modifiers.set_caps_lock(caps_lock);
        Self { modifiers }
    }

    pub fn translate(&mut self, key: Key, state: KeyState, timestamp: Instant) -> Option<KeyEvent> {
        if !state.is_pressed() {
            self.modifiers.release(key);
            return None;
        }

        // Auto-repeat of a held modifier must not toggle Caps Lock again.
        if state == KeyState::Repeat && Modifier::is_key_modifier(key) {
            return None;
        }

        if self.modifiers.press(key) {
            return None;
        }

        if self.modifiers.is_chording() {
            return Some(KeyEvent::non_character(timestamp));
        }

        let mut shifted = self.modifiers.is_active(Modifier::Shift);
        if self.modifiers.caps_lock() && is_letter_key(key) {
            shifted = !shifted;
        }

        match char_for_key(key, shifted) {
            Some(ch) => Some(KeyEvent::character(ch, timestamp)),
            None => Some(KeyEvent::non_character(timestamp)),
        }
    }

    pub fn modifiers(&self) -> &ModifierState {
        &self.modifiers
    }

    /// Forget held modifiers (e.g. after a device was reopened)
    pub fn reset(&mut self) {
        self.modifiers.clear();
    }
}
