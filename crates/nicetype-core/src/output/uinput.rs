// NiceType uinput Output Layer
// Virtual keyboard that realizes engine actions as synthetic key events

use std::collections::HashSet;
use std::time::Duration;

use evdev::uinput::VirtualDeviceBuilder;
use evdev::{AttributeSet, EventType, InputEvent};

use super::sink::{InjectionError, InjectionSink};
use crate::input::VIRTUAL_DEVICE_PREFIX;
use crate::key::{key_for_char, key_from_name};
use crate::Key;

/// Virtual uinput keyboard used for injection
pub struct VirtualDevice {
    device: evdev::uinput::VirtualDevice,
    /// Keys this device currently holds down
    pressed: HashSet<Key>,
    key_pre_delay_ms: u64,
    key_post_delay_ms: u64,
}

impl VirtualDevice {
    /// Create a new virtual uinput device
    pub fn new() -> Result<Self, InjectionError> {
        let mut keys = AttributeSet::new();
        // All standard keyboard keys (0-255)
        for code in 0..256u16 {
            keys.insert(evdev::Key::new(code));
        }

        let device = VirtualDeviceBuilder::new()
            .map_err(|e: std::io::Error| InjectionError::DeviceCreation(e.to_string()))?
            .name(&format!("{} Keyboard", VIRTUAL_DEVICE_PREFIX))
            .with_keys(&keys)
            .map_err(|e: std::io::Error| InjectionError::DeviceCreation(e.to_string()))?
            .build()
            .map_err(|e: std::io::Error| InjectionError::DeviceCreation(e.to_string()))?;

        log::debug!("virtual keyboard created");

        Ok(Self {
            device,
            pressed: HashSet::new(),
            key_pre_delay_ms: 0,
            key_post_delay_ms: 0,
        })
    }

    /// Configure output throttle delays in milliseconds.
    pub fn set_throttle_delays(&mut self, key_pre_delay_ms: u64, key_post_delay_ms: u64) {
        self.key_pre_delay_ms = key_pre_delay_ms;
        self.key_post_delay_ms = key_post_delay_ms;
    }

    fn write_key_event(&mut self, key: Key, pressed: bool) -> Result<(), InjectionError> {
        let key_event = InputEvent::new(EventType::KEY, key.code(), i32::from(pressed));
        // SYN event is required for the kernel to process the key event
        let syn_event = InputEvent::new(EventType::SYNCHRONIZATION, 0, 0);

        self.device
            .emit(&[key_event, syn_event])
            .map_err(|e: std::io::Error| InjectionError::WriteError(e.to_string()))?;

        if pressed {
            self.pressed.insert(key);
        } else {
            self.pressed.remove(&key);
        }
        Ok(())
    }

    /// Send a single press or release with the configured delays
    fn send_key(&mut self, key: Key, pressed: bool) -> Result<(), InjectionError> {
        log::trace!("emit {} {}", key, if pressed { "press" } else { "release" });
        if self.key_pre_delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.key_pre_delay_ms));
        }
        self.write_key_event(key, pressed)?;
        if self.key_post_delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.key_post_delay_ms));
        }
        Ok(())
    }

    fn tap_key(&mut self, key: Key) -> Result<(), InjectionError> {
        self.send_key(key, true)?;
        self.send_key(key, false)
    }

    fn tap_key_times(&mut self, key: Key, count: usize) -> Result<(), InjectionError> {
        for _ in 0..count {
            self.tap_key(key)?;
        }
        Ok(())
    }

    fn send_ascii_char(&mut self, ch: char) -> Result<bool, InjectionError> {
        let Some((key, needs_shift)) = key_for_char(ch) else {
            return Ok(false);
        };

        let modifiers: &[Key] = if needs_shift { &[Key::LEFT_SHIFT] } else { &[] };
        tap_chord(&mut |k, pressed| self.send_key(k, pressed), modifiers, key)?;
        Ok(true)
    }

    /// Send a Unicode character via the Ctrl+Shift+U compose sequence.
    pub fn send_unicode(&mut self, ch: char) -> Result<(), InjectionError> {
        let hex = format!("{:x}", ch as u32);

        tap_chord(
            &mut |k, pressed| self.send_key(k, pressed),
            &[Key::LEFT_CTRL, Key::LEFT_SHIFT],
            Key::U,
        )?;

        // Type hexadecimal codepoint and commit with Enter.
        for digit in hex.chars() {
            let key = key_from_name(&digit.to_string()).ok_or(InjectionError::Untypeable(ch))?;
            self.tap_key(key)?;
        }
        self.tap_key(Key::ENTER)
    }

    /// Send text using direct US layout keys when possible, with Unicode compose fallback.
    pub fn send_text(&mut self, text: &str) -> Result<(), InjectionError> {
        for ch in text.chars() {
            if !self.send_ascii_char(ch)? {
                self.send_unicode(ch)?;
            }

            // Some apps drop characters when virtual key events arrive with
            // zero gap. Pace them unless a post delay is already configured.
            if self.key_post_delay_ms == 0 {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
        Ok(())
    }

    /// Release all keys this device still holds
    pub fn release_all(&mut self) -> Result<(), InjectionError> {
        let held: Vec<Key> = self.pressed.iter().copied().collect();
        for key in held {
            self.send_key(key, false)?;
        }
        Ok(())
    }

    /// Close the virtual device
    pub fn close(mut self) -> Result<(), InjectionError> {
        self.release_all()
    }
}

impl InjectionSink for VirtualDevice {
    fn delete_previous(&mut self, count: usize) -> Result<(), InjectionError> {
        self.tap_key_times(Key::BACKSPACE, count)
    }

    fn insert_text(&mut self, text: &str) -> Result<(), InjectionError> {
        self.send_text(text)
    }

    fn move_cursor_left(&mut self, count: usize) -> Result<(), InjectionError> {
        self.tap_key_times(Key::LEFT, count)
    }
}

/// Press `modifiers` in order, tap `key`, then release the modifiers in
/// reverse. Every modifier that went down comes back up even when a later
/// write fails; the first error is returned.
fn tap_chord<F>(send: &mut F, modifiers: &[Key], key: Key) -> Result<(), InjectionError>
where
    F: FnMut(Key, bool) -> Result<(), InjectionError>,
{
    let mut held = 0;
    let mut result = Ok(());
    for &modifier in modifiers {
        if let Err(e) = send(modifier, true) {
            result = Err(e);
            break;
        }
        held += 1;
    }

    if result.is_ok() {
        result = match send(key, true) {
            Ok(()) => send(key, false),
            Err(e) => Err(e),
        };
    }

    for &modifier in modifiers[..held].iter().rev() {
        let released = send(modifier, false);
        if result.is_ok() {
            result = released;
        }
    }
    result
}

impl Drop for VirtualDevice {
    fn drop(&mut self) {
        // Never leave a synthetic modifier stuck down.
        let _ = self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_device_creation() {
        // Requires /dev/uinput access; unavailable in most CI containers.
        match VirtualDevice::new() {
            Ok(device) => {
                assert!(device.pressed.is_empty());
            }
            Err(InjectionError::DeviceCreation(_)) => {
                println!("Skipping test: uinput not available");
            }
            Err(e) => panic!("Unexpected error: {}", e),
        }
    }

    #[test]
    fn test_unicode_hex_digits_resolve_to_keys() {
        for digit in "0123456789abcdef".chars() {
            assert!(key_from_name(&digit.to_string()).is_some(), "no key for {}", digit);
        }
    }

    /// Records every write and fails the first press of `fail_on`
    fn recorder(
        log: &mut Vec<(Key, bool)>,
        fail_on: Key,
    ) -> impl FnMut(Key, bool) -> Result<(), InjectionError> + '_ {
        move |key, pressed| {
            if pressed && key == fail_on {
                return Err(InjectionError::WriteError("device gone".to_string()));
            }
            log.push((key, pressed));
            Ok(())
        }
    }

    #[test]
    fn test_chord_releases_modifiers_in_reverse() {
        let mut log = Vec::new();
        let mut send = recorder(&mut log, Key::ENTER);
        tap_chord(&mut send, &[Key::LEFT_CTRL, Key::LEFT_SHIFT], Key::U).unwrap();
        drop(send);
        assert_eq!(
            log,
            vec![
                (Key::LEFT_CTRL, true),
                (Key::LEFT_SHIFT, true),
                (Key::U, true),
                (Key::U, false),
                (Key::LEFT_SHIFT, false),
                (Key::LEFT_CTRL, false),
            ]
        );
    }

    #[test]
    fn test_failed_tap_still_releases_modifiers() {
        let mut log = Vec::new();
        let mut send = recorder(&mut log, Key::U);
        let result = tap_chord(&mut send, &[Key::LEFT_CTRL, Key::LEFT_SHIFT], Key::U);
        drop(send);
        assert!(matches!(result, Err(InjectionError::WriteError(_))));
        assert_eq!(
            log,
            vec![
                (Key::LEFT_CTRL, true),
                (Key::LEFT_SHIFT, true),
                (Key::LEFT_SHIFT, false),
                (Key::LEFT_CTRL, false),
            ]
        );
    }

    #[test]
    fn test_failed_modifier_press_releases_earlier_ones() {
        let mut log = Vec::new();
        let mut send = recorder(&mut log, Key::LEFT_SHIFT);
        let result = tap_chord(&mut send, &[Key::LEFT_CTRL, Key::LEFT_SHIFT], Key::U);
        drop(send);
        assert!(result.is_err());
        assert_eq!(log, vec![(Key::LEFT_CTRL, true), (Key::LEFT_CTRL, false)]);
    }
}
