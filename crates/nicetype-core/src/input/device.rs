// NiceType Input Layer - Device Detection
// Keyboard detection and device selection for key capture

use std::collections::HashSet;

/// Name prefix of the uinput device NiceType injects through.
///
/// Devices carrying it are never observed, so injected keys do not come
/// back as input.
pub const VIRTUAL_DEVICE_PREFIX: &str = "NiceType (virtual)";

/// Device capabilities extracted from an evdev device
#[derive(Debug, Clone)]
pub struct DeviceCapabilities {
    /// Whether the device supports EV_KEY events
    pub has_ev_key: bool,
    /// Supported EV_KEY codes
    pub supported_keys: HashSet<u16>,
}

impl DeviceCapabilities {
    pub fn new(has_ev_key: bool, supported_keys: impl IntoIterator<Item = u16>) -> Self {
        Self {
            has_ev_key,
            supported_keys: supported_keys.into_iter().collect(),
        }
    }

    pub fn supports_key(&self, key_code: u16) -> bool {
        self.supported_keys.contains(&key_code)
    }
}

// QWERTY row key codes: Q, W, E, R, T, Y
const QWERTY_CODES: &[u16] = &[16, 17, 18, 19, 20, 21];

// Representative A-Z and SPACE codes
const A_Z_SPACE_CODES: &[u16] = &[57, 30, 44];

/// A device is a keyboard if it reports EV_KEY with the whole QWERTY row,
/// A, Z and SPACE. Mice, power buttons and media remotes fail this test.
pub fn is_keyboard(capabilities: &DeviceCapabilities) -> bool {
    capabilities.has_ev_key
        && QWERTY_CODES
            .iter()
            .chain(A_Z_SPACE_CODES)
            .all(|code| capabilities.supports_key(*code))
}

/// Check if a device is one of our own virtual devices
pub fn is_virtual_device(name: &str) -> bool {
    name.contains(VIRTUAL_DEVICE_PREFIX)
}

/// Which devices the capture layer observes.
///
/// With an empty name list every physical keyboard is used. With names,
/// only devices whose name or path is listed are used. Our own virtual
/// device is excluded in both modes.
#[derive(Debug, Clone, Default)]
pub struct DeviceFilter {
    names: Vec<String>,
}

impl DeviceFilter {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn autodetect() -> Self {
        Self::default()
    }

    pub fn is_autodetect(&self) -> bool {
        self.names.is_empty()
    }

    pub fn matches(&self, name: &str, path: &str, capabilities: &DeviceCapabilities) -> bool {
        if is_virtual_device(name) {
            return false;
        }
        if self.is_autodetect() {
            return is_keyboard(capabilities);
        }
        self.names.iter().any(|wanted| wanted == name || wanted == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyboard_caps() -> DeviceCapabilities {
        let mut keys = vec![0];
        keys.extend_from_slice(QWERTY_CODES);
        keys.extend_from_slice(A_Z_SPACE_CODES);
        keys.extend_from_slice(&[2, 3, 4, 14, 15, 28, 29, 42, 56]);
        DeviceCapabilities::new(true, keys)
    }

    fn mouse_caps() -> DeviceCapabilities {
        DeviceCapabilities::new(true, vec![272, 273, 274]) // BTN_LEFT, BTN_RIGHT, BTN_MIDDLE
    }

    #[test]
    fn test_is_keyboard() {
        assert!(is_keyboard(&keyboard_caps()));
        assert!(!is_keyboard(&mouse_caps()));
        assert!(!is_keyboard(&DeviceCapabilities::new(false, QWERTY_CODES.to_vec())));
    }

    #[test]
    fn test_is_keyboard_requires_full_qwerty_row() {
        let caps = DeviceCapabilities::new(true, vec![16, 17, 18, 57, 30, 44]);
        assert!(!is_keyboard(&caps));
    }

    #[test]
    fn test_is_virtual_device() {
        assert!(is_virtual_device("NiceType (virtual) Keyboard"));
        assert!(!is_virtual_device("AT Translated Set 2 keyboard"));
    }

    #[test]
    fn test_autodetect_filter() {
        let filter = DeviceFilter::autodetect();
        assert!(filter.matches("USB Keyboard", "/dev/input/event3", &keyboard_caps()));
        assert!(!filter.matches("USB Mouse", "/dev/input/event4", &mouse_caps()));
        assert!(!filter.matches(
            "NiceType (virtual) Keyboard",
            "/dev/input/event9",
            &keyboard_caps()
        ));
    }

    #[test]
    fn test_named_filter() {
        let filter = DeviceFilter::new(vec!["/dev/input/event4".to_string(), "Macro Pad".to_string()]);
        // Explicit selection does not require keyboard capabilities.
        assert!(filter.matches("USB Mouse", "/dev/input/event4", &mouse_caps()));
        assert!(filter.matches("Macro Pad", "/dev/input/event7", &mouse_caps()));
        assert!(!filter.matches("USB Keyboard", "/dev/input/event3", &keyboard_caps()));
        assert!(!filter.matches(
            "NiceType (virtual) Keyboard",
            "/dev/input/event4",
            &keyboard_caps()
        ));
    }
}
