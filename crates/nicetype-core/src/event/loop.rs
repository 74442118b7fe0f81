// NiceType Event Loop
// Direct evdev capture of physical keyboards

use std::os::unix::io::AsRawFd;
use std::time::{Duration, Instant};

use evdev::{Device, EventType, InputEvent, LedType};

use super::source::{KeyEventSource, SourceError, SourceResult};
use crate::input::{DeviceCapabilities, DeviceFilter, KeyEvent, KeyState, KeyTranslator};
use crate::Key;

/// Device information for listing devices
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Device index
    pub index: usize,
    /// Device name
    pub name: String,
    /// Device path (if available)
    pub path: Option<String>,
    /// Whether the autodetect filter would pick this device
    pub is_keyboard: bool,
}

/// Poll-based reader over a set of evdev devices.
///
/// Devices are opened read-only and never grabbed: the focused application
/// keeps receiving every key, NiceType only watches.
pub struct EventLoop {
    devices: Vec<Device>,
    poll_fds: Vec<libc::pollfd>,
}

impl EventLoop {
    /// Open every device the filter selects
    pub fn new(filter: &DeviceFilter) -> SourceResult<Self> {
        let devices = Self::find_keyboards(filter)?;
        let poll_fds = Self::create_poll_fds(&devices);
        Ok(Self { devices, poll_fds })
    }

    fn create_poll_fds(devices: &[Device]) -> Vec<libc::pollfd> {
        devices
            .iter()
            .map(|d| libc::pollfd {
                fd: d.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            })
            .collect()
    }

    fn capabilities(device: &Device) -> DeviceCapabilities {
        let keys = device
            .supported_keys()
            .map(|keys| keys.iter().map(|k| k.code()).collect::<Vec<_>>())
            .unwrap_or_default();
        DeviceCapabilities::new(device.supported_events().contains(EventType::KEY), keys)
    }

    /// List input devices with key support (`--list-devices`)
    pub fn list_devices() -> SourceResult<Vec<DeviceInfo>> {
        let autodetect = DeviceFilter::autodetect();
        let mut devices_info = Vec::new();

        for (path, device) in evdev::enumerate() {
            let caps = Self::capabilities(&device);
            if !caps.has_ev_key {
                continue;
            }
            let name = device.name().unwrap_or("Unknown").to_string();
            let device_path = path.to_str().map(|s| s.to_string());
            let is_keyboard = autodetect.matches(&name, device_path.as_deref().unwrap_or_default(), &caps);
            devices_info.push(DeviceInfo {
                index: devices_info.len(),
                name,
                path: device_path,
                is_keyboard,
            });
        }

        if devices_info.is_empty() {
            return Err(SourceError::DeviceNotFound("No input devices found".to_string()));
        }

        Ok(devices_info)
    }

    fn find_keyboards(filter: &DeviceFilter) -> SourceResult<Vec<Device>> {
        let mut keyboards = Vec::new();

        for (path, device) in evdev::enumerate() {
            let device_name = device.name().unwrap_or("Unknown");
            let device_path = path.to_str().unwrap_or_default();
            if filter.matches(device_name, device_path, &Self::capabilities(&device)) {
                log::info!("capturing {} ({})", device_name, device_path);
                keyboards.push(device);
            }
        }

        if keyboards.is_empty() {
            return Err(SourceError::DeviceNotFound("No keyboard devices found".to_string()));
        }

        Ok(keyboards)
    }

    /// Whether Caps Lock is lit on any captured keyboard
    pub fn caps_lock_on(&self) -> bool {
        self.devices.iter().any(|d| {
            d.get_led_state()
                .map(|leds| leds.contains(LedType::LED_CAPSL))
                .unwrap_or(false)
        })
    }

    /// Wait up to `timeout_ms` for raw events from any device.
    ///
    /// Timeout and EINTR both yield an empty vector. A device that hangs up
    /// is dropped; once none are left the loop reports `Disconnected`.
    pub fn poll_for_events(&mut self, timeout_ms: i32) -> SourceResult<Vec<InputEvent>> {
        let mut events = Vec::new();

        let poll_result = unsafe {
            libc::poll(
                self.poll_fds.as_mut_ptr(),
                self.poll_fds.len() as libc::nfds_t,
                timeout_ms,
            )
        };

        if poll_result < 0 {
            let err = std::io::Error::last_os_error();
            // EINTR: a signal arrived, the caller re-checks its stop flag.
            if err.raw_os_error() == Some(libc::EINTR) {
                return Ok(events);
            }
            return Err(SourceError::Io(err));
        }

        if poll_result == 0 {
            return Ok(events);
        }

        let mut hung_up = Vec::new();
        for (i, device) in self.devices.iter_mut().enumerate() {
            let revents = self.poll_fds[i].revents;
            if revents & libc::POLLIN != 0 {
                let fetched = device.fetch_events().map(|batch| batch.collect::<Vec<_>>());
                match fetched {
                    Ok(device_events) => events.extend(device_events),
                    Err(e) if e.raw_os_error() == Some(libc::ENODEV) => hung_up.push(i),
                    Err(e) => log::debug!("read from {} failed: {}", device.name().unwrap_or("Unknown"), e),
                }
            } else if revents & (libc::POLLHUP | libc::POLLERR) != 0 {
                hung_up.push(i);
            }
        }

        for i in hung_up.into_iter().rev() {
            let device = self.devices.remove(i);
            self.poll_fds.remove(i);
            log::warn!("keyboard {} went away", device.name().unwrap_or("Unknown"));
        }
        if self.devices.is_empty() {
            return Err(SourceError::Disconnected);
        }

        Ok(events)
    }

    /// Get the names of all devices
    pub fn device_names(&self) -> Vec<String> {
        self.devices
            .iter()
            .map(|d| d.name().unwrap_or("Unknown").to_string())
            .collect()
    }

    /// Get number of devices managed by this event loop
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}

/// Physical keyboards as a [`KeyEventSource`].
///
/// Raw key codes go through a [`KeyTranslator`]; each event is stamped with
/// the time it was read.
pub struct KeyboardListener {
    event_loop: EventLoop,
    translator: KeyTranslator,
}

impl KeyboardListener {
    pub fn new(filter: &DeviceFilter) -> SourceResult<Self> {
        let event_loop = EventLoop::new(filter)?;
        let translator = KeyTranslator::with_caps_lock(event_loop.caps_lock_on());
        Ok(Self {
            event_loop,
            translator,
        })
    }

    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }
}

impl KeyEventSource for KeyboardListener {
    fn poll_events(&mut self, timeout: Duration) -> SourceResult<Vec<KeyEvent>> {
        let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        let raw = self.event_loop.poll_for_events(timeout_ms)?;
        let now = Instant::now();

        Ok(raw
            .into_iter()
            .filter(|e| e.event_type() == EventType::KEY)
            .filter_map(|e| {
                let state = KeyState::from_i32(e.value())?;
                self.translator.translate(Key(e.code()), state, now)
            })
            .collect())
    }
}
