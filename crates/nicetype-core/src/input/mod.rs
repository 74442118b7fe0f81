// NiceType Input Layer
// Key events, key-code translation and device selection

mod device;
mod event;
mod translate;

pub use device::{is_keyboard, is_virtual_device, DeviceCapabilities, DeviceFilter, VIRTUAL_DEVICE_PREFIX};
pub use event::{KeyEvent, KeyState};
pub use translate::KeyTranslator;
