// NiceType Event Handling
// Key event sources: evdev capture and channel-fed input

pub mod source;
#[cfg(feature = "evdev-backend")]
pub mod r#loop;

pub use source::{ChannelSource, KeyEventSource, KeySender, SourceError, SourceResult};
#[cfg(feature = "evdev-backend")]
pub use r#loop::{DeviceInfo, EventLoop, KeyboardListener};
