// NiceType Output Layer
// Injection sinks that realize engine actions

mod sink;

#[cfg(feature = "evdev-backend")]
mod uinput;

pub use sink::{realize, DryRunSink, InjectionError, InjectionSink};

#[cfg(feature = "evdev-backend")]
pub use uinput::VirtualDevice;
