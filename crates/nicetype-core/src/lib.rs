// NiceType Core Library
// Punctuation conversion and bracket/quote auto-completion for typed text

pub mod action;
pub mod event;
pub mod input;
pub mod key;
pub mod modifier;
pub mod output;
pub mod processor;
pub mod rules;
pub mod settings;
pub mod transform;

pub use action::EngineAction;
pub use event::{ChannelSource, KeyEventSource, KeySender, SourceError, SourceResult};
pub use input::{is_keyboard, is_virtual_device, DeviceCapabilities, DeviceFilter, KeyEvent, KeyState, KeyTranslator};
pub use key::Key;
pub use modifier::{Modifier, ModifierState};
pub use output::{realize, DryRunSink, InjectionError, InjectionSink};
pub use processor::{InputProcessor, ProcessorError};
pub use rules::{CompletionRules, PunctuationRules, RuleError};
pub use settings::{Settings, SettingsError};
pub use transform::{EchoGuard, EngineState, SubstitutionEngine, Suppression};

#[cfg(feature = "evdev-backend")]
pub use event::{DeviceInfo, EventLoop, KeyboardListener};
#[cfg(feature = "evdev-backend")]
pub use output::VirtualDevice;
