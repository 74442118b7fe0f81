// NiceType Event Sources
// Where the processor pulls key events from

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SendError, Sender};
use std::time::Duration;

use crate::input::KeyEvent;
use crate::transform::EchoGuard;

/// Result type for event source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors that end event capture
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Event device error: {0}")]
    Evdev(String),

    #[error("Event source disconnected")]
    Disconnected,
}

/// A stream of key events in the order they happened.
pub trait KeyEventSource {
    /// Wait up to `timeout` for events.
    ///
    /// An empty vector means nothing arrived in time. An error means the
    /// source is gone and will not produce further events.
    fn poll_events(&mut self, timeout: Duration) -> SourceResult<Vec<KeyEvent>>;

    /// The flag this source checks when an event arrives.
    ///
    /// Sources that can observe the engine's own synthetic keys return the
    /// guard they filter with; the processor makes the engine raise that
    /// same flag while emitting. Sources that never see synthetic keys
    /// return `None`.
    fn echo_guard(&self) -> Option<EchoGuard> {
        None
    }
}

impl<T: KeyEventSource + ?Sized> KeyEventSource for Box<T> {
    fn poll_events(&mut self, timeout: Duration) -> SourceResult<Vec<KeyEvent>> {
        (**self).poll_events(timeout)
    }

    fn echo_guard(&self) -> Option<EchoGuard> {
        (**self).echo_guard()
    }
}

/// Event source fed from another thread through a channel.
///
/// Lets a host with its own capture mechanism (a global key hook that also
/// sees injected keys) drive the processor.
#[derive(Debug)]
pub struct ChannelSource {
    receiver: Receiver<KeyEvent>,
    guard: EchoGuard,
}

/// Feeding end of a [`ChannelSource`].
///
/// Events sent while the echo guard is raised are the engine's own output
/// coming back and are dropped on arrival.
#[derive(Debug, Clone)]
pub struct KeySender {
    sender: Sender<KeyEvent>,
    guard: EchoGuard,
}

impl KeySender {
    /// Queue `event`. Returns `Ok(false)` when it was dropped as an echo.
    pub fn send(&self, event: KeyEvent) -> Result<bool, SendError<KeyEvent>> {
        if self.guard.is_suppressing() {
            log::trace!("dropping echoed event: {:?}", event.character);
            return Ok(false);
        }
        self.sender.send(event)?;
        Ok(true)
    }
}

impl ChannelSource {
    /// Create a source and the sender that feeds it
    pub fn new() -> (KeySender, Self) {
        let (sender, receiver) = mpsc::channel();
        let guard = EchoGuard::new();
        (
            KeySender {
                sender,
                guard: guard.clone(),
            },
            Self { receiver, guard },
        )
    }
}

impl KeyEventSource for ChannelSource {
    fn poll_events(&mut self, timeout: Duration) -> SourceResult<Vec<KeyEvent>> {
        let first = match self.receiver.recv_timeout(timeout) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => return Ok(Vec::new()),
            Err(RecvTimeoutError::Disconnected) => return Err(SourceError::Disconnected),
        };

        let mut events = vec![first];
        events.extend(self.receiver.try_iter());
        Ok(events)
    }

    fn echo_guard(&self) -> Option<EchoGuard> {
        Some(self.guard.clone())
    }
}
