// NiceType Echo Guard
// Keeps the engine from re-reading its own synthetic keystrokes

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared echo-suppression flag.
///
/// Clones observe the same flag, so a capture thread can check it while the
/// engine is emitting. The flag is only raised through [`EchoGuard::suppress`],
/// and the returned [`Suppression`] lowers it again when dropped.
#[derive(Debug, Clone, Default)]
pub struct EchoGuard {
    suppressing: Arc<AtomicBool>,
}

impl EchoGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_suppressing(&self) -> bool {
        self.suppressing.load(Ordering::Acquire)
    }

    /// Raise the flag and wait `settle` before returning.
    ///
    /// The same delay is waited again on drop, before the flag is lowered,
    /// so synthetic events that the backend delivers late still find the
    /// guard raised.
    pub fn suppress(&self, settle: Duration) -> Suppression {
        self.suppressing.store(true, Ordering::Release);
        if !settle.is_zero() {
            std::thread::sleep(settle);
        }
        Suppression {
            guard: self.clone(),
            settle,
        }
    }
}

/// An active suppression window. Dropping it lowers the flag on every exit
/// path, including early returns and panic unwinding out of a sink.
#[derive(Debug)]
#[must_use = "the echo guard is lowered as soon as the Suppression is dropped"]
pub struct Suppression {
    guard: EchoGuard,
    settle: Duration,
}

impl Drop for Suppression {
    fn drop(&mut self) {
        if !self.settle.is_zero() {
            std::thread::sleep(self.settle);
        }
        self.guard.suppressing.store(false, Ordering::Release);
    }
}
