// NiceType Input Processor
// Runs the substitution engine on a worker thread fed by an event source

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use crate::event::KeyEventSource;
use crate::output::InjectionSink;
use crate::settings::Settings;
use crate::transform::{EchoGuard, SubstitutionEngine};

/// How long the worker waits for input before re-checking the stop flag
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Errors from starting the processor
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("Failed to spawn processor thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Processor worker panicked; event source and engine are gone")]
    Unavailable,
}

type Parts<Src, S> = (Src, SubstitutionEngine<S>);

/// Owns the event source and the engine and moves them onto a worker
/// thread while running.
///
/// Events are handed to the engine one at a time in arrival order. Settings
/// updates are picked up between events, never during one.
pub struct InputProcessor<Src, S>
where
    Src: KeyEventSource + Send + 'static,
    S: InjectionSink + Send + 'static,
{
    parts: Option<Parts<Src, S>>,
    worker: Option<JoinHandle<Parts<Src, S>>>,
    running: Arc<AtomicBool>,
    pending_settings: Arc<Mutex<Option<Arc<Settings>>>>,
    guard: EchoGuard,
}

impl<Src, S> InputProcessor<Src, S>
where
    Src: KeyEventSource + Send + 'static,
    S: InjectionSink + Send + 'static,
{
    /// Pair `source` with `engine`. When the source filters echoes, the
    /// engine is switched over to the source's guard.
    pub fn new(source: Src, mut engine: SubstitutionEngine<S>) -> Self {
        if let Some(guard) = source.echo_guard() {
            engine.set_echo_guard(guard);
        }
        let guard = engine.echo_guard().clone();
        Self {
            parts: Some((source, engine)),
            worker: None,
            running: Arc::new(AtomicBool::new(false)),
            pending_settings: Arc::new(Mutex::new(None)),
            guard,
        }
    }

    /// Begin processing events. Does nothing if already running.
    pub fn start(&mut self) -> Result<(), ProcessorError> {
        if self.is_running() {
            return Ok(());
        }
        // A worker that ended on its own still holds the parts.
        self.reclaim();

        let (source, mut engine) = self.parts.take().ok_or(ProcessorError::Unavailable)?;
        if let Some(settings) = self.pending_settings.lock().take() {
            engine.set_settings(settings);
        }

        self.running.store(true, Ordering::Release);
        let running = Arc::clone(&self.running);
        let pending = Arc::clone(&self.pending_settings);

        let spawned = thread::Builder::new()
            .name("nicetype-processor".to_string())
            .spawn(move || run_worker(source, engine, running, pending));

        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                log::info!("input processor started");
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::Release);
                Err(ProcessorError::Spawn(e))
            }
        }
    }

    /// Stop processing and wait for the worker to exit.
    ///
    /// No event is handled after this returns. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if self.worker.is_some() {
            self.reclaim();
            log::info!("input processor stopped");
        }
    }

    /// Block until the worker ends on its own (its source ran dry or failed)
    pub fn wait(&mut self) {
        self.reclaim();
    }

    fn reclaim(&mut self) {
        if let Some(handle) = self.worker.take() {
            match handle.join() {
                Ok(parts) => self.parts = Some(parts),
                Err(_) => log::error!("input processor worker panicked"),
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Replace the settings snapshot. A running worker applies it before
    /// the next event; otherwise it is applied on the next `start`.
    pub fn update_settings(&self, settings: Arc<Settings>) {
        *self.pending_settings.lock() = Some(settings);
    }

    /// The engine's echo guard, for observers outside the worker
    pub fn echo_guard(&self) -> &EchoGuard {
        &self.guard
    }

    /// The engine, available while the processor is stopped
    pub fn engine(&self) -> Option<&SubstitutionEngine<S>> {
        self.parts.as_ref().map(|(_, engine)| engine)
    }

    /// Stop and hand back the source and engine
    pub fn into_parts(mut self) -> Option<Parts<Src, S>> {
        self.stop();
        self.parts.take()
    }
}

impl<Src, S> Drop for InputProcessor<Src, S>
where
    Src: KeyEventSource + Send + 'static,
    S: InjectionSink + Send + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker<Src, S>(
    mut source: Src,
    mut engine: SubstitutionEngine<S>,
    running: Arc<AtomicBool>,
    pending: Arc<Mutex<Option<Arc<Settings>>>>,
) -> Parts<Src, S>
where
    Src: KeyEventSource,
    S: InjectionSink,
{
    let apply_pending = |engine: &mut SubstitutionEngine<S>| {
        if let Some(settings) = pending.lock().take() {
            log::debug!("applying updated settings");
            engine.set_settings(settings);
        }
    };

    'outer: while running.load(Ordering::Acquire) {
        apply_pending(&mut engine);
        match source.poll_events(POLL_INTERVAL) {
            Ok(events) => {
                for event in events {
                    if !running.load(Ordering::Acquire) {
                        break 'outer;
                    }
                    apply_pending(&mut engine);
                    engine.handle(&event);
                }
            }
            Err(e) => {
                log::error!("event source failed: {}", e);
                break;
            }
        }
    }

    running.store(false, Ordering::Release);
    (source, engine)
}
