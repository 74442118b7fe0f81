// NiceType Substitution Engine
// Decides, per key press, whether to convert a punctuation pair or
// auto-complete a bracket/quote, and drives the injection sink.
//
// Evaluation order for a key event (first match wins):
// - echo guard raised: ignore the event, state untouched
// - NiceType disabled: forget state, no action
// - non-character key: forget state, no action
// - punctuation pair within the timeout: replace the last two characters
// - completion opener: insert the closer after the cursor
// - otherwise: remember the character

use std::sync::Arc;

use crate::input::KeyEvent;
use crate::output::{realize, InjectionSink};
use crate::settings::Settings;
use crate::transform::guard::EchoGuard;
use crate::transform::state::EngineState;
use crate::EngineAction;

type TextChangeCallback = Box<dyn FnMut(&str) + Send>;

/// Stateful matcher for one input session.
///
/// Events must be handed over one at a time, in the order they happened.
/// The engine is not `Sync`; the processor owns it on a single worker thread.
pub struct SubstitutionEngine<S: InjectionSink> {
    settings: Arc<Settings>,
    sink: S,
    state: EngineState,
    guard: EchoGuard,
    on_text_change: Option<TextChangeCallback>,
}

impl<S: InjectionSink> SubstitutionEngine<S> {
    pub fn new(settings: Arc<Settings>, sink: S) -> Self {
        Self {
            settings,
            sink,
            state: EngineState::new(),
            guard: EchoGuard::new(),
            on_text_change: None,
        }
    }

    /// Decide on `event` and, if the decision edits text, carry it out
    /// through the sink while the echo guard is raised.
    ///
    /// Sink failures are logged and do not change the returned action.
    pub fn handle(&mut self, event: &KeyEvent) -> EngineAction {
        let action = self.decide(event);
        if action.emits() {
            self.emit(&action);
        }
        action
    }

    /// Run the matcher for `event` without touching the sink.
    pub fn decide(&mut self, event: &KeyEvent) -> EngineAction {
        if self.guard.is_suppressing() {
            log::trace!("ignoring event while emitting: {:?}", event.character);
            return EngineAction::NoAction;
        }

        if !self.settings.is_enabled() {
            self.state.reset();
            return EngineAction::NoAction;
        }

        // Cursor movement, Enter, Backspace, shortcuts: a pending character
        // must never pair with whatever is typed next.
        let Some(ch) = event.character else {
            self.state.reset();
            return EngineAction::NoAction;
        };

        if let Some(replacement) = self.match_punctuation(ch, event) {
            self.state.clear_last_char();
            self.state.clear_self_paired();
            return EngineAction::replace_last_two(replacement);
        }

        let action = self.match_completion(ch);
        self.state.accept(ch, event.timestamp);
        action
    }

    fn match_punctuation(&self, ch: char, event: &KeyEvent) -> Option<char> {
        if !self.settings.is_punctuation_conversion_enabled() {
            return None;
        }
        let previous = self
            .state
            .recent_char(event.timestamp, self.settings.conversion_timeout())?;
        self.settings
            .punctuation_rules()
            .lookup(previous, ch, self.settings.is_case_sensitive())
    }

    fn match_completion(&mut self, ch: char) -> EngineAction {
        let closer = if self.settings.is_auto_complete_enabled() {
            self.settings.completion_rules().closer_for(ch)
        } else {
            None
        };

        match closer {
            None => {
                self.state.clear_self_paired();
                EngineAction::NoAction
            }
            Some(closer) if closer != ch => {
                self.state.clear_self_paired();
                EngineAction::insert_closer(closer)
            }
            // Second quote in a row closes the pair we opened.
            Some(_) if self.state.last_self_paired() == Some(ch) => {
                self.state.clear_self_paired();
                EngineAction::NoAction
            }
            Some(closer) => {
                self.state.mark_self_paired(ch);
                EngineAction::insert_closer(closer)
            }
        }
    }

    fn emit(&mut self, action: &EngineAction) {
        let suppression = self.guard.suppress(self.settings.echo_settle());
        let result = realize(&mut self.sink, action);
        drop(suppression);

        match result {
            Ok(()) => {
                log::debug!("applied: {}", action);
                if let (Some(callback), Some(text)) = (self.on_text_change.as_mut(), action.emitted_text()) {
                    callback(text);
                }
            }
            Err(e) => {
                log::warn!("failed to apply {}: {}", action, e);
            }
        }
    }

    /// Swap in a new settings snapshot. Only call between events.
    pub fn set_settings(&mut self, settings: Arc<Settings>) {
        self.settings = settings;
        self.state.reset();
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    /// Called with the emitted text after every successful emission
    pub fn set_text_change_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.on_text_change = Some(Box::new(callback));
    }

    /// Forget the pending character and the self-pairing marker
    pub fn reset(&mut self) {
        self.state.reset();
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// The echo guard raised around every emission
    pub fn echo_guard(&self) -> &EchoGuard {
        &self.guard
    }

    /// Raise `guard` around emissions instead of the engine's own flag, so
    /// an event source filtering on it drops the engine's synthetic keys.
    pub fn set_echo_guard(&mut self, guard: EchoGuard) {
        self.guard = guard;
    }

    pub fn is_suppressing_echo(&self) -> bool {
        self.guard.is_suppressing()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
