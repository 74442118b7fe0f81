use std::time::{Duration, Instant};

/// Per-session matcher state of the substitution engine.
///
/// The last accepted character and its timestamp are always set and cleared
/// together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineState {
    last: Option<(char, Instant)>,
    last_self_paired: Option<char>,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_char(&self) -> Option<char> {
        self.last.map(|(ch, _)| ch)
    }

    pub fn last_char_timestamp(&self) -> Option<Instant> {
        self.last.map(|(_, at)| at)
    }

    /// The previous character, if it was typed no more than `timeout` before `now`
    pub fn recent_char(&self, now: Instant, timeout: Duration) -> Option<char> {
        let (ch, at) = self.last?;
        if now.saturating_duration_since(at) <= timeout {
            Some(ch)
        } else {
            None
        }
    }

    pub fn accept(&mut self, ch: char, at: Instant) {
        self.last = Some((ch, at));
    }

    pub fn clear_last_char(&mut self) {
        self.last = None;
    }

    pub fn last_self_paired(&self) -> Option<char> {
        self.last_self_paired
    }

    pub fn mark_self_paired(&mut self, ch: char) {
        self.last_self_paired = Some(ch);
    }

    pub fn clear_self_paired(&mut self) {
        self.last_self_paired = None;
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.last_self_paired = None;
    }
}
