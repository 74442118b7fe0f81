// NiceType Output Layer - Injection Sink
// The text-editing capability the engine drives

use crate::EngineAction;

/// Error types for injection backends
#[derive(Debug, thiserror::Error)]
pub enum InjectionError {
    #[error("Failed to create virtual device: {0}")]
    DeviceCreation(String),

    #[error("Failed to write event: {0}")]
    WriteError(String),

    #[error("Cannot type character {0:?}")]
    Untypeable(char),

    #[error("Device not initialized")]
    NotInitialized,
}

/// Edits the text of the focused application with synthetic input.
pub trait InjectionSink {
    /// Delete `count` characters before the cursor
    fn delete_previous(&mut self, count: usize) -> Result<(), InjectionError>;

    /// Type `text` at the cursor
    fn insert_text(&mut self, text: &str) -> Result<(), InjectionError>;

    /// Move the cursor `count` positions to the left
    fn move_cursor_left(&mut self, count: usize) -> Result<(), InjectionError>;
}

impl<S: InjectionSink + ?Sized> InjectionSink for Box<S> {
    fn delete_previous(&mut self, count: usize) -> Result<(), InjectionError> {
        (**self).delete_previous(count)
    }

    fn insert_text(&mut self, text: &str) -> Result<(), InjectionError> {
        (**self).insert_text(text)
    }

    fn move_cursor_left(&mut self, count: usize) -> Result<(), InjectionError> {
        (**self).move_cursor_left(count)
    }
}

/// Carry out `action` on `sink`. Stops at the first failing step.
pub fn realize<S: InjectionSink + ?Sized>(sink: &mut S, action: &EngineAction) -> Result<(), InjectionError> {
    match action {
        EngineAction::NoAction => Ok(()),
        EngineAction::ReplaceLastTwoWith(replacement) => {
            sink.delete_previous(2)?;
            sink.insert_text(replacement)
        }
        EngineAction::InsertAfterCursor { text, cursor_back } => {
            sink.insert_text(text)?;
            if *cursor_back > 0 {
                sink.move_cursor_left(*cursor_back)?;
            }
            Ok(())
        }
    }
}

/// Sink that only logs what it would inject (`--dry-run`)
#[derive(Debug, Clone, Default)]
pub struct DryRunSink {
    calls: usize,
}

impl DryRunSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sink calls seen so far
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl InjectionSink for DryRunSink {
    fn delete_previous(&mut self, count: usize) -> Result<(), InjectionError> {
        self.calls += 1;
        log::info!("[dry-run] delete {} previous character(s)", count);
        Ok(())
    }

    fn insert_text(&mut self, text: &str) -> Result<(), InjectionError> {
        self.calls += 1;
        log::info!("[dry-run] insert {:?}", text);
        Ok(())
    }

    fn move_cursor_left(&mut self, count: usize) -> Result<(), InjectionError> {
        self.calls += 1;
        log::info!("[dry-run] move cursor left {}", count);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Recorder {
        calls: Vec<String>,
        fail_on_insert: bool,
    }

    impl InjectionSink for Recorder {
        fn delete_previous(&mut self, count: usize) -> Result<(), InjectionError> {
            self.calls.push(format!("delete {}", count));
            Ok(())
        }

        fn insert_text(&mut self, text: &str) -> Result<(), InjectionError> {
            if self.fail_on_insert {
                return Err(InjectionError::WriteError("insert refused".to_string()));
            }
            self.calls.push(format!("insert {}", text));
            Ok(())
        }

        fn move_cursor_left(&mut self, count: usize) -> Result<(), InjectionError> {
            self.calls.push(format!("left {}", count));
            Ok(())
        }
    }

    #[test]
    fn test_realize_replace() {
        let mut sink = Recorder::default();
        realize(&mut sink, &EngineAction::replace_last_two(',')).unwrap();
        assert_eq!(sink.calls, vec!["delete 2", "insert ,"]);
    }

    #[test]
    fn test_realize_insert_after_cursor() {
        let mut sink = Recorder::default();
        realize(&mut sink, &EngineAction::insert_closer(')')).unwrap();
        assert_eq!(sink.calls, vec!["insert )", "left 1"]);
    }

    #[test]
    fn test_realize_zero_cursor_back_skips_movement() {
        let mut sink = Recorder::default();
        let action = EngineAction::InsertAfterCursor {
            text: "x".to_string(),
            cursor_back: 0,
        };
        realize(&mut sink, &action).unwrap();
        assert_eq!(sink.calls, vec!["insert x"]);
    }

    #[test]
    fn test_realize_stops_at_first_error() {
        let mut sink = Recorder {
            fail_on_insert: true,
            ..Default::default()
        };
        let result = realize(&mut sink, &EngineAction::insert_closer(')'));
        assert!(matches!(result, Err(InjectionError::WriteError(_))));
        assert!(sink.calls.is_empty());
    }

    #[test]
    fn test_no_action_touches_nothing() {
        let mut sink = DryRunSink::new();
        realize(&mut sink, &EngineAction::NoAction).unwrap();
        assert_eq!(sink.calls(), 0);
        realize(&mut sink, &EngineAction::replace_last_two('.')).unwrap();
        assert_eq!(sink.calls(), 2);
    }

    #[test]
    fn test_boxed_sink() {
        let mut sink: Box<dyn InjectionSink> = Box::new(DryRunSink::new());
        assert!(realize(&mut sink, &EngineAction::insert_closer('"')).is_ok());
    }
}
