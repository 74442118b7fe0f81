use std::fmt;

/// What the substitution engine decided to do about one key event.
///
/// The engine only decides; an [`InjectionSink`](crate::output::InjectionSink)
/// realizes the edit in the focused application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineAction {
    /// Leave the text as typed
    NoAction,
    /// Delete the two most recently typed characters, then type the replacement
    ReplaceLastTwoWith(String),
    /// Type `text` at the cursor, then move the cursor back `cursor_back` positions
    InsertAfterCursor { text: String, cursor_back: usize },
}

impl EngineAction {
    pub fn replace_last_two(replacement: char) -> Self {
        EngineAction::ReplaceLastTwoWith(replacement.to_string())
    }

    /// Insert a closer and leave the cursor between the pair
    pub fn insert_closer(closer: char) -> Self {
        EngineAction::InsertAfterCursor {
            text: closer.to_string(),
            cursor_back: 1,
        }
    }

    /// Returns true if realizing this action injects synthetic keys
    pub fn emits(&self) -> bool {
        !matches!(self, EngineAction::NoAction)
    }

    /// Text typed into the application by this action, if any
    pub fn emitted_text(&self) -> Option<&str> {
        match self {
            EngineAction::NoAction => None,
            EngineAction::ReplaceLastTwoWith(text) => Some(text),
            EngineAction::InsertAfterCursor { text, .. } => Some(text),
        }
    }
}

impl fmt::Display for EngineAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineAction::NoAction => write!(f, "no action"),
            EngineAction::ReplaceLastTwoWith(text) => write!(f, "replace last two with {:?}", text),
            EngineAction::InsertAfterCursor { text, cursor_back } => {
                write!(f, "insert {:?} and move cursor back {}", text, cursor_back)
            }
        }
    }
}
