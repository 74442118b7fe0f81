// NiceType Rule Tables
// Punctuation-pair and completion-pair lookup tables

use indexmap::IndexMap;

/// Errors raised while building rule tables from string keys
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("punctuation key '{0}' must be exactly 2 characters")]
    PunctuationKey(String),

    #[error("punctuation replacement '{0}' must be exactly 1 character")]
    PunctuationValue(String),

    #[error("completion opener '{0}' must be exactly 1 character")]
    CompletionKey(String),

    #[error("completion closer '{0}' must be exactly 1 character")]
    CompletionValue(String),
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

fn char_pair(s: &str) -> Option<[char; 2]> {
    let mut chars = s.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(a), Some(b), None) => Some([a, b]),
        _ => None,
    }
}

fn fold_char(c: char) -> char {
    // Multi-char lowercase expansions (e.g. 'İ') keep their original form.
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

/// Two-character sequence to single replacement character.
///
/// Rules keep their definition order. Inserting an existing key replaces its
/// value in place, so the last definition of a key wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PunctuationRules {
    rules: IndexMap<[char; 2], char>,
}

impl PunctuationRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from string pairs, validating every entry.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, RuleError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut rules = Self::new();
        for (key, value) in pairs {
            rules.insert_str(key.as_ref(), value.as_ref())?;
        }
        Ok(rules)
    }

    /// Insert a rule, returning the replacement it overwrote (if any)
    pub fn insert(&mut self, sequence: [char; 2], replacement: char) -> Option<char> {
        self.rules.insert(sequence, replacement)
    }

    /// Insert a rule given as strings
    pub fn insert_str(&mut self, sequence: &str, replacement: &str) -> Result<Option<char>, RuleError> {
        let key = char_pair(sequence).ok_or_else(|| RuleError::PunctuationKey(sequence.to_string()))?;
        let value =
            single_char(replacement).ok_or_else(|| RuleError::PunctuationValue(replacement.to_string()))?;
        Ok(self.insert(key, value))
    }

    pub fn remove(&mut self, sequence: [char; 2]) -> Option<char> {
        self.rules.shift_remove(&sequence)
    }

    /// Exact, case-sensitive lookup
    pub fn get(&self, first: char, second: char) -> Option<char> {
        self.rules.get(&[first, second]).copied()
    }

    /// Case-folded lookup. The first rule in table order whose folded key
    /// equals the folded candidate wins; the configured replacement is
    /// returned unchanged.
    pub fn get_folded(&self, first: char, second: char) -> Option<char> {
        let wanted = [fold_char(first), fold_char(second)];
        self.rules
            .iter()
            .find(|([a, b], _)| [fold_char(*a), fold_char(*b)] == wanted)
            .map(|(_, replacement)| *replacement)
    }

    /// Exact lookup first, then the case-folded fallback when `case_sensitive` is off
    pub fn lookup(&self, first: char, second: char, case_sensitive: bool) -> Option<char> {
        match self.get(first, second) {
            Some(replacement) => Some(replacement),
            None if !case_sensitive => self.get_folded(first, second),
            None => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = ([char; 2], char)> + '_ {
        self.rules.iter().map(|(k, v)| (*k, *v))
    }

    /// Rules rendered back to string form, in table order
    pub fn to_string_map(&self) -> IndexMap<String, String> {
        self.rules
            .iter()
            .map(|([a, b], v)| (format!("{a}{b}"), v.to_string()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Opening character to closing character.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionRules {
    rules: IndexMap<char, char>,
}

impl CompletionRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from string pairs, validating every entry.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, RuleError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut rules = Self::new();
        for (key, value) in pairs {
            rules.insert_str(key.as_ref(), value.as_ref())?;
        }
        Ok(rules)
    }

    pub fn insert(&mut self, opener: char, closer: char) -> Option<char> {
        self.rules.insert(opener, closer)
    }

    pub fn insert_str(&mut self, opener: &str, closer: &str) -> Result<Option<char>, RuleError> {
        let key = single_char(opener).ok_or_else(|| RuleError::CompletionKey(opener.to_string()))?;
        let value = single_char(closer).ok_or_else(|| RuleError::CompletionValue(closer.to_string()))?;
        Ok(self.insert(key, value))
    }

    pub fn remove(&mut self, opener: char) -> Option<char> {
        self.rules.shift_remove(&opener)
    }

    /// Closer for `opener`. Always case-sensitive.
    pub fn closer_for(&self, opener: char) -> Option<char> {
        self.rules.get(&opener).copied()
    }

    /// Whether `opener` closes with itself (quote-like pairs)
    pub fn is_self_pairing(&self, opener: char) -> bool {
        self.closer_for(opener) == Some(opener)
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, char)> + '_ {
        self.rules.iter().map(|(k, v)| (*k, *v))
    }

    pub fn to_string_map(&self) -> IndexMap<String, String> {
        self.rules
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
