//! Activity journal with heterogeneous value storage.
//!
//! Hosting engines keep a journal per activity execution for diagnostics.
//! The ring group records the dial attempts it collected and the calls it
//! hung up on exit.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// Journal key under which every issued dial attempt is recorded.
pub const COLLECTED_DIAL_RESPONSES: &str = "Collected Dial Responses";
/// Journal key set to `true` once exit cleanup begins.
pub const EXITING: &str = "Exiting";
/// Journal key listing the outgoing calls hung up by exit cleanup.
pub const OUTGOING_CALLS: &str = "Outgoing Calls";

/// Type-safe journal key wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JournalKey(String);

impl JournalKey {
    /// Creates a new JournalKey.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl fmt::Display for JournalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JournalKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::borrow::Borrow<str> for JournalKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Journal data for one activity execution.
///
/// Stores any `Send + Sync` type, retrieved by downcasting.
///
/// # Examples
///
/// ```
/// use ringflow_core::Journal;
///
/// let mut journal = Journal::new();
/// journal.insert("Exiting", true);
///
/// assert_eq!(journal.get::<bool>("Exiting"), Some(&true));
/// assert_eq!(journal.get::<String>("Exiting"), None);
/// ```
pub struct Journal {
    entries: HashMap<JournalKey, Box<dyn Any + Send + Sync>>,
}

impl fmt::Debug for Journal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Journal")
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}

impl Journal {
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Records a value, replacing any previous value under the same key.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<JournalKey>, value: T) {
        self.entries.insert(key.into(), Box::new(value));
    }

    /// Returns the value for `key` if present and of type `T`.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.entries.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn keys(&self) -> impl Iterator<Item = &JournalKey> {
        self.entries.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heterogeneous_entries() {
        let mut journal = Journal::new();
        journal.insert(EXITING, true);
        journal.insert(OUTGOING_CALLS, vec!["a".to_string(), "b".to_string()]);

        assert_eq!(journal.get::<bool>(EXITING), Some(&true));
        assert_eq!(
            journal.get::<Vec<String>>(OUTGOING_CALLS).map(Vec::len),
            Some(2)
        );
        assert_eq!(journal.get::<bool>(OUTGOING_CALLS), None);
        assert_eq!(journal.keys().count(), 2);
    }

    #[test]
    fn test_insert_replaces() {
        let mut journal = Journal::new();
        journal.insert(COLLECTED_DIAL_RESPONSES, 1u32);
        journal.insert(COLLECTED_DIAL_RESPONSES, 2u32);

        assert_eq!(journal.get::<u32>(COLLECTED_DIAL_RESPONSES), Some(&2));
        assert_eq!(journal.keys().count(), 1);
        assert!(journal.get::<bool>(EXITING).is_none());
    }
}
