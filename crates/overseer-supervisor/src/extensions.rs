//! Per-process extension metadata.
//!
//! Each [`crate::ProcessInfo`] carries one string-keyed store of arbitrary
//! caller-owned values. Retrieval is runtime-checked: asking for the wrong
//! type, or for a key that was never set, yields the caller-supplied
//! default instead of an error. The store is created exactly once with the
//! record and is not internally synchronized; callers sharing it across
//! threads are responsible for serializing access.

use std::any::Any;
use std::collections::HashMap;

/// String-keyed store of boxed, type-erased values.
#[derive(Default)]
pub struct Extensions {
    values: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value under `key`, replacing any previous value.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Box::new(value));
    }

    /// Borrow the value under `key` if it exists and has type `T`.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Fetch a copy of the value under `key`, falling back to `default`
    /// when the key is absent or holds a different type.
    pub fn get_or<T: Any + Clone>(&self, key: &str, default: T) -> T {
        self.get::<T>(key).cloned().unwrap_or(default)
    }

    /// Remove and return the value under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Box<dyn Any + Send + Sync>> {
        self.values.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl std::fmt::Debug for Extensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extensions")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut ext = Extensions::new();
        ext.insert("restart-count", 3u32);
        assert_eq!(ext.get::<u32>("restart-count"), Some(&3));
        assert!(ext.contains_key("restart-count"));
    }

    #[test]
    fn test_get_or_returns_default_on_absence() {
        let ext = Extensions::new();
        assert_eq!(ext.get_or::<u32>("missing", 7), 7);
    }

    #[test]
    fn test_get_or_returns_default_on_type_mismatch() {
        let mut ext = Extensions::new();
        ext.insert("label", "worker".to_string());
        // Same key, wrong type: fall back to the default
        assert_eq!(ext.get_or::<u32>("label", 7), 7);
        // Right type: stored value wins
        assert_eq!(ext.get_or::<String>("label", "other".to_string()), "worker");
    }

    #[test]
    fn test_insert_replaces_previous_value() {
        let mut ext = Extensions::new();
        ext.insert("attempt", 1u32);
        ext.insert("attempt", 2u32);
        assert_eq!(ext.get_or::<u32>("attempt", 0), 2);
        assert_eq!(ext.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut ext = Extensions::new();
        ext.insert("tag", "a".to_string());
        assert!(ext.remove("tag").is_some());
        assert!(ext.is_empty());
    }
}
