//! Keyed-store collaborator contract.
//!
//! Upsert/Downsert executors can target any transactional key-value store
//! that offers this minimal surface; the wire protocol behind it is out of
//! scope. [`MemoryStore`] is the in-process implementation used by tests and
//! embedding callers that want a scratch store.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Minimal transactional key-value contract: get/set/set-with-expiry/delete/
/// exists/scan-by-pattern.
pub trait KeyedStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn set_ex(&self, key: &str, value: String, ttl: Duration);
    /// Returns true when the key existed.
    fn delete(&self, key: &str) -> bool;
    fn exists(&self, key: &str) -> bool;
    /// Keys matching a glob-style pattern (`cache/*`).
    fn scan(&self, pattern: &str) -> Vec<String>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn live(&self) -> bool {
        self.expires_at.map(|at| Instant::now() < at).unwrap_or(true)
    }
}

/// In-memory `KeyedStore` with lazy expiry.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl KeyedStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.live() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: String) {
        self.lock().insert(
            key.to_string(),
            Entry {
                value,
                expires_at: None,
            },
        );
    }

    fn set_ex(&self, key: &str, value: String, ttl: Duration) {
        self.lock().insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Some(Instant::now() + ttl),
            },
        );
    }

    fn delete(&self, key: &str) -> bool {
        match self.lock().remove(key) {
            Some(entry) => entry.live(),
            None => false,
        }
    }

    fn exists(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn scan(&self, pattern: &str) -> Vec<String> {
        let Ok(matcher) = glob::Pattern::new(pattern) else {
            return Vec::new();
        };
        let entries = self.lock();
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| entry.live() && matcher.matches(key))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_delete() {
        let store = MemoryStore::new();
        store.set("a", "1".into());
        assert_eq!(store.get("a").as_deref(), Some("1"));
        assert!(store.exists("a"));
        assert!(store.delete("a"));
        assert!(!store.delete("a"));
        assert!(!store.exists("a"));
    }

    #[test]
    fn ttl_expires_lazily() {
        let store = MemoryStore::new();
        store.set_ex("k", "v".into(), Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(store.get("k"), None);
        assert!(!store.exists("k"));
    }

    #[test]
    fn scan_matches_glob_patterns() {
        let store = MemoryStore::new();
        store.set("cache/a", "1".into());
        store.set("cache/b", "2".into());
        store.set("data/c", "3".into());
        assert_eq!(store.scan("cache/*"), vec!["cache/a", "cache/b"]);
        assert!(store.scan("nope/*").is_empty());
    }
}
