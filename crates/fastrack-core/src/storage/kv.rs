//! Key-value persistence seam used by the tracker.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::DatabaseError;

/// Minimal string key-value store.
///
/// The tracker only ever touches two keys; see
/// [`crate::storage::persisted`].
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, DatabaseError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), DatabaseError>;

    fn remove(&mut self, key: &str) -> Result<(), DatabaseError>;
}

/// In-memory store.
///
/// Clones share the same map, which lets a test keep a handle on what a
/// tracker wrote and then build a second tracker over the same data to
/// simulate a restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), DatabaseError> {
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_roundtrip_and_shared_clones() {
        let mut store = MemoryStore::new();
        let view = store.clone();
        assert!(store.get("k").unwrap().is_none());

        store.set("k", "v").unwrap();
        assert_eq!(view.get("k").unwrap().as_deref(), Some("v"));

        store.remove("k").unwrap();
        assert!(view.is_empty());
    }
}
