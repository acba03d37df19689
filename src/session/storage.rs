//! Page-scoped key-value storage.
//!
//! Models the browser's per-tab storage: values live exactly as long as the
//! storage object and are never written to disk.

use dashmap::DashMap;

pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

/// In-memory storage whose lifetime is the page (process) lifetime.
#[derive(Default)]
pub struct PageStorage {
    entries: DashMap<String, String>,
}

impl PageStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStorage for PageStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}
