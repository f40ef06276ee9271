use super::{KvStore, StoreKey};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory store for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &StoreKey) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(&key.name()).cloned())
    }

    fn set(&self, key: &StoreKey, value: &str) -> Result<()> {
        self.entries.lock().unwrap().insert(key.name(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &StoreKey) -> Result<()> {
        self.entries.lock().unwrap().remove(&key.name());
        Ok(())
    }
}
