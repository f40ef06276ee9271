pub mod files;
pub mod memory;

pub use files::FileStore;
pub use memory::MemoryStore;

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Entity kind a snapshot is stored under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Tasks,
    Trash,
    Timer,
    Config,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::Trash => "trash",
            Self::Timer => "timer",
            Self::Config => "config",
        }
    }
}

/// Storage key: entity kind plus an optional user scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreKey {
    pub kind: StoreKind,
    pub scope: Option<String>,
}

impl StoreKey {
    pub fn new(kind: StoreKind) -> Self {
        Self { kind, scope: None }
    }

    pub fn scoped(kind: StoreKind, scope: impl Into<String>) -> Self {
        Self { kind, scope: Some(scope.into()) }
    }

    /// Flat key name, e.g. `tasks` or `tasks.alice`
    pub fn name(&self) -> String {
        match &self.scope {
            Some(scope) => format!("{}.{}", self.kind.as_str(), scope),
            None => self.kind.as_str().to_string(),
        }
    }
}

/// Durable key/value storage for JSON snapshots. No transactional guarantees;
/// a failed read is treated as "nothing saved".
pub trait KvStore {
    fn get(&self, key: &StoreKey) -> Result<Option<String>>;
    fn set(&self, key: &StoreKey, value: &str) -> Result<()>;
    fn remove(&self, key: &StoreKey) -> Result<()>;
}

/// Load a snapshot, falling back to `Default` when the key is missing,
/// unreadable, or holds JSON that no longer parses
pub fn load_json<T>(store: &dyn KvStore, key: &StoreKey) -> T
where
    T: DeserializeOwned + Default,
{
    match store.get(key) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_default(),
        _ => T::default(),
    }
}

/// Serialize and persist a snapshot
pub fn save_json<T: Serialize>(store: &dyn KvStore, key: &StoreKey, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    store.set(key, &json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names() {
        assert_eq!(StoreKey::new(StoreKind::Timer).name(), "timer");
        assert_eq!(StoreKey::scoped(StoreKind::Tasks, "alice").name(), "tasks.alice");
    }

    #[test]
    fn test_load_json_falls_back_on_garbage() {
        let store = MemoryStore::new();
        let key = StoreKey::new(StoreKind::Tasks);
        store.set(&key, "{not valid json").unwrap();
        let value: Vec<String> = load_json(&store, &key);
        assert!(value.is_empty());
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let store = MemoryStore::new();
        let key = StoreKey::new(StoreKind::Config);
        save_json(&store, &key, &vec!["a".to_string(), "b".to_string()]).unwrap();
        let value: Vec<String> = load_json(&store, &key);
        assert_eq!(value, vec!["a".to_string(), "b".to_string()]);
    }
}
