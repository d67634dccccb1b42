use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Result, anyhow};

/// Opaque string blobs under fixed keys.
///
/// The ledger only ever reads and rewrites whole values, so backends need
/// no partial updates or transactions.
#[allow(async_fn_in_trait)]
pub trait KeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local store, used by tests and in-memory services.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> T) -> Result<T> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?;
        Ok(f(&mut entries))
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_entries(|entries| entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with_entries(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.with_entries(|entries| {
            entries.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_roundtrip() -> Result<()> {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await?, None);

        store.set("k", "one").await?;
        store.set("k", "two").await?;
        assert_eq!(store.get("k").await?.as_deref(), Some("two"));

        store.remove("k").await?;
        store.remove("k").await?;
        assert_eq!(store.get("k").await?, None);
        Ok(())
    }
}
