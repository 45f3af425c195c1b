//! Key-value persistence sink for room and round snapshots.
//!
//! The room actor keeps the canonical state in memory and writes a copy
//! here after every committed mutation. Nothing reads it back during play;
//! the manager only asks it whether a slug is taken and clears a room's
//! keys on close.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

/// A stored record: field name → JSON-encoded value.
pub type Fields = BTreeMap<String, String>;

/// Errors raised by a [`RoomStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend refused or could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A field could not be encoded.
    #[error("failed to encode field {field}: {source}")]
    Encode {
        field: &'static str,
        source: serde_json::Error,
    },
}

/// The key-value store rooms persist into.
///
/// Each call is independent; no atomicity is promised beyond a single
/// `set`. Rooms serialize their own writes.
pub trait RoomStore: Send + Sync + 'static {
    fn exists(&self, key: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// The record at `key`, or `None` if absent.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Fields>, StoreError>> + Send;

    /// Merges `fields` into the record at `key`, creating it if needed.
    fn set(&self, key: &str, fields: Fields) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Removes the record. Returns whether it existed.
    fn delete(&self, key: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Every key starting with `prefix`.
    fn list_keys(
        &self,
        prefix: &str,
    ) -> impl Future<Output = Result<BTreeSet<String>, StoreError>> + Send;
}

/// In-process store. Lives as long as the server.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<String, Fields>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every write fail with [`StoreError::Unavailable`] until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        Ok(())
    }
}

impl RoomStore for MemoryStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.records.read().await.contains_key(key))
    }

    async fn get(&self, key: &str) -> Result<Option<Fields>, StoreError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, fields: Fields) -> Result<(), StoreError> {
        self.check_writable()?;
        self.records
            .write()
            .await
            .entry(key.to_string())
            .or_default()
            .extend(fields);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.check_writable()?;
        Ok(self.records.write().await.remove(key).is_some())
    }

    async fn list_keys(&self, prefix: &str) -> Result<BTreeSet<String>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// JSON-encodes `value` for storage under `field`.
pub(crate) fn encode<T: serde::Serialize + ?Sized>(
    field: &'static str,
    value: &T,
) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|source| StoreError::Encode { field, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_set_merges_fields() {
        let store = MemoryStore::new();
        store.set("room:a", fields(&[("status", "1")])).await.unwrap();
        store.set("room:a", fields(&[("host", "2")])).await.unwrap();

        let record = store.get("room:a").await.unwrap().unwrap();
        assert_eq!(record, fields(&[("host", "2"), ("status", "1")]));
        assert!(store.exists("room:a").await.unwrap());
        assert!(store.get("room:b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_keys_by_prefix() {
        let store = MemoryStore::new();
        for key in ["room:a", "room:a:1", "room:a:2", "room:ab"] {
            store.set(key, Fields::new()).await.unwrap();
        }
        let keys = store.list_keys("room:a:").await.unwrap();
        assert_eq!(keys.len(), 2);
        assert!(store.delete("room:a:1").await.unwrap());
        assert!(!store.delete("room:a:1").await.unwrap());
    }

    #[tokio::test]
    async fn test_failing_store_rejects_writes_only() {
        let store = MemoryStore::new();
        store.set("room:a", Fields::new()).await.unwrap();
        store.set_failing(true);
        assert!(matches!(
            store.set("room:a", Fields::new()).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.exists("room:a").await.unwrap());
    }
}
