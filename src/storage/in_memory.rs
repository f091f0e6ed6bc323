//! In-memory storage and record source for testing and development

use crate::core::error::{StorageError, ViewError, ViewResult};
use crate::core::query::{self, QueryResult, ViewRequest};
use crate::core::record::Record;
use crate::core::store::RecordSource;
use crate::storage::DurableStorage;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

// =============================================================================
// InMemoryStorage
// =============================================================================

/// In-memory durable storage
///
/// Clones share the same entries, which is how two facades on one page see
/// the same storage. A byte quota and a disabled mode reproduce the write
/// failures of real browser storage.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
    quota: Option<usize>,
    disabled: bool,
}

impl InMemoryStorage {
    /// Create a new unbounded in-memory storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects writes once keys plus values exceed `bytes`
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            quota: Some(bytes),
            ..Self::default()
        }
    }

    /// Storage that fails every read and write
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    /// Stored keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    fn ensure_enabled(&self) -> ViewResult<()> {
        if self.disabled {
            return Err(StorageError::Unavailable.into());
        }
        Ok(())
    }
}

impl DurableStorage for InMemoryStorage {
    fn get_item(&self, key: &str) -> ViewResult<Option<String>> {
        self.ensure_enabled()?;
        let entries = self
            .entries
            .read()
            .map_err(|e| ViewError::Internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(entries.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> ViewResult<()> {
        self.ensure_enabled()?;
        let mut entries = self
            .entries
            .write()
            .map_err(|e| ViewError::Internal(format!("Failed to acquire write lock: {}", e)))?;

        if let Some(quota) = self.quota {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let required = key.len() + value.len();
            if used + required > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    required,
                    available: quota.saturating_sub(used),
                }
                .into());
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> ViewResult<()> {
        self.ensure_enabled()?;
        let mut entries = self
            .entries
            .write()
            .map_err(|e| ViewError::Internal(format!("Failed to acquire write lock: {}", e)))?;

        entries.remove(key);
        Ok(())
    }
}

// =============================================================================
// InMemoryRecordSource
// =============================================================================

/// Record source over an in-memory record set
///
/// Runs the pure [`query`](crate::core::query::query) pipeline on every fetch.
/// An optional latency simulates a slow backend.
#[derive(Clone)]
pub struct InMemoryRecordSource<R: Record> {
    records: Arc<RwLock<Vec<R>>>,
    temporal_columns: Arc<Vec<String>>,
    latency: Option<Duration>,
    fetches: Arc<AtomicUsize>,
}

impl<R: Record> InMemoryRecordSource<R> {
    pub fn new(records: Vec<R>, temporal_columns: Vec<String>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
            temporal_columns: Arc::new(temporal_columns),
            latency: None,
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Delay every fetch by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Replace the backing records
    ///
    /// Results already cached by an engine are not affected; clear the
    /// engine's cache after mutating.
    pub fn replace_all(&self, records: Vec<R>) -> ViewResult<()> {
        let mut current = self
            .records
            .write()
            .map_err(|e| ViewError::Internal(format!("Failed to acquire write lock: {}", e)))?;

        *current = records;
        Ok(())
    }

    pub fn push(&self, record: R) -> ViewResult<()> {
        let mut current = self
            .records
            .write()
            .map_err(|e| ViewError::Internal(format!("Failed to acquire write lock: {}", e)))?;

        current.push(record);
        Ok(())
    }

    /// Number of fetches served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<R: Record> RecordSource<R> for InMemoryRecordSource<R> {
    async fn fetch(&self, request: &ViewRequest) -> ViewResult<QueryResult<R>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let records = self
            .records
            .read()
            .map_err(|e| ViewError::Internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(query::query(&records, request, &self.temporal_columns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::JsonRecord;
    use serde_json::json;

    #[test]
    fn test_set_and_get() {
        let storage = InMemoryStorage::new();
        storage.set_item("posts:per-page", "50").unwrap();
        assert_eq!(storage.get_item("posts:per-page").unwrap(), Some("50".to_string()));
        assert_eq!(storage.get_item("missing").unwrap(), None);
    }

    #[test]
    fn test_remove() {
        let storage = InMemoryStorage::new();
        storage.set_item("k", "v").unwrap();
        storage.remove_item("k").unwrap();
        storage.remove_item("k").unwrap();
        assert_eq!(storage.get_item("k").unwrap(), None);
    }

    #[test]
    fn test_clones_share_entries() {
        let storage = InMemoryStorage::new();
        let other = storage.clone();
        storage.set_item("k", "v").unwrap();
        assert_eq!(other.get_item("k").unwrap(), Some("v".to_string()));
    }

    #[test]
    fn test_quota_exceeded() {
        let storage = InMemoryStorage::with_quota(10);
        storage.set_item("a", "123").unwrap();

        let err = storage.set_item("b", "0123456789").unwrap_err();
        assert_eq!(err.error_code(), "STORAGE_QUOTA_EXCEEDED");
        assert_eq!(storage.get_item("b").unwrap(), None);

        // Overwriting an existing key only counts the new value
        storage.set_item("a", "12345678").unwrap();
    }

    #[test]
    fn test_disabled_storage() {
        let storage = InMemoryStorage::disabled();
        assert!(storage.get_item("k").is_err());
        assert!(storage.set_item("k", "v").is_err());
    }

    #[tokio::test]
    async fn test_record_source_runs_query() {
        let records: Vec<JsonRecord> = (1..=5).map(|i| JsonRecord::new(json!({"id": i}))).collect();
        let source = InMemoryRecordSource::new(records, vec![]);

        let result = source.fetch(&ViewRequest::new(2, 2)).await.unwrap();
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].id(), "3");
        assert_eq!(result.total_pages, 3);
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_record_source_sees_mutations() {
        let source = InMemoryRecordSource::new(vec![JsonRecord::new(json!({"id": 1}))], vec![]);
        source.push(JsonRecord::new(json!({"id": 2}))).unwrap();

        let result = source.fetch(&ViewRequest::default()).await.unwrap();
        assert_eq!(result.total, 2);
    }
}
