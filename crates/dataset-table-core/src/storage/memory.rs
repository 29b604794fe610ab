//! In-memory blob store backend.
//!
//! `MemoryStore` keeps every blob in a mutex-guarded map. It exists for
//! tests, examples, and single-process pipelines; all trait semantics
//! (atomic put, create-new guard, idempotent delete, sorted prefix listing)
//! hold trivially because every operation runs under one lock.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use snafu::prelude::*;

use super::{AlreadyExistsSnafu, BlobStore, NotFoundSnafu, StorageResult, validate_key};

/// A [`BlobStore`] holding all blobs in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: Mutex<BTreeMap<String, Bytes>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.lock().expect("memory store lock poisoned").len()
    }

    /// True if the store holds no blobs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn put(&self, key: &str, value: Bytes) -> StorageResult<()> {
        validate_key(key)?;
        let mut blobs = self.blobs.lock().expect("memory store lock poisoned");
        blobs.insert(key.to_string(), value);
        Ok(())
    }

    async fn put_new(&self, key: &str, value: Bytes) -> StorageResult<()> {
        validate_key(key)?;
        let mut blobs = self.blobs.lock().expect("memory store lock poisoned");
        ensure!(!blobs.contains_key(key), AlreadyExistsSnafu { key });
        blobs.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let blobs = self.blobs.lock().expect("memory store lock poisoned");
        blobs
            .get(key)
            .cloned()
            .context(NotFoundSnafu { key })
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let mut blobs = self.blobs.lock().expect("memory store lock poisoned");
        blobs.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> StorageResult<BTreeSet<String>> {
        let blobs = self.blobs.lock().expect("memory store lock poisoned");
        Ok(blobs
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[tokio::test]
    async fn put_then_get_roundtrips() -> TestResult {
        let store = MemoryStore::new();
        store.put("a/b", Bytes::from_static(b"payload")).await?;

        let read_back = store.get("a/b").await?;
        assert_eq!(read_back, Bytes::from_static(b"payload"));
        Ok(())
    }

    #[tokio::test]
    async fn put_replaces_existing_blob() -> TestResult {
        let store = MemoryStore::new();
        store.put("k", Bytes::from_static(b"old")).await?;
        store.put("k", Bytes::from_static(b"new")).await?;

        assert_eq!(store.get("k").await?, Bytes::from_static(b"new"));
        Ok(())
    }

    #[tokio::test]
    async fn put_new_fails_when_key_exists() -> TestResult {
        let store = MemoryStore::new();
        store.put_new("k", Bytes::from_static(b"first")).await?;

        let result = store.put_new("k", Bytes::from_static(b"second")).await;
        assert!(matches!(result, Err(StorageError::AlreadyExists { .. })));

        // Original content must be untouched.
        assert_eq!(store.get("k").await?, Bytes::from_static(b"first"));
        Ok(())
    }

    #[tokio::test]
    async fn get_missing_key_returns_not_found() -> TestResult {
        let store = MemoryStore::new();
        let result = store.get("nope").await;
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn delete_is_idempotent() -> TestResult {
        let store = MemoryStore::new();
        store.put("k", Bytes::from_static(b"x")).await?;

        store.delete("k").await?;
        store.delete("k").await?;

        assert!(store.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn list_filters_by_prefix_in_sorted_order() -> TestResult {
        let store = MemoryStore::new();
        for key in ["d1/t/a", "d1/t/b", "d1/indices/c", "d2/t/a"] {
            store.put(key, Bytes::new()).await?;
        }

        let keys: Vec<String> = store.list("d1/").await?.into_iter().collect();
        assert_eq!(keys, vec!["d1/indices/c", "d1/t/a", "d1/t/b"]);

        // "d1" without the slash also matches nothing from d2.
        assert_eq!(store.list("d1").await?.len(), 3);
        Ok(())
    }
}
