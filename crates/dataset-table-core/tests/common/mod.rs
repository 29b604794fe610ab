//! Shared helpers for the integration suites: a fault-injecting store
//! wrapper and small builders for the canonical two-column test dataset.
#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use snafu::Backtrace;

use dataset_table_core::batch::{Row, RowBatch, Value, row};
use dataset_table_core::dataset::TableBatches;
use dataset_table_core::storage::{BackendError, BlobStore, MemoryStore, StorageError, StorageResult};

/// Store wrapper that injects write failures for keys matching a substring.
///
/// Reads, deletes, and listings always pass through, so a "crashed" commit
/// can be inspected and garbage-collected afterwards.
pub struct FailingStore {
    inner: MemoryStore,
    fail_puts_matching: Mutex<Option<String>>,
}

impl FailingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_puts_matching: Mutex::new(None),
        }
    }

    /// Fail every `put`/`put_new` whose key contains `needle`.
    pub fn fail_puts_matching(&self, needle: &str) {
        *self.fail_puts_matching.lock().expect("matcher lock") = Some(needle.to_string());
    }

    /// Stop injecting failures.
    pub fn heal(&self) {
        *self.fail_puts_matching.lock().expect("matcher lock") = None;
    }

    fn check(&self, key: &str) -> StorageResult<()> {
        let matcher = self.fail_puts_matching.lock().expect("matcher lock");
        if let Some(needle) = matcher.as_deref() {
            if key.contains(needle) {
                return Err(StorageError::Io {
                    key: key.to_string(),
                    source: BackendError::Local(io::Error::other("injected failure")),
                    backtrace: Backtrace::capture(),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FailingStore {
    async fn put(&self, key: &str, value: Bytes) -> StorageResult<()> {
        self.check(key)?;
        self.inner.put(key, value).await
    }

    async fn put_new(&self, key: &str, value: Bytes) -> StorageResult<()> {
        self.check(key)?;
        self.inner.put_new(key, value).await
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.inner.delete(key).await
    }

    async fn list(&self, prefix: &str) -> StorageResult<BTreeSet<String>> {
        self.inner.list(prefix).await
    }
}

/// A row of the canonical test shape: integer column `A`, string column `E`.
pub fn ae_row(a: i64, e: &str) -> Row {
    row([("A", Value::Int64(a)), ("E", Value::Utf8(e.to_string()))])
}

/// Single-table batches for the table named `table`.
pub fn single_table(batches: Vec<RowBatch>) -> TableBatches {
    let mut map = BTreeMap::new();
    map.insert("table".to_string(), batches);
    map
}

/// All `E` values found in a batch, with duplicates.
pub fn e_values(batch: &RowBatch) -> Vec<String> {
    batch
        .rows()
        .iter()
        .map(|r| match r.get("E") {
            Some(Value::Utf8(s)) => s.clone(),
            other => panic!("unexpected E value: {other:?}"),
        })
        .collect()
}

/// All `A` values found in a batch, in row order.
pub fn a_values(batch: &RowBatch) -> Vec<i64> {
    batch
        .rows()
        .iter()
        .map(|r| match r.get("A") {
            Some(Value::Int64(v)) => *v,
            other => panic!("unexpected A value: {other:?}"),
        })
        .collect()
}
