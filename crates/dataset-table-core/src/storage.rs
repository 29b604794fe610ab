//! Key-value blob store abstraction.
//!
//! This module centralizes all store-facing logic for `dataset-table-core`.
//! The engine talks to storage exclusively through the [`BlobStore`] trait,
//! which models a flat key space of immutable-ish blobs with four verbs
//! (`put`, `get`, `delete`, `list`) plus a create-new variant of `put` used
//! by the commit protocol's existence guard.
//!
//! Requirements placed on implementations are deliberately small:
//!
//! - A single-key `put` must be atomic and immediately visible to
//!   subsequent `get` and `list` calls. This is the only primitive the
//!   commit protocol relies on for publishing a dataset version.
//! - `put_new` must fail with [`StorageError::AlreadyExists`] if the key is
//!   present, atomically with respect to concurrent `put_new` calls for the
//!   same key.
//! - Distinct keys never interfere, so concurrent file writes to fresh keys
//!   cannot conflict.
//!
//! Retry policy is the backend's concern; the engine treats every call as
//! fail-fast and surfaces [`StorageError`] to its own callers. Store handles
//! are threaded explicitly through every engine operation; there is no
//! process-wide store singleton.

pub mod fs;
pub mod memory;

use std::collections::BTreeSet;
use std::{error::Error, fmt, io};

use async_trait::async_trait;
use bytes::Bytes;
use snafu::{Backtrace, prelude::*};

pub use fs::FsStore;
pub use memory::MemoryStore;

/// General result type used by storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors produced by a storage backend implementation.
///
/// Backend-specific failures (currently local filesystem I/O) are wrapped in
/// this enum so higher layers can map them into [`StorageError`] variants
/// with additional context.
#[derive(Debug)]
pub enum BackendError {
    /// A local filesystem I/O error.
    Local(io::Error),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Local(e) => write!(f, "local I/O error: {e}"),
        }
    }
}

impl Error for BackendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BackendError::Local(e) => Some(e),
        }
    }
}

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StorageError {
    /// The specified key was not found.
    #[snafu(display("Key not found: {key}"))]
    NotFound {
        /// The key that was not found.
        key: String,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// The specified key already exists when creation was requested with
    /// create-new semantics.
    #[snafu(display("Key already exists: {key}"))]
    AlreadyExists {
        /// The key that was found to already exist.
        key: String,
        /// The backtrace captured when the error occurred.
        backtrace: Backtrace,
    },

    /// A backend I/O error occurred while accessing a key.
    #[snafu(display("I/O error at {key}: {source}"))]
    Io {
        /// The key being accessed when the I/O error occurred.
        key: String,
        /// Underlying backend error with platform-specific details.
        source: BackendError,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// The key is not acceptable to the backend (empty, absolute, or
    /// containing `.`/`..` path components).
    #[snafu(display("Invalid storage key: {key}"))]
    InvalidKey {
        /// The offending key.
        key: String,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },
}

/// A flat key-value store of byte blobs.
///
/// Keys are UTF-8 strings; the engine uses `/`-separated keys to lay out a
/// dataset's files, but the store itself attaches no meaning to separators
/// beyond prefix matching in [`BlobStore::list`].
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `value` under `key`, atomically replacing any previous blob.
    ///
    /// The new blob must be visible to `get` and `list` as soon as this
    /// returns. This is the primitive that makes dataset commits atomic.
    async fn put(&self, key: &str, value: Bytes) -> StorageResult<()>;

    /// Write `value` under `key`, failing with
    /// [`StorageError::AlreadyExists`] if the key is present.
    ///
    /// Used by the commit protocol to guarantee that dataset creation never
    /// silently overwrites an existing dataset descriptor.
    async fn put_new(&self, key: &str, value: Bytes) -> StorageResult<()>;

    /// Read the blob stored under `key`.
    ///
    /// Returns [`StorageError::NotFound`] if the key is absent.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Remove the blob stored under `key`.
    ///
    /// Deleting an absent key is not an error; garbage collection relies on
    /// delete being idempotent.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Return every key starting with `prefix`, in sorted order.
    async fn list(&self, prefix: &str) -> StorageResult<BTreeSet<String>>;
}

/// Reject keys a backend cannot represent safely.
///
/// Keys must be non-empty, relative, and free of `.`/`..` components so the
/// filesystem backend cannot be steered outside its root.
pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    let acceptable = !key.is_empty()
        && !key.starts_with('/')
        && !key.ends_with('/')
        && key.split('/').all(|c| !c.is_empty() && c != "." && c != "..");
    ensure!(acceptable, InvalidKeySnafu { key });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_key_accepts_nested_keys() {
        assert!(validate_key("uuid/table/_common_metadata").is_ok());
        assert!(validate_key("uuid.by-dataset-metadata.json").is_ok());
    }

    #[test]
    fn validate_key_rejects_traversal_and_empty_components() {
        for key in ["", "/abs", "trailing/", "a//b", "a/../b", "a/./b", ".."] {
            let result = validate_key(key);
            assert!(
                matches!(result, Err(StorageError::InvalidKey { .. })),
                "expected InvalidKey for {key:?}, got {result:?}",
            );
        }
    }
}
