//! Local-filesystem blob store backend.
//!
//! `FsStore` maps each storage key to a file under a root directory, with
//! `/` in keys becoming directory separators. Two write primitives provide
//! the guarantees the commit protocol needs:
//!
//! - `put` performs a write-then-rename sequence (temporary file next to the
//!   target, sync, atomic rename) so a key is always either the old blob or
//!   the new blob, never a torn write.
//! - `put_new` opens the target with create-new semantics so exactly one
//!   writer can create a given key.
//!
//! Listing walks the directory tree below the root and reports keys with
//! `/` separators regardless of platform.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use snafu::{Backtrace, prelude::*};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::{
    BackendError, BlobStore, IoSnafu, NotFoundSnafu, StorageError, StorageResult, validate_key,
};

/// A [`BlobStore`] persisting blobs as files under a local root directory.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Create a store rooted at `root`. The directory is created lazily on
    /// the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn abs(&self, key: &str) -> PathBuf {
        let mut path = self.root.clone();
        for component in key.split('/') {
            path.push(component);
        }
        path
    }

    async fn create_parent_dir(&self, abs: &Path, key: &str) -> StorageResult<()> {
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(BackendError::Local)
                .context(IoSnafu { key })?;
        }
        Ok(())
    }
}

/// Guard that removes a temporary file on drop unless disarmed.
/// Used to ensure cleanup on error paths during atomic writes.
struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    /// Disarm the guard so the file is NOT removed on drop.
    /// Call this after a successful rename.
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.armed {
            // Best-effort cleanup; we are likely already handling another error.
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[async_trait]
impl BlobStore for FsStore {
    async fn put(&self, key: &str, value: Bytes) -> StorageResult<()> {
        validate_key(key)?;
        let abs = self.abs(key);
        self.create_parent_dir(&abs, key).await?;

        let tmp_path = abs.with_extension("tmp");
        let mut guard = TempFileGuard::new(tmp_path.clone());

        {
            let mut file = fs::File::create(&tmp_path)
                .await
                .map_err(BackendError::Local)
                .context(IoSnafu { key })?;

            file.write_all(&value)
                .await
                .map_err(BackendError::Local)
                .context(IoSnafu { key })?;

            file.sync_all()
                .await
                .map_err(BackendError::Local)
                .context(IoSnafu { key })?;
        }

        fs::rename(&tmp_path, &abs)
            .await
            .map_err(BackendError::Local)
            .context(IoSnafu { key })?;

        // Success - the temp file has been renamed, nothing to clean up.
        guard.disarm();

        Ok(())
    }

    async fn put_new(&self, key: &str, value: Bytes) -> StorageResult<()> {
        validate_key(key)?;
        let abs = self.abs(key);
        self.create_parent_dir(&abs, key).await?;

        // Atomic "create only if not exists" on the target path.
        let open_result = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&abs)
            .await;

        let mut file = match open_result {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists {
                    key: key.to_string(),
                    backtrace: Backtrace::capture(),
                });
            }
            Err(e) => {
                return Err(BackendError::Local(e)).context(IoSnafu { key });
            }
        };

        file.write_all(&value)
            .await
            .map_err(BackendError::Local)
            .context(IoSnafu { key })?;

        file.sync_all()
            .await
            .map_err(BackendError::Local)
            .context(IoSnafu { key })?;

        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        validate_key(key)?;
        let abs = self.abs(key);

        match fs::read(&abs).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => NotFoundSnafu { key }.fail(),
            Err(e) => Err(BackendError::Local(e)).context(IoSnafu { key }),
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        let abs = self.abs(key);

        match fs::remove_file(&abs).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BackendError::Local(e)).context(IoSnafu { key }),
        }
    }

    async fn list(&self, prefix: &str) -> StorageResult<BTreeSet<String>> {
        let mut keys = BTreeSet::new();
        if !fs::try_exists(&self.root)
            .await
            .map_err(BackendError::Local)
            .context(IoSnafu { key: prefix })?
        {
            return Ok(keys);
        }

        // Iterative directory walk; async recursion would need boxing.
        let mut pending = vec![(self.root.clone(), String::new())];
        while let Some((dir, rel)) = pending.pop() {
            let mut entries = fs::read_dir(&dir)
                .await
                .map_err(BackendError::Local)
                .context(IoSnafu { key: prefix })?;

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(BackendError::Local)
                .context(IoSnafu { key: prefix })?
            {
                let name = entry.file_name().to_string_lossy().into_owned();
                let child_rel = if rel.is_empty() {
                    name
                } else {
                    format!("{rel}/{name}")
                };

                let file_type = entry
                    .file_type()
                    .await
                    .map_err(BackendError::Local)
                    .context(IoSnafu { key: prefix })?;

                if file_type.is_dir() {
                    pending.push((entry.path(), child_rel));
                } else if child_rel.starts_with(prefix) {
                    keys.insert(child_rel);
                }
            }
        }

        Ok(keys)
    }
}
