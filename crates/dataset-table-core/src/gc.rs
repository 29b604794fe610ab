//! Garbage collection of unreferenced store objects.
//!
//! A failed or superseded commit leaves files in the store that no
//! committed descriptor references: data files written before a crash,
//! and data files of partitions later dropped via
//! `Dataset::delete_partitions`. This module reconciles the store against
//! the committed descriptor and deletes exactly those keys.
//!
//! Safety properties:
//!
//! - The descriptor key itself is never touched; it lives outside the
//!   `<uuid>/` prefix and listing the prefix never reports it.
//! - Keys outside the dataset's prefix are never touched, so co-located
//!   datasets cannot collect each other's files.
//! - Running twice with no intervening writes deletes nothing the second
//!   time.
//!
//! Not safe to run concurrently with an in-flight create or update for the
//! same uuid: files already written but not yet referenced by a published
//! descriptor look exactly like garbage. Serializing collection against
//! writers is the caller's responsibility; the engine has no locks to
//! enforce it.

use std::collections::BTreeSet;

use log::{debug, info};
use snafu::prelude::*;

use crate::dataset::error::StorageSnafu;
use crate::dataset::{Dataset, DatasetResult};
use crate::layout;
use crate::storage::BlobStore;

/// Delete every key under the dataset's prefix that the committed
/// descriptor does not reference. Returns the deleted keys.
pub async fn collect(store: &dyn BlobStore, uuid: &str) -> DatasetResult<BTreeSet<String>> {
    let dataset = Dataset::load(store, uuid).await?;
    let referenced = dataset.metadata().referenced_keys();

    let all_keys = store
        .list(&layout::dataset_prefix(uuid))
        .await
        .context(StorageSnafu)?;

    let garbage: BTreeSet<String> = all_keys.difference(&referenced).cloned().collect();
    for key in &garbage {
        store.delete(key).await.context(StorageSnafu)?;
        debug!("collected {key}");
    }

    info!(
        "garbage collection for dataset {uuid}: removed {} of {} key(s)",
        garbage.len(),
        all_keys.len()
    );
    Ok(garbage)
}
