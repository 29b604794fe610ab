//! Integration tests for garbage collection and crash recovery.
//!
//! These tests exercise the reconciliation pass against committed state,
//! the idempotency guarantee, prefix discipline between co-located
//! datasets, and the orphan-file story after a simulated store failure
//! mid-commit.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use std::collections::BTreeSet;

use common::{FailingStore, a_values, ae_row, single_table};
use dataset_table_core::batch::RowBatch;
use dataset_table_core::codec::JsonCodec;
use dataset_table_core::dataset::{CreateRequest, Dataset, DatasetError, UpdateRequest};
use dataset_table_core::gc;
use dataset_table_core::storage::{BlobStore, MemoryStore};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn create_request(uuid: &str) -> CreateRequest {
    CreateRequest {
        uuid: uuid.to_string(),
        partition_columns: vec!["E".to_string()],
        index_columns: vec!["E".to_string()],
        ..CreateRequest::default()
    }
}

fn update_request(uuid: &str) -> UpdateRequest {
    UpdateRequest {
        uuid: uuid.to_string(),
        ..UpdateRequest::default()
    }
}

#[tokio::test]
async fn committed_state_is_a_superset_of_references_and_gc_restores_equality() -> TestResult {
    let store = MemoryStore::new();
    let dataset = Dataset::create(
        &store,
        &JsonCodec,
        create_request("d1"),
        single_table(vec![RowBatch::new(vec![
            ae_row(1, "test"),
            ae_row(2, "train"),
        ])]),
    )
    .await?;

    let referenced = dataset.metadata().referenced_keys();
    let listed = store.list("d1/").await?;
    assert!(
        listed.is_superset(&referenced),
        "every referenced key exists in the store"
    );
    // A clean commit leaves no garbage at all.
    assert_eq!(listed, referenced);

    let deleted = gc::collect(&store, "d1").await?;
    assert!(deleted.is_empty());
    assert_eq!(store.list("d1/").await?, referenced);
    Ok(())
}

#[tokio::test]
async fn deleted_partitions_become_collectable_and_gc_is_idempotent() -> TestResult {
    let store = MemoryStore::new();
    let dataset = Dataset::create(
        &store,
        &JsonCodec,
        create_request("d1"),
        single_table(vec![RowBatch::new(vec![
            ae_row(1, "test"),
            ae_row(2, "train"),
        ])]),
    )
    .await?;

    let doomed: BTreeSet<String> = dataset
        .metadata()
        .labels_in_order()
        .first()
        .map(|label| label.to_string())
        .into_iter()
        .collect();
    Dataset::delete_partitions(&store, "d1", &doomed).await?;

    let deleted = gc::collect(&store, "d1").await?;
    assert_eq!(deleted.len(), 1, "exactly the dropped partition's file");

    // Second pass with no intervening writes deletes nothing.
    let deleted_again = gc::collect(&store, "d1").await?;
    assert!(deleted_again.is_empty());

    // The dataset still reads cleanly.
    let dataset = Dataset::load(&store, "d1").await?;
    let read_back = dataset.read_table(&store, &JsonCodec, "table").await?;
    assert_eq!(read_back.len(), 1);
    Ok(())
}

#[tokio::test]
async fn failed_update_leaves_old_state_readable_and_orphans_collectable() -> TestResult {
    let store = FailingStore::new();
    Dataset::create(
        &store,
        &JsonCodec,
        create_request("d1"),
        single_table(vec![RowBatch::new(vec![ae_row(1, "test")])]),
    )
    .await?;
    let committed_keys = store.list("d1/").await?;

    // Data files and index blobs land, the descriptor write dies.
    store.fail_puts_matching(".by-dataset-metadata.json");
    let result = Dataset::update(
        &store,
        &JsonCodec,
        update_request("d1"),
        single_table(vec![RowBatch::new(vec![ae_row(2, "train")])]),
    )
    .await;
    assert!(matches!(result, Err(DatasetError::Storage { .. })));
    store.heal();

    // Readers see exactly the pre-operation state.
    let dataset = Dataset::load(&store, "d1").await?;
    let read_back = dataset.read_table(&store, &JsonCodec, "table").await?;
    assert_eq!(a_values(&read_back), vec![1]);

    // The aborted commit left orphans behind ...
    let keys_after_failure = store.list("d1/").await?;
    assert!(keys_after_failure.len() > committed_keys.len());

    // ... which garbage collection reclaims, minus the in-place index
    // blob, which the descriptor still references.
    let deleted = gc::collect(&store, "d1").await?;
    assert!(!deleted.is_empty());
    assert_eq!(
        store.list("d1/").await?,
        dataset.metadata().referenced_keys()
    );

    // The dataset remains fully usable afterwards.
    let dataset = Dataset::update(
        &store,
        &JsonCodec,
        update_request("d1"),
        single_table(vec![RowBatch::new(vec![ae_row(3, "train")])]),
    )
    .await?;
    assert_eq!(dataset.metadata().partitions.len(), 2);
    Ok(())
}

#[tokio::test]
async fn failed_create_publishes_nothing() -> TestResult {
    let store = FailingStore::new();

    store.fail_puts_matching(".by-dataset-metadata.json");
    let result = Dataset::create(
        &store,
        &JsonCodec,
        create_request("d1"),
        single_table(vec![RowBatch::new(vec![ae_row(1, "test")])]),
    )
    .await;
    assert!(matches!(result, Err(DatasetError::Storage { .. })));
    store.heal();

    // No descriptor, so the dataset does not exist for readers or GC.
    assert!(matches!(
        Dataset::load(&store, "d1").await,
        Err(DatasetError::NotFound { .. })
    ));
    assert!(matches!(
        gc::collect(&store, "d1").await,
        Err(DatasetError::NotFound { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn gc_never_crosses_dataset_prefixes_or_touches_descriptors() -> TestResult {
    let store = MemoryStore::new();

    // "d1" and "d1x" share a textual prefix but not a key prefix.
    for uuid in ["d1", "d1x"] {
        Dataset::create(
            &store,
            &JsonCodec,
            create_request(uuid),
            single_table(vec![RowBatch::new(vec![ae_row(1, "test")])]),
        )
        .await?;
    }

    let d1x_keys = store.list("d1x/").await?;
    let deleted = gc::collect(&store, "d1").await?;
    assert!(deleted.is_empty());

    // Neighbor dataset and both descriptors are untouched.
    assert_eq!(store.list("d1x/").await?, d1x_keys);
    store.get("d1.by-dataset-metadata.json").await?;
    store.get("d1x.by-dataset-metadata.json").await?;
    Ok(())
}
