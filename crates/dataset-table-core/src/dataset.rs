//! Dataset-level operations: the commit protocol and snapshot reads.
//!
//! This module contains the full create/update/delete flow plus the read
//! helpers that resolve against one loaded descriptor snapshot. The flow
//! for every mutating operation is the same:
//!
//! 1. Run every feasible validation (identifiers, batch shape, schema
//!    merge, partitioning, index policy) before the first store write.
//! 2. Write data files to fresh keys, then schema markers, then index
//!    blobs. None of these writes is visible to readers.
//! 3. Publish the new descriptor document with exactly one atomic put.
//!
//! A failure before step 3 leaves orphan files (reclaimed by the garbage
//! collector) and no visible change; a rejected validation leaves the
//! store untouched entirely. Concurrent commits to the same dataset are
//! last-writer-wins: the load-modify-publish cycle is not isolated, which
//! is a documented limitation of the format rather than of this module.
//! Creation is the exception: the descriptor is written with create-new
//! semantics, so racing creators cannot overwrite each other.

pub mod error;

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use log::{debug, info};
use snafu::{Backtrace, prelude::*};

use crate::batch::{RowBatch, Value};
use crate::codec::Codec;
use crate::index::{self, SecondaryIndex};
use crate::layout;
use crate::metadata::{DATASET_METADATA_VERSION, DatasetMetadata};
use crate::partition::{self, PartitionKey};
use crate::schema::{Schema, StrictWidening};
use crate::storage::{BlobStore, StorageError};

pub use error::{DatasetError, DatasetResult};

use error::{
    AlreadyExistsSnafu, BatchCountMismatchSnafu, CodecSnafu, DocumentSnafu,
    DuplicatePartitionLabelSnafu, EmptyCommitSnafu, IndexPolicySnafu, IndexSnafu,
    InvalidIdentifierSnafu, NotFoundSnafu, PartitioningSnafu, SchemaSnafu, StorageSnafu,
    TableSetMismatchSnafu, UnknownIndexSnafu, UnknownPartitionSnafu, UnknownTableSnafu,
};

/// Normalized commit input: table name to ordered row batches.
///
/// Batch position `j` across all tables forms one append unit, so every
/// table must supply the same number of batches. Front-ends resolve their
/// own input shapes into this one before invoking the engine.
pub type TableBatches = BTreeMap<String, Vec<RowBatch>>;

/// Options for [`Dataset::create`].
#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    /// Opaque unique identifier for the new dataset.
    pub uuid: String,
    /// Ordered partition-key columns; empty creates an unpartitioned
    /// dataset. Fixed for the dataset's lifetime.
    pub partition_columns: Vec<String>,
    /// Columns to maintain secondary indices over. Fixed for the
    /// dataset's lifetime once non-empty.
    pub index_columns: Vec<String>,
    /// Free-form user metadata stored in the descriptor.
    pub user_metadata: BTreeMap<String, String>,
}

/// Options for [`Dataset::update`].
#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    /// Identifier of the dataset to append to.
    pub uuid: String,
    /// Partition columns, if the caller wants them re-checked. `None`
    /// means "use the dataset's partitioning"; any other value must equal
    /// it exactly or the update is rejected.
    pub partition_columns: Option<Vec<String>>,
    /// Index columns to maintain. Columns already declared on the dataset
    /// are always maintained regardless of this list; new columns are only
    /// accepted while the dataset has no declared indices at all.
    pub index_columns: Vec<String>,
    /// User metadata entries merged into the descriptor (new keys win).
    pub user_metadata: BTreeMap<String, String>,
}

/// A loaded dataset snapshot.
///
/// Holds exactly one descriptor document; every read helper resolves
/// against it, so a reader observes one committed version regardless of
/// concurrent commits. Index blobs are *not* loaded here; they are an
/// explicit second phase via [`Dataset::load_index`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    metadata: DatasetMetadata,
}

impl Dataset {
    /// The descriptor this snapshot was loaded from or produced by.
    pub fn metadata(&self) -> &DatasetMetadata {
        &self.metadata
    }

    /// The dataset uuid.
    pub fn uuid(&self) -> &str {
        &self.metadata.dataset_uuid
    }

    /// Load the current committed snapshot of `uuid`.
    pub async fn load(store: &dyn BlobStore, uuid: &str) -> DatasetResult<Dataset> {
        let metadata = load_document(store, uuid).await?;
        Ok(Dataset { metadata })
    }

    /// Create a new dataset from the given batches.
    ///
    /// Fails with [`DatasetError::AlreadyExists`] if a descriptor already
    /// exists for the uuid; an existing dataset is never overwritten
    /// implicitly, even by a racing creator.
    pub async fn create(
        store: &dyn BlobStore,
        codec: &dyn Codec,
        request: CreateRequest,
        batches: TableBatches,
    ) -> DatasetResult<Dataset> {
        let uuid = request.uuid.clone();
        validate_identifier("dataset uuid", &uuid)?;
        validate_table_names(&batches)?;
        let batch_count = checked_batch_count(&uuid, &batches)?;

        // Existence guard before any other work; the final put_new closes
        // the remaining race window.
        let document_key = layout::metadata_document_key(&uuid);
        match store.get(&document_key).await {
            Ok(_) => return AlreadyExistsSnafu { uuid }.fail(),
            Err(StorageError::NotFound { .. }) => {}
            Err(source) => return Err(source).context(StorageSnafu),
        }

        let schemas = merged_table_schemas(codec, &uuid, &batches, &BTreeMap::new())?;
        partition::validate_partition_columns(&schemas, &request.partition_columns)
            .context(PartitioningSnafu)?;

        let index_columns: BTreeSet<String> = request.index_columns.iter().cloned().collect();
        ensure_index_columns(&schemas, &index_columns)?;

        let plan = plan_partitions(
            &uuid,
            &batches,
            &request.partition_columns,
            batch_count,
            1,
            codec.extension(),
            &BTreeSet::new(),
        )?;
        let deltas = build_index_deltas(&plan, &index_columns);

        // Write phase: data files, markers, index blobs, then the one
        // visibility-flipping descriptor write.
        write_data_files(store, codec, &uuid, &schemas, &plan).await?;
        write_schema_markers(store, &uuid, schemas.iter()).await?;
        write_index_blobs(store, &uuid, deltas.values()).await?;

        let mut user_metadata = request.user_metadata;
        user_metadata
            .entry("creation_time".to_string())
            .or_insert_with(|| Utc::now().to_rfc3339());

        let metadata = DatasetMetadata {
            dataset_uuid: uuid.clone(),
            dataset_metadata_version: DATASET_METADATA_VERSION,
            tables: schemas
                .iter()
                .map(|(table, schema)| (table.clone(), schema.column_names()))
                .collect(),
            partitions: planned_partition_entries(&plan),
            partition_keys: request.partition_columns,
            indices: index_columns
                .iter()
                .map(|c| (c.clone(), layout::index_blob_rel_key(c)))
                .collect(),
            metadata: user_metadata,
        };

        match store.put_new(&document_key, metadata.to_bytes()).await {
            Ok(()) => {}
            Err(StorageError::AlreadyExists { .. }) => {
                // Lost a creation race after passing the pre-check. The
                // winner's descriptor stands; our files are orphans.
                return AlreadyExistsSnafu { uuid }.fail();
            }
            Err(source) => return Err(source).context(StorageSnafu),
        }

        info!(
            "created dataset {uuid} with {} table(s), {} partition(s)",
            metadata.tables.len(),
            metadata.partitions.len()
        );
        Ok(Dataset { metadata })
    }

    /// Append new partitions to an existing dataset.
    ///
    /// The incoming table-name set must equal the dataset's table set; all
    /// tables of a dataset are written together. Nothing previously
    /// referenced is removed, and the update becomes visible in one
    /// descriptor write.
    pub async fn update(
        store: &dyn BlobStore,
        codec: &dyn Codec,
        request: UpdateRequest,
        batches: TableBatches,
    ) -> DatasetResult<Dataset> {
        let uuid = request.uuid.clone();
        let existing = load_document(store, &uuid).await?;

        let expected = existing.table_names();
        let found: BTreeSet<String> = batches.keys().cloned().collect();
        ensure!(
            expected == found,
            TableSetMismatchSnafu {
                expected: expected.into_iter().collect::<Vec<_>>(),
                found: found.into_iter().collect::<Vec<_>>(),
            }
        );
        let batch_count = checked_batch_count(&uuid, &batches)?;

        partition::ensure_partitioning_unchanged(
            &existing.partition_keys,
            request.partition_columns.as_deref(),
        )
        .context(PartitioningSnafu)?;

        let mut current_schemas = BTreeMap::new();
        for table in batches.keys() {
            current_schemas.insert(table.clone(), load_schema_marker(store, &uuid, table).await?);
        }
        let schemas = merged_table_schemas(codec, &uuid, &batches, &current_schemas)?;

        // Index policy: declared columns are always maintained; new columns
        // are only adopted while nothing is declared yet.
        let declared: BTreeSet<String> = existing.indices.keys().cloned().collect();
        let requested: BTreeSet<String> = request.index_columns.iter().cloned().collect();
        let adopting = declared.is_empty() && !requested.is_empty();
        if !adopting {
            for column in &requested {
                ensure!(
                    declared.contains(column),
                    IndexPolicySnafu {
                        uuid: uuid.clone(),
                        column: column.clone(),
                    }
                );
            }
        }
        let index_columns = if adopting { requested } else { declared };
        ensure_index_columns(&schemas, &index_columns)?;

        let existing_labels: BTreeSet<String> = existing.partitions.keys().cloned().collect();
        let start_seq = existing_labels
            .iter()
            .filter_map(|label| layout::partition_label_seq(label))
            .max()
            .unwrap_or(0)
            + 1;
        let plan = plan_partitions(
            &uuid,
            &batches,
            &existing.partition_keys,
            batch_count,
            start_seq,
            codec.extension(),
            &existing_labels,
        )?;
        let deltas = build_index_deltas(&plan, &index_columns);

        let mut indices = BTreeMap::new();
        for (column, delta) in deltas {
            let mut merged = if adopting {
                // Newly adopted indices must also cover historical
                // partitions, so back-fill from the existing data files.
                backfill_index(store, codec, &existing, &column).await?
            } else {
                load_index_blob(store, &uuid, &existing.indices[&column], &column).await?
            };
            merged.merge(&delta);
            indices.insert(column, merged);
        }

        // Write phase. Markers are rewritten only when merging widened a
        // schema; index blobs are replaced in place (readers intersect
        // index hits with the descriptor's partition list).
        write_data_files(store, codec, &uuid, &schemas, &plan).await?;
        let changed_schemas = schemas
            .iter()
            .filter(|(table, schema)| current_schemas.get(*table) != Some(*schema));
        write_schema_markers(store, &uuid, changed_schemas).await?;
        write_index_blobs(store, &uuid, indices.values()).await?;

        let mut metadata = existing;
        for (table, schema) in &schemas {
            metadata.tables.insert(table.clone(), schema.column_names());
        }
        metadata
            .partitions
            .extend(planned_partition_entries(&plan));
        metadata.indices = index_columns
            .iter()
            .map(|c| (c.clone(), layout::index_blob_rel_key(c)))
            .collect();
        metadata.metadata.extend(request.user_metadata);

        store
            .put(&metadata.document_key(), metadata.to_bytes())
            .await
            .context(StorageSnafu)?;

        info!(
            "updated dataset {uuid}: +{} partition(s), {} total",
            plan.len(),
            metadata.partitions.len()
        );
        Ok(Dataset { metadata })
    }

    /// Drop the named partition labels from the dataset.
    ///
    /// The partitions' data files are *not* deleted; they stay in the
    /// store, unreferenced, until garbage collection reclaims them. Index
    /// entries for the dropped labels are pruned and the pruned blobs
    /// written back before the descriptor is republished.
    pub async fn delete_partitions(
        store: &dyn BlobStore,
        uuid: &str,
        labels: &BTreeSet<String>,
    ) -> DatasetResult<Dataset> {
        let mut metadata = load_document(store, uuid).await?;

        for label in labels {
            ensure!(
                metadata.partitions.contains_key(label),
                UnknownPartitionSnafu { uuid, label }
            );
        }
        for label in labels {
            metadata.partitions.remove(label);
        }

        for (column, rel_key) in &metadata.indices {
            let mut loaded = load_index_blob(store, uuid, rel_key, column).await?;
            loaded.prune(labels);
            store
                .put(&layout::absolute_key(uuid, rel_key), loaded.to_bytes())
                .await
                .context(StorageSnafu)?;
        }

        store
            .put(&metadata.document_key(), metadata.to_bytes())
            .await
            .context(StorageSnafu)?;

        info!(
            "removed {} partition(s) from dataset {uuid}; {} remain",
            labels.len(),
            metadata.partitions.len()
        );
        Ok(Dataset { metadata })
    }

    /// Read every row of `table`, concatenating partitions in append order.
    pub async fn read_table(
        &self,
        store: &dyn BlobStore,
        codec: &dyn Codec,
        table: &str,
    ) -> DatasetResult<RowBatch> {
        ensure!(
            self.metadata.tables.contains_key(table),
            UnknownTableSnafu {
                uuid: self.uuid(),
                table,
            }
        );

        let mut rows = Vec::new();
        for (label, files) in &self.metadata.partitions {
            let rel_key = match files.get(table) {
                Some(rel_key) => rel_key,
                None => {
                    return Err(crate::metadata::CorruptSnafu {
                        uuid: self.uuid(),
                        reason: format!("partition {label} has no file for table {table}"),
                    }
                    .build())
                    .context(DocumentSnafu);
                }
            };
            let bytes = store
                .get(&layout::absolute_key(self.uuid(), rel_key))
                .await
                .context(StorageSnafu)?;
            let batch = codec.deserialize(&bytes).context(CodecSnafu { table })?;
            rows.extend(batch.into_rows());
        }
        Ok(RowBatch::new(rows))
    }

    /// Load the authoritative schema of `table` from its marker blob.
    pub async fn table_schema(&self, store: &dyn BlobStore, table: &str) -> DatasetResult<Schema> {
        ensure!(
            self.metadata.tables.contains_key(table),
            UnknownTableSnafu {
                uuid: self.uuid(),
                table,
            }
        );
        load_schema_marker(store, self.uuid(), table).await
    }

    /// Load the secondary index over `column`.
    ///
    /// This is the deferred second phase of a read: the descriptor load is
    /// cheap, index blobs are fetched only when a query needs them.
    pub async fn load_index(
        &self,
        store: &dyn BlobStore,
        column: &str,
    ) -> DatasetResult<SecondaryIndex> {
        let rel_key = self.metadata.indices.get(column).context(UnknownIndexSnafu {
            uuid: self.uuid(),
            column,
        })?;
        load_index_blob(store, self.uuid(), rel_key, column).await
    }

    /// Labels of live partitions containing `value`, according to `index`.
    ///
    /// Intersects the index entry with this snapshot's partition list, so
    /// stale entries left by an interrupted commit are filtered out.
    pub fn indexed_partitions(&self, index: &SecondaryIndex, value: &Value) -> BTreeSet<String> {
        match index.partitions_for(value) {
            None => BTreeSet::new(),
            Some(labels) => labels
                .iter()
                .filter(|label| self.metadata.partitions.contains_key(*label))
                .cloned()
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

/// Charset check for identifiers that become key components.
fn validate_identifier(what: &'static str, value: &str) -> DatasetResult<()> {
    let valid = !value.is_empty()
        && value != "."
        && value != ".."
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    ensure!(valid, InvalidIdentifierSnafu { what, value });
    Ok(())
}

fn validate_table_names(batches: &TableBatches) -> DatasetResult<()> {
    for table in batches.keys() {
        validate_identifier("table name", table)?;
        // The indices directory is reserved for index blobs.
        ensure!(
            table.as_str() != layout::INDICES_DIR,
            InvalidIdentifierSnafu {
                what: "table name",
                value: table.clone(),
            }
        );
    }
    Ok(())
}

/// Verify the batch shape and return the per-table batch count.
fn checked_batch_count(uuid: &str, batches: &TableBatches) -> DatasetResult<usize> {
    let mut expected: Option<usize> = None;
    for (table, list) in batches {
        match expected {
            None => expected = Some(list.len()),
            Some(count) => {
                ensure!(
                    list.len() == count,
                    BatchCountMismatchSnafu {
                        table: table.clone(),
                        expected: count,
                        found: list.len(),
                    }
                );
            }
        }
    }
    let count = expected.unwrap_or(0);
    ensure!(count > 0, EmptyCommitSnafu { uuid });
    Ok(count)
}

/// Infer and merge the schema of every table, against `current` where a
/// table already has an authoritative schema.
fn merged_table_schemas(
    codec: &dyn Codec,
    uuid: &str,
    batches: &TableBatches,
    current: &BTreeMap<String, Schema>,
) -> DatasetResult<BTreeMap<String, Schema>> {
    let mut schemas = BTreeMap::new();
    for (table, list) in batches {
        let mut merged = current.get(table).cloned();
        for batch in list {
            let inferred = codec.infer_schema(batch).context(CodecSnafu { table })?;
            merged = Some(
                Schema::merge(merged.as_ref(), &inferred, &StrictWidening)
                    .context(SchemaSnafu { table })?,
            );
        }
        let schema = merged.context(EmptyCommitSnafu { uuid })?;
        schemas.insert(table.clone(), schema);
    }
    Ok(schemas)
}

/// Require every index column in every table schema of the commit.
fn ensure_index_columns(
    schemas: &BTreeMap<String, Schema>,
    columns: &BTreeSet<String>,
) -> DatasetResult<()> {
    for column in columns {
        for (table, schema) in schemas {
            if schema.column(column).is_none() {
                return Err(index::MissingColumnSnafu { table, column }.build())
                    .context(IndexSnafu);
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Partition planning
// ---------------------------------------------------------------------------

struct PlannedFile {
    rel_key: String,
    batch: RowBatch,
}

struct PlannedPartition {
    label: String,
    files: BTreeMap<String, PlannedFile>,
}

/// Split every batch position into labeled partitions.
///
/// Each position's key tuples are unioned across tables, and every table
/// contributes exactly one file per resulting label (an empty one when it
/// has no rows for that key). Positions with no rows at all produce no
/// partition.
fn plan_partitions(
    uuid: &str,
    batches: &TableBatches,
    partition_columns: &[String],
    batch_count: usize,
    start_seq: u64,
    extension: &str,
    existing_labels: &BTreeSet<String>,
) -> DatasetResult<Vec<PlannedPartition>> {
    let mut plan = Vec::new();
    let mut seq = start_seq;

    for position in 0..batch_count {
        let mut splits: BTreeMap<&str, BTreeMap<PartitionKey, RowBatch>> = BTreeMap::new();
        let mut keys: BTreeSet<PartitionKey> = BTreeSet::new();
        for (table, list) in batches {
            let split = partition::split_batch(table, &list[position], partition_columns)
                .context(PartitioningSnafu)?;
            keys.extend(split.keys().cloned());
            splits.insert(table.as_str(), split);
        }

        for key in keys {
            let mut subsets = BTreeMap::new();
            for (table, split) in &mut splits {
                subsets.insert((*table).to_string(), split.remove(&key).unwrap_or_default());
            }
            if subsets.values().all(RowBatch::is_empty) {
                // An all-empty position (unpartitioned identity split of
                // empty batches) is not stored.
                continue;
            }

            let label = layout::partition_label(seq);
            seq += 1;
            ensure!(
                !existing_labels.contains(&label),
                DuplicatePartitionLabelSnafu { uuid, label }
            );

            let prefix = key.path_prefix();
            let files = subsets
                .into_iter()
                .map(|(table, batch)| {
                    let rel_key = format!("{table}/{prefix}{label}.{extension}");
                    (table, PlannedFile { rel_key, batch })
                })
                .collect();
            plan.push(PlannedPartition { label, files });
        }
    }

    Ok(plan)
}

fn planned_partition_entries(
    plan: &[PlannedPartition],
) -> BTreeMap<String, BTreeMap<String, String>> {
    plan.iter()
        .map(|planned| {
            let files = planned
                .files
                .iter()
                .map(|(table, file)| (table.clone(), file.rel_key.clone()))
                .collect();
            (planned.label.clone(), files)
        })
        .collect()
}

fn build_index_deltas(
    plan: &[PlannedPartition],
    columns: &BTreeSet<String>,
) -> BTreeMap<String, SecondaryIndex> {
    let mut deltas: BTreeMap<String, SecondaryIndex> = columns
        .iter()
        .map(|column| (column.clone(), SecondaryIndex::new(column.clone())))
        .collect();
    for planned in plan {
        for file in planned.files.values() {
            for delta in deltas.values_mut() {
                delta.observe(&file.batch, &planned.label);
            }
        }
    }
    deltas
}

// ---------------------------------------------------------------------------
// Store access helpers
// ---------------------------------------------------------------------------

async fn load_document(store: &dyn BlobStore, uuid: &str) -> DatasetResult<DatasetMetadata> {
    let key = layout::metadata_document_key(uuid);
    let bytes = match store.get(&key).await {
        Ok(bytes) => bytes,
        Err(StorageError::NotFound { .. }) => return NotFoundSnafu { uuid }.fail(),
        Err(source) => return Err(source).context(StorageSnafu),
    };
    DatasetMetadata::from_bytes(uuid, &bytes).context(DocumentSnafu)
}

async fn load_schema_marker(
    store: &dyn BlobStore,
    uuid: &str,
    table: &str,
) -> DatasetResult<Schema> {
    let key = layout::absolute_key(uuid, &layout::schema_marker_rel_key(table));
    let bytes = store.get(&key).await.context(StorageSnafu)?;
    serde_json::from_slice(&bytes).map_err(|e| DatasetError::CorruptMarker {
        table: table.to_string(),
        reason: e.to_string(),
        backtrace: Backtrace::capture(),
    })
}

async fn load_index_blob(
    store: &dyn BlobStore,
    uuid: &str,
    rel_key: &str,
    column: &str,
) -> DatasetResult<SecondaryIndex> {
    let key = layout::absolute_key(uuid, rel_key);
    match store.get(&key).await {
        Ok(bytes) => SecondaryIndex::from_bytes(column, &bytes).context(IndexSnafu),
        // A declared index whose blob is missing reads as empty; the next
        // successful commit writes it back.
        Err(StorageError::NotFound { .. }) => Ok(SecondaryIndex::new(column)),
        Err(source) => Err(source).context(StorageSnafu),
    }
}

/// Rebuild an index over every partition already committed, reading the
/// historical data files back through the codec.
async fn backfill_index(
    store: &dyn BlobStore,
    codec: &dyn Codec,
    metadata: &DatasetMetadata,
    column: &str,
) -> DatasetResult<SecondaryIndex> {
    let mut built = SecondaryIndex::new(column);
    for (label, files) in &metadata.partitions {
        for (table, rel_key) in files {
            let bytes = store
                .get(&layout::absolute_key(&metadata.dataset_uuid, rel_key))
                .await
                .context(StorageSnafu)?;
            let batch = codec.deserialize(&bytes).context(CodecSnafu { table })?;
            built.observe(&batch, label);
        }
    }
    Ok(built)
}

async fn write_data_files(
    store: &dyn BlobStore,
    codec: &dyn Codec,
    uuid: &str,
    schemas: &BTreeMap<String, Schema>,
    plan: &[PlannedPartition],
) -> DatasetResult<()> {
    for planned in plan {
        for (table, file) in &planned.files {
            let bytes = codec
                .serialize(&schemas[table.as_str()], &file.batch)
                .context(CodecSnafu { table })?;
            store
                .put(&layout::absolute_key(uuid, &file.rel_key), bytes)
                .await
                .context(StorageSnafu)?;
            debug!("wrote {} row(s) to {uuid}/{}", file.batch.len(), file.rel_key);
        }
    }
    Ok(())
}

async fn write_schema_markers<'a>(
    store: &dyn BlobStore,
    uuid: &str,
    schemas: impl Iterator<Item = (&'a String, &'a Schema)>,
) -> DatasetResult<()> {
    for (table, schema) in schemas {
        let key = layout::absolute_key(uuid, &layout::schema_marker_rel_key(table));
        // Schema serialization is plain JSON of string-keyed structs and
        // cannot fail.
        let bytes = serde_json::to_vec(schema).expect("schema serialization is infallible");
        store
            .put(&key, bytes.into())
            .await
            .context(StorageSnafu)?;
        debug!("wrote schema marker for table {table} of dataset {uuid}");
    }
    Ok(())
}

async fn write_index_blobs<'a>(
    store: &dyn BlobStore,
    uuid: &str,
    indices: impl Iterator<Item = &'a SecondaryIndex>,
) -> DatasetResult<()> {
    for index in indices {
        let key = layout::absolute_key(uuid, &layout::index_blob_rel_key(index.column()));
        store
            .put(&key, index.to_bytes())
            .await
            .context(StorageSnafu)?;
        debug!("wrote index blob for column {} of dataset {uuid}", index.column());
    }
    Ok(())
}
