//! The dataset descriptor document.
//!
//! A [`DatasetMetadata`] value is the single authority for what is live in
//! a dataset: its tables, partitions, partitioning scheme, declared
//! indices, and free-form user metadata. It is serialized as one JSON
//! document at `<uuid>.by-dataset-metadata.json` and replaced wholesale by
//! exactly one atomic put per successful commit, never patched in place.
//!
//! Readers load the document once and resolve every subsequent lookup
//! against that snapshot. The garbage collector walks
//! [`DatasetMetadata::referenced_keys`] to decide what must survive; any
//! key under the dataset prefix that the walk does not produce is garbage.

use std::collections::{BTreeMap, BTreeSet};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use snafu::{Backtrace, prelude::*};

use crate::layout;

/// Version of the descriptor document format.
///
/// Bumped only on breaking changes to the JSON layout.
pub const DATASET_METADATA_VERSION: u32 = 4;

/// Errors raised while encoding or decoding descriptor documents.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum MetadataError {
    /// The blob is not a parseable descriptor document.
    #[snafu(display("Corrupt dataset descriptor for {uuid}: {reason}"))]
    Corrupt {
        /// The dataset whose descriptor failed to parse.
        uuid: String,
        /// Human-readable description of the defect.
        reason: String,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// The document parsed but declares an unsupported format version.
    #[snafu(display(
        "Dataset {uuid} has descriptor version {found}, this build supports {supported}"
    ))]
    UnsupportedVersion {
        /// The dataset whose descriptor is unsupported.
        uuid: String,
        /// The version recorded in the document.
        found: u32,
        /// The version this build reads and writes.
        supported: u32,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },
}

/// The serialized dataset descriptor.
///
/// Field layout is part of the on-store format; every field is stored even
/// when empty so documents stay diffable across versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    /// Opaque unique identifier of the dataset.
    pub dataset_uuid: String,

    /// Descriptor format version; see [`DATASET_METADATA_VERSION`].
    pub dataset_metadata_version: u32,

    /// Informational ordered column-name list per table.
    ///
    /// The authoritative schema lives in each table's schema marker blob;
    /// this mapping exists so tooling can inspect a dataset from the
    /// descriptor alone.
    pub tables: BTreeMap<String, Vec<String>>,

    /// Partition label to (table name to relative data-file key).
    ///
    /// Keys are relative to the dataset prefix. Labels sort in append
    /// order by construction (zero-padded sequence prefix), so iterating
    /// this map replays partitions in call order.
    pub partitions: BTreeMap<String, BTreeMap<String, String>>,

    /// Ordered partition-key column names; empty means unpartitioned.
    pub partition_keys: Vec<String>,

    /// Declared secondary-index columns to their index-blob keys
    /// (relative to the dataset prefix).
    pub indices: BTreeMap<String, String>,

    /// Free-form user metadata.
    pub metadata: BTreeMap<String, String>,
}

impl DatasetMetadata {
    /// The set of table names.
    pub fn table_names(&self) -> BTreeSet<String> {
        self.tables.keys().cloned().collect()
    }

    /// Partition labels in append order.
    pub fn labels_in_order(&self) -> Vec<&str> {
        self.partitions.keys().map(String::as_str).collect()
    }

    /// The store key of this dataset's descriptor document.
    pub fn document_key(&self) -> String {
        layout::metadata_document_key(&self.dataset_uuid)
    }

    /// Every store key this document keeps alive, as absolute keys.
    ///
    /// Covers every partition's per-table data file, every schema marker,
    /// and every index blob. The descriptor key itself is deliberately not
    /// included; the garbage collector never touches it and listing the
    /// dataset prefix never reports it.
    pub fn referenced_keys(&self) -> BTreeSet<String> {
        let uuid = &self.dataset_uuid;
        let mut keys = BTreeSet::new();

        for files in self.partitions.values() {
            for rel_key in files.values() {
                keys.insert(layout::absolute_key(uuid, rel_key));
            }
        }
        for table in self.tables.keys() {
            keys.insert(layout::absolute_key(
                uuid,
                &layout::schema_marker_rel_key(table),
            ));
        }
        for rel_key in self.indices.values() {
            keys.insert(layout::absolute_key(uuid, rel_key));
        }

        keys
    }

    /// Serialize the document for storage.
    pub fn to_bytes(&self) -> Bytes {
        // All keys are strings; JSON encoding cannot fail.
        Bytes::from(serde_json::to_vec(self).expect("descriptor serialization is infallible"))
    }

    /// Decode a descriptor blob, verifying the format version.
    pub fn from_bytes(uuid: &str, bytes: &[u8]) -> Result<Self, MetadataError> {
        let document: DatasetMetadata =
            serde_json::from_slice(bytes).map_err(|e| MetadataError::Corrupt {
                uuid: uuid.to_string(),
                reason: e.to_string(),
                backtrace: Backtrace::capture(),
            })?;

        ensure!(
            document.dataset_metadata_version == DATASET_METADATA_VERSION,
            UnsupportedVersionSnafu {
                uuid,
                found: document.dataset_metadata_version,
                supported: DATASET_METADATA_VERSION,
            }
        );
        ensure!(
            document.dataset_uuid == uuid,
            CorruptSnafu {
                uuid,
                reason: format!("document claims uuid {}", document.dataset_uuid),
            }
        );
        Ok(document)
    }
}
