//! Error types and SNAFU context selectors for dataset operations.
//!
//! This module centralizes the `DatasetError` enum used by the public
//! commit-protocol API and exposes context selectors (via
//! `#[snafu(visibility(pub(crate)))]`) so sibling modules can attach error
//! context without re-exporting everything at the crate root. Keep new
//! variants here to ensure consistent user-facing messages.

use snafu::{Backtrace, prelude::*};

use crate::codec::CodecError;
use crate::index::IndexError;
use crate::metadata::MetadataError;
use crate::partition::PartitionError;
use crate::schema::SchemaError;
use crate::storage::StorageError;

/// Errors from dataset-level operations.
///
/// Every variant identifies the offending dataset, table, or column so
/// callers can surface actionable messages. Validation errors are returned
/// before any store mutation; storage errors during the write phase leave
/// orphan files recoverable by garbage collection but never a corrupted
/// descriptor.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DatasetError {
    /// A descriptor document already exists for the uuid; creation never
    /// overwrites implicitly.
    #[snafu(display("Dataset {uuid} already exists"))]
    AlreadyExists {
        /// The dataset that already exists.
        uuid: String,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// No descriptor document exists for the uuid.
    #[snafu(display("Dataset {uuid} does not exist"))]
    NotFound {
        /// The dataset that was not found.
        uuid: String,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// Incoming data is not schema-compatible with a table.
    #[snafu(display("Schema conflict in table {table}: {source}"))]
    Schema {
        /// The table whose schema merge failed.
        table: String,
        /// Underlying schema error.
        #[snafu(source, backtrace)]
        source: SchemaError,
    },

    /// Partition-column validation failed or the caller attempted to
    /// change partitioning after creation.
    #[snafu(display("Partitioning error: {source}"))]
    Partitioning {
        /// Underlying partitioning error.
        #[snafu(source, backtrace)]
        source: PartitionError,
    },

    /// An update supplied a table set different from the dataset's.
    ///
    /// All tables of a dataset are updated together; strict subsets and
    /// supersets are both rejected.
    #[snafu(display(
        "Update table set {found:?} does not match dataset tables {expected:?}"
    ))]
    TableSetMismatch {
        /// Table names recorded in the dataset descriptor.
        expected: Vec<String>,
        /// Table names supplied by the caller.
        found: Vec<String>,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// Tables supplied different numbers of row batches in one commit.
    ///
    /// Batch position j across all tables forms one append unit, so every
    /// table must supply the same number of batches.
    #[snafu(display(
        "Table {table} supplied {found} batches, other tables supplied {expected}"
    ))]
    BatchCountMismatch {
        /// The table with a deviating batch count.
        table: String,
        /// The batch count supplied by the first table.
        expected: usize,
        /// The batch count supplied by `table`.
        found: usize,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// An update declared a new secondary-index column on a dataset that
    /// already has declared indices.
    #[snafu(display(
        "Dataset {uuid} already declares secondary indices; cannot add index column {column}"
    ))]
    IndexPolicy {
        /// The dataset being updated.
        uuid: String,
        /// The disallowed new index column.
        column: String,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// A partition label was not found in the dataset descriptor.
    #[snafu(display("Dataset {uuid} has no partition labeled {label}"))]
    UnknownPartition {
        /// The dataset being modified.
        uuid: String,
        /// The unknown partition label.
        label: String,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// A freshly generated partition label collided with an existing one.
    #[snafu(display("Duplicate partition label {label} in dataset {uuid}"))]
    DuplicatePartitionLabel {
        /// The dataset being modified.
        uuid: String,
        /// The colliding label.
        label: String,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// The named column has no declared secondary index.
    #[snafu(display("Dataset {uuid} declares no secondary index over column {column}"))]
    UnknownIndex {
        /// The dataset being read.
        uuid: String,
        /// The column without a declared index.
        column: String,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// The named table is not part of the dataset.
    #[snafu(display("Dataset {uuid} has no table named {table}"))]
    UnknownTable {
        /// The dataset being read.
        uuid: String,
        /// The unknown table name.
        table: String,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// A commit carried no tables or a table carried no batches.
    #[snafu(display("Commit to dataset {uuid} contains no row batches"))]
    EmptyCommit {
        /// The dataset being written.
        uuid: String,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// A dataset uuid or table name contains characters the key layout
    /// cannot carry.
    #[snafu(display("Invalid {what}: {value:?}"))]
    InvalidIdentifier {
        /// What kind of identifier was rejected.
        what: &'static str,
        /// The offending value.
        value: String,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// Secondary-index maintenance failed.
    #[snafu(display("Secondary index error: {source}"))]
    Index {
        /// Underlying index error.
        #[snafu(source, backtrace)]
        source: IndexError,
    },

    /// The codec collaborator rejected or failed on a batch.
    #[snafu(display("Codec error in table {table}: {source}"))]
    Codec {
        /// The table whose batch failed to encode or decode.
        table: String,
        /// Underlying codec error.
        #[snafu(source, backtrace)]
        source: CodecError,
    },

    /// The descriptor document is unreadable or inconsistent.
    #[snafu(display("Descriptor error: {source}"))]
    Document {
        /// Underlying descriptor error.
        #[snafu(source, backtrace)]
        source: MetadataError,
    },

    /// A schema marker blob is unreadable.
    #[snafu(display("Corrupt schema marker for table {table}: {reason}"))]
    CorruptMarker {
        /// The table whose marker failed to parse.
        table: String,
        /// Human-readable description of the defect.
        reason: String,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// A blob-store operation failed.
    #[snafu(display("Storage error: {source}"))]
    Storage {
        /// Underlying storage error.
        #[snafu(source, backtrace)]
        source: StorageError,
    },
}

/// Convenience result alias for dataset operations.
pub type DatasetResult<T> = Result<T, DatasetError>;
