//! # dataset-table-format
//!
//! Table-format layer for partitioned columnar datasets stored behind a
//! generic key-value blob store: dataset identity, per-table schema
//! tracking, physical partitioning, secondary indexing, atomic multi-file
//! commits, and garbage collection of orphaned files.
//!
//! This crate is the supported public entry point and provides a small,
//! stable surface over `dataset-table-core`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use dataset_table_format::prelude::*;
//! ```

/// Convenience prelude with the stable, supported surface.
pub mod prelude;

/// Garbage collection namespace (wrapper-only).
pub mod gc {
    pub use dataset_table_core::gc::collect;
}

pub use dataset_table_core::batch::{Row, RowBatch, Value, row};
pub use dataset_table_core::codec::{Codec, CodecError, JsonCodec};
pub use dataset_table_core::dataset::{
    CreateRequest, Dataset, DatasetError, TableBatches, UpdateRequest,
};
pub use dataset_table_core::index::SecondaryIndex;
pub use dataset_table_core::metadata::DatasetMetadata;
pub use dataset_table_core::schema::{Column, MergePolicy, PrimitiveType, Schema, StrictWidening};
pub use dataset_table_core::storage::{BlobStore, FsStore, MemoryStore, StorageError};
