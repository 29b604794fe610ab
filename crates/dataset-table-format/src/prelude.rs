//! Wrapper prelude.
//!
//! The `dataset-table-format` crate is the supported public entry point.
//! Downstream code should prefer importing from this prelude instead of
//! depending on internal core module paths.

pub use crate::gc;
pub use crate::{
    BlobStore, Codec, Column, CreateRequest, Dataset, DatasetError, DatasetMetadata, FsStore,
    JsonCodec, MemoryStore, PrimitiveType, Row, RowBatch, Schema, SecondaryIndex, TableBatches,
    UpdateRequest, Value,
};
