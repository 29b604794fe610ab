//! Core metadata and commit engine for `dataset-table-format`.
//!
//! This crate provides the foundational pieces for managing large tabular
//! datasets stored as collections of immutable columnar files behind a
//! generic key-value blob store:
//!
//! - A `BlobStore` abstraction with in-memory and local-filesystem backends
//!   (`storage` module). The only primitive the engine relies on is an
//!   atomic, immediately visible single-key put.
//! - Strongly-typed row batches and a pluggable row-batch codec
//!   (`batch` and `codec` modules).
//! - Per-table schema tracking with an explicit, swappable merge policy
//!   (`schema` module).
//! - Partition-key derivation with lossless path escaping (`partition` and
//!   `layout` modules).
//! - Secondary value-to-partition indices persisted as independent blobs
//!   (`index` module).
//! - The dataset descriptor document and the atomic create/update/delete
//!   commit protocol built on top of it (`metadata` and `dataset` modules).
//! - Garbage collection of store objects no longer referenced by the
//!   committed descriptor (`gc` module).
//!
//! The commit protocol is designed to be:
//!
//! - **Additive**: updates only ever append partitions; previously
//!   referenced files are never rewritten or removed by a commit.
//! - **Atomically published**: a commit becomes visible in exactly one
//!   single-key write of the dataset descriptor. Failures before that write
//!   leave orphan files but no visible effect.
//! - **Validated before mutation**: schema, partitioning, and table-set
//!   checks all run before the first byte is written to the store.
//!
//! Execution front-ends (immediate, per-partition, distributed) are expected
//! to normalize their inputs into the `table name -> ordered row batches`
//! shape accepted here rather than re-implementing the commit logic.
#![deny(missing_docs)]
pub mod batch;
pub mod codec;
pub mod dataset;
pub mod gc;
pub mod index;
pub mod layout;
pub mod metadata;
pub mod partition;
pub mod schema;
pub mod storage;
