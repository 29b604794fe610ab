//! Secondary indices mapping column values to partition labels.
//!
//! A secondary index answers "which partitions contain value X in column
//! C?" without touching data files. One index blob is persisted per
//! declared column, at a key independent of the dataset descriptor, and is
//! loaded on demand, so descriptor loads stay cheap and index loads are an
//! explicit second phase addressed by the key recorded in the descriptor.
//!
//! Index keys are the canonical string encoding of values (shared with the
//! partition-key deriver), so an index over a partition column and an index
//! over a payload column behave identically. Null values are not indexed.
//!
//! Because an index blob is replaced in place while data commits are
//! additive, a crash between an index write and the descriptor write can
//! leave entries pointing at labels the descriptor does not (yet) know.
//! Readers must therefore intersect index hits with the descriptor's
//! partition list; `Dataset::indexed_partitions` does exactly that.

use std::collections::{BTreeMap, BTreeSet};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use snafu::{Backtrace, prelude::*};

use crate::batch::{RowBatch, Value};

/// Errors raised while building or decoding secondary indices.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum IndexError {
    /// The indexed column is missing from a row batch.
    #[snafu(display("Indexed column {column} is missing from table {table}"))]
    MissingColumn {
        /// The table whose batch lacks the column.
        table: String,
        /// The declared index column.
        column: String,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// The index blob is not a well-formed serialized index.
    #[snafu(display("Malformed index blob for column {column}: {reason}"))]
    Malformed {
        /// The column whose blob failed to parse.
        column: String,
        /// Human-readable description of the defect.
        reason: String,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },
}

type IndexResult<T> = Result<T, IndexError>;

/// One column's value-to-partition-labels mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryIndex {
    /// The indexed column.
    column: String,
    /// Canonical value string to the labels of partitions containing it.
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl SecondaryIndex {
    /// Create an empty index over `column`.
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            entries: BTreeMap::new(),
        }
    }

    /// The indexed column name.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// The full value-to-labels mapping.
    pub fn entries(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.entries
    }

    /// Labels of partitions containing `value`, if any are recorded.
    pub fn partitions_for(&self, value: &Value) -> Option<&BTreeSet<String>> {
        let key = value.canonical_string()?;
        self.entries.get(&key)
    }

    /// Record every non-null value of the indexed column in `batch` as
    /// belonging to partition `label`.
    ///
    /// Rows lacking the column read as null and are skipped; the commit
    /// protocol validates schema-level presence of indexed columns before
    /// any index is built.
    pub fn observe(&mut self, batch: &RowBatch, label: &str) {
        for row in batch.rows() {
            if let Some(key) = row.get(&self.column).and_then(Value::canonical_string) {
                self.entries
                    .entry(key)
                    .or_default()
                    .insert(label.to_string());
            }
        }
    }

    /// Per-value set union of `delta` into this index.
    pub fn merge(&mut self, delta: &SecondaryIndex) {
        for (value, labels) in &delta.entries {
            self.entries
                .entry(value.clone())
                .or_default()
                .extend(labels.iter().cloned());
        }
    }

    /// Drop `labels` from every entry, removing entries that end up empty.
    pub fn prune(&mut self, labels: &BTreeSet<String>) {
        for partition_labels in self.entries.values_mut() {
            partition_labels.retain(|label| !labels.contains(label));
        }
        self.entries.retain(|_, partition_labels| !partition_labels.is_empty());
    }

    /// Serialize the index for storage.
    pub fn to_bytes(&self) -> Bytes {
        // BTreeMap/BTreeSet serialization cannot fail.
        Bytes::from(serde_json::to_vec(self).expect("index serialization is infallible"))
    }

    /// Decode an index blob previously produced by [`SecondaryIndex::to_bytes`].
    pub fn from_bytes(column: &str, bytes: &[u8]) -> IndexResult<Self> {
        let index: SecondaryIndex =
            serde_json::from_slice(bytes).map_err(|e| IndexError::Malformed {
                column: column.to_string(),
                reason: e.to_string(),
                backtrace: Backtrace::capture(),
            })?;
        ensure!(
            index.column == column,
            MalformedSnafu {
                column,
                reason: format!("blob is an index over column {}", index.column),
            }
        );
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::row;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn labels(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn observe_groups_labels_by_value_and_skips_nulls() -> TestResult {
        let mut index = SecondaryIndex::new("e");
        let batch = RowBatch::new(vec![
            row([("e", Value::Utf8("test".into()))]),
            row([("e", Value::Utf8("train".into()))]),
            row([("e", Value::Null)]),
        ]);

        index.observe(&batch, "part-1");
        index.observe(
            &RowBatch::new(vec![row([("e", Value::Utf8("test".into()))])]),
            "part-2",
        );

        assert_eq!(
            index.partitions_for(&Value::Utf8("test".into())),
            Some(&labels(&["part-1", "part-2"]))
        );
        assert_eq!(
            index.partitions_for(&Value::Utf8("train".into())),
            Some(&labels(&["part-1"]))
        );
        assert_eq!(index.entries().len(), 2);
        Ok(())
    }

    #[test]
    fn observe_accepts_empty_batches() {
        let mut index = SecondaryIndex::new("e");
        index.observe(&RowBatch::default(), "part-1");
        assert!(index.entries().is_empty());
    }

    #[test]
    fn merge_unions_label_sets() -> TestResult {
        let mut left = SecondaryIndex::new("e");
        left.observe(
            &RowBatch::new(vec![row([("e", Value::Utf8("test".into()))])]),
            "part-1",
        );

        let mut right = SecondaryIndex::new("e");
        right.observe(
            &RowBatch::new(vec![
                row([("e", Value::Utf8("test".into()))]),
                row([("e", Value::Utf8("train".into()))]),
            ]),
            "part-2",
        );

        left.merge(&right);
        assert_eq!(
            left.partitions_for(&Value::Utf8("test".into())),
            Some(&labels(&["part-1", "part-2"]))
        );
        assert_eq!(
            left.partitions_for(&Value::Utf8("train".into())),
            Some(&labels(&["part-2"]))
        );
        Ok(())
    }

    #[test]
    fn prune_drops_labels_and_empty_entries() -> TestResult {
        let mut index = SecondaryIndex::new("e");
        index.observe(
            &RowBatch::new(vec![row([("e", Value::Utf8("test".into()))])]),
            "part-1",
        );
        index.observe(
            &RowBatch::new(vec![
                row([("e", Value::Utf8("test".into()))]),
                row([("e", Value::Utf8("train".into()))]),
            ]),
            "part-2",
        );

        index.prune(&labels(&["part-2"]));

        assert_eq!(
            index.partitions_for(&Value::Utf8("test".into())),
            Some(&labels(&["part-1"]))
        );
        assert_eq!(index.partitions_for(&Value::Utf8("train".into())), None);
        Ok(())
    }

    #[test]
    fn blob_roundtrip_preserves_entries() -> TestResult {
        let mut index = SecondaryIndex::new("e");
        index.observe(
            &RowBatch::new(vec![row([("e", Value::Int64(7))])]),
            "part-1",
        );

        let decoded = SecondaryIndex::from_bytes("e", &index.to_bytes())?;
        assert_eq!(decoded, index);
        Ok(())
    }

    #[test]
    fn blob_for_wrong_column_is_rejected() {
        let index = SecondaryIndex::new("e");
        let result = SecondaryIndex::from_bytes("other", &index.to_bytes());
        assert!(matches!(result, Err(IndexError::Malformed { .. })));
    }
}
