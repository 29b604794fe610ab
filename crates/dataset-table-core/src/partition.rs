//! Partition-key derivation and partitioning invariants.
//!
//! A dataset's partition columns are fixed at creation. Splitting takes one
//! row batch and groups its rows by the ordered tuple of escaped partition
//! values; the resulting [`PartitionKey`] renders directly into the
//! `<col>=<escaped-value>/` path prefix of every data file in that
//! partition. An unpartitioned dataset uses the empty key, so the identity
//! split falls out of the same code path.
//!
//! Cross-table validation guarantees that every partition column exists
//! with the same primitive type in every table written in one commit, and
//! that a later commit cannot change the dataset's partitioning at all.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use snafu::{Backtrace, prelude::*};

use crate::batch::{Row, RowBatch};
use crate::layout::escape_partition_value;
use crate::schema::{PrimitiveType, Schema};

/// Errors raised while validating partition columns or splitting batches.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PartitionError {
    /// A partition column does not exist in one of the tables.
    #[snafu(display("Partition column {column} is missing from table {table}"))]
    MissingColumn {
        /// The table lacking the column.
        table: String,
        /// The missing partition column.
        column: String,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// A partition column has different types across tables.
    #[snafu(display(
        "Partition column {column} has type {first} in table {first_table} \
         but type {second} in table {second_table}"
    ))]
    ColumnTypeMismatch {
        /// The partition column with inconsistent types.
        column: String,
        /// Table establishing the first observed type.
        first_table: String,
        /// First observed type.
        first: PrimitiveType,
        /// Table carrying the conflicting type.
        second_table: String,
        /// Conflicting type.
        second: PrimitiveType,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// A row holds null in a partition column.
    #[snafu(display("Null value in partition column {column} of table {table}"))]
    NullPartitionValue {
        /// The table containing the offending row.
        table: String,
        /// The partition column holding null.
        column: String,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// The caller tried to change the dataset's partition columns after
    /// creation.
    #[snafu(display(
        "Partition columns are fixed at dataset creation: dataset has {existing:?}, \
         caller supplied {requested:?}"
    ))]
    ImmutablePartitioning {
        /// Partition columns recorded in the dataset descriptor.
        existing: Vec<String>,
        /// Partition columns supplied by the caller.
        requested: Vec<String>,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },
}

/// Ordered `(column, escaped value)` pairs identifying a physical partition.
///
/// Empty for unpartitioned datasets. The derived path prefix preserves the
/// dataset's partition-column order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionKey(Vec<(String, String)>);

impl PartitionKey {
    /// The empty key used by unpartitioned datasets.
    pub fn unpartitioned() -> Self {
        PartitionKey(Vec::new())
    }

    /// The ordered `(column, escaped value)` components.
    pub fn components(&self) -> &[(String, String)] {
        &self.0
    }

    /// Render the `<col>=<escaped-value>/...` path prefix.
    ///
    /// Empty string for the unpartitioned key, so data-file keys work out
    /// with plain concatenation either way.
    pub fn path_prefix(&self) -> String {
        let mut prefix = String::new();
        for (column, value) in &self.0 {
            prefix.push_str(&escape_partition_value(column));
            prefix.push('=');
            prefix.push_str(value);
            prefix.push('/');
        }
        prefix
    }
}

/// Check that every partition column exists with one consistent type in
/// every table schema of the commit.
pub fn validate_partition_columns(
    schemas: &BTreeMap<String, Schema>,
    partition_columns: &[String],
) -> Result<(), PartitionError> {
    for column in partition_columns {
        let mut first: Option<(&str, PrimitiveType)> = None;
        for (table, schema) in schemas {
            let spec = schema.column(column).context(MissingColumnSnafu {
                table: table.clone(),
                column: column.clone(),
            })?;
            match first {
                None => first = Some((table, spec.data_type)),
                Some((first_table, first_type)) => {
                    ensure!(
                        first_type == spec.data_type,
                        ColumnTypeMismatchSnafu {
                            column: column.clone(),
                            first_table: first_table.to_string(),
                            first: first_type,
                            second_table: table.clone(),
                            second: spec.data_type,
                        }
                    );
                }
            }
        }
    }
    Ok(())
}

/// Enforce that `requested` partition columns (if supplied) equal the
/// dataset's existing ones.
///
/// `None` means "use the existing partitioning". An unpartitioned dataset
/// cannot gain partitioning this way: `Some(non-empty)` against an empty
/// existing list fails like any other mismatch.
pub fn ensure_partitioning_unchanged(
    existing: &[String],
    requested: Option<&[String]>,
) -> Result<(), PartitionError> {
    if let Some(requested) = requested {
        ensure!(
            requested == existing,
            ImmutablePartitioningSnafu {
                existing: existing.to_vec(),
                requested: requested.to_vec(),
            }
        );
    }
    Ok(())
}

/// Split one batch of `table` by the dataset's partition columns.
///
/// Row order within each group follows the input batch. With no partition
/// columns this is the identity split: one group under the empty key.
pub fn split_batch(
    table: &str,
    batch: &RowBatch,
    partition_columns: &[String],
) -> Result<BTreeMap<PartitionKey, RowBatch>, PartitionError> {
    if partition_columns.is_empty() {
        let mut groups = BTreeMap::new();
        groups.insert(PartitionKey::unpartitioned(), batch.clone());
        return Ok(groups);
    }

    let mut groups: BTreeMap<PartitionKey, Vec<Row>> = BTreeMap::new();
    for row in batch.rows() {
        let mut components = Vec::with_capacity(partition_columns.len());
        for column in partition_columns {
            let value = row.get(column).unwrap_or(&crate::batch::Value::Null);
            let canonical = value.canonical_string().context(NullPartitionValueSnafu {
                table,
                column: column.clone(),
            })?;
            components.push((column.clone(), escape_partition_value(&canonical)));
        }
        groups
            .entry(PartitionKey(components))
            .or_default()
            .push(row.clone());
    }

    Ok(groups
        .into_iter()
        .map(|(key, rows)| (key, RowBatch::new(rows)))
        .collect())
}
