//! Row batches and primitive cell values.
//!
//! The engine accepts data in one normalized shape: `table name -> ordered
//! list of [`RowBatch`]es`, where each batch is an ordered list of rows and
//! each row maps column names to [`Value`]s. Front-ends are responsible for
//! converting their own input shapes (single table, labeled partitions,
//! multi-table mappings) into this one before calling the engine.
//!
//! `Value` carries exactly the primitive types the schema layer knows about.
//! Its canonical string encoding is shared by the partition-key deriver
//! (which escapes it into path segments) and the secondary index builder
//! (which uses it as the index key), so the two stay consistent by
//! construction.

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::schema::PrimitiveType;

/// A single cell value.
///
/// `Float32`/`Float64` use `PartialEq` semantics; `NaN` never compares equal
/// and cannot be serialized by the JSON codec.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value; legal only in nullable columns.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 32-bit floating point.
    Float32(f32),
    /// 64-bit floating point.
    Float64(f64),
    /// UTF-8 encoded string.
    Utf8(String),
    /// Variable-length binary data.
    Binary(Vec<u8>),
}

impl Value {
    /// The primitive type of this value, or `None` for [`Value::Null`].
    pub fn data_type(&self) -> Option<PrimitiveType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(PrimitiveType::Bool),
            Value::Int32(_) => Some(PrimitiveType::Int32),
            Value::Int64(_) => Some(PrimitiveType::Int64),
            Value::Float32(_) => Some(PrimitiveType::Float32),
            Value::Float64(_) => Some(PrimitiveType::Float64),
            Value::Utf8(_) => Some(PrimitiveType::Utf8),
            Value::Binary(_) => Some(PrimitiveType::Binary),
        }
    }

    /// True for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Canonical, lossless string encoding of a non-null value.
    ///
    /// Integers and floats use their shortest round-trip decimal form,
    /// binary data is base64. Returns `None` for [`Value::Null`]; null has
    /// no canonical encoding and cannot appear in partition keys or index
    /// entries.
    pub fn canonical_string(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(v) => Some(v.to_string()),
            Value::Int32(v) => Some(v.to_string()),
            Value::Int64(v) => Some(v.to_string()),
            Value::Float32(v) => Some(v.to_string()),
            Value::Float64(v) => Some(v.to_string()),
            Value::Utf8(v) => Some(v.clone()),
            Value::Binary(v) => Some(BASE64.encode(v)),
        }
    }
}

/// One row: column name to cell value.
///
/// Column order inside a row is not significant; the table schema owns
/// ordering. Columns missing from a row read as null.
pub type Row = BTreeMap<String, Value>;

/// An ordered list of rows for one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowBatch {
    rows: Vec<Row>,
}

impl RowBatch {
    /// Create a batch from rows, preserving their order.
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// The rows in this batch.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Consume the batch, yielding its rows.
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if the batch holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The value of `column` in row `index`, treating missing columns as null.
    pub fn value(&self, index: usize, column: &str) -> &Value {
        self.rows
            .get(index)
            .and_then(|row| row.get(column))
            .unwrap_or(&Value::Null)
    }
}

/// Build a [`Row`] from `(name, value)` pairs. Test and example convenience.
pub fn row(cells: impl IntoIterator<Item = (&'static str, Value)>) -> Row {
    cells
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_string_roundtrips_floats() {
        let v = Value::Float64(0.1 + 0.2);
        let s = v.canonical_string().expect("non-null");
        assert_eq!(s.parse::<f64>().expect("parse"), 0.1 + 0.2);
    }

    #[test]
    fn canonical_string_encodes_binary_as_base64() {
        let v = Value::Binary(vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(v.canonical_string().as_deref(), Some("3q2+7w=="));
    }

    #[test]
    fn null_has_no_canonical_string() {
        assert_eq!(Value::Null.canonical_string(), None);
        assert_eq!(Value::Null.data_type(), None);
    }

    #[test]
    fn missing_columns_read_as_null() {
        let batch = RowBatch::new(vec![row([("a", Value::Int64(1))])]);
        assert!(batch.value(0, "b").is_null());
        assert_eq!(batch.value(0, "a"), &Value::Int64(1));
    }
}
