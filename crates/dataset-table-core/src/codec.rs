//! Row-batch codec seam and the default JSON implementation.
//!
//! The engine is agnostic about how row batches are laid out on disk; it
//! only needs three capabilities from a [`Codec`]: serialize a batch under
//! a known schema, deserialize a blob back into rows, and infer a schema
//! from raw rows. Files written by a codec are self-describing (the schema
//! travels inside the blob) so reading never depends on out-of-band state.
//!
//! [`JsonCodec`] is the shipped implementation: one JSON document per file
//! with a `columns` header and a `rows` array. It is meant for tests,
//! tooling, and small datasets; a columnar codec can be slotted in behind
//! the same trait without touching the commit protocol.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Number;
use snafu::{Backtrace, prelude::*};

use crate::batch::{Row, RowBatch, Value};
use crate::schema::{Column, PrimitiveType, Schema, SchemaError};

/// Errors raised by codec implementations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CodecError {
    /// The blob is not a well-formed encoded batch.
    #[snafu(display("Malformed encoded batch: {reason}"))]
    Malformed {
        /// Human-readable description of the defect.
        reason: String,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// A cell does not match the column type recorded in the blob header.
    #[snafu(display("Value in column {column} does not fit type {expected}"))]
    TypeMismatch {
        /// The offending column.
        column: String,
        /// The type the header declares for the column.
        expected: PrimitiveType,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// A column mixes two different primitive types across rows.
    #[snafu(display("Column {column} mixes types {first} and {second}"))]
    MixedTypes {
        /// The offending column.
        column: String,
        /// The type first observed for the column.
        first: PrimitiveType,
        /// The conflicting type observed later.
        second: PrimitiveType,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// Every value in the column is null, so no type can be inferred.
    #[snafu(display("Column {column} has only null values; type cannot be inferred"))]
    UntypedColumn {
        /// The offending column.
        column: String,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// A null value appeared in a column declared non-nullable.
    #[snafu(display("Null value in non-nullable column {column}"))]
    UnexpectedNull {
        /// The offending column.
        column: String,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// NaN and infinities have no JSON representation.
    #[snafu(display("Non-finite float in column {column} cannot be encoded"))]
    NonFiniteFloat {
        /// The offending column.
        column: String,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// The schema embedded in a blob is invalid.
    #[snafu(display("Invalid schema in encoded batch: {source}"))]
    EmbeddedSchema {
        /// Underlying schema error.
        #[snafu(source)]
        source: SchemaError,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },
}

type CodecResult<T> = Result<T, CodecError>;

/// Serialization seam between the engine and the physical file format.
pub trait Codec: Send + Sync {
    /// File extension (without dot) for blobs written by this codec.
    fn extension(&self) -> &'static str;

    /// Encode `batch` under `schema`.
    ///
    /// Every row must conform to `schema`: values of the declared type,
    /// nulls only in nullable columns, no unknown columns.
    fn serialize(&self, schema: &Schema, batch: &RowBatch) -> CodecResult<Bytes>;

    /// Decode a blob previously produced by [`Codec::serialize`].
    fn deserialize(&self, bytes: &[u8]) -> CodecResult<RowBatch>;

    /// Infer a schema from raw rows.
    ///
    /// Column order is first-appearance order; a column is nullable if any
    /// row holds null or lacks the column entirely.
    fn infer_schema(&self, batch: &RowBatch) -> CodecResult<Schema>;
}

/// Self-describing single-document JSON codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[derive(Serialize, Deserialize)]
struct EncodedBatch {
    columns: Vec<Column>,
    rows: Vec<serde_json::Map<String, serde_json::Value>>,
}

impl JsonCodec {
    fn encode_cell(column: &Column, value: &Value) -> CodecResult<serde_json::Value> {
        let actual = match value.data_type() {
            None => {
                ensure!(
                    column.nullable,
                    UnexpectedNullSnafu {
                        column: column.name.clone(),
                    }
                );
                return Ok(serde_json::Value::Null);
            }
            Some(ty) => ty,
        };
        ensure!(
            actual == column.data_type,
            TypeMismatchSnafu {
                column: column.name.clone(),
                expected: column.data_type,
            }
        );

        Ok(match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(v) => serde_json::Value::Bool(*v),
            Value::Int32(v) => serde_json::Value::Number((*v).into()),
            Value::Int64(v) => serde_json::Value::Number((*v).into()),
            Value::Float32(v) => Number::from_f64(f64::from(*v))
                .map(serde_json::Value::Number)
                .context(NonFiniteFloatSnafu {
                    column: column.name.clone(),
                })?,
            Value::Float64(v) => Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .context(NonFiniteFloatSnafu {
                    column: column.name.clone(),
                })?,
            Value::Utf8(v) => serde_json::Value::String(v.clone()),
            Value::Binary(v) => serde_json::Value::String(BASE64.encode(v)),
        })
    }

    fn decode_cell(column: &Column, cell: &serde_json::Value) -> CodecResult<Value> {
        let mismatch = || {
            TypeMismatchSnafu {
                column: column.name.clone(),
                expected: column.data_type,
            }
            .build()
        };

        if cell.is_null() {
            ensure!(
                column.nullable,
                UnexpectedNullSnafu {
                    column: column.name.clone(),
                }
            );
            return Ok(Value::Null);
        }

        Ok(match column.data_type {
            PrimitiveType::Bool => Value::Bool(cell.as_bool().ok_or_else(mismatch)?),
            PrimitiveType::Int32 => {
                let wide = cell.as_i64().ok_or_else(mismatch)?;
                Value::Int32(i32::try_from(wide).map_err(|_| mismatch())?)
            }
            PrimitiveType::Int64 => Value::Int64(cell.as_i64().ok_or_else(mismatch)?),
            PrimitiveType::Float32 => {
                let wide = cell.as_f64().ok_or_else(mismatch)?;
                Value::Float32(wide as f32)
            }
            PrimitiveType::Float64 => Value::Float64(cell.as_f64().ok_or_else(mismatch)?),
            PrimitiveType::Utf8 => Value::Utf8(cell.as_str().ok_or_else(mismatch)?.to_string()),
            PrimitiveType::Binary => {
                let text = cell.as_str().ok_or_else(mismatch)?;
                Value::Binary(BASE64.decode(text).map_err(|_| mismatch())?)
            }
        })
    }
}

impl Codec for JsonCodec {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn serialize(&self, schema: &Schema, batch: &RowBatch) -> CodecResult<Bytes> {
        let mut rows = Vec::with_capacity(batch.len());
        for row in batch.rows() {
            // Unknown columns are a caller bug; the schema is authoritative.
            for name in row.keys() {
                ensure!(
                    schema.column(name).is_some(),
                    MalformedSnafu {
                        reason: format!("row references column {name} absent from schema"),
                    }
                );
            }

            let mut encoded = serde_json::Map::with_capacity(schema.columns().len());
            for column in schema.columns() {
                let value = row.get(&column.name).unwrap_or(&Value::Null);
                encoded.insert(column.name.clone(), Self::encode_cell(column, value)?);
            }
            rows.push(encoded);
        }

        let document = EncodedBatch {
            columns: schema.columns().to_vec(),
            rows,
        };
        let bytes = serde_json::to_vec(&document).map_err(|e| CodecError::Malformed {
            reason: format!("failed to encode batch: {e}"),
            backtrace: Backtrace::capture(),
        })?;
        Ok(Bytes::from(bytes))
    }

    fn deserialize(&self, bytes: &[u8]) -> CodecResult<RowBatch> {
        let document: EncodedBatch =
            serde_json::from_slice(bytes).map_err(|e| CodecError::Malformed {
                reason: format!("failed to parse batch: {e}"),
                backtrace: Backtrace::capture(),
            })?;
        let schema = Schema::new(document.columns).context(EmbeddedSchemaSnafu)?;

        let mut rows = Vec::with_capacity(document.rows.len());
        for encoded in &document.rows {
            let mut row = Row::new();
            for column in schema.columns() {
                let cell = encoded.get(&column.name).unwrap_or(&serde_json::Value::Null);
                row.insert(column.name.clone(), Self::decode_cell(column, cell)?);
            }
            rows.push(row);
        }
        Ok(RowBatch::new(rows))
    }

    fn infer_schema(&self, batch: &RowBatch) -> CodecResult<Schema> {
        // First-appearance order; types unified across rows.
        let mut order: Vec<String> = Vec::new();
        let mut types: std::collections::HashMap<String, Option<PrimitiveType>> =
            std::collections::HashMap::new();
        let mut nullable: std::collections::HashMap<String, bool> =
            std::collections::HashMap::new();

        for (row_index, row) in batch.rows().iter().enumerate() {
            for (name, value) in row {
                if !types.contains_key(name) {
                    order.push(name.clone());
                    types.insert(name.clone(), None);
                    // A column absent from every earlier row is nullable.
                    nullable.insert(name.clone(), row_index > 0);
                }
                match (types[name], value.data_type()) {
                    (_, None) => {
                        nullable.insert(name.clone(), true);
                    }
                    (None, Some(ty)) => {
                        types.insert(name.clone(), Some(ty));
                    }
                    (Some(first), Some(second)) if first != second => {
                        return MixedTypesSnafu {
                            column: name.clone(),
                            first,
                            second,
                        }
                        .fail();
                    }
                    (Some(_), Some(_)) => {}
                }
            }
            // A column missing from this row is nullable.
            for name in &order {
                if !row.contains_key(name) {
                    nullable.insert(name.clone(), true);
                }
            }
        }

        let mut columns = Vec::with_capacity(order.len());
        for name in order {
            let data_type = types[&name].context(UntypedColumnSnafu {
                column: name.clone(),
            })?;
            columns.push(Column::new(&name, data_type, nullable[&name]));
        }
        Schema::new(columns).context(EmbeddedSchemaSnafu)
    }
}
