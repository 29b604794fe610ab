//! Table schemas and the schema merge policy.
//!
//! A [`Schema`] is an ordered list of named, typed, nullability-flagged
//! columns. Every table of a dataset carries exactly one authoritative
//! schema, persisted in its schema marker blob; every write must merge
//! cleanly against it before a single byte reaches the store.
//!
//! Merging is delegated to a [`MergePolicy`]. The shipped policy,
//! [`StrictWidening`], requires an exact type match (column order is
//! insignificant) and only ever widens nullability. The exact promotion
//! rule set is deliberately pluggable; a laxer policy (integer widening,
//! for example) can be introduced without touching the commit protocol.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use snafu::{Backtrace, prelude::*};

/// Primitive column types storable in a dataset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    /// Boolean value.
    Bool,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 32-bit floating point.
    Float32,
    /// 64-bit floating point.
    Float64,
    /// UTF-8 encoded string.
    Utf8,
    /// Variable-length binary data.
    Binary,
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimitiveType::Bool => "bool",
            PrimitiveType::Int32 => "int32",
            PrimitiveType::Int64 => "int64",
            PrimitiveType::Float32 => "float32",
            PrimitiveType::Float64 => "float64",
            PrimitiveType::Utf8 => "utf8",
            PrimitiveType::Binary => "binary",
        };
        write!(f, "{name}")
    }
}

/// One column definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Primitive type for the column.
    pub data_type: PrimitiveType,
    /// Whether the column allows null values.
    pub nullable: bool,
}

impl Column {
    /// Shorthand constructor.
    pub fn new(name: impl Into<String>, data_type: PrimitiveType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "{}?: {}", self.name, self.data_type)
        } else {
            write!(f, "{}: {}", self.name, self.data_type)
        }
    }
}

/// Errors raised while constructing or merging schemas.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SchemaError {
    /// The same column name appears twice in one schema.
    #[snafu(display("Duplicate column {column} in schema"))]
    DuplicateColumn {
        /// The duplicated column name.
        column: String,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// Column exists in both schemas but the types are incompatible under
    /// the active merge policy.
    #[snafu(display(
        "Schema conflict on column {column}: existing type {existing}, incoming type {incoming}"
    ))]
    Conflict {
        /// The name of the conflicting column.
        column: String,
        /// The type recorded in the authoritative schema.
        existing: PrimitiveType,
        /// The type carried by the incoming data.
        incoming: PrimitiveType,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// The incoming schema lacks a column the authoritative schema has.
    #[snafu(display("Incoming schema is missing column {column}"))]
    MissingColumn {
        /// The name of the missing column.
        column: String,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// The incoming schema carries a column the authoritative schema lacks.
    #[snafu(display("Incoming schema has unexpected extra column {column}"))]
    ExtraColumn {
        /// The name of the extra column.
        column: String,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },
}

/// An ordered collection of [`Column`]s with unique names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Build a schema, rejecting duplicate column names.
    pub fn new(columns: Vec<Column>) -> Result<Self, SchemaError> {
        let mut seen = HashMap::with_capacity(columns.len());
        for column in &columns {
            if seen.insert(column.name.as_str(), ()).is_some() {
                return DuplicateColumnSnafu {
                    column: column.name.clone(),
                }
                .fail();
            }
        }
        Ok(Self { columns })
    }

    /// The columns in declaration order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Merge `incoming` against an optional authoritative schema.
    ///
    /// With no authoritative schema (the table's first write), `incoming` is
    /// adopted verbatim. Otherwise both column sets must be equal (order is
    /// insignificant) and each column pair is reconciled by `policy`; the
    /// merged schema keeps the authoritative column order.
    pub fn merge(
        existing: Option<&Schema>,
        incoming: &Schema,
        policy: &dyn MergePolicy,
    ) -> Result<Schema, SchemaError> {
        let existing = match existing {
            None => return Ok(incoming.clone()),
            Some(schema) => schema,
        };

        let incoming_by_name: HashMap<&str, &Column> = incoming
            .columns
            .iter()
            .map(|c| (c.name.as_str(), c))
            .collect();

        let mut merged = Vec::with_capacity(existing.columns.len());
        for column in &existing.columns {
            let candidate = incoming_by_name
                .get(column.name.as_str())
                .copied()
                .context(MissingColumnSnafu {
                    column: column.name.clone(),
                })?;
            merged.push(policy.merge_column(column, candidate)?);
        }

        for column in &incoming.columns {
            if existing.column(&column.name).is_none() {
                return ExtraColumnSnafu {
                    column: column.name.clone(),
                }
                .fail();
            }
        }

        Schema::new(merged)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{column}")?;
        }
        write!(f, "]")
    }
}

/// Rule for reconciling one column present in both schemas.
pub trait MergePolicy: Send + Sync {
    /// Produce the merged column, or a [`SchemaError::Conflict`].
    fn merge_column(&self, existing: &Column, incoming: &Column) -> Result<Column, SchemaError>;
}

/// The strictest promotion rule: exact type match, nullability widening only.
///
/// A column that is nullable on either side is nullable in the merge result.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictWidening;

impl MergePolicy for StrictWidening {
    fn merge_column(&self, existing: &Column, incoming: &Column) -> Result<Column, SchemaError> {
        ensure!(
            existing.data_type == incoming.data_type,
            ConflictSnafu {
                column: existing.name.clone(),
                existing: existing.data_type,
                incoming: incoming.data_type,
            }
        );
        Ok(Column {
            name: existing.name.clone(),
            data_type: existing.data_type,
            nullable: existing.nullable || incoming.nullable,
        })
    }
}
