//! Schema and dataset error types.

use thiserror::Error;

use crate::{DataType, Schema};

/// Result type for schema and dataset operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while building schemas, deriving them, or constructing
/// datasets that must conform to them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// A column name appears more than once.
    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    /// A referenced column does not exist.
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    /// A type tag could not be parsed.
    #[error("unknown data type '{0}'")]
    UnknownType(String),

    /// A schema or derivation expression is malformed.
    #[error("invalid expression '{expression}': {reason}")]
    InvalidExpression {
        /// The offending expression.
        expression: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A derivation both keeps and drops the same column.
    #[error("column '{0}' is both kept and dropped")]
    ConflictingDirective(String),

    /// A row has the wrong number of values.
    #[error("row {row} has {actual} values, schema has {expected} columns")]
    ArityMismatch {
        /// Row position.
        row: usize,
        /// Number of columns in the schema.
        expected: usize,
        /// Number of values in the row.
        actual: usize,
    },

    /// A value does not match its column type.
    #[error("row {row}, column '{column}': expected {expected}, found {found}")]
    ValueType {
        /// Row position.
        row: usize,
        /// Column name.
        column: String,
        /// Declared column type.
        expected: DataType,
        /// Rendering of the rejected value.
        found: String,
    },

    /// Two schemas disagree on the type of a shared column.
    #[error("column '{column}' has type {expected} on one side and {actual} on the other")]
    TypeConflict {
        /// Column name.
        column: String,
        /// Type on the reference side.
        expected: DataType,
        /// Type on the other side.
        actual: DataType,
    },

    /// A dataset does not carry the schema it was required to have.
    #[error("schema mismatch: expected [{expected}], found [{actual}]")]
    Mismatch {
        /// The required schema.
        expected: Schema,
        /// The schema actually found.
        actual: Schema,
    },

    /// A JSON row could not be converted.
    #[error("row {row} is not a JSON object")]
    NotAnObject {
        /// Row position.
        row: usize,
    },

    /// Partitioning was declared without any key.
    #[error("partitioning requires at least one key")]
    EmptyPartitioning,
}
