//! Error Types
//!
//! Every failure the engine can observe is modelled here. The recalculation
//! driver absorbs extraction and evaluation failures into default values, but
//! they travel as explicit `Result`s up to that point so they can be logged
//! and counted.

use thiserror::Error;

/// A malformed or out-of-bounds A1 address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("empty address")]
    Empty,

    #[error("malformed address `{0}`")]
    Malformed(String),

    #[error("column {0} is outside 1..={max}", max = crate::address::MAX_COLUMN)]
    ColumnOutOfBounds(u64),

    #[error("row {0} is outside 1..={max}", max = crate::address::MAX_ROW)]
    RowOutOfBounds(u64),
}

/// Failure reported by a [`ReferenceExtractor`](crate::interface::ReferenceExtractor).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractError {
    #[error("parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },

    #[error("{0}")]
    Other(String),
}

/// Failure reported by a [`FormulaEvaluator`](crate::interface::FormulaEvaluator).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },

    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    #[error("{name} expects {expected} argument(s), got {got}")]
    Arity {
        name: &'static str,
        expected: &'static str,
        got: usize,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("cannot use {found} where {expected} is expected")]
    Type {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{0}")]
    Other(String),
}

impl From<ExtractError> for EvalError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::Parse { offset, message } => EvalError::Parse { offset, message },
            ExtractError::Other(message) => EvalError::Other(message),
        }
    }
}

/// Failure reading or writing a serialized workbook snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
}
