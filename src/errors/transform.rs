//! Transformer error types
//!
//! Rows reaching the transformer are well-typed at the column level, but the
//! nested entries inside embedded collections come straight from the source
//! file. A nested entry that breaks the contract aborts the run.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    /// A nested entry lacks a key the transformer needs
    #[error("Row {row} (movie {movie_id}): {collection} entry is missing field '{field}'")]
    FieldMissing {
        row: usize,
        movie_id: i64,
        collection: &'static str,
        field: &'static str,
    },

    /// A nested entry holds a value that cannot be read as the expected type
    #[error("Row {row} (movie {movie_id}): {collection} entry has invalid field '{field}': {reason}")]
    InvalidField {
        row: usize,
        movie_id: i64,
        collection: &'static str,
        field: &'static str,
        reason: String,
    },
}

impl TransformError {
    pub fn field(&self) -> &'static str {
        match self {
            TransformError::FieldMissing { field, .. } => field,
            TransformError::InvalidField { field, .. } => field,
        }
    }

    pub fn row(&self) -> usize {
        match self {
            TransformError::FieldMissing { row, .. } => *row,
            TransformError::InvalidField { row, .. } => *row,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            TransformError::FieldMissing { .. } => "FIELD_MISSING",
            TransformError::InvalidField { .. } => "INVALID_FIELD",
        }
    }
}
