//! Loader error types
//!
//! Structural failures that stop a run before any row is transformed. Per-cell
//! problems (unparseable embedded collections, bad numeric cells) and absent
//! scalar columns are absorbed by the loader and never show up here.

use std::path::PathBuf;
use thiserror::Error;

/// Loader errors
#[derive(Error, Debug)]
pub enum LoadError {
    /// A required input file does not exist
    #[error("Source file not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    /// The join key cannot be resolved, or a column needed for correctness is absent
    #[error("Schema error: {0}")]
    Schema(String),

    /// A join key cell does not hold an integer identifier
    #[error("Invalid join key {value:?} in {source_name} row {row}")]
    InvalidJoinKey {
        source_name: String,
        row: usize,
        value: String,
    },

    /// CSV parsing error
    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LoadError::SourceNotFound { .. })
    }

    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            LoadError::Schema(_) | LoadError::InvalidJoinKey { .. }
        )
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            LoadError::SourceNotFound { .. } => "SOURCE_NOT_FOUND",
            LoadError::Schema(_) => "SCHEMA_ERROR",
            LoadError::InvalidJoinKey { .. } => "INVALID_JOIN_KEY",
            LoadError::Csv { .. } => "CSV_ERROR",
            LoadError::Io(_) => "IO_ERROR",
        }
    }
}
