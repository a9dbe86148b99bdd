//! Error types for the movie graph ETL run
//!
//! Each stage of the run owns its error enum, and [`EtlError`] wraps them so a
//! whole run can be driven with a single `?`.
//!
//! # Error Categories
//!
//! - **LoadError**: missing input files, unresolvable join keys, unreadable CSV
//! - **TransformError**: nested entries that violate the data contract
//! - **ExportError**: failures writing the output files
//!
//! Malformed embedded-collection cells are not errors: the loader degrades them
//! to empty lists and reports a warning instead.
//!
//! # Examples
//!
//! ```rust
//! use movie_graph::errors::{EtlError, LoadError};
//!
//! let err: EtlError = LoadError::SourceNotFound {
//!     path: "data/raw/tmdb_5000_movies.csv".into(),
//! }
//! .into();
//!
//! assert!(err.is_not_found());
//! assert_eq!(err.error_code(), "SOURCE_NOT_FOUND");
//! ```

pub mod export;
pub mod load;
pub mod transform;

use thiserror::Error;

pub use export::ExportError;
pub use load::LoadError;
pub use transform::TransformError;

/// Result type alias for loader operations
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type alias for transformer operations
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type alias for writer operations
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type alias for a complete run
pub type EtlResult<T> = Result<T, EtlError>;

/// Any failure that aborts a run
#[derive(Error, Debug)]
pub enum EtlError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

impl EtlError {
    /// Check if the run failed because an input file is absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, EtlError::Load(e) if e.is_not_found())
    }

    /// Check if the run failed because the inputs have an unusable shape
    pub fn is_schema_error(&self) -> bool {
        matches!(self, EtlError::Load(e) if e.is_schema_error())
    }

    /// Check if the run failed on a nested entry violating the data contract
    pub fn is_data_contract_error(&self) -> bool {
        matches!(self, EtlError::Transform(_))
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            EtlError::Load(e) => e.error_code(),
            EtlError::Transform(e) => e.error_code(),
            EtlError::Export(e) => e.error_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_result_alias() {
        let result: LoadResult<()> = Err(LoadError::Schema("no id column".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_transform_result_alias() {
        let result: TransformResult<()> = Err(TransformError::FieldMissing {
            row: 0,
            movie_id: 1,
            collection: "cast",
            field: "character",
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_etl_error_categories() {
        let err: EtlError = LoadError::SourceNotFound {
            path: "missing.csv".into(),
        }
        .into();
        assert!(err.is_not_found());
        assert!(!err.is_schema_error());
        assert!(!err.is_data_contract_error());

        let err: EtlError = LoadError::Schema("credits has no id".to_string()).into();
        assert!(err.is_schema_error());
        assert_eq!(err.error_code(), "SCHEMA_ERROR");

        let err: EtlError = TransformError::FieldMissing {
            row: 3,
            movie_id: 19995,
            collection: "crew",
            field: "job",
        }
        .into();
        assert!(err.is_data_contract_error());
        assert_eq!(err.error_code(), "FIELD_MISSING");
    }

    #[test]
    fn test_etl_error_display_is_transparent() {
        let err: EtlError = LoadError::Schema("credits has no id".to_string()).into();
        assert_eq!(err.to_string(), "Schema error: credits has no id");
    }
}
