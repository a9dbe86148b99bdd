//! Writer error types

use std::path::PathBuf;
use thiserror::Error;

/// Failures writing output files. Any of these aborts the run.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The output directory or a file in it could not be created or flushed
    #[error("IO error writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be serialized
    #[error("CSV error writing {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl ExportError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ExportError::Io { path, .. } => path,
            ExportError::Csv { path, .. } => path,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ExportError::Io { .. } => "IO_ERROR",
            ExportError::Csv { .. } => "CSV_ERROR",
        }
    }
}
