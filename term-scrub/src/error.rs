//! Error types for term-scrub.
//!
//! Only file-level and run-level failures are errors. Defects found in
//! individual rows (missing values, outliers, duplicates, malformed emails,
//! uncoercible booleans) never surface here: they are excluded or coerced by
//! the cleaner and counted in the run report.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// The main error type for term-scrub.
#[derive(Error, Debug)]
pub enum ScrubError {
    /// The source file could not be opened or read.
    #[error("Source unavailable: {path}: {source}")]
    SourceUnavailable {
        /// Path of the source file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The source file was opened but its footer or a batch could not be decoded.
    #[error("Source corrupt: {path}: {message}")]
    SourceCorrupt {
        /// Path of the source file
        path: PathBuf,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The source file does not carry the required columns.
    #[error("Schema mismatch in {path}: missing columns [{}]", .missing.join(", "))]
    SchemaMismatch {
        /// Path of the source file
        path: PathBuf,
        /// Required columns that were not found
        missing: Vec<String>,
    },

    /// A required column is stored in a type the rules cannot read.
    #[error("Unsupported type in {path}: column '{column}' is {data_type}")]
    ColumnType {
        /// Path of the source file
        path: PathBuf,
        /// Offending column
        column: String,
        /// Physical type found in the file
        data_type: String,
    },

    /// A batch handed to the scanner or cleaner lacks a required column.
    #[error("Column '{column}' not found in batch")]
    ColumnNotFound { column: String },

    /// A cleaned batch could not be persisted.
    #[error("Failed to write {path}: {message}")]
    Write {
        /// Destination of the artifact
        path: PathBuf,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from Parquet operations.
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, ScrubError>`.
pub type Result<T> = std::result::Result<T, ScrubError>;

impl ScrubError {
    /// Creates a source unavailable error for `path`.
    pub fn source_unavailable(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::SourceUnavailable {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Creates a source corrupt error without an underlying cause.
    pub fn source_corrupt(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::SourceCorrupt {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a source corrupt error with an underlying cause.
    pub fn source_corrupt_with_source(
        path: impl AsRef<Path>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::SourceCorrupt {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a write error with an underlying cause.
    pub fn write_with_source(
        path: impl AsRef<Path>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Write {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Returns true if the error is scoped to a single source file.
    ///
    /// File-scoped errors are the ones a `FailurePolicy::SkipFile` run
    /// recovers from; everything else aborts the run.
    pub fn is_file_scoped(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. }
                | Self::SourceCorrupt { .. }
                | Self::SchemaMismatch { .. }
                | Self::ColumnType { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_source_unavailable_keeps_io_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "No such file");
        let err = ScrubError::source_unavailable("data/part-0003.parquet", io);

        assert!(err.to_string().contains("part-0003.parquet"));
        assert!(err.source().is_some());
        assert!(err.is_file_scoped());
    }

    #[test]
    fn test_source_corrupt_message() {
        let err = ScrubError::source_corrupt("a.parquet", "bad footer");
        assert_eq!(err.to_string(), "Source corrupt: a.parquet: bad footer");
        assert!(err.is_file_scoped());
    }

    #[test]
    fn test_schema_mismatch_lists_columns() {
        let err = ScrubError::SchemaMismatch {
            path: PathBuf::from("x.parquet"),
            missing: vec!["email".to_string(), "age".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Schema mismatch in x.parquet: missing columns [email, age]"
        );
    }

    #[test]
    fn test_configuration_is_not_file_scoped() {
        let err = ScrubError::Configuration("batch_size must be positive".to_string());
        assert!(!err.is_file_scoped());
    }

    #[test]
    fn test_column_type_is_file_scoped() {
        let err = ScrubError::ColumnType {
            path: PathBuf::from("x.parquet"),
            column: "age".to_string(),
            data_type: "Binary".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unsupported type in x.parquet: column 'age' is Binary"
        );
        assert!(err.is_file_scoped());
    }
}
