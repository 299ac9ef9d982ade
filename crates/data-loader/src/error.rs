//! Error types for the data-loader crate.
//!
//! Every variant here is fatal for a batch run: a dataset that cannot be
//! read or parsed aborts the pipeline before any model is trained.
//! Rows that merely fail to join (unmappable or uncategorized items) are
//! not errors; they are counted in [`crate::PrepareReport`] instead.

use thiserror::Error;

/// Errors that can occur during data loading and parsing
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// File could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The CSV reader rejected a record (wrong field count, bad quoting, bad number)
    #[error("Malformed record in {file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },

    /// A required column is missing from a header row
    #[error("Missing column {column} in {file}")]
    MissingColumn { file: String, column: String },

    /// A data field had an invalid value
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// Data validation failed
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataLoadError>;
