//! Error types for the data-loader crate.

use thiserror::Error;

/// Errors that can occur while loading rating, title, or content tables.
///
/// Row-level problems are deliberately NOT represented here: a malformed
/// row is skipped by the loaders and never aborts the batch. Only
/// file-level failures (missing file, unusable header) surface as errors.
#[derive(Error, Debug)]
pub enum DataError {
    /// File could not be found or opened
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading a file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The file has no header row to resolve column positions from
    #[error("Missing header row in {path}")]
    MissingHeader { path: String },

    /// The header row matches neither of the accepted naming conventions
    #[error("Unrecognized header in {path}: expected {expected}, found \"{found}\"")]
    UnknownHeader {
        path: String,
        expected: &'static str,
        found: String,
    },

    /// Every rating row was filtered out before training could start
    #[error("No ratings available after filtering")]
    NoRatings,
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataError>;
