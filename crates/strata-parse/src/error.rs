//! Error types for strata-parse.

use std::path::PathBuf;

/// Errors raised while dispatching or parsing a single file.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No parser is registered for the file extension.
    #[error("unsupported file extension {extension:?} for {path}")]
    UnsupportedExtension { path: PathBuf, extension: String },
}

/// Result type alias using `ParseError`.
pub type Result<T> = std::result::Result<T, ParseError>;
