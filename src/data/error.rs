use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the data pipeline. All of them propagate to the caller;
/// the UI decides whether to show a warning or an empty state.
#[derive(Debug, Error)]
pub enum DataError {
    /// The source file does not exist.
    #[error("data source not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The source exists but could not be read.
    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source exists but cannot be parsed into a rectangular table.
    #[error("malformed data source: {0}")]
    Format(String),

    /// An expected column is absent or has the wrong type.
    #[error("schema mismatch: {0}")]
    Schema(String),

    /// An asset filename does not follow the expected naming convention.
    #[error("asset name does not follow the naming convention: {0}")]
    NamingConvention(String),
}
