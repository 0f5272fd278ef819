//! Error types shared across glypho crates

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, GlyphoError>;

/// Main error type for the common crate
#[derive(Error, Debug)]
pub enum GlyphoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Compression error for {path}: {source}")]
    Compression {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown taxonomic rank: {0}")]
    UnknownRank(String),
}

impl GlyphoError {
    /// Wrap an I/O error raised while (de)compressing `path`
    pub fn compression(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Compression {
            path: path.into(),
            source,
        }
    }
}
