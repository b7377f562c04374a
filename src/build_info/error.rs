//! Build metadata error types.

use std::path::PathBuf;

/// Errors that can occur while decoding build metadata artifacts.
#[derive(thiserror::Error, Debug)]
pub enum BuildInfoError {
    /// Metadata file could not be read.
    #[error("Failed to read build metadata {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Metadata file is not a valid record.
    #[error("Malformed build metadata {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl BuildInfoError {
    /// Path of the offending artifact.
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } => path,
        }
    }
}
