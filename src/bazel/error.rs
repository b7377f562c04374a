//! Bazel error types.

use crate::build_info::BuildInfoError;
use crate::command::CommandError;

/// The Bazel binary cannot be used.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BazelNotFoundError {
    /// No binary path configured.
    #[error("Path to the Bazel binary is not set, please set it")]
    NotSet,

    /// Configured path is missing or not executable.
    #[error("Path to Bazel is wrong (does not point to a binary), please set it")]
    NotExecutable,

    /// Version is unparsable or older than supported.
    #[error(
        "Bazel version ({0}) is unsupported (too old or development version), please update your Bazel binary"
    )]
    TooOld(String),
}

/// Errors that can occur while talking to Bazel.
#[derive(thiserror::Error, Debug)]
pub enum BazelError {
    /// The Bazel binary is unusable.
    #[error(transparent)]
    NotFound(#[from] BazelNotFoundError),

    /// Running a command failed.
    #[error("Command failed: {0}")]
    Command(#[from] CommandError),

    /// A build metadata artifact could not be decoded.
    #[error("Build metadata error: {0}")]
    BuildInfo(#[from] BuildInfoError),
}

/// Coarse classification of a [`BazelError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotConfigured,
    NotExecutable,
    TooOld,
    Io,
    StateFault,
    MalformedMetadata,
}

impl BazelError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(BazelNotFoundError::NotSet) => ErrorKind::NotConfigured,
            Self::NotFound(BazelNotFoundError::NotExecutable) => ErrorKind::NotExecutable,
            Self::NotFound(BazelNotFoundError::TooOld(_)) => ErrorKind::TooOld,
            Self::Command(e) if e.is_state_fault() => ErrorKind::StateFault,
            Self::Command(_) => ErrorKind::Io,
            Self::BuildInfo(_) => ErrorKind::MalformedMetadata,
        }
    }
}
