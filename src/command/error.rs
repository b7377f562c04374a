//! Command error types.

/// Errors that can occur while building or running a command.
#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    /// The command line has no program to run.
    #[error("Command has no program to run")]
    EmptyCommand,

    /// `run` was called on a command that already ran.
    #[error("Command has already been executed")]
    AlreadyExecuted,

    /// `close` was called on a stream that is already closed.
    #[error("Stream is already closed")]
    StreamClosed,

    /// The process could not be started.
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CommandError {
    /// Whether this error reports misuse of a single-use object.
    #[must_use]
    pub fn is_state_fault(&self) -> bool {
        matches!(self, Self::AlreadyExecuted | Self::StreamClosed)
    }
}
