//! Collaborator error types.

use thiserror::Error;

/// Errors from terminal-control operations.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// The terminal program could not be started
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The terminal program ran but reported failure
    #[error("{command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// Invalid terminal session ID
    #[error("invalid terminal id: {0:?}")]
    InvalidTerminalId(String),
}

/// Errors from the notification collaborator.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Failed { program: String, status: String },
}
