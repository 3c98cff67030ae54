//! Error types for process management

use std::io;
use thiserror::Error;

/// Process management errors
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Failed to spawn process
    #[error("Failed to spawn process: {0}")]
    SpawnFailed(#[from] io::Error),

    /// Process timed out
    #[error("Process timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// Process exited while it was still expected to run
    #[error("Process {pid} exited unexpectedly: {status}")]
    ExitedEarly { pid: u32, status: String },

    /// Failed to kill process
    #[error("Failed to kill process: {0}")]
    KillFailed(String),

    /// Invalid configuration
    #[error("Invalid process configuration: {0}")]
    InvalidConfig(String),
}

impl ProcessError {
    /// Whether the spawn failed because the executable does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProcessError::SpawnFailed(e) if e.kind() == io::ErrorKind::NotFound)
    }
}

/// Result type for process operations
pub type Result<T> = std::result::Result<T, ProcessError>;
