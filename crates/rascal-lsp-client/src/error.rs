//! Error types for the client bridge

use rascal_process::ProcessError;
use thiserror::Error;

/// Errors raised while connecting to, starting, or talking to a language server
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The development socket could not be attached within the retry budget
    #[error("Connection retries exceeded after {attempts} attempts{}", last_error.as_deref().map(|e| format!(": {}", e)).unwrap_or_default())]
    ConnectionExhausted {
        attempts: u32,
        last_error: Option<String>,
    },

    /// The server process failed to spawn or never became ready
    #[error("Session '{language}' failed to start: {reason}")]
    SessionStartupFailure { language: String, reason: String },

    /// An RPC call was rejected, timed out, or lost with its connection
    #[error("Request '{method}' failed: {reason}")]
    RequestFailure { method: String, reason: String },

    /// No Java executable could be located to launch a server or terminal
    #[error("Java executable not found: {0}")]
    ExecutableNotFound(String),

    /// The session an operation depends on never started
    #[error("Session '{0}' is not available")]
    SessionUnavailable(String),

    /// Malformed traffic on the wire
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The editor host rejected an operation
    #[error("Editor host error: {0}")]
    Host(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Process management error
    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl BridgeError {
    /// Build a [`BridgeError::RequestFailure`]
    pub fn request_failure(method: impl Into<String>, reason: impl Into<String>) -> Self {
        BridgeError::RequestFailure {
            method: method.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`BridgeError::SessionStartupFailure`]
    pub fn startup_failure(language: impl Into<String>, reason: impl ToString) -> Self {
        BridgeError::SessionStartupFailure {
            language: language.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error is fatal for the whole extension
    pub fn is_fatal(&self) -> bool {
        matches!(self, BridgeError::ExecutableNotFound(_))
    }
}

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
