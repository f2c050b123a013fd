//! Error types for Parley
//!
//! This module defines the error taxonomy used by the synchronization core
//! and the CLI, using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Parley operations
///
/// Failures fall into three families: authentication failures, transport
/// failures, and malformed responses. Malformed responses are handled exactly
/// like transport failures by every component.
#[derive(Error, Debug)]
pub enum ParleyError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid credentials, or a missing/expired session cookie
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Network unreachable, timeout, or connection reset
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body could not be decoded into the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Service answered with a non-success HTTP status
    #[error("Service returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// Service answered 2xx but reported an error in the body
    #[error("Service error: {0}")]
    Remote(String),

    /// A conversation operation was attempted before a session was active
    #[error("No active session")]
    NoActiveSession,

    /// A session id that the directory does not list
    #[error("Unknown session: {0}")]
    UnknownSession(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ParleyError {
    /// Returns true for failures that leave the remote state unknown
    ///
    /// Transport failures and malformed responses are treated identically.
    pub fn is_transport_like(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::MalformedResponse(_) | Self::Http(_)
        )
    }
}

/// Result type alias for Parley operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
