//! Client error types.

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the CLI client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Failed to connect to the daemon.
    #[error("connection error: {0}")]
    Connection(String),

    /// Operation timed out.
    #[error("timeout while {0}")]
    Timeout(String),

    /// Protocol-level failure (framing, serialization).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The daemon answered with a structured error.
    #[error("daemon error ({code}): {message}")]
    Daemon { code: String, message: String },

    /// Configuration problem.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid command-line argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Daemon-side startup failure when running `serve`.
    #[error("server error: {0}")]
    Server(#[from] praxisync_server::ServerError),

    /// Store failure when running `serve`.
    #[error("store error: {0}")]
    Store(#[from] praxisync_engine::StoreError),
}

impl ClientError {
    /// Creates a daemon error from a protocol error response.
    pub fn daemon(response: praxisync_protocol::ErrorResponse) -> Self {
        Self::Daemon {
            code: format!("{:?}", response.code),
            message: response.message,
        }
    }
}
