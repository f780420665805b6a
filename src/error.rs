//! Error types for the client and sync layers.

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur when talking to the remote content API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network/transport error (connection failure, timeout, malformed response).
    #[error("network error: {0}")]
    Network(String),

    /// The remote answered with a status outside the accepted set.
    /// A stale-version update rejection surfaces here as well.
    #[error("unexpected status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    /// A lookup yielded no match where one was required.
    #[error("not found: {0}")]
    NotFound(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local I/O error (attachment staging).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error (missing environment variable or credential).
    #[error("configuration error: {0}")]
    Config(String),

    /// A post-copy transformation step failed. The copied page is left in
    /// place; copy is not transactional across body-copy and transformation.
    #[error("transformation failed: {0}")]
    Transform(String),
}
