//! Error types for collaborator calls.

use thiserror::Error;

/// Errors reported by the wallet or the registry.
///
/// Every variant is a remote failure from the engine's point of view: fatal
/// to the single resolution that hit it, never fatal to a batch.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The collaborator could not be reached or failed internally.
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    /// The collaborator refused the request.
    #[error("remote rejected request: {0}")]
    Rejected(String),

    /// The addressed record, terms, or contract does not exist remotely.
    #[error("remote object not found: {0}")]
    NotFound(String),

    /// Encryption was requested with no recipients.
    #[error("cannot encrypt for an empty recipient set")]
    EmptyRecipients,

    /// Payload could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<consentflow_core::CoreError> for RemoteError {
    fn from(e: consentflow_core::CoreError) -> Self {
        RemoteError::Serialization(e.to_string())
    }
}

/// Result type for collaborator calls.
pub type Result<T> = std::result::Result<T, RemoteError>;
