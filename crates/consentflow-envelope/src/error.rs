//! Error types for the envelope module.

use thiserror::Error;

use consentflow_core::Did;
use consentflow_store::RemoteError;

/// Errors that can occur while sealing or opening credentials.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// A sealed credential needs at least one recipient.
    #[error("no recipients")]
    NoRecipients,

    /// No key agreement key is known for a recipient.
    #[error("no key known for {0}")]
    UnknownRecipient(Did),

    /// The identity is not among the recipients of a sealed credential.
    #[error("{0} is not a recipient")]
    NotARecipient(Did),

    /// Encryption error.
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// Decryption error.
    #[error("decryption error: {0}")]
    DecryptionError(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Shared state could not be accessed.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Blob missing from storage.
    #[error("blob not found: {0}")]
    BlobNotFound(String),

    /// Core error.
    #[error("core error: {0}")]
    CoreError(#[from] consentflow_core::CoreError),
}

impl From<EnvelopeError> for RemoteError {
    fn from(e: EnvelopeError) -> Self {
        match e {
            EnvelopeError::NoRecipients => RemoteError::EmptyRecipients,
            EnvelopeError::BlobNotFound(uri) => RemoteError::NotFound(uri),
            EnvelopeError::Unavailable(msg) => RemoteError::Unavailable(msg),
            EnvelopeError::SerializationError(msg) => RemoteError::Serialization(msg),
            EnvelopeError::CoreError(e) => RemoteError::Serialization(e.to_string()),
            other => RemoteError::Rejected(other.to_string()),
        }
    }
}

/// Result type for envelope operations.
pub type Result<T> = std::result::Result<T, EnvelopeError>;
