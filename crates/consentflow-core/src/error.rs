//! Error types for Consentflow Core.

use thiserror::Error;

/// Errors raised while building or checking core values.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid DID: {0:?}")]
    InvalidDid(String),

    #[error("category name must not be empty")]
    EmptyCategory,

    #[error("invalid draft: {0}")]
    InvalidDraft(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
