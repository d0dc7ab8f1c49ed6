//! Error types for resolution and materialization.

use thiserror::Error;

use consentflow_core::Did;
use consentflow_store::RemoteError;

/// Errors that can occur while resolving a share.
#[derive(Debug, Error)]
pub enum ShareError {
    /// The credential has no index record, or the wallet does not hold it.
    #[error("not found: {0}")]
    NotFound(String),

    /// The recipient set for the grantee filtered down to nothing.
    #[error("no valid recipients for grantee {0:?}")]
    InvalidRecipients(Did),

    /// The consent draft is structurally invalid.
    #[error("invalid draft: {0}")]
    InvalidDraft(String),

    /// A collaborator call failed.
    #[error("remote failure: {0}")]
    Remote(#[from] RemoteError),
}

/// Result type for share operations.
pub type Result<T> = std::result::Result<T, ShareError>;
