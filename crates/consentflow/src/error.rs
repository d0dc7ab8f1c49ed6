//! Error types for the engine.

use thiserror::Error;

use consentflow_core::CoreError;
use consentflow_envelope::EnvelopeError;
use consentflow_share::ShareError;
use consentflow_store::RemoteError;
use consentflow_sync::SyncError;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid identifier or encoding.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// A wallet or registry call failed.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Sealing or opening a credential failed.
    #[error("envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    /// Resolution or materialization failed.
    #[error("share error: {0}")]
    Share(#[from] ShareError),

    /// A grant resync was abandoned.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// The configuration could not be parsed or names an invalid identity.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
