//! Error types for the sync module.

use thiserror::Error;

use consentflow_share::ShareError;
use consentflow_store::RemoteError;

/// Errors that abort a single grant's resync.
///
/// [`GrantSynchronizer::sync_new_credential`](crate::GrantSynchronizer::sync_new_credential)
/// never fails; its per-grant failures are recorded in the report instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Loading the index through the resolver failed.
    #[error("share error: {0}")]
    Share(#[from] ShareError),

    /// A registry call failed.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
