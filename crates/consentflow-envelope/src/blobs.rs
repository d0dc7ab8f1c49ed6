//! Storage for uploaded sealed credentials.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use consentflow_core::ShareUri;
use consentflow_store::{RemoteError, Result};

/// Content-addressed blob storage the wallet uploads to.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `uri`. Storing the same uri twice is a no-op.
    async fn put(&self, uri: &ShareUri, bytes: Vec<u8>) -> Result<()>;

    /// Fetch the bytes stored under `uri`.
    async fn get(&self, uri: &ShareUri) -> Result<Option<Vec<u8>>>;
}

/// In-memory blob store for tests and local development.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<ShareUri, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, uri: &ShareUri, bytes: Vec<u8>) -> Result<()> {
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| RemoteError::Unavailable("blob store lock poisoned".into()))?;
        blobs.entry(uri.clone()).or_insert(bytes);
        Ok(())
    }

    async fn get(&self, uri: &ShareUri) -> Result<Option<Vec<u8>>> {
        let blobs = self
            .blobs
            .read()
            .map_err(|_| RemoteError::Unavailable("blob store lock poisoned".into()))?;
        Ok(blobs.get(uri).cloned())
    }
}
