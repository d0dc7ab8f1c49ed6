//! A reference [`Wallet`] that seals credentials with [`SealedCredential`].

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use consentflow_core::{Credential, CredentialUri, Did, RecipientSet, ShareUri};
use consentflow_store::{RemoteError, Result, Wallet};

use crate::blobs::BlobStore;
use crate::directory::KeyDirectory;
use crate::error::EnvelopeError;
use crate::keys::AgreementSecret;
use crate::sealed::{content_address, SealedCredential};

/// A wallet holding plaintext credentials for one identity.
///
/// Every upload is sealed to the requested recipients plus the holder, so
/// the holder can always read back what it shared.
pub struct EnvelopeWallet {
    identity: Did,
    secret: AgreementSecret,
    directory: Arc<KeyDirectory>,
    blobs: Arc<dyn BlobStore>,
    credentials: RwLock<HashMap<CredentialUri, Credential>>,
}

impl EnvelopeWallet {
    /// Create a wallet and publish its agreement key to `directory`.
    pub fn new(
        identity: Did,
        secret: AgreementSecret,
        directory: Arc<KeyDirectory>,
        blobs: Arc<dyn BlobStore>,
    ) -> std::result::Result<Self, EnvelopeError> {
        directory.register(identity.clone(), secret.public_key())?;
        Ok(Self {
            identity,
            secret,
            directory,
            blobs,
            credentials: RwLock::new(HashMap::new()),
        })
    }

    /// Put a plaintext credential into the wallet.
    pub fn hold(&self, credential: Credential) -> Result<()> {
        let mut credentials = self
            .credentials
            .write()
            .map_err(|_| RemoteError::Unavailable("wallet lock poisoned".into()))?;
        credentials.insert(credential.uri.clone(), credential);
        Ok(())
    }

    /// Download and decrypt a share addressed to this wallet's identity.
    pub async fn open_share(&self, share: &ShareUri) -> Result<Credential> {
        let bytes = self
            .blobs
            .get(share)
            .await?
            .ok_or_else(|| RemoteError::NotFound(share.to_string()))?;

        let sealed = SealedCredential::from_bytes(&bytes)?;
        let plaintext = sealed.open(&self.identity, &self.secret)?;
        Ok(Credential::from_bytes(share.as_str(), &plaintext)?)
    }

    fn sealing_order<'a>(&'a self, recipients: &'a RecipientSet) -> Vec<&'a Did> {
        let mut dids: Vec<&Did> = recipients.iter().collect();
        if !recipients.contains(&self.identity) {
            dids.push(&self.identity);
        }
        dids
    }
}

#[async_trait]
impl Wallet for EnvelopeWallet {
    async fn read_credential(&self, uri: &CredentialUri) -> Result<Option<Credential>> {
        let credentials = self
            .credentials
            .read()
            .map_err(|_| RemoteError::Unavailable("wallet lock poisoned".into()))?;
        Ok(credentials.get(uri).cloned())
    }

    async fn encrypt_and_upload(
        &self,
        credential: &Credential,
        recipients: &RecipientSet,
    ) -> Result<ShareUri> {
        if recipients.is_empty() {
            return Err(RemoteError::EmptyRecipients);
        }

        let keys = self.directory.resolve_all(self.sealing_order(recipients))?;
        let plaintext = credential.to_bytes()?;
        let bytes = SealedCredential::seal(&plaintext, &keys)?.to_bytes()?;

        let share = content_address(&bytes);
        self.blobs.put(&share, bytes).await?;

        tracing::debug!(
            credential = %credential.uri,
            share = %share,
            recipients = keys.len(),
            "uploaded sealed credential"
        );
        Ok(share)
    }

    fn current_identity(&self) -> Did {
        self.identity.clone()
    }
}
