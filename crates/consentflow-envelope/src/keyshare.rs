//! Per-recipient wrapping of a content key.
//!
//! A sealed credential is encrypted once under a random content key. Each
//! recipient gets a [`RecipientShare`]: the content key wrapped under a key
//! derived from an X25519 agreement between a fresh ephemeral key and the
//! recipient's agreement key, bound to the recipient's DID.

use serde::{Deserialize, Serialize};

use consentflow_core::Did;

use crate::error::{EnvelopeError, Result};
use crate::keys::{AgreementPublicKey, AgreementSecret, ContentKey, EphemeralKey, SealNonce};

/// The content key of one sealed credential, wrapped for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientShare {
    pub recipient: Did,
    pub ephemeral_public: AgreementPublicKey,
    pub wrapped_key: Vec<u8>,
    pub nonce: SealNonce,
}

impl RecipientShare {
    /// Wrap `content_key` for `recipient`, whose agreement key is `recipient_public`.
    pub fn wrap(
        recipient: Did,
        content_key: &ContentKey,
        recipient_public: &AgreementPublicKey,
    ) -> Result<Self> {
        let ephemeral = EphemeralKey::generate();
        let ephemeral_public = ephemeral.public_key();
        let wrap_key = ephemeral
            .agree(recipient_public)
            .wrap_key(recipient.as_str());

        let nonce = SealNonce::generate();
        let wrapped_key = wrap_key.encrypt(content_key.as_bytes(), &nonce)?;

        Ok(Self {
            recipient,
            ephemeral_public,
            wrapped_key,
            nonce,
        })
    }

    /// Recover the content key with the recipient's agreement secret.
    pub fn unwrap_key(&self, secret: &AgreementSecret) -> Result<ContentKey> {
        let wrap_key = secret
            .agree(&self.ephemeral_public)
            .wrap_key(self.recipient.as_str());
        let bytes = wrap_key.decrypt(&self.wrapped_key, &self.nonce)?;

        let key: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            EnvelopeError::DecryptionError(format!(
                "invalid key length: expected 32, got {}",
                bytes.len()
            ))
        })?;
        Ok(ContentKey::from_bytes(key))
    }
}
