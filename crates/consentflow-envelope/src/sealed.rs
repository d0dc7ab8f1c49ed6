//! Sealed credentials.
//!
//! A [`SealedCredential`] carries the encrypted credential document plus
//! one [`RecipientShare`] per identity allowed to open it. Its CBOR
//! encoding is what gets uploaded, and the blake3 hash of that encoding
//! is its share reference.

use serde::{Deserialize, Serialize};

use consentflow_core::{Did, ShareUri};

use crate::error::{EnvelopeError, Result};
use crate::keys::{AgreementPublicKey, AgreementSecret, ContentKey, SealNonce};
use crate::keyshare::RecipientShare;

/// Prefix of every share reference produced by this crate.
pub const SHARE_URI_PREFIX: &str = "lc:net:enc:";

/// Format identifier for sealed credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SealFormat {
    /// ChaCha20-Poly1305 content, X25519 + blake3 key wrapping.
    ChaCha20Poly1305X25519 = 1,
}

/// An encrypted credential readable by a fixed set of recipients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedCredential {
    pub format: SealFormat,
    pub nonce: SealNonce,
    /// Includes the authentication tag.
    pub ciphertext: Vec<u8>,
    pub recipients: Vec<RecipientShare>,
}

impl SealedCredential {
    /// Encrypt `plaintext` for every `(did, key)` in `recipients`.
    pub fn seal(plaintext: &[u8], recipients: &[(Did, AgreementPublicKey)]) -> Result<Self> {
        if recipients.is_empty() {
            return Err(EnvelopeError::NoRecipients);
        }

        let content_key = ContentKey::generate();
        let nonce = SealNonce::generate();
        let ciphertext = content_key.encrypt(plaintext, &nonce)?;

        let recipients = recipients
            .iter()
            .map(|(did, public)| RecipientShare::wrap(did.clone(), &content_key, public))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            format: SealFormat::ChaCha20Poly1305X25519,
            nonce,
            ciphertext,
            recipients,
        })
    }

    /// Decrypt as `identity` using its agreement secret.
    pub fn open(&self, identity: &Did, secret: &AgreementSecret) -> Result<Vec<u8>> {
        let share = self
            .recipients
            .iter()
            .find(|s| &s.recipient == identity)
            .ok_or_else(|| EnvelopeError::NotARecipient(identity.clone()))?;

        match self.format {
            SealFormat::ChaCha20Poly1305X25519 => {
                let content_key = share.unwrap_key(secret)?;
                content_key.decrypt(&self.ciphertext, &self.nonce)
            }
        }
    }

    /// Identities that can open this credential, in sealing order.
    pub fn recipient_dids(&self) -> impl Iterator<Item = &Did> {
        self.recipients.iter().map(|s| &s.recipient)
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| EnvelopeError::SerializationError(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| EnvelopeError::SerializationError(e.to_string()))
    }
}

/// Share reference of an uploaded artifact: prefix plus hex blake3 of its bytes.
pub fn content_address(bytes: &[u8]) -> ShareUri {
    ShareUri::new(format!(
        "{SHARE_URI_PREFIX}{}",
        blake3::hash(bytes).to_hex()
    ))
}
