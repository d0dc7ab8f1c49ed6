//! Key material for sealed credentials.
//!
//! X25519 for key agreement, ChaCha20-Poly1305 for authenticated
//! encryption, blake3 for key derivation.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::error::{EnvelopeError, Result};

/// Domain separation for wrap-key derivation.
const WRAP_KEY_CONTEXT: &str = "consentflow-envelope-v1 recipient wrap key";

/// An X25519 public key (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgreementPublicKey(pub [u8; 32]);

impl AgreementPublicKey {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    fn to_dalek(self) -> PublicKey {
        PublicKey::from(self.0)
    }
}

impl std::fmt::Debug for AgreementPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AgreementPublicKey({})", &self.to_hex()[..16])
    }
}

/// A long-lived X25519 secret held by one identity.
pub struct AgreementSecret(StaticSecret);

impl AgreementSecret {
    /// Generate a new random secret.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(StaticSecret::from(bytes))
    }

    /// Create from seed bytes (deterministic, for tests and fixtures).
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    pub fn public_key(&self) -> AgreementPublicKey {
        AgreementPublicKey(*PublicKey::from(&self.0).as_bytes())
    }

    /// Key agreement with a sender's ephemeral public key.
    pub(crate) fn agree(&self, peer: &AgreementPublicKey) -> SharedSecret {
        SharedSecret(*self.0.diffie_hellman(&peer.to_dalek()).as_bytes())
    }
}

/// One-shot sender key for wrapping a content key to one recipient.
pub(crate) struct EphemeralKey {
    secret: EphemeralSecret,
    public: AgreementPublicKey,
}

impl EphemeralKey {
    pub(crate) fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(rand::thread_rng());
        let public = AgreementPublicKey(*PublicKey::from(&secret).as_bytes());
        Self { secret, public }
    }

    pub(crate) fn public_key(&self) -> AgreementPublicKey {
        self.public
    }

    /// Consumes the secret; it can only be used once.
    pub(crate) fn agree(self, peer: &AgreementPublicKey) -> SharedSecret {
        SharedSecret(*self.secret.diffie_hellman(&peer.to_dalek()).as_bytes())
    }
}

/// Raw X25519 output. Never used as a key directly.
pub(crate) struct SharedSecret([u8; 32]);

impl SharedSecret {
    /// Derive the key that wraps a content key for `recipient`.
    pub(crate) fn wrap_key(&self, recipient: &str) -> ContentKey {
        let mut hasher = blake3::Hasher::new_derive_key(WRAP_KEY_CONTEXT);
        hasher.update(&self.0);
        hasher.update(recipient.as_bytes());
        ContentKey(*hasher.finalize().as_bytes())
    }
}

/// A 256-bit ChaCha20-Poly1305 key.
#[derive(Clone)]
pub struct ContentKey([u8; 32]);

impl ContentKey {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(&self.0.into())
    }

    pub fn encrypt(&self, plaintext: &[u8], nonce: &SealNonce) -> Result<Vec<u8>> {
        self.cipher()
            .encrypt(Nonce::from_slice(&nonce.0), plaintext)
            .map_err(|e| EnvelopeError::EncryptionError(e.to_string()))
    }

    pub fn decrypt(&self, ciphertext: &[u8], nonce: &SealNonce) -> Result<Vec<u8>> {
        self.cipher()
            .decrypt(Nonce::from_slice(&nonce.0), ciphertext)
            .map_err(|e| EnvelopeError::DecryptionError(e.to_string()))
    }
}

/// A 96-bit nonce, fresh for every encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealNonce(pub [u8; 12]);

impl SealNonce {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }
}
