//! # Consentflow Envelope
//!
//! Multi-recipient sealed credentials and a wallet built on them.
//!
//! ## Encryption Model
//!
//! A shared credential uses a two-layer key model:
//!
//! 1. **Content Key**: a random ChaCha20-Poly1305 key encrypts the credential once
//! 2. **Recipient Shares**: the content key is wrapped for every recipient via
//!    X25519 agreement with a fresh ephemeral key, and a blake3-derived wrap key
//!    bound to the recipient's DID
//!
//! The CBOR encoding of the [`SealedCredential`] is uploaded to a
//! [`BlobStore`], and the hex blake3 hash of those bytes (prefixed with
//! `lc:net:enc:`) is the share reference. Sealing the same credential twice
//! yields two different references.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use consentflow_core::{Credential, Did, RecipientSet};
//! use consentflow_envelope::{AgreementSecret, EnvelopeWallet, KeyDirectory, MemoryBlobStore};
//! use consentflow_store::Wallet;
//!
//! async fn example() {
//!     let directory = Arc::new(KeyDirectory::new());
//!     let blobs = Arc::new(MemoryBlobStore::new());
//!     let wallet = EnvelopeWallet::new(
//!         Did::new("did:web:holder"),
//!         AgreementSecret::generate(),
//!         directory,
//!         blobs,
//!     )
//!     .unwrap();
//!
//!     let credential = Credential::new("lc:cred:abc", serde_json::json!({}));
//!     let recipients = RecipientSet::from_iter([Did::new("did:web:holder")]);
//!     let share = wallet.encrypt_and_upload(&credential, &recipients).await.unwrap();
//!     let _opened = wallet.open_share(&share).await.unwrap();
//! }
//! ```

pub mod blobs;
pub mod directory;
pub mod error;
pub mod keys;
pub mod keyshare;
pub mod sealed;
pub mod wallet;

pub use blobs::{BlobStore, MemoryBlobStore};
pub use directory::KeyDirectory;
pub use error::{EnvelopeError, Result};
pub use keys::{AgreementPublicKey, AgreementSecret, ContentKey, SealNonce};
pub use keyshare::RecipientShare;
pub use sealed::{content_address, SealFormat, SealedCredential, SHARE_URI_PREFIX};
pub use wallet::EnvelopeWallet;
