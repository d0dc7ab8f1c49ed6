//! # Consentflow Share
//!
//! Shared-ciphertext resolution and consent terms materialization.
//!
//! ## Overview
//!
//! - [`Resolver`] - maps `(credential, grantee)` to exactly one encrypted
//!   share, consulting the cached index before paginating the remote one
//! - [`Materializer`] - rewrites a consent draft's plaintext credential
//!   references into the grantee's shares
//! - [`KeyedLocks`] - per-key async mutexes guarding check-then-act
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use consentflow_core::{Category, CredentialUri, Did};
//! use consentflow_share::{Resolver, ResolverConfig};
//! use consentflow_store::{MemoryRegistry, Wallet};
//!
//! async fn example<W: Wallet>(wallet: Arc<W>) {
//!     let registry = Arc::new(MemoryRegistry::new());
//!     let resolver = Resolver::new(wallet, registry, ResolverConfig::default());
//!
//!     let share = resolver
//!         .resolve(
//!             &CredentialUri::new("lc:cred:abc"),
//!             &Did::new("did:web:x"),
//!             &Category::new("Achievement"),
//!         )
//!         .await
//!         .unwrap();
//!     println!("{share}");
//! }
//! ```

pub mod error;
pub mod locks;
pub mod materialize;
pub mod resolver;

pub use error::{Result, ShareError};
pub use locks::KeyedLocks;
pub use materialize::Materializer;
pub use resolver::{Resolver, ResolverConfig};
