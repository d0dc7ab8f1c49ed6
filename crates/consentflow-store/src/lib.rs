//! # Consentflow Store
//!
//! Collaborator interfaces and local index state for Consentflow.
//!
//! ## Overview
//!
//! The engine owns no persistence or transport of its own. It talks to two
//! collaborators through async traits:
//!
//! - [`Wallet`] - reads plaintext credentials, encrypts and uploads shares,
//!   and names the current identity
//! - [`Registry`] - the remote paginated credential index plus the consent
//!   contract registry
//!
//! It also provides the [`IndexCache`], the local snapshot of the remote
//! index that the resolver consults before paginating.
//!
//! ## Key Types
//!
//! - [`IndexPage`] - One page of the remote index
//! - [`IndexCache`] / [`CategoryIndex`] - Fetched pages and the cache frontier
//! - [`MemoryRegistry`] - In-memory registry for tests and local development
//! - [`RemoteError`] - Failure reported by either collaborator
//!
//! ## Usage
//!
//! ```rust,no_run
//! use consentflow_core::{Category, CredentialRecord};
//! use consentflow_store::{MemoryRegistry, Registry};
//!
//! async fn example() {
//!     let registry = MemoryRegistry::with_page_size(50);
//!     registry
//!         .insert_record(CredentialRecord::new("r1", "lc:cred:abc", "Achievement"))
//!         .unwrap();
//!
//!     let page = registry
//!         .fetch_index_page(&Category::new("Achievement"), None)
//!         .await
//!         .unwrap();
//!     assert_eq!(page.records.len(), 1);
//! }
//! ```

pub mod cache;
pub mod error;
pub mod memory;
pub mod traits;

pub use cache::{CategoryIndex, Frontier, IndexCache, Lookup, Scope};
pub use error::{RemoteError, Result};
pub use memory::{MemoryRegistry, DEFAULT_PAGE_SIZE};
pub use traits::{GrantData, IndexPage, RecordPatch, Registry, Wallet};
