//! # Consentflow
//!
//! The unified API for consent-governed, encrypted credential sharing.
//!
//! ## Overview
//!
//! A holder consents to share categories of credentials with a grantee.
//! Every credential that leaves the wallet does so as an encrypted share made
//! for that grantee, and each `(credential, grantee)` pair gets exactly one
//! share for its lifetime.
//!
//! - **Resolution**: finds or creates the grantee's share of a credential,
//!   walking the remote index through a cache that never fetches a page twice
//! - **Materialization**: turns a consent draft naming plaintext credentials
//!   into terms naming encrypted shares
//! - **Grant sync**: pushes new credentials into every live grant whose
//!   policy permits automatic sharing
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use consentflow::{ConsentEngine, EngineConfig};
//! use consentflow::core::{CategoryTerms, ConsentTermsDraft, ContractUri, Terms};
//! use consentflow::store::{Registry, Wallet};
//!
//! async fn example<W: Wallet, R: Registry>(wallet: Arc<W>, registry: Arc<R>) {
//!     consentflow::logging::init_logging();
//!
//!     let config = EngineConfig::from_json(r#"{ "sync": { "maxConcurrentGrants": 8 } }"#).unwrap();
//!     let engine = ConsentEngine::new(wallet, registry, config);
//!
//!     let draft = ConsentTermsDraft::new(
//!         "did:web:employer",
//!         Terms::new().with_category("ID", CategoryTerms::share_all()),
//!     );
//!     let terms_uri = engine
//!         .submit_consent(&ContractUri::new("lc:contract:1"), &draft)
//!         .await
//!         .unwrap();
//!     println!("consented: {terms_uri}");
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `consentflow::core` - Identifiers, records, terms and grants
//! - `consentflow::store` - Wallet and registry traits, index cache
//! - `consentflow::envelope` - Sealed credentials and a reference wallet
//! - `consentflow::share` - Resolver and materializer
//! - `consentflow::sync` - Grant synchronizer

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;

// Re-export component crates
pub use consentflow_core as core;
pub use consentflow_envelope as envelope;
pub use consentflow_share as share;
pub use consentflow_store as store;
pub use consentflow_sync as sync;

// Re-export main types for convenience
pub use config::EngineConfig;
pub use engine::ConsentEngine;
pub use error::{EngineError, Result};

// Re-export commonly used core types
pub use consentflow_core::{
    Category, CategoryTerms, ConsentOptions, ConsentTermsDraft, CredentialRecord, CredentialUri,
    Did, Grant, ShareUri, SubmittableTerms, Terms, TermsUri,
};
pub use consentflow_sync::{GrantOutcome, ResyncReport, SyncReport};
