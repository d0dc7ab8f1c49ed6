//! # Consentflow Sync
//!
//! Keeps live grants supplied with the holder's credentials.
//!
//! ## Overview
//!
//! When a credential lands in the wallet, [`GrantSynchronizer`] lists the
//! holder's live grants (once per process, until invalidated) and, for every
//! grant whose category policy permits automatic sharing, resolves the
//! grantee's share and adds it to the grant's data set.
//!
//! ## Key Properties
//!
//! - **Gated**: a grant is touched only while `share_all && sharing` holds
//!   and `share_until` has not passed
//! - **Isolated**: grants are processed concurrently and fail independently
//! - **Idempotent**: shares the grant already lists are not re-added
//! - **Repairable**: [`GrantSynchronizer::resync_grant`] prunes stale
//!   references and back-fills missed credentials
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use consentflow_core::{Category, CredentialRecord};
//! use consentflow_share::Resolver;
//! use consentflow_store::{Registry, Wallet};
//! use consentflow_sync::{GrantSynchronizer, SyncConfig};
//!
//! async fn example<W: Wallet, R: Registry>(wallet: Arc<W>, registry: Arc<R>, resolver: Arc<Resolver<W, R>>) {
//!     let sync = GrantSynchronizer::new(wallet, registry, resolver, SyncConfig::default());
//!     let record = CredentialRecord::new("r1", "lc:cred:abc", "ID");
//!     let report = sync.sync_new_credential(record, &Category::new("ID")).await;
//!     println!("added to {} grants", report.added());
//! }
//! ```

pub mod error;
pub mod grants;
pub mod report;
pub mod synchronizer;

pub use error::{Result, SyncError};
pub use grants::LiveGrants;
pub use report::{GrantOutcome, GrantResync, GrantSync, ResyncReport, SyncReport};
pub use synchronizer::{GrantSynchronizer, SyncConfig};
