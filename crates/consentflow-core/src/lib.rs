//! # Consentflow Core
//!
//! Pure data model for consent-governed credential sharing: identifiers,
//! credential records, consent terms, grants, and recipient policy.
//!
//! This crate contains no I/O, no storage, no networking. Everything that
//! talks to a wallet or a registry lives in `consentflow-store` and above.
//!
//! ## Key Types
//!
//! - [`CredentialRecord`] - A locally indexed credential and its share history
//! - [`ShareUri`] - Reference to an encrypted artifact made for one grantee
//! - [`Terms`] - Per-category consent policy, generic over what `shared` holds
//! - [`ConsentTermsDraft`] - User intent before credentials are resolved
//! - [`Grant`] - A consented contract as reported by the registry
//! - [`RecipientTable`] - Co-recipients mandated for well-known grantees
//!
//! ## Sharing Policy
//!
//! A category may be shared automatically only while
//! `share_all && sharing && (share_until is unset || share_until > now)`.
//! See [`CategoryTerms::permits_auto_share`].

pub mod error;
pub mod grant;
pub mod recipients;
pub mod record;
pub mod terms;
pub mod time;
pub mod types;
pub mod validation;

pub use error::{CoreError, Result};
pub use grant::{Contract, ContractCategory, Grant, GrantTerms, TermsStatus};
pub use recipients::{RecipientSet, RecipientTable};
pub use record::{Credential, CredentialRecord};
pub use terms::{CategoryTerms, ConsentOptions, ConsentTermsDraft, SubmittableTerms, Terms};
pub use time::now_millis;
pub use types::{Category, ContractUri, CredentialUri, Cursor, Did, RecordId, ShareUri, TermsUri};
pub use validation::validate_draft;
