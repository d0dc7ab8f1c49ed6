//! Collaborator traits: the wallet and the remote registry.
//!
//! The engine owns no persistence or transport. Everything it reads or
//! writes goes through these two interfaces, which keeps the resolution
//! and sync algorithms testable against in-memory fakes.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use consentflow_core::{
    Category, ConsentOptions, ContractUri, Credential, CredentialRecord, CredentialUri, Cursor,
    Did, Grant, RecipientSet, RecordId, ShareUri, SubmittableTerms, TermsUri,
};

use crate::error::Result;

/// One page of the remote credential index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexPage {
    pub records: Vec<CredentialRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Cursor>,
    pub has_more: bool,
}

impl IndexPage {
    /// The cursor to continue from, if the index has more pages.
    pub fn continuation(&self) -> Option<&Cursor> {
        if self.has_more {
            self.next_cursor.as_ref()
        } else {
            None
        }
    }
}

/// Partial update applied to an index record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    pub shared_uris: BTreeMap<Did, Vec<ShareUri>>,
}

/// Category -> share references, as pushed into a live grant.
pub type GrantData = BTreeMap<Category, Vec<ShareUri>>;

/// The credential wallet: plaintext access, encryption, identity.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Read a plaintext credential. `None` if the wallet does not hold it.
    async fn read_credential(&self, uri: &CredentialUri) -> Result<Option<Credential>>;

    /// Encrypt `credential` for `recipients`, upload the artifact, and
    /// return its reference.
    ///
    /// Fails with [`RemoteError::EmptyRecipients`](crate::RemoteError::EmptyRecipients)
    /// if `recipients` is empty.
    async fn encrypt_and_upload(
        &self,
        credential: &Credential,
        recipients: &RecipientSet,
    ) -> Result<ShareUri>;

    /// The identity this wallet acts as.
    fn current_identity(&self) -> Did;
}

/// The remote credential index and contract registry.
#[async_trait]
pub trait Registry: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Credential Index
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch one page of the index for `category`.
    ///
    /// `cursor` is `None` for the first page, otherwise the `next_cursor`
    /// of the previous page.
    async fn fetch_index_page(
        &self,
        category: &Category,
        cursor: Option<&Cursor>,
    ) -> Result<IndexPage>;

    /// Merge a patch into an index record. Share histories merge per
    /// grantee; nothing already recorded is removed.
    async fn update_record(&self, id: &RecordId, patch: &RecordPatch) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Consent Contracts
    // ─────────────────────────────────────────────────────────────────────────

    /// All grants of `identity` whose terms are live.
    async fn list_live_grants(&self, identity: &Did) -> Result<Vec<Grant>>;

    /// Consent to a contract. Returns the new terms reference.
    async fn submit_consent(
        &self,
        contract: &ContractUri,
        terms: &SubmittableTerms,
        options: &ConsentOptions,
    ) -> Result<TermsUri>;

    /// Replace the terms of an existing consent.
    async fn update_terms(
        &self,
        terms_uri: &TermsUri,
        terms: &SubmittableTerms,
        options: &ConsentOptions,
    ) -> Result<()>;

    /// Add share references to a live grant's data set.
    async fn add_credential_to_grant(&self, terms_uri: &TermsUri, data: &GrantData) -> Result<()>;
}
