//! Collaborator fakes with call counters and fault injection.
//!
//! [`FakeWallet`] hands out sequential share references
//! (`lc:net:enc:1`, `lc:net:enc:2`, ...) instead of encrypting anything.
//! [`FakeRegistry`] delegates to a [`MemoryRegistry`] and counts every call.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use consentflow_core::{
    Category, ConsentOptions, ContractUri, Credential, CredentialUri, Cursor, Did, Grant,
    RecipientSet, RecordId, ShareUri, SubmittableTerms, TermsUri,
};
use consentflow_store::{
    GrantData, IndexPage, MemoryRegistry, RecordPatch, Registry, RemoteError, Result, Wallet,
};

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A wallet that records what it was asked to encrypt.
pub struct FakeWallet {
    identity: Did,
    credentials: Mutex<HashMap<CredentialUri, Credential>>,
    uploads: AtomicUsize,
    recipients: Mutex<Vec<RecipientSet>>,
    upload_delay: Option<Duration>,
    fail_uploads: AtomicBool,
}

impl FakeWallet {
    pub fn new(identity: impl Into<Did>) -> Self {
        Self {
            identity: identity.into(),
            credentials: Mutex::new(HashMap::new()),
            uploads: AtomicUsize::new(0),
            recipients: Mutex::new(Vec::new()),
            upload_delay: None,
            fail_uploads: AtomicBool::new(false),
        }
    }

    /// Sleep this long inside every upload, to widen race windows.
    pub fn with_upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = Some(delay);
        self
    }

    /// Hold a credential with a small JSON document.
    pub fn hold(&self, uri: impl Into<CredentialUri>) {
        let uri = uri.into();
        let credential = Credential::new(uri.clone(), serde_json::json!({ "id": uri.as_str() }));
        guard(&self.credentials).insert(uri, credential);
    }

    /// Make every following upload fail.
    pub fn fail_uploads(&self) {
        self.fail_uploads.store(true, Ordering::SeqCst);
    }

    /// Number of successful uploads so far.
    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Recipient sets of every upload attempt, in call order.
    pub fn recipient_log(&self) -> Vec<RecipientSet> {
        guard(&self.recipients).clone()
    }
}

#[async_trait]
impl Wallet for FakeWallet {
    async fn read_credential(&self, uri: &CredentialUri) -> Result<Option<Credential>> {
        Ok(guard(&self.credentials).get(uri).cloned())
    }

    async fn encrypt_and_upload(
        &self,
        _credential: &Credential,
        recipients: &RecipientSet,
    ) -> Result<ShareUri> {
        guard(&self.recipients).push(recipients.clone());
        if recipients.is_empty() {
            return Err(RemoteError::EmptyRecipients);
        }
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("upload failed".into()));
        }
        if let Some(delay) = self.upload_delay {
            tokio::time::sleep(delay).await;
        }
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ShareUri::new(format!("lc:net:enc:{n}")))
    }

    fn current_identity(&self) -> Did {
        self.identity.clone()
    }
}

/// Per-operation call counts of a [`FakeRegistry`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryCalls {
    pub fetch_index_page: usize,
    pub update_record: usize,
    pub list_live_grants: usize,
    pub submit_consent: usize,
    pub update_terms: usize,
    pub add_credential_to_grant: usize,
}

#[derive(Default)]
struct Faults {
    list_live_grants: bool,
    update_record: bool,
    submit_consent: bool,
    update_terms: HashSet<TermsUri>,
    add_credential_to_grant: HashSet<TermsUri>,
}

/// A [`MemoryRegistry`] that counts calls and fails on demand.
pub struct FakeRegistry {
    inner: MemoryRegistry,
    calls: Mutex<RegistryCalls>,
    adds: Mutex<Vec<(TermsUri, GrantData)>>,
    faults: Mutex<Faults>,
}

impl FakeRegistry {
    pub fn new(inner: MemoryRegistry) -> Self {
        Self {
            inner,
            calls: Mutex::new(RegistryCalls::default()),
            adds: Mutex::new(Vec::new()),
            faults: Mutex::new(Faults::default()),
        }
    }

    /// The backing registry, for seeding and inspection.
    pub fn memory(&self) -> &MemoryRegistry {
        &self.inner
    }

    pub fn calls(&self) -> RegistryCalls {
        guard(&self.calls).clone()
    }

    /// Every `add_credential_to_grant` attempt, in call order.
    pub fn add_log(&self) -> Vec<(TermsUri, GrantData)> {
        guard(&self.adds).clone()
    }

    /// Attempts to add to `terms_uri`.
    pub fn adds_to(&self, terms_uri: &TermsUri) -> usize {
        guard(&self.adds)
            .iter()
            .filter(|(uri, _)| uri == terms_uri)
            .count()
    }

    pub fn fail_listing(&self) {
        guard(&self.faults).list_live_grants = true;
    }

    pub fn fail_record_updates(&self) {
        guard(&self.faults).update_record = true;
    }

    pub fn fail_submissions(&self) {
        guard(&self.faults).submit_consent = true;
    }

    pub fn fail_terms_update_for(&self, terms_uri: TermsUri) {
        guard(&self.faults).update_terms.insert(terms_uri);
    }

    pub fn fail_adds_for(&self, terms_uri: TermsUri) {
        guard(&self.faults).add_credential_to_grant.insert(terms_uri);
    }

    fn count(&self, f: impl FnOnce(&mut RegistryCalls)) {
        f(&mut guard(&self.calls));
    }

    fn injected(&self, f: impl FnOnce(&Faults) -> bool, what: &str) -> Result<()> {
        if f(&guard(&self.faults)) {
            return Err(RemoteError::Unavailable(format!("injected failure: {what}")));
        }
        Ok(())
    }
}

#[async_trait]
impl Registry for FakeRegistry {
    async fn fetch_index_page(
        &self,
        category: &Category,
        cursor: Option<&Cursor>,
    ) -> Result<IndexPage> {
        self.count(|c| c.fetch_index_page += 1);
        self.inner.fetch_index_page(category, cursor).await
    }

    async fn update_record(&self, id: &RecordId, patch: &RecordPatch) -> Result<()> {
        self.count(|c| c.update_record += 1);
        self.injected(|f| f.update_record, "update_record")?;
        self.inner.update_record(id, patch).await
    }

    async fn list_live_grants(&self, identity: &Did) -> Result<Vec<Grant>> {
        self.count(|c| c.list_live_grants += 1);
        self.injected(|f| f.list_live_grants, "list_live_grants")?;
        self.inner.list_live_grants(identity).await
    }

    async fn submit_consent(
        &self,
        contract: &ContractUri,
        terms: &SubmittableTerms,
        options: &ConsentOptions,
    ) -> Result<TermsUri> {
        self.count(|c| c.submit_consent += 1);
        self.injected(|f| f.submit_consent, "submit_consent")?;
        self.inner.submit_consent(contract, terms, options).await
    }

    async fn update_terms(
        &self,
        terms_uri: &TermsUri,
        terms: &SubmittableTerms,
        options: &ConsentOptions,
    ) -> Result<()> {
        self.count(|c| c.update_terms += 1);
        self.injected(|f| f.update_terms.contains(terms_uri), "update_terms")?;
        self.inner.update_terms(terms_uri, terms, options).await
    }

    async fn add_credential_to_grant(&self, terms_uri: &TermsUri, data: &GrantData) -> Result<()> {
        self.count(|c| c.add_credential_to_grant += 1);
        guard(&self.adds)
            .push((terms_uri.clone(), data.clone()));
        self.injected(
            |f| f.add_credential_to_grant.contains(terms_uri),
            "add_credential_to_grant",
        )?;
        self.inner.add_credential_to_grant(terms_uri, data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_wallet_numbers_uploads() {
        let wallet = FakeWallet::new("did:web:me");
        wallet.hold("lc:cred:abc");
        let credential = wallet
            .read_credential(&CredentialUri::new("lc:cred:abc"))
            .await
            .unwrap()
            .unwrap();
        let recipients = RecipientSet::from_iter([Did::new("did:web:x")]);

        let first = wallet.encrypt_and_upload(&credential, &recipients).await.unwrap();
        let second = wallet.encrypt_and_upload(&credential, &recipients).await.unwrap();

        assert_eq!(first, ShareUri::new("lc:net:enc:1"));
        assert_eq!(second, ShareUri::new("lc:net:enc:2"));
        assert_eq!(wallet.uploads(), 2);
        assert_eq!(wallet.recipient_log().len(), 2);
    }

    #[tokio::test]
    async fn test_fake_registry_counts_and_fails() {
        let registry = FakeRegistry::new(MemoryRegistry::new());
        registry
            .fetch_index_page(&Category::new("ID"), None)
            .await
            .unwrap();

        registry.fail_adds_for(TermsUri::new("lc:terms:9"));
        let result = registry
            .add_credential_to_grant(&TermsUri::new("lc:terms:9"), &GrantData::new())
            .await;

        assert!(matches!(result, Err(RemoteError::Unavailable(_))));
        assert_eq!(registry.calls().fetch_index_page, 1);
        assert_eq!(registry.adds_to(&TermsUri::new("lc:terms:9")), 1);
    }
}
