//! In-memory implementation of the Registry trait.
//!
//! This is primarily for testing and local development. It keeps the
//! credential index, contracts, consents, and grant data in memory with no
//! persistence. Cursors are stringified offsets into the per-category
//! record list.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use consentflow_core::{
    Category, ConsentOptions, Contract, ContractUri, CredentialRecord, Cursor, Did, Grant,
    GrantTerms, RecordId, ShareUri, SubmittableTerms, TermsStatus, TermsUri,
};

use crate::error::{RemoteError, Result};
use crate::traits::{GrantData, IndexPage, RecordPatch, Registry};

/// Default number of records per index page.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// In-memory registry implementation.
///
/// Thread-safe via RwLock.
pub struct MemoryRegistry {
    page_size: usize,
    inner: RwLock<MemoryRegistryInner>,
}

#[derive(Default)]
struct MemoryRegistryInner {
    /// Index records per category, in insertion order.
    records: HashMap<Category, Vec<CredentialRecord>>,

    /// Contract templates by uri.
    contracts: HashMap<ContractUri, Contract>,

    /// Consents by terms uri.
    consents: BTreeMap<TermsUri, StoredConsent>,

    /// Data pushed into each grant.
    grant_data: HashMap<TermsUri, GrantData>,

    /// Identity submissions are attributed to.
    session: Option<Did>,

    next_terms: u64,
}

struct StoredConsent {
    consenter: Did,
    grant: Grant,
}

impl MemoryRegistry {
    /// Create an empty registry acting on behalf of nobody in particular.
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create an empty registry that serves `page_size` records per page.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            inner: RwLock::new(MemoryRegistryInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryRegistryInner>> {
        self.inner
            .read()
            .map_err(|_| RemoteError::Unavailable("registry lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryRegistryInner>> {
        self.inner
            .write()
            .map_err(|_| RemoteError::Unavailable("registry lock poisoned".into()))
    }

    /// Add a record to the end of its category's index.
    pub fn insert_record(&self, record: CredentialRecord) -> Result<()> {
        let mut inner = self.write()?;
        inner
            .records
            .entry(record.category.clone())
            .or_default()
            .push(record);
        Ok(())
    }

    /// Look up a record by id across all categories.
    pub fn record(&self, id: &RecordId) -> Result<Option<CredentialRecord>> {
        let inner = self.read()?;
        Ok(inner
            .records
            .values()
            .flatten()
            .find(|r| &r.id == id)
            .cloned())
    }

    /// Register a contract template.
    pub fn insert_contract(&self, contract: Contract) -> Result<()> {
        let mut inner = self.write()?;
        inner.contracts.insert(contract.uri.clone(), contract);
        Ok(())
    }

    /// Register an existing grant held by `consenter`.
    pub fn insert_grant(&self, consenter: Did, grant: Grant) -> Result<()> {
        let mut inner = self.write()?;
        inner
            .contracts
            .entry(grant.contract.uri.clone())
            .or_insert_with(|| grant.contract.clone());
        inner
            .consents
            .insert(grant.terms.uri.clone(), StoredConsent { consenter, grant });
        Ok(())
    }

    /// Change the status of a consent (e.g. to simulate revocation).
    pub fn set_status(&self, terms_uri: &TermsUri, status: TermsStatus) -> Result<()> {
        let mut inner = self.write()?;
        let consent = inner
            .consents
            .get_mut(terms_uri)
            .ok_or_else(|| RemoteError::NotFound(terms_uri.to_string()))?;
        consent.grant.terms.status = status;
        Ok(())
    }

    /// The grant stored under `terms_uri`.
    pub fn grant(&self, terms_uri: &TermsUri) -> Result<Option<Grant>> {
        let inner = self.read()?;
        Ok(inner.consents.get(terms_uri).map(|c| c.grant.clone()))
    }

    /// Everything pushed into a grant so far.
    pub fn grant_data(&self, terms_uri: &TermsUri) -> Result<GrantData> {
        let inner = self.read()?;
        Ok(inner.grant_data.get(terms_uri).cloned().unwrap_or_default())
    }

    /// Attribute future [`Registry::submit_consent`] calls to `identity`.
    pub fn sign_in(&self, identity: Did) -> Result<()> {
        self.write()?.session = Some(identity);
        Ok(())
    }

    /// The identity on whose behalf submissions are recorded.
    ///
    /// Without a signed-in session, submissions are attributed to the first
    /// consenter seen, or to an anonymous DID.
    fn session_identity(inner: &MemoryRegistryInner) -> Did {
        inner
            .session
            .clone()
            .or_else(|| inner.consents.values().next().map(|c| c.consenter.clone()))
            .unwrap_or_else(|| Did::new("did:example:anonymous"))
    }

    /// Record a consent as if submitted by `consenter`.
    pub fn submit_consent_as(
        &self,
        consenter: Did,
        contract: &ContractUri,
        terms: &SubmittableTerms,
        options: &ConsentOptions,
    ) -> Result<TermsUri> {
        let mut inner = self.write()?;
        let contract = inner
            .contracts
            .get(contract)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(contract.to_string()))?;

        inner.next_terms += 1;
        let uri = TermsUri::new(format!("lc:terms:{}", inner.next_terms));

        let grant = Grant {
            contract,
            terms: GrantTerms {
                uri: uri.clone(),
                status: TermsStatus::Live,
                terms: terms.clone(),
                expires_at: options.expires_at,
                one_time: options.one_time,
            },
        };

        tracing::debug!(terms = %uri, consenter = %consenter, "consent recorded");
        inner
            .consents
            .insert(uri.clone(), StoredConsent { consenter, grant });
        Ok(uri)
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn fetch_index_page(
        &self,
        category: &Category,
        cursor: Option<&Cursor>,
    ) -> Result<IndexPage> {
        let inner = self.read()?;

        let offset = match cursor {
            Some(cursor) => cursor
                .as_str()
                .parse::<usize>()
                .map_err(|_| RemoteError::Rejected(format!("invalid cursor {cursor}")))?,
            None => 0,
        };

        let all = inner.records.get(category).map(Vec::as_slice).unwrap_or_default();
        let end = (offset + self.page_size).min(all.len());
        let records = all.get(offset..end).map(<[_]>::to_vec).unwrap_or_default();
        let has_more = end < all.len();

        Ok(IndexPage {
            records,
            next_cursor: has_more.then(|| Cursor::new(end.to_string())),
            has_more,
        })
    }

    async fn update_record(&self, id: &RecordId, patch: &RecordPatch) -> Result<()> {
        let mut inner = self.write()?;
        let record = inner
            .records
            .values_mut()
            .flatten()
            .find(|r| &r.id == id)
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
        record.merge_shares(&patch.shared_uris);
        Ok(())
    }

    async fn list_live_grants(&self, identity: &Did) -> Result<Vec<Grant>> {
        let inner = self.read()?;
        Ok(inner
            .consents
            .values()
            .filter(|c| &c.consenter == identity && c.grant.is_live())
            .map(|c| c.grant.clone())
            .collect())
    }

    async fn submit_consent(
        &self,
        contract: &ContractUri,
        terms: &SubmittableTerms,
        options: &ConsentOptions,
    ) -> Result<TermsUri> {
        let consenter = Self::session_identity(&*self.read()?);
        self.submit_consent_as(consenter, contract, terms, options)
    }

    async fn update_terms(
        &self,
        terms_uri: &TermsUri,
        terms: &SubmittableTerms,
        options: &ConsentOptions,
    ) -> Result<()> {
        let mut inner = self.write()?;
        let consent = inner
            .consents
            .get_mut(terms_uri)
            .ok_or_else(|| RemoteError::NotFound(terms_uri.to_string()))?;
        consent.grant.terms.terms = terms.clone();
        if options.expires_at.is_some() {
            consent.grant.terms.expires_at = options.expires_at;
        }
        if options.one_time.is_some() {
            consent.grant.terms.one_time = options.one_time;
        }
        Ok(())
    }

    async fn add_credential_to_grant(&self, terms_uri: &TermsUri, data: &GrantData) -> Result<()> {
        let mut inner = self.write()?;

        let consent = inner
            .consents
            .get_mut(terms_uri)
            .ok_or_else(|| RemoteError::NotFound(terms_uri.to_string()))?;
        if !consent.grant.is_live() {
            return Err(RemoteError::Rejected(format!("terms {terms_uri} are not live")));
        }

        // The grant's terms list everything its data set holds.
        for (category, shares) in data {
            if let Some(terms) = consent.grant.terms.terms.categories.get_mut(category) {
                push_new(&mut terms.shared, shares);
            }
        }

        let stored = inner.grant_data.entry(terms_uri.clone()).or_default();
        for (category, shares) in data {
            push_new(stored.entry(category.clone()).or_default(), shares);
        }
        Ok(())
    }
}

fn push_new(existing: &mut Vec<ShareUri>, shares: &[ShareUri]) {
    for share in shares {
        if !existing.contains(share) {
            existing.push(share.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consentflow_core::CategoryTerms;

    fn seeded(count: usize, page_size: usize) -> MemoryRegistry {
        let registry = MemoryRegistry::with_page_size(page_size);
        for i in 0..count {
            registry
                .insert_record(CredentialRecord::new(
                    format!("r{i}"),
                    format!("lc:cred:{i}"),
                    "ID",
                ))
                .unwrap();
        }
        registry
    }

    #[tokio::test]
    async fn test_pagination_walks_every_record() {
        let registry = seeded(5, 2);
        let category = Category::new("ID");

        let mut seen = Vec::new();
        let mut cursor: Option<Cursor> = None;
        loop {
            let page = registry
                .fetch_index_page(&category, cursor.as_ref())
                .await
                .unwrap();
            seen.extend(page.records.iter().map(|r| r.id.clone()));
            match page.continuation() {
                Some(next) => cursor = Some(next.clone()),
                None => break,
            }
        }

        assert_eq!(seen.len(), 5);
        assert_eq!(seen[4], RecordId::new("r4"));
    }

    #[tokio::test]
    async fn test_empty_category() {
        let registry = MemoryRegistry::new();
        let page = registry
            .fetch_index_page(&Category::new("Nothing"), None)
            .await
            .unwrap();
        assert!(page.records.is_empty());
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn test_update_record() {
        let registry = seeded(1, 10);
        let mut patch = RecordPatch::default();
        patch
            .shared_uris
            .insert(Did::new("did:web:x"), vec![ShareUri::new("s1")]);

        registry.update_record(&RecordId::new("r0"), &patch).await.unwrap();
        let record = registry.record(&RecordId::new("r0")).unwrap().unwrap();
        assert_eq!(record.current_share(&Did::new("did:web:x")), Some(&ShareUri::new("s1")));

        // Patches merge per grantee; nothing already recorded is dropped.
        let mut other = RecordPatch::default();
        other
            .shared_uris
            .insert(Did::new("did:web:y"), vec![ShareUri::new("s2")]);
        registry.update_record(&RecordId::new("r0"), &other).await.unwrap();
        let record = registry.record(&RecordId::new("r0")).unwrap().unwrap();
        assert_eq!(record.shares_for(&Did::new("did:web:x")), &[ShareUri::new("s1")]);
        assert_eq!(record.shares_for(&Did::new("did:web:y")), &[ShareUri::new("s2")]);

        let missing = registry.update_record(&RecordId::new("nope"), &patch).await;
        assert!(matches!(missing, Err(RemoteError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_consent_lifecycle() {
        let registry = MemoryRegistry::new();
        let me = Did::new("did:web:me");
        let contract = Contract {
            uri: ContractUri::new("lc:contract:1"),
            owner: Did::new("did:web:x"),
            name: "Test".into(),
            categories: BTreeMap::new(),
        };
        registry.insert_contract(contract.clone()).unwrap();

        let terms = SubmittableTerms::new().with_category("ID", CategoryTerms::share_all());
        let uri = registry
            .submit_consent_as(me.clone(), &contract.uri, &terms, &ConsentOptions::default())
            .unwrap();

        let grants = registry.list_live_grants(&me).await.unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].owner(), &Did::new("did:web:x"));

        let mut data = GrantData::new();
        data.insert(Category::new("ID"), vec![ShareUri::new("s1")]);
        registry.add_credential_to_grant(&uri, &data).await.unwrap();
        registry.add_credential_to_grant(&uri, &data).await.unwrap();
        assert_eq!(registry.grant_data(&uri).unwrap(), data);
        let listed = registry.grant(&uri).unwrap().unwrap();
        assert_eq!(
            listed.terms.terms.category(&Category::new("ID")).unwrap().shared,
            vec![ShareUri::new("s1")]
        );

        registry.set_status(&uri, TermsStatus::Revoked).unwrap();
        assert!(registry.list_live_grants(&me).await.unwrap().is_empty());
        assert!(registry.add_credential_to_grant(&uri, &data).await.is_err());
    }

    #[tokio::test]
    async fn test_submit_attributed_to_session() {
        let registry = MemoryRegistry::new();
        let me = Did::new("did:web:me");
        registry.sign_in(me.clone()).unwrap();
        registry
            .insert_contract(Contract {
                uri: ContractUri::new("lc:contract:1"),
                owner: Did::new("did:web:x"),
                name: "Test".into(),
                categories: BTreeMap::new(),
            })
            .unwrap();

        let uri = registry
            .submit_consent(
                &ContractUri::new("lc:contract:1"),
                &SubmittableTerms::new(),
                &ConsentOptions::default(),
            )
            .await
            .unwrap();

        let grants = registry.list_live_grants(&me).await.unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].terms_uri(), &uri);
    }
}
