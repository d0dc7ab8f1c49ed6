//! Shared-ciphertext resolution.
//!
//! Given a credential and a grantee, the [`Resolver`] returns the one
//! encrypted share that grantee should see, creating it only if no share
//! exists yet.
//!
//! ## Algorithm
//!
//! 1. Look the credential up in the cached index pages for its category.
//!    A record with a share for the grantee returns that share; a record
//!    without one gets a new share; a uri that is itself listed as one of
//!    the grantee's shares is returned unchanged.
//! 2. On a cache miss, fetch pages from the cache frontier onward, checking
//!    only the new page after each fetch, until the credential turns up or
//!    the remote index runs out.
//!
//! ## Concurrency
//!
//! The lookup and the upload that may follow it run under a lock keyed by
//! `(credential, grantee)`, so one pair never gets two shares. Frontier
//! advancement runs under a per-category lock, so no page is fetched twice.
//! Writing a new share into a record runs under a per-record lock, so
//! grantees sharing one record never overwrite each other's history.
//! Locks are always taken pair first, then category or record.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use consentflow_core::{
    Category, CredentialRecord, CredentialUri, Cursor, Did, RecipientSet, RecipientTable,
    RecordId, ShareUri,
};
use consentflow_store::{IndexCache, Lookup, RecordPatch, Registry, Scope, Wallet};

use crate::error::{Result, ShareError};
use crate::locks::KeyedLocks;

/// Who, besides the grantee, every share is encrypted for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolverConfig {
    /// Co-recipients required for specific grantees.
    pub augmentation: RecipientTable,

    /// Identities added to every recipient set.
    pub extra_recipients: Vec<Did>,
}

/// Resolves `(credential, grantee)` pairs to reusable encrypted shares.
///
/// The resolver is the only writer of its [`IndexCache`].
pub struct Resolver<W, R> {
    wallet: Arc<W>,
    registry: Arc<R>,
    config: ResolverConfig,
    cache: RwLock<IndexCache>,
    pairs: KeyedLocks<(CredentialUri, Did)>,
    frontiers: KeyedLocks<Category>,
    records: KeyedLocks<RecordId>,
}

impl<W: Wallet, R: Registry> Resolver<W, R> {
    pub fn new(wallet: Arc<W>, registry: Arc<R>, config: ResolverConfig) -> Self {
        Self {
            wallet,
            registry,
            config,
            cache: RwLock::new(IndexCache::new()),
            pairs: KeyedLocks::new(),
            frontiers: KeyedLocks::new(),
            records: KeyedLocks::new(),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Return the grantee's share of `uri`, creating it if needed.
    pub async fn resolve(
        &self,
        uri: &CredentialUri,
        grantee: &Did,
        category: &Category,
    ) -> Result<ShareUri> {
        let _pair = self.pairs.lock((uri.clone(), grantee.clone())).await;

        match self.find(uri, grantee, category).await? {
            Lookup::Record(record) => match record.current_share(grantee) {
                Some(share) => {
                    tracing::debug!(credential = %uri, grantee = %grantee, share = %share, "reusing share");
                    Ok(share.clone())
                }
                None => self.create_share(record, grantee, category).await,
            },
            Lookup::AlreadyShared(share) => {
                tracing::debug!(share = %share, grantee = %grantee, "input is already a share");
                Ok(share)
            }
            Lookup::Miss => Err(ShareError::NotFound(uri.to_string())),
        }
    }

    /// Make a just-added record resolvable without a remote round trip.
    ///
    /// Returns false if the record was already cached.
    pub async fn admit(&self, record: CredentialRecord) -> bool {
        let category = record.category.clone();
        self.cache.write().await.category_mut(&category).admit(record)
    }

    /// Fetch every remaining page of `category` into the cache.
    ///
    /// Returns the number of pages fetched by this call.
    pub async fn load_category(&self, category: &Category) -> Result<usize> {
        let _frontier = self.frontiers.lock(category.clone()).await;

        let mut fetched = 0;
        while let Some(cursor) = self.next_cursor(category).await {
            self.fetch_page(category, cursor).await?;
            fetched += 1;
        }
        Ok(fetched)
    }

    /// Every share any cached record lists for `grantee` in `category`.
    pub async fn current_shares(&self, category: &Category, grantee: &Did) -> Vec<ShareUri> {
        self.cache
            .read()
            .await
            .category(category)
            .map(|index| index.shares_for(grantee))
            .unwrap_or_default()
    }

    /// The cached record for `uri`, if any.
    pub async fn cached_record(
        &self,
        category: &Category,
        uri: &CredentialUri,
    ) -> Option<CredentialRecord> {
        let cache = self.cache.read().await;
        let found = cache
            .category(category)?
            .records()
            .find(|r| &r.uri == uri)
            .cloned();
        found
    }

    /// Total index pages fetched so far.
    pub async fn pages_fetched(&self) -> usize {
        self.cache.read().await.pages_fetched()
    }

    async fn find(&self, uri: &CredentialUri, grantee: &Did, category: &Category) -> Result<Lookup> {
        if let Some(index) = self.cache.read().await.category(category) {
            let found = index.lookup(Scope::All, uri, grantee);
            if found != Lookup::Miss {
                return Ok(found);
            }
        }

        let _frontier = self.frontiers.lock(category.clone()).await;

        // Others may have advanced the frontier while we waited.
        let mut scope = Scope::All;
        loop {
            let (found, pages) = {
                let cache = self.cache.read().await;
                match cache.category(category) {
                    Some(index) => (index.lookup(scope, uri, grantee), index.page_count()),
                    None => (Lookup::Miss, 0),
                }
            };
            if found != Lookup::Miss {
                return Ok(found);
            }

            let Some(cursor) = self.next_cursor(category).await else {
                return Err(ShareError::NotFound(uri.to_string()));
            };
            self.fetch_page(category, cursor).await?;
            scope = Scope::PagesFrom(pages);
        }
    }

    /// Cursor for the next fetch, or `None` once the index is exhausted.
    /// The inner `None` means "from the start".
    async fn next_cursor(&self, category: &Category) -> Option<Option<Cursor>> {
        let cache = self.cache.read().await;
        match cache.category(category) {
            Some(index) if index.frontier().is_exhausted() => None,
            Some(index) => Some(index.frontier().cursor().cloned()),
            None => Some(None),
        }
    }

    /// Fetch one page at `cursor`. Caller holds the category's frontier lock.
    async fn fetch_page(&self, category: &Category, cursor: Option<Cursor>) -> Result<()> {
        let page = self
            .registry
            .fetch_index_page(category, cursor.as_ref())
            .await?;
        tracing::debug!(
            category = %category,
            records = page.records.len(),
            has_more = page.has_more,
            "fetched index page"
        );
        self.cache.write().await.category_mut(category).push_page(page);
        Ok(())
    }

    async fn create_share(
        &self,
        record: CredentialRecord,
        grantee: &Did,
        category: &Category,
    ) -> Result<ShareUri> {
        let credential = self
            .wallet
            .read_credential(&record.uri)
            .await?
            .ok_or_else(|| ShareError::NotFound(record.uri.to_string()))?;

        let recipients = RecipientSet::assemble(
            grantee,
            &self.config.augmentation,
            &self.config.extra_recipients,
        );
        if recipients.is_empty() {
            return Err(ShareError::InvalidRecipients(grantee.clone()));
        }

        let share = self.wallet.encrypt_and_upload(&credential, &recipients).await?;

        let _record = self.records.lock(record.id.clone()).await;

        // Other grantees may have written to the record during the upload.
        let mut updated = self
            .cache
            .read()
            .await
            .category(category)
            .and_then(|index| index.record(&record.id))
            .cloned()
            .unwrap_or(record);
        updated.push_share(grantee.clone(), share.clone());

        let mut shared_uris = BTreeMap::new();
        shared_uris.insert(grantee.clone(), updated.shares_for(grantee).to_vec());
        let patch = RecordPatch { shared_uris };
        let record = updated;
        if let Err(e) = self.registry.update_record(&record.id, &patch).await {
            tracing::warn!(record = %record.id, share = %share, error = %e, "share uploaded but record update failed");
            return Err(e.into());
        }

        self.cache
            .write()
            .await
            .category_mut(category)
            .mirror_shares(&record.id, &patch.shared_uris);

        tracing::info!(
            credential = %record.uri,
            grantee = %grantee,
            share = %share,
            recipients = recipients.len(),
            "created share"
        );
        Ok(share)
    }
}
