//! Fan-out of credentials into live grants.
//!
//! When a credential is added to the wallet, every live grant whose policy
//! for the credential's category currently permits automatic sharing gets
//! the grantee's share of it. Grants are processed concurrently and fail
//! independently; nothing is retried. A missed grant is caught up by the
//! next credential or by an explicit resync.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, SemaphorePermit};

use consentflow_core::{
    now_millis, Category, ConsentOptions, CredentialRecord, CredentialUri, Grant, ShareUri,
};
use consentflow_share::Resolver;
use consentflow_store::{GrantData, Registry, Wallet};

use crate::error::Result;
use crate::grants::LiveGrants;
use crate::report::{GrantOutcome, GrantResync, GrantSync, ResyncReport, SyncReport};

/// Configuration for grant synchronization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncConfig {
    /// Cap on grants synced at once. `None` (or zero) means no cap.
    pub max_concurrent_grants: Option<usize>,
}

/// Pushes new credentials into every live grant that wants them.
pub struct GrantSynchronizer<W, R> {
    wallet: Arc<W>,
    registry: Arc<R>,
    resolver: Arc<Resolver<W, R>>,
    grants: LiveGrants,
    limit: Option<Semaphore>,
}

impl<W: Wallet, R: Registry> GrantSynchronizer<W, R> {
    pub fn new(
        wallet: Arc<W>,
        registry: Arc<R>,
        resolver: Arc<Resolver<W, R>>,
        config: SyncConfig,
    ) -> Self {
        let limit = config
            .max_concurrent_grants
            .filter(|n| *n > 0)
            .map(Semaphore::new);
        Self {
            wallet,
            registry,
            resolver,
            grants: LiveGrants::new(),
            limit,
        }
    }

    /// Drop the cached list of live grants.
    pub async fn invalidate_grants(&self) {
        self.grants.invalidate().await;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // New Credentials
    // ─────────────────────────────────────────────────────────────────────────

    /// Share a newly added credential with every live grant that permits it.
    ///
    /// Never fails: a failed grant listing yields an empty report carrying
    /// the error, and per-grant failures are recorded per grant.
    pub async fn sync_new_credential(&self, record: CredentialRecord, category: &Category) -> SyncReport {
        let uri = record.uri.clone();
        self.resolver.admit(record).await;

        let identity = self.wallet.current_identity();
        let grants = match self.grants.get(&*self.registry, &identity).await {
            Ok(grants) => grants,
            Err(e) => {
                tracing::warn!(identity = %identity, error = %e, "could not list live grants");
                return SyncReport::listing_failed(e.to_string());
            }
        };

        let now = now_millis();
        let credential = &uri;
        let lines = join_all(grants.iter().map(|grant| async move {
            GrantSync {
                terms_uri: grant.terms_uri().clone(),
                grantee: grant.owner().clone(),
                outcome: self.sync_grant(grant, credential, category, now).await,
            }
        }))
        .await;

        let report = SyncReport {
            grants: lines,
            error: None,
        };
        tracing::info!(
            credential = %uri,
            category = %category,
            grants = report.grants.len(),
            added = report.added(),
            failed = report.failed(),
            "synced credential into live grants"
        );
        report
    }

    async fn sync_grant(
        &self,
        grant: &Grant,
        uri: &CredentialUri,
        category: &Category,
        now: i64,
    ) -> GrantOutcome {
        if !grant.permits_auto_share(category, now) {
            return GrantOutcome::Skipped;
        }

        let _permit = self.permit().await;

        let share = match self.resolver.resolve(uri, grant.owner(), category).await {
            Ok(share) => share,
            Err(e) => {
                tracing::warn!(terms = %grant.terms_uri(), credential = %uri, error = %e, "could not resolve share for grant");
                return GrantOutcome::Failed(e.to_string());
            }
        };

        let listed = grant
            .terms
            .terms
            .category(category)
            .is_some_and(|terms| terms.shared.contains(&share));
        if listed {
            return GrantOutcome::AlreadyListed(share);
        }

        let mut data = GrantData::new();
        data.insert(category.clone(), vec![share.clone()]);
        match self.registry.add_credential_to_grant(grant.terms_uri(), &data).await {
            Ok(()) => GrantOutcome::Added(share),
            Err(e) => {
                tracing::warn!(terms = %grant.terms_uri(), share = %share, error = %e, "could not add share to grant");
                GrantOutcome::Failed(e.to_string())
            }
        }
    }

    async fn permit(&self) -> Option<SemaphorePermit<'_>> {
        match &self.limit {
            Some(limit) => limit.acquire().await.ok(),
            None => None,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resync
    // ─────────────────────────────────────────────────────────────────────────

    /// Bring one grant's data set in line with the index.
    ///
    /// Stale references (no indexed record lists them for the grantee) are
    /// pruned from the terms first. Then every credential in
    /// `records_by_category` whose category permits automatic sharing is
    /// resolved and the shares the grant does not list yet are added.
    pub async fn resync_grant(
        &self,
        grant: &Grant,
        records_by_category: &BTreeMap<Category, Vec<CredentialUri>>,
    ) -> Result<GrantResync> {
        let owner = grant.owner();
        let mut indexed: HashSet<ShareUri> = HashSet::new();
        for category in grant.terms.terms.categories.keys() {
            self.resolver.load_category(category).await?;
            indexed.extend(self.resolver.current_shares(category, owner).await);
        }

        let mut pruned = 0;
        let terms = grant.terms.terms.map_categories(|_, policy| {
            let kept: Vec<ShareUri> = policy
                .shared
                .iter()
                .filter(|share| indexed.contains(*share))
                .cloned()
                .collect();
            pruned += policy.shared.len() - kept.len();
            policy.with_shared(kept)
        });

        if pruned > 0 {
            let options = ConsentOptions {
                expires_at: grant.terms.expires_at,
                one_time: grant.terms.one_time,
            };
            self.registry
                .update_terms(grant.terms_uri(), &terms, &options)
                .await?;
            tracing::info!(terms = %grant.terms_uri(), pruned, "pruned stale shares from terms");
        }

        let now = now_millis();
        let mut data = GrantData::new();
        let mut unresolved = 0;
        for (category, policy) in &terms.categories {
            if !grant.is_live() || !policy.permits_auto_share(now) {
                continue;
            }
            let Some(uris) = records_by_category.get(category) else {
                continue;
            };

            let results = join_all(
                uris.iter()
                    .map(|uri| self.resolver.resolve(uri, owner, category)),
            )
            .await;

            let mut fresh: Vec<ShareUri> = Vec::new();
            for (uri, result) in uris.iter().zip(results) {
                match result {
                    Ok(share) if !policy.shared.contains(&share) && !fresh.contains(&share) => {
                        fresh.push(share)
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::debug!(credential = %uri, category = %category, error = %e, "skipping credential during resync");
                        unresolved += 1;
                    }
                }
            }
            if !fresh.is_empty() {
                data.insert(category.clone(), fresh);
            }
        }

        let added: Vec<ShareUri> = data.values().flatten().cloned().collect();
        if !data.is_empty() {
            self.registry
                .add_credential_to_grant(grant.terms_uri(), &data)
                .await?;
        }

        Ok(GrantResync {
            pruned,
            added,
            unresolved,
        })
    }

    /// Resync every live grant of the current identity.
    pub async fn resync_all(
        &self,
        records_by_category: &BTreeMap<Category, Vec<CredentialUri>>,
    ) -> ResyncReport {
        let identity = self.wallet.current_identity();
        let grants = match self.grants.get(&*self.registry, &identity).await {
            Ok(grants) => grants,
            Err(e) => {
                tracing::warn!(identity = %identity, error = %e, "could not list live grants");
                return ResyncReport {
                    grants: Vec::new(),
                    error: Some(e.to_string()),
                };
            }
        };

        let results = join_all(grants.iter().map(|grant| async move {
            let _permit = self.permit().await;
            let result = self
                .resync_grant(grant, records_by_category)
                .await
                .map_err(|e| {
                    tracing::warn!(terms = %grant.terms_uri(), error = %e, "grant resync failed");
                    e.to_string()
                });
            (grant.terms_uri().clone(), result)
        }))
        .await;

        // Pruning rewrote terms; the cached listing is stale.
        self.grants.invalidate().await;

        ResyncReport {
            grants: results,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consentflow_core::{CategoryTerms, Did, SubmittableTerms, TermsUri};
    use consentflow_share::ResolverConfig;
    use consentflow_testkit::fixtures::{lapsed, share_all, share_all_with, TestFixture};
    use consentflow_core::RecordId;
    use consentflow_testkit::{FakeRegistry, FakeWallet, HOLDER};
    use std::time::Duration;

    fn synchronizer(
        fixture: &TestFixture,
        config: SyncConfig,
    ) -> GrantSynchronizer<FakeWallet, FakeRegistry> {
        let resolver = Arc::new(Resolver::new(
            fixture.wallet.clone(),
            fixture.registry.clone(),
            ResolverConfig::default(),
        ));
        GrantSynchronizer::new(
            fixture.wallet.clone(),
            fixture.registry.clone(),
            resolver,
            config,
        )
    }

    fn id() -> Category {
        Category::new("ID")
    }

    #[tokio::test]
    async fn test_new_credential_reaches_permitting_grants() {
        let fixture = TestFixture::new();
        let record = fixture.add_credential("r1", "lc:cred:abc", "ID");
        fixture.live_grant("did:web:x", "lc:terms:1", share_all("ID"));
        fixture.live_grant("did:web:y", "lc:terms:2", share_all("Skill"));

        let report = synchronizer(&fixture, SyncConfig::default())
            .sync_new_credential(record, &id())
            .await;

        assert_eq!(report.added(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(
            fixture
                .registry
                .memory()
                .grant_data(&TermsUri::new("lc:terms:1"))
                .unwrap()
                .get(&id()),
            Some(&vec![ShareUri::new("lc:net:enc:1")])
        );
    }

    #[tokio::test]
    async fn test_concurrent_fan_out_keeps_every_grantee_share() {
        let wallet = FakeWallet::new(HOLDER).with_upload_delay(Duration::from_millis(20));
        let fixture = TestFixture::with_wallet(wallet, 25);
        let record = fixture.add_credential("r1", "lc:cred:abc", "ID");
        let owners = ["did:web:a", "did:web:b", "did:web:c"];
        for (i, owner) in owners.iter().enumerate() {
            fixture.live_grant(owner, &format!("lc:terms:{i}"), share_all("ID"));
        }
        let sync = synchronizer(&fixture, SyncConfig::default());

        let report = sync.sync_new_credential(record.clone(), &id()).await;
        assert_eq!(report.added(), 3);
        assert_eq!(fixture.wallet.uploads(), 3);

        let stored = fixture
            .registry
            .memory()
            .record(&RecordId::new("r1"))
            .unwrap()
            .unwrap();
        for owner in owners {
            assert_eq!(stored.shares_for(&Did::new(owner)).len(), 1);
        }

        let again = sync.sync_new_credential(record, &id()).await;
        assert_eq!(again.failed(), 0);
        assert_eq!(fixture.wallet.uploads(), 3);
    }

    #[tokio::test]
    async fn test_lapsed_policy_makes_no_calls() {
        let fixture = TestFixture::new();
        let record = fixture.add_credential("r1", "lc:cred:abc", "ID");
        fixture.live_grant("did:web:x", "lc:terms:1", lapsed("ID"));

        let report = synchronizer(&fixture, SyncConfig::default())
            .sync_new_credential(record, &id())
            .await;

        assert_eq!(report.skipped(), 1);
        assert_eq!(fixture.wallet.uploads(), 0);
        assert_eq!(fixture.registry.calls().add_credential_to_grant, 0);
    }

    #[tokio::test]
    async fn test_sharing_off_or_selective_is_skipped() {
        let fixture = TestFixture::new();
        let record = fixture.add_credential("r1", "lc:cred:abc", "ID");
        let mut paused = CategoryTerms::share_all();
        paused.sharing = false;
        fixture.live_grant(
            "did:web:x",
            "lc:terms:1",
            SubmittableTerms::new().with_category("ID", paused),
        );
        fixture.live_grant(
            "did:web:y",
            "lc:terms:2",
            SubmittableTerms::new().with_category("ID", CategoryTerms::selected(vec![])),
        );

        let report = synchronizer(&fixture, SyncConfig::default())
            .sync_new_credential(record, &id())
            .await;

        assert_eq!(report.skipped(), 2);
        assert_eq!(fixture.wallet.uploads(), 0);
    }

    #[tokio::test]
    async fn test_one_failing_grant_does_not_block_others() {
        let fixture = TestFixture::new();
        let record = fixture.add_credential("r1", "lc:cred:abc", "ID");
        fixture.live_grant("did:web:a", "lc:terms:1", share_all("ID"));
        fixture.live_grant("did:web:b", "lc:terms:2", share_all("ID"));
        fixture.live_grant("did:web:c", "lc:terms:3", share_all("ID"));
        fixture.registry.fail_adds_for(TermsUri::new("lc:terms:2"));

        let report = synchronizer(&fixture, SyncConfig::default())
            .sync_new_credential(record, &id())
            .await;

        assert_eq!(report.added(), 2);
        assert!(matches!(
            report.outcome(&TermsUri::new("lc:terms:2")),
            Some(GrantOutcome::Failed(_))
        ));
        for uri in ["lc:terms:1", "lc:terms:3"] {
            assert!(matches!(
                report.outcome(&TermsUri::new(uri)),
                Some(GrantOutcome::Added(_))
            ));
        }
        assert_eq!(fixture.wallet.uploads(), 3);
    }

    #[tokio::test]
    async fn test_listing_failure_yields_empty_report() {
        let fixture = TestFixture::new();
        let record = fixture.add_credential("r1", "lc:cred:abc", "ID");
        fixture.registry.fail_listing();

        let report = synchronizer(&fixture, SyncConfig::default())
            .sync_new_credential(record, &id())
            .await;

        assert!(report.grants.is_empty());
        assert!(report.error.is_some());
        assert_eq!(fixture.wallet.uploads(), 0);
    }

    #[tokio::test]
    async fn test_already_listed_share_is_not_re_added() {
        let fixture = TestFixture::new();
        let mut record = CredentialRecord::new("r1", "lc:cred:abc", "ID");
        record.push_share(Did::new("did:web:x"), ShareUri::new("lc:net:enc:9"));
        fixture.registry.memory().insert_record(record.clone()).unwrap();
        fixture.live_grant("did:web:x", "lc:terms:1", share_all_with("ID", &["lc:net:enc:9"]));

        let report = synchronizer(&fixture, SyncConfig::default())
            .sync_new_credential(record, &id())
            .await;

        assert_eq!(
            report.outcome(&TermsUri::new("lc:terms:1")),
            Some(&GrantOutcome::AlreadyListed(ShareUri::new("lc:net:enc:9")))
        );
        assert_eq!(fixture.registry.calls().add_credential_to_grant, 0);
    }

    #[tokio::test]
    async fn test_capped_fan_out_still_reaches_every_grant() {
        let fixture = TestFixture::new();
        let record = fixture.add_credential("r1", "lc:cred:abc", "ID");
        for i in 0..5 {
            fixture.live_grant(&format!("did:web:g{i}"), &format!("lc:terms:{i}"), share_all("ID"));
        }

        let config = SyncConfig {
            max_concurrent_grants: Some(2),
        };
        let report = synchronizer(&fixture, config)
            .sync_new_credential(record, &id())
            .await;

        assert_eq!(report.added(), 5);
    }

    #[tokio::test]
    async fn test_resync_prunes_and_backfills() {
        let fixture = TestFixture::with_page_size(2);
        let mut indexed = CredentialRecord::new("r1", "lc:cred:a", "ID");
        indexed.push_share(Did::new("did:web:x"), ShareUri::new("lc:net:enc:kept"));
        fixture.registry.memory().insert_record(indexed).unwrap();
        fixture.add_credential("r2", "lc:cred:b", "ID");
        fixture.add_credential("r3", "lc:cred:c", "ID");

        let grant = fixture.live_grant(
            "did:web:x",
            "lc:terms:1",
            share_all_with("ID", &["lc:net:enc:kept", "lc:net:enc:stale"]),
        );

        let mut records = BTreeMap::new();
        records.insert(
            id(),
            vec![
                CredentialUri::new("lc:cred:a"),
                CredentialUri::new("lc:cred:b"),
                CredentialUri::new("lc:cred:missing"),
            ],
        );

        let sync = synchronizer(&fixture, SyncConfig::default());
        let outcome = sync.resync_grant(&grant, &records).await.unwrap();

        assert_eq!(outcome.pruned, 1);
        assert_eq!(outcome.added, vec![ShareUri::new("lc:net:enc:1")]);
        assert_eq!(outcome.unresolved, 1);

        let stored = fixture
            .registry
            .memory()
            .grant(&TermsUri::new("lc:terms:1"))
            .unwrap()
            .unwrap();
        assert_eq!(
            stored.terms.terms.category(&id()).unwrap().shared,
            vec![ShareUri::new("lc:net:enc:kept"), ShareUri::new("lc:net:enc:1")]
        );
        let calls = fixture.registry.calls();
        assert_eq!(calls.update_terms, 1);
        assert_eq!(calls.add_credential_to_grant, 1);
    }

    #[tokio::test]
    async fn test_resync_all_isolates_failures() {
        let fixture = TestFixture::new();
        fixture.add_credential("r1", "lc:cred:a", "ID");
        fixture.live_grant("did:web:x", "lc:terms:1", share_all_with("ID", &["lc:net:enc:gone"]));
        fixture.live_grant("did:web:y", "lc:terms:2", share_all("ID"));
        fixture.registry.fail_terms_update_for(TermsUri::new("lc:terms:1"));

        let mut records = BTreeMap::new();
        records.insert(id(), vec![CredentialUri::new("lc:cred:a")]);

        let report = synchronizer(&fixture, SyncConfig::default())
            .resync_all(&records)
            .await;

        assert_eq!(report.grants.len(), 2);
        assert_eq!(report.failed(), 1);
        let second = report
            .grants
            .iter()
            .find(|(uri, _)| uri == &TermsUri::new("lc:terms:2"))
            .map(|(_, r)| r.as_ref().unwrap().added.len());
        assert_eq!(second, Some(1));
    }
}
