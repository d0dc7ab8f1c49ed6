//! The engine: one entry point over resolution, consent and grant sync.

use std::collections::BTreeMap;
use std::sync::Arc;

use consentflow_core::{
    Category, ConsentTermsDraft, ContractUri, CredentialRecord, CredentialUri, Did, Grant,
    ShareUri, SubmittableTerms, TermsUri,
};
use consentflow_share::{Materializer, Resolver};
use consentflow_store::{Registry, Wallet};
use consentflow_sync::{GrantResync, GrantSynchronizer, ResyncReport, SyncReport};

use crate::config::EngineConfig;
use crate::error::Result;

/// Consent-governed credential sharing for one wallet.
///
/// Owns the resolver (and with it the index cache), the materializer and the
/// grant synchronizer. All of them share the same wallet and registry.
pub struct ConsentEngine<W, R> {
    wallet: Arc<W>,
    registry: Arc<R>,
    config: EngineConfig,
    resolver: Arc<Resolver<W, R>>,
    materializer: Materializer<W, R>,
    synchronizer: GrantSynchronizer<W, R>,
}

impl<W: Wallet, R: Registry> ConsentEngine<W, R> {
    pub fn new(wallet: Arc<W>, registry: Arc<R>, config: EngineConfig) -> Self {
        let resolver = Arc::new(Resolver::new(
            wallet.clone(),
            registry.clone(),
            config.resolver.clone(),
        ));
        let materializer = Materializer::new(resolver.clone());
        let synchronizer = GrantSynchronizer::new(
            wallet.clone(),
            registry.clone(),
            resolver.clone(),
            config.sync.clone(),
        );

        Self {
            wallet,
            registry,
            config,
            resolver,
            materializer,
            synchronizer,
        }
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn resolver(&self) -> &Resolver<W, R> {
        &self.resolver
    }

    /// The identity the wallet acts as.
    pub fn identity(&self) -> Did {
        self.wallet.current_identity()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sharing
    // ─────────────────────────────────────────────────────────────────────────

    /// The grantee's share of a credential, created on first use.
    pub async fn resolve(
        &self,
        uri: &CredentialUri,
        grantee: &Did,
        category: &Category,
    ) -> Result<ShareUri> {
        Ok(self.resolver.resolve(uri, grantee, category).await?)
    }

    /// Resolve every credential `draft` names, without submitting anything.
    pub async fn materialize(&self, draft: &ConsentTermsDraft) -> Result<SubmittableTerms> {
        Ok(self.materializer.materialize(draft).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Consent
    // ─────────────────────────────────────────────────────────────────────────

    /// Materialize `draft` and consent to `contract` with the result.
    pub async fn submit_consent(
        &self,
        contract: &ContractUri,
        draft: &ConsentTermsDraft,
    ) -> Result<TermsUri> {
        let terms = self.materializer.materialize(draft).await?;
        let terms_uri = self
            .registry
            .submit_consent(contract, &terms, &draft.options)
            .await?;

        tracing::info!(contract = %contract, terms = %terms_uri, grantee = %draft.grantee, "consent submitted");
        self.synchronizer.invalidate_grants().await;
        Ok(terms_uri)
    }

    /// Materialize `draft` and replace the terms of an existing consent.
    pub async fn update_terms(&self, terms_uri: &TermsUri, draft: &ConsentTermsDraft) -> Result<()> {
        let terms = self.materializer.materialize(draft).await?;
        self.registry
            .update_terms(terms_uri, &terms, &draft.options)
            .await?;

        tracing::info!(terms = %terms_uri, grantee = %draft.grantee, "consent terms updated");
        self.synchronizer.invalidate_grants().await;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Grant Sync
    // ─────────────────────────────────────────────────────────────────────────

    /// Push a newly added credential into every live grant that permits it.
    pub async fn sync_new_credential(&self, record: CredentialRecord, category: &Category) -> SyncReport {
        self.synchronizer.sync_new_credential(record, category).await
    }

    /// Prune and back-fill one grant.
    pub async fn resync_grant(
        &self,
        grant: &Grant,
        records_by_category: &BTreeMap<Category, Vec<CredentialUri>>,
    ) -> Result<GrantResync> {
        Ok(self.synchronizer.resync_grant(grant, records_by_category).await?)
    }

    /// Prune and back-fill every live grant.
    pub async fn resync_all(
        &self,
        records_by_category: &BTreeMap<Category, Vec<CredentialUri>>,
    ) -> ResyncReport {
        self.synchronizer.resync_all(records_by_category).await
    }

    /// Forget the cached live-grant listing.
    pub async fn invalidate_grants(&self) {
        self.synchronizer.invalidate_grants().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consentflow_core::{CategoryTerms, Terms};
    use consentflow_testkit::fixtures::share_all;
    use consentflow_testkit::{FakeRegistry, FakeWallet, TestFixture};

    use crate::error::EngineError;

    fn engine(fixture: &TestFixture) -> ConsentEngine<FakeWallet, FakeRegistry> {
        ConsentEngine::new(
            fixture.wallet.clone(),
            fixture.registry.clone(),
            EngineConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_submission_refreshes_live_grants() {
        let fixture = TestFixture::new();
        fixture.add_credential("r1", "lc:cred:a", "ID");
        fixture.contract("lc:contract:1", "did:web:x");
        let engine = engine(&fixture);

        let empty = engine
            .sync_new_credential(CredentialRecord::new("r0", "lc:cred:z", "ID"), &Category::new("ID"))
            .await;
        assert!(empty.grants.is_empty());

        let draft = ConsentTermsDraft::new(
            "did:web:x",
            Terms::new().with_category("ID", CategoryTerms::share_all()),
        );
        engine
            .submit_consent(&ContractUri::new("lc:contract:1"), &draft)
            .await
            .unwrap();

        let record = fixture.add_credential("r2", "lc:cred:b", "ID");
        let report = engine.sync_new_credential(record, &Category::new("ID")).await;
        assert_eq!(report.added(), 1);
    }

    #[tokio::test]
    async fn test_registry_failure_surfaces() {
        let fixture = TestFixture::new();
        fixture.registry.fail_submissions();
        let engine = engine(&fixture);

        let draft = ConsentTermsDraft::new(
            "did:web:x",
            Terms::new().with_category("ID", CategoryTerms::share_all()),
        );
        let err = engine
            .submit_consent(&ContractUri::new("lc:contract:1"), &draft)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Remote(_)));
    }

    #[tokio::test]
    async fn test_update_terms_materializes() {
        let fixture = TestFixture::new();
        fixture.add_credential("r1", "lc:cred:a", "ID");
        let grant = fixture.live_grant("did:web:x", "lc:terms:1", share_all("ID"));
        let engine = engine(&fixture);

        let draft = ConsentTermsDraft::new(
            "did:web:x",
            Terms::new().with_category(
                "ID",
                CategoryTerms::selected(vec![CredentialUri::new("lc:cred:a")]),
            ),
        );
        engine.update_terms(grant.terms_uri(), &draft).await.unwrap();

        let stored = fixture
            .registry
            .memory()
            .grant(grant.terms_uri())
            .unwrap()
            .unwrap();
        let id = stored.terms.terms.category(&Category::new("ID")).unwrap();
        assert!(!id.share_all);
        assert_eq!(id.shared, vec![ShareUri::new("lc:net:enc:1")]);
    }
}
