//! Consent terms materialization.
//!
//! Turns a [`ConsentTermsDraft`], whose `shared` lists name plaintext
//! credentials, into [`SubmittableTerms`] whose `shared` lists name the
//! grantee's encrypted shares. Credentials that cannot be resolved are left
//! out with a warning; partial consent beats blocked consent.

use std::sync::Arc;

use futures::future::join_all;

use consentflow_core::{
    validate_draft, Category, CategoryTerms, ConsentTermsDraft, CredentialUri, ShareUri,
    SubmittableTerms,
};
use consentflow_store::{Registry, Wallet};

use crate::error::{Result, ShareError};
use crate::resolver::Resolver;

/// Resolves every credential a draft declares.
pub struct Materializer<W, R> {
    resolver: Arc<Resolver<W, R>>,
}

impl<W: Wallet, R: Registry> Materializer<W, R> {
    pub fn new(resolver: Arc<Resolver<W, R>>) -> Self {
        Self { resolver }
    }

    /// Resolve `draft` into terms ready for submission.
    ///
    /// Fails only if the draft itself is invalid. Never calls the registry's
    /// consent operations.
    pub async fn materialize(&self, draft: &ConsentTermsDraft) -> Result<SubmittableTerms> {
        validate_draft(draft).map_err(|e| ShareError::InvalidDraft(e.to_string()))?;

        let resolved = join_all(
            draft
                .terms
                .categories
                .iter()
                .map(|(category, terms)| self.materialize_category(draft, category, terms)),
        )
        .await;

        Ok(SubmittableTerms {
            categories: draft.terms.categories.keys().cloned().zip(resolved).collect(),
            anonymize: draft.terms.anonymize,
            personal: draft.terms.personal.clone(),
        })
    }

    async fn materialize_category(
        &self,
        draft: &ConsentTermsDraft,
        category: &Category,
        terms: &CategoryTerms<CredentialUri>,
    ) -> CategoryTerms<ShareUri> {
        let grantee = &draft.grantee;
        let results = join_all(
            terms
                .shared
                .iter()
                .map(|uri| self.resolver.resolve(uri, grantee, category)),
        )
        .await;

        let mut shared: Vec<ShareUri> = Vec::with_capacity(results.len());
        for (uri, result) in terms.shared.iter().zip(results) {
            match result {
                Ok(share) if !shared.contains(&share) => shared.push(share),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        credential = %uri,
                        grantee = %grantee,
                        category = %category,
                        error = %e,
                        "dropping credential from consent terms"
                    );
                }
            }
        }

        terms.with_shared(shared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consentflow_core::{ConsentOptions, Did, Terms};
    use consentflow_testkit::{generators, FakeRegistry, FakeWallet, TestFixture};
    use proptest::prelude::*;

    use crate::resolver::ResolverConfig;

    fn materializer(fixture: &TestFixture) -> Materializer<FakeWallet, FakeRegistry> {
        Materializer::new(Arc::new(Resolver::new(
            fixture.wallet.clone(),
            fixture.registry.clone(),
            ResolverConfig::default(),
        )))
    }

    fn uris(values: &[&str]) -> Vec<CredentialUri> {
        values.iter().map(|v| CredentialUri::new(*v)).collect()
    }

    #[tokio::test]
    async fn test_materialize_resolves_and_carries_fields() {
        let fixture = TestFixture::new();
        fixture.add_credential("r1", "lc:cred:a", "Achievement");
        fixture.add_credential("r2", "lc:cred:b", "Achievement");
        fixture.add_credential("r3", "lc:cred:c", "ID");

        let mut terms = Terms::new()
            .with_category(
                "Achievement",
                CategoryTerms::selected(uris(&["lc:cred:a", "lc:cred:b"])),
            )
            .with_category(
                "ID",
                CategoryTerms::share_all().until(1_900_000_000_000),
            );
        terms.anonymize = true;
        terms.personal.insert("name".into(), "Ada".into());
        if let Some(id) = terms.categories.get_mut(&Category::new("ID")) {
            id.shared = uris(&["lc:cred:c"]);
        }
        let draft = ConsentTermsDraft::new("did:web:x", terms).with_options(ConsentOptions {
            expires_at: Some(1_900_000_000_000),
            one_time: None,
        });

        let submittable = materializer(&fixture).materialize(&draft).await.unwrap();

        let achievement = submittable.category(&Category::new("Achievement")).unwrap();
        assert_eq!(achievement.shared.len(), 2);
        assert!(achievement.sharing && !achievement.share_all);

        let id = submittable.category(&Category::new("ID")).unwrap();
        assert_eq!(id.shared.len(), 1);
        assert_eq!(id.share_until, Some(1_900_000_000_000));
        assert!(submittable.anonymize);
        assert_eq!(submittable.personal.get("name").map(String::as_str), Some("Ada"));

        assert_eq!(fixture.wallet.uploads(), 3);
        let calls = fixture.registry.calls();
        assert_eq!(calls.submit_consent, 0);
        assert_eq!(calls.update_terms, 0);
    }

    #[tokio::test]
    async fn test_failures_are_dropped() {
        let fixture = TestFixture::new();
        fixture.add_credential("r1", "lc:cred:a", "ID");

        let draft = ConsentTermsDraft::new(
            "did:web:x",
            Terms::new().with_category(
                "ID",
                CategoryTerms::selected(uris(&["lc:cred:missing", "lc:cred:a"])),
            ),
        );

        let submittable = materializer(&fixture).materialize(&draft).await.unwrap();
        let shared = &submittable.category(&Category::new("ID")).unwrap().shared;
        assert_eq!(shared, &vec![ShareUri::new("lc:net:enc:1")]);
    }

    #[tokio::test]
    async fn test_duplicates_collapse() {
        let fixture = TestFixture::new();
        fixture.add_credential("r1", "lc:cred:a", "ID");

        let draft = ConsentTermsDraft::new(
            "did:web:x",
            Terms::new().with_category(
                "ID",
                CategoryTerms::selected(uris(&["lc:cred:a", "lc:cred:a"])),
            ),
        );

        let submittable = materializer(&fixture).materialize(&draft).await.unwrap();
        assert_eq!(
            submittable.category(&Category::new("ID")).unwrap().shared.len(),
            1
        );
        assert_eq!(fixture.wallet.uploads(), 1);
    }

    #[tokio::test]
    async fn test_invalid_draft_rejected() {
        let fixture = TestFixture::new();
        let draft = ConsentTermsDraft::new(
            "not-a-did",
            Terms::new().with_category("ID", CategoryTerms::share_all()),
        );

        let err = materializer(&fixture).materialize(&draft).await.unwrap_err();
        assert!(matches!(err, ShareError::InvalidDraft(_)));

        let blank_category = ConsentTermsDraft::new(
            Did::new("did:web:x"),
            Terms::new().with_category("", CategoryTerms::share_all()),
        );
        assert!(materializer(&fixture).materialize(&blank_category).await.is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        // With nothing indexed every resolution fails, so only the shape survives.
        #[test]
        fn materialize_preserves_policy_fields(draft in generators::draft()) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let fixture = TestFixture::new();
            let submittable = runtime
                .block_on(materializer(&fixture).materialize(&draft))
                .unwrap();

            prop_assert_eq!(submittable.anonymize, draft.terms.anonymize);
            prop_assert_eq!(submittable.categories.len(), draft.terms.categories.len());
            for (category, terms) in &draft.terms.categories {
                let out = submittable.category(category).unwrap();
                prop_assert_eq!(out.sharing, terms.sharing);
                prop_assert_eq!(out.share_all, terms.share_all);
                prop_assert_eq!(out.share_until, terms.share_until);
                prop_assert!(out.shared.is_empty());
            }
        }
    }
}
