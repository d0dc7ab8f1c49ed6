//! Proptest generators for property-based testing.

use proptest::prelude::*;

use consentflow_core::{
    Category, CategoryTerms, ConsentTermsDraft, CredentialRecord, CredentialUri, Did, RecordId,
    ShareUri, Terms,
};

/// Generate a `did:web` identity.
pub fn did() -> impl Strategy<Value = Did> {
    "[a-z][a-z0-9]{0,11}".prop_map(|host| Did::new(format!("did:web:{host}")))
}

/// Generate a category name.
pub fn category() -> impl Strategy<Value = Category> {
    prop_oneof![
        Just(Category::new("Achievement")),
        Just(Category::new("ID")),
        Just(Category::new("Skill")),
        Just(Category::new("Learning History")),
    ]
}

/// Generate a plaintext credential reference.
pub fn credential_uri() -> impl Strategy<Value = CredentialUri> {
    "[a-z0-9]{1,12}".prop_map(|id| CredentialUri::new(format!("lc:cred:{id}")))
}

/// Generate a share reference.
pub fn share_uri() -> impl Strategy<Value = ShareUri> {
    (1u32..10_000).prop_map(|n| ShareUri::new(format!("lc:net:enc:{n}")))
}

/// Generate a reasonable timestamp (Unix ms).
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=4_000_000_000_000
}

/// Generate a category policy over `shared` elements.
pub fn category_terms<T: std::fmt::Debug + Clone>(
    shared: impl Strategy<Value = T>,
) -> impl Strategy<Value = CategoryTerms<T>> {
    (
        any::<bool>(),
        any::<bool>(),
        prop::collection::vec(shared, 0..4),
        prop::option::of(timestamp()),
    )
        .prop_map(|(sharing, share_all, shared, share_until)| CategoryTerms {
            sharing,
            share_all,
            shared,
            share_until,
        })
}

/// Generate a consent draft with up to three categories.
pub fn draft() -> impl Strategy<Value = ConsentTermsDraft> {
    (
        did(),
        prop::collection::btree_map(category(), category_terms(credential_uri()), 0..3),
        any::<bool>(),
    )
        .prop_map(|(grantee, categories, anonymize)| {
            let terms = Terms {
                categories,
                anonymize,
                ..Terms::default()
            };
            ConsentTermsDraft::new(grantee, terms)
        })
}

/// Generate a record with some share history for a few grantees.
pub fn record() -> impl Strategy<Value = CredentialRecord> {
    (
        "[a-z0-9]{1,8}",
        credential_uri(),
        category(),
        prop::collection::btree_map(did(), prop::collection::vec(share_uri(), 1..3), 0..3),
    )
        .prop_map(|(id, uri, category, shared_uris)| CredentialRecord {
            id: RecordId::new(id),
            uri,
            category,
            shared_uris,
        })
}
