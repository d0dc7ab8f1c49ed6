//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use consentflow_core::{
    now_millis, Category, CategoryTerms, Contract, ContractUri, CredentialRecord, Did, Grant,
    GrantTerms, ShareUri, SubmittableTerms, TermsStatus, TermsUri,
};
use consentflow_store::{MemoryRegistry, DEFAULT_PAGE_SIZE};

use crate::fakes::{FakeRegistry, FakeWallet};

/// Identity of the wallet holder in every fixture.
pub const HOLDER: &str = "did:web:holder";

/// One day in milliseconds.
pub const DAY: i64 = 86_400_000;

/// A holder with a fake wallet and a fake registry.
pub struct TestFixture {
    pub holder: Did,
    pub wallet: Arc<FakeWallet>,
    pub registry: Arc<FakeRegistry>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Registry serving `page_size` records per index page.
    pub fn with_page_size(page_size: usize) -> Self {
        Self::with_wallet(FakeWallet::new(HOLDER), page_size)
    }

    pub fn with_wallet(wallet: FakeWallet, page_size: usize) -> Self {
        let memory = MemoryRegistry::with_page_size(page_size);
        let holder = Did::new(HOLDER);
        let _ = memory.sign_in(holder.clone());
        Self {
            holder,
            wallet: Arc::new(wallet),
            registry: Arc::new(FakeRegistry::new(memory)),
        }
    }

    /// Index a credential remotely and hold its plaintext.
    pub fn add_credential(&self, id: &str, uri: &str, category: &str) -> CredentialRecord {
        let record = CredentialRecord::new(id, uri, category);
        let _ = self.registry.memory().insert_record(record.clone());
        self.wallet.hold(uri);
        record
    }

    /// Index `count` credentials `lc:cred:0..count` in `category`.
    pub fn add_credentials(&self, count: usize, category: &str) -> Vec<CredentialRecord> {
        (0..count)
            .map(|i| self.add_credential(&format!("r{i}"), &format!("lc:cred:{i}"), category))
            .collect()
    }

    /// Register a live grant of the holder with `owner`.
    pub fn live_grant(&self, owner: &str, terms_uri: &str, terms: SubmittableTerms) -> Grant {
        let grant = grant(owner, terms_uri, terms);
        let _ = self
            .registry
            .memory()
            .insert_grant(self.holder.clone(), grant.clone());
        grant
    }

    /// Register a contract the holder can consent to.
    pub fn contract(&self, uri: &str, owner: &str) -> Contract {
        let contract = contract(uri, owner);
        let _ = self.registry.memory().insert_contract(contract.clone());
        contract
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A contract template with no category requirements.
pub fn contract(uri: &str, owner: &str) -> Contract {
    Contract {
        uri: ContractUri::new(uri),
        owner: Did::new(owner),
        name: format!("Contract {uri}"),
        categories: BTreeMap::new(),
    }
}

/// A live grant with `owner` as grantee.
pub fn grant(owner: &str, terms_uri: &str, terms: SubmittableTerms) -> Grant {
    Grant {
        contract: contract(&format!("lc:contract:{terms_uri}"), owner),
        terms: GrantTerms {
            uri: TermsUri::new(terms_uri),
            status: TermsStatus::Live,
            terms,
            expires_at: None,
            one_time: None,
        },
    }
}

/// Terms sharing everything in `category`.
pub fn share_all(category: &str) -> SubmittableTerms {
    SubmittableTerms::new().with_category(category, CategoryTerms::share_all())
}

/// Terms sharing everything in `category` with some shares already listed.
pub fn share_all_with(category: &str, shared: &[&str]) -> SubmittableTerms {
    let mut terms = CategoryTerms::share_all();
    terms.shared = shared.iter().map(|s| ShareUri::new(*s)).collect();
    SubmittableTerms::new().with_category(category, terms)
}

/// Terms whose automatic sharing for `category` lapsed a day ago.
pub fn lapsed(category: &str) -> SubmittableTerms {
    SubmittableTerms::new().with_category(
        category,
        CategoryTerms::share_all().until(now_millis() - DAY),
    )
}

pub fn category(name: &str) -> Category {
    Category::new(name)
}
