//! Local snapshot of the paginated credential index.
//!
//! The cache holds, per category, every page fetched so far in fetch order
//! plus the cursor marking how far the remote index has been consumed (the
//! frontier). It is authoritative for everything it has seen: a page that
//! is in the cache is never fetched again, and the frontier only moves
//! forward.
//!
//! The cache has a single writer, the resolver. It has no locking of its
//! own; the owner wraps it as needed.

use std::collections::{BTreeMap, HashMap};

use consentflow_core::{Category, CredentialRecord, CredentialUri, Cursor, Did, RecordId, ShareUri};

use crate::traits::IndexPage;

/// How far the remote index has been consumed for one category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Frontier {
    /// Nothing fetched yet.
    #[default]
    Start,
    /// More pages remain after this cursor.
    At(Cursor),
    /// The remote index reported no further pages.
    Exhausted,
}

impl Frontier {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Frontier::Exhausted)
    }

    /// Cursor to pass to the next fetch. `None` both at the start and once
    /// exhausted; check [`is_exhausted`](Self::is_exhausted) first.
    pub fn cursor(&self) -> Option<&Cursor> {
        match self {
            Frontier::At(cursor) => Some(cursor),
            _ => None,
        }
    }
}

/// Which part of a category's cache a lookup covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every fetched page plus locally admitted records.
    All,
    /// Fetched pages with index `>= n` only.
    PagesFrom(usize),
}

/// Outcome of looking a credential up in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// A record for the credential is cached.
    Record(CredentialRecord),
    /// No record has this uri, but one lists it as a share for the grantee.
    AlreadyShared(ShareUri),
    /// Nothing in scope matches.
    Miss,
}

/// Cached pages for one category.
#[derive(Debug, Clone, Default)]
pub struct CategoryIndex {
    pages: Vec<Vec<CredentialRecord>>,
    /// Records admitted locally that no fetched page has contained yet.
    local: Vec<CredentialRecord>,
    frontier: Frontier,
}

impl CategoryIndex {
    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[Vec<CredentialRecord>] {
        &self.pages
    }

    /// Every cached record, fetched pages first.
    pub fn records(&self) -> impl Iterator<Item = &CredentialRecord> {
        self.pages.iter().flatten().chain(self.local.iter())
    }

    fn scoped(&self, scope: Scope) -> Box<dyn Iterator<Item = &CredentialRecord> + '_> {
        match scope {
            Scope::All => Box::new(self.records()),
            Scope::PagesFrom(n) => Box::new(self.pages.iter().skip(n).flatten()),
        }
    }

    /// Look up `uri` for `grantee` within `scope`.
    ///
    /// A record whose own uri matches wins over a record that merely lists
    /// `uri` as one of its shares.
    pub fn lookup(&self, scope: Scope, uri: &CredentialUri, grantee: &Did) -> Lookup {
        if let Some(record) = self.scoped(scope).find(|r| &r.uri == uri) {
            return Lookup::Record(record.clone());
        }

        if self
            .scoped(scope)
            .any(|r| r.lists_share(grantee, uri.as_str()))
        {
            return Lookup::AlreadyShared(uri.as_share());
        }

        Lookup::Miss
    }

    /// Append a freshly fetched page and advance the frontier.
    ///
    /// Locally admitted records that show up in the page move to their
    /// fetched position; share history only known locally is kept.
    pub fn push_page(&mut self, page: IndexPage) {
        let frontier = match page.continuation() {
            Some(cursor) => Frontier::At(cursor.clone()),
            None => {
                if page.has_more {
                    tracing::warn!("index page reported more results without a cursor");
                }
                Frontier::Exhausted
            }
        };

        let mut records = page.records;
        for record in &mut records {
            if let Some(pos) = self.local.iter().position(|l| l.id == record.id) {
                let local = self.local.remove(pos);
                record.merge_shares(&local.shared_uris);
            }
        }

        self.pages.push(records);
        self.frontier = frontier;
    }

    /// Make a record visible without fetching it. No-op if already cached.
    pub fn admit(&mut self, record: CredentialRecord) -> bool {
        if self.records().any(|r| r.id == record.id) {
            return false;
        }
        self.local.push(record);
        true
    }

    /// Merge `shared_uris` into every cached copy of `id`, per grantee.
    ///
    /// Returns false if the record is not cached.
    pub fn mirror_shares(&mut self, id: &RecordId, shared_uris: &BTreeMap<Did, Vec<ShareUri>>) -> bool {
        let mut found = false;
        for record in self.pages.iter_mut().flatten().chain(self.local.iter_mut()) {
            if &record.id == id {
                record.merge_shares(shared_uris);
                found = true;
            }
        }
        found
    }

    /// The cached record with `id`.
    pub fn record(&self, id: &RecordId) -> Option<&CredentialRecord> {
        self.records().find(|r| &r.id == id)
    }

    /// Every share any cached record lists for `grantee`.
    pub fn shares_for(&self, grantee: &Did) -> Vec<ShareUri> {
        self.records()
            .flat_map(|r| r.shares_for(grantee).iter().cloned())
            .collect()
    }
}

/// Per-category cache of the remote credential index.
#[derive(Debug, Default)]
pub struct IndexCache {
    categories: HashMap<Category, CategoryIndex>,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(&self, category: &Category) -> Option<&CategoryIndex> {
        self.categories.get(category)
    }

    pub fn category_mut(&mut self, category: &Category) -> &mut CategoryIndex {
        self.categories.entry(category.clone()).or_default()
    }

    /// Total pages fetched across all categories.
    pub fn pages_fetched(&self) -> usize {
        self.categories.values().map(CategoryIndex::page_count).sum()
    }
}
