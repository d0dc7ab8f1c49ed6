//! Outcomes of sync and resync passes.

use consentflow_core::{Did, ShareUri, TermsUri};

/// What happened to one grant during a sync pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantOutcome {
    /// The share was pushed into the grant.
    Added(ShareUri),
    /// The grant already lists the share; nothing was sent.
    AlreadyListed(ShareUri),
    /// The category policy does not permit automatic sharing right now.
    Skipped,
    /// Resolution or the registry write failed.
    Failed(String),
}

/// One grant's line in a [`SyncReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantSync {
    pub terms_uri: TermsUri,
    pub grantee: Did,
    pub outcome: GrantOutcome,
}

/// Result of syncing one new credential into every live grant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// One entry per live grant, in listing order.
    pub grants: Vec<GrantSync>,
    /// Set when the live grants could not be listed at all.
    pub error: Option<String>,
}

impl SyncReport {
    pub(crate) fn listing_failed(error: String) -> Self {
        Self {
            grants: Vec::new(),
            error: Some(error),
        }
    }

    fn count(&self, f: impl Fn(&GrantOutcome) -> bool) -> usize {
        self.grants.iter().filter(|g| f(&g.outcome)).count()
    }

    pub fn added(&self) -> usize {
        self.count(|o| matches!(o, GrantOutcome::Added(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, GrantOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, GrantOutcome::Failed(_)))
    }

    /// The outcome recorded for `terms_uri`.
    pub fn outcome(&self, terms_uri: &TermsUri) -> Option<&GrantOutcome> {
        self.grants
            .iter()
            .find(|g| &g.terms_uri == terms_uri)
            .map(|g| &g.outcome)
    }
}

/// Result of resyncing one grant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantResync {
    /// Stale references removed from the grant's terms.
    pub pruned: usize,
    /// Shares pushed into the grant.
    pub added: Vec<ShareUri>,
    /// Credentials that could not be resolved.
    pub unresolved: usize,
}

/// Result of resyncing every live grant.
#[derive(Debug, Default)]
pub struct ResyncReport {
    /// Per grant: the resync summary, or why it was abandoned.
    pub grants: Vec<(TermsUri, Result<GrantResync, String>)>,
    /// Set when the live grants could not be listed at all.
    pub error: Option<String>,
}

impl ResyncReport {
    pub fn failed(&self) -> usize {
        self.grants.iter().filter(|(_, r)| r.is_err()).count()
    }
}
