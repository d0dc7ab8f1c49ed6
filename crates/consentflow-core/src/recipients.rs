//! Recipient policy for encrypted shares.
//!
//! Some grantees work alongside a cooperating service that must be able to
//! read what is shared with them. The [`RecipientTable`] names those
//! co-recipients; [`RecipientSet`] is the final, de-duplicated list handed
//! to the wallet for one encryption.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::Did;

/// Static mapping from a grantee to the co-recipients it requires.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientTable {
    entries: BTreeMap<Did, Vec<Did>>,
}

impl RecipientTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `co_recipients` alongside `grantee`.
    pub fn with(mut self, grantee: impl Into<Did>, co_recipients: impl IntoIterator<Item = Did>) -> Self {
        self.entries
            .entry(grantee.into())
            .or_default()
            .extend(co_recipients);
        self
    }

    /// Co-recipients for `grantee` (empty if none are configured).
    pub fn augment(&self, grantee: &Did) -> &[Did] {
        self.entries
            .get(grantee)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check every identity in the table parses as a DID.
    pub fn validate(&self) -> Result<()> {
        for (grantee, co_recipients) in &self.entries {
            Did::parse(grantee.as_str())?;
            for did in co_recipients {
                Did::parse(did.as_str())?;
            }
        }
        Ok(())
    }
}

/// Ordered, de-duplicated set of identities one artifact is encrypted for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientSet(Vec<Did>);

impl RecipientSet {
    /// Build the recipient set for `grantee`.
    ///
    /// Order is grantee, then table co-recipients, then `extra`. Blank
    /// identities and repeats are dropped, so the result may be empty.
    pub fn assemble(grantee: &Did, table: &RecipientTable, extra: &[Did]) -> Self {
        let mut dids: Vec<Did> = Vec::new();

        let candidates = std::iter::once(grantee)
            .chain(table.augment(grantee))
            .chain(extra);

        for did in candidates {
            if !did.is_blank() && !dids.contains(did) {
                dids.push(did.clone());
            }
        }

        Self(dids)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, did: &Did) -> bool {
        self.0.contains(did)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Did> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Did] {
        &self.0
    }
}

impl FromIterator<Did> for RecipientSet {
    fn from_iter<I: IntoIterator<Item = Did>>(iter: I) -> Self {
        let mut set = Self(Vec::new());
        for did in iter {
            if !did.is_blank() && !set.0.contains(&did) {
                set.0.push(did);
            }
        }
        set
    }
}
