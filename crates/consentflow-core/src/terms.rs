//! Consent terms: per-category sharing policy.
//!
//! The same shape is used twice. A [`ConsentTermsDraft`] holds plaintext
//! credential references the user intends to expose; once every reference
//! has been resolved to an encrypted share the document becomes
//! [`SubmittableTerms`]. The element type of `shared` keeps the two apart.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Category, CredentialUri, Did, ShareUri};

/// Sharing policy for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTerms<T> {
    #[serde(default)]
    pub sharing: bool,

    #[serde(default)]
    pub share_all: bool,

    #[serde(default = "Vec::new")]
    pub shared: Vec<T>,

    /// Automatic sharing stops at this instant (Unix milliseconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_until: Option<i64>,
}

impl<T> Default for CategoryTerms<T> {
    fn default() -> Self {
        Self {
            sharing: false,
            share_all: false,
            shared: Vec::new(),
            share_until: None,
        }
    }
}

impl<T> CategoryTerms<T> {
    /// Policy that shares everything in the category until revoked.
    pub fn share_all() -> Self {
        Self {
            sharing: true,
            share_all: true,
            ..Self::default()
        }
    }

    /// Policy that shares only the listed items.
    pub fn selected(shared: Vec<T>) -> Self {
        Self {
            sharing: true,
            share_all: false,
            shared,
            share_until: None,
        }
    }

    /// Stop automatic sharing at `timestamp` (Unix ms).
    pub fn until(mut self, timestamp: i64) -> Self {
        self.share_until = Some(timestamp);
        self
    }

    /// Whether new credentials in this category may be shared automatically.
    pub fn permits_auto_share(&self, now: i64) -> bool {
        self.share_all && self.sharing && self.share_until.map_or(true, |until| until > now)
    }

    /// Same policy with a different `shared` list.
    pub fn with_shared<U>(&self, shared: Vec<U>) -> CategoryTerms<U> {
        CategoryTerms {
            sharing: self.sharing,
            share_all: self.share_all,
            shared,
            share_until: self.share_until,
        }
    }
}

/// A consent terms document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Terms<T> {
    #[serde(default = "BTreeMap::new")]
    pub categories: BTreeMap<Category, CategoryTerms<T>>,

    #[serde(default)]
    pub anonymize: bool,

    /// Personal fields shared verbatim (e.g. `name` -> `Ada`).
    #[serde(default)]
    pub personal: BTreeMap<String, String>,
}

impl<T> Default for Terms<T> {
    fn default() -> Self {
        Self {
            categories: BTreeMap::new(),
            anonymize: false,
            personal: BTreeMap::new(),
        }
    }
}

impl<T> Terms<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the policy for a category.
    pub fn with_category(mut self, category: impl Into<Category>, terms: CategoryTerms<T>) -> Self {
        self.categories.insert(category.into(), terms);
        self
    }

    pub fn category(&self, category: &Category) -> Option<&CategoryTerms<T>> {
        self.categories.get(category)
    }

    /// Whether `category` currently permits automatic sharing.
    pub fn permits_auto_share(&self, category: &Category, now: i64) -> bool {
        self.categories
            .get(category)
            .is_some_and(|terms| terms.permits_auto_share(now))
    }

    /// Same document with every category rebuilt by `f`.
    pub fn map_categories<U>(
        &self,
        mut f: impl FnMut(&Category, &CategoryTerms<T>) -> CategoryTerms<U>,
    ) -> Terms<U> {
        Terms {
            categories: self
                .categories
                .iter()
                .map(|(category, terms)| (category.clone(), f(category, terms)))
                .collect(),
            anonymize: self.anonymize,
            personal: self.personal.clone(),
        }
    }
}

/// Terms whose `shared` lists hold resolved encrypted references.
pub type SubmittableTerms = Terms<ShareUri>;

/// Options that travel with a consent submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentOptions {
    /// When the whole consent lapses (Unix ms).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,

    /// Share once instead of keeping the grant live.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_time: Option<bool>,
}

/// User-authored consent intent, prior to resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentTermsDraft {
    /// The identity the user consents to share with.
    pub grantee: Did,

    pub terms: Terms<CredentialUri>,

    #[serde(default)]
    pub options: ConsentOptions,
}

impl ConsentTermsDraft {
    pub fn new(grantee: impl Into<Did>, terms: Terms<CredentialUri>) -> Self {
        Self {
            grantee: grantee.into(),
            terms,
            options: ConsentOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ConsentOptions) -> Self {
        self.options = options;
        self
    }
}
