//! Grants as reported by the contract registry.
//!
//! A grant pairs a contract template with one user's consent instance. The
//! engine never mutates grants; it reads them to decide where new
//! credentials should flow.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::terms::SubmittableTerms;
use crate::types::{Category, ContractUri, Did, TermsUri};

/// Lifecycle state of a consent instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermsStatus {
    Live,
    Revoked,
    Expired,
}

/// What a contract asks for in one category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCategory {
    pub required: bool,
    #[serde(default)]
    pub default_enabled: bool,
}

/// A consent contract template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub uri: ContractUri,
    /// The grantee: everything shared under this contract is encrypted for
    /// this identity.
    pub owner: Did,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub categories: BTreeMap<Category, ContractCategory>,
}

/// One user's consent instance for a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantTerms {
    pub uri: TermsUri,
    pub status: TermsStatus,
    pub terms: SubmittableTerms,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_time: Option<bool>,
}

/// A consented contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub contract: Contract,
    pub terms: GrantTerms,
}

impl Grant {
    /// The identity shares are encrypted for.
    pub fn owner(&self) -> &Did {
        &self.contract.owner
    }

    pub fn terms_uri(&self) -> &TermsUri {
        &self.terms.uri
    }

    pub fn is_live(&self) -> bool {
        self.terms.status == TermsStatus::Live
    }

    /// Whether a new credential in `category` should be pushed to this grant.
    pub fn permits_auto_share(&self, category: &Category, now: i64) -> bool {
        self.is_live() && self.terms.terms.permits_auto_share(category, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terms::CategoryTerms;

    fn grant(status: TermsStatus) -> Grant {
        Grant {
            contract: Contract {
                uri: ContractUri::new("lc:contract:1"),
                owner: Did::new("did:web:x"),
                name: "Test".into(),
                categories: BTreeMap::new(),
            },
            terms: GrantTerms {
                uri: TermsUri::new("lc:terms:1"),
                status,
                terms: SubmittableTerms::new().with_category("ID", CategoryTerms::share_all()),
                expires_at: None,
                one_time: None,
            },
        }
    }

    #[test]
    fn test_only_live_grants_share() {
        let id = Category::new("ID");
        assert!(grant(TermsStatus::Live).permits_auto_share(&id, 0));
        assert!(!grant(TermsStatus::Revoked).permits_auto_share(&id, 0));
        assert!(!grant(TermsStatus::Expired).permits_auto_share(&id, 0));
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&TermsStatus::Live).unwrap();
        assert_eq!(json, "\"live\"");
    }
}
