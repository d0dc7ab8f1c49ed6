//! Strong type definitions for Consentflow.
//!
//! Every identifier that crosses a collaborator boundary is a newtype over a
//! string so that a credential URI can never be passed where a share URI is
//! expected.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw string.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the raw string.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True when the underlying string is empty (or only whitespace).
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }

            /// Consume and return the raw string.
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:?})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// A decentralized identifier (`did:<method>:<id>`).
    Did
);

string_id!(
    /// Opaque local key of a credential record in the index.
    RecordId
);

string_id!(
    /// Content reference to a credential held by the wallet.
    CredentialUri
);

string_id!(
    /// Reference to an encrypted artifact derived from one credential for
    /// one grantee. Immutable once created.
    ShareUri
);

string_id!(
    /// Coarse classification tag, e.g. `Achievement` or `ID`.
    Category
);

string_id!(
    /// Reference to a consent contract template.
    ContractUri
);

string_id!(
    /// Reference to one user's consent instance for a contract.
    TermsUri
);

string_id!(
    /// Remote pagination cursor.
    Cursor
);

impl Did {
    /// Parse and validate a DID.
    ///
    /// Only the generic shape is checked: the `did` scheme, a non-empty
    /// lowercase alphanumeric method, and a non-empty method-specific id.
    pub fn parse(value: &str) -> Result<Self> {
        let mut parts = value.splitn(3, ':');
        let scheme = parts.next().unwrap_or_default();
        let method = parts.next().unwrap_or_default();
        let id = parts.next().unwrap_or_default();

        let method_ok = !method.is_empty()
            && method
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());

        if scheme != "did" || !method_ok || id.is_empty() {
            return Err(CoreError::InvalidDid(value.to_owned()));
        }

        Ok(Self(value.to_owned()))
    }

    /// The DID method, e.g. `web` for `did:web:example.com`.
    pub fn method(&self) -> Option<&str> {
        self.0.split(':').nth(1)
    }
}

impl CredentialUri {
    /// View this credential reference as a share reference.
    ///
    /// Used when the caller handed the resolver something that is already
    /// an encrypted share.
    pub fn as_share(&self) -> ShareUri {
        ShareUri(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_did_parse() {
        let did = Did::parse("did:web:example.com").unwrap();
        assert_eq!(did.method(), Some("web"));

        let did = Did::parse("did:key:z6Mk:with:colons").unwrap();
        assert_eq!(did.as_str(), "did:key:z6Mk:with:colons");
    }

    #[test]
    fn test_did_parse_rejects_malformed() {
        assert!(Did::parse("").is_err());
        assert!(Did::parse("did:").is_err());
        assert!(Did::parse("did:web:").is_err());
        assert!(Did::parse("dad:web:x").is_err());
        assert!(Did::parse("did:WEB:x").is_err());
    }

    #[test]
    fn test_blank_ids() {
        assert!(Did::new("").is_blank());
        assert!(Did::new("  ").is_blank());
        assert!(!Did::new("did:web:x").is_blank());
    }

    #[test]
    fn test_serde_is_transparent() {
        let uri = ShareUri::new("lc:net:enc:1");
        let json = serde_json::to_string(&uri).unwrap();
        assert_eq!(json, "\"lc:net:enc:1\"");
    }
}
