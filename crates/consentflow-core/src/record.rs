//! Credential records and plaintext credentials.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::{Category, CredentialUri, Did, RecordId, ShareUri};

/// A local index entry for a credential held in the wallet.
///
/// `shared_uris` keeps the full share history per grantee. Only the last
/// element of each list is current; earlier entries are never removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    pub id: RecordId,
    pub uri: CredentialUri,
    pub category: Category,
    #[serde(default)]
    pub shared_uris: BTreeMap<Did, Vec<ShareUri>>,
}

impl CredentialRecord {
    /// Create a record with no share history.
    pub fn new(id: impl Into<RecordId>, uri: impl Into<CredentialUri>, category: impl Into<Category>) -> Self {
        Self {
            id: id.into(),
            uri: uri.into(),
            category: category.into(),
            shared_uris: BTreeMap::new(),
        }
    }

    /// The current share for `grantee`, if one was ever made.
    pub fn current_share(&self, grantee: &Did) -> Option<&ShareUri> {
        self.shared_uris.get(grantee).and_then(|uris| uris.last())
    }

    /// Full share history for `grantee`, oldest first.
    pub fn shares_for(&self, grantee: &Did) -> &[ShareUri] {
        self.shared_uris
            .get(grantee)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether `uri` appears anywhere in the share history for `grantee`.
    pub fn lists_share(&self, grantee: &Did, uri: &str) -> bool {
        self.shares_for(grantee).iter().any(|s| s.as_str() == uri)
    }

    /// Append a new current share for `grantee`.
    pub fn push_share(&mut self, grantee: Did, share: ShareUri) {
        self.shared_uris.entry(grantee).or_default().push(share);
    }

    /// Fold `shared_uris` into this record's history.
    ///
    /// Grantees absent from `shared_uris` are untouched, and shares already
    /// listed keep their position.
    pub fn merge_shares(&mut self, shared_uris: &BTreeMap<Did, Vec<ShareUri>>) {
        for (grantee, shares) in shared_uris {
            let history = self.shared_uris.entry(grantee.clone()).or_default();
            for share in shares {
                if !history.contains(share) {
                    history.push(share.clone());
                }
            }
        }
    }
}

/// A plaintext credential as read from the wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub uri: CredentialUri,
    pub document: serde_json::Value,
}

impl Credential {
    pub fn new(uri: impl Into<CredentialUri>, document: serde_json::Value) -> Self {
        Self {
            uri: uri.into(),
            document,
        }
    }

    /// Serialize the document for encryption.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.document).map_err(|e| CoreError::EncodingError(e.to_string()))
    }

    /// Rebuild a credential from decrypted bytes.
    pub fn from_bytes(uri: impl Into<CredentialUri>, bytes: &[u8]) -> Result<Self> {
        let document =
            serde_json::from_slice(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))?;
        Ok(Self::new(uri, document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_share_is_last() {
        let grantee = Did::new("did:web:x");
        let mut record = CredentialRecord::new("r1", "lc:cred:abc", "Achievement");

        assert!(record.current_share(&grantee).is_none());

        record.push_share(grantee.clone(), ShareUri::new("lc:net:enc:1"));
        record.push_share(grantee.clone(), ShareUri::new("lc:net:enc:2"));

        assert_eq!(
            record.current_share(&grantee),
            Some(&ShareUri::new("lc:net:enc:2"))
        );
        // History is retained.
        assert_eq!(record.shares_for(&grantee).len(), 2);
        assert!(record.lists_share(&grantee, "lc:net:enc:1"));
    }

    #[test]
    fn test_shares_are_per_grantee() {
        let mut record = CredentialRecord::new("r1", "lc:cred:abc", "Achievement");
        record.push_share(Did::new("did:web:x"), ShareUri::new("lc:net:enc:1"));

        assert!(!record.lists_share(&Did::new("did:web:y"), "lc:net:enc:1"));
        assert!(record.shares_for(&Did::new("did:web:y")).is_empty());
    }

    #[test]
    fn test_merge_keeps_other_grantees() {
        let x = Did::new("did:web:x");
        let y = Did::new("did:web:y");
        let mut record = CredentialRecord::new("r1", "lc:cred:abc", "ID");
        record.push_share(x.clone(), ShareUri::new("lc:net:enc:1"));

        let mut incoming = BTreeMap::new();
        incoming.insert(y.clone(), vec![ShareUri::new("lc:net:enc:2")]);
        record.merge_shares(&incoming);

        incoming.insert(
            x.clone(),
            vec![ShareUri::new("lc:net:enc:1"), ShareUri::new("lc:net:enc:3")],
        );
        record.merge_shares(&incoming);

        assert_eq!(
            record.shares_for(&x),
            &[ShareUri::new("lc:net:enc:1"), ShareUri::new("lc:net:enc:3")]
        );
        assert_eq!(record.shares_for(&y), &[ShareUri::new("lc:net:enc:2")]);
    }

    #[test]
    fn test_record_wire_names() {
        let json = serde_json::json!({
            "id": "r1",
            "uri": "lc:cred:abc",
            "category": "ID",
            "sharedUris": { "did:web:x": ["lc:net:enc:1"] }
        });
        let record: CredentialRecord = serde_json::from_value(json).unwrap();
        assert_eq!(
            record.current_share(&Did::new("did:web:x")).map(ShareUri::as_str),
            Some("lc:net:enc:1")
        );

        let bare: CredentialRecord =
            serde_json::from_value(serde_json::json!({"id": "r2", "uri": "u", "category": "ID"}))
                .unwrap();
        assert!(bare.shared_uris.is_empty());
    }

    #[test]
    fn test_credential_bytes() {
        let credential = Credential::new("lc:cred:abc", serde_json::json!({"name": "Badge"}));
        let bytes = credential.to_bytes().unwrap();
        let back = Credential::from_bytes("lc:cred:abc", &bytes).unwrap();
        assert_eq!(credential, back);
    }
}
