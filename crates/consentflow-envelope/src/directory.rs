//! Agreement keys of known identities.

use std::collections::HashMap;
use std::sync::RwLock;

use consentflow_core::Did;

use crate::error::{EnvelopeError, Result};
use crate::keys::AgreementPublicKey;

/// Maps identities to the X25519 keys credentials are sealed to.
#[derive(Default)]
pub struct KeyDirectory {
    keys: RwLock<HashMap<Did, AgreementPublicKey>>,
}

impl KeyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish (or replace) the agreement key of `did`.
    pub fn register(&self, did: Did, key: AgreementPublicKey) -> Result<()> {
        let mut keys = self
            .keys
            .write()
            .map_err(|_| EnvelopeError::Unavailable("key directory lock poisoned".into()))?;
        keys.insert(did, key);
        Ok(())
    }

    /// The agreement key of `did`.
    pub fn lookup(&self, did: &Did) -> Result<AgreementPublicKey> {
        let keys = self
            .keys
            .read()
            .map_err(|_| EnvelopeError::Unavailable("key directory lock poisoned".into()))?;
        keys.get(did)
            .copied()
            .ok_or_else(|| EnvelopeError::UnknownRecipient(did.clone()))
    }

    /// Keys for every identity in `dids`, in order. Fails on the first unknown one.
    pub fn resolve_all<'a>(
        &self,
        dids: impl IntoIterator<Item = &'a Did>,
    ) -> Result<Vec<(Did, AgreementPublicKey)>> {
        dids.into_iter()
            .map(|did| Ok((did.clone(), self.lookup(did)?)))
            .collect()
    }
}
