//! Process-lifetime cache of the current identity's live grants.

use tokio::sync::Mutex;

use consentflow_core::{Did, Grant};
use consentflow_store::{Registry, Result};

/// Lists live grants once and reuses the answer until invalidated.
#[derive(Default)]
pub struct LiveGrants {
    cached: Mutex<Option<Vec<Grant>>>,
}

impl LiveGrants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live grants of `identity`, listing them remotely on first use.
    ///
    /// Anything the registry returns that is not live is dropped. A failed
    /// listing is not cached.
    pub async fn get<R: Registry + ?Sized>(&self, registry: &R, identity: &Did) -> Result<Vec<Grant>> {
        let mut cached = self.cached.lock().await;
        if let Some(grants) = cached.as_ref() {
            return Ok(grants.clone());
        }

        let grants: Vec<Grant> = registry
            .list_live_grants(identity)
            .await?
            .into_iter()
            .filter(Grant::is_live)
            .collect();
        tracing::debug!(identity = %identity, grants = grants.len(), "listed live grants");

        *cached = Some(grants.clone());
        Ok(grants)
    }

    /// Forget the cached listing.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}
