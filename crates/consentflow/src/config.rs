//! Engine configuration.

use serde::{Deserialize, Serialize};

use consentflow_core::Did;
use consentflow_share::ResolverConfig;
use consentflow_sync::SyncConfig;

use crate::error::{EngineError, Result};

/// Configuration for the [`ConsentEngine`](crate::ConsentEngine).
///
/// ```json
/// {
///   "resolver": {
///     "augmentation": { "did:web:employer": ["did:web:employer-verifier"] },
///     "extraRecipients": []
///   },
///   "sync": { "maxConcurrentGrants": 8 }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Recipient policy for new shares.
    pub resolver: ResolverConfig,
    /// Grant fan-out settings.
    pub sync: SyncConfig,
}

impl EngineConfig {
    /// Parse a JSON configuration and validate every identity it names.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every DID in the augmentation table and the extra recipients.
    pub fn validate(&self) -> Result<()> {
        self.resolver
            .augmentation
            .validate()
            .map_err(|e| EngineError::Config(e.to_string()))?;
        for did in &self.resolver.extra_recipients {
            Did::parse(did.as_str()).map_err(|e| EngineError::Config(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.resolver.augmentation.is_empty());
        assert_eq!(config.sync.max_concurrent_grants, None);
    }

    #[test]
    fn test_full_config() {
        let config = EngineConfig::from_json(
            r#"{
                "resolver": {
                    "augmentation": { "did:web:employer": ["did:web:verifier"] },
                    "extraRecipients": ["did:key:z6Mkaudit"]
                },
                "sync": { "maxConcurrentGrants": 4 }
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.resolver.augmentation.augment(&Did::new("did:web:employer")),
            &[Did::new("did:web:verifier")]
        );
        assert_eq!(config.resolver.extra_recipients, vec![Did::new("did:key:z6Mkaudit")]);
        assert_eq!(config.sync.max_concurrent_grants, Some(4));
    }

    #[test]
    fn test_invalid_identities_rejected() {
        let bad_table = r#"{ "resolver": { "augmentation": { "did:web:x": ["verifier"] } } }"#;
        assert!(matches!(
            EngineConfig::from_json(bad_table),
            Err(EngineError::Config(_))
        ));

        let bad_extra = r#"{ "resolver": { "extraRecipients": ["did::x"] } }"#;
        assert!(matches!(
            EngineConfig::from_json(bad_extra),
            Err(EngineError::Config(_))
        ));

        assert!(matches!(
            EngineConfig::from_json("not json"),
            Err(EngineError::Config(_))
        ));
    }
}
