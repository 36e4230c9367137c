//! External cache of created secrets

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Tag key used to mark remote resources as pending (`false`) or tracked
/// (`true`) when a cache does not supply its own.
pub const DEFAULT_TRACKING_TAG: &str = "pod-orchestration-tracked";

/// A secret recorded in the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretCacheItem {
    /// Remote ID of the secret
    pub id: String,
    /// Friendly name of the secret
    pub name: String,
}

/// External store tracking secrets created by the vault
#[async_trait]
pub trait SecretCache: Send + Sync {
    /// Record a newly created secret
    async fn put(&self, item: SecretCacheItem) -> anyhow::Result<()>;

    /// Forget a deleted secret
    async fn delete(&self, id: &str) -> anyhow::Result<()>;

    /// Tag key marking tracked secrets. An empty string selects
    /// [`DEFAULT_TRACKING_TAG`].
    fn tag(&self) -> String {
        String::new()
    }
}

/// Resolve the tracking tag for an optional cache
pub fn tracking_tag(tag: &str) -> &str {
    if tag.is_empty() {
        DEFAULT_TRACKING_TAG
    } else {
        tag
    }
}
