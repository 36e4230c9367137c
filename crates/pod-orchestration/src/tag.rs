//! Discovery of resources by tag
//!
//! Resources created through a cached manager or vault are tagged pending
//! until the cache has recorded them. [`find_untracked_resources`] lists the
//! ones still pending so an external sweep can reconcile them.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Resource type filter for pod definitions
pub const RESOURCE_TYPE_TASK_DEFINITION: &str = "ecs:task-definition";
/// Resource type filter for secrets
pub const RESOURCE_TYPE_SECRET: &str = "secretsmanager:secret";

/// Match resources carrying `key` with any of `values`.
/// An empty `values` matches any value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFilter {
    /// Tag key
    pub key: String,
    /// Accepted values
    pub values: Vec<String>,
}

/// Query for tagged resources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetResourcesInput {
    /// Resource types to include, e.g. [`RESOURCE_TYPE_SECRET`]
    pub resource_type_filters: Vec<String>,
    /// Every filter must match
    pub tag_filters: Vec<TagFilter>,
}

/// A resource and its tags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTagMapping {
    /// Resource ARN
    pub resource_arn: String,
    /// Tags on the resource
    pub tags: HashMap<String, String>,
}

/// Client for looking up resources by tag
#[async_trait]
pub trait TagClient: Send + Sync {
    /// List resources matching the input
    async fn get_resources(&self, input: GetResourcesInput) -> Result<Vec<ResourceTagMapping>>;
}

/// IDs of resources of `resource_type` whose `tag` is still `false`
pub async fn find_untracked_resources(
    client: &dyn TagClient,
    resource_type: &str,
    tag: &str,
) -> Result<Vec<String>> {
    let tag = secret_vault::tracking_tag(tag);
    let resources = client
        .get_resources(GetResourcesInput {
            resource_type_filters: vec![resource_type.to_string()],
            tag_filters: vec![TagFilter {
                key: tag.to_string(),
                values: vec![false.to_string()],
            }],
        })
        .await?;
    debug!(
        "Found {} untracked resources of type '{}'",
        resources.len(),
        resource_type
    );
    Ok(resources.into_iter().map(|r| r.resource_arn).collect())
}

pub(crate) fn matches_tag_filters(tags: &HashMap<String, String>, filters: &[TagFilter]) -> bool {
    filters.iter().all(|filter| match tags.get(&filter.key) {
        Some(value) => filter.values.is_empty() || filter.values.contains(value),
        None => false,
    })
}

pub(crate) fn matches_resource_type(filters: &[String], resource_type: &str) -> bool {
    filters.is_empty() || filters.iter().any(|f| f == resource_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secret_vault::{MemorySecretCache, MemorySecretsManager, NamedSecret, SecretsManagerVault, Vault};
    use std::sync::Arc;

    #[smol_potat::test]
    async fn test_find_untracked_secrets() {
        let client = Arc::new(MemorySecretsManager::new());
        let cache = Arc::new(MemorySecretCache::new());
        let vault = SecretsManagerVault::new(client.clone()).with_cache(cache.clone());

        let tracked = vault
            .create_secret(NamedSecret::new("tracked", "v"))
            .await
            .unwrap();
        cache.set_fail_puts(true);
        let _ = vault.create_secret(NamedSecret::new("pending", "v")).await;

        let untracked = find_untracked_resources(&*client, RESOURCE_TYPE_SECRET, "")
            .await
            .unwrap();
        assert_eq!(untracked.len(), 1);
        assert_ne!(untracked[0], tracked);
        assert_eq!(client.secret(&untracked[0]).unwrap().name, "pending");

        let none = find_untracked_resources(&*client, RESOURCE_TYPE_TASK_DEFINITION, "")
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_tag_filters() {
        let tags = HashMap::from([("k".to_string(), "v".to_string())]);
        let filter = |values: &[&str]| TagFilter {
            key: "k".to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        };
        assert!(matches_tag_filters(&tags, &[filter(&[])]));
        assert!(matches_tag_filters(&tags, &[filter(&["x", "v"])]));
        assert!(!matches_tag_filters(&tags, &[filter(&["x"])]));
        assert!(matches_tag_filters(&tags, &[]));
    }
}
