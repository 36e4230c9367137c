use crate::{
    error::Result,
    tag::{
        GetResourcesInput, RESOURCE_TYPE_SECRET, ResourceTagMapping, TagClient,
        matches_resource_type, matches_tag_filters,
    },
};
use async_trait::async_trait;
use secret_vault::MemorySecretsManager;

#[async_trait]
impl TagClient for MemorySecretsManager {
    async fn get_resources(&self, input: GetResourcesInput) -> Result<Vec<ResourceTagMapping>> {
        if !matches_resource_type(&input.resource_type_filters, RESOURCE_TYPE_SECRET) {
            return Ok(Vec::new());
        }
        Ok(self
            .secrets()
            .into_iter()
            .filter(|s| matches_tag_filters(&s.tags, &input.tag_filters))
            .map(|s| ResourceTagMapping {
                resource_arn: s.arn,
                tags: s.tags,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::{RESOURCE_TYPE_TASK_DEFINITION, TagFilter};
    use secret_vault::{NamedSecret, SecretsManagerVault, Vault};
    use std::sync::Arc;

    #[smol_potat::test]
    async fn test_secrets_listed_by_type_and_tag() {
        let client = Arc::new(MemorySecretsManager::new());
        let vault = SecretsManagerVault::new(client.clone());
        let arn = vault
            .create_secret(NamedSecret::new("db-password", "hunter2"))
            .await
            .unwrap();

        let all = client
            .get_resources(GetResourcesInput {
                resource_type_filters: vec![RESOURCE_TYPE_SECRET.to_string()],
                tag_filters: Vec::new(),
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].resource_arn, arn);

        let mismatched_tag = client
            .get_resources(GetResourcesInput {
                resource_type_filters: Vec::new(),
                tag_filters: vec![TagFilter {
                    key: "missing".to_string(),
                    values: Vec::new(),
                }],
            })
            .await
            .unwrap();
        assert!(mismatched_tag.is_empty());

        let other_type = client
            .get_resources(GetResourcesInput {
                resource_type_filters: vec![RESOURCE_TYPE_TASK_DEFINITION.to_string()],
                tag_filters: Vec::new(),
            })
            .await
            .unwrap();
        assert!(other_type.is_empty());
    }
}
