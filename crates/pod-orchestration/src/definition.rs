//! Pod definition management
//!
//! A pod definition is a registered, reusable template of containers. The
//! [`BasicPodDefinitionManager`] materializes any new secrets the definition
//! needs, registers it with the orchestration service and, when a cache is
//! configured, records it there using the same pending/tracked tagging as
//! the secret vault.

use crate::{
    ecs::{EcsClient, api::TaskDefinition, translate::export_pod_definition},
    error::{Error, Result, ResultExt},
    options::{ContainerDefinition, PodDefinitionOptions},
};
use async_trait::async_trait;
use secret_vault::{NamedSecret, Tag, Vault, tracking_tag};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A registered pod definition and the options it was created from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodDefinitionItem {
    /// Remote ID of the registered definition
    pub id: String,
    /// Options the definition was registered with, with secrets materialized
    pub definition_opts: PodDefinitionOptions,
}

/// External store tracking pod definitions created by a manager
#[async_trait]
pub trait PodDefinitionCache: Send + Sync {
    /// Record a newly registered definition
    async fn put(&self, item: PodDefinitionItem) -> anyhow::Result<()>;

    /// Forget a deregistered definition
    async fn delete(&self, id: &str) -> anyhow::Result<()>;

    /// Tag key marking tracked definitions. An empty string selects
    /// [`secret_vault::DEFAULT_TRACKING_TAG`].
    fn tag(&self) -> String {
        String::new()
    }
}

/// Creates and deletes pod definitions
#[async_trait]
pub trait PodDefinitionManager: Send + Sync {
    /// Merge, validate and register a pod definition
    async fn create_pod_definition(
        &self,
        opts: &[PodDefinitionOptions],
    ) -> Result<PodDefinitionItem>;

    /// Deregister a pod definition and drop it from the cache
    async fn delete_pod_definition(&self, id: &str) -> Result<()>;
}

/// [`PodDefinitionManager`] over an [`EcsClient`], with an optional vault for
/// new secrets and an optional cache.
#[derive(Clone)]
pub struct BasicPodDefinitionManager {
    client: Arc<dyn EcsClient>,
    vault: Option<Arc<dyn Vault>>,
    cache: Option<Arc<dyn PodDefinitionCache>>,
}

impl BasicPodDefinitionManager {
    /// Create a manager without a vault or cache
    pub fn new(client: Arc<dyn EcsClient>) -> Self {
        Self {
            client,
            vault: None,
            cache: None,
        }
    }

    /// Use the given vault to create new secrets
    pub fn with_vault(mut self, vault: Arc<dyn Vault>) -> Self {
        self.vault = Some(vault);
        self
    }

    /// Record created definitions in the given cache
    pub fn with_cache(mut self, cache: Arc<dyn PodDefinitionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    fn cache_tag(&self) -> Option<String> {
        self.cache
            .as_ref()
            .map(|cache| tracking_tag(&cache.tag()).to_string())
    }
}

#[async_trait]
impl PodDefinitionManager for BasicPodDefinitionManager {
    async fn create_pod_definition(
        &self,
        opts: &[PodDefinitionOptions],
    ) -> Result<PodDefinitionItem> {
        let mut merged = PodDefinitionOptions::merge(opts)
            .validate()
            .into_result()
            .map_err(|errors| Error::validation("pod definition options", errors))?;

        let tag = self.cache_tag();
        if let Some(tag) = &tag {
            merged = merged.add_tags([(tag.clone(), false.to_string())]);
        }

        create_secrets(self.vault.as_deref(), &mut merged)
            .await
            .context("creating new secrets")?;

        let task_def = register_task_definition(self.client.as_ref(), &merged)
            .await
            .context("registering task definition")?;

        let item = PodDefinitionItem {
            id: task_def.task_definition_arn.unwrap_or_default(),
            definition_opts: merged,
        };
        let name = item.definition_opts.name.clone().unwrap_or_default();
        info!("Registered pod definition '{}' ({})", name, item.id);

        let (Some(cache), Some(tag)) = (&self.cache, tag) else {
            return Ok(item);
        };

        cache.put(item.clone()).await.map_err(|e| {
            warn!("Pod definition '{}' left pending: cache update failed", item.id);
            Error::cache(
                format!(
                    "adding pod definition item '{}' named '{}' to cache",
                    item.id, name
                ),
                e,
            )
        })?;

        self.client
            .tag_resource(&item.id, vec![Tag::new(tag, true.to_string())])
            .await
            .with_context(|| {
                format!(
                    "re-tagging pod definition item '{}' named '{}' to indicate that it is tracked",
                    item.id, name
                )
            })?;

        Ok(item)
    }

    async fn delete_pod_definition(&self, id: &str) -> Result<()> {
        self.client
            .deregister_task_definition(id)
            .await
            .with_context(|| format!("deregistering task definition '{}'", id))?;
        info!("Deregistered pod definition '{}'", id);

        if let Some(cache) = &self.cache {
            cache
                .delete(id)
                .await
                .map_err(|e| Error::cache(format!("deleting pod definition '{}' from cache", id), e))?;
        }
        Ok(())
    }
}

/// Register the definition and check that the response names it
pub(crate) async fn register_task_definition(
    client: &dyn EcsClient,
    opts: &PodDefinitionOptions,
) -> Result<TaskDefinition> {
    let out = client
        .register_task_definition(export_pod_definition(opts))
        .await?;

    let task_def = out.task_definition.ok_or_else(|| {
        Error::UnexpectedResponse(
            "expected a task definition from ECS, but none was returned".to_string(),
        )
    })?;
    if task_def.task_definition_arn.as_deref().unwrap_or_default().is_empty() {
        return Err(Error::UnexpectedResponse(
            "received a task definition, but it is missing an ARN".to_string(),
        ));
    }
    Ok(task_def)
}

/// Store every new secret value and credential in the vault, replacing it
/// with a reference to the created secret.
///
/// The container definitions are rebuilt rather than edited in place, so
/// nothing is changed if any secret fails.
pub(crate) async fn create_secrets(
    vault: Option<&dyn Vault>,
    opts: &mut PodDefinitionOptions,
) -> Result<()> {
    let pod_name = opts.name.clone().unwrap_or_default();
    let mut defs = Vec::with_capacity(opts.container_definitions.len());

    for def in &opts.container_definitions {
        let container_name = def.name.clone().unwrap_or_default();
        let mut def: ContainerDefinition = def.clone();

        for env_var in &mut def.env_vars {
            let var_name = env_var.name.clone().unwrap_or_default();
            let Some(secret_opts) = env_var.secret_opts.as_mut() else {
                continue;
            };
            let Some(new_value) = secret_opts.new_value.take() else {
                continue;
            };
            let secret_name = secret_opts.name.clone().unwrap_or_default();
            let id = create_secret(vault, &secret_name, new_value)
                .await
                .with_context(|| {
                    format!(
                        "creating secret environment variable '{}' for container '{}' in pod '{}'",
                        var_name, container_name,
                        pod_name
                    )
                })?;
            secret_opts.id = Some(id);
        }

        if let Some(creds) = def.repo_creds.as_mut() {
            if let Some(new_creds) = creds.new_creds.take() {
                let value = serde_json::to_string(&new_creds)
                    .context("formatting new repository credentials to create")?;
                let secret_name = creds.name.clone().unwrap_or_default();
                let id = create_secret(vault, &secret_name, value)
                    .await
                    .with_context(|| {
                        format!("creating repository credentials for container '{}'", container_name)
                    })?;
                creds.id = Some(id);
            }
        }

        defs.push(def);
    }

    opts.container_definitions = defs;
    Ok(())
}

async fn create_secret(vault: Option<&dyn Vault>, name: &str, value: String) -> Result<String> {
    let vault = vault.ok_or_else(|| Error::missing_vault(format!("create secret '{}'", name)))?;
    let id = vault
        .create_secret(NamedSecret::new(name, value))
        .await?;
    debug!("Created secret '{}' ({})", name, id);
    Ok(id)
}
