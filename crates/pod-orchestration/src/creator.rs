//! Pod creation

use crate::{
    definition::{BasicPodDefinitionManager, PodDefinitionCache, PodDefinitionManager},
    ecs::{
        EcsClient,
        api::{RunTaskInput, Task},
        convert_failures,
        translate::{export_run_task, translate_container_resources, translate_pod_status_info},
    },
    error::{Error, Result, ResultExt},
    options::{
        ContainerDefinition, PodCreationOptions, PodExecutionOptions, ValidationErrors,
    },
    pod::{BasicPod, Pod},
    resources::{PodResources, ResourceRef},
};
use async_trait::async_trait;
use secret_vault::Vault;
use std::sync::Arc;
use tracing::{debug, info};

/// Launches pods
#[async_trait]
pub trait PodCreator: Send + Sync {
    /// Register a new pod definition and run a pod from it.
    ///
    /// The pod owns the new definition and deregisters it when deleted.
    async fn create_pod(&self, opts: &[PodCreationOptions]) -> Result<Box<dyn Pod>>;

    /// Run a pod from an already registered definition, keeping the
    /// ownership given by `definition`.
    async fn create_pod_from_existing_definition(
        &self,
        definition: ResourceRef,
        opts: &[PodExecutionOptions],
    ) -> Result<Box<dyn Pod>>;
}

/// [`PodCreator`] over an [`EcsClient`]
#[derive(Clone)]
pub struct BasicPodCreator {
    client: Arc<dyn EcsClient>,
    vault: Option<Arc<dyn Vault>>,
    cache: Option<Arc<dyn PodDefinitionCache>>,
}

impl BasicPodCreator {
    /// Create a creator without a vault or definition cache
    pub fn new(client: Arc<dyn EcsClient>) -> Self {
        Self {
            client,
            vault: None,
            cache: None,
        }
    }

    /// Use the given vault for new secrets and for pods' owned secrets
    pub fn with_vault(mut self, vault: Arc<dyn Vault>) -> Self {
        self.vault = Some(vault);
        self
    }

    /// Record new pod definitions in the given cache
    pub fn with_cache(mut self, cache: Arc<dyn PodDefinitionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    fn definition_manager(&self) -> BasicPodDefinitionManager {
        let mut manager = BasicPodDefinitionManager::new(self.client.clone());
        if let Some(vault) = &self.vault {
            manager = manager.with_vault(vault.clone());
        }
        if let Some(cache) = &self.cache {
            manager = manager.with_cache(cache.clone());
        }
        manager
    }

    async fn run_task(&self, input: RunTaskInput) -> Result<Task> {
        let definition = input.task_definition.clone();
        let cluster = input.cluster.clone().unwrap_or_default();
        let out = self.client.run_task(input).await.with_context(|| {
            format!(
                "running task for definition '{}' in cluster '{}'",
                definition, cluster
            )
        })?;

        if let Some(err) = convert_failures(&out.failures) {
            return Err(err);
        }
        let task = out.tasks.into_iter().next().ok_or_else(|| {
            Error::UnexpectedResponse(
                "expected a task to be running in ECS, but none was returned".to_string(),
            )
        })?;
        if task.task_arn.is_none() {
            return Err(Error::UnexpectedResponse(
                "received a task, but it is missing an ARN".to_string(),
            ));
        }
        Ok(task)
    }

    fn create_pod_handle(
        &self,
        cluster: Option<String>,
        task: &Task,
        task_definition: ResourceRef,
        container_defs: &[ContainerDefinition],
    ) -> Result<Box<dyn Pod>> {
        let resources = PodResources {
            task_id: task.task_arn.clone().unwrap_or_default(),
            cluster,
            task_definition,
            containers: translate_container_resources(&task.containers, container_defs),
        };
        let pod = BasicPod::new(
            self.client.clone(),
            self.vault.clone(),
            resources,
            translate_pod_status_info(task),
        )
        .context("creating pod after requesting task")?;
        info!("Started pod '{}'", pod.resources().task_id);
        Ok(Box::new(pod))
    }
}

#[async_trait]
impl PodCreator for BasicPodCreator {
    async fn create_pod(&self, opts: &[PodCreationOptions]) -> Result<Box<dyn Pod>> {
        let merged = PodCreationOptions::merge(opts)
            .validate()
            .into_result()
            .map_err(|errors| Error::validation("pod creation options", errors))?;
        let execution_opts = merged.execution_opts.unwrap_or_default();

        let item = self
            .definition_manager()
            .create_pod_definition(&[merged.definition_opts])
            .await
            .context("creating pod definition")?;
        let task_definition = ResourceRef::Owned(item.id.clone());
        debug!("Running pod from new definition '{}'", item.id);

        let task = self
            .run_task(export_run_task(&task_definition, &execution_opts))
            .await
            .context("running task")?;

        self.create_pod_handle(
            execution_opts.cluster.clone(),
            &task,
            task_definition,
            &item.definition_opts.container_definitions,
        )
    }

    async fn create_pod_from_existing_definition(
        &self,
        definition: ResourceRef,
        opts: &[PodExecutionOptions],
    ) -> Result<Box<dyn Pod>> {
        let mut errors = ValidationErrors::new();
        errors.push_when(definition.id().is_empty(), "must specify a non-empty ID");
        if !errors.is_empty() {
            return Err(Error::validation("task definition", errors));
        }

        let execution_opts = PodExecutionOptions::merge(opts)
            .validate()
            .into_result()
            .map_err(|errors| Error::validation("pod execution options", errors))?;
        debug!("Running pod from existing definition '{}'", definition.id());

        let task = self
            .run_task(export_run_task(&definition, &execution_opts))
            .await
            .context("running task")?;

        self.create_pod_handle(execution_opts.cluster.clone(), &task, definition, &[])
    }
}
