//! Handles to running pods

use crate::{
    ecs::{
        EcsClient,
        api::{DescribeTasksInput, StopTaskInput},
        convert_failures,
        translate::translate_pod_status_info,
    },
    error::{Error, Result, ResultExt},
    resources::PodResources,
    status::{PodStatus, PodStatusInfo},
};
use async_trait::async_trait;
use secret_vault::Vault;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A running (or formerly running) pod.
///
/// The handle caches the last observed status and never polls. Methods that
/// observe or change remote state take `&mut self`, so sharing one handle
/// across tasks requires external synchronization.
#[async_trait]
pub trait Pod: Send + Sync {
    /// Remote resources making up the pod
    fn resources(&self) -> &PodResources;

    /// Last cached status
    fn status_info(&self) -> &PodStatusInfo;

    /// Describe the task remotely and replace the cached status
    async fn latest_status_info(&mut self) -> Result<PodStatusInfo>;

    /// Stop the task without cleaning up its resources
    async fn stop(&mut self) -> Result<()>;

    /// Stop the task and delete every resource the pod owns
    async fn delete(&mut self) -> Result<()>;
}

/// [`Pod`] backed by a task in the orchestration service
pub struct BasicPod {
    client: Arc<dyn EcsClient>,
    vault: Option<Arc<dyn Vault>>,
    resources: PodResources,
    status_info: PodStatusInfo,
}

impl std::fmt::Debug for BasicPod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicPod")
            .field("resources", &self.resources)
            .field("status_info", &self.status_info)
            .field("has_vault", &self.vault.is_some())
            .finish()
    }
}

impl BasicPod {
    /// Create a handle for existing resources.
    ///
    /// Fails if the resources are missing a remote identifier.
    pub fn new(
        client: Arc<dyn EcsClient>,
        vault: Option<Arc<dyn Vault>>,
        resources: PodResources,
        status_info: PodStatusInfo,
    ) -> Result<Self> {
        let errors = resources.validate();
        if !errors.is_empty() {
            return Err(Error::validation("pod resources", errors));
        }
        Ok(Self {
            client,
            vault,
            resources,
            status_info,
        })
    }

    async fn delete_secrets(&self, errors: &mut Vec<Error>) {
        for container in &self.resources.containers {
            for secret in &container.secrets {
                let Some(id) = secret.secret.owned_id() else {
                    continue;
                };
                let Some(vault) = &self.vault else {
                    errors.push(Error::missing_vault(format!(
                        "delete secret '{}' for container '{}'",
                        id, container.name
                    )));
                    continue;
                };
                match vault.delete_secret(id).await {
                    Ok(()) => {}
                    Err(e) if e.is_not_found() => {
                        debug!("Secret '{}' is already gone", id);
                    }
                    Err(e) => errors.push(Error::Context {
                        context: format!(
                            "deleting secret '{}' for container '{}'",
                            id, container.name
                        ),
                        source: Box::new(e.into()),
                    }),
                }
            }
        }
    }
}

#[async_trait]
impl Pod for BasicPod {
    fn resources(&self) -> &PodResources {
        &self.resources
    }

    fn status_info(&self) -> &PodStatusInfo {
        &self.status_info
    }

    async fn latest_status_info(&mut self) -> Result<PodStatusInfo> {
        let out = self
            .client
            .describe_tasks(DescribeTasksInput {
                cluster: self.resources.cluster.clone(),
                tasks: vec![self.resources.task_id.clone()],
            })
            .await
            .context("describing task")?;

        if let Some(err) = convert_failures(&out.failures) {
            return Err(err).context("describing task");
        }
        let task = out.tasks.first().ok_or_else(|| {
            Error::UnexpectedResponse(
                "expected a task to exist in ECS, but none was returned".to_string(),
            )
        })?;

        self.status_info = translate_pod_status_info(task);
        Ok(self.status_info.clone())
    }

    async fn stop(&mut self) -> Result<()> {
        if matches!(
            self.status_info.status,
            PodStatus::Stopped | PodStatus::Deleted
        ) {
            return Ok(());
        }

        let stopped = self
            .client
            .stop_task(StopTaskInput {
                cluster: self.resources.cluster.clone(),
                task: self.resources.task_id.clone(),
                reason: None,
            })
            .await
            .map_err(Error::from);
        match stopped {
            Ok(()) => info!("Stopped pod '{}'", self.resources.task_id),
            Err(e) if e.is_task_not_found() => {
                debug!("Task '{}' is already gone", self.resources.task_id);
            }
            Err(e) => return Err(e).context("stopping pod"),
        }

        self.status_info.set_all(PodStatus::Stopped);
        Ok(())
    }

    async fn delete(&mut self) -> Result<()> {
        let mut errors = Vec::new();

        if let Err(e) = self.stop().await {
            errors.push(e);
        }

        if let Some(id) = self.resources.task_definition.owned_id() {
            if let Err(e) = self
                .client
                .deregister_task_definition(id)
                .await
                .context("deregistering task definition")
            {
                errors.push(e);
            }
        }

        self.delete_secrets(&mut errors).await;

        if let Some(err) = Error::from_many(errors) {
            warn!("Pod '{}' was not fully deleted: {}", self.resources.task_id, err);
            return Err(err);
        }

        self.status_info.set_all(PodStatus::Deleted);
        info!("Deleted pod '{}'", self.resources.task_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{EcsOperation, MemoryEcsClient};
    use crate::resources::{ContainerResources, ContainerSecret, ResourceRef};
    use crate::status::ContainerStatusInfo;

    fn resources(task_id: &str) -> PodResources {
        PodResources {
            task_id: task_id.to_string(),
            cluster: None,
            task_definition: ResourceRef::Borrowed("arn:def:1".to_string()),
            containers: vec![ContainerResources {
                container_id: "arn:container/1".to_string(),
                name: "web".to_string(),
                secrets: vec![ContainerSecret {
                    name: None,
                    secret: ResourceRef::Owned("arn:secret:1".to_string()),
                }],
            }],
        }
    }

    fn running() -> PodStatusInfo {
        PodStatusInfo {
            status: PodStatus::Running,
            containers: vec![ContainerStatusInfo {
                container_id: "arn:container/1".to_string(),
                name: "web".to_string(),
                status: PodStatus::Running,
            }],
        }
    }

    #[test]
    fn test_new_rejects_invalid_resources() {
        let err = BasicPod::new(Arc::new(MemoryEcsClient::new()), None, resources(""), running())
            .unwrap_err();
        assert!(err.to_string().contains("must specify a task ID"));
    }

    #[smol_potat::test]
    async fn test_stop_skips_remote_call_when_stopped() {
        let client = Arc::new(MemoryEcsClient::new());
        let mut status = running();
        status.set_all(PodStatus::Stopped);
        let mut pod = BasicPod::new(client.clone(), None, resources("arn:task/1"), status).unwrap();

        pod.stop().await.unwrap();
        assert_eq!(client.calls(EcsOperation::StopTask), 0);
    }

    #[smol_potat::test]
    async fn test_delete_without_vault_keeps_status() {
        let client = Arc::new(MemoryEcsClient::new());
        let mut pod =
            BasicPod::new(client.clone(), None, resources("arn:task/missing"), running()).unwrap();

        let err = pod.delete().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot delete secret 'arn:secret:1' for container 'web' without a vault"
        );
        assert_eq!(pod.status_info().status, PodStatus::Stopped);
        assert_eq!(client.calls(EcsOperation::DeregisterTaskDefinition), 0);
    }
}
