use crate::{
    ecs::{
        EcsClient, EcsResult,
        api::{
            Container, DescribeTasksInput, DescribeTasksOutput, Failure,
            ListTaskDefinitionsInput, ListTasksInput, RegisterTaskDefinitionInput,
            RegisterTaskDefinitionOutput, RunTaskInput, RunTaskOutput, StopTaskInput, Task,
            TaskDefinition,
        },
    },
    error::{EcsError, Result},
    status::TaskStatus,
    tag::{
        GetResourcesInput, RESOURCE_TYPE_TASK_DEFINITION, ResourceTagMapping, TagClient,
        matches_resource_type, matches_tag_filters,
    },
};
use async_trait::async_trait;
use secret_vault::Tag;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

const ARN_PREFIX: &str = "arn:aws:ecs:us-east-1:000000000000";
const DEFAULT_CLUSTER: &str = "default";
const DEFINITION_ACTIVE: &str = "ACTIVE";
const DEFINITION_INACTIVE: &str = "INACTIVE";
const REASON_MISSING: &str = "MISSING";

/// Remote calls that can be observed or made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EcsOperation {
    /// `register_task_definition`
    RegisterTaskDefinition,
    /// `describe_task_definition`
    DescribeTaskDefinition,
    /// `list_task_definitions`
    ListTaskDefinitions,
    /// `deregister_task_definition`
    DeregisterTaskDefinition,
    /// `run_task`
    RunTask,
    /// `describe_tasks`
    DescribeTasks,
    /// `list_tasks`
    ListTasks,
    /// `stop_task`
    StopTask,
    /// `tag_resource`
    TagResource,
}

struct StoredDefinition {
    definition: TaskDefinition,
    tags: HashMap<String, String>,
}

impl StoredDefinition {
    fn matches(&self, id: &str) -> bool {
        let def = &self.definition;
        def.task_definition_arn.as_deref() == Some(id)
            || def
                .family
                .as_deref()
                .is_some_and(|family| format!("{}:{}", family, def.revision) == id)
    }
}

#[derive(Default)]
struct State {
    definitions: Vec<StoredDefinition>,
    revisions: HashMap<String, i32>,
    tasks: HashMap<String, Task>,
    failures: HashMap<EcsOperation, EcsError>,
    run_failures: Option<Vec<Failure>>,
    calls: HashMap<EcsOperation, usize>,
}

impl State {
    fn begin(&mut self, op: EcsOperation) -> EcsResult<()> {
        *self.calls.entry(op).or_default() += 1;
        self.failures.remove(&op).map_or(Ok(()), Err)
    }

    fn definition(&self, id: &str) -> Option<&StoredDefinition> {
        self.definitions.iter().find(|d| d.matches(id))
    }

    fn definition_mut(&mut self, id: &str) -> EcsResult<&mut StoredDefinition> {
        self.definitions
            .iter_mut()
            .find(|d| d.matches(id))
            .ok_or_else(|| EcsError::ResourceNotFound(format!("task definition '{}'", id)))
    }
}

/// In-memory [`EcsClient`].
///
/// Definitions are numbered per family. Run tasks start `PENDING` and only
/// change state through [`MemoryEcsClient::set_task_status`] or a stop.
#[derive(Default)]
pub struct MemoryEcsClient {
    state: RwLock<State>,
}

impl MemoryEcsClient {
    /// Create an empty service
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fail the next call of `op` with `err`
    pub fn fail_next(&self, op: EcsOperation, err: EcsError) {
        self.write().failures.insert(op, err);
    }

    /// Make the next `run_task` report `failures` instead of starting tasks
    pub fn fail_next_run(&self, failures: Vec<Failure>) {
        self.write().run_failures = Some(failures);
    }

    /// Number of calls made to `op`
    pub fn calls(&self, op: EcsOperation) -> usize {
        self.read().calls.get(&op).copied().unwrap_or_default()
    }

    /// Number of registered definitions, active or not
    pub fn definition_count(&self) -> usize {
        self.read().definitions.len()
    }

    /// Look up a definition by ARN or `family:revision`
    pub fn task_definition(&self, id: &str) -> Option<TaskDefinition> {
        self.read().definition(id).map(|d| d.definition.clone())
    }

    /// Tags of a definition
    pub fn definition_tags(&self, id: &str) -> Option<HashMap<String, String>> {
        self.read().definition(id).map(|d| d.tags.clone())
    }

    /// Look up a task
    pub fn task(&self, arn: &str) -> Option<Task> {
        self.read().tasks.get(arn).cloned()
    }

    /// Move a task and its containers to `status`
    pub fn set_task_status(&self, arn: &str, status: TaskStatus) {
        if let Some(task) = self.write().tasks.get_mut(arn) {
            set_status(task, status.as_str());
        }
    }

    /// Forget a task, as the service does some time after it stops
    pub fn remove_task(&self, arn: &str) -> Option<Task> {
        self.write().tasks.remove(arn)
    }
}

fn set_status(task: &mut Task, status: &str) {
    task.last_status = Some(status.to_string());
    for container in &mut task.containers {
        container.last_status = Some(status.to_string());
    }
}

fn tag_map(tags: Vec<Tag>) -> HashMap<String, String> {
    tags.into_iter().map(|t| (t.key, t.value)).collect()
}

#[async_trait]
impl EcsClient for MemoryEcsClient {
    async fn register_task_definition(
        &self,
        input: RegisterTaskDefinitionInput,
    ) -> EcsResult<RegisterTaskDefinitionOutput> {
        let mut state = self.write();
        state.begin(EcsOperation::RegisterTaskDefinition)?;
        let family = input
            .family
            .filter(|f| !f.is_empty())
            .ok_or_else(|| EcsError::InvalidParameter("family cannot be empty".to_string()))?;
        if input.container_definitions.is_empty() {
            return Err(EcsError::InvalidParameter(
                "container definitions cannot be empty".to_string(),
            ));
        }

        let revision = {
            let rev = state.revisions.entry(family.clone()).or_default();
            *rev += 1;
            *rev
        };
        let definition = TaskDefinition {
            task_definition_arn: Some(format!(
                "{}:task-definition/{}:{}",
                ARN_PREFIX, family, revision
            )),
            family: Some(family),
            revision,
            status: Some(DEFINITION_ACTIVE.to_string()),
            container_definitions: input.container_definitions,
            memory: input.memory,
            cpu: input.cpu,
            network_mode: input.network_mode,
        };
        state.definitions.push(StoredDefinition {
            definition: definition.clone(),
            tags: tag_map(input.tags),
        });

        Ok(RegisterTaskDefinitionOutput {
            task_definition: Some(definition),
        })
    }

    async fn describe_task_definition(&self, task_definition: &str) -> EcsResult<TaskDefinition> {
        let mut state = self.write();
        state.begin(EcsOperation::DescribeTaskDefinition)?;
        state
            .definition(task_definition)
            .map(|d| d.definition.clone())
            .ok_or_else(|| {
                EcsError::ResourceNotFound(format!("task definition '{}'", task_definition))
            })
    }

    async fn list_task_definitions(&self, input: ListTaskDefinitionsInput) -> EcsResult<Vec<String>> {
        let mut state = self.write();
        state.begin(EcsOperation::ListTaskDefinitions)?;
        Ok(state
            .definitions
            .iter()
            .map(|d| &d.definition)
            .filter(|d| match &input.family_prefix {
                Some(prefix) => d.family.as_deref().unwrap_or_default().starts_with(prefix.as_str()),
                None => true,
            })
            .filter(|d| input.status.is_none() || d.status == input.status)
            .filter_map(|d| d.task_definition_arn.clone())
            .collect())
    }

    async fn deregister_task_definition(&self, task_definition: &str) -> EcsResult<TaskDefinition> {
        let mut state = self.write();
        state.begin(EcsOperation::DeregisterTaskDefinition)?;
        let stored = state.definition_mut(task_definition)?;
        stored.definition.status = Some(DEFINITION_INACTIVE.to_string());
        Ok(stored.definition.clone())
    }

    async fn run_task(&self, input: RunTaskInput) -> EcsResult<RunTaskOutput> {
        let mut state = self.write();
        state.begin(EcsOperation::RunTask)?;
        if let Some(failures) = state.run_failures.take() {
            return Ok(RunTaskOutput {
                tasks: Vec::new(),
                failures,
            });
        }

        let definition = match state.definition(&input.task_definition) {
            Some(d) if d.definition.status.as_deref() == Some(DEFINITION_ACTIVE) => {
                d.definition.clone()
            }
            _ => {
                return Err(EcsError::InvalidParameter(format!(
                    "task definition '{}' is not active",
                    input.task_definition
                )));
            }
        };

        let cluster = input.cluster.as_deref().unwrap_or(DEFAULT_CLUSTER);
        let mut tasks = Vec::new();
        for _ in 0..input.count.unwrap_or(1) {
            let task_id = Uuid::new_v4().simple().to_string();
            let task_arn = format!("{}:task/{}/{}", ARN_PREFIX, cluster, task_id);
            let containers = definition
                .container_definitions
                .iter()
                .map(|def| Container {
                    container_arn: Some(format!(
                        "{}:container/{}/{}/{}",
                        ARN_PREFIX,
                        cluster,
                        task_id,
                        Uuid::new_v4().simple()
                    )),
                    name: def.name.clone(),
                    last_status: Some(TaskStatus::Pending.as_str().to_string()),
                    task_arn: Some(task_arn.clone()),
                })
                .collect();
            let task = Task {
                task_arn: Some(task_arn.clone()),
                cluster_arn: Some(format!("{}:cluster/{}", ARN_PREFIX, cluster)),
                task_definition_arn: definition.task_definition_arn.clone(),
                last_status: Some(TaskStatus::Pending.as_str().to_string()),
                desired_status: Some(TaskStatus::Running.as_str().to_string()),
                containers,
                group: input.group.clone(),
                stopped_reason: None,
                tags: input.tags.clone(),
            };
            state.tasks.insert(task_arn, task.clone());
            tasks.push(task);
        }

        Ok(RunTaskOutput {
            tasks,
            failures: Vec::new(),
        })
    }

    async fn describe_tasks(&self, input: DescribeTasksInput) -> EcsResult<DescribeTasksOutput> {
        let mut state = self.write();
        state.begin(EcsOperation::DescribeTasks)?;
        let mut out = DescribeTasksOutput::default();
        for arn in &input.tasks {
            match state.tasks.get(arn) {
                Some(task) => out.tasks.push(task.clone()),
                None => out.failures.push(Failure {
                    arn: Some(arn.clone()),
                    reason: Some(REASON_MISSING.to_string()),
                    detail: None,
                }),
            }
        }
        Ok(out)
    }

    async fn list_tasks(&self, input: ListTasksInput) -> EcsResult<Vec<String>> {
        let mut state = self.write();
        state.begin(EcsOperation::ListTasks)?;
        let cluster_arn = input
            .cluster
            .as_deref()
            .map(|c| format!("{}:cluster/{}", ARN_PREFIX, c));
        let state = &*state;
        Ok(state
            .tasks
            .values()
            .filter(|t| cluster_arn.is_none() || t.cluster_arn == cluster_arn)
            .filter(|t| input.desired_status.is_none() || t.desired_status == input.desired_status)
            .filter(|t| match &input.family {
                Some(family) => t
                    .task_definition_arn
                    .as_deref()
                    .and_then(|arn| state.definition(arn))
                    .is_some_and(|d| d.definition.family.as_ref() == Some(family)),
                None => true,
            })
            .filter_map(|t| t.task_arn.clone())
            .collect())
    }

    async fn stop_task(&self, input: StopTaskInput) -> EcsResult<()> {
        let mut state = self.write();
        state.begin(EcsOperation::StopTask)?;
        let task = state
            .tasks
            .get_mut(&input.task)
            .ok_or_else(|| EcsError::TaskNotFound {
                arn: input.task.clone(),
            })?;
        set_status(task, TaskStatus::Stopped.as_str());
        task.desired_status = Some(TaskStatus::Stopped.as_str().to_string());
        task.stopped_reason = input.reason;
        Ok(())
    }

    async fn tag_resource(&self, resource_arn: &str, tags: Vec<Tag>) -> EcsResult<()> {
        let mut state = self.write();
        state.begin(EcsOperation::TagResource)?;
        if let Some(task) = state.tasks.get_mut(resource_arn) {
            task.tags.extend(tags);
            return Ok(());
        }
        state.definition_mut(resource_arn)?.tags.extend(tag_map(tags));
        Ok(())
    }
}

#[async_trait]
impl TagClient for MemoryEcsClient {
    async fn get_resources(&self, input: GetResourcesInput) -> Result<Vec<ResourceTagMapping>> {
        if !matches_resource_type(&input.resource_type_filters, RESOURCE_TYPE_TASK_DEFINITION) {
            return Ok(Vec::new());
        }
        Ok(self
            .read()
            .definitions
            .iter()
            .filter(|d| matches_tag_filters(&d.tags, &input.tag_filters))
            .filter_map(|d| {
                d.definition
                    .task_definition_arn
                    .clone()
                    .map(|resource_arn| ResourceTagMapping {
                        resource_arn,
                        tags: d.tags.clone(),
                    })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::api::ContainerDefinition;

    fn registration(family: &str) -> RegisterTaskDefinitionInput {
        RegisterTaskDefinitionInput {
            family: Some(family.to_string()),
            container_definitions: vec![ContainerDefinition {
                name: Some("web".to_string()),
                image: Some("nginx".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[smol_potat::test]
    async fn test_revisions_are_numbered_per_family() {
        let client = MemoryEcsClient::new();
        client.register_task_definition(registration("a")).await.unwrap();
        let second = client
            .register_task_definition(registration("a"))
            .await
            .unwrap()
            .task_definition
            .unwrap();
        assert_eq!(second.revision, 2);
        assert!(client.task_definition("a:2").is_some());
        assert!(client.task_definition("a:3").is_none());
    }

    #[smol_potat::test]
    async fn test_deregister_is_idempotent_and_blocks_runs() {
        let client = MemoryEcsClient::new();
        let def = client
            .register_task_definition(registration("a"))
            .await
            .unwrap()
            .task_definition
            .unwrap();
        let arn = def.task_definition_arn.unwrap();

        client.deregister_task_definition(&arn).await.unwrap();
        let again = client.deregister_task_definition(&arn).await.unwrap();
        assert_eq!(again.status.as_deref(), Some(DEFINITION_INACTIVE));

        let err = client
            .run_task(RunTaskInput {
                task_definition: arn,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EcsError::InvalidParameter(_)));
    }

    #[smol_potat::test]
    async fn test_stop_and_describe_missing_task() {
        let client = MemoryEcsClient::new();
        let arn = client
            .register_task_definition(registration("a"))
            .await
            .unwrap()
            .task_definition
            .unwrap()
            .task_definition_arn
            .unwrap();
        let task = client
            .run_task(RunTaskInput {
                task_definition: arn,
                ..Default::default()
            })
            .await
            .unwrap()
            .tasks
            .remove(0);
        let task_arn = task.task_arn.unwrap();
        assert_eq!(task.containers.len(), 1);

        client.remove_task(&task_arn);
        let err = client
            .stop_task(StopTaskInput {
                task: task_arn.clone(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err, EcsError::TaskNotFound { arn: task_arn.clone() });

        let out = client
            .describe_tasks(DescribeTasksInput {
                cluster: None,
                tasks: vec![task_arn],
            })
            .await
            .unwrap();
        assert_eq!(out.failures[0].reason.as_deref(), Some(REASON_MISSING));
    }
}
