//! Orchestration service client interface

use super::api::{
    DescribeTasksInput, DescribeTasksOutput, ListTaskDefinitionsInput, ListTasksInput,
    RegisterTaskDefinitionInput, RegisterTaskDefinitionOutput, RunTaskInput, RunTaskOutput,
    StopTaskInput, TaskDefinition,
};
use crate::error::EcsError;
use async_trait::async_trait;
use secret_vault::Tag;

/// Result of a single client call
pub type EcsResult<T> = std::result::Result<T, EcsError>;

/// Client for the remote orchestration service.
///
/// Implementations own retries, backoff and credentials. Dropping a returned
/// future cancels the call.
#[async_trait]
pub trait EcsClient: Send + Sync {
    /// Register a new task definition revision
    async fn register_task_definition(
        &self,
        input: RegisterTaskDefinitionInput,
    ) -> EcsResult<RegisterTaskDefinitionOutput>;

    /// Describe a task definition by ARN or `family:revision`
    async fn describe_task_definition(&self, task_definition: &str) -> EcsResult<TaskDefinition>;

    /// List task definition ARNs
    async fn list_task_definitions(&self, input: ListTaskDefinitionsInput) -> EcsResult<Vec<String>>;

    /// Deregister a task definition. Deregistering an inactive definition succeeds.
    async fn deregister_task_definition(&self, task_definition: &str) -> EcsResult<TaskDefinition>;

    /// Start tasks from a definition
    async fn run_task(&self, input: RunTaskInput) -> EcsResult<RunTaskOutput>;

    /// Describe tasks
    async fn describe_tasks(&self, input: DescribeTasksInput) -> EcsResult<DescribeTasksOutput>;

    /// List task ARNs
    async fn list_tasks(&self, input: ListTasksInput) -> EcsResult<Vec<String>>;

    /// Stop a task, failing with [`EcsError::TaskNotFound`] if it does not exist
    async fn stop_task(&self, input: StopTaskInput) -> EcsResult<()>;

    /// Add or overwrite tags on a resource
    async fn tag_resource(&self, resource_arn: &str, tags: Vec<Tag>) -> EcsResult<()>;
}
