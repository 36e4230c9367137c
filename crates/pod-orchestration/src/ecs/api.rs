//! Request and response shapes of the orchestration service

use secret_vault::Tag;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Plain environment variable
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValuePair {
    /// Name
    pub name: Option<String>,
    /// Value
    pub value: Option<String>,
}

/// Environment variable sourced from a secret
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    /// Environment variable name
    pub name: Option<String>,
    /// ID of the secret holding the value
    pub value_from: Option<String>,
}

/// Container port mapping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    /// Container port
    pub container_port: i32,
    /// Host port; 0 lets the service choose
    pub host_port: i32,
}

/// Log routing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfiguration {
    /// Log driver
    pub log_driver: String,
    /// Driver options
    pub options: HashMap<String, String>,
}

/// Container in a task definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDefinition {
    /// Container name
    pub name: Option<String>,
    /// Image
    pub image: Option<String>,
    /// Command
    pub command: Vec<String>,
    /// Working directory
    pub working_directory: Option<String>,
    /// Hard memory limit in MB
    pub memory: Option<i32>,
    /// CPU units; 0 means unreserved
    pub cpu: i32,
    /// Plain environment variables
    pub environment: Vec<KeyValuePair>,
    /// Secret environment variables
    pub secrets: Vec<Secret>,
    /// Secret ID of private registry credentials
    pub credentials_parameter: Option<String>,
    /// Port mappings
    pub port_mappings: Vec<PortMapping>,
    /// Log routing
    pub log_configuration: Option<LogConfiguration>,
}

/// Request to register a task definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterTaskDefinitionInput {
    /// Family the new revision belongs to
    pub family: Option<String>,
    /// Containers
    pub container_definitions: Vec<ContainerDefinition>,
    /// Task memory, as a decimal string of MB
    pub memory: Option<String>,
    /// Task CPU units, as a decimal string
    pub cpu: Option<String>,
    /// Network mode
    pub network_mode: Option<String>,
    /// Task role
    pub task_role_arn: Option<String>,
    /// Execution role
    pub execution_role_arn: Option<String>,
    /// Tags
    pub tags: Vec<Tag>,
}

/// A registered task definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
    /// ARN of the revision
    pub task_definition_arn: Option<String>,
    /// Family
    pub family: Option<String>,
    /// Revision within the family
    pub revision: i32,
    /// `ACTIVE` or `INACTIVE`
    pub status: Option<String>,
    /// Containers
    pub container_definitions: Vec<ContainerDefinition>,
    /// Task memory
    pub memory: Option<String>,
    /// Task CPU
    pub cpu: Option<String>,
    /// Network mode
    pub network_mode: Option<String>,
}

/// Response to a registration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterTaskDefinitionOutput {
    /// The new revision
    pub task_definition: Option<TaskDefinition>,
}

/// Request to list task definitions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListTaskDefinitionsInput {
    /// Only definitions whose family starts with this prefix
    pub family_prefix: Option<String>,
    /// Only definitions in this status
    pub status: Option<String>,
}

/// One entry of a capacity provider strategy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityProviderStrategyItem {
    /// Capacity provider name
    pub capacity_provider: String,
}

/// Placement strategy entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementStrategy {
    /// Strategy type
    #[serde(rename = "type")]
    pub kind: String,
    /// Field the strategy applies to
    pub field: Option<String>,
}

/// Placement constraint entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementConstraint {
    /// `distinctInstance` or `memberOf`
    #[serde(rename = "type")]
    pub kind: String,
    /// Query expression for `memberOf`
    pub expression: Option<String>,
}

/// AWSVPC network configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsVpcConfiguration {
    /// Subnets
    pub subnets: Vec<String>,
    /// Security groups
    pub security_groups: Vec<String>,
}

/// Container-level launch overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerOverride {
    /// Container name
    pub name: Option<String>,
    /// Command
    pub command: Vec<String>,
    /// Memory in MB
    pub memory: Option<i32>,
    /// CPU units
    pub cpu: Option<i32>,
    /// Environment variables
    pub environment: Vec<KeyValuePair>,
}

/// Task-level launch overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOverride {
    /// Container overrides
    pub container_overrides: Vec<ContainerOverride>,
    /// Task memory, as a decimal string of MB
    pub memory: Option<String>,
    /// Task CPU units, as a decimal string
    pub cpu: Option<String>,
    /// Task role
    pub task_role_arn: Option<String>,
    /// Execution role
    pub execution_role_arn: Option<String>,
}

/// Request to run a task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTaskInput {
    /// Cluster
    pub cluster: Option<String>,
    /// Task definition ID
    pub task_definition: String,
    /// Number of tasks
    pub count: Option<i32>,
    /// Capacity provider strategy
    pub capacity_provider_strategy: Vec<CapacityProviderStrategyItem>,
    /// Whether execute-command sessions are allowed
    pub enable_execute_command: bool,
    /// Task group
    pub group: Option<String>,
    /// AWSVPC networking
    pub network_configuration: Option<AwsVpcConfiguration>,
    /// Launch overrides
    pub overrides: Option<TaskOverride>,
    /// Placement constraints
    pub placement_constraints: Vec<PlacementConstraint>,
    /// Placement strategy
    pub placement_strategy: Vec<PlacementStrategy>,
    /// Tags
    pub tags: Vec<Tag>,
}

/// A container in a running task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Container ARN
    pub container_arn: Option<String>,
    /// Container name
    pub name: Option<String>,
    /// Last reported status
    pub last_status: Option<String>,
    /// ARN of the owning task
    pub task_arn: Option<String>,
}

/// A task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Task ARN
    pub task_arn: Option<String>,
    /// Cluster ARN
    pub cluster_arn: Option<String>,
    /// Task definition ARN
    pub task_definition_arn: Option<String>,
    /// Last reported status
    pub last_status: Option<String>,
    /// Desired status
    pub desired_status: Option<String>,
    /// Containers
    pub containers: Vec<Container>,
    /// Task group
    pub group: Option<String>,
    /// Why the task stopped
    pub stopped_reason: Option<String>,
    /// Tags
    pub tags: Vec<Tag>,
}

/// A per-resource failure reported alongside a successful call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// ARN of the failed resource
    pub arn: Option<String>,
    /// Reason code
    pub reason: Option<String>,
    /// Human-readable detail
    pub detail: Option<String>,
}

/// Response to a run request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTaskOutput {
    /// Started tasks
    pub tasks: Vec<Task>,
    /// Failures
    pub failures: Vec<Failure>,
}

/// Request to describe tasks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribeTasksInput {
    /// Cluster
    pub cluster: Option<String>,
    /// Task IDs
    pub tasks: Vec<String>,
}

/// Response to a describe request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribeTasksOutput {
    /// Found tasks
    pub tasks: Vec<Task>,
    /// Failures, including tasks that were not found
    pub failures: Vec<Failure>,
}

/// Request to list tasks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListTasksInput {
    /// Cluster
    pub cluster: Option<String>,
    /// Only tasks of this definition family
    pub family: Option<String>,
    /// Only tasks with this desired status
    pub desired_status: Option<String>,
}

/// Request to stop a task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopTaskInput {
    /// Cluster
    pub cluster: Option<String>,
    /// Task ID
    pub task: String,
    /// Reason recorded on the task
    pub reason: Option<String>,
}
