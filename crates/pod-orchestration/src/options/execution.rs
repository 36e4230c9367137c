//! Options for launching a pod from a definition

use super::{KeyValue, ValidationErrors, Validated, merge_map, merge_option};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Place pods on instances so as to use the least memory first
pub const STRATEGY_PARAM_BINPACK_MEMORY: &str = "memory";
/// Place pods on instances so as to use the least CPU first
pub const STRATEGY_PARAM_BINPACK_CPU: &str = "cpu";
/// Spread pods evenly across instances
pub const STRATEGY_PARAM_SPREAD_HOST: &str = "host";
/// Instance filter placing every pod of a group on a different instance
pub const CONSTRAINT_DISTINCT_INSTANCE: &str = "distinctInstance";
/// Largest accepted size of serialized pod definition overrides
pub const MAX_OVERRIDE_SIZE_BYTES: usize = 8 * 1024;

/// Runtime parameters for launching a pod.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PodExecutionOptions {
    /// Cluster to run in. The service default cluster if unset.
    pub cluster: Option<String>,
    /// Capacity provider to run with
    pub capacity_provider: Option<String>,
    /// Per-launch overrides of the definition
    pub override_opts: Option<OverridePodDefinitionOptions>,
    /// Placement. Defaults to binpack by memory.
    pub placement_opts: Option<PlacementOptions>,
    /// Networking for [`super::NetworkMode::AwsVpc`] pods
    pub awsvpc_opts: Option<AwsVpcOptions>,
    /// Whether the pod can be attached to for debugging
    pub supports_debug_mode: Option<bool>,
    /// Tags on the launched task
    pub tags: HashMap<String, String>,
}

impl PodExecutionOptions {
    /// Create empty execution options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cluster
    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = Some(cluster.into());
        self
    }

    /// Set the capacity provider
    pub fn with_capacity_provider(mut self, provider: impl Into<String>) -> Self {
        self.capacity_provider = Some(provider.into());
        self
    }

    /// Set the overrides
    pub fn with_override_options(mut self, opts: OverridePodDefinitionOptions) -> Self {
        self.override_opts = Some(opts);
        self
    }

    /// Set the placement
    pub fn with_placement_options(mut self, opts: PlacementOptions) -> Self {
        self.placement_opts = Some(opts);
        self
    }

    /// Set the AWSVPC networking
    pub fn with_awsvpc_options(mut self, opts: AwsVpcOptions) -> Self {
        self.awsvpc_opts = Some(opts);
        self
    }

    /// Set whether debug mode is supported
    pub fn with_supports_debug_mode(mut self, supported: bool) -> Self {
        self.supports_debug_mode = Some(supported);
        self
    }

    /// Replace the tags
    pub fn with_tags(mut self, tags: HashMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    /// Add tags, overwriting existing keys
    pub fn add_tags(mut self, tags: impl IntoIterator<Item = (String, String)>) -> Self {
        self.tags.extend(tags);
        self
    }

    /// Combine options left to right; later set fields win.
    pub fn merge(opts: &[PodExecutionOptions]) -> Self {
        let mut merged = Self::default();
        for opt in opts {
            merge_option(&mut merged.cluster, &opt.cluster);
            merge_option(&mut merged.capacity_provider, &opt.capacity_provider);
            merge_option(&mut merged.override_opts, &opt.override_opts);
            merge_option(&mut merged.placement_opts, &opt.placement_opts);
            merge_option(&mut merged.awsvpc_opts, &opt.awsvpc_opts);
            merge_option(&mut merged.supports_debug_mode, &opt.supports_debug_mode);
            merge_map(&mut merged.tags, &opt.tags);
        }
        merged
    }

    /// Check the options. Placement defaults are filled only when valid.
    pub fn validate(&self) -> Validated<Self> {
        let mut errors = ValidationErrors::new();
        if let Some(opts) = &self.override_opts {
            errors.wrap("invalid pod definition override options", opts.validate());
        }
        let placement = self.placement_opts.as_ref().map(PlacementOptions::validate);
        if let Some(placement) = &placement {
            errors.wrap("invalid placement options", placement.errors.clone());
        }
        if let Some(opts) = &self.awsvpc_opts {
            errors.wrap("invalid AWSVPC options", opts.validate());
        }

        let mut value = self.clone();
        if errors.is_empty() {
            value.placement_opts = Some(match placement {
                Some(placement) => placement.value,
                None => PlacementOptions::default_binpack(),
            });
        }
        Validated::new(value, errors)
    }
}

/// Per-launch overrides of a pod definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverridePodDefinitionOptions {
    /// Container overrides
    pub container_definitions: Vec<OverrideContainerDefinition>,
    /// Pod memory limit in MB
    pub memory_mb: Option<i32>,
    /// Pod CPU limit
    pub cpu: Option<i32>,
    /// Task role
    pub task_role: Option<String>,
    /// Execution role
    pub execution_role: Option<String>,
}

impl OverridePodDefinitionOptions {
    /// Create empty overrides
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the container overrides
    pub fn with_container_definitions(mut self, defs: Vec<OverrideContainerDefinition>) -> Self {
        self.container_definitions = defs;
        self
    }

    /// Append container overrides
    pub fn add_container_definitions(
        mut self,
        defs: impl IntoIterator<Item = OverrideContainerDefinition>,
    ) -> Self {
        self.container_definitions.extend(defs);
        self
    }

    /// Override the memory limit
    pub fn with_memory_mb(mut self, memory_mb: i32) -> Self {
        self.memory_mb = Some(memory_mb);
        self
    }

    /// Override the CPU limit
    pub fn with_cpu(mut self, cpu: i32) -> Self {
        self.cpu = Some(cpu);
        self
    }

    /// Override the task role
    pub fn with_task_role(mut self, role: impl Into<String>) -> Self {
        self.task_role = Some(role.into());
        self
    }

    /// Override the execution role
    pub fn with_execution_role(mut self, role: impl Into<String>) -> Self {
        self.execution_role = Some(role.into());
        self
    }

    /// Check the overrides, including that they fit in a launch request
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        match serde_json::to_vec(self) {
            Ok(encoded) => errors.push_when(
                encoded.len() > MAX_OVERRIDE_SIZE_BYTES,
                format!(
                    "overrides take {} bytes when serialized, exceeding the limit of {} bytes",
                    encoded.len(),
                    MAX_OVERRIDE_SIZE_BYTES
                ),
            ),
            Err(e) => errors.push(format!("serializing overrides to check their size: {e}")),
        }
        errors.push_when(
            self.memory_mb.is_some_and(|m| m <= 0),
            "must have positive memory value if specified",
        );
        errors.push_when(
            self.cpu.is_some_and(|c| c <= 0),
            "must have positive CPU value if specified",
        );
        for def in &self.container_definitions {
            errors.wrap(
                format_args!(
                    "container definition '{}'",
                    def.name.as_deref().unwrap_or_default()
                ),
                def.validate(),
            );
        }
        errors
    }
}

/// Per-launch overrides of one container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverrideContainerDefinition {
    /// Name of the container to override. Required.
    pub name: Option<String>,
    /// Command
    pub command: Vec<String>,
    /// Memory in MB
    pub memory_mb: Option<i32>,
    /// CPU units
    pub cpu: Option<i32>,
    /// Plaintext environment variables
    pub env_vars: Vec<KeyValue>,
}

impl OverrideContainerDefinition {
    /// Create an empty container override
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name of the container to override
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Override the command
    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    /// Override the memory
    pub fn with_memory_mb(mut self, memory_mb: i32) -> Self {
        self.memory_mb = Some(memory_mb);
        self
    }

    /// Override the CPU
    pub fn with_cpu(mut self, cpu: i32) -> Self {
        self.cpu = Some(cpu);
        self
    }

    /// Replace the environment variables
    pub fn with_environment_variables(mut self, env_vars: Vec<KeyValue>) -> Self {
        self.env_vars = env_vars;
        self
    }

    /// Append environment variables
    pub fn add_environment_variables(mut self, env_vars: impl IntoIterator<Item = KeyValue>) -> Self {
        self.env_vars.extend(env_vars);
        self
    }

    /// Check the override
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.push_when(self.name.is_none(), "must specify a container name");
        errors.push_when(
            self.name.as_deref() == Some(""),
            "must specify a non-empty container name",
        );
        errors.push_when(
            self.memory_mb.is_some_and(|m| m <= 0),
            "must have positive memory value if specified",
        );
        errors.push_when(
            self.cpu.is_some_and(|c| c <= 0),
            "must have positive CPU value if specified",
        );
        for env_var in &self.env_vars {
            errors.wrap(
                format_args!(
                    "environment variable '{}'",
                    env_var.name.as_deref().unwrap_or_default()
                ),
                env_var.validate(),
            );
        }
        errors
    }
}

/// How the orchestration service picks instances for a pod
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementStrategy {
    /// Spread evenly over a field such as the host or availability zone
    Spread,
    /// Pick at random
    Random,
    /// Fill instances by the least available memory or CPU
    Binpack,
}

impl PlacementStrategy {
    /// Name used by the orchestration service
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spread => "spread",
            Self::Random => "random",
            Self::Binpack => "binpack",
        }
    }
}

impl fmt::Display for PlacementStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a pod may be placed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementOptions {
    /// Task group the pod belongs to
    pub group: Option<String>,
    /// Placement strategy. Defaults to binpack.
    pub strategy: Option<PlacementStrategy>,
    /// Field the strategy applies to
    pub strategy_parameter: Option<String>,
    /// Instance filters: [`CONSTRAINT_DISTINCT_INSTANCE`] or a query expression
    pub instance_filters: Vec<String>,
}

impl PlacementOptions {
    /// Create empty placement options
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn default_binpack() -> Self {
        Self::new()
            .with_strategy(PlacementStrategy::Binpack)
            .with_strategy_parameter(STRATEGY_PARAM_BINPACK_MEMORY)
    }

    /// Set the task group
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Set the strategy
    pub fn with_strategy(mut self, strategy: PlacementStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Set the strategy parameter
    pub fn with_strategy_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.strategy_parameter = Some(parameter.into());
        self
    }

    /// Replace the instance filters
    pub fn with_instance_filters(mut self, filters: Vec<String>) -> Self {
        self.instance_filters = filters;
        self
    }

    /// Append instance filters
    pub fn add_instance_filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instance_filters.extend(filters.into_iter().map(Into::into));
        self
    }

    /// Check the placement and fill the strategy defaults when valid
    pub fn validate(&self) -> Validated<Self> {
        let mut errors = ValidationErrors::new();
        errors.push_when(
            self.group.as_deref() == Some(""),
            "cannot specify an empty group name",
        );
        if let (Some(strategy), Some(parameter)) = (self.strategy, self.strategy_parameter.as_deref()) {
            errors.push_when(
                strategy == PlacementStrategy::Binpack
                    && parameter != STRATEGY_PARAM_BINPACK_MEMORY
                    && parameter != STRATEGY_PARAM_BINPACK_CPU,
                format!(
                    "strategy parameter cannot be '{}' when the strategy is '{}'",
                    parameter, strategy
                ),
            );
            errors.push_when(
                strategy != PlacementStrategy::Spread && parameter == STRATEGY_PARAM_SPREAD_HOST,
                format!(
                    "strategy parameter cannot be '{}' when the strategy is not '{}'",
                    parameter,
                    PlacementStrategy::Spread
                ),
            );
        }

        let mut value = self.clone();
        if errors.is_empty() {
            let strategy = *value.strategy.get_or_insert(PlacementStrategy::Binpack);
            if value.strategy_parameter.is_none() {
                value.strategy_parameter = match strategy {
                    PlacementStrategy::Binpack => Some(STRATEGY_PARAM_BINPACK_MEMORY.to_string()),
                    PlacementStrategy::Spread => Some(STRATEGY_PARAM_SPREAD_HOST.to_string()),
                    PlacementStrategy::Random => None,
                };
            }
        }
        Validated::new(value, errors)
    }
}

/// Networking for pods in [`super::NetworkMode::AwsVpc`] mode
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsVpcOptions {
    /// Subnets to attach. At least one is required.
    pub subnets: Vec<String>,
    /// Security groups to apply
    pub security_groups: Vec<String>,
}

impl AwsVpcOptions {
    /// Create empty AWSVPC options
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the subnets
    pub fn with_subnets(mut self, subnets: Vec<String>) -> Self {
        self.subnets = subnets;
        self
    }

    /// Append subnets
    pub fn add_subnets<I, S>(mut self, subnets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subnets.extend(subnets.into_iter().map(Into::into));
        self
    }

    /// Replace the security groups
    pub fn with_security_groups(mut self, groups: Vec<String>) -> Self {
        self.security_groups = groups;
        self
    }

    /// Append security groups
    pub fn add_security_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.security_groups.extend(groups.into_iter().map(Into::into));
        self
    }

    /// Check that at least one subnet is given
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.push_when(self.subnets.is_empty(), "must specify at least one subnet");
        errors
    }
}
