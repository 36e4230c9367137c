//! Pod definition options

use super::{
    ContainerDefinition, ContentDigest, Validated, ValidationErrors, merge_map, merge_option,
    merge_vec, random_name,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Networking mode for the containers of a pod
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    /// Networking is disabled
    None,
    /// Each pod gets its own elastic network interface
    #[serde(rename = "awsvpc")]
    AwsVpc,
    /// Containers use the host's virtual bridge network
    #[default]
    Bridge,
    /// Containers share the host's network interface
    Host,
}

impl NetworkMode {
    /// Name used by the orchestration service
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::AwsVpc => "awsvpc",
            Self::Bridge => "bridge",
            Self::Host => "host",
        }
    }
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Template for building a pod.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PodDefinitionOptions {
    /// Friendly name of the definition. A random name is assigned on validation if unset.
    pub name: Option<String>,
    /// Containers in the pod. At least one is required.
    pub container_definitions: Vec<ContainerDefinition>,
    /// Memory limit for the whole pod, in MB
    pub memory_mb: Option<i32>,
    /// CPU limit for the whole pod, in CPU units
    pub cpu: Option<i32>,
    /// Networking mode. Defaults to [`NetworkMode::Bridge`].
    pub network_mode: Option<NetworkMode>,
    /// Role the containers assume
    pub task_role: Option<String>,
    /// Role the orchestration agent assumes to launch the pod
    pub execution_role: Option<String>,
    /// Resource tags
    pub tags: HashMap<String, String>,
}

impl PodDefinitionOptions {
    /// Create empty definition options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replace the container definitions
    pub fn with_container_definitions(mut self, defs: Vec<ContainerDefinition>) -> Self {
        self.container_definitions = defs;
        self
    }

    /// Append container definitions
    pub fn add_container_definitions(
        mut self,
        defs: impl IntoIterator<Item = ContainerDefinition>,
    ) -> Self {
        self.container_definitions.extend(defs);
        self
    }

    /// Set the pod memory limit in MB
    pub fn with_memory_mb(mut self, memory_mb: i32) -> Self {
        self.memory_mb = Some(memory_mb);
        self
    }

    /// Set the pod CPU limit
    pub fn with_cpu(mut self, cpu: i32) -> Self {
        self.cpu = Some(cpu);
        self
    }

    /// Set the network mode
    pub fn with_network_mode(mut self, mode: NetworkMode) -> Self {
        self.network_mode = Some(mode);
        self
    }

    /// Set the task role
    pub fn with_task_role(mut self, role: impl Into<String>) -> Self {
        self.task_role = Some(role.into());
        self
    }

    /// Set the execution role
    pub fn with_execution_role(mut self, role: impl Into<String>) -> Self {
        self.execution_role = Some(role.into());
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

    /// Effective network mode
    pub fn effective_network_mode(&self) -> NetworkMode {
        self.network_mode.unwrap_or_default()
    }

    /// Combine options left to right; later set fields win.
    pub fn merge(opts: &[PodDefinitionOptions]) -> Self {
        let mut merged = Self::default();
        for opt in opts {
            merge_option(&mut merged.name, &opt.name);
            merge_vec(&mut merged.container_definitions, &opt.container_definitions);
            merge_option(&mut merged.memory_mb, &opt.memory_mb);
            merge_option(&mut merged.cpu, &opt.cpu);
            merge_option(&mut merged.network_mode, &opt.network_mode);
            merge_option(&mut merged.task_role, &opt.task_role);
            merge_option(&mut merged.execution_role, &opt.execution_role);
            merge_map(&mut merged.tags, &opt.tags);
        }
        merged
    }

    /// Check the definition and every container in it.
    ///
    /// The pod name is defaulted even when errors are found; each container
    /// name only when that container is valid.
    pub fn validate(&self) -> Validated<Self> {
        let mut errors = ValidationErrors::new();
        errors.push_when(
            self.name.as_deref() == Some(""),
            "cannot specify an empty name",
        );
        errors.push_when(
            self.memory_mb.is_some_and(|m| m <= 0),
            "must have positive memory value if non-default",
        );
        errors.push_when(
            self.cpu.is_some_and(|c| c <= 0),
            "must have positive CPU value if non-default",
        );

        let (containers, container_errors) = self.validate_container_definitions();
        errors.wrap("invalid container definitions", container_errors);

        let mut value = self.clone();
        value.container_definitions = containers;
        if value.name.is_none() {
            value.name = Some(random_name());
        }
        Validated::new(value, errors)
    }

    fn validate_container_definitions(&self) -> (Vec<ContainerDefinition>, ValidationErrors) {
        let mut errors = ValidationErrors::new();
        errors.push_when(
            self.container_definitions.is_empty(),
            "must specify at least one container definition",
        );

        let network_mode = self.effective_network_mode();
        let mut total_memory_mb: i64 = 0;
        let mut total_cpu: i64 = 0;
        let mut containers = Vec::with_capacity(self.container_definitions.len());
        for def in &self.container_definitions {
            let validated = def.validate();
            errors.wrap(
                format_args!(
                    "container definition '{}'",
                    def.name.as_deref().unwrap_or_default()
                ),
                validated.errors,
            );
            containers.push(validated.value);

            match network_mode {
                NetworkMode::None => errors.push_when(
                    !def.port_mappings.is_empty(),
                    "cannot specify port mappings because networking is disabled",
                ),
                NetworkMode::Host | NetworkMode::AwsVpc => {
                    for mapping in &def.port_mappings {
                        let container_port = mapping.container_port.unwrap_or_default();
                        if let Some(host_port) = mapping.host_port {
                            errors.push_when(
                                host_port != container_port,
                                format!(
                                    "host port '{}' must be omitted or identical to the container port '{}' when network mode is '{}'",
                                    host_port, container_port, network_mode
                                ),
                            );
                        }
                    }
                }
                NetworkMode::Bridge => {}
            }

            match def.memory_mb {
                Some(memory_mb) => total_memory_mb += i64::from(memory_mb),
                None => errors.push_when(
                    self.memory_mb.is_none(),
                    "must specify container-level memory to allocate for each container if pod-level memory is not specified",
                ),
            }
            match def.cpu {
                Some(cpu) => total_cpu += i64::from(cpu),
                None => errors.push_when(
                    self.cpu.is_none(),
                    "must specify container-level CPU to allocate for each container if pod-level CPU is not specified",
                ),
            }
        }

        if let Some(memory_mb) = self.memory_mb {
            errors.push_when(
                i64::from(memory_mb) < total_memory_mb,
                format!(
                    "total memory requested for the individual containers ({} MB) is greater than the memory available for the entire task ({} MB)",
                    total_memory_mb, memory_mb
                ),
            );
        }
        if let Some(cpu) = self.cpu {
            errors.push_when(
                i64::from(cpu) < total_cpu,
                format!(
                    "total CPU requested for the individual containers ({} units) is greater than the CPU available for the entire task ({} units)",
                    total_cpu, cpu
                ),
            );
        }

        (containers, errors)
    }

    /// Stable digest of the definition's content.
    ///
    /// Tags, containers, environment variables and port mappings contribute
    /// independently of their order.
    pub fn content_hash(&self) -> String {
        let mut d = ContentDigest::new();
        d.optional("name", self.name.as_deref())
            .unordered(
                "container_definition",
                self.container_definitions
                    .iter()
                    .map(ContainerDefinition::digest)
                    .collect(),
            )
            .optional("memory_mb", self.memory_mb)
            .optional("cpu", self.cpu)
            .optional("network_mode", self.network_mode)
            .optional("task_role", self.task_role.as_deref())
            .optional("execution_role", self.execution_role.as_deref())
            .pairs("tag", &self.tags);
        d.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{EnvironmentVariable, PortMapping};

    fn container(name: &str) -> ContainerDefinition {
        ContainerDefinition::new()
            .with_name(name)
            .with_image("alpine")
            .with_memory_mb(64)
            .with_cpu(64)
    }

    #[test]
    fn test_pod_limits_cover_unsized_container() {
        let opts = PodDefinitionOptions::new()
            .with_memory_mb(128)
            .with_cpu(128)
            .add_container_definitions([ContainerDefinition::new().with_image("alpine")]);
        let validated = opts.validate();
        assert!(validated.is_valid(), "{}", validated.errors);
        let name = validated.value.container_definitions[0].name.clone();
        assert!(name.is_some_and(|n| !n.is_empty()));
    }

    #[test]
    fn test_unsized_container_without_pod_limits_fails() {
        let opts = PodDefinitionOptions::new()
            .add_container_definitions([ContainerDefinition::new().with_image("alpine")]);
        let validated = opts.validate();
        assert_eq!(validated.errors.len(), 1);
        assert!(validated.errors.to_string().contains("container-level memory"));
        assert!(validated.errors.to_string().contains("container-level CPU"));

        let sized = opts.clone().with_memory_mb(256).with_cpu(256);
        assert!(sized.validate().is_valid());
    }

    #[test]
    fn test_name_defaulted_even_when_invalid() {
        let validated = PodDefinitionOptions::new().validate();
        assert!(!validated.is_valid());
        assert!(validated.value.name.is_some());
        assert!(
            validated
                .errors
                .to_string()
                .contains("must specify at least one container definition")
        );
    }

    #[test]
    fn test_container_totals_must_fit_pod_limits() {
        let opts = PodDefinitionOptions::new()
            .with_memory_mb(100)
            .with_cpu(1024)
            .add_container_definitions([container("a"), container("b")]);
        let errors = opts.validate().errors.to_string();
        assert!(errors.contains("(128 MB) is greater than the memory available for the entire task (100 MB)"));
        assert!(!errors.contains("units"));
    }

    #[test]
    fn test_container_totals_do_not_overflow() {
        let opts = PodDefinitionOptions::new()
            .with_memory_mb(1024)
            .with_cpu(i32::MAX)
            .add_container_definitions([
                ContainerDefinition::new()
                    .with_name("a")
                    .with_image("alpine")
                    .with_memory_mb(i32::MAX)
                    .with_cpu(i32::MAX),
                ContainerDefinition::new()
                    .with_name("b")
                    .with_image("alpine")
                    .with_memory_mb(2)
                    .with_cpu(1),
            ]);
        let validated = opts.validate();
        assert!(!validated.is_valid());
        let errors = validated.errors.to_string();
        assert!(errors.contains("(2147483649 MB) is greater than the memory available for the entire task (1024 MB)"));
        assert!(errors.contains("(2147483648 units) is greater than the CPU available for the entire task (2147483647 units)"));
    }

    #[test]
    fn test_port_mapping_rules_follow_network_mode() {
        let with_ports = container("web").add_port_mappings([PortMapping::new(80).with_host_port(8080)]);
        let none = PodDefinitionOptions::new()
            .with_network_mode(NetworkMode::None)
            .add_container_definitions([with_ports.clone()]);
        assert!(none.validate().errors.to_string().contains("networking is disabled"));

        let host = none.clone().with_network_mode(NetworkMode::Host);
        assert!(host.validate().errors.to_string().contains("host port '8080'"));

        let bridge = none.with_network_mode(NetworkMode::Bridge);
        assert!(bridge.validate().is_valid());
    }

    #[test]
    fn test_validate_is_idempotent() {
        let opts = PodDefinitionOptions::new()
            .with_memory_mb(128)
            .add_container_definitions([ContainerDefinition::new().with_image("alpine").with_cpu(32)]);
        let once = opts.validate().value;
        let twice = once.validate().value;
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_overwrites_left_to_right() {
        let a = PodDefinitionOptions::new()
            .with_name("a")
            .with_memory_mb(128)
            .add_tags([("k".to_string(), "a".to_string())]);
        let b = PodDefinitionOptions::new()
            .with_cpu(256)
            .add_tags([("other".to_string(), "b".to_string())]);
        let c = PodDefinitionOptions::new()
            .with_name("c")
            .add_container_definitions([container("web")]);

        let merged = PodDefinitionOptions::merge(&[a.clone(), b.clone(), c.clone()]);
        assert_eq!(merged.name.as_deref(), Some("c"));
        assert_eq!(merged.memory_mb, Some(128));
        assert_eq!(merged.cpu, Some(256));
        assert_eq!(merged.tags.len(), 1);
        assert_eq!(merged.tags.get("other").map(String::as_str), Some("b"));
        assert_eq!(merged.container_definitions.len(), 1);

        let nested = PodDefinitionOptions::merge(&[PodDefinitionOptions::merge(&[a, b]), c]);
        assert_eq!(nested, merged);
    }

    #[test]
    fn test_hash_ignores_ordering() {
        let env = |n: &str| EnvironmentVariable::new().with_name(n).with_value("v");
        let web = container("web")
            .with_environment_variables(vec![env("A"), env("B")])
            .with_port_mappings(vec![PortMapping::new(80), PortMapping::new(443)]);
        let web_shuffled = container("web")
            .with_environment_variables(vec![env("B"), env("A")])
            .with_port_mappings(vec![PortMapping::new(443), PortMapping::new(80)]);

        let tags: Vec<(String, String)> = (0..8).map(|i| (format!("k{i}"), format!("v{i}"))).collect();
        let mut reversed = tags.clone();
        reversed.reverse();

        let a = PodDefinitionOptions::new()
            .with_name("pod")
            .add_container_definitions([web, container("sidecar")])
            .add_tags(tags);
        let b = PodDefinitionOptions::new()
            .with_name("pod")
            .add_container_definitions([container("sidecar"), web_shuffled])
            .add_tags(reversed);
        assert_eq!(a.content_hash(), b.content_hash());

        assert_ne!(a.content_hash(), a.clone().with_cpu(512).content_hash());
        assert_ne!(a.content_hash(), a.clone().with_name("other").content_hash());
    }

    #[test]
    fn test_network_mode_serde_names() {
        let mode: NetworkMode = serde_json::from_str("\"awsvpc\"").unwrap();
        assert_eq!(mode, NetworkMode::AwsVpc);
        assert_eq!(serde_json::to_string(&NetworkMode::None).unwrap(), "\"none\"");
        assert_eq!(NetworkMode::default(), NetworkMode::Bridge);
    }
}
