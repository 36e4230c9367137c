//! Options for creating a pod from a new definition

use super::{
    NetworkMode, PodDefinitionOptions, PodExecutionOptions, Validated, ValidationErrors,
};
use serde::{Deserialize, Serialize};

/// A pod definition plus the parameters to launch it with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PodCreationOptions {
    /// Definition to register
    pub definition_opts: PodDefinitionOptions,
    /// Launch parameters
    pub execution_opts: Option<PodExecutionOptions>,
}

impl PodCreationOptions {
    /// Create creation options for a definition
    pub fn new(definition_opts: PodDefinitionOptions) -> Self {
        Self {
            definition_opts,
            execution_opts: None,
        }
    }

    /// Set the definition options
    pub fn with_definition_options(mut self, opts: PodDefinitionOptions) -> Self {
        self.definition_opts = opts;
        self
    }

    /// Set the execution options
    pub fn with_execution_options(mut self, opts: PodExecutionOptions) -> Self {
        self.execution_opts = Some(opts);
        self
    }

    /// Combine options left to right. Definition options merge field by
    /// field; execution options merge only across the inputs that set them.
    pub fn merge(opts: &[PodCreationOptions]) -> Self {
        let definitions: Vec<_> = opts.iter().map(|o| o.definition_opts.clone()).collect();
        let executions: Vec<_> = opts
            .iter()
            .filter_map(|o| o.execution_opts.clone())
            .collect();
        Self {
            definition_opts: PodDefinitionOptions::merge(&definitions),
            execution_opts: (!executions.is_empty())
                .then(|| PodExecutionOptions::merge(&executions)),
        }
    }

    /// Check the definition, the launch parameters and that AWSVPC networking
    /// is configured exactly when the network mode requires it.
    ///
    /// Execution defaults are filled only when everything is valid.
    pub fn validate(&self) -> Validated<Self> {
        let mut errors = ValidationErrors::new();
        let definition = self.definition_opts.validate();
        errors.wrap("invalid pod definition options", definition.errors);

        let is_awsvpc = definition.value.effective_network_mode() == NetworkMode::AwsVpc;
        let has_awsvpc_opts = self
            .execution_opts
            .as_ref()
            .is_some_and(|o| o.awsvpc_opts.is_some());
        errors.push_when(
            is_awsvpc && !has_awsvpc_opts,
            "must specify AWSVPC configuration when using AWSVPC network mode",
        );
        errors.push_when(
            !is_awsvpc && has_awsvpc_opts,
            "cannot specify AWSVPC configuration when network mode is not AWSVPC",
        );

        let execution = self.execution_opts.as_ref().map(PodExecutionOptions::validate);
        if let Some(execution) = &execution {
            errors.wrap("invalid execution options", execution.errors.clone());
        }

        let mut value = Self {
            definition_opts: definition.value,
            execution_opts: self.execution_opts.clone(),
        };
        if errors.is_empty() {
            value.execution_opts = Some(match execution {
                Some(execution) => execution.value,
                None => PodExecutionOptions::new().validate().value,
            });
        }
        Validated::new(value, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{AwsVpcOptions, ContainerDefinition, PlacementOptions};

    fn definition() -> PodDefinitionOptions {
        PodDefinitionOptions::new()
            .with_memory_mb(128)
            .with_cpu(128)
            .add_container_definitions([ContainerDefinition::new().with_image("alpine")])
    }

    #[test]
    fn test_awsvpc_config_without_awsvpc_mode_fails() {
        let opts = PodCreationOptions::new(definition()).with_execution_options(
            PodExecutionOptions::new().with_awsvpc_options(AwsVpcOptions::new().add_subnets(["subnet-1"])),
        );
        let validated = opts.validate();
        assert_eq!(
            validated.errors.messages(),
            ["cannot specify AWSVPC configuration when network mode is not AWSVPC"]
        );
    }

    #[test]
    fn test_awsvpc_mode_requires_config() {
        let opts = PodCreationOptions::new(definition().with_network_mode(NetworkMode::AwsVpc));
        assert_eq!(
            opts.validate().errors.messages(),
            ["must specify AWSVPC configuration when using AWSVPC network mode"]
        );

        let configured = opts.with_execution_options(
            PodExecutionOptions::new().with_awsvpc_options(AwsVpcOptions::new().add_subnets(["subnet-1"])),
        );
        assert!(configured.validate().is_valid());
    }

    #[test]
    fn test_missing_execution_options_are_defaulted() {
        let validated = PodCreationOptions::new(definition()).validate();
        assert!(validated.is_valid());
        let execution = validated.value.execution_opts.unwrap();
        assert_eq!(
            execution.placement_opts,
            Some(PlacementOptions::new().validate().value)
        );
    }

    #[test]
    fn test_merge_keeps_execution_options_unset_when_absent() {
        let merged = PodCreationOptions::merge(&[
            PodCreationOptions::new(definition()),
            PodCreationOptions::new(PodDefinitionOptions::new().with_name("named")),
        ]);
        assert!(merged.execution_opts.is_none());
        assert_eq!(merged.definition_opts.name.as_deref(), Some("named"));
        assert_eq!(merged.definition_opts.memory_mb, Some(128));

        let with_exec = PodCreationOptions::merge(&[
            merged,
            PodCreationOptions::default()
                .with_execution_options(PodExecutionOptions::new().with_cluster("c")),
        ]);
        assert_eq!(
            with_exec.execution_opts.and_then(|o| o.cluster).as_deref(),
            Some("c")
        );
    }
}
