//! Mapping between pod options and orchestration service shapes

use super::api;
use crate::options::{
    AwsVpcOptions, CONSTRAINT_DISTINCT_INSTANCE, ContainerDefinition, EnvironmentVariable,
    LogConfiguration, OverridePodDefinitionOptions, PlacementOptions, PodDefinitionOptions,
    PodExecutionOptions, PortMapping,
};
use crate::resources::{ContainerResources, ContainerSecret, ResourceRef};
use crate::status::{ContainerStatusInfo, PodStatusInfo, TaskStatus};
use secret_vault::export_tags;

/// Placement constraint type for query expressions
const CONSTRAINT_MEMBER_OF: &str = "memberOf";

/// Build the registration request for a validated pod definition.
///
/// Pod memory and CPU are sent as decimal strings, and only when non-zero.
pub fn export_pod_definition(opts: &PodDefinitionOptions) -> api::RegisterTaskDefinitionInput {
    api::RegisterTaskDefinitionInput {
        family: opts.name.clone(),
        container_definitions: opts
            .container_definitions
            .iter()
            .map(export_container_definition)
            .collect(),
        memory: non_zero(opts.memory_mb).map(|m| m.to_string()),
        cpu: non_zero(opts.cpu).map(|c| c.to_string()),
        network_mode: opts.network_mode.map(|m| m.as_str().to_string()),
        task_role_arn: opts.task_role.clone(),
        execution_role_arn: opts.execution_role.clone(),
        tags: export_tags(&opts.tags),
    }
}

fn non_zero(value: Option<i32>) -> Option<i32> {
    value.filter(|v| *v != 0)
}

/// Build one container of a registration request
pub fn export_container_definition(def: &ContainerDefinition) -> api::ContainerDefinition {
    api::ContainerDefinition {
        name: def.name.clone(),
        image: def.image.clone(),
        command: def.command.clone(),
        working_directory: def.working_dir.clone().filter(|d| !d.is_empty()),
        memory: non_zero(def.memory_mb),
        cpu: def.cpu.unwrap_or_default(),
        environment: export_environment(&def.env_vars),
        secrets: export_secrets(&def.env_vars),
        credentials_parameter: def.repo_creds.as_ref().and_then(|c| c.id.clone()),
        port_mappings: def.port_mappings.iter().map(export_port_mapping).collect(),
        log_configuration: def.log_configuration.as_ref().map(export_log_configuration),
    }
}

fn export_environment(env_vars: &[EnvironmentVariable]) -> Vec<api::KeyValuePair> {
    env_vars
        .iter()
        .filter(|e| e.secret_opts.is_none())
        .map(|e| api::KeyValuePair {
            name: e.name.clone(),
            value: e.value.clone(),
        })
        .collect()
}

fn export_secrets(env_vars: &[EnvironmentVariable]) -> Vec<api::Secret> {
    env_vars
        .iter()
        .filter_map(|e| {
            e.secret_opts.as_ref().map(|s| api::Secret {
                name: e.name.clone(),
                value_from: s.id.clone(),
            })
        })
        .collect()
}

fn export_port_mapping(mapping: &PortMapping) -> api::PortMapping {
    api::PortMapping {
        container_port: mapping.container_port.unwrap_or_default(),
        host_port: mapping.host_port.unwrap_or_default(),
    }
}

fn export_log_configuration(config: &LogConfiguration) -> api::LogConfiguration {
    api::LogConfiguration {
        log_driver: config.log_driver.clone().unwrap_or_default(),
        options: config.options.clone(),
    }
}

/// Build the request to run one task of `task_definition`.
///
/// `opts` must be validated so that placement is set.
pub fn export_run_task(task_definition: &ResourceRef, opts: &PodExecutionOptions) -> api::RunTaskInput {
    let placement = opts
        .placement_opts
        .clone()
        .unwrap_or_else(PlacementOptions::default_binpack);
    api::RunTaskInput {
        cluster: opts.cluster.clone(),
        task_definition: task_definition.id().to_string(),
        count: Some(1),
        capacity_provider_strategy: opts
            .capacity_provider
            .iter()
            .map(|provider| api::CapacityProviderStrategyItem {
                capacity_provider: provider.clone(),
            })
            .collect(),
        enable_execute_command: opts.supports_debug_mode.unwrap_or_default(),
        group: placement.group.clone(),
        network_configuration: opts.awsvpc_opts.as_ref().map(export_awsvpc_options),
        overrides: opts.override_opts.as_ref().map(export_overrides),
        placement_constraints: export_placement_constraints(&placement),
        placement_strategy: export_placement_strategy(&placement),
        tags: export_tags(&opts.tags),
    }
}

/// Task overrides. Pod-level limits are decimal strings; container-level
/// limits are integers.
fn export_overrides(opts: &OverridePodDefinitionOptions) -> api::TaskOverride {
    api::TaskOverride {
        container_overrides: opts
            .container_definitions
            .iter()
            .map(|def| api::ContainerOverride {
                name: def.name.clone(),
                command: def.command.clone(),
                memory: def.memory_mb,
                cpu: def.cpu,
                environment: def
                    .env_vars
                    .iter()
                    .map(|kv| api::KeyValuePair {
                        name: kv.name.clone(),
                        value: kv.value.clone(),
                    })
                    .collect(),
            })
            .collect(),
        memory: opts.memory_mb.map(|m| m.to_string()),
        cpu: opts.cpu.map(|c| c.to_string()),
        task_role_arn: opts.task_role.clone(),
        execution_role_arn: opts.execution_role.clone(),
    }
}

fn export_placement_strategy(opts: &PlacementOptions) -> Vec<api::PlacementStrategy> {
    opts.strategy
        .iter()
        .map(|strategy| api::PlacementStrategy {
            kind: strategy.as_str().to_string(),
            field: opts.strategy_parameter.clone(),
        })
        .collect()
}

fn export_placement_constraints(opts: &PlacementOptions) -> Vec<api::PlacementConstraint> {
    opts.instance_filters
        .iter()
        .map(|filter| {
            if filter == CONSTRAINT_DISTINCT_INSTANCE {
                api::PlacementConstraint {
                    kind: CONSTRAINT_DISTINCT_INSTANCE.to_string(),
                    expression: None,
                }
            } else {
                api::PlacementConstraint {
                    kind: CONSTRAINT_MEMBER_OF.to_string(),
                    expression: Some(filter.clone()),
                }
            }
        })
        .collect()
}

fn export_awsvpc_options(opts: &AwsVpcOptions) -> api::AwsVpcConfiguration {
    api::AwsVpcConfiguration {
        subnets: opts.subnets.clone(),
        security_groups: opts.security_groups.clone(),
    }
}

/// Translate a task's reported states into a pod status
pub fn translate_pod_status_info(task: &api::Task) -> PodStatusInfo {
    PodStatusInfo {
        status: translate_status(task.last_status.as_deref()),
        containers: task
            .containers
            .iter()
            .map(|c| ContainerStatusInfo {
                container_id: c.container_arn.clone().unwrap_or_default(),
                name: c.name.clone().unwrap_or_default(),
                status: translate_status(c.last_status.as_deref()),
            })
            .collect(),
    }
}

fn translate_status(status: Option<&str>) -> crate::status::PodStatus {
    TaskStatus::parse(status.unwrap_or_default()).to_pod_status()
}

/// Pair each running container with the secrets of the definition of the
/// same name.
pub fn translate_container_resources(
    containers: &[api::Container],
    defs: &[ContainerDefinition],
) -> Vec<ContainerResources> {
    containers
        .iter()
        .map(|container| {
            let name = container.name.clone().unwrap_or_default();
            let secrets = defs
                .iter()
                .filter(|def| def.name.as_deref() == Some(name.as_str()))
                .flat_map(container_secrets)
                .collect();
            ContainerResources {
                container_id: container.container_arn.clone().unwrap_or_default(),
                name,
                secrets,
            }
        })
        .collect()
}

/// Secrets referenced by a container definition
pub fn container_secrets(def: &ContainerDefinition) -> Vec<ContainerSecret> {
    let env_secrets = def.env_vars.iter().filter_map(|e| e.secret_opts.as_ref()).filter_map(|s| {
        s.id.as_ref().map(|id| ContainerSecret {
            name: s.name.clone().filter(|n| !n.is_empty()),
            secret: ResourceRef::new(id.clone(), s.is_owned()),
        })
    });
    let repo_secret = def.repo_creds.as_ref().and_then(|c| {
        c.id.as_ref().map(|id| ContainerSecret {
            name: c.name.clone().filter(|n| !n.is_empty()),
            secret: ResourceRef::new(id.clone(), c.is_owned()),
        })
    });
    env_secrets.chain(repo_secret).collect()
}
