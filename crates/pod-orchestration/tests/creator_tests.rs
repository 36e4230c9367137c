//! Pod creation and definition management

use pod_orchestration::{
    BasicPodCreator, BasicPodDefinitionManager, EcsOperation, Error, MemoryEcsClient,
    MemoryPodDefinitionCache, PodCreator, PodDefinitionManager, RESOURCE_TYPE_TASK_DEFINITION,
    ResourceRef,
    ecs::{api::Failure, is_insufficient_capacity},
    find_untracked_resources,
    options::{
        AwsVpcOptions, ContainerDefinition, NetworkMode, PodCreationOptions,
        PodDefinitionOptions, PodExecutionOptions, RepositoryCredentials,
        StoredRepositoryCredentials,
    },
};
use secret_vault::{DEFAULT_TRACKING_TAG, MemorySecretsManager, SecretsManagerVault};
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn definition() -> PodDefinitionOptions {
    PodDefinitionOptions::new()
        .with_name("builder")
        .with_memory_mb(512)
        .with_cpu(512)
        .add_container_definitions([ContainerDefinition::new()
            .with_name("build")
            .with_image("rust:latest")
            .with_command(["cargo", "build"])])
}

#[smol_potat::test]
async fn test_create_pod_owns_new_definition() {
    init_tracing();
    let client = Arc::new(MemoryEcsClient::new());
    let pod = BasicPodCreator::new(client.clone())
        .create_pod(&[
            PodCreationOptions::new(definition()),
            PodCreationOptions::new(PodDefinitionOptions::new().with_task_role("arn:role/builder"))
                .with_execution_options(PodExecutionOptions::new().with_cluster("ci")),
        ])
        .await
        .unwrap();

    let resources = pod.resources();
    assert!(resources.task_definition.is_owned());
    assert_eq!(resources.cluster.as_deref(), Some("ci"));
    assert!(resources.task_id.contains(":task/ci/"));
    assert_eq!(resources.containers.len(), 1);
    assert_eq!(resources.containers[0].name, "build");

    let task = client.task(&resources.task_id).unwrap();
    assert_eq!(
        task.task_definition_arn.as_deref(),
        Some(resources.task_definition.id())
    );
}

#[smol_potat::test]
async fn test_create_pod_rejects_invalid_options_before_remote_calls() {
    let client = Arc::new(MemoryEcsClient::new());
    let creator = BasicPodCreator::new(client.clone());

    let err = creator
        .create_pod(&[PodCreationOptions::new(
            definition().with_network_mode(NetworkMode::AwsVpc),
        )])
        .await
        .err()
        .unwrap();
    assert!(matches!(err, Error::Validation { .. }));
    assert!(
        err.to_string()
            .contains("must specify AWSVPC configuration when using AWSVPC network mode")
    );

    let err = creator
        .create_pod(&[PodCreationOptions::new(definition()).with_execution_options(
            PodExecutionOptions::new()
                .with_awsvpc_options(AwsVpcOptions::new().add_subnets(["subnet-1"])),
        )])
        .await
        .err()
        .unwrap();
    assert!(
        err.to_string()
            .contains("cannot specify AWSVPC configuration when network mode is not AWSVPC")
    );
    assert_eq!(client.definition_count(), 0);
    assert_eq!(client.calls(EcsOperation::RunTask), 0);
}

#[smol_potat::test]
async fn test_create_pod_with_awsvpc() {
    let client = Arc::new(MemoryEcsClient::new());
    let pod = BasicPodCreator::new(client.clone())
        .create_pod(&[PodCreationOptions::new(
            definition().with_network_mode(NetworkMode::AwsVpc),
        )
        .with_execution_options(
            PodExecutionOptions::new().with_awsvpc_options(
                AwsVpcOptions::new()
                    .add_subnets(["subnet-1"])
                    .add_security_groups(["sg-1"]),
            ),
        )])
        .await
        .unwrap();

    let definition = client
        .task_definition(pod.resources().task_definition.id())
        .unwrap();
    assert_eq!(definition.network_mode.as_deref(), Some("awsvpc"));
}

#[smol_potat::test]
async fn test_run_failures_abort_creation() {
    let client = Arc::new(MemoryEcsClient::new());
    let failure = Failure {
        arn: None,
        reason: Some("RESOURCE:MEMORY".to_string()),
        detail: None,
    };
    client.fail_next_run(vec![failure.clone()]);

    let err = BasicPodCreator::new(client.clone())
        .create_pod(&[PodCreationOptions::new(definition())])
        .await
        .err()
        .unwrap();
    assert_eq!(err.to_string(), "running task: (reason) RESOURCE:MEMORY");

    let input = pod_orchestration::ecs::api::RunTaskInput {
        count: Some(1),
        ..Default::default()
    };
    let output = pod_orchestration::ecs::api::RunTaskOutput {
        tasks: Vec::new(),
        failures: vec![failure],
    };
    assert!(is_insufficient_capacity(&input, &output));
}

#[smol_potat::test]
async fn test_create_from_existing_definition_requires_id() {
    let client = Arc::new(MemoryEcsClient::new());
    let err = BasicPodCreator::new(client.clone())
        .create_pod_from_existing_definition(ResourceRef::Owned(String::new()), &[])
        .await
        .err()
        .unwrap();
    assert_eq!(
        err.to_string(),
        "invalid task definition: must specify a non-empty ID"
    );
    assert_eq!(client.calls(EcsOperation::RunTask), 0);
}

#[smol_potat::test]
async fn test_create_secret_without_vault_fails() {
    let client = Arc::new(MemoryEcsClient::new());
    let def = definition().with_container_definitions(vec![ContainerDefinition::new()
        .with_name("build")
        .with_image("private.registry/rust")
        .with_repository_credentials(
            RepositoryCredentials::new()
                .with_name("registry-creds")
                .with_new_credentials(StoredRepositoryCredentials::new("ci", "hunter2")),
        )]);

    let err = BasicPodCreator::new(client.clone())
        .create_pod(&[PodCreationOptions::new(def)])
        .await
        .err()
        .unwrap();
    assert!(
        err.to_string()
            .contains("cannot create secret 'registry-creds' without a vault")
    );
    assert_eq!(client.definition_count(), 0);
}

#[smol_potat::test]
async fn test_definition_manager_tags_and_caches() {
    init_tracing();
    let client = Arc::new(MemoryEcsClient::new());
    let cache = Arc::new(MemoryPodDefinitionCache::new().with_tag("cache-tracked"));
    let manager = BasicPodDefinitionManager::new(client.clone()).with_cache(cache.clone());

    let item = manager.create_pod_definition(&[definition()]).await.unwrap();
    let tags = client.definition_tags(&item.id).unwrap();
    assert_eq!(tags.get("cache-tracked").map(String::as_str), Some("true"));
    assert!(!tags.contains_key(DEFAULT_TRACKING_TAG));
    assert_eq!(cache.get(&item.id).unwrap().definition_opts, item.definition_opts);

    manager.delete_pod_definition(&item.id).await.unwrap();
    assert!(cache.is_empty());
    assert_eq!(
        client.task_definition(&item.id).unwrap().status.as_deref(),
        Some("INACTIVE")
    );
}

#[smol_potat::test]
async fn test_definition_left_pending_when_cache_fails() {
    let client = Arc::new(MemoryEcsClient::new());
    let cache = Arc::new(MemoryPodDefinitionCache::new());
    let manager = BasicPodDefinitionManager::new(client.clone()).with_cache(cache.clone());

    let tracked = manager.create_pod_definition(&[definition()]).await.unwrap();
    cache.set_fail_puts(true);
    let err = manager
        .create_pod_definition(&[definition()])
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("adding pod definition item 'arn:aws:ecs:"));

    let untracked = find_untracked_resources(&*client, RESOURCE_TYPE_TASK_DEFINITION, "")
        .await
        .unwrap();
    assert_eq!(untracked.len(), 1);
    assert_ne!(untracked[0], tracked.id);
    assert!(untracked[0].ends_with("task-definition/builder:2"));
}

#[smol_potat::test]
async fn test_definition_manager_stores_credentials_as_json() {
    let client = Arc::new(MemoryEcsClient::new());
    let secrets = Arc::new(MemorySecretsManager::new());
    let manager = BasicPodDefinitionManager::new(client.clone())
        .with_vault(Arc::new(SecretsManagerVault::new(secrets.clone())));
    let def = definition().with_container_definitions(vec![ContainerDefinition::new()
        .with_name("build")
        .with_image("private.registry/rust")
        .with_repository_credentials(
            RepositoryCredentials::new()
                .with_name("registry-creds")
                .with_new_credentials(StoredRepositoryCredentials::new("ci", "hunter2")),
        )]);

    let item = manager.create_pod_definition(&[def]).await.unwrap();
    let creds = item.definition_opts.container_definitions[0]
        .repo_creds
        .clone()
        .unwrap();
    let id = creds.id.unwrap();
    assert_eq!(
        secrets.secret(&id).unwrap().value,
        r#"{"username":"ci","password":"hunter2"}"#
    );

    let registered = client.task_definition(&item.id).unwrap();
    assert_eq!(
        registered.container_definitions[0].credentials_parameter.as_deref(),
        Some(id.as_str())
    );
}
