//! # Pod Orchestration
//!
//! Run groups of containers ("pods") as tasks on a remote container
//! orchestration service.
//!
//! The crate is a library layer between a host process and the service:
//!
//! - [`options`] holds the pod definition and launch options, with pure
//!   validation and left-to-right merging
//! - [`BasicPodDefinitionManager`] registers reusable pod definitions and
//!   materializes any new secrets through a [`secret_vault::Vault`]
//! - [`BasicPodCreator`] launches pods from new or existing definitions
//! - [`BasicPod`] is a handle to one running task that can report its status,
//!   stop it and clean up everything it owns
//!
//! Remote services sit behind the [`EcsClient`] and
//! [`secret_vault::SecretsManagerClient`] traits. In-memory implementations
//! are provided for tests and local development.
//!
//! ## Example
//!
//! ```rust
//! use pod_orchestration::{
//!     BasicPodCreator, MemoryEcsClient, Pod, PodCreator, PodStatus,
//!     options::{ContainerDefinition, PodCreationOptions, PodDefinitionOptions},
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> pod_orchestration::Result<()> {
//! let creator = BasicPodCreator::new(Arc::new(MemoryEcsClient::new()));
//!
//! let definition = PodDefinitionOptions::new()
//!     .with_memory_mb(128)
//!     .with_cpu(128)
//!     .add_container_definitions([ContainerDefinition::new().with_image("alpine")]);
//! let mut pod = creator
//!     .create_pod(&[PodCreationOptions::new(definition)])
//!     .await?;
//!
//! pod.delete().await?;
//! assert_eq!(pod.status_info().status, PodStatus::Deleted);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unsafe_code)]

mod creator;
mod definition;
pub mod ecs;
mod error;
mod memory;
pub mod options;
mod pod;
mod resources;
mod status;
mod tag;

pub use creator::{BasicPodCreator, PodCreator};
pub use definition::{
    BasicPodDefinitionManager, PodDefinitionCache, PodDefinitionItem, PodDefinitionManager,
};
pub use ecs::EcsClient;
pub use error::{EcsError, Error, Result, ResultExt};
pub use memory::{EcsOperation, MemoryEcsClient, MemoryPodDefinitionCache};
pub use pod::{BasicPod, Pod};
pub use resources::{ContainerResources, ContainerSecret, PodResources, ResourceRef};
pub use status::{ContainerStatusInfo, PodStatus, PodStatusInfo, TaskStatus};
pub use tag::{
    GetResourcesInput, RESOURCE_TYPE_SECRET, RESOURCE_TYPE_TASK_DEFINITION, ResourceTagMapping,
    TagClient, TagFilter, find_untracked_resources,
};
