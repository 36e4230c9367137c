//! Remote resources owned by a pod

use crate::options::ValidationErrors;
use serde::{Deserialize, Serialize};

/// Reference to a remote resource and who is responsible for deleting it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "ownership", content = "id", rename_all = "lowercase")]
pub enum ResourceRef {
    /// The pod deletes this resource when it is deleted
    Owned(String),
    /// The resource belongs to someone else and outlives the pod
    Borrowed(String),
}

impl ResourceRef {
    /// Build a reference from an ID and an ownership flag
    pub fn new(id: impl Into<String>, owned: bool) -> Self {
        if owned {
            Self::Owned(id.into())
        } else {
            Self::Borrowed(id.into())
        }
    }

    /// Remote ID of the resource
    pub fn id(&self) -> &str {
        match self {
            Self::Owned(id) | Self::Borrowed(id) => id,
        }
    }

    /// Whether the pod owns the resource
    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }

    /// The ID, only if owned
    pub fn owned_id(&self) -> Option<&str> {
        match self {
            Self::Owned(id) => Some(id),
            Self::Borrowed(_) => None,
        }
    }
}

/// A secret used by a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSecret {
    /// Friendly name of the secret
    pub name: Option<String>,
    /// The secret itself
    pub secret: ResourceRef,
}

/// Remote resources of one container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerResources {
    /// Remote container ID
    pub container_id: String,
    /// Container name
    pub name: String,
    /// Secrets the container uses
    pub secrets: Vec<ContainerSecret>,
}

/// Remote resources of a pod
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodResources {
    /// Remote task ID
    pub task_id: String,
    /// Cluster the task runs in. The service default cluster if unset.
    pub cluster: Option<String>,
    /// Definition the task was launched from
    pub task_definition: ResourceRef,
    /// Containers in the task
    pub containers: Vec<ContainerResources>,
}

impl PodResources {
    /// Check that every remote identifier is present
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.push_when(self.task_id.is_empty(), "must specify a task ID");
        errors.push_when(
            self.task_definition.id().is_empty(),
            "must specify a non-empty task definition ID",
        );
        for container in &self.containers {
            errors.push_when(
                container.container_id.is_empty(),
                format!("container '{}' must have a container ID", container.name),
            );
            for secret in &container.secrets {
                errors.push_when(
                    secret.secret.id().is_empty(),
                    format!("container '{}' references a secret without an ID", container.name),
                );
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_ref_ownership() {
        let owned = ResourceRef::new("arn:def:1", true);
        assert!(owned.is_owned());
        assert_eq!(owned.owned_id(), Some("arn:def:1"));

        let borrowed = ResourceRef::new("arn:def:2", false);
        assert_eq!(borrowed.id(), "arn:def:2");
        assert_eq!(borrowed.owned_id(), None);
    }

    #[test]
    fn test_resource_ref_serde_shape() {
        let json = serde_json::to_value(ResourceRef::Owned("x".to_string())).unwrap();
        assert_eq!(json, serde_json::json!({"ownership": "owned", "id": "x"}));
    }

    #[test]
    fn test_resources_require_ids() {
        let resources = PodResources {
            task_id: String::new(),
            cluster: None,
            task_definition: ResourceRef::Borrowed(String::new()),
            containers: vec![ContainerResources {
                container_id: String::new(),
                name: "web".to_string(),
                secrets: vec![],
            }],
        };
        assert_eq!(resources.validate().len(), 3);
    }
}
