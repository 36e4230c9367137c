//! Pod status and its translation from remote task states

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Normalized status of a pod or one of its containers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PodStatus {
    /// Not yet running
    Starting,
    /// Running
    Running,
    /// Shutting down
    Stopping,
    /// No longer running
    Stopped,
    /// Stopped and every owned resource released
    Deleted,
    /// Unrecognized remote state
    #[default]
    Unknown,
}

impl fmt::Display for PodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Deleted => "deleted",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Lifecycle state reported by the orchestration service for a task or container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// Network resources are being provisioned
    Provisioning,
    /// Waiting for the agent to act
    Pending,
    /// Resources are being attached
    Activating,
    /// Running
    Running,
    /// Resources are being detached
    Deactivating,
    /// Containers are being stopped
    Stopping,
    /// Network resources are being released
    Deprovisioning,
    /// Stopped
    Stopped,
    /// Any state this crate does not know about
    Unrecognized(String),
}

impl TaskStatus {
    /// Parse the service's status string
    pub fn parse(status: &str) -> Self {
        match status {
            "PROVISIONING" => Self::Provisioning,
            "PENDING" => Self::Pending,
            "ACTIVATING" => Self::Activating,
            "RUNNING" => Self::Running,
            "DEACTIVATING" => Self::Deactivating,
            "STOPPING" => Self::Stopping,
            "DEPROVISIONING" => Self::Deprovisioning,
            "STOPPED" => Self::Stopped,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// The service's status string
    pub fn as_str(&self) -> &str {
        match self {
            Self::Provisioning => "PROVISIONING",
            Self::Pending => "PENDING",
            Self::Activating => "ACTIVATING",
            Self::Running => "RUNNING",
            Self::Deactivating => "DEACTIVATING",
            Self::Stopping => "STOPPING",
            Self::Deprovisioning => "DEPROVISIONING",
            Self::Stopped => "STOPPED",
            Self::Unrecognized(s) => s,
        }
    }

    /// Position in the documented task lifecycle, or -1 if unrecognized
    pub fn ordinal(&self) -> i32 {
        match self {
            Self::Provisioning => 1,
            Self::Pending => 2,
            Self::Activating => 3,
            Self::Running => 4,
            Self::Deactivating => 5,
            Self::Stopping => 6,
            Self::Deprovisioning => 7,
            Self::Stopped => 8,
            Self::Unrecognized(_) => -1,
        }
    }

    /// Whether this state comes before `other` in the lifecycle.
    ///
    /// Unrecognized states come before every recognized state. Use
    /// [`TaskStatus::compare`] where that default is not acceptable.
    pub fn before(&self, other: &TaskStatus) -> bool {
        self.ordinal() < other.ordinal()
    }

    /// Whether this state comes after `other` in the lifecycle.
    ///
    /// Unrecognized states come before every recognized state.
    pub fn after(&self, other: &TaskStatus) -> bool {
        self.ordinal() > other.ordinal()
    }

    /// Lifecycle order of two states, or `None` if either is unrecognized
    pub fn compare(&self, other: &TaskStatus) -> Option<Ordering> {
        match (self, other) {
            (Self::Unrecognized(_), _) | (_, Self::Unrecognized(_)) => None,
            _ => Some(self.ordinal().cmp(&other.ordinal())),
        }
    }

    /// Normalized pod status for this state
    pub fn to_pod_status(&self) -> PodStatus {
        match self {
            Self::Provisioning | Self::Pending | Self::Activating => PodStatus::Starting,
            Self::Running => PodStatus::Running,
            Self::Deactivating | Self::Stopping | Self::Deprovisioning => PodStatus::Stopping,
            Self::Stopped => PodStatus::Stopped,
            Self::Unrecognized(_) => PodStatus::Unknown,
        }
    }
}

impl From<&str> for TaskStatus {
    fn from(status: &str) -> Self {
        Self::parse(status)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last known status of one container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerStatusInfo {
    /// Remote container ID
    pub container_id: String,
    /// Container name
    pub name: String,
    /// Normalized status
    pub status: PodStatus,
}

/// Last known status of a pod and its containers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodStatusInfo {
    /// Normalized pod status
    pub status: PodStatus,
    /// Per-container statuses
    pub containers: Vec<ContainerStatusInfo>,
}

impl PodStatusInfo {
    /// Force the pod and every container to `status`
    pub(crate) fn set_all(&mut self, status: PodStatus) {
        self.status = status;
        for container in &mut self.containers {
            container.status = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_groups() {
        for s in ["PROVISIONING", "PENDING", "ACTIVATING"] {
            assert_eq!(TaskStatus::parse(s).to_pod_status(), PodStatus::Starting);
        }
        assert_eq!(TaskStatus::parse("RUNNING").to_pod_status(), PodStatus::Running);
        for s in ["DEACTIVATING", "STOPPING", "DEPROVISIONING"] {
            assert_eq!(TaskStatus::parse(s).to_pod_status(), PodStatus::Stopping);
        }
        assert_eq!(TaskStatus::parse("STOPPED").to_pod_status(), PodStatus::Stopped);
        assert_eq!(TaskStatus::parse("running").to_pod_status(), PodStatus::Unknown);
    }

    #[test]
    fn test_ordering_predicates() {
        let pending = TaskStatus::Pending;
        let stopped = TaskStatus::Stopped;
        assert!(pending.before(&stopped));
        assert!(stopped.after(&pending));
        assert!(!pending.before(&pending));

        let weird = TaskStatus::from("HIBERNATING");
        assert_eq!(weird.as_str(), "HIBERNATING");
        assert!(weird.before(&TaskStatus::Provisioning));
        assert_eq!(weird.compare(&TaskStatus::Provisioning), None);
        assert_eq!(pending.compare(&stopped), Some(Ordering::Less));
    }

    #[test]
    fn test_set_all() {
        let mut info = PodStatusInfo {
            status: PodStatus::Running,
            containers: vec![ContainerStatusInfo {
                container_id: "c".to_string(),
                name: "web".to_string(),
                status: PodStatus::Starting,
            }],
        };
        info.set_all(PodStatus::Stopped);
        assert_eq!(info.status, PodStatus::Stopped);
        assert_eq!(info.containers[0].status, PodStatus::Stopped);
    }
}
