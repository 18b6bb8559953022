//! Container engine abstraction.

pub mod docker;

use std::collections::HashMap;
use std::time::Duration;

use pgdock_common::error::EngineError;
use pgdock_common::types::ContainerId;

/// Restart behaviour of a launched container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartPolicy {
    /// Never restart; a crashed container stays down.
    #[default]
    No,
    /// Restart on non-zero exit.
    OnFailure,
    /// Always restart.
    Always,
}

impl RestartPolicy {
    /// Engine-side name of the policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::No => "no",
            Self::OnFailure => "on-failure",
            Self::Always => "always",
        }
    }
}

/// Everything the engine needs to create and start a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    /// Container name.
    pub name: String,
    /// Image repository.
    pub repository: String,
    /// Image tag.
    pub tag: String,
    /// Arguments passed to the image entrypoint.
    pub cmd: Vec<String>,
    /// Container ports (TCP) published on random host ports.
    pub exposed_ports: Vec<u16>,
    /// Environment variables.
    pub env: Vec<(String, String)>,
    /// Labels attached to the container.
    pub labels: HashMap<String, String>,
    /// Whether the engine deletes the container once it stops.
    pub auto_remove: bool,
    /// Restart behaviour.
    pub restart_policy: RestartPolicy,
}

impl RunSpec {
    /// Image reference in `repository:tag` form.
    #[must_use]
    pub fn image(&self) -> String {
        format!("{}:{}", self.repository, self.tag)
    }
}

/// Information about a container known to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Unique identifier.
    pub id: ContainerId,
    /// Human-readable name.
    pub name: String,
    /// Current state as reported by the engine.
    pub state: String,
    /// Image reference.
    pub image: String,
    /// Labels attached at creation.
    pub labels: HashMap<String, String>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// A container engine.
///
/// Implementors launch, inspect, and remove containers. All methods block
/// until the engine has answered.
pub trait RuntimeEngine: Send + Sync {
    /// Checks that the engine is reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine does not answer.
    fn ping(&self) -> Result<(), EngineError>;

    /// Creates and starts a container, pulling the image if needed.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if the image, name, or spec is rejected.
    fn run(&self, spec: &RunSpec) -> Result<ContainerId, EngineError>;

    /// Returns the host port mapped to `container_port/tcp`.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is unknown or the port is not
    /// published.
    fn host_port(&self, id: &ContainerId, container_port: u16) -> Result<String, EngineError>;

    /// Schedules the container to shut down after `after`, independently of
    /// the calling process.
    ///
    /// # Errors
    ///
    /// Returns an error if the schedule cannot be registered.
    fn expire(&self, id: &ContainerId, after: Duration) -> Result<(), EngineError>;

    /// Force-removes a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine refuses or the container is gone.
    fn remove(&self, id: &ContainerId) -> Result<(), EngineError>;

    /// Lists containers carrying `label`, running or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot list containers.
    fn list(&self, label: &str) -> Result<Vec<ContainerInfo>, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_policy_defaults_to_no() {
        assert_eq!(RestartPolicy::default(), RestartPolicy::No);
        assert_eq!(RestartPolicy::No.as_str(), "no");
    }

    #[test]
    fn run_spec_image_joins_repository_and_tag() {
        let spec = RunSpec {
            name: "test".into(),
            repository: "postgres".into(),
            tag: "16-alpine".into(),
            cmd: vec!["-p".into(), "5432".into()],
            exposed_ports: vec![5432],
            env: vec![],
            labels: HashMap::new(),
            auto_remove: true,
            restart_policy: RestartPolicy::No,
        };
        assert_eq!(spec.image(), "postgres:16-alpine");
    }
}
