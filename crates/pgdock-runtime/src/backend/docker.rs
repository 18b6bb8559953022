//! Docker backend speaking the Engine HTTP API through bollard.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use bollard::Docker;
use bollard::errors::Error as DockerError;
use bollard::exec::StartExecOptions;
use bollard::models::{
    ContainerCreateBody, ExecConfig, HostConfig, RestartPolicy as DockerRestartPolicy,
    RestartPolicyNameEnum,
};
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptions, InspectContainerOptions, ListContainersOptions,
    RemoveContainerOptions, StartContainerOptions,
};
use futures_util::TryStreamExt;
use pgdock_common::error::EngineError;
use pgdock_common::types::ContainerId;
use tokio::runtime::Runtime;

use super::{ContainerInfo, RestartPolicy, RunSpec, RuntimeEngine};
use crate::endpoint::Endpoint;

/// Request timeout handed to the Docker client, in seconds.
const CLIENT_TIMEOUT_SECS: u64 = 120;

/// Backend that drives a Docker (or API-compatible) daemon.
///
/// Owns a current-thread tokio runtime and blocks on it for every call, so
/// it must not be used from inside another async runtime. Dropping it there
/// is fine: the runtime is then shut down in the background.
pub struct DockerEngine {
    docker: Docker,
    runtime: Option<Runtime>,
}

impl Drop for DockerEngine {
    fn drop(&mut self) {
        if tokio::runtime::Handle::try_current().is_ok() {
            if let Some(runtime) = self.runtime.take() {
                runtime.shutdown_background();
            }
        }
    }
}

impl std::fmt::Debug for DockerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockerEngine").finish_non_exhaustive()
    }
}

impl DockerEngine {
    /// Creates a client for the given endpoint.
    ///
    /// No request is sent; use [`RuntimeEngine::ping`] to check the daemon.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime or the client cannot be built.
    pub fn connect(endpoint: &Endpoint) -> Result<Self, EngineError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| EngineError::Transport {
                message: format!("build runtime: {e}"),
            })?;

        let docker = {
            let _guard = runtime.enter();
            connect_client(endpoint)?
        };
        tracing::debug!(%endpoint, "docker client created");

        Ok(Self {
            docker,
            runtime: Some(runtime),
        })
    }

    fn block_on<F: Future>(&self, future: F) -> Result<F::Output, EngineError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(EngineError::AsyncContext);
        }
        let runtime = self.runtime.as_ref().ok_or_else(|| EngineError::Unexpected {
            message: "engine runtime already shut down".to_string(),
        })?;
        Ok(runtime.block_on(future))
    }

    async fn ensure_image(&self, spec: &RunSpec) -> Result<(), EngineError> {
        let image = spec.image();
        if self.docker.inspect_image(&image).await.is_ok() {
            return Ok(());
        }

        tracing::info!(%image, "pulling image");
        let options = CreateImageOptions {
            from_image: Some(spec.repository.clone()),
            tag: Some(spec.tag.clone()),
            ..Default::default()
        };
        let _progress: Vec<_> = self
            .docker
            .create_image(Some(options), None, None)
            .try_collect()
            .await
            .map_err(engine_error)?;
        Ok(())
    }

    async fn run_async(&self, spec: &RunSpec) -> Result<ContainerId, EngineError> {
        self.ensure_image(spec).await?;

        // An empty name lets the daemon pick one.
        let options = CreateContainerOptions {
            name: Some(spec.name.clone()).filter(|name| !name.is_empty()),
            ..Default::default()
        };
        let created = self
            .docker
            .create_container(Some(options), container_body(spec))
            .await
            .map_err(engine_error)?;
        let id = ContainerId::new(created.id);

        if let Err(err) = self
            .docker
            .start_container(id.as_str(), None::<StartContainerOptions>)
            .await
        {
            if let Err(remove_err) = self.remove_async(&id).await {
                tracing::warn!(id = %id, error = %remove_err, "failed to remove unstarted container");
            }
            return Err(engine_error(err));
        }
        Ok(id)
    }

    async fn remove_async(&self, id: &ContainerId) -> Result<(), EngineError> {
        let options = RemoveContainerOptions {
            force: true,
            v: true,
            ..Default::default()
        };
        self.docker
            .remove_container(id.as_str(), Some(options))
            .await
            .map_err(engine_error)
    }
}

impl RuntimeEngine for DockerEngine {
    fn ping(&self) -> Result<(), EngineError> {
        let _version = self
            .block_on(self.docker.ping())?
            .map_err(engine_error)?;
        Ok(())
    }

    fn run(&self, spec: &RunSpec) -> Result<ContainerId, EngineError> {
        let id = self.block_on(self.run_async(spec))??;
        tracing::info!(id = %id.short(), name = %spec.name, image = %spec.image(), "container started");
        Ok(id)
    }

    fn host_port(&self, id: &ContainerId, container_port: u16) -> Result<String, EngineError> {
        let inspect = self
            .block_on(
                self.docker
                    .inspect_container(id.as_str(), None::<InspectContainerOptions>),
            )?
            .map_err(engine_error)?;

        let key = format!("{container_port}/tcp");
        inspect
            .network_settings
            .and_then(|settings| settings.ports)
            .and_then(|mut ports| ports.remove(&key))
            .flatten()
            .and_then(|bindings| {
                bindings
                    .into_iter()
                    .find_map(|b| b.host_port.filter(|port| !port.is_empty()))
            })
            .ok_or_else(|| EngineError::Unexpected {
                message: format!("port {key} is not published"),
            })
    }

    fn expire(&self, id: &ContainerId, after: Duration) -> Result<(), EngineError> {
        let secs = after.as_secs() + u64::from(after.subsec_nanos() > 0);
        let config = ExecConfig {
            cmd: Some(vec![
                "sh".to_string(),
                "-c".to_string(),
                format!("sleep {secs}; kill -INT 1"),
            ]),
            attach_stdout: Some(false),
            attach_stderr: Some(false),
            ..Default::default()
        };
        let options = StartExecOptions {
            detach: true,
            ..Default::default()
        };

        self.block_on(async {
            let exec = self
                .docker
                .create_exec(id.as_str(), config)
                .await
                .map_err(engine_error)?;
            let _started = self
                .docker
                .start_exec(&exec.id, Some(options))
                .await
                .map_err(engine_error)?;
            Ok::<_, EngineError>(())
        })??;

        tracing::debug!(id = %id.short(), secs, "expiration scheduled");
        Ok(())
    }

    fn remove(&self, id: &ContainerId) -> Result<(), EngineError> {
        self.block_on(self.remove_async(id))??;
        tracing::info!(id = %id.short(), "container removed");
        Ok(())
    }

    fn list(&self, label: &str) -> Result<Vec<ContainerInfo>, EngineError> {
        let summaries = self
            .block_on(self.docker.list_containers(Some(list_options(label))))?
            .map_err(engine_error)?;

        Ok(summaries
            .into_iter()
            .map(|s| ContainerInfo {
                id: ContainerId::new(s.id.unwrap_or_default()),
                name: s
                    .names
                    .and_then(|names| names.into_iter().next())
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_default(),
                state: s.state.map(|state| state.to_string()).unwrap_or_default(),
                image: s.image.unwrap_or_default(),
                labels: s.labels.unwrap_or_default(),
                created_at: s
                    .created
                    .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default(),
            })
            .collect())
    }
}

fn connect_client(endpoint: &Endpoint) -> Result<Docker, EngineError> {
    let result = match endpoint {
        Endpoint::LocalDefaults => Docker::connect_with_local_defaults(),
        #[cfg(unix)]
        Endpoint::Unix(path) => Docker::connect_with_unix(
            &path.to_string_lossy(),
            CLIENT_TIMEOUT_SECS,
            bollard::API_DEFAULT_VERSION,
        ),
        Endpoint::Tcp { host, port } => Docker::connect_with_http(
            &format!("http://{host}:{port}"),
            CLIENT_TIMEOUT_SECS,
            bollard::API_DEFAULT_VERSION,
        ),
        #[cfg(windows)]
        Endpoint::NamedPipe(pipe) => Docker::connect_with_named_pipe(
            pipe,
            CLIENT_TIMEOUT_SECS,
            bollard::API_DEFAULT_VERSION,
        ),
        #[allow(unreachable_patterns)]
        other => {
            return Err(EngineError::InvalidEndpoint {
                endpoint: other.to_string(),
                reason: "not supported on this platform".to_string(),
            });
        }
    };
    result.map_err(engine_error)
}

/// Lists stopped containers too, keeping only those carrying `label`.
fn list_options(label: &str) -> ListContainersOptions {
    ListContainersOptions {
        all: true,
        filters: Some(HashMap::from([(
            "label".to_string(),
            vec![label.to_string()],
        )])),
        ..Default::default()
    }
}

/// Translates a spec into the Docker create-container body.
fn container_body(spec: &RunSpec) -> ContainerCreateBody {
    let exposed_ports = spec
        .exposed_ports
        .iter()
        .map(|port| (format!("{port}/tcp"), HashMap::new()))
        .collect();

    let restart_name = match spec.restart_policy {
        RestartPolicy::No => RestartPolicyNameEnum::NO,
        RestartPolicy::OnFailure => RestartPolicyNameEnum::ON_FAILURE,
        RestartPolicy::Always => RestartPolicyNameEnum::ALWAYS,
    };

    ContainerCreateBody {
        image: Some(spec.image()),
        cmd: Some(spec.cmd.clone()),
        env: Some(spec.env.iter().map(|(k, v)| format!("{k}={v}")).collect()),
        exposed_ports: Some(exposed_ports),
        labels: Some(spec.labels.clone()),
        host_config: Some(HostConfig {
            auto_remove: Some(spec.auto_remove),
            publish_all_ports: Some(true),
            restart_policy: Some(DockerRestartPolicy {
                name: Some(restart_name),
                maximum_retry_count: None,
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn engine_error(err: DockerError) -> EngineError {
    match err {
        DockerError::DockerResponseServerError {
            status_code,
            message,
        } => EngineError::Api {
            status: status_code,
            message,
        },
        DockerError::DockerStreamError { error } => EngineError::Api {
            status: 500,
            message: error,
        },
        other => EngineError::Transport {
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> RunSpec {
        RunSpec {
            name: "pgdock-test".into(),
            repository: "postgres".into(),
            tag: "alpine".into(),
            cmd: vec!["-p".into(), "5433".into()],
            exposed_ports: vec![5433],
            env: vec![("POSTGRES_USER".into(), "user".into())],
            labels: HashMap::from([("pgdock.managed".to_string(), "true".to_string())]),
            auto_remove: true,
            restart_policy: RestartPolicy::No,
        }
    }

    #[test]
    fn container_body_sets_removal_and_restart_policy() {
        let body = container_body(&spec());
        let host = body.host_config.expect("host config");
        assert_eq!(host.auto_remove, Some(true));
        assert_eq!(host.publish_all_ports, Some(true));
        assert_eq!(
            host.restart_policy.and_then(|p| p.name),
            Some(RestartPolicyNameEnum::NO)
        );
    }

    #[test]
    fn container_body_carries_image_command_and_env() {
        let body = container_body(&spec());
        assert_eq!(body.image.as_deref(), Some("postgres:alpine"));
        assert_eq!(body.cmd, Some(vec!["-p".to_string(), "5433".to_string()]));
        assert_eq!(body.env, Some(vec!["POSTGRES_USER=user".to_string()]));
        assert!(
            body.exposed_ports
                .expect("exposed ports")
                .contains_key("5433/tcp")
        );
        assert_eq!(
            body.labels
                .expect("labels")
                .get("pgdock.managed")
                .map(String::as_str),
            Some("true")
        );
    }

    #[test]
    fn server_errors_keep_status_and_message() {
        let err = engine_error(DockerError::DockerResponseServerError {
            status_code: 400,
            message: "invalid tag format".into(),
        });
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.to_string(), "invalid tag format");
    }

    #[test]
    fn listing_filters_by_label_on_the_daemon() {
        let options = list_options("pgdock.managed");
        assert!(options.all);
        assert_eq!(
            options.filters.expect("filters").get("label"),
            Some(&vec!["pgdock.managed".to_string()])
        );
    }

    #[test]
    fn use_and_drop_inside_async_runtime_do_not_panic() {
        let endpoint = Endpoint::parse("tcp://127.0.0.1:2375").expect("endpoint");
        let engine = DockerEngine::connect(&endpoint).expect("engine");
        let outer = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("outer runtime");
        outer.block_on(async move {
            assert!(matches!(engine.ping(), Err(EngineError::AsyncContext)));
            drop(engine);
        });
    }

    #[test]
    fn stream_errors_become_api_errors() {
        let err = engine_error(DockerError::DockerStreamError {
            error: "manifest unknown".into(),
        });
        assert_eq!(err.to_string(), "manifest unknown");
    }
}
