//! Instance launch and the expiration failsafe.

use std::collections::HashMap;
use std::time::Duration;

use pgdock_common::config::ContainerConfig;
use pgdock_common::constants::{ENV_DB, ENV_PASSWORD, ENV_USER, IMAGE_REPOSITORY, MANAGED_LABEL};
use pgdock_common::error::{PgDockError, Result};
use pgdock_common::types::{ContainerId, Credentials};
use pgdock_runtime::backend::{RestartPolicy, RunSpec};
use pgdock_runtime::pool::Pool;

use crate::container::teardown;

/// Builds the engine spec for a PostgreSQL container.
pub(crate) fn run_spec(config: &ContainerConfig, credentials: &Credentials) -> RunSpec {
    RunSpec {
        name: config.container_name.clone(),
        repository: IMAGE_REPOSITORY.to_string(),
        tag: config.image_tag.clone(),
        cmd: vec!["-p".to_string(), config.db_port.to_string()],
        exposed_ports: vec![config.db_port],
        env: vec![
            (ENV_PASSWORD.to_string(), credentials.password.clone()),
            (ENV_USER.to_string(), credentials.user.clone()),
            (ENV_DB.to_string(), credentials.db_name.clone()),
        ],
        labels: HashMap::from([(MANAGED_LABEL.to_string(), "true".to_string())]),
        auto_remove: true,
        restart_policy: RestartPolicy::No,
    }
}

/// Starts the container and schedules its expiration.
///
/// If the expiration cannot be scheduled the container is removed again:
/// a container is never left running without either.
pub(crate) fn launch(pool: &Pool, spec: &RunSpec, expiration: Duration) -> Result<ContainerId> {
    let id = pool
        .engine()
        .run(spec)
        .map_err(|source| PgDockError::Launch {
            context: "start container",
            source,
        })?;

    if let Err(source) = pool.engine().expire(&id, expiration) {
        let cause = PgDockError::Launch {
            context: "expire",
            source,
        };
        return Err(teardown(pool, &id, cause));
    }

    Ok(id)
}
