//! Workspace-wide constants and defaults.

use std::time::Duration;

/// Container name used when the caller does not pick one.
pub const DEFAULT_CONTAINER_NAME: &str = "pgdock";

/// Image repository every container is launched from.
pub const IMAGE_REPOSITORY: &str = "postgres";

/// Image tag used when the caller does not pick one.
pub const DEFAULT_IMAGE_TAG: &str = "alpine";

/// Port PostgreSQL listens on inside the container.
pub const DEFAULT_DB_PORT: u16 = 5432;

/// Upper bound for the readiness probe loop.
pub const DEFAULT_PING_RETRY_TIMEOUT: Duration = Duration::from_secs(20);

/// Lifetime after which a container removes itself.
pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(20);

/// Pause between two readiness probes.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// Connect timeout applied to a single probe or seed connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Shortest connect timeout a probe is given, even once its budget is spent.
pub const MIN_CONNECT_TIMEOUT: Duration = Duration::from_millis(250);

/// Host the mapped ports are reachable on for local engines.
pub const LOCAL_HOST: &str = "localhost";

/// Label attached to every container pgdock launches.
pub const MANAGED_LABEL: &str = "pgdock.managed";

/// Environment variable carrying the superuser password.
pub const ENV_PASSWORD: &str = "POSTGRES_PASSWORD";

/// Environment variable carrying the superuser name.
pub const ENV_USER: &str = "POSTGRES_USER";

/// Environment variable carrying the initial database name.
pub const ENV_DB: &str = "POSTGRES_DB";

/// Application name used in CLI output.
pub const APP_NAME: &str = "pgdock";
