//! Fluent API for configuring and starting a container.

use std::sync::Arc;
use std::time::Duration;

use pgdock_common::config::ContainerConfig;
use pgdock_common::constants::DEFAULT_CONTAINER_NAME;
use pgdock_common::error::Result;
use pgdock_common::types::{Credentials, unique_container_name};
use pgdock_driver::DatabaseDriver;
use pgdock_runtime::pool::Pool;

use crate::container::PsqlContainer;

/// Builder for a disposable PostgreSQL container.
///
/// Options apply in call order. Scalar options overwrite earlier values;
/// seed statements accumulate.
pub struct ContainerBuilder {
    pub(crate) credentials: Credentials,
    pub(crate) config: ContainerConfig,
    pub(crate) pool: Option<Arc<Pool>>,
    pub(crate) driver: Option<Arc<dyn DatabaseDriver>>,
}

impl std::fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("credentials", &self.credentials)
            .field("config", &self.config)
            .field("pool", &self.pool)
            .field("driver", &self.driver.as_ref().map(|_| "custom"))
            .finish()
    }
}

impl ContainerBuilder {
    /// Creates a builder for a database owned by `user`.
    #[must_use]
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        db_name: impl Into<String>,
    ) -> Self {
        Self {
            credentials: Credentials::new(user, password, db_name),
            config: ContainerConfig::default(),
            pool: None,
            driver: None,
        }
    }

    /// Applies a loaded configuration: its scalar fields replace the
    /// current ones and its statements are appended.
    #[must_use]
    pub fn config(mut self, config: ContainerConfig) -> Self {
        let ContainerConfig {
            container_name,
            image_tag,
            db_port,
            sqls,
            pool_endpoint,
            ping_retry_timeout,
            expiration,
        } = config;
        self.config.container_name = container_name;
        self.config.image_tag = image_tag;
        self.config.db_port = db_port;
        self.config.sqls.extend(sqls);
        self.config.pool_endpoint = pool_endpoint;
        self.config.ping_retry_timeout = ping_retry_timeout;
        self.config.expiration = expiration;
        self
    }

    /// Sets the container name.
    #[must_use]
    pub fn container_name(mut self, name: impl Into<String>) -> Self {
        self.config.container_name = name.into();
        self
    }

    /// Picks a container name that will not clash with parallel runs.
    #[must_use]
    pub fn unique_name(mut self) -> Self {
        self.config.container_name = unique_container_name(DEFAULT_CONTAINER_NAME);
        self
    }

    /// Sets the `postgres` image tag.
    #[must_use]
    pub fn image_tag(mut self, tag: impl Into<String>) -> Self {
        self.config.image_tag = tag.into();
        self
    }

    /// Sets the port PostgreSQL listens on inside the container.
    #[must_use]
    pub const fn db_port(mut self, port: u16) -> Self {
        self.config.db_port = port;
        self
    }

    /// Appends a statement applied once the database is ready.
    #[must_use]
    pub fn sql(mut self, statement: impl Into<String>) -> Self {
        self.config.sqls.push(statement.into());
        self
    }

    /// Appends several statements, keeping their order.
    #[must_use]
    pub fn sqls<I, S>(mut self, statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.sqls.extend(statements.into_iter().map(Into::into));
        self
    }

    /// Reuses an existing pool instead of creating one.
    ///
    /// Starting the container overwrites the pool's
    /// [`max_wait`](Pool::max_wait) with this builder's ping retry timeout.
    /// Every other holder of the pool sees the new value, and containers
    /// started concurrently from one pool race on it (last writer wins).
    ///
    /// Mutually exclusive with [`pool_endpoint`](Self::pool_endpoint).
    #[must_use]
    pub fn pool(mut self, pool: Arc<Pool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Creates the pool against this engine endpoint (empty = local
    /// defaults).
    ///
    /// Mutually exclusive with [`pool`](Self::pool).
    #[must_use]
    pub fn pool_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.pool_endpoint = endpoint.into();
        self
    }

    /// Sets how long to wait for the database to accept connections.
    #[must_use]
    pub const fn ping_retry_timeout(mut self, timeout: Duration) -> Self {
        self.config.ping_retry_timeout = timeout;
        self
    }

    /// Sets the lifetime after which the container removes itself, even if
    /// it is never closed.
    #[must_use]
    pub const fn expiration(mut self, expiration: Duration) -> Self {
        self.config.expiration = expiration;
        self
    }

    /// Uses a custom database driver for probing and seeding.
    #[must_use]
    pub fn driver(mut self, driver: Arc<dyn DatabaseDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    /// Returns the configuration gathered so far.
    #[must_use]
    pub const fn current_config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Launches the container and blocks until it is ready and seeded.
    ///
    /// # Errors
    ///
    /// Returns the first failing stage's error. Anything launched before
    /// the failure has been removed by then.
    pub fn start(self) -> Result<PsqlContainer> {
        PsqlContainer::start(self)
    }
}
