//! The running container handle and the startup pipeline.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pgdock_common::error::{PgDockError, Result};
use pgdock_common::types::{ContainerId, Dsn};
use pgdock_driver::DatabaseDriver;
use pgdock_driver::postgres::PostgresDriver;
use pgdock_runtime::pool::Pool;

use crate::builder::ContainerBuilder;
use crate::{launch, probe, resolve, seed};

/// A PostgreSQL container that is up, reachable, and seeded.
///
/// [`close`](Self::close) removes it. Dropping the handle closes it too,
/// logging rather than returning any error. Independently of both, the
/// container shuts itself down once its expiration has passed.
#[derive(Debug)]
pub struct PsqlContainer {
    id: ContainerId,
    name: String,
    host_port: String,
    dsn: Dsn,
    pool: Arc<Pool>,
    closed: AtomicBool,
}

impl PsqlContainer {
    /// Shorthand for [`ContainerBuilder::new`].
    #[must_use]
    pub fn builder(
        user: impl Into<String>,
        password: impl Into<String>,
        db_name: impl Into<String>,
    ) -> ContainerBuilder {
        ContainerBuilder::new(user, password, db_name)
    }

    pub(crate) fn start(builder: ContainerBuilder) -> Result<Self> {
        let ContainerBuilder {
            credentials,
            config,
            pool,
            driver,
        } = builder;
        config.validate()?;

        let pool = resolve::resolve_pool(pool, &config.pool_endpoint, config.ping_retry_timeout)?;
        pool.engine()
            .ping()
            .map_err(|source| PgDockError::EngineUnavailable { source })?;

        let driver: Arc<dyn DatabaseDriver> = match driver {
            Some(driver) => driver,
            None => Arc::new(
                PostgresDriver::new()
                    .map_err(|source| PgDockError::DriverUnavailable { source })?,
            ),
        };

        let spec = launch::run_spec(&config, &credentials);
        let id = launch::launch(&pool, &spec, config.expiration)?;

        let ready = probe::resolve_host_port(&pool, &id, config.db_port).and_then(|port| {
            let dsn = Dsn::new(pool.host(), port, credentials);
            probe::wait_until_ready(&pool, driver.as_ref(), &dsn)?;
            seed::execute_sqls(driver.as_ref(), &dsn, &config.sqls)?;
            Ok(dsn)
        });

        match ready {
            Ok(dsn) => {
                tracing::info!(id = %id.short(), name = %config.container_name, port = dsn.port, "database ready");
                Ok(Self {
                    id,
                    name: config.container_name,
                    host_port: dsn.port.to_string(),
                    dsn,
                    pool,
                    closed: AtomicBool::new(false),
                })
            }
            Err(cause) => Err(teardown(&pool, &id, cause)),
        }
    }

    /// Returns the host port mapped to the database.
    #[must_use]
    pub fn port(&self) -> &str {
        &self.host_port
    }

    /// Returns the host the port is reachable on.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.dsn.host
    }

    /// Returns the engine's container ID.
    #[must_use]
    pub const fn id(&self) -> &ContainerId {
        &self.id
    }

    /// Returns the container name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the connection parameters of the database.
    #[must_use]
    pub const fn dsn(&self) -> &Dsn {
        &self.dsn
    }

    /// Returns a libpq key/value connection string.
    #[must_use]
    pub fn connection_string(&self) -> String {
        self.dsn.to_string()
    }

    /// Returns a `postgres://` connection URL.
    #[must_use]
    pub fn url(&self) -> String {
        self.dsn.to_url()
    }

    /// Returns whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Gives up the handle without removing the container.
    ///
    /// The container keeps running until its expiration passes or it is
    /// removed by ID.
    pub fn detach(self) -> ContainerId {
        self.closed.store(true, Ordering::Release);
        self.id.clone()
    }

    /// Removes the container.
    ///
    /// Only the first call does anything; later calls, from any thread,
    /// return `Ok(())` at once. A failed removal is reported once and not
    /// retried.
    ///
    /// # Errors
    ///
    /// Returns [`PgDockError::Remove`] if the first removal fails, for
    /// instance because the container already expired.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.pool
            .engine()
            .remove(&self.id)
            .map_err(|source| PgDockError::Remove {
                id: self.id.to_string(),
                source,
            })
    }
}

impl Drop for PsqlContainer {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(id = %self.id.short(), error = %e, "failed to remove container on drop");
        }
    }
}

/// Removes a container after `cause`, returning the error to report.
pub(crate) fn teardown(pool: &Pool, id: &ContainerId, cause: PgDockError) -> PgDockError {
    tracing::warn!(id = %id.short(), error = %cause, "startup failed, removing container");
    match pool.engine().remove(id) {
        Ok(()) => cause,
        Err(close) => PgDockError::Teardown {
            cause: Box::new(cause),
            close,
        },
    }
}
