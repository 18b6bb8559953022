//! Readiness probing.

use std::time::{Duration, Instant};

use pgdock_common::error::{DriverError, EngineError, PgDockError, Result};
use pgdock_common::types::{ContainerId, Dsn};
use pgdock_driver::DatabaseDriver;
use pgdock_runtime::pool::Pool;

/// Looks up the host port published for `db_port`.
pub(crate) fn resolve_host_port(pool: &Pool, id: &ContainerId, db_port: u16) -> Result<u16> {
    let launch_error = |source| PgDockError::Launch {
        context: "resolve host port",
        source,
    };
    let port = pool
        .engine()
        .host_port(id, db_port)
        .map_err(launch_error)?;
    port.parse::<u16>().map_err(|_| {
        launch_error(EngineError::Unexpected {
            message: format!("host port `{port}` is not a port number"),
        })
    })
}

/// Probes the database until it answers or the pool's budget is spent.
pub(crate) fn wait_until_ready(pool: &Pool, driver: &dyn DatabaseDriver, dsn: &Dsn) -> Result<()> {
    let max_wait = pool.max_wait();
    tracing::debug!(host = %dsn.host, port = dsn.port, ?max_wait, "waiting for database");
    let deadline = Instant::now() + max_wait;
    pool.retry(|| probe(driver, dsn, deadline.saturating_duration_since(Instant::now())))
        .map_err(|timeout| PgDockError::ReadinessTimeout {
            attempts: timeout.attempts,
            elapsed: timeout.elapsed,
            source: timeout.last,
        })
}

/// Connects within the remaining budget, pings, and disconnects.
fn probe(
    driver: &dyn DatabaseDriver,
    dsn: &Dsn,
    remaining: Duration,
) -> std::result::Result<(), DriverError> {
    let mut connection = driver.connect_with_timeout(dsn, remaining)?;
    connection.ping()?;
    connection.close()
}
