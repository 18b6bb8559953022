//! PostgreSQL driver built on `tokio-postgres`.

use std::sync::Arc;
use std::time::Duration;

use pgdock_common::constants::{CONNECT_TIMEOUT, MIN_CONNECT_TIMEOUT};
use pgdock_common::error::DriverError;
use pgdock_common::types::Dsn;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tokio_postgres::config::SslMode;
use tokio_postgres::{Client, Config, NoTls};

use crate::{Connection, DatabaseDriver};

/// Blocking PostgreSQL driver.
///
/// Owns a current-thread tokio runtime that drives every connection it
/// opens; it must not be used from inside another async runtime.
#[derive(Debug, Clone)]
pub struct PostgresDriver {
    runtime: Arc<OwnedRuntime>,
}

/// Runtime shared by a driver and its connections.
///
/// Dropping a runtime from async code panics in tokio, so when the last
/// holder goes away inside another runtime it is shut down in the
/// background instead.
#[derive(Debug)]
struct OwnedRuntime(Option<Runtime>);

impl OwnedRuntime {
    fn get(&self) -> Result<&Runtime, DriverError> {
        ensure_blocking_context()?;
        self.0
            .as_ref()
            .ok_or_else(|| DriverError::new("driver runtime already shut down"))
    }
}

impl Drop for OwnedRuntime {
    fn drop(&mut self) {
        if tokio::runtime::Handle::try_current().is_ok() {
            if let Some(runtime) = self.0.take() {
                runtime.shutdown_background();
            }
        }
    }
}

impl PostgresDriver {
    /// Creates a driver with its own runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be built.
    pub fn new() -> Result<Self, DriverError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DriverError::new(format!("build runtime: {e}")).with_source(e))?;
        Ok(Self {
            runtime: Arc::new(OwnedRuntime(Some(runtime))),
        })
    }
}

impl DatabaseDriver for PostgresDriver {
    fn connect(&self, dsn: &Dsn) -> Result<Box<dyn Connection>, DriverError> {
        self.connect_with_timeout(dsn, CONNECT_TIMEOUT)
    }

    fn connect_with_timeout(
        &self,
        dsn: &Dsn,
        timeout: Duration,
    ) -> Result<Box<dyn Connection>, DriverError> {
        let runtime = self.runtime.get()?;
        let (client, connection) = runtime
            .block_on(pg_config(dsn, connect_timeout(timeout)).connect(NoTls))
            .map_err(|e| connect_error(dsn, e))?;

        let task = runtime.spawn(async move {
            if let Err(e) = connection.await {
                tracing::debug!(error = %e, "postgres connection ended with error");
            }
        });

        Ok(Box::new(PostgresConnection {
            client: Some(client),
            task: Some(task),
            runtime: Arc::clone(&self.runtime),
        }))
    }
}

struct PostgresConnection {
    client: Option<Client>,
    task: Option<JoinHandle<()>>,
    runtime: Arc<OwnedRuntime>,
}

impl PostgresConnection {
    fn batch(&self, statement: &str) -> Result<(), DriverError> {
        let runtime = self.runtime.get()?;
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| DriverError::new("connection already closed"))?;
        runtime
            .block_on(client.batch_execute(statement))
            .map_err(driver_error)
    }
}

impl Connection for PostgresConnection {
    fn ping(&mut self) -> Result<(), DriverError> {
        self.batch("SELECT 1")
    }

    fn execute(&mut self, statement: &str) -> Result<(), DriverError> {
        tracing::debug!(statement, "executing statement");
        self.batch(statement)
    }

    fn close(mut self: Box<Self>) -> Result<(), DriverError> {
        let shared = Arc::clone(&self.runtime);
        let runtime = shared.get()?;
        drop(self.client.take());
        if let Some(task) = self.task.take() {
            runtime
                .block_on(task)
                .map_err(|e| DriverError::new(format!("close: {e}")).with_source(e))?;
        }
        Ok(())
    }
}

fn ensure_blocking_context() -> Result<(), DriverError> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(DriverError::new(
            "cannot block on the database driver from inside an async runtime",
        ));
    }
    Ok(())
}

/// Caps a caller's budget to the driver's connect timeout range.
fn connect_timeout(budget: Duration) -> Duration {
    budget.clamp(MIN_CONNECT_TIMEOUT, CONNECT_TIMEOUT)
}

fn pg_config(dsn: &Dsn, connect_timeout: Duration) -> Config {
    let mut config = Config::new();
    let _ = config
        .host(&dsn.host)
        .port(dsn.port)
        .user(&dsn.credentials.user)
        .password(&dsn.credentials.password)
        .dbname(&dsn.credentials.db_name)
        .ssl_mode(SslMode::Disable)
        .connect_timeout(connect_timeout);
    config
}

fn connect_error(dsn: &Dsn, err: tokio_postgres::Error) -> DriverError {
    DriverError::new(format!(
        "failed to connect to `host={} port={} user={} database={}`: {err}",
        dsn.host, dsn.port, dsn.credentials.user, dsn.credentials.db_name
    ))
    .with_source(err)
}

/// Keeps the server's own message and SQLSTATE when there is one.
fn driver_error(err: tokio_postgres::Error) -> DriverError {
    let server = err
        .as_db_error()
        .map(|db| (db.message().to_string(), db.code().code().to_string()));
    match server {
        Some((message, code)) => DriverError::new(message).with_code(code).with_source(err),
        None => DriverError::new(err.to_string()).with_source(err),
    }
}

#[cfg(test)]
mod tests {
    use pgdock_common::types::Credentials;
    use tokio_postgres::config::Host;

    use super::*;

    fn dsn() -> Dsn {
        Dsn::new("localhost", 49_153, Credentials::new("user", "pass", "test"))
    }

    #[test]
    fn pg_config_copies_dsn_fields() {
        let config = pg_config(&dsn(), CONNECT_TIMEOUT);
        assert_eq!(config.get_hosts(), &[Host::Tcp("localhost".to_string())]);
        assert_eq!(config.get_ports(), &[49_153]);
        assert_eq!(config.get_user(), Some("user"));
        assert_eq!(config.get_password(), Some(&b"pass"[..]));
        assert_eq!(config.get_dbname(), Some("test"));
        assert_eq!(config.get_ssl_mode(), SslMode::Disable);
        assert_eq!(config.get_connect_timeout(), Some(&CONNECT_TIMEOUT));
    }

    #[test]
    fn connect_timeout_follows_the_remaining_budget() {
        assert_eq!(connect_timeout(Duration::from_secs(1)), Duration::from_secs(1));
        assert_eq!(connect_timeout(Duration::from_secs(60)), CONNECT_TIMEOUT);
        assert_eq!(connect_timeout(Duration::ZERO), MIN_CONNECT_TIMEOUT);
    }

    #[test]
    fn connect_to_closed_port_names_the_target() {
        let driver = PostgresDriver::new().expect("driver");
        // Port 1 is reserved and never runs PostgreSQL.
        let dsn = Dsn::new("127.0.0.1", 1, Credentials::new("user", "pass", "test"));
        let Err(err) = driver.connect(&dsn) else {
            panic!("connecting to port 1 should fail");
        };
        assert!(
            err.message()
                .starts_with("failed to connect to `host=127.0.0.1 port=1 user=user database=test`")
        );
    }

    #[test]
    fn use_and_drop_inside_async_runtime_do_not_panic() {
        let driver = PostgresDriver::new().expect("driver");
        let outer = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("outer runtime");
        outer.block_on(async move {
            let Err(err) = driver.connect(&dsn()) else {
                panic!("blocking connect inside a runtime should be refused");
            };
            assert!(err.message().contains("inside an async runtime"));
            drop(driver);
        });
    }
}
