//! Database driver seam for pgdock.
//!
//! The readiness prober and seed executor only need to open a connection,
//! check it is alive, and run statements. [`DatabaseDriver`] and
//! [`Connection`] capture exactly that, and [`postgres::PostgresDriver`]
//! implements them on top of `tokio-postgres`.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod postgres;

use std::time::Duration;

use pgdock_common::error::DriverError;
use pgdock_common::types::Dsn;

/// Opens connections to a database.
pub trait DatabaseDriver: Send + Sync {
    /// Opens a connection described by `dsn`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be reached or rejects the
    /// credentials.
    fn connect(&self, dsn: &Dsn) -> Result<Box<dyn Connection>, DriverError>;

    /// Opens a connection, giving up on the attempt after about `timeout`.
    ///
    /// Drivers without a configurable connect timeout fall back to
    /// [`connect`](Self::connect).
    ///
    /// # Errors
    ///
    /// Same as [`connect`](Self::connect).
    fn connect_with_timeout(
        &self,
        dsn: &Dsn,
        timeout: Duration,
    ) -> Result<Box<dyn Connection>, DriverError> {
        let _ = timeout;
        self.connect(dsn)
    }
}

/// An open database connection.
pub trait Connection {
    /// Issues a no-op round trip.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not answer.
    fn ping(&mut self) -> Result<(), DriverError>;

    /// Executes one statement (or a `;`-separated batch) without a
    /// surrounding transaction.
    ///
    /// # Errors
    ///
    /// Returns the server's error if the statement fails.
    fn execute(&mut self, statement: &str) -> Result<(), DriverError>;

    /// Closes the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection did not shut down cleanly.
    fn close(self: Box<Self>) -> Result<(), DriverError>;
}
