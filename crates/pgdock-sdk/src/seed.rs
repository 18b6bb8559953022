//! Seed statement execution.

use pgdock_common::error::{PgDockError, Result};
use pgdock_common::types::Dsn;
use pgdock_driver::DatabaseDriver;

/// Runs `statements` in order on one connection, stopping at the first
/// failure. No transaction is opened around them.
pub(crate) fn execute_sqls(
    driver: &dyn DatabaseDriver,
    dsn: &Dsn,
    statements: &[String],
) -> Result<()> {
    if statements.is_empty() {
        return Ok(());
    }

    let mut connection = driver
        .connect(dsn)
        .map_err(|source| PgDockError::SeedConnection {
            action: "open",
            source,
        })?;

    for (index, statement) in statements.iter().enumerate() {
        connection
            .execute(statement)
            .map_err(|source| PgDockError::Seed { index, source })?;
    }
    tracing::info!(count = statements.len(), "seed statements applied");

    connection
        .close()
        .map_err(|source| PgDockError::SeedConnection {
            action: "close",
            source,
        })
}
