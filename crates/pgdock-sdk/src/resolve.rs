//! Pool resolution: reuse the caller's pool or create one for the endpoint.

use std::sync::Arc;
use std::time::Duration;

use pgdock_common::error::{PgDockError, Result};
use pgdock_runtime::pool::Pool;

/// Returns the pool the container is launched with, its retry budget set
/// to `max_wait`.
///
/// A reused pool is mutated in place; see [`Pool::set_max_wait`].
pub(crate) fn resolve_pool(
    existing: Option<Arc<Pool>>,
    endpoint: &str,
    max_wait: Duration,
) -> Result<Arc<Pool>> {
    let pool = match existing {
        Some(_) if !endpoint.is_empty() => return Err(PgDockError::MutuallyExclusivePool),
        Some(pool) => pool,
        None => Arc::new(
            Pool::new(endpoint).map_err(|source| PgDockError::PoolCreation {
                endpoint: endpoint.to_string(),
                source,
            })?,
        ),
    };
    pool.set_max_wait(max_wait);
    Ok(pool)
}
