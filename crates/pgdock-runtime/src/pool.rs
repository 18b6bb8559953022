//! Shareable handle to a container engine.
//!
//! A [`Pool`] bundles an engine with the host its published ports are
//! reachable on and the retry budget used while waiting for containers.
//! Share one across containers by cloning the `Arc<Pool>`.
//!
//! The retry budget is shared state: every container built with a given
//! pool overwrites [`Pool::max_wait`] with its own timeout. Containers built
//! concurrently from the same pool see whichever value was written last.
//! Use separate pools if that matters.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use pgdock_common::constants::{DEFAULT_PING_RETRY_TIMEOUT, DEFAULT_RETRY_INTERVAL, LOCAL_HOST};
use pgdock_common::error::EngineError;

use crate::backend::RuntimeEngine;
use crate::backend::docker::DockerEngine;
use crate::endpoint::Endpoint;
use crate::retry::{self, RetryPolicy, RetryTimeout};

/// A container engine plus its retry budget.
pub struct Pool {
    engine: Arc<dyn RuntimeEngine>,
    host: String,
    max_wait_ms: AtomicU64,
    retry_interval: Duration,
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("host", &self.host)
            .field("max_wait", &self.max_wait())
            .field("retry_interval", &self.retry_interval)
            .finish_non_exhaustive()
    }
}

impl Pool {
    /// Connects to the Docker engine at `endpoint`.
    ///
    /// An empty endpoint uses the client's local defaults (`DOCKER_HOST`, or
    /// the platform's default socket).
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is malformed or the client cannot
    /// be built. No request is sent to the engine.
    pub fn new(endpoint: &str) -> Result<Self, EngineError> {
        let endpoint = Endpoint::parse(endpoint)?;
        let host = published_host(&endpoint);
        let engine = DockerEngine::connect(&endpoint)?;
        Ok(Self::with_engine(Arc::new(engine)).with_host(host))
    }

    /// Wraps an already constructed engine.
    #[must_use]
    pub fn with_engine(engine: Arc<dyn RuntimeEngine>) -> Self {
        Self {
            engine,
            host: LOCAL_HOST.to_string(),
            max_wait_ms: AtomicU64::new(duration_ms(DEFAULT_PING_RETRY_TIMEOUT)),
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }

    /// Sets the host published ports are reachable on.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the pause between two retry attempts.
    #[must_use]
    pub const fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Returns the engine.
    #[must_use]
    pub fn engine(&self) -> &dyn RuntimeEngine {
        self.engine.as_ref()
    }

    /// Returns the host published ports are reachable on.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the current retry budget.
    #[must_use]
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms.load(Ordering::Acquire))
    }

    /// Overwrites the retry budget for every holder of this pool.
    ///
    /// Last writer wins when several threads set it concurrently.
    pub fn set_max_wait(&self, max_wait: Duration) {
        self.max_wait_ms
            .store(duration_ms(max_wait), Ordering::Release);
    }

    /// Returns the pause between two retry attempts.
    #[must_use]
    pub const fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    /// Calls `op` on a fixed schedule until it succeeds or the budget
    /// ([`Pool::max_wait`]) is spent.
    ///
    /// # Errors
    ///
    /// Returns [`RetryTimeout`] carrying the last error.
    pub fn retry<T, E, F>(&self, op: F) -> Result<T, RetryTimeout<E>>
    where
        E: std::fmt::Display,
        F: FnMut() -> Result<T, E>,
    {
        let policy = RetryPolicy {
            max_wait: self.max_wait(),
            interval: self.retry_interval,
        };
        retry::retry(policy, op)
    }
}

fn published_host(endpoint: &Endpoint) -> String {
    if *endpoint == Endpoint::LocalDefaults {
        if let Some(from_env) = std::env::var("DOCKER_HOST")
            .ok()
            .and_then(|value| Endpoint::parse(&value).ok())
        {
            return from_env.published_host().to_string();
        }
    }
    endpoint.published_host().to_string()
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
