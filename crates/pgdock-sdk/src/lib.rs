//! # pgdock-sdk
//!
//! Disposable PostgreSQL containers for tests.
//!
//! [`ContainerBuilder`] collects the options, [`ContainerBuilder::start`]
//! runs the pipeline (pool, launch, expiration, readiness, seeding) and
//! hands back a [`PsqlContainer`] whose [`close`](PsqlContainer::close)
//! removes the container exactly once.
//!
//! # Example
//!
//! ```rust,no_run
//! use pgdock_sdk::ContainerBuilder;
//!
//! let container = ContainerBuilder::new("user", "pass", "test")
//!     .container_name("users-test")
//!     .sql("CREATE TABLE users(user_id UUID PRIMARY KEY);")
//!     .start()?;
//!
//! println!("postgres listening on port {}", container.port());
//! container.close()?;
//! # Ok::<(), pgdock_sdk::PgDockError>(())
//! ```
//!
//! All calls block. Call them from a plain thread (or `spawn_blocking`),
//! never from inside an async runtime.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod builder;
pub mod container;
mod launch;
mod probe;
mod resolve;
mod seed;

pub use builder::ContainerBuilder;
pub use container::PsqlContainer;
pub use pgdock_common::config::ContainerConfig;
pub use pgdock_common::error::{DriverError, EngineError, PgDockError, Result};
pub use pgdock_common::types::{ContainerId, Credentials, Dsn};
pub use pgdock_driver::{Connection, DatabaseDriver, postgres::PostgresDriver};
pub use pgdock_runtime::backend::{ContainerInfo, RestartPolicy, RunSpec, RuntimeEngine};
pub use pgdock_runtime::pool::Pool;
