//! Container engine access for pgdock.
//!
//! - [`backend`]: the [`RuntimeEngine`](backend::RuntimeEngine) trait and its Docker implementation.
//! - [`endpoint`]: parsing of engine endpoint addresses.
//! - [`pool`]: a shareable engine handle with a bounded retry helper.
//! - [`retry`]: the fixed-schedule retry loop itself.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod backend;
pub mod endpoint;
pub mod pool;
pub mod retry;
