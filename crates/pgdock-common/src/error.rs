//! Unified error types for the pgdock workspace.
//!
//! [`PgDockError`] is what the container constructor returns. Each variant
//! names the pipeline stage that failed and wraps the collaborator error
//! ([`EngineError`] or [`DriverError`]) that caused it.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Error reported by a container engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine answered with an error status.
    ///
    /// Displays the engine's own message verbatim.
    #[error("{message}")]
    Api {
        /// HTTP status code returned by the engine.
        status: u16,
        /// Message returned by the engine.
        message: String,
    },

    /// The engine could not be reached or the exchange failed mid-way.
    #[error("transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// The endpoint address could not be understood.
    #[error("invalid endpoint `{endpoint}`: {reason}")]
    InvalidEndpoint {
        /// Endpoint as given by the caller.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A blocking engine call was made from inside an async runtime.
    #[error("cannot block on the container engine from inside an async runtime")]
    AsyncContext,

    /// The engine answered, but not with what was asked for.
    #[error("unexpected engine response: {message}")]
    Unexpected {
        /// Description of the unexpected response.
        message: String,
    },
}

impl EngineError {
    /// Returns the engine status code, if the engine produced one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns whether the engine reported the resource as missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}

/// Error reported by a database driver.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct DriverError {
    message: String,
    code: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DriverError {
    /// Creates a driver error carrying only a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            source: None,
        }
    }

    /// Attaches the server-side error code (SQLSTATE).
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attaches the underlying error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error message, as reported by the server when it has one.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the SQLSTATE code, if the server reported one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
}

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum PgDockError {
    /// Both an existing pool and a pool endpoint were supplied.
    #[error("with pool and with pool endpoint are mutually exclusive")]
    MutuallyExclusivePool,

    /// A new pool could not be created for the endpoint.
    #[error("get pool: {source}")]
    PoolCreation {
        /// Endpoint the pool was requested for.
        endpoint: String,
        /// Underlying engine error.
        source: EngineError,
    },

    /// The engine behind the pool did not answer a ping.
    #[error("ping container engine: {source}")]
    EngineUnavailable {
        /// Underlying engine error.
        source: EngineError,
    },

    /// The engine rejected the container or its failsafe.
    #[error("{context}: {source}")]
    Launch {
        /// Launch step that failed.
        context: &'static str,
        /// Underlying engine error.
        source: EngineError,
    },

    /// The database never answered a probe within the retry budget.
    #[error("ping db: reached retry deadline after {elapsed:?} ({attempts} attempts): {source}")]
    ReadinessTimeout {
        /// Number of probes attempted.
        attempts: u32,
        /// Time spent probing.
        elapsed: Duration,
        /// Last probe failure.
        source: DriverError,
    },

    /// The database driver could not be set up.
    #[error("create database driver: {source}")]
    DriverUnavailable {
        /// Underlying driver error.
        source: DriverError,
    },

    /// The seed connection could not be opened or closed.
    #[error("execute sqls: {action} db: {source}")]
    SeedConnection {
        /// `open` or `close`.
        action: &'static str,
        /// Underlying driver error.
        source: DriverError,
    },

    /// A seed statement failed.
    #[error("execute sqls: execute sql {index}: {source}")]
    Seed {
        /// Zero-based index of the failing statement.
        index: usize,
        /// Underlying driver error.
        source: DriverError,
    },

    /// Tearing down after a failure failed as well.
    #[error("{cause}; close: {close}")]
    Teardown {
        /// Failure that triggered the teardown.
        #[source]
        cause: Box<PgDockError>,
        /// Error returned by the teardown itself.
        close: EngineError,
    },

    /// Removing the container on close failed.
    #[error("remove container {id}: {source}")]
    Remove {
        /// Container that could not be removed.
        id: String,
        /// Underlying engine error.
        source: EngineError,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl PgDockError {
    /// Returns the stage failure, looking through a failed teardown.
    #[must_use]
    pub fn cause(&self) -> &Self {
        match self {
            Self::Teardown { cause, .. } => cause.cause(),
            other => other,
        }
    }

    /// Returns the engine error this failure wraps, if any.
    #[must_use]
    pub fn engine_error(&self) -> Option<&EngineError> {
        match self.cause() {
            Self::PoolCreation { source, .. }
            | Self::EngineUnavailable { source }
            | Self::Launch { source, .. }
            | Self::Remove { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Returns the driver error this failure wraps, if any.
    #[must_use]
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self.cause() {
            Self::ReadinessTimeout { source, .. }
            | Self::DriverUnavailable { source }
            | Self::SeedConnection { source, .. }
            | Self::Seed { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, PgDockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_displays_engine_message_verbatim() {
        let err = EngineError::Api {
            status: 400,
            message: "invalid tag format".into(),
        };
        assert_eq!(err.to_string(), "invalid tag format");
        assert_eq!(err.status(), Some(400));
        assert!(!err.is_not_found());
    }

    #[test]
    fn launch_error_prefixes_context() {
        let err = PgDockError::Launch {
            context: "start container",
            source: EngineError::Api {
                status: 400,
                message: "invalid tag format".into(),
            },
        };
        assert_eq!(err.to_string(), "start container: invalid tag format");
        assert_eq!(
            err.engine_error().map(ToString::to_string).as_deref(),
            Some("invalid tag format")
        );
    }

    #[test]
    fn seed_error_names_statement_index() {
        let err = PgDockError::Seed {
            index: 1,
            source: DriverError::new("syntax error at or near \"error\"").with_code("42601"),
        };
        assert_eq!(
            err.to_string(),
            "execute sqls: execute sql 1: syntax error at or near \"error\""
        );
        assert_eq!(err.driver_error().and_then(DriverError::code), Some("42601"));
    }

    #[test]
    fn teardown_keeps_both_messages_and_exposes_cause() {
        let err = PgDockError::Teardown {
            cause: Box::new(PgDockError::Seed {
                index: 0,
                source: DriverError::new("boom"),
            }),
            close: EngineError::Transport {
                message: "socket closed".into(),
            },
        };
        let text = err.to_string();
        assert!(text.contains("execute sql 0: boom"));
        assert!(text.contains("close: transport error: socket closed"));
        assert!(matches!(err.cause(), PgDockError::Seed { index: 0, .. }));
        assert_eq!(err.driver_error().map(DriverError::message), Some("boom"));
    }

    #[test]
    fn readiness_timeout_retains_last_failure() {
        let err = PgDockError::ReadinessTimeout {
            attempts: 3,
            elapsed: Duration::from_secs(1),
            source: DriverError::new("failed to connect to `host=localhost`"),
        };
        assert!(
            err.to_string()
                .contains("reached retry deadline after 1s (3 attempts): failed to connect")
        );
    }
}
