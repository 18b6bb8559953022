//! Container configuration model.
//!
//! [`ContainerConfig`] is the serialisable half of a container request:
//! everything except the credentials and an existing pool handle. It can be
//! built in code, or loaded from JSON where missing fields take defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CONTAINER_NAME, DEFAULT_DB_PORT, DEFAULT_EXPIRATION, DEFAULT_IMAGE_TAG,
    DEFAULT_PING_RETRY_TIMEOUT,
};
use crate::error::{PgDockError, Result};

/// Settings for one ephemeral PostgreSQL container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Name given to the container.
    pub container_name: String,
    /// Tag of the `postgres` image.
    pub image_tag: String,
    /// Port PostgreSQL listens on inside the container.
    pub db_port: u16,
    /// Statements applied, in order, once the database is ready.
    pub sqls: Vec<String>,
    /// Engine endpoint; empty means the local default socket.
    pub pool_endpoint: String,
    /// Budget for the readiness probe loop.
    #[serde(with = "duration_secs", rename = "ping_retry_timeout_secs")]
    pub ping_retry_timeout: Duration,
    /// Lifetime after which the container removes itself.
    #[serde(with = "duration_secs", rename = "expiration_secs")]
    pub expiration: Duration,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            container_name: DEFAULT_CONTAINER_NAME.to_string(),
            image_tag: DEFAULT_IMAGE_TAG.to_string(),
            db_port: DEFAULT_DB_PORT,
            sqls: Vec::new(),
            pool_endpoint: String::new(),
            ping_retry_timeout: DEFAULT_PING_RETRY_TIMEOUT,
            expiration: DEFAULT_EXPIRATION,
        }
    }
}

impl ContainerConfig {
    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// holds invalid values.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PgDockError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values the engine would otherwise reject late.
    ///
    /// # Errors
    ///
    /// Returns [`PgDockError::Config`] when a value is unusable. An empty
    /// container name is valid: the engine then picks one.
    pub fn validate(&self) -> Result<()> {
        if self.db_port == 0 {
            return Err(PgDockError::Config {
                message: "database port must not be 0".to_string(),
            });
        }
        Ok(())
    }

    /// Expiration in whole seconds, rounded up so short values still expire.
    #[must_use]
    pub fn expiration_secs(&self) -> u64 {
        let secs = self.expiration.as_secs();
        if self.expiration.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_are_stable() {
        let config = ContainerConfig::default();
        assert_eq!(config.container_name, "pgdock");
        assert_eq!(config.image_tag, "alpine");
        assert_eq!(config.db_port, 5432);
        assert!(config.sqls.is_empty());
        assert!(config.pool_endpoint.is_empty());
        assert_eq!(config.ping_retry_timeout, Duration::from_secs(20));
        assert_eq!(config.expiration, Duration::from_secs(20));
    }

    #[test]
    fn partial_json_takes_defaults() {
        let config: ContainerConfig =
            serde_json::from_str(r#"{"image_tag": "16-alpine", "expiration_secs": 60}"#)
                .expect("valid json");
        assert_eq!(config.image_tag, "16-alpine");
        assert_eq!(config.expiration, Duration::from_secs(60));
        assert_eq!(config.db_port, 5432);
        assert_eq!(config.ping_retry_timeout, Duration::from_secs(20));
    }

    #[test]
    fn serialize_writes_seconds() {
        let json = serde_json::to_value(ContainerConfig::default()).expect("serializes");
        assert_eq!(json["expiration_secs"], 20);
        assert_eq!(json["ping_retry_timeout_secs"], 20);
    }

    #[test]
    fn from_json_file_reads_seed_statements_in_order() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"container_name": "seeded", "sqls": ["CREATE TABLE a(id int);", "INSERT INTO a VALUES (1);"]}}"#
        )
        .expect("write");

        let config = ContainerConfig::from_json_file(file.path()).expect("loads");
        assert_eq!(config.container_name, "seeded");
        assert_eq!(
            config.sqls,
            vec!["CREATE TABLE a(id int);", "INSERT INTO a VALUES (1);"]
        );
    }

    #[test]
    fn from_json_file_missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = ContainerConfig::from_json_file(&dir.path().join("missing.json"))
            .expect_err("should fail");
        assert!(matches!(err, PgDockError::Io { .. }));
    }

    #[test]
    fn from_json_file_rejects_zero_port() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"db_port": 0}}"#).expect("write");
        let err = ContainerConfig::from_json_file(file.path()).expect_err("should fail");
        assert!(matches!(err, PgDockError::Config { .. }));
    }

    #[test]
    fn empty_container_name_is_valid() {
        let config = ContainerConfig {
            container_name: String::new(),
            ..ContainerConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn expiration_secs_rounds_up() {
        let config = ContainerConfig {
            expiration: Duration::from_millis(1500),
            ..ContainerConfig::default()
        };
        assert_eq!(config.expiration_secs(), 2);
    }
}
