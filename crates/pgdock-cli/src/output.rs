//! Formatted output helpers for CLI commands.

use pgdock_sdk::{ContainerInfo, PsqlContainer};
use serde_json::{Value, json};

pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const GREEN: &str = "\x1b[32m";
pub const CYAN: &str = "\x1b[36m";
pub const RESET: &str = "\x1b[0m";

/// Connection details of a started container, as printed by `run --json`.
#[must_use]
pub fn connection_json(container: &PsqlContainer) -> Value {
    json!({
        "id": container.id().as_str(),
        "name": container.name(),
        "host": container.host(),
        "port": container.port(),
        "dsn": container.connection_string(),
        "url": container.url(),
    })
}

/// Renders containers as the `ps` table.
#[must_use]
pub fn container_table(containers: &[ContainerInfo]) -> String {
    let mut out = format!(
        "{:<14} {:<24} {:<10} {:<20} {}\n",
        "CONTAINER ID", "NAME", "STATE", "IMAGE", "CREATED"
    );
    for c in containers {
        out.push_str(&format!(
            "{:<14} {:<24} {:<10} {:<20} {}\n",
            c.id.short(),
            c.name,
            c.state,
            c.image,
            c.created_at
        ));
    }
    out
}

/// Renders containers as a JSON array.
#[must_use]
pub fn container_json(containers: &[ContainerInfo]) -> Value {
    Value::Array(
        containers
            .iter()
            .map(|c| {
                json!({
                    "id": c.id.as_str(),
                    "name": c.name,
                    "state": c.state,
                    "image": c.image,
                    "created_at": c.created_at,
                })
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pgdock_sdk::ContainerId;

    use super::*;

    fn info(id: &str, name: &str) -> ContainerInfo {
        ContainerInfo {
            id: ContainerId::new(id),
            name: name.into(),
            state: "running".into(),
            image: "postgres:alpine".into(),
            labels: HashMap::new(),
            created_at: "2026-01-02T03:04:05+00:00".into(),
        }
    }

    #[test]
    fn table_has_header_and_one_row_per_container() {
        let table = container_table(&[
            info("0123456789abcdef0123", "pgdock-a"),
            info("fedcba9876543210fedc", "pgdock-b"),
        ]);
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("CONTAINER ID"));
        assert!(lines[1].starts_with("0123456789ab "));
        assert!(lines[2].contains("pgdock-b"));
    }

    #[test]
    fn json_lists_full_ids() {
        let value = container_json(&[info("0123456789abcdef0123", "pgdock-a")]);
        assert_eq!(value[0]["id"], "0123456789abcdef0123");
        assert_eq!(value[0]["state"], "running");
    }

    #[test]
    fn empty_json_is_an_empty_array() {
        assert_eq!(container_json(&[]), json!([]));
    }
}
