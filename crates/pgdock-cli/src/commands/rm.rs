//! `pgdock rm` — Remove containers started by pgdock.

use clap::Args;
use pgdock_common::constants::MANAGED_LABEL;
use pgdock_sdk::ContainerId;

/// Arguments for the `rm` command.
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Container IDs (or unique ID prefixes) to remove.
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub containers: Vec<String>,

    /// Remove every container started by pgdock.
    #[arg(short, long)]
    pub all: bool,
}

/// Executes the `rm` command.
///
/// Only containers carrying the pgdock label are touched; other IDs are
/// reported and skipped.
///
/// # Errors
///
/// Returns an error if the engine cannot be reached or any removal fails.
pub fn execute(args: &RmArgs, endpoint: &str) -> anyhow::Result<()> {
    let pool = super::connect(endpoint)?;
    let managed = pool
        .engine()
        .list(MANAGED_LABEL)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let targets: Vec<ContainerId> = if args.all {
        managed.into_iter().map(|c| c.id).collect()
    } else {
        let mut targets = Vec::new();
        for wanted in &args.containers {
            match resolve(&managed, wanted) {
                Some(id) => targets.push(id),
                None => tracing::warn!(container = %wanted, "not a pgdock container, skipping"),
            }
        }
        targets
    };

    let mut failures = 0_usize;
    for id in &targets {
        match pool.engine().remove(id) {
            Ok(()) => println!("{}", id.short()),
            Err(e) => {
                failures += 1;
                tracing::error!(id = %id.short(), error = %e, "failed to remove container");
            }
        }
    }

    if failures > 0 {
        return Err(anyhow::anyhow!("failed to remove {failures} container(s)"));
    }
    Ok(())
}

/// Matches `wanted` against managed containers by full ID, ID prefix, or
/// name. Ambiguous prefixes match nothing.
fn resolve(managed: &[pgdock_sdk::ContainerInfo], wanted: &str) -> Option<ContainerId> {
    let mut matches = managed
        .iter()
        .filter(|c| c.name == wanted || c.id.as_str().starts_with(wanted));
    let first = matches.next()?;
    if matches.next().is_some() {
        return None;
    }
    Some(first.id.clone())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pgdock_sdk::ContainerInfo;

    use super::*;

    fn info(id: &str, name: &str) -> ContainerInfo {
        ContainerInfo {
            id: ContainerId::new(id),
            name: name.into(),
            state: "running".into(),
            image: "postgres:alpine".into(),
            labels: HashMap::new(),
            created_at: String::new(),
        }
    }

    #[test]
    fn resolves_by_prefix_and_name() {
        let managed = [info("abc123", "pgdock-one"), info("def456", "pgdock-two")];
        assert_eq!(resolve(&managed, "abc"), Some(ContainerId::new("abc123")));
        assert_eq!(resolve(&managed, "pgdock-two"), Some(ContainerId::new("def456")));
        assert_eq!(resolve(&managed, "zzz"), None);
    }

    #[test]
    fn ambiguous_prefix_matches_nothing() {
        let managed = [info("abc123", "pgdock-one"), info("abd456", "pgdock-two")];
        assert_eq!(resolve(&managed, "ab"), None);
    }
}
