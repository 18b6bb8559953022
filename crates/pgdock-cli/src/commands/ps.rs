//! `pgdock ps` — List containers started by pgdock.

use clap::Args;
use pgdock_common::constants::MANAGED_LABEL;

use crate::output;

/// Arguments for the `ps` command.
#[derive(Args, Debug)]
pub struct PsArgs {
    /// Show all containers (including stopped).
    #[arg(short, long)]
    pub all: bool,

    /// Print the list as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `ps` command.
///
/// # Errors
///
/// Returns an error if the engine cannot be reached or listing fails.
pub fn execute(args: &PsArgs, endpoint: &str) -> anyhow::Result<()> {
    let pool = super::connect(endpoint)?;
    let containers = pool
        .engine()
        .list(MANAGED_LABEL)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let filtered: Vec<_> = if args.all {
        containers
    } else {
        containers
            .into_iter()
            .filter(|c| c.state == "running")
            .collect()
    };

    if args.json {
        println!("{}", output::container_json(&filtered));
        return Ok(());
    }

    if filtered.is_empty() {
        println!("No containers found.");
        return Ok(());
    }
    print!("{}", output::container_table(&filtered));
    Ok(())
}
