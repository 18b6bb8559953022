//! CLI command definitions and dispatch.

pub mod ps;
pub mod rm;
pub mod run;

use clap::{Parser, Subcommand};

/// pgdock — disposable PostgreSQL containers for tests.
#[derive(Parser, Debug)]
#[command(name = "pgdock", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Container engine endpoint (empty = local defaults).
    #[arg(long, global = true, env = "PGDOCK_ENDPOINT", default_value = "")]
    pub endpoint: String,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a database and keep it until Ctrl+C.
    Run(run::RunArgs),
    /// List containers started by pgdock.
    Ps(ps::PsArgs),
    /// Remove containers started by pgdock.
    Rm(rm::RmArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Run(args) => run::execute(args, &cli.endpoint),
        Command::Ps(args) => ps::execute(&args, &cli.endpoint),
        Command::Rm(args) => rm::execute(&args, &cli.endpoint),
    }
}

/// Connects to the engine for commands that work on existing containers.
fn connect(endpoint: &str) -> anyhow::Result<pgdock_sdk::Pool> {
    pgdock_sdk::Pool::new(endpoint)
        .map_err(|e| anyhow::anyhow!("cannot reach container engine: {e}"))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_collects_repeated_sql_flags_in_order() {
        let cli = Cli::try_parse_from([
            "pgdock", "run", "--sql", "CREATE TABLE a(id int);", "--sql", "INSERT INTO a VALUES (1);",
        ])
        .unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(
            args.sqls,
            vec!["CREATE TABLE a(id int);", "INSERT INTO a VALUES (1);"]
        );
    }

    #[test]
    fn rm_requires_ids_or_all() {
        assert!(Cli::try_parse_from(["pgdock", "rm"]).is_err());
        assert!(Cli::try_parse_from(["pgdock", "rm", "--all"]).is_ok());
        assert!(Cli::try_parse_from(["pgdock", "rm", "abc123"]).is_ok());
    }
}
