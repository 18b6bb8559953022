//! `pgdock run` — Start a seeded database and keep it until Ctrl+C.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use clap::Args;
use pgdock_common::constants::DEFAULT_CONTAINER_NAME;
use pgdock_sdk::{ContainerBuilder, ContainerConfig, PsqlContainer};

use crate::output::{self, BOLD, CYAN, DIM, GREEN, RESET};

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Database user.
    #[arg(long, env = "PGDOCK_USER", default_value = "postgres")]
    pub user: String,

    /// Database password.
    #[arg(long, env = "PGDOCK_PASSWORD", default_value = "postgres", hide_env_values = true)]
    pub password: String,

    /// Database name.
    #[arg(long, env = "PGDOCK_DB", default_value = "postgres")]
    pub db: String,

    /// Container name (defaults to a unique `pgdock-…` name).
    #[arg(long, env = "PGDOCK_NAME")]
    pub name: Option<String>,

    /// `postgres` image tag.
    #[arg(long, env = "PGDOCK_TAG")]
    pub tag: Option<String>,

    /// Port PostgreSQL listens on inside the container.
    #[arg(long, env = "PGDOCK_PORT")]
    pub port: Option<u16>,

    /// Statement to run once the database is ready (repeatable).
    #[arg(long = "sql", value_name = "STATEMENT")]
    pub sqls: Vec<String>,

    /// Seconds to wait for the database to accept connections.
    #[arg(long, env = "PGDOCK_TIMEOUT", value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Seconds after which the container removes itself.
    #[arg(long, env = "PGDOCK_EXPIRATION", value_name = "SECS")]
    pub expiration: Option<u64>,

    /// JSON file with container settings; flags override it.
    #[arg(long, env = "PGDOCK_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print connection details as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// Leave the container running and exit at once.
    #[arg(short, long)]
    pub detach: bool,
}

/// Executes the `run` command.
///
/// # Errors
///
/// Returns an error if the configuration file is invalid or the container
/// fails to start.
pub fn execute(args: RunArgs, endpoint: &str) -> anyhow::Result<()> {
    let started = Instant::now();
    let builder = builder_from_args(&args, endpoint)?.sqls(args.sqls.clone());
    tracing::debug!(config = ?builder.current_config(), "starting database");

    let container = builder.start().map_err(|e| anyhow::anyhow!("{e}"))?;

    if args.json {
        println!("{}", output::connection_json(&container));
    } else {
        report(&container, started.elapsed());
    }

    if args.detach {
        let id = container.detach();
        if !args.json {
            eprintln!();
            eprintln!("  Running detached. Use {BOLD}pgdock rm {}{RESET} to remove it.", id.short());
        }
        return Ok(());
    }

    wait_for_shutdown(&container)
}

/// Layers defaults, the `--config` file, and explicit flags into a builder.
///
/// `--sql` statements are left to the caller so they land after the file's.
fn builder_from_args(args: &RunArgs, endpoint: &str) -> anyhow::Result<ContainerBuilder> {
    let mut builder = ContainerBuilder::new(&args.user, &args.password, &args.db);

    if let Some(path) = &args.config {
        let config = ContainerConfig::from_json_file(path).map_err(|e| anyhow::anyhow!("{e}"))?;
        builder = builder.config(config);
    }
    if builder.current_config().container_name == DEFAULT_CONTAINER_NAME {
        builder = builder.unique_name();
    }
    if !endpoint.is_empty() {
        builder = builder.pool_endpoint(endpoint);
    }
    if let Some(name) = &args.name {
        builder = builder.container_name(name);
    }
    if let Some(tag) = &args.tag {
        builder = builder.image_tag(tag);
    }
    if let Some(port) = args.port {
        builder = builder.db_port(port);
    }
    if let Some(secs) = args.timeout {
        builder = builder.ping_retry_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = args.expiration {
        builder = builder.expiration(Duration::from_secs(secs));
    }
    Ok(builder)
}

fn report(container: &PsqlContainer, elapsed: Duration) {
    eprintln!();
    eprintln!(
        "  {GREEN}{BOLD}Database ready{RESET} in {:.1}s",
        elapsed.as_secs_f64()
    );
    eprintln!();
    eprintln!(
        "    {GREEN}●{RESET} {BOLD}{}{RESET} {DIM}[{}]{RESET} {CYAN}->{RESET} {}:{}",
        container.name(),
        container.id().short(),
        container.host(),
        container.port()
    );
    eprintln!();
    eprintln!("  {CYAN}DSN:{RESET} {}", container.connection_string());
    eprintln!("  {CYAN}URL:{RESET} {BOLD}{}{RESET}", container.url());
}

fn wait_for_shutdown(container: &PsqlContainer) -> anyhow::Result<()> {
    eprintln!();
    eprintln!("  Press {BOLD}Ctrl+C{RESET} to remove the database...");

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {e}"))?;

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(250));
    }

    eprintln!();
    eprintln!("  Removing database...");
    match container.close() {
        Ok(()) => eprintln!("  {GREEN}Database removed.{RESET}"),
        Err(e) if e.engine_error().is_some_and(pgdock_sdk::EngineError::is_not_found) => {
            eprintln!("  {DIM}Database had already expired.{RESET}");
        }
        Err(e) => return Err(anyhow::anyhow!("{e}")),
    }
    Ok(())
}
