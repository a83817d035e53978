//! fleetcmd
//!
//! Runs a batch of commands on a selection of inventory hosts in parallel and
//! prints each host's output.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use color_eyre::Result;
use eyre::{WrapErr, eyre};
use kameo::actor::Spawn;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fleetcmd_core::{
    CommandBatch, DispatchConfig, DispatcherActor, DispatcherActorArgs, RunCommands,
};
use fleetcmd_exec::CommandType;
use fleetcmd_inventory::{FileSource, HostMap, InventoryStore};

mod config;
mod factory;
mod print;
mod progress;

use config::{Config, LogFormat, LoggingConfig};
use factory::RoutingExecutor;
use progress::BarProgress;

#[derive(Parser)]
#[command(name = "fleetcmd", version)]
#[command(about = "Run command batches across a device inventory", long_about = None)]
struct Cli {
    /// Config file (defaults to the usual search paths)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Inventory directory, overrides `[inventory] path`
    #[arg(long, short = 'i', global = true)]
    inventory: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run CLI commands
    Cli(RunArgs),
    /// Run operational commands
    Operation(RunArgs),
    /// Apply configuration commands
    Configure(RunArgs),
    /// Print the resolved inventory as JSON
    Inventory,
}

#[derive(Args)]
struct RunArgs {
    /// Target host (repeatable)
    #[arg(long = "host", short = 'H', conflicts_with = "groups")]
    hosts: Vec<String>,

    /// Target every host in this group (repeatable)
    #[arg(long = "group", short = 'g')]
    groups: Vec<String>,

    /// Keep only hosts that are also in this group (repeatable)
    #[arg(long = "filter-group", requires = "groups")]
    filter_groups: Vec<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Upper bound on hosts contacted at once
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Largest result a single host may return, in bytes
    #[arg(long)]
    buffer_size: Option<usize>,

    /// Commands to run, in order
    #[arg(required = true)]
    commands: Vec<String>,
}

impl RunArgs {
    fn dispatch_config(&self, base: DispatchConfig) -> DispatchConfig {
        let mut config = base;
        if let Some(size) = self.buffer_size {
            config = config.with_buffer_size(size);
        }
        if let Some(limit) = self.max_concurrency {
            config = config.with_max_concurrency(limit);
        }
        config
    }

    fn select(&self, store: &InventoryStore) -> Result<HostMap> {
        let hosts = if !self.hosts.is_empty() {
            store.get_hosts(&self.hosts)?
        } else if !self.groups.is_empty() {
            store.get_groups(&self.groups, &self.filter_groups)?
        } else {
            store.get_all_hosts()
        };
        Ok(hosts)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    init_tracing(&config.logging);

    let store = load_inventory(&cli, &config)?;

    match cli.command {
        Commands::Inventory => {
            let inventory = store.get_inventory();
            println!("{}", serde_json::to_string_pretty(&inventory)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Cli(args) => run(CommandType::Cli, args, &store, &config).await,
        Commands::Operation(args) => run(CommandType::Operation, args, &store, &config).await,
        Commands::Configure(args) => run(CommandType::Configure, args, &store, &config).await,
    }
}

/// Logs go to stderr so reports on stdout stay machine-readable
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match logging.format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load_inventory(cli: &Cli, config: &Config) -> Result<InventoryStore> {
    let dir = cli
        .inventory
        .clone()
        .or_else(|| config.inventory.path.clone())
        .ok_or_else(|| eyre!("no inventory directory: pass --inventory or set [inventory] path"))?;

    let store = FileSource::new(&dir)
        .load()
        .wrap_err_with(|| format!("failed to load inventory from {}", dir.display()))?;
    Ok(store)
}

async fn run(
    command_type: CommandType,
    args: RunArgs,
    store: &InventoryStore,
    config: &Config,
) -> Result<ExitCode> {
    let hosts = args.select(store)?;
    let dispatch = args.dispatch_config(config.dispatch.clone());
    let batch = CommandBatch::new(command_type, args.commands.clone());

    info!(
        command_type = %command_type,
        hosts = hosts.len(),
        commands = batch.commands.len(),
        "starting run"
    );

    let progress = Arc::new(if args.json {
        BarProgress::hidden()
    } else {
        BarProgress::new(hosts.len())
    });

    let actor_ref = DispatcherActor::spawn(DispatcherActorArgs {
        executor: Arc::new(RoutingExecutor::new()),
        progress: progress.clone(),
        config: dispatch,
    });

    let outcome = actor_ref.ask(RunCommands { batch, hosts }).await;
    progress.finish();

    if let Err(e) = actor_ref.stop_gracefully().await {
        tracing::warn!(error = %e, "dispatcher did not stop cleanly");
    }

    let report = outcome.map_err(|e| eyre!("run failed: {e}"))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", print::render_report(&report));
    }

    let summary = report.summary();
    if summary.failed > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
