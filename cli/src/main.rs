//! zap CLI - Find the process behind a port and stop it the right way
//!
//! Resolves port queries to processes, detects whether a container runtime
//! or systemd supervises them, and stops them through that supervisor.

mod commands;
mod output;
mod tui;

use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::filter::EnvFilter;
use zap_core::{ConfigStore, Engine, Query, Strategy};

#[derive(Parser)]
#[command(name = "zap")]
#[command(author, version, about = "Find the process behind a port and stop it the right way")]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Port queries: 3000, :3000, 8080-8090, localhost:5432
    #[arg(value_name = "PORT")]
    ports: Vec<Query>,

    /// Force kill (SIGKILL / container kill)
    #[arg(short, long)]
    force: bool,

    /// Print what would be done without doing it
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Do not ask for confirmation
    #[arg(short, long)]
    yes: bool,

    /// Override the kill strategy (signal, container, systemd)
    #[arg(short, long, value_name = "STRATEGY")]
    strategy: Option<Strategy>,

    /// Interactive list with auto-refresh
    #[arg(short, long)]
    interactive: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the effective configuration
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "debug",
        (false, _) => "trace",
    };

    let filter = match std::env::var_os("RUST_LOG") {
        Some(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        None => EnvFilter::new(level),
    };

    tracing_subscriber::fmt::Subscriber::builder()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let store = ConfigStore::new()?;

    if let Some(Commands::Config { init }) = cli.command {
        if init {
            commands::config::init(&store).await?;
        } else {
            commands::config::show(&store).await?;
        }
        return Ok(ExitCode::SUCCESS);
    }

    let config = store
        .load_effective()
        .await
        .with_context(|| format!("Failed to load {}", store.path().display()))?;
    let engine = Engine::detect(&config).context("Failed to set up process discovery")?;

    let success = if !cli.ports.is_empty() {
        let options = commands::kill::KillOptions {
            force: cli.force,
            dry_run: cli.dry_run,
            yes: cli.yes,
            strategy: cli.strategy,
            json: cli.json,
        };
        commands::kill::run(&engine, &cli.ports, &options).await?
    } else if cli.interactive || (!cli.json && atty::is(atty::Stream::Stdout)) {
        tui::run(engine, config.refresh_duration(), cli.force).await?;
        true
    } else {
        commands::list::run(&engine, cli.json).await?
    };

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
