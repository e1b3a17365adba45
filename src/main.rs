use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use taskflow::cli::Cli;
use taskflow::commands::{self, Clock};
use taskflow::config::{self, AppConfig, StoreBackend};
use taskflow::core::seeding::maybe_seed_defaults;
use taskflow::services::{Outcome, TaskBoard};
use taskflow::store;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_filter.clone())?;
    let config = config::from_cli(&cli)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(run(cli, config))
}

async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    let store = store::open(&config)?;
    let board = TaskBoard::new(store);

    // the remote record API is shared, so only a local store gets first-run defaults
    if !cli.no_seed && matches!(config.backend(), StoreBackend::Local) {
        if let Err(err) = maybe_seed_defaults(board.category_repository()).await {
            warn!(error = %err, "could not seed default categories");
        }
    }
    if let Outcome::Failed(message) = board.load().await {
        bail!("Failed to load tasks: {message}");
    }

    let command = cli.command.unwrap_or_default();
    let stdout = io::stdout();
    let handle = stdout.lock();
    commands::execute(&board, command, Clock::system(), confirm_delete, handle).await
}

fn confirm_delete(count: usize) -> bool {
    eprint!("Delete {count} selected task(s)? [y/N] ");
    let _ = io::stderr().flush();
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn init_tracing(filter: Option<String>) -> Result<()> {
    let filter = filter.unwrap_or_else(|| "warn".to_string());
    let directive: Directive = filter.parse()?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .try_init();
    Ok(())
}
