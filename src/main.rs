//! Practice tracker CLI entry point.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use practice_tracker::application::AppContext;
use practice_tracker::cli::commands::{goal, init, session};
use practice_tracker::cli::{handle_error, Cli, Commands};
use practice_tracker::infrastructure::config::ConfigLoader;
use practice_tracker::infrastructure::logging::{LogConfig, LogRetention, LoggerImpl};

/// Upper bound on how long queued goal updates may run after a command.
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    if let Err(err) = run(cli).await {
        handle_error(err, json_mode);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = ConfigLoader::load().context("Failed to load configuration")?;

    let log_config = LogConfig::from(&config.logging);
    let _logger = LoggerImpl::init(&log_config).context("Failed to initialize logging")?;
    if let Some(log_dir) = &log_config.log_dir {
        if let Err(e) = LogRetention::new(log_config.retention_days).cleanup_old_logs(log_dir).await {
            tracing::warn!(error = %e, "log retention cleanup failed");
        }
    }

    let command = match cli.command {
        Commands::Init(args) => return init::execute(args, cli.json).await,
        command => command,
    };

    let ctx = AppContext::build(config)
        .await
        .context("Failed to initialize application. Run 'practice init' first.")?;

    let result = match command {
        Commands::Goal(args) => goal::execute(args, &ctx, cli.json).await,
        Commands::Session(args) => session::execute(args, &ctx, cli.json).await,
        Commands::Init(_) => Ok(()),
    };

    let stats = ctx.shutdown(SHUTDOWN_DRAIN).await;
    if stats.pending > 0 || stats.dead_lettered > 0 {
        tracing::warn!(
            pending = stats.pending,
            dead_lettered = stats.dead_lettered,
            "some goal updates were not applied; run 'practice goal recompute --user <id>'"
        );
    }

    result
}
