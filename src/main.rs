//! issuebridge CLI entry point.

use anyhow::Context as _;
use clap::Parser;
use issuebridge::bot::BotController;
use issuebridge::config::Config;
use issuebridge::forge::GithubClient;
use issuebridge::messaging::{MatrixAdapter, Messaging as _};
use issuebridge::watcher::RepoEventWatcher;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "issuebridge")]
#[command(about = "Links forge issues mentioned in a chat room and relays repository activity into it")]
struct Cli {
    /// Path to config file (optional)
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --debug when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.debug {
            EnvFilter::new("issuebridge=debug,info")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = if let Some(config_path) = cli.config {
        Config::load_from_path(&config_path)
            .with_context(|| format!("failed to load config from {}", config_path.display()))?
    } else {
        Config::load().with_context(|| "failed to load configuration")?
    };

    tracing::info!(
        repo = %config.forge.slug(),
        room_id = %config.matrix.room_id,
        "configuration loaded"
    );

    let forge = Arc::new(
        GithubClient::new(&config.forge).with_context(|| "failed to build GitHub client")?,
    );
    let messaging = Arc::new(
        MatrixAdapter::new(&config.matrix).with_context(|| "failed to build Matrix adapter")?,
    );

    let inbound = messaging
        .start()
        .await
        .with_context(|| "failed to start Matrix adapter")?;
    messaging
        .health_check()
        .await
        .with_context(|| "Matrix adapter is unhealthy")?;

    let bot = BotController::new(forge.clone(), messaging.clone());
    let own_user_id = bot
        .own_user_id()
        .await
        .with_context(|| "failed to look up the bot's own user id")?;
    tracing::info!(user_id = %own_user_id, "connected to Matrix");

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let watcher = RepoEventWatcher::new(
        forge,
        chrono::Utc::now(),
        config.watcher.event_types.iter().cloned(),
    )
    .with_default_poll_interval(config.watcher.default_poll_interval_secs);
    let relay = bot.spawn_event_relay(watcher, config.matrix.room_id.clone(), shutdown_rx.clone());

    tracing::info!("issuebridge started");

    tokio::select! {
        _ = bot.run(inbound, shutdown_rx) => {
            tracing::info!("inbound message loop ended");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    tracing::info!("shutting down...");
    // Receivers may already be gone if the loops ended on their own.
    let _ = shutdown_tx.send(true);

    if let Err(error) = relay.await {
        tracing::warn!(%error, "event relay task failed");
    }
    if let Err(error) = messaging.shutdown().await {
        tracing::warn!(%error, "Matrix adapter shutdown failed");
    }

    tracing::info!("issuebridge stopped");
    Ok(())
}
