//! Superintendent - Discord guild bot
//!
//! Logs voice activity, reports a Minecraft server's status, answers
//! mentions through OpenRouter, and plays music through a Lavalink node.

mod audit;
mod chat;
mod common;
mod config;
mod discord;
mod fixup;
mod lavalink;
mod mcstatus;
mod moderation;
mod music;
mod roles;

use anyhow::Result;
use tokio::signal;
use tracing::{error, info};

use discord::DiscordBotBuilder;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before anything reads the environment
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Superintendent v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = config::load_and_validate().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Set the required environment variables (or a .env file) and restart.");
        e
    })?;

    info!("Configuration loaded successfully");
    info!("  Environment: {}", config.discord.environment.as_str());
    info!("  Log channel: {}", config.discord.log_channel_id);
    info!("  Minecraft server: {}", config.minecraft.server_address);
    if let Some(ref lavalink) = config.lavalink {
        info!("  Lavalink node: {}:{}", lavalink.host, lavalink.port);
    }

    let mut client = DiscordBotBuilder::new(config).build().await?;

    // Shut the gateway down cleanly on Ctrl+C / SIGTERM
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received - disconnecting...");
        shard_manager.shutdown_all().await;
    });

    info!("Starting Discord bot...");
    if let Err(e) = client.start().await {
        error!("Discord client error: {:?}", e);
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
