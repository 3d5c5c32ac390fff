mod config;
mod filter;
mod normalize;
mod platform;
mod relay;
mod slack;

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::relay::Relay;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tweetrelay=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Missing credentials: log and exit without connecting
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            return Ok(());
        }
    };

    info!("Configuration loaded successfully");
    info!("  Target channel: {:?}", config.target_channel_id);
    info!("  Keywords: {}", config.keywords.len());

    let relay = Arc::new(Relay::from_config(&config));

    info!("Discord to Slack relay is starting...");
    platform::discord::run(&config.discord_bot_token, relay).await?;

    Ok(())
}
