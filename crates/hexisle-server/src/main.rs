//! Hexisle multiplayer game server.

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod connection;
mod coordinator;
mod protocol;
mod room;
mod server;
mod timer;

use config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    info!(
        addr = %config.addr,
        min_players = config.min_players,
        max_players = config.max_players,
        "Starting Hexisle server..."
    );

    server::run_server(Arc::new(config)).await
}
