//! Runs a single bingo hall.
//!
//! Environment:
//! - `BINGO_ADDR`: listen address (default `127.0.0.1:8000`)
//! - `BINGO_DRAW_INTERVAL_MS`: pause between draws (default 5000)
//! - `RUST_LOG`: log filter (default `info`)

use std::time::Duration;

use bingo_room::RoomConfig;
use bingo_server::BingoServer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_ADDR: &str = "127.0.0.1:8000";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("BINGO_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let mut room_config = RoomConfig::default();
    if let Some(interval) = env_millis("BINGO_DRAW_INTERVAL_MS") {
        room_config.draw_interval = interval;
    }

    let server = BingoServer::builder()
        .bind(&addr)
        .room_config(room_config)
        .build()
        .await?;
    tracing::info!(addr = %server.local_addr()?, "bingo hall open");

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(())
}

/// Reads a millisecond duration from the environment, ignoring bad values.
fn env_millis(key: &str) -> Option<Duration> {
    let raw = std::env::var(key).ok()?;
    match raw.parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, "ignoring invalid duration");
            None
        }
    }
}
