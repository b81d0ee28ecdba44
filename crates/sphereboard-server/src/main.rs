//! Sphereboard WebSocket Relay Server
//!
//! Relays board edits and cursor pings between clients on the same board and
//! persists boards as JSON files.
//!
//! ## Protocol
//!
//! Messages are JSON objects tagged by `type`:
//! ```json
//! { "type": "join", "board": "board-id" }
//! { "type": "element-added", "element": { "type": "rect", "id": "..." } }
//! { "type": "cursor-ping", "x": 0.5, "y": 0.25, "name": "ada", "color": "#2563eb" }
//! ```
//!
//! Everything except `join` and `leave` is forwarded to the other peers of the
//! board, stamped with the sender id. Nothing is echoed back to its sender.

mod config;
mod error;
mod rooms;
mod routes;

use config::ServerConfig;
use error::ServerError;
use rooms::AppState;
use sphereboard_core::storage::FileStorage;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sphereboard_server=info,sphereboard_core=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let storage = FileStorage::new(config.data_dir.clone())?;
    info!("Storing boards in {}", storage.base_path().display());

    let state = Arc::new(AppState::new(Box::new(storage)));
    let app = routes::router(state);

    info!("Sphereboard relay server listening on {}", config.addr);
    info!("WebSocket endpoint: ws://{}/ws", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
