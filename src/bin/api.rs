//! Weighlog API Server
//!
//! Reference entries backend: REST endpoints over SQLite plus a WebSocket
//! change channel.
//!
//! Run with: cargo run --bin weighlog-api
//!
//! # Configuration
//!
//! Read from the usual config file locations (see `weighlog-cli config`),
//! then overridden by environment variables:
//! - `WEIGHLOG_API_HOST`: Host to bind to (default: 0.0.0.0)
//! - `WEIGHLOG_API_PORT`: Port to listen on (default: 3001)
//! - `WEIGHLOG_DATABASE`: SQLite file (default: data-local dir)
//! - `RUST_LOG`: Log filter (default: weighlog=info,tower_http=debug)

use std::sync::Arc;
use weighlog::api::{serve, AppState, EntryRepository};
use weighlog::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load_default();
    config.logging.init(Some("tower_http=debug"));

    tracing::info!("Starting Weighlog API server v{}", env!("CARGO_PKG_VERSION"));

    let api_config = config.api.api_config();

    let database = config.api.database_path();
    tracing::info!("Database: {:?}", database);
    let repo = Arc::new(EntryRepository::open(&database)?);
    tracing::info!("Entry repository ready ({} entries)", repo.count()?);

    let state = AppState::new(repo, api_config.clone());

    tracing::info!("Starting server on {}:{}", api_config.host, api_config.port);
    serve(state, &api_config).await?;

    tracing::info!("Weighlog API server stopped");
    Ok(())
}
