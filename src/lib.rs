//! # Weighlog
//!
//! Truck Weight Logger - record truck weigh-in sessions against a remote
//! entries store, keep the displayed list current through a change feed,
//! and export it as a spreadsheet.
//!
//! ## Modules
//!
//! - [`entries`]: Entry and form types
//! - [`store`]: Entry store clients (HTTP, in-memory)
//! - [`feed`]: Change feeds (polling, WebSocket push)
//! - [`session`]: Session timer and application shell
//! - [`export`]: Entry list rendering and XLSX/CSV export
//! - [`api`]: Reference entries backend with Axum and SQLite
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use weighlog::{AppShell, FormField, MemoryEntryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryEntryStore::new();
//!     let mut shell = AppShell::new(Arc::new(store.clone()));
//!     shell.mount(&store).await;
//!
//!     shell.start()?;
//!     shell.edit(FormField::TruckId, "T-12");
//!     shell.edit(FormField::Weight, "4.5");
//!     let entry = shell.stop().await?;
//!
//!     println!("Saved {} ({} tons)", entry.truck_id, entry.weight);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod entries;
pub mod export;
pub mod feed;
pub mod session;
pub mod store;
pub mod websocket;

// Re-export top-level types for convenience
pub use entries::{
    parse_weight, FormData, FormField, StoreError, StoreResult, TruckEntry, UNKNOWN_TRUCK_ID,
};

pub use store::{EntryStore, HttpEntryStore, HttpStoreConfig, MemoryEntryStore};

pub use feed::{ChangeFeed, DeliveryGate, EntriesCallback, PollingFeed, Subscription, WebSocketFeed};

pub use session::{format_elapsed, AppShell, SessionState, SessionTimer, ShellError, TimerHandle};

pub use export::{
    export_entries, export_filename, ExportError, ExportFormat, ExportRow, ExportZone,
};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState, EntryRepository};

pub use websocket::{
    ClientMessage, ConnectionHub, HubConfig, HubError, ServerMessage, WsEvent,
    websocket_handler,
};

pub use config::{
    generate_default_config, BackendConfig, Config, ConfigError, ExportConfig, FeedKind,
    LoggingConfig, ServerConfig,
};
