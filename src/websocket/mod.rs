//! WebSocket Change Feed (server side)
//!
//! Pushes entry change events to connected clients.
//!
//! ## Architecture
//!
//! - **ConnectionHub**: Manages all active connections and subscriptions
//! - **Handler**: Handles WebSocket upgrade and message processing
//! - **Messages**: Client and server message formats, shared with the
//!   client-side `WebSocketFeed`
//!
//! ## Usage
//!
//! Clients connect to `/ws` and subscribe to topics:
//! - `entries` - insert/delete events on the entries table
//!
//! ```text
//! -> {"type":"subscribe","topics":["entries"]}
//! <- {"type":"subscribed","topics":["entries"]}
//! <- {"type":"change","event":"insert","id":"6f1c..."}
//! ```

mod handler;
mod hub;
mod messages;

pub use handler::websocket_handler;
pub use hub::{ConnectionHub, HubConfig, HubError};
pub use messages::{ChangeKind, ClientMessage, ServerMessage, WsEvent, ENTRIES_TOPIC};
