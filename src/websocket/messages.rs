//! WebSocket Message Types
//!
//! Defines all message types exchanged between change feed clients and
//! the backend.

use serde::{Deserialize, Serialize};

/// Topic carrying entry change events
pub const ENTRIES_TOPIC: &str = "entries";

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe to topics for real-time updates
    Subscribe {
        /// List of topics to subscribe to (e.g., "entries")
        topics: Vec<String>,
    },
    /// Unsubscribe from topics
    Unsubscribe {
        /// List of topics to unsubscribe from
        topics: Vec<String>,
    },
    /// Ping for keepalive
    Ping,
}

/// Kind of change applied to the entries table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The entries table changed
    Change {
        /// What happened
        event: ChangeKind,
        /// Id of the affected entry
        id: String,
    },
    /// Subscription confirmed
    Subscribed {
        /// Topics successfully subscribed to
        topics: Vec<String>,
    },
    /// Unsubscription confirmed
    Unsubscribed {
        /// Topics successfully unsubscribed from
        topics: Vec<String>,
    },
    /// Pong response to ping
    Pong,
    /// Error message
    Error {
        /// Error description
        message: String,
    },
    /// Connection established
    Connected {
        /// Unique connection identifier
        connection_id: String,
    },
}

/// Internal event for broadcasting through the hub
#[derive(Debug, Clone)]
pub struct WsEvent {
    /// Topic this event belongs to
    pub topic: String,
    /// The message to send to subscribers
    pub message: ServerMessage,
}

impl WsEvent {
    /// An entry change event
    pub fn change(event: ChangeKind, id: &str) -> Self {
        Self {
            topic: ENTRIES_TOPIC.to_string(),
            message: ServerMessage::Change {
                event,
                id: id.to_string(),
            },
        }
    }

    pub fn inserted(id: &str) -> Self {
        Self::change(ChangeKind::Insert, id)
    }

    pub fn deleted(id: &str) -> Self {
        Self::change(ChangeKind::Delete, id)
    }
}
