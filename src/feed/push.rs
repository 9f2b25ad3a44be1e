//! WebSocket change feed
//!
//! Connects to the backend's `/ws` endpoint, subscribes to the `entries`
//! topic and re-fetches the full list through the store on every `change`
//! event. Dropped connections are re-established after a fixed delay; a
//! reconnect also triggers a re-fetch since events may have been missed.

use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::{ChangeFeed, DeliveryGate, EntriesCallback, Subscription};
use crate::store::EntryStore;
use crate::websocket::{ClientMessage, ServerMessage, ENTRIES_TOPIC};

/// Default delay between reconnection attempts
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Push-based change feed over WebSocket
pub struct WebSocketFeed {
    store: Arc<dyn EntryStore>,
    url: String,
    reconnect_delay: Duration,
}

impl WebSocketFeed {
    /// `url` is the full WebSocket URL (see [`websocket_url`])
    pub fn new(store: Arc<dyn EntryStore>, url: impl Into<String>) -> Self {
        Self {
            store,
            url: url.into(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Derive the change feed URL from the backend's HTTP base URL
pub fn websocket_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };
    format!("{}/ws", base)
}

impl ChangeFeed for WebSocketFeed {
    fn subscribe(&self, callback: EntriesCallback) -> Subscription {
        let store = Arc::clone(&self.store);
        let url = self.url.clone();
        let delay = self.reconnect_delay;
        let gate = DeliveryGate::open();
        let task_gate = Arc::clone(&gate);

        let task = tokio::spawn(async move {
            let mut connected_before = false;

            while task_gate.is_open() {
                let outcome =
                    run_connection(&url, &store, &task_gate, &callback, connected_before).await;
                match outcome {
                    Ok(()) => tracing::info!(url = %url, "Change feed closed by server"),
                    Err(e) => {
                        tracing::warn!(url = %url, error = %e, "Change feed connection failed")
                    }
                }
                connected_before = true;
                tokio::time::sleep(delay).await;
            }
        });

        Subscription::new("websocket", gate, task)
    }
}

/// Drive one connection until it closes
async fn run_connection(
    url: &str,
    store: &Arc<dyn EntryStore>,
    gate: &DeliveryGate,
    callback: &EntriesCallback,
    refresh_on_connect: bool,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let (stream, _) = connect_async(url).await?;
    let (mut sender, mut receiver) = stream.split();

    let subscribe = ClientMessage::Subscribe {
        topics: vec![ENTRIES_TOPIC.to_string()],
    };
    match serde_json::to_string(&subscribe) {
        Ok(text) => sender.send(Message::Text(text)).await?,
        Err(e) => tracing::error!(error = %e, "Failed to serialize subscribe message"),
    }

    if refresh_on_connect {
        refresh(store, gate, callback).await;
    }

    while let Some(message) = receiver.next().await {
        match message? {
            Message::Text(text) => match serde_json::from_str::<ServerMessage>(&text) {
                Ok(ServerMessage::Change { event, id }) => {
                    tracing::debug!(event = ?event, entry_id = %id, "Entry change received");
                    refresh(store, gate, callback).await;
                }
                Ok(ServerMessage::Error { message }) => {
                    tracing::warn!(message = %message, "Change feed error from server");
                }
                Ok(other) => tracing::trace!(message = ?other, "Change feed message"),
                Err(e) => {
                    tracing::debug!(error = %e, text = %text, "Unrecognized change feed message")
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    Ok(())
}

async fn refresh(store: &Arc<dyn EntryStore>, gate: &DeliveryGate, callback: &EntriesCallback) {
    match store.list_all().await {
        Ok(entries) => {
            gate.deliver(callback, entries);
        }
        Err(e) => tracing::error!(error = %e, "Error in subscription"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{build_router, AppState, EntryRepository};
    use crate::entries::{FormData, TruckEntry};
    use crate::store::{HttpEntryStore, HttpStoreConfig};
    use chrono::Utc;

    #[test]
    fn test_websocket_url() {
        assert_eq!(websocket_url("http://localhost:3001"), "ws://localhost:3001/ws");
        assert_eq!(websocket_url("https://example.com/"), "wss://example.com/ws");
        assert_eq!(websocket_url("ws://host:1"), "ws://host:1/ws");
    }

    #[tokio::test]
    async fn test_push_feed_end_to_end() {
        let repo = std::sync::Arc::new(EntryRepository::in_memory().unwrap());
        let state = AppState::new(repo, Default::default());
        let hub = std::sync::Arc::clone(&state.ws_hub);
        let router = build_router(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let base = format!("http://{}", addr);
        let store: Arc<dyn EntryStore> = Arc::new(
            HttpEntryStore::new(HttpStoreConfig {
                base_url: base.clone(),
                ..Default::default()
            })
            .unwrap(),
        );

        let feed = WebSocketFeed::new(Arc::clone(&store), websocket_url(&base));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let sub = feed.subscribe(Arc::new(move |entries: Vec<TruckEntry>| {
            let _ = tx.send(entries);
        }));

        // Wait until the feed has subscribed to the entries topic
        for _ in 0..100 {
            if hub.subscription_count(ENTRIES_TOPIC).await == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(hub.subscription_count(ENTRIES_TOPIC).await, 1);

        let now = Utc::now();
        let entry = TruckEntry::from_form(&FormData::default(), now, now);
        store.save(&entry).await.unwrap();

        let pushed = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0].id, entry.id);

        sub.unsubscribe();
    }
}
