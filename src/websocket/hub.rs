//! Change channel hub
//!
//! Tracks connected change feed clients and the topics each one listens
//! to. Mutations to the entries table are fanned out to every client on
//! the `entries` topic; clients whose channel has closed are dropped on the
//! next fan-out.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::messages::{ServerMessage, WsEvent, ENTRIES_TOPIC};

/// Unique identifier for a WebSocket connection
pub type ConnectionId = String;

type Clients = Arc<RwLock<HashMap<ConnectionId, Client>>>;

/// One connected client
struct Client {
    outbox: mpsc::UnboundedSender<ServerMessage>,
    topics: HashSet<String>,
}

/// Hub limits
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub max_connections: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections: 1000,
        }
    }
}

/// Registry of change feed clients
pub struct ConnectionHub {
    clients: Clients,
    config: HubConfig,
}

impl ConnectionHub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            clients: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Add a client. Fails once `max_connections` clients are connected.
    pub async fn register(
        &self,
        outbox: mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<ConnectionId, HubError> {
        let mut clients = self.clients.write().await;
        if clients.len() >= self.config.max_connections {
            return Err(HubError::TooManyConnections(self.config.max_connections));
        }

        let id = Uuid::new_v4().to_string();
        clients.insert(
            id.clone(),
            Client {
                outbox,
                topics: HashSet::new(),
            },
        );

        tracing::info!(
            connection_id = %id,
            clients = clients.len(),
            "Change feed client connected"
        );
        Ok(id)
    }

    pub async fn unregister(&self, id: &str) {
        if self.clients.write().await.remove(id).is_some() {
            tracing::info!(connection_id = %id, "Change feed client disconnected");
        }
    }

    /// Add topics to a client; unknown topics are skipped.
    ///
    /// Returns the topics actually accepted.
    pub async fn subscribe(&self, id: &str, topics: Vec<String>) -> Result<Vec<String>, HubError> {
        let mut clients = self.clients.write().await;
        let client = clients.get_mut(id).ok_or(HubError::ConnectionNotFound)?;

        let (accepted, rejected): (Vec<String>, Vec<String>) =
            topics.into_iter().partition(|t| is_valid_topic(t));
        if !rejected.is_empty() {
            tracing::warn!(connection_id = %id, topics = ?rejected, "Unknown topics ignored");
        }

        client.topics.extend(accepted.iter().cloned());
        tracing::debug!(connection_id = %id, topics = ?accepted, "Subscribed");
        Ok(accepted)
    }

    /// Remove topics from a client. Returns the topics it was listening to.
    pub async fn unsubscribe(
        &self,
        id: &str,
        topics: Vec<String>,
    ) -> Result<Vec<String>, HubError> {
        let mut clients = self.clients.write().await;
        let client = clients.get_mut(id).ok_or(HubError::ConnectionNotFound)?;

        let removed: Vec<String> = topics
            .into_iter()
            .filter(|t| client.topics.remove(t))
            .collect();

        tracing::debug!(connection_id = %id, topics = ?removed, "Unsubscribed");
        Ok(removed)
    }

    /// Queue an event for every client on its topic.
    ///
    /// Returns how many clients it was queued for.
    pub async fn broadcast(&self, event: &WsEvent) -> usize {
        fan_out(&self.clients, event).await
    }

    /// Fire-and-forget [`broadcast`](Self::broadcast) for request handlers
    pub fn publish(&self, event: WsEvent) {
        let clients = Arc::clone(&self.clients);
        tokio::spawn(async move {
            fan_out(&clients, &event).await;
        });
    }

    /// Send a reply to one client
    pub async fn send_to(&self, id: &str, message: ServerMessage) -> Result<(), HubError> {
        let clients = self.clients.read().await;
        let client = clients.get(id).ok_or(HubError::ConnectionNotFound)?;

        client.outbox.send(message).map_err(|_| HubError::SendFailed)
    }

    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Number of clients listening to `topic`
    pub async fn subscription_count(&self, topic: &str) -> usize {
        self.clients
            .read()
            .await
            .values()
            .filter(|c| c.topics.contains(topic))
            .count()
    }
}

/// Topics a client may listen to
pub fn is_valid_topic(topic: &str) -> bool {
    topic == ENTRIES_TOPIC
}

async fn fan_out(clients: &Clients, event: &WsEvent) -> usize {
    let mut delivered = 0;
    let mut closed = Vec::new();

    {
        let clients = clients.read().await;
        for (id, client) in clients.iter().filter(|(_, c)| c.topics.contains(&event.topic)) {
            if client.outbox.send(event.message.clone()).is_ok() {
                delivered += 1;
            } else {
                closed.push(id.clone());
            }
        }
    }

    if !closed.is_empty() {
        let mut clients = clients.write().await;
        for id in &closed {
            clients.remove(id);
        }
        tracing::debug!(dropped = closed.len(), "Pruned closed change feed clients");
    }

    tracing::trace!(topic = %event.topic, delivered, "Fanned out event");
    delivered
}

/// Errors that can occur in the connection hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Too many connections (limit: {0})")]
    TooManyConnections(usize),

    #[error("Connection not found")]
    ConnectionNotFound,

    #[error("Failed to send message")]
    SendFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topics(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_valid_topics() {
        assert!(is_valid_topic("entries"));
        assert!(!is_valid_topic("system"));
        assert!(!is_valid_topic("entries.*"));
        assert!(!is_valid_topic(""));
    }

    #[tokio::test]
    async fn test_register_unregister() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();

        let id = hub.register(tx).await.unwrap();
        assert_eq!(hub.connection_count().await, 1);

        hub.unregister(&id).await;
        hub.unregister(&id).await;
        assert_eq!(hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_subscribe_filters_unknown_topics() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = hub.register(tx).await.unwrap();

        let accepted = hub.subscribe(&id, topics(&["entries", "bogus"])).await.unwrap();
        assert_eq!(accepted, vec!["entries"]);
        assert_eq!(hub.subscription_count(ENTRIES_TOPIC).await, 1);

        let removed = hub.unsubscribe(&id, topics(&["entries", "bogus"])).await.unwrap();
        assert_eq!(removed, vec!["entries"]);
        assert_eq!(hub.subscription_count(ENTRIES_TOPIC).await, 0);
    }

    #[tokio::test]
    async fn test_unknown_connection() {
        let hub = ConnectionHub::new(HubConfig::default());
        assert!(matches!(
            hub.subscribe("nope", topics(&["entries"])).await,
            Err(HubError::ConnectionNotFound)
        ));
        assert!(matches!(
            hub.send_to("nope", ServerMessage::Pong).await,
            Err(HubError::ConnectionNotFound)
        ));
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let hub = ConnectionHub::new(HubConfig { max_connections: 2 });

        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        let (tx3, _rx3) = mpsc::unbounded_channel();

        hub.register(tx1).await.unwrap();
        hub.register(tx2).await.unwrap();
        assert!(matches!(
            hub.register(tx3).await,
            Err(HubError::TooManyConnections(2))
        ));
    }

    #[tokio::test]
    async fn test_change_reaches_only_entries_listeners() {
        let hub = ConnectionHub::new(HubConfig::default());

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let id1 = hub.register(tx1).await.unwrap();
        hub.register(tx2).await.unwrap();
        hub.subscribe(&id1, topics(&["entries"])).await.unwrap();

        assert_eq!(hub.broadcast(&WsEvent::inserted("e-1")).await, 1);
        assert!(matches!(rx1.try_recv(), Ok(ServerMessage::Change { .. })));
        assert!(rx2.try_recv().is_err());

        assert_eq!(hub.broadcast(&WsEvent::deleted("e-1")).await, 1);
        assert!(matches!(rx1.try_recv(), Ok(ServerMessage::Change { .. })));
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_clients_are_pruned() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let id = hub.register(tx).await.unwrap();
        hub.subscribe(&id, topics(&["entries"])).await.unwrap();

        drop(rx);
        assert_eq!(hub.broadcast(&WsEvent::deleted("e-1")).await, 0);
        assert_eq!(hub.connection_count().await, 0);
    }
}
