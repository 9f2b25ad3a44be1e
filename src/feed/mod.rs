//! Change Feeds
//!
//! A change feed tells the client that the stored entry set changed. Every
//! notification triggers a full re-fetch, and the callback receives the
//! whole list. There is no incremental diff.
//!
//! ## Implementations
//!
//! - **PollingFeed**: re-fetches on a fixed interval
//! - **WebSocketFeed**: re-fetches whenever the backend pushes a change event
//! - **MemoryEntryStore**: re-fetches after its own mutations
//!
//! ## Lifecycle
//!
//! `subscribe` returns a [`Subscription`]. Dropping it, or calling
//! [`Subscription::unsubscribe`], stops further callbacks before returning
//! and releases the underlying timer or socket exactly once. A callback
//! already running on another thread is waited for, so a callback must not
//! release its own subscription.

mod polling;
mod push;

pub use polling::{PollingFeed, DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL};
pub use push::{websocket_url, WebSocketFeed};

use std::sync::{Arc, RwLock};
use tokio::task::JoinHandle;

use crate::entries::TruckEntry;

/// Callback invoked with the full refreshed entry list
pub type EntriesCallback = Arc<dyn Fn(Vec<TruckEntry>) + Send + Sync>;

/// Common trait for all change feeds
pub trait ChangeFeed: Send + Sync {
    /// Register a callback. Each call creates an independent subscription.
    fn subscribe(&self, callback: EntriesCallback) -> Subscription;
}

/// Open/closed switch shared by a subscription and its background task.
///
/// Callbacks run under the read lock; closing takes the write lock, so it
/// returns only once no callback is in flight.
#[derive(Debug)]
pub struct DeliveryGate {
    open: RwLock<bool>,
}

impl DeliveryGate {
    pub fn open() -> Arc<Self> {
        Arc::new(Self {
            open: RwLock::new(true),
        })
    }

    pub fn is_open(&self) -> bool {
        *self.open.read().unwrap_or_else(|p| p.into_inner())
    }

    /// Invoke the callback unless the gate has been closed
    pub fn deliver(&self, callback: &EntriesCallback, entries: Vec<TruckEntry>) -> bool {
        let open = self.open.read().unwrap_or_else(|p| p.into_inner());
        if *open {
            callback(entries);
        }
        *open
    }

    fn close(&self) {
        *self.open.write().unwrap_or_else(|p| p.into_inner()) = false;
    }
}

/// Handle for an active subscription
pub struct Subscription {
    source: &'static str,
    gate: Arc<DeliveryGate>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Wrap a background task that delivers through `gate`
    pub fn new(source: &'static str, gate: Arc<DeliveryGate>, task: JoinHandle<()>) -> Self {
        tracing::debug!(feed = source, "Subscribed to entry changes");
        Self {
            source,
            gate,
            task: Some(task),
        }
    }

    pub fn is_active(&self) -> bool {
        self.gate.is_open()
    }

    /// Stop callbacks and release the feed's resources
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(task) = self.task.take() {
            self.gate.close();
            task.abort();
            tracing::debug!(feed = self.source, "Unsubscribed from entry changes");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("source", &self.source)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[tokio::test]
    async fn test_release_is_once_and_stops_delivery() {
        let gate = DeliveryGate::open();
        let task = tokio::spawn(std::future::pending::<()>());
        let mut sub = Subscription::new("test", Arc::clone(&gate), task);
        assert!(sub.is_active());

        sub.release();
        assert!(!sub.is_active());
        assert!(sub.task.is_none());

        // Second release (via drop) is a no-op
        drop(sub);

        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let callback: EntriesCallback = Arc::new(move |_| *counter.lock().unwrap() += 1);
        assert!(!gate.deliver(&callback, Vec::new()));
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_drop_aborts_task() {
        let gate = DeliveryGate::open();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let _tx = tx;
            std::future::pending::<()>().await;
        });

        drop(Subscription::new("test", Arc::clone(&gate), task));

        // The sender is dropped when the aborted task is torn down
        assert!(rx.await.is_err());
        assert!(!gate.is_open());
    }

    #[tokio::test]
    async fn test_unsubscribe_waits_for_running_callback() {
        let gate = DeliveryGate::open();
        let started = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));

        let (s, f) = (Arc::clone(&started), Arc::clone(&finished));
        let callback: EntriesCallback = Arc::new(move |_| {
            s.store(true, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(100));
            f.store(true, Ordering::SeqCst);
        });

        let worker_gate = Arc::clone(&gate);
        let worker = std::thread::spawn(move || worker_gate.deliver(&callback, Vec::new()));
        while !started.load(Ordering::SeqCst) {
            std::thread::yield_now();
        }

        let task = tokio::spawn(std::future::pending::<()>());
        Subscription::new("test", Arc::clone(&gate), task).unsubscribe();

        assert!(finished.load(Ordering::SeqCst));
        assert!(worker.join().unwrap());
    }
}
