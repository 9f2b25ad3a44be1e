//! In-memory entry store
//!
//! Holds entries in process and broadcasts a change signal after every
//! successful mutation, so it doubles as a push change feed. Failure
//! switches let tests reproduce backend rejections.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use super::{sort_newest_first, EntryStore};
use crate::entries::{StoreError, StoreResult, TruckEntry};
use crate::feed::{ChangeFeed, DeliveryGate, EntriesCallback, Subscription};

/// In-process entry store. Cloning shares the same entries.
#[derive(Clone)]
pub struct MemoryEntryStore {
    inner: Arc<Inner>,
}

struct Inner {
    entries: RwLock<Vec<TruckEntry>>,
    changes: broadcast::Sender<()>,
    fail_saves: AtomicBool,
    fail_removes: AtomicBool,
    fail_fetches: AtomicBool,
}

impl MemoryEntryStore {
    pub fn new() -> Self {
        Self::with_entries(Vec::new())
    }

    /// Create a store pre-populated with entries
    pub fn with_entries(entries: Vec<TruckEntry>) -> Self {
        let (changes, _) = broadcast::channel(64);

        Self {
            inner: Arc::new(Inner {
                entries: RwLock::new(entries),
                changes,
                fail_saves: AtomicBool::new(false),
                fail_removes: AtomicBool::new(false),
                fail_fetches: AtomicBool::new(false),
            }),
        }
    }

    /// Make subsequent saves fail with a persistence error
    pub fn fail_saves(&self, fail: bool) {
        self.inner.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent removes fail with a persistence error
    pub fn fail_removes(&self, fail: bool) {
        self.inner.fail_removes.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent list calls fail with a fetch error
    pub fn fail_fetches(&self, fail: bool) {
        self.inner.fail_fetches.store(fail, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.inner.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.entries.read().await.is_empty()
    }

    fn notify(&self) {
        // No receivers just means nobody is subscribed
        let _ = self.inner.changes.send(());
    }
}

impl Default for MemoryEntryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntryStore for MemoryEntryStore {
    async fn save(&self, entry: &TruckEntry) -> StoreResult<()> {
        if self.inner.fail_saves.load(Ordering::SeqCst) {
            tracing::error!(entry_id = %entry.id, "Error saving entry: store rejected write");
            return Err(StoreError::Persistence("store rejected write".to_string()));
        }

        {
            let mut entries = self.inner.entries.write().await;
            if entries.iter().any(|e| e.id == entry.id) {
                return Err(StoreError::Persistence(format!(
                    "duplicate entry id: {}",
                    entry.id
                )));
            }
            entries.push(entry.clone());
        }

        self.notify();
        Ok(())
    }

    async fn remove(&self, id: &str) -> StoreResult<()> {
        if self.inner.fail_removes.load(Ordering::SeqCst) {
            tracing::error!(entry_id = %id, "Error deleting entry: store rejected delete");
            return Err(StoreError::Persistence("store rejected delete".to_string()));
        }

        let removed = {
            let mut entries = self.inner.entries.write().await;
            let before = entries.len();
            entries.retain(|e| e.id != id);
            before != entries.len()
        };

        if removed {
            self.notify();
        }
        Ok(())
    }

    async fn list_all(&self) -> StoreResult<Vec<TruckEntry>> {
        if self.inner.fail_fetches.load(Ordering::SeqCst) {
            tracing::error!("Error fetching entries: store unavailable");
            return Err(StoreError::Fetch("store unavailable".to_string()));
        }

        let mut entries = self.inner.entries.read().await.clone();
        sort_newest_first(&mut entries);
        Ok(entries)
    }
}

impl ChangeFeed for MemoryEntryStore {
    fn subscribe(&self, callback: EntriesCallback) -> Subscription {
        let store = self.clone();
        let mut changes = self.inner.changes.subscribe();
        let gate = DeliveryGate::open();
        let task_gate = Arc::clone(&gate);

        let task = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }

                match store.list_all().await {
                    Ok(entries) => {
                        task_gate.deliver(&callback, entries);
                    }
                    Err(e) => tracing::error!(error = %e, "Error in subscription"),
                }
            }
        });

        Subscription::new("memory", gate, task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entries::FormData;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Mutex;

    fn entry_at(truck: &str, minute: u32) -> TruckEntry {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 9, minute, 0).unwrap();
        let form = FormData {
            truck_id: truck.to_string(),
            weight: "1.0".to_string(),
            comments: String::new(),
        };
        TruckEntry::from_form(&form, start, start + Duration::seconds(45))
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_stable() {
        let store = MemoryEntryStore::new();
        store.save(&entry_at("A", 1)).await.unwrap();
        store.save(&entry_at("C", 30)).await.unwrap();
        store.save(&entry_at("B", 15)).await.unwrap();

        let first = store.list_all().await.unwrap();
        let trucks: Vec<_> = first.iter().map(|e| e.truck_id.as_str()).collect();
        assert_eq!(trucks, vec!["C", "B", "A"]);

        let second = store.list_all().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_remove_only_that_id() {
        let a = entry_at("A", 1);
        let b = entry_at("B", 2);
        let c = entry_at("C", 3);
        let store = MemoryEntryStore::with_entries(vec![a.clone(), b.clone(), c.clone()]);

        store.remove(&b.id).await.unwrap();

        let ids: Vec<_> = store.list_all().await.unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![c.id, a.id]);
    }

    #[tokio::test]
    async fn test_remove_missing_is_noop() {
        let store = MemoryEntryStore::with_entries(vec![entry_at("A", 1)]);
        store.remove("missing").await.unwrap();
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let store = MemoryEntryStore::new();
        let e = entry_at("A", 1);
        store.save(&e).await.unwrap();
        assert!(store.save(&e).await.unwrap_err().is_persistence());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_failure_switches() {
        let store = MemoryEntryStore::new();

        store.fail_saves(true);
        assert!(store.save(&entry_at("A", 1)).await.unwrap_err().is_persistence());
        assert!(store.is_empty().await);
        store.fail_saves(false);

        store.fail_fetches(true);
        assert!(store.list_all().await.unwrap_err().is_fetch());
        store.fail_fetches(false);

        store.fail_removes(true);
        assert!(store.remove("x").await.unwrap_err().is_persistence());
    }

    #[tokio::test]
    async fn test_subscription_receives_full_list() {
        let store = MemoryEntryStore::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let _sub = store.subscribe(Arc::new(move |entries: Vec<TruckEntry>| {
            let _ = tx.send(entries);
        }));

        store.save(&entry_at("A", 1)).await.unwrap();
        let first = rx.recv().await.unwrap();
        assert_eq!(first.len(), 1);

        store.save(&entry_at("B", 2)).await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].truck_id, "B");
    }

    #[tokio::test]
    async fn test_back_to_back_saves_deliver_whole_list() {
        let store = MemoryEntryStore::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let _sub = store.subscribe(Arc::new(move |entries: Vec<TruckEntry>| {
            let _ = tx.send(entries);
        }));

        store.save(&entry_at("A", 1)).await.unwrap();
        store.save(&entry_at("B", 2)).await.unwrap();

        // Each callback carries the current list, never a delta
        let mut last = Vec::new();
        while last.len() < 2 {
            last = rx.recv().await.unwrap();
        }
        assert_eq!(last.len(), 2);
        assert_eq!(last[0].truck_id, "B");
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_callbacks() {
        let store = MemoryEntryStore::new();
        let calls = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&calls);

        let sub = store.subscribe(Arc::new(move |_| {
            *counter.lock().unwrap() += 1;
        }));
        sub.unsubscribe();

        store.save(&entry_at("A", 1)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert_eq!(*calls.lock().unwrap(), 0);
    }
}
