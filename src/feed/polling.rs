//! Polling change feed
//!
//! Re-fetches the full list on a fixed interval. The first fetch happens one
//! interval after subscribing; the caller is expected to have loaded the
//! list once already.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::{ChangeFeed, DeliveryGate, EntriesCallback, Subscription};
use crate::store::EntryStore;

/// Default polling interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Shortest accepted polling interval
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Change feed that polls `list_all`
pub struct PollingFeed {
    store: Arc<dyn EntryStore>,
    interval: Duration,
}

impl PollingFeed {
    /// Intervals below [`MIN_POLL_INTERVAL`] are raised to it.
    pub fn new(store: Arc<dyn EntryStore>, interval: Duration) -> Self {
        if interval < MIN_POLL_INTERVAL {
            tracing::warn!(
                requested_ms = interval.as_millis() as u64,
                "Poll interval too short, using {}ms",
                MIN_POLL_INTERVAL.as_millis()
            );
        }

        Self {
            store,
            interval: interval.max(MIN_POLL_INTERVAL),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl ChangeFeed for PollingFeed {
    fn subscribe(&self, callback: EntriesCallback) -> Subscription {
        let store = Arc::clone(&self.store);
        let period = self.interval;
        let gate = DeliveryGate::open();
        let task_gate = Arc::clone(&gate);

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                match store.list_all().await {
                    Ok(entries) => {
                        task_gate.deliver(&callback, entries);
                    }
                    Err(e) => tracing::error!(error = %e, "Error polling entries"),
                }
            }
        });

        Subscription::new("polling", gate, task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entries::{FormData, TruckEntry};
    use crate::store::MemoryEntryStore;
    use chrono::Utc;
    use std::sync::Mutex;

    fn sample() -> TruckEntry {
        let now = Utc::now();
        TruckEntry::from_form(&FormData::default(), now, now)
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_on_interval() {
        let store = MemoryEntryStore::with_entries(vec![sample()]);
        let feed = PollingFeed::new(Arc::new(store), Duration::from_secs(2));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = feed.subscribe(Arc::new(move |entries| {
            sink.lock().unwrap().push(entries.len());
        }));

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert!(seen.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(4200)).await;
        assert_eq!(*seen.lock().unwrap(), vec![1, 1, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_raised_and_still_polls() {
        let store = MemoryEntryStore::with_entries(vec![sample()]);
        let feed = PollingFeed::new(Arc::new(store), Duration::ZERO);
        assert_eq!(feed.interval(), MIN_POLL_INTERVAL);

        let seen = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&seen);
        let sub = feed.subscribe(Arc::new(move |_| *sink.lock().unwrap() += 1));

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(*seen.lock().unwrap(), 3);
        assert!(sub.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_errors_are_skipped() {
        let store = MemoryEntryStore::with_entries(vec![sample()]);
        store.fail_fetches(true);
        let feed = PollingFeed::new(Arc::new(store.clone()), Duration::from_secs(1));

        let seen = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&seen);
        let _sub = feed.subscribe(Arc::new(move |_| *sink.lock().unwrap() += 1));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(*seen.lock().unwrap(), 0);

        store.fail_fetches(false);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsubscribe_stops_polling() {
        let store = MemoryEntryStore::new();
        let feed = PollingFeed::new(Arc::new(store), Duration::from_secs(1));

        let seen = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&seen);
        let sub = feed.subscribe(Arc::new(move |_| *sink.lock().unwrap() += 1));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(*seen.lock().unwrap(), 1);

        sub.unsubscribe();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscriptions_are_independent() {
        let feed = PollingFeed::new(Arc::new(MemoryEntryStore::new()), Duration::from_secs(1));

        let a = Arc::new(Mutex::new(0));
        let b = Arc::new(Mutex::new(0));
        let (sa, sb) = (Arc::clone(&a), Arc::clone(&b));
        let sub_a = feed.subscribe(Arc::new(move |_| *sa.lock().unwrap() += 1));
        let _sub_b = feed.subscribe(Arc::new(move |_| *sb.lock().unwrap() += 1));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        drop(sub_a);
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(*a.lock().unwrap(), 1);
        assert_eq!(*b.lock().unwrap(), 3);
    }
}
