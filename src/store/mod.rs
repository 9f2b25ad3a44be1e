//! Entry Store Client
//!
//! Create/read/delete access to the remote entries table.
//!
//! - **HttpEntryStore**: REST client for a backend exposing `/entries`
//! - **MemoryEntryStore**: in-process store for tests and offline use; also a
//!   push change feed of its own mutations
//!
//! Callers hold an `Arc<dyn EntryStore>` and never know which one they got.

mod http;
mod memory;

pub use http::{HttpEntryStore, HttpStoreConfig};
pub use memory::MemoryEntryStore;

use async_trait::async_trait;

use crate::entries::{StoreResult, TruckEntry};

/// Common trait for all entry stores
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Persist a complete entry.
    ///
    /// On `Err` the caller must not assume the entry was stored.
    async fn save(&self, entry: &TruckEntry) -> StoreResult<()>;

    /// Delete the entry with the given id. Unknown ids are not an error.
    async fn remove(&self, id: &str) -> StoreResult<()>;

    /// Full current set of entries, newest `start_time` first
    async fn list_all(&self) -> StoreResult<Vec<TruckEntry>>;
}

/// Sort newest first. Stable, so equal start times keep backend order.
pub(crate) fn sort_newest_first(entries: &mut [TruckEntry]) {
    entries.sort_by(|a, b| b.start_time.cmp(&a.start_time));
}
