//! Application shell
//!
//! Owns the session state machine and the displayed entry list:
//!
//! ```text
//!   Idle --start--> Running{start_time} --stop(save ok)--> Idle
//!                        |
//!                        +--stop(save failed)--> Running{same start_time}
//! ```
//!
//! The list is replaced wholesale by whichever arrives last: the initial
//! fetch, a manual refresh, or a change feed callback.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

use super::timer::format_elapsed;
use crate::entries::{FormData, FormField, StoreError, TruckEntry};
use crate::export::{export_entries, ExportError, ExportFormat, ExportZone};
use crate::feed::{ChangeFeed, EntriesCallback, Subscription};
use crate::store::EntryStore;

/// Shown when the entry list cannot be loaded
pub const LOAD_ERROR: &str = "Unable to load entries. Please try again later.";
/// Shown when stopping a session fails to persist the entry
pub const SAVE_ERROR: &str = "Failed to save entry. Please try again.";
/// Shown when a confirmed delete fails
pub const DELETE_ERROR: &str = "Failed to delete entry. Please try again.";

/// Errors returned by shell operations
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("A session is already running")]
    AlreadyRunning,

    #[error("No session is running")]
    NotRunning,

    #[error("No delete is awaiting confirmation")]
    NoPendingDelete,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

/// At most one session is open at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Running { start_time: DateTime<Utc> },
}

impl SessionState {
    pub fn is_running(&self) -> bool {
        matches!(self, SessionState::Running { .. })
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        match self {
            SessionState::Running { start_time } => Some(*start_time),
            SessionState::Idle => None,
        }
    }
}

/// Session screen state and its operations
pub struct AppShell {
    store: Arc<dyn EntryStore>,
    entries: Arc<RwLock<Vec<TruckEntry>>>,
    form: FormData,
    state: SessionState,
    loading: bool,
    error: Option<String>,
    pending_delete: Option<String>,
    subscription: Option<Subscription>,
    listener: Option<EntriesCallback>,
    zone: ExportZone,
}

impl AppShell {
    pub fn new(store: Arc<dyn EntryStore>) -> Self {
        Self {
            store,
            entries: Arc::new(RwLock::new(Vec::new())),
            form: FormData::default(),
            state: SessionState::Idle,
            loading: false,
            error: None,
            pending_delete: None,
            subscription: None,
            listener: None,
            zone: ExportZone::default(),
        }
    }

    /// Time zone used for exported dates and times
    pub fn with_export_zone(mut self, zone: ExportZone) -> Self {
        self.zone = zone;
        self
    }

    /// Called with the new list after every feed-driven replacement.
    ///
    /// Must be set before [`mount`](Self::mount) to take effect.
    pub fn on_entries_changed(&mut self, listener: EntriesCallback) {
        self.listener = Some(listener);
    }

    /// Load the list once, then follow the change feed.
    ///
    /// A failed initial load sets the error banner but still subscribes,
    /// so the list fills in on the next change. Mounting again replaces
    /// the previous subscription.
    pub async fn mount(&mut self, feed: &dyn ChangeFeed) {
        self.unmount();

        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "Initial entry load failed");
        }

        let entries = Arc::clone(&self.entries);
        let listener = self.listener.clone();
        let callback: EntriesCallback = Arc::new(move |updated: Vec<TruckEntry>| {
            *write_list(&entries) = updated.clone();
            if let Some(listener) = &listener {
                listener(updated);
            }
        });

        self.subscription = Some(feed.subscribe(callback));
    }

    /// Release the change feed subscription. Safe to call repeatedly.
    pub fn unmount(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    /// Re-fetch the full list and replace the displayed one
    pub async fn refresh(&mut self) -> Result<usize, ShellError> {
        self.loading = true;
        self.error = None;

        let result = self.store.list_all().await;
        self.loading = false;

        match result {
            Ok(entries) => {
                let count = entries.len();
                *write_list(&self.entries) = entries;
                Ok(count)
            }
            Err(e) => {
                tracing::error!(error = %e, "Error fetching entries");
                self.error = Some(LOAD_ERROR.to_string());
                Err(e.into())
            }
        }
    }

    /// Open a session now
    pub fn start(&mut self) -> Result<DateTime<Utc>, ShellError> {
        self.start_at(Utc::now())
    }

    /// Open a session at an explicit instant
    pub fn start_at(&mut self, start_time: DateTime<Utc>) -> Result<DateTime<Utc>, ShellError> {
        if self.state.is_running() {
            return Err(ShellError::AlreadyRunning);
        }

        self.state = SessionState::Running { start_time };
        self.error = None;
        tracing::info!(start_time = %start_time, "Session started");
        Ok(start_time)
    }

    /// Close the session now and persist it
    pub async fn stop(&mut self) -> Result<TruckEntry, ShellError> {
        self.stop_at(Utc::now()).await
    }

    /// Close the session at an explicit instant and persist it.
    ///
    /// On success the form is cleared and the shell returns to idle. On
    /// failure the session keeps running with the same start time and the
    /// form is left as typed, so stopping again retries.
    pub async fn stop_at(&mut self, stop_time: DateTime<Utc>) -> Result<TruckEntry, ShellError> {
        let start_time = self.state.start_time().ok_or(ShellError::NotRunning)?;

        self.loading = true;
        self.error = None;

        let entry = TruckEntry::from_form(&self.form, start_time, stop_time);
        let result = self.store.save(&entry).await;
        self.loading = false;

        match result {
            Ok(()) => {
                tracing::info!(
                    entry_id = %entry.id,
                    truck_id = %entry.truck_id,
                    weight = entry.weight,
                    "Session stopped and saved"
                );
                self.form.clear();
                self.state = SessionState::Idle;
                Ok(entry)
            }
            Err(e) => {
                tracing::error!(error = %e, "Error saving entry");
                self.error = Some(SAVE_ERROR.to_string());
                Err(e.into())
            }
        }
    }

    /// Update one form field. Allowed in any state.
    pub fn edit(&mut self, field: FormField, value: impl Into<String>) {
        self.form.set(field, value);
        self.error = None;
    }

    /// Ask for confirmation before deleting `id`
    pub fn request_delete(&mut self, id: impl Into<String>) {
        self.pending_delete = Some(id.into());
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    pub fn pending_delete(&self) -> Option<&str> {
        self.pending_delete.as_deref()
    }

    /// Delete the entry awaiting confirmation.
    ///
    /// The confirmation closes whether or not the delete succeeds. The
    /// displayed list is only updated by the change feed.
    pub async fn confirm_delete(&mut self) -> Result<String, ShellError> {
        let id = self.pending_delete.take().ok_or(ShellError::NoPendingDelete)?;

        match self.store.remove(&id).await {
            Ok(()) => {
                tracing::info!(entry_id = %id, "Entry deleted");
                Ok(id)
            }
            Err(e) => {
                tracing::error!(entry_id = %id, error = %e, "Error deleting entry");
                self.error = Some(DELETE_ERROR.to_string());
                Err(e.into())
            }
        }
    }

    /// Write the currently displayed entries to `dir`
    pub fn export(&self, dir: &Path, format: ExportFormat) -> Result<PathBuf, ShellError> {
        let entries = self.entries();
        Ok(export_entries(&entries, dir, format, self.zone)?)
    }

    /// Formatted elapsed time of the running session
    pub fn elapsed(&self, now: DateTime<Utc>) -> String {
        format_elapsed(self.state.start_time(), self.state.is_running(), now)
    }

    /// Snapshot of the displayed list
    pub fn entries(&self) -> Vec<TruckEntry> {
        read_list(&self.entries).clone()
    }

    pub fn form(&self) -> &FormData {
        &self.form
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn export_zone(&self) -> ExportZone {
        self.zone
    }
}

impl Drop for AppShell {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn read_list(list: &RwLock<Vec<TruckEntry>>) -> RwLockReadGuard<'_, Vec<TruckEntry>> {
    list.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_list(list: &RwLock<Vec<TruckEntry>>) -> RwLockWriteGuard<'_, Vec<TruckEntry>> {
    list.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
