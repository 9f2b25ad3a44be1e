//! Entry Repository - SQLite-backed entries table
//!
//! The authoritative copy of every entry. Columns mirror the wire format:
//! `id, truck_id, weight, comments, start_time, stop_time`. Timestamps are
//! stored as fixed-width RFC 3339 UTC text so that ordering by the column
//! is chronological.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

use crate::entries::TruckEntry;

/// Errors raised by the entries table
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// An entry with this id already exists
    #[error("Entry already exists: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored row could not be decoded
    #[error("Invalid row: {0}")]
    InvalidRow(String),

    #[error("Lock error: {0}")]
    Lock(String),
}

/// SQLite entries table
pub struct EntryRepository {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl EntryRepository {
    /// Create or open the database file
    pub fn open(path: &Path) -> Result<Self, RepositoryError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Private in-memory database (tests, demos)
    pub fn in_memory() -> Result<Self, RepositoryError> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self, RepositoryError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS entries (
                id TEXT PRIMARY KEY NOT NULL,
                truck_id TEXT NOT NULL,
                weight REAL NOT NULL,
                comments TEXT NOT NULL DEFAULT '',
                start_time TEXT NOT NULL,
                stop_time TEXT
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_entries_start_time ON entries(start_time)",
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Path of the database file, `None` for in-memory
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, RepositoryError> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::Lock(e.to_string()))
    }

    /// Insert one entry; duplicate ids are rejected
    pub fn insert(&self, entry: &TruckEntry) -> Result<(), RepositoryError> {
        let conn = self.lock()?;
        let result = conn.execute(
            "INSERT INTO entries (id, truck_id, weight, comments, start_time, stop_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.id,
                entry.truck_id,
                entry.weight,
                entry.comments,
                encode_time(&entry.start_time),
                entry.stop_time.as_ref().map(encode_time),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(RepositoryError::Duplicate(entry.id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete by id. Returns whether a row was removed.
    pub fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM entries WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    /// All entries, newest start time first
    pub fn list(&self) -> Result<Vec<TruckEntry>, RepositoryError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, truck_id, weight, comments, start_time, stop_time
             FROM entries
             ORDER BY start_time DESC, rowid ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(RawRow {
                id: row.get(0)?,
                truck_id: row.get(1)?,
                weight: row.get(2)?,
                comments: row.get(3)?,
                start_time: row.get(4)?,
                stop_time: row.get(5)?,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.into_entry()?);
        }
        Ok(entries)
    }

    /// Look up a single entry
    pub fn get(&self, id: &str) -> Result<Option<TruckEntry>, RepositoryError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT id, truck_id, weight, comments, start_time, stop_time
                 FROM entries WHERE id = ?1",
                params![id],
                |row| {
                    Ok(RawRow {
                        id: row.get(0)?,
                        truck_id: row.get(1)?,
                        weight: row.get(2)?,
                        comments: row.get(3)?,
                        start_time: row.get(4)?,
                        stop_time: row.get(5)?,
                    })
                },
            )
            .optional()?;

        row.map(RawRow::into_entry).transpose()
    }

    pub fn count(&self) -> Result<usize, RepositoryError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

struct RawRow {
    id: String,
    truck_id: String,
    weight: f64,
    comments: String,
    start_time: String,
    stop_time: Option<String>,
}

impl RawRow {
    fn into_entry(self) -> Result<TruckEntry, RepositoryError> {
        let start_time = decode_time(&self.start_time)?;
        let stop_time = self.stop_time.as_deref().map(decode_time).transpose()?;

        Ok(TruckEntry {
            id: self.id,
            truck_id: self.truck_id,
            weight: self.weight,
            comments: self.comments,
            start_time,
            stop_time,
        })
    }
}

fn encode_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_time(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::InvalidRow(format!("bad timestamp {:?}: {}", s, e)))
}
