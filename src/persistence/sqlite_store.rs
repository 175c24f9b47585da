//! Relational backend on SQLite.
//!
//! Schema: a single `messages` table indexed by topic. Timestamps are text;
//! see [`super::timestamp`] for the formats accepted on read.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, params};
use tracing::debug;

use super::{HistoryRecord, MessageStore, timestamp};
use crate::utils::StoreError;

#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::with_connection(conn)
    }

    /// A private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Insert a row with an already-encoded timestamp, as an older writer
    /// would have left it.
    #[cfg(test)]
    pub(crate) fn insert_raw(&self, topic: &str, content: &str, ts: &str) -> Result<(), StoreError> {
        self.conn()?.execute(
            "INSERT INTO messages (topic, content, timestamp) VALUES (?1, ?2, ?3)",
            params![topic, content, ts],
        )?;
        Ok(())
    }
}

fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            topic TEXT NOT NULL,
            content TEXT NOT NULL,
            timestamp TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_messages_topic ON messages(topic)",
        [],
    )?;
    Ok(())
}

fn read_timestamp(value: ValueRef<'_>) -> Result<DateTime<Utc>, StoreError> {
    match value {
        ValueRef::Text(bytes) => timestamp::decode(&String::from_utf8_lossy(bytes)),
        ValueRef::Integer(secs) => timestamp::decode(&secs.to_string()),
        other => Err(StoreError::Timestamp(format!("{other:?}"))),
    }
}

impl MessageStore for SqliteStore {
    fn append(&self, topic: &str, envelope: &str) -> Result<(), StoreError> {
        let now = timestamp::encode(Utc::now());
        self.conn()?.execute(
            "INSERT INTO messages (topic, content, timestamp) VALUES (?1, ?2, ?3)",
            params![topic, envelope, now],
        )?;
        debug!("Message saved to database for topic: {topic}");
        Ok(())
    }

    fn history(&self, topic: &str) -> Result<Vec<HistoryRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT topic, content, timestamp FROM messages WHERE topic = ?1 ORDER BY id ASC",
        )?;

        let mut rows = stmt.query(params![topic])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let topic: String = row.get(0)?;
            let content: String = row.get(1)?;
            let at = read_timestamp(row.get_ref(2)?)?;
            records.push(HistoryRecord::stamped(topic, content, at));
        }

        // Stable: rows with equal timestamps keep insertion order.
        records.sort_by_key(|record| record.timestamp);
        Ok(records)
    }
}
