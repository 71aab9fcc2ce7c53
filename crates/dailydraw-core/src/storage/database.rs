//! SQLite-backed key-value store.
//!
//! Holds the only durable state of the coordinator:
//! - the absolute deadline of the active cycle (epoch milliseconds)
//! - the notification history (JSON)

use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection};

use super::data_dir;
use crate::broadcast::Notification;
use crate::error::StorageError;

pub const DEADLINE_KEY: &str = "draw.deadline_ms";
pub const HISTORY_KEY: &str = "notifications.history";

/// Durable anchor of the active cycle.
pub trait DeadlineStore: Send {
    fn load_deadline(&self) -> Result<Option<DateTime<Utc>>, StorageError>;
    fn save_deadline(&self, deadline: DateTime<Utc>) -> Result<(), StorageError>;
}

/// Durable copy of the broadcaster's history.
pub trait HistoryStore: Send {
    fn load_history(&self) -> Result<Vec<Notification>, StorageError>;
    fn save_history(&self, history: &[Notification]) -> Result<(), StorageError>;
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data dir>/dailydraw.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory or the database cannot be opened.
    pub fn open() -> Result<Self, StorageError> {
        let path = data_dir()?.join("dailydraw.db");
        Self::open_at(&path)
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (tests and dry runs).
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

impl DeadlineStore for Database {
    fn load_deadline(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        let Some(raw) = self.kv_get(DEADLINE_KEY)? else {
            return Ok(None);
        };
        let corrupted = |message: String| StorageError::Corrupted {
            key: DEADLINE_KEY.into(),
            message,
        };
        let ms: i64 = raw.trim().parse().map_err(|e| corrupted(format!("{e}")))?;
        Utc.timestamp_millis_opt(ms)
            .single()
            .map(Some)
            .ok_or_else(|| corrupted(format!("{ms} is out of range")))
    }

    fn save_deadline(&self, deadline: DateTime<Utc>) -> Result<(), StorageError> {
        self.kv_set(DEADLINE_KEY, &deadline.timestamp_millis().to_string())?;
        Ok(())
    }
}

impl HistoryStore for Database {
    fn load_history(&self) -> Result<Vec<Notification>, StorageError> {
        match self.kv_get(HISTORY_KEY)? {
            Some(json) => serde_json::from_str(&json).map_err(|e| StorageError::Corrupted {
                key: HISTORY_KEY.into(),
                message: e.to_string(),
            }),
            None => Ok(Vec::new()),
        }
    }

    fn save_history(&self, history: &[Notification]) -> Result<(), StorageError> {
        let json = serde_json::to_string(history).map_err(|e| StorageError::Corrupted {
            key: HISTORY_KEY.into(),
            message: e.to_string(),
        })?;
        self.kv_set(HISTORY_KEY, &json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::{Broadcaster, NoopSink, NotificationDraft, NotificationKind};

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        db.kv_delete("test").unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
    }

    #[test]
    fn deadline_is_stored_as_epoch_millis() {
        let db = Database::open_memory().unwrap();
        assert!(db.load_deadline().unwrap().is_none());

        let deadline = Utc.timestamp_millis_opt(1_790_000_000_123).unwrap();
        db.save_deadline(deadline).unwrap();
        assert_eq!(db.kv_get(DEADLINE_KEY).unwrap().as_deref(), Some("1790000000123"));
        assert_eq!(db.load_deadline().unwrap(), Some(deadline));
    }

    #[test]
    fn corrupted_deadline_is_reported() {
        let db = Database::open_memory().unwrap();
        db.kv_set(DEADLINE_KEY, "tomorrow").unwrap();
        assert!(matches!(db.load_deadline(), Err(StorageError::Corrupted { .. })));
    }

    #[test]
    fn history_roundtrip_keeps_read_flags() {
        let db = Database::open_memory().unwrap();
        let b = Broadcaster::new(Box::new(NoopSink));
        let first = b.publish(NotificationDraft::new(NotificationKind::Upload, "Uploaded", "photo 1"));
        b.publish(NotificationDraft::new(NotificationKind::System, "Hello", "world"));
        b.mark_read(&first.id);

        db.save_history(&b.history()).unwrap();
        let loaded = db.load_history().unwrap();
        assert_eq!(loaded, b.history());
        assert!(loaded.iter().any(|n| n.read));
    }
}
