//! SQLite-backed persistence for the prompt history ledger.
//!
//! Rows are append-only and read back in insertion order.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::HistoryEntry;

#[derive(Debug, thiserror::Error)]
pub enum HistoryStoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("history store lock poisoned")]
    Poisoned,
    #[error("task join error: {0}")]
    Join(String),
    #[error("serialization error: {0}")]
    Serde(String),
}

#[derive(Clone)]
pub struct SqliteHistoryStore {
    path: PathBuf,
    conn: Arc<Mutex<Connection>>,
}

impl SqliteHistoryStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HistoryStoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;\
             PRAGMA synchronous=NORMAL;\
             CREATE TABLE IF NOT EXISTS prompt_history (\
               seq INTEGER PRIMARY KEY AUTOINCREMENT,\
               id TEXT NOT NULL UNIQUE,\
               prompt TEXT NOT NULL,\
               prompt_hash TEXT NOT NULL,\
               recorded_at TEXT NOT NULL,\
               snapshot_json TEXT NOT NULL\
             );",
        )?;

        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var("UX_TRIAGE_HISTORY_PATH") {
            return PathBuf::from(path);
        }
        PathBuf::from(".ux_triage_history.sqlite")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_conn<F, R>(&self, f: F) -> Result<R, HistoryStoreError>
    where
        F: FnOnce(&Connection) -> Result<R, HistoryStoreError>,
    {
        let guard = self.conn.lock().map_err(|_| HistoryStoreError::Poisoned)?;
        f(&guard)
    }

    pub async fn append(&self, entry: &HistoryEntry) -> Result<(), HistoryStoreError> {
        let entry = entry.clone();
        let store = self.clone();
        tokio::task::spawn_blocking(move || {
            store.with_conn(|conn| {
                let snapshot_json = serde_json::to_string(&entry.snapshot)
                    .map_err(|e| HistoryStoreError::Serde(e.to_string()))?;
                conn.execute(
                    "INSERT INTO prompt_history (id, prompt, prompt_hash, recorded_at, snapshot_json) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        entry.id.to_string(),
                        entry.prompt,
                        entry.prompt_hash,
                        entry.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
                        snapshot_json,
                    ],
                )?;
                Ok(())
            })
        })
        .await
        .map_err(|e| HistoryStoreError::Join(e.to_string()))?
    }

    /// All entries, oldest first.
    pub async fn load(&self) -> Result<Vec<HistoryEntry>, HistoryStoreError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || {
            store.with_conn(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, prompt, prompt_hash, recorded_at, snapshot_json \
                     FROM prompt_history ORDER BY seq ASC",
                )?;
                let mut rows = stmt.query([])?;
                let mut entries = Vec::new();
                while let Some(row) = rows.next()? {
                    let id: String = row.get(0)?;
                    let recorded_at: String = row.get(3)?;
                    let snapshot_json: String = row.get(4)?;
                    entries.push(HistoryEntry {
                        id: Uuid::parse_str(&id)
                            .map_err(|e| HistoryStoreError::Serde(e.to_string()))?,
                        prompt: row.get(1)?,
                        prompt_hash: row.get(2)?,
                        timestamp: DateTime::parse_from_rfc3339(&recorded_at)
                            .map_err(|e| HistoryStoreError::Serde(e.to_string()))?
                            .with_timezone(&Utc),
                        snapshot: serde_json::from_str(&snapshot_json)
                            .map_err(|e| HistoryStoreError::Serde(e.to_string()))?,
                    });
                }
                Ok(entries)
            })
        })
        .await
        .map_err(|e| HistoryStoreError::Join(e.to_string()))?
    }

    /// Drops every row. Returns how many were removed.
    pub async fn clear(&self) -> Result<usize, HistoryStoreError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || {
            store.with_conn(|conn| Ok(conn.execute("DELETE FROM prompt_history", [])?))
        })
        .await
        .map_err(|e| HistoryStoreError::Join(e.to_string()))?
    }
}
