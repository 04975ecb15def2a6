//! Document store for scraped indices, backed by SQLite.
//!
//! One table per collection; each row holds a JSON document plus its batch
//! timestamp. The process opens the store once and shares the handle;
//! every operation holds the connection guard only for its own duration
//! and runs on the blocking pool.
//!
//! Bounded writes delete and insert inside one transaction, so readers see
//! either the previous batch or the new one, never an empty collection.

use crate::config::StoreConfig;
use crate::model::IndexRecord;
use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Errors from the document store.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("invalid collection name '{0}': use letters, digits and underscores")]
    InvalidCollection(String),

    #[error("failed to create store directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("malformed stored document: {0}")]
    Document(#[from] serde_json::Error),

    #[error("store connection poisoned by an earlier panic")]
    Poisoned,

    #[error("store task failed: {0}")]
    Task(String),
}

/// How many records survive a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// Replace the whole collection with at most this many records.
    Bounded(usize),
    /// Append every record.
    Unbounded,
}

impl RetentionPolicy {
    /// Policy selected by the `use_limit`/`limit` request parameters.
    pub fn from_params(use_limit: bool, limit: usize) -> Self {
        if use_limit {
            RetentionPolicy::Bounded(limit)
        } else {
            RetentionPolicy::Unbounded
        }
    }
}

/// Shared handle to the document store.
#[derive(Clone)]
pub struct IndexStore {
    conn: Arc<Mutex<Connection>>,
    collection: Arc<str>,
}

impl IndexStore {
    /// Open (creating if needed) the store described by the configuration.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        match config.database_path() {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let conn = Connection::open(&path)?;
                info!(path = %path.display(), collection = %config.collection, "opened document store");
                Self::with_connection(conn, &config.collection)
            }
            None => Self::open_in_memory(&config.collection),
        }
    }

    /// A private in-memory store.
    pub fn open_in_memory(collection: &str) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, collection)
    }

    fn with_connection(conn: Connection, collection: &str) -> Result<Self, StoreError> {
        if !is_identifier(collection) {
            return Err(StoreError::InvalidCollection(collection.to_string()));
        }
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{collection}\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                doc TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS \"{collection}_timestamp\"
                ON \"{collection}\" (timestamp);"
        ))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            collection: Arc::from(collection),
        })
    }

    /// Name of the backing collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Check the connection answers.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.with_conn(|conn, _| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }

    /// Write a batch under the given retention policy.
    ///
    /// Every record is stamped with one shared ISO-8601 timestamp.
    /// Returns the number of records inserted.
    pub async fn save(
        &self,
        records: Vec<IndexRecord>,
        policy: RetentionPolicy,
    ) -> Result<usize, StoreError> {
        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let batch: Vec<IndexRecord> = match policy {
            RetentionPolicy::Bounded(limit) => records.into_iter().take(limit).collect(),
            RetentionPolicy::Unbounded => records,
        };

        let inserted = self
            .with_conn(move |conn, table| {
                let tx = conn.transaction()?;
                if matches!(policy, RetentionPolicy::Bounded(_)) {
                    tx.execute(&format!("DELETE FROM \"{table}\""), [])?;
                }
                {
                    let mut stmt = tx.prepare(&format!(
                        "INSERT INTO \"{table}\" (timestamp, doc) VALUES (?1, ?2)"
                    ))?;
                    for mut record in batch.iter().cloned() {
                        record.timestamp = stamp.clone();
                        let doc = serde_json::to_string(&record)?;
                        stmt.execute(params![stamp, doc])?;
                    }
                }
                tx.commit()?;
                Ok(batch.len())
            })
            .await?;

        match policy {
            RetentionPolicy::Bounded(limit) => {
                info!(inserted, limit, "replaced stored indices")
            }
            RetentionPolicy::Unbounded => info!(inserted, "appended stored indices"),
        }
        if inserted == 0 {
            warn!("no indices written to the store");
        }
        Ok(inserted)
    }

    /// Every stored record in insertion order.
    pub async fn find_all(&self) -> Result<Vec<IndexRecord>, StoreError> {
        self.query("ORDER BY id ASC").await
    }

    /// Every stored record, newest batch first, source order within a batch.
    pub async fn find_latest_first(&self) -> Result<Vec<IndexRecord>, StoreError> {
        self.query("ORDER BY timestamp DESC, id ASC").await
    }

    /// Number of stored records.
    pub async fn count(&self) -> Result<usize, StoreError> {
        self.with_conn(|conn, table| {
            let n: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| row.get(0))?;
            Ok(n as usize)
        })
        .await
    }

    async fn query(&self, order: &'static str) -> Result<Vec<IndexRecord>, StoreError> {
        self.with_conn(move |conn, table| {
            let mut stmt = conn.prepare(&format!("SELECT doc FROM \"{table}\" {order}"))?;
            let docs = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<String>, _>>()?;
            docs.iter()
                .map(|doc| serde_json::from_str::<IndexRecord>(doc).map_err(StoreError::from))
                .collect()
        })
        .await
    }

    /// Run `op` with exclusive use of the connection on the blocking pool.
    async fn with_conn<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection, &str) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let table = Arc::clone(&self.collection);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            op(&mut *guard, &*table)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
