use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::warn;

use crate::error::{Error, Result};
use crate::types::MetadataRecord;

/// Destination for decoded metadata records. A trait boundary so the
/// Recorder doesn't care whether records land in SQLite, another store, or
/// (in tests) an in-memory `Vec`.
#[async_trait]
pub trait MetadataSink: Send + Sync {
    async fn init(&self) -> Result<()>;
    async fn insert(&self, record: &MetadataRecord) -> Result<()>;
}

/// Single sqlite connection behind a std `Mutex`, reused for the process
/// lifetime and driven from `spawn_blocking` since `rusqlite::Connection` is
/// synchronous. The SQLite utility this was learned from pulled a
/// connection out of a one-slot queue per call and rebuilt it after every
/// use, leaving the old handle to leak instead of closing it, and
/// double-closing the cursor instead of the connection. Holding one
/// connection for the sink's lifetime gets the same "only one caller
/// touches the connection at a time" property without either bug.
pub struct SqliteSink {
    conn: Arc<Mutex<rusqlite::Connection>>,
}

impl SqliteSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = rusqlite::Connection::open(path).map_err(Error::Persistence)?;
        Ok(SqliteSink {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory().map_err(Error::Persistence)?;
        Ok(SqliteSink {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn insert_sync(conn: &rusqlite::Connection, record: &MetadataRecord) -> Result<()> {
    let name = String::from_utf8_lossy(&record.name);
    let result = conn.execute(
        "INSERT INTO torrents (info_hash, name, size) VALUES (?1, ?2, ?3)",
        rusqlite::params![record.hash, name, record.size],
    );

    match result {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == rusqlite::ErrorCode::ConstraintViolation => {
            // Same infohash seen again from a different peer: a no-op, not a failure.
            warn!(hash = %record.hash, "storage: duplicate infohash, skipping");
            Ok(())
        }
        Err(err) => Err(Error::Persistence(err)),
    }
}

#[async_trait]
impl MetadataSink for SqliteSink {
    async fn init(&self) -> Result<()> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            conn.lock()
                .expect("sqlite connection mutex poisoned")
                .execute_batch(
                    "CREATE TABLE IF NOT EXISTS torrents (
                        info_hash TEXT PRIMARY KEY,
                        name TEXT NOT NULL,
                        size TEXT NOT NULL,
                        discovered_at INTEGER NOT NULL DEFAULT (strftime('%s','now'))
                    );",
                )
                .map_err(Error::Persistence)
        })
        .await
        .expect("init task panicked")
    }

    async fn insert(&self, record: &MetadataRecord) -> Result<()> {
        let conn = self.conn.clone();
        let record = record.clone();
        tokio::task::spawn_blocking(move || {
            insert_sync(&conn.lock().expect("sqlite connection mutex poisoned"), &record)
        })
        .await
        .expect("insert task panicked")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(hash: &str) -> MetadataRecord {
        MetadataRecord {
            hash: hash.to_string(),
            name: b"example.mkv".to_vec(),
            size: "123456".to_string(),
        }
    }

    fn count_rows(sink: &SqliteSink) -> i64 {
        sink.conn
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM torrents", [], |row| row.get(0))
            .unwrap()
    }

    #[tokio::test]
    async fn inserts_and_reads_back() {
        let sink = SqliteSink::open_in_memory().unwrap();
        sink.init().await.unwrap();
        sink.insert(&sample("aaaa")).await.unwrap();
        assert_eq!(count_rows(&sink), 1);
    }

    #[tokio::test]
    async fn duplicate_insert_is_a_no_op() {
        let sink = SqliteSink::open_in_memory().unwrap();
        sink.init().await.unwrap();
        sink.insert(&sample("bbbb")).await.unwrap();
        sink.insert(&sample("bbbb")).await.unwrap();
        assert_eq!(count_rows(&sink), 1);
    }
}
