//! Durable storage behind the offline event queue.
//!
//! [`QueueStore`] is a key/blob contract: the queue serializes its full
//! ordered contents and the store makes that blob survive process restarts.
//! [`SqliteQueueStore`] is the production implementation;
//! [`MemoryQueueStore`] backs ephemeral sessions and tests.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::queue::PendingEvent;

/// Key under which the queue blob is stored.
const QUEUE_KEY: &str = "offline_events";

pub trait QueueStore: Send {
    /// Load the persisted queue, oldest event first. An absent blob is an
    /// empty queue, not an error.
    fn load(&self) -> Result<Vec<PendingEvent>>;

    /// Replace the persisted queue with `events`, atomically.
    fn save(&self, events: &[PendingEvent]) -> Result<()>;
}

/// Queue storage in the waymark sqlite database.
pub struct SqliteQueueStore {
    conn: Connection,
}

impl SqliteQueueStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open the database at `path` (creating it if needed) and wrap it.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Ok(Self::new(crate::db::open_database(path)?))
    }
}

impl QueueStore for SqliteQueueStore {
    fn load(&self) -> Result<Vec<PendingEvent>> {
        let blob: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT value FROM queue_blobs WHERE key = ?1",
                params![QUEUE_KEY],
                |row| row.get(0),
            )
            .optional()
            .context("failed to read queue blob")?;

        match blob {
            Some(bytes) => {
                serde_json::from_slice(&bytes).context("failed to decode queue blob")
            }
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, events: &[PendingEvent]) -> Result<()> {
        let bytes = serde_json::to_vec(events).context("failed to encode queue blob")?;
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO queue_blobs (key, value, updated_at) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![QUEUE_KEY, bytes, now],
            )
            .context("failed to write queue blob")?;
        Ok(())
    }
}

/// In-memory store for ephemeral sessions and tests.
#[derive(Default)]
pub struct MemoryQueueStore {
    events: Arc<Mutex<Vec<PendingEvent>>>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle onto the stored events, for inspecting writes in tests.
    pub fn handle(&self) -> Arc<Mutex<Vec<PendingEvent>>> {
        self.events.clone()
    }
}

impl QueueStore for MemoryQueueStore {
    fn load(&self) -> Result<Vec<PendingEvent>> {
        Ok(self.events.lock().unwrap().clone())
    }

    fn save(&self, events: &[PendingEvent]) -> Result<()> {
        *self.events.lock().unwrap() = events.to_vec();
        Ok(())
    }
}
