//! SQL DDL for the waymark database.
//!
//! A single `queue_blobs` key/value table backs the offline event queue's
//! durable storage. All DDL uses `IF NOT EXISTS` for idempotent
//! initialization.

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
-- Durable blobs keyed by logical store name. The offline event queue
-- serializes its full ordered contents under one key per mutation.
CREATE TABLE IF NOT EXISTS queue_blobs (
    key TEXT PRIMARY KEY,
    value BLOB NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
