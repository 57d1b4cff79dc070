//! SQLite schema for the MedTrain database
//!
//! One file holds both the record entries and the audit trail.

use crate::error::Result;
use rusqlite::Connection;

/// Initialize all tables; safe to call on every open
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,  -- JSON array
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS audit_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            event_type TEXT NOT NULL,

            -- Who acted on what
            actor TEXT,
            subject TEXT,
            details TEXT NOT NULL,  -- JSON

            -- Machine context
            machine_id TEXT NOT NULL,

            -- Tamper detection
            event_hash TEXT,
            previous_hash TEXT
        )
        "#,
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_timestamp ON audit_events(timestamp)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_type ON audit_events(event_type)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_actor ON audit_events(actor)",
        [],
    )?;

    Ok(())
}
