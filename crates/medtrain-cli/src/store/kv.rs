use super::schema;
use crate::error::{CliError, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Connection shared by the record store and the audit logger
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Open (or create) the database file and make sure its schema exists
pub fn open_database(path: &Path) -> Result<SharedConnection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)?;
    conn.busy_timeout(Duration::from_secs(5))?;
    schema::init_schema(&conn)?;

    tracing::debug!(path = %path.display(), "Opened database");
    Ok(Arc::new(Mutex::new(conn)))
}

/// Named string entries with last-write-wins semantics
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Durable store backed by the `records` table
#[derive(Clone)]
pub struct SqliteKeyValueStore {
    db: SharedConnection,
}

impl SqliteKeyValueStore {
    pub fn new(db: SharedConnection) -> Self {
        Self { db }
    }

    /// Open a standalone database file
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(open_database(path)?))
    }

    pub fn connection(&self) -> SharedConnection {
        Arc::clone(&self.db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|e| CliError::storage(format!("Failed to acquire database lock: {e}")))
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row("SELECT value FROM records WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO records (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, value, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

/// Volatile store for tests and dry runs
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|e| CliError::storage(format!("Failed to acquire store lock: {e}")))
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
