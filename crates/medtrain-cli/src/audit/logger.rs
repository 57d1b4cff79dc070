//! Audit logger trait and implementations

use crate::audit::types::{AuditEvent, EventType};
use crate::error::{CliError, Result};
use crate::store::SharedConnection;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::MutexGuard;

/// Outcome of walking the hash chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityReport {
    pub events_checked: usize,
    /// First event whose hash or link does not match
    pub broken_at: Option<i64>,
}

impl IntegrityReport {
    pub fn is_valid(&self) -> bool {
        self.broken_at.is_none()
    }
}

/// Which events `list_events` returns
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub event_type: Option<EventType>,
    pub actor: Option<String>,
    /// Newest events only
    pub limit: Option<usize>,
}

/// Trait for audit logging (dependency injection)
#[async_trait]
pub trait AuditLogger: Send + Sync {
    /// Log an audit event
    async fn log_event(&self, event: AuditEvent) -> Result<i64>;

    /// Events matching `filter`, oldest first
    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<AuditEvent>>;

    /// Verify audit chain integrity
    async fn verify_integrity(&self) -> Result<IntegrityReport>;

    fn machine_id(&self) -> &str;
}

/// Audit trail in the `audit_events` table of the shared database
pub struct LocalAuditLogger {
    db: SharedConnection,
    machine_id: String,
}

impl LocalAuditLogger {
    pub fn new(db: SharedConnection, machine_id: String) -> Self {
        Self { db, machine_id }
    }

    /// Create an in-memory audit logger (for testing)
    #[cfg(test)]
    pub fn new_in_memory(machine_id: String) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        crate::store::schema::init_schema(&conn)?;
        Ok(Self::new(
            std::sync::Arc::new(std::sync::Mutex::new(conn)),
            machine_id,
        ))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|e| CliError::audit(format!("Failed to acquire database lock: {e}")))
    }

    /// Get the last event hash for chain linking
    fn last_event_hash(conn: &Connection) -> Result<Option<String>> {
        let hash = conn
            .query_row(
                "SELECT event_hash FROM audit_events ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()
            .map_err(|e| CliError::audit(format!("Failed to get last event hash: {e}")))?;

        Ok(hash.flatten())
    }

    fn row_to_event(row: &rusqlite::Row) -> rusqlite::Result<AuditEvent> {
        fn conversion<E>(column: usize, e: E) -> rusqlite::Error
        where
            E: std::error::Error + Send + Sync + 'static,
        {
            rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
        }

        let timestamp = chrono::DateTime::parse_from_rfc3339(&row.get::<_, String>(1)?)
            .map_err(|e| conversion(1, e))?
            .with_timezone(&chrono::Utc);

        let event_type = row
            .get::<_, String>(2)?
            .parse::<EventType>()
            .map_err(|e| conversion(2, e))?;

        let details = serde_json::from_str(&row.get::<_, String>(5)?).map_err(|e| conversion(5, e))?;

        Ok(AuditEvent {
            id: Some(row.get(0)?),
            timestamp,
            event_type,
            actor: row.get(3)?,
            subject: row.get(4)?,
            details,
            machine_id: row.get(6)?,
            event_hash: row.get(7)?,
            previous_hash: row.get(8)?,
        })
    }

    fn load_events(conn: &Connection, filter: &EventFilter) -> Result<Vec<AuditEvent>> {
        let mut stmt = conn
            .prepare(
                r#"
                SELECT id, timestamp, event_type, actor, subject, details,
                       machine_id, event_hash, previous_hash
                FROM audit_events
                WHERE (?1 IS NULL OR event_type = ?1)
                  AND (?2 IS NULL OR actor = ?2)
                ORDER BY id DESC
                LIMIT ?3
                "#,
            )
            .map_err(|e| CliError::audit(format!("Failed to prepare query: {e}")))?;

        let limit = filter
            .limit
            .map(|limit| limit as i64)
            .unwrap_or(-1);

        let mut events = stmt
            .query_map(
                params![filter.event_type.map(|t| t.as_str()), filter.actor, limit],
                Self::row_to_event,
            )
            .map_err(|e| CliError::audit(format!("Failed to query events: {e}")))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| CliError::audit(format!("Failed to read events: {e}")))?;

        events.reverse();
        Ok(events)
    }
}

#[async_trait]
impl AuditLogger for LocalAuditLogger {
    async fn log_event(&self, mut event: AuditEvent) -> Result<i64> {
        let conn = self.lock()?;

        if event.machine_id.is_empty() {
            event.machine_id = self.machine_id.clone();
        }
        event.previous_hash = Self::last_event_hash(&conn)?;

        let details = serde_json::to_string(&event.details)?;

        conn.execute(
            r#"
            INSERT INTO audit_events (
                timestamp, event_type, actor, subject, details,
                machine_id, previous_hash
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                event.timestamp.to_rfc3339(),
                event.event_type.as_str(),
                event.actor,
                event.subject,
                details,
                event.machine_id,
                event.previous_hash,
            ],
        )
        .map_err(|e| CliError::audit(format!("Failed to insert audit event: {e}")))?;

        let event_id = conn.last_insert_rowid();
        event.id = Some(event_id);
        let event_hash = event.compute_hash();

        conn.execute(
            "UPDATE audit_events SET event_hash = ?1 WHERE id = ?2",
            params![event_hash, event_id],
        )
        .map_err(|e| CliError::audit(format!("Failed to update event hash: {e}")))?;

        tracing::debug!(event_id, event_type = %event.event_type, "Audit event recorded");
        Ok(event_id)
    }

    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<AuditEvent>> {
        let conn = self.lock()?;
        Self::load_events(&conn, filter)
    }

    async fn verify_integrity(&self) -> Result<IntegrityReport> {
        let conn = self.lock()?;
        let events = Self::load_events(&conn, &EventFilter::default())?;

        let mut previous: Option<&String> = None;
        for event in &events {
            let linked = event.previous_hash.as_ref() == previous;
            let intact = event.event_hash.as_ref() == Some(&event.compute_hash());
            if !linked || !intact {
                tracing::warn!(event_id = ?event.id, linked, intact, "Audit chain broken");
                return Ok(IntegrityReport {
                    events_checked: events.len(),
                    broken_at: event.id,
                });
            }
            previous = event.event_hash.as_ref();
        }

        Ok(IntegrityReport {
            events_checked: events.len(),
            broken_at: None,
        })
    }

    fn machine_id(&self) -> &str {
        &self.machine_id
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(event_type: EventType, actor: &str, index: usize) -> AuditEvent {
        AuditEvent::new(
            event_type,
            Some(actor.to_string()),
            Some(format!("subject-{index}")),
            json!({"index": index}),
        )
    }

    #[tokio::test]
    async fn test_log_event_fills_machine_id() {
        let logger = LocalAuditLogger::new_in_memory("test-machine".to_string()).unwrap();
        let id = logger.log_event(event(EventType::Init, "admin", 0)).await.unwrap();
        assert_eq!(id, 1);

        let events = logger.list_events(&EventFilter::default()).await.unwrap();
        assert_eq!(events[0].machine_id, "test-machine");
        assert_eq!(events[0].details, json!({"index": 0}));
    }

    #[tokio::test]
    async fn test_chain_verifies() {
        let logger = LocalAuditLogger::new_in_memory("test-machine".to_string()).unwrap();
        for i in 0..5 {
            logger.log_event(event(EventType::Login, "alice", i)).await.unwrap();
        }

        let report = logger.verify_integrity().await.unwrap();
        assert!(report.is_valid());
        assert_eq!(report.events_checked, 5);
    }

    #[tokio::test]
    async fn test_tampering_is_detected() {
        let logger = LocalAuditLogger::new_in_memory("test-machine".to_string()).unwrap();
        for i in 0..3 {
            logger.log_event(event(EventType::TestComplete, "alice", i)).await.unwrap();
        }

        logger
            .lock()
            .unwrap()
            .execute(
                "UPDATE audit_events SET details = '{\"index\":99}' WHERE id = 2",
                [],
            )
            .unwrap();

        let report = logger.verify_integrity().await.unwrap();
        assert_eq!(report.broken_at, Some(2));
    }

    #[tokio::test]
    async fn test_list_events_filters() {
        let logger = LocalAuditLogger::new_in_memory("test-machine".to_string()).unwrap();
        logger.log_event(event(EventType::Login, "alice", 0)).await.unwrap();
        logger.log_event(event(EventType::Login, "bob", 1)).await.unwrap();
        logger.log_event(event(EventType::Logout, "alice", 2)).await.unwrap();

        let logins = logger
            .list_events(&EventFilter {
                event_type: Some(EventType::Login),
                ..EventFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(logins.len(), 2);

        let alice = logger
            .list_events(&EventFilter {
                actor: Some("alice".to_string()),
                ..EventFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(alice.len(), 2);

        let latest = logger
            .list_events(&EventFilter {
                limit: Some(1),
                ..EventFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].event_type, EventType::Logout);
    }
}
