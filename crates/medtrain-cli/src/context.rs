//! Per-invocation application context
//!
//! Opens the data directory once and hands the record store, blob store,
//! audit trail and session file to the commands.

use crate::audit::{get_machine_id, AuditEvent, AuditLogger, EventType, LocalAuditLogger};
use crate::auth::{self, SessionStore};
use crate::blob::FsBlobStore;
use crate::config::Config;
use crate::error::Result;
use crate::store::{open_database, RecordStore, SqliteKeyValueStore};
use chrono::{Local, NaiveDate};
use medtrain_common::types::{Session, User};
use serde_json::Value as JsonValue;

pub struct AppContext {
    pub config: Config,
    pub store: RecordStore<SqliteKeyValueStore>,
    pub blobs: FsBlobStore,
    pub audit: LocalAuditLogger,
    pub sessions: SessionStore,
}

impl AppContext {
    /// Open an initialized data directory
    pub fn open(config: Config) -> Result<Self> {
        config.ensure_initialized()?;
        Self::open_unchecked(config)
    }

    /// Open or create the data directory without requiring `init`
    pub fn open_unchecked(config: Config) -> Result<Self> {
        let db = open_database(&config.database_path())?;
        let machine_id = get_machine_id(&config.machine_id_path())?;

        Ok(Self {
            store: RecordStore::new(SqliteKeyValueStore::new(db.clone())),
            blobs: FsBlobStore::new(config.blobs_dir()),
            audit: LocalAuditLogger::new(db, machine_id),
            sessions: SessionStore::new(config.session_path()),
            config,
        })
    }

    /// Local calendar date used for grant windows
    pub fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    /// The logged-in account as currently stored
    pub fn current_user(&self) -> Result<(Session, User)> {
        let session = self.sessions.require()?;
        let user = auth::resolve_user(&self.store, &session)?;
        Ok((session, user))
    }

    /// The logged-in account, which must be an administrator
    pub fn require_admin(&self, operation: &str) -> Result<User> {
        let (_, user) = self.current_user()?;
        auth::require_admin(&user, operation)?;
        Ok(user)
    }

    /// Append an event to the audit trail
    pub async fn record(
        &self,
        event_type: EventType,
        actor: Option<&str>,
        subject: Option<&str>,
        details: JsonValue,
    ) -> Result<i64> {
        let event = AuditEvent::new(
            event_type,
            actor.map(str::to_string),
            subject.map(str::to_string),
            details,
        );
        self.audit.log_event(event).await
    }
}
