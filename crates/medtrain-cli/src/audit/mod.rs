//! Audit trail
//!
//! Domain events are appended to a hash-chained table in the MedTrain
//! database. The trail is local and editable; `audit verify` detects edits
//! but cannot prevent them.

pub mod logger;
pub mod machine_id;
pub mod middleware;
pub mod types;

pub use logger::{AuditLogger, EventFilter, IntegrityReport, LocalAuditLogger};
pub use machine_id::get_machine_id;
pub use middleware::execute_with_audit;
pub use types::{AuditEvent, EventType};
