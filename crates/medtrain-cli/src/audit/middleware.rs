//! Audit middleware
//!
//! Wraps a command so its outcome lands in the audit trail.

use crate::audit::logger::AuditLogger;
use crate::audit::types::AuditEvent;
use crate::error::Result;
use serde_json::{json, Value as JsonValue};
use std::future::Future;

fn with_status(details: JsonValue, status: JsonValue) -> JsonValue {
    match (details, status) {
        (JsonValue::Object(mut fields), JsonValue::Object(extra)) => {
            fields.extend(extra);
            JsonValue::Object(fields)
        }
        (JsonValue::Null, status) => status,
        (other, JsonValue::Object(mut extra)) => {
            extra.insert("details".to_string(), other);
            JsonValue::Object(extra)
        }
        (_, status) => status,
    }
}

/// Run `command` and record `event` with its outcome.
///
/// Success adds `"status": "success"` to the event details; failure adds
/// `"status": "failure"` and the error message. A failure to record the
/// failure is logged and the command's own error is returned.
pub async fn execute_with_audit<F, T, Fut>(audit: &dyn AuditLogger, event: AuditEvent, command: F) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let result = command().await;

    match &result {
        Ok(_) => {
            let event = AuditEvent {
                details: with_status(event.details.clone(), json!({"status": "success"})),
                ..event
            };
            audit.log_event(event).await?;
        }
        Err(e) => {
            let event_type = event.event_type;
            let event = AuditEvent {
                details: with_status(
                    event.details.clone(),
                    json!({"status": "failure", "error": e.to_string()}),
                ),
                ..event
            };
            if let Err(audit_error) = audit.log_event(event).await {
                tracing::warn!(%event_type, error = %audit_error, "Failed to record failed command");
            }
        }
    }

    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::audit::logger::{EventFilter, LocalAuditLogger};
    use crate::audit::types::EventType;
    use crate::error::CliError;

    fn event() -> AuditEvent {
        AuditEvent::new(
            EventType::ResultUnlock,
            Some("admin".to_string()),
            Some("r1".to_string()),
            json!({"userId": "u1"}),
        )
    }

    #[tokio::test]
    async fn test_success_is_recorded() {
        let logger = LocalAuditLogger::new_in_memory("test-machine".to_string()).unwrap();

        let value = execute_with_audit(&logger, event(), || async { Ok(42) }).await.unwrap();
        assert_eq!(value, 42);

        let events = logger.list_events(&EventFilter::default()).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].details, json!({"userId": "u1", "status": "success"}));
        assert!(logger.verify_integrity().await.unwrap().is_valid());
    }

    #[tokio::test]
    async fn test_failure_is_recorded_and_returned() {
        let logger = LocalAuditLogger::new_in_memory("test-machine".to_string()).unwrap();

        let result: Result<()> = execute_with_audit(&logger, event(), || async {
            Err(CliError::ResultNotFound("r1".to_string()))
        })
        .await;
        assert!(matches!(result, Err(CliError::ResultNotFound(_))));

        let events = logger.list_events(&EventFilter::default()).await.unwrap();
        assert_eq!(events[0].details["status"], "failure");
        assert!(events[0].details["error"].as_str().unwrap().contains("r1"));
    }

    #[test]
    fn test_with_status_merges() {
        assert_eq!(with_status(JsonValue::Null, json!({"status": "success"})), json!({"status": "success"}));
        assert_eq!(
            with_status(json!("raw"), json!({"status": "success"})),
            json!({"status": "success", "details": "raw"})
        );
    }
}
