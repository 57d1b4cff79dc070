//! Audit event types and structures

use crate::error::CliError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Domain events recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Data directory created
    Init,
    Login,
    LoginFailure,
    Logout,
    UserCreate,
    UserDelete,
    PasswordChange,
    GrantSet,
    GrantRevoke,
    TrainingCreate,
    TrainingDelete,
    DeviceCreate,
    DeviceDelete,
    QuestionCreate,
    QuestionDelete,
    /// Quiz attempt scored and stored
    TestComplete,
    ResultUnlock,
    DocumentUpload,
    DocumentDownload,
    CertificateIssue,
    /// Legacy export imported
    DataImport,
    /// Configuration or certificate template change
    ConfigChange,
}

impl EventType {
    pub const ALL: [EventType; 22] = [
        EventType::Init,
        EventType::Login,
        EventType::LoginFailure,
        EventType::Logout,
        EventType::UserCreate,
        EventType::UserDelete,
        EventType::PasswordChange,
        EventType::GrantSet,
        EventType::GrantRevoke,
        EventType::TrainingCreate,
        EventType::TrainingDelete,
        EventType::DeviceCreate,
        EventType::DeviceDelete,
        EventType::QuestionCreate,
        EventType::QuestionDelete,
        EventType::TestComplete,
        EventType::ResultUnlock,
        EventType::DocumentUpload,
        EventType::DocumentDownload,
        EventType::CertificateIssue,
        EventType::DataImport,
        EventType::ConfigChange,
    ];

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Init => "init",
            EventType::Login => "login",
            EventType::LoginFailure => "login_failure",
            EventType::Logout => "logout",
            EventType::UserCreate => "user_create",
            EventType::UserDelete => "user_delete",
            EventType::PasswordChange => "password_change",
            EventType::GrantSet => "grant_set",
            EventType::GrantRevoke => "grant_revoke",
            EventType::TrainingCreate => "training_create",
            EventType::TrainingDelete => "training_delete",
            EventType::DeviceCreate => "device_create",
            EventType::DeviceDelete => "device_delete",
            EventType::QuestionCreate => "question_create",
            EventType::QuestionDelete => "question_delete",
            EventType::TestComplete => "test_complete",
            EventType::ResultUnlock => "result_unlock",
            EventType::DocumentUpload => "document_upload",
            EventType::DocumentDownload => "document_download",
            EventType::CertificateIssue => "certificate_issue",
            EventType::DataImport => "data_import",
            EventType::ConfigChange => "config_change",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        EventType::ALL
            .into_iter()
            .find(|event_type| event_type.as_str() == wanted)
            .ok_or_else(|| CliError::validation(format!("unknown event type '{s}'")))
    }
}

/// Audit event structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event ID (assigned by database)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    pub timestamp: DateTime<Utc>,

    pub event_type: EventType,

    /// Username of the acting account, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,

    /// Id of the record acted on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    pub details: JsonValue,

    pub machine_id: String,

    /// Event hash (computed on save)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_hash: Option<String>,

    /// Previous event hash (for chain)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_hash: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: EventType, actor: Option<String>, subject: Option<String>, details: JsonValue) -> Self {
        Self {
            id: None,
            timestamp: Utc::now(),
            event_type,
            actor,
            subject,
            details,
            machine_id: String::new(),
            event_hash: None,
            previous_hash: None,
        }
    }

    /// Compute hash of this event
    pub fn compute_hash(&self) -> String {
        use sha2::{Digest, Sha256};

        let data = format!(
            "{}|{}|{}|{}|{}|{}|{}|{}",
            self.id.unwrap_or(0),
            self.timestamp.to_rfc3339(),
            self.event_type.as_str(),
            self.actor.as_deref().unwrap_or_default(),
            self.subject.as_deref().unwrap_or_default(),
            self.details,
            self.machine_id,
            self.previous_hash.as_deref().unwrap_or_default()
        );

        hex::encode(Sha256::digest(data.as_bytes()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_type_strings() {
        assert_eq!(EventType::TestComplete.as_str(), "test_complete");
        assert_eq!("result-unlock".parse::<EventType>().unwrap(), EventType::ResultUnlock);
        assert!("bogus".parse::<EventType>().is_err());

        for event_type in EventType::ALL {
            assert_eq!(event_type.as_str().parse::<EventType>().unwrap(), event_type);
            let json = serde_json::to_string(&event_type).unwrap();
            assert_eq!(json, format!("\"{}\"", event_type.as_str()));
        }
    }

    #[test]
    fn test_compute_hash_covers_details() {
        let mut event = AuditEvent::new(
            EventType::ResultUnlock,
            Some("admin".to_string()),
            Some("r1".to_string()),
            json!({"userId": "u1"}),
        );
        event.id = Some(1);
        let original = event.compute_hash();

        event.details = json!({"userId": "u2"});
        assert_ne!(event.compute_hash(), original);

        event.details = json!({"userId": "u1"});
        assert_eq!(event.compute_hash(), original);

        event.id = Some(2);
        assert_ne!(event.compute_hash(), original);
    }
}
