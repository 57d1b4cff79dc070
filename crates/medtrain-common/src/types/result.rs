use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one completed quiz attempt.
///
/// Only `is_locked` ever changes after creation: it starts `true` and is
/// cleared by an administrator unlock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub device_id: String,
    pub device_title: String,
    pub score: f64,
    pub passed: bool,
    pub timestamp: DateTime<Utc>,
    pub is_locked: bool,
}

impl TestResult {
    pub fn belongs_to(&self, user_id: &str, device_id: &str) -> bool {
        self.user_id == user_id && self.device_id == device_id
    }
}
