//! Users, roles and permission grants

use crate::error::CommonError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Role of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Trainee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Trainee => "trainee",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" | "administrator" => Ok(Role::Admin),
            "trainee" | "user" => Ok(Role::Trainee),
            other => Err(CommonError::InvalidRole(other.to_string())),
        }
    }
}

/// A local account.
///
/// `password_hash` holds an argon2id PHC string. Accounts are created and
/// changed only by administrators; deleting one leaves its test results in
/// place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub permissions: Permissions,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Permission grants held by a user
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub trainings: Vec<Grant>,
}

impl Permissions {
    /// Grants referring to one training, in stored order
    pub fn grants_for<'a>(&'a self, training_id: &'a str) -> impl Iterator<Item = &'a Grant> + 'a {
        self.trainings
            .iter()
            .filter(move |grant| grant.training_id == training_id)
    }

    /// Replace the grant for a training, or append one
    pub fn upsert(&mut self, grant: Grant) {
        match self
            .trainings
            .iter_mut()
            .find(|existing| existing.training_id == grant.training_id)
        {
            Some(existing) => *existing = grant,
            None => self.trainings.push(grant),
        }
    }

    /// Remove every grant for a training; returns whether anything was removed
    pub fn revoke(&mut self, training_id: &str) -> bool {
        let before = self.trainings.len();
        self.trainings.retain(|grant| grant.training_id != training_id);
        self.trainings.len() != before
    }
}

/// Access to a subset of a training's devices for a date window.
///
/// A grant whose dates are missing or unparseable covers no day, and a grant
/// with no device ids authorizes no device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    #[serde(alias = "id")]
    pub training_id: String,
    #[serde(default, with = "lenient_date")]
    pub valid_from: Option<NaiveDate>,
    #[serde(default, with = "lenient_date")]
    pub valid_until: Option<NaiveDate>,
    #[serde(default)]
    pub device_types: BTreeSet<String>,
}

impl Grant {
    pub fn new(
        training_id: impl Into<String>,
        valid_from: NaiveDate,
        valid_until: NaiveDate,
        device_types: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            training_id: training_id.into(),
            valid_from: Some(valid_from),
            valid_until: Some(valid_until),
            device_types: device_types.into_iter().collect(),
        }
    }

    /// Inclusive calendar-date window check
    pub fn covers(&self, day: NaiveDate) -> bool {
        match (self.valid_from, self.valid_until) {
            (Some(from), Some(until)) => from <= day && day <= until,
            _ => false,
        }
    }

    /// Whether this grant opens `device_id` of `training_id` on `day`
    pub fn authorizes(&self, training_id: &str, device_id: &str, day: NaiveDate) -> bool {
        self.training_id == training_id
            && self.device_types.contains(device_id)
            && self.covers(day)
    }
}

/// Serde adapter for grant dates.
///
/// Writes `YYYY-MM-DD`. Reads `YYYY-MM-DD` or an RFC 3339 timestamp; any
/// other value becomes `None` instead of failing the whole record.
pub mod lenient_date {
    use crate::types::DATE_FORMAT;
    use chrono::{DateTime, NaiveDate};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => serializer.serialize_str(&date.format(DATE_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(raw.as_ref().and_then(|value| value.as_str()).and_then(parse))
    }

    fn parse(text: &str) -> Option<NaiveDate> {
        let text = text.trim();
        NaiveDate::parse_from_str(text, DATE_FORMAT)
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive()))
    }
}
