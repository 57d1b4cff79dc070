//! Domain types shared across MedTrain
//!
//! All records serialize with camelCase field names, which is the layout of
//! the persisted `users`, `trainings` and `testResults` entries.

mod result;
mod session;
mod training;
mod user;

pub use result::TestResult;
pub use session::Session;
pub use training::{
    DeviceDocument, DeviceType, DocumentDownload, Question, QuestionType, Training,
    DEFAULT_IMAGE_SCALE, DEFAULT_PASSING_PERCENTAGE,
};
pub use user::{lenient_date, Grant, Permissions, Role, User};

use crate::error::{CommonError, Result};
use chrono::NaiveDate;

/// Calendar date format used for grant windows
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Generate a fresh record identifier
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Parse a `YYYY-MM-DD` calendar date
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
        .map_err(|e| CommonError::Parse(format!("'{input}' is not a YYYY-MM-DD date: {e}")))
}
