//! Administrative edits
//!
//! Every function validates its input before touching the store; a rejected
//! edit leaves all records unchanged. Callers check the administrator role
//! and record audit events.

use crate::auth::hash_password;
use crate::error::{CliError, Result};
use crate::store::{KeyValueStore, RecordStore};
use chrono::{Duration, NaiveDate};
use medtrain_common::types::{
    new_id, DeviceType, Grant, Permissions, Question, QuestionType, Role, Training, User,
    DEFAULT_IMAGE_SCALE, DEFAULT_PASSING_PERCENTAGE,
};

/// Default length of a grant window when no end date is given
pub const DEFAULT_GRANT_DAYS: i64 = 30;

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(CliError::validation(format!("{field} must not be empty")))
    } else {
        Ok(())
    }
}

pub(crate) fn check_passing_percentage(percentage: u32) -> Result<u32> {
    if percentage <= 100 {
        Ok(percentage)
    } else {
        Err(CliError::validation(format!(
            "passing percentage must be between 0 and 100, got {percentage}"
        )))
    }
}

pub(crate) fn check_image_scale(scale: u32) -> Result<u32> {
    if (1..=200).contains(&scale) {
        Ok(scale)
    } else {
        Err(CliError::validation(format!(
            "image scale must be between 1 and 200, got {scale}"
        )))
    }
}

// ============================================================================
// Users
// ============================================================================

pub fn create_user<S: KeyValueStore>(
    store: &RecordStore<S>,
    username: &str,
    password: &str,
    role: Role,
) -> Result<User> {
    let username = username.trim();
    require_non_empty("username", username)?;
    require_non_empty("password", password)?;

    let mut users = store.users()?;
    if users.iter().any(|user| user.username == username) {
        return Err(CliError::UsernameTaken(username.to_string()));
    }

    let user = User {
        id: new_id(),
        username: username.to_string(),
        password_hash: hash_password(password)?,
        role,
        permissions: Permissions::default(),
    };
    users.push(user.clone());
    store.save_users(&users)?;

    tracing::info!(user_id = %user.id, username, role = %role, "User created");
    Ok(user)
}

/// Remove an account. Its test results stay in place.
pub fn delete_user<S: KeyValueStore>(store: &RecordStore<S>, user_id: &str) -> Result<User> {
    let mut users = store.users()?;
    let index = users
        .iter()
        .position(|user| user.id == user_id)
        .ok_or_else(|| CliError::UserNotFound(user_id.to_string()))?;

    let removed = users.remove(index);
    store.save_users(&users)?;

    tracing::info!(user_id, username = %removed.username, "User deleted");
    Ok(removed)
}

pub fn set_password<S: KeyValueStore>(store: &RecordStore<S>, user_id: &str, password: &str) -> Result<()> {
    require_non_empty("password", password)?;
    let hash = hash_password(password)?;

    store
        .update_user(user_id, |user| user.password_hash = hash)?
        .ok_or_else(|| CliError::UserNotFound(user_id.to_string()))?;

    tracing::info!(user_id, "Password changed");
    Ok(())
}

/// Look up a user by id, falling back to an exact username match
pub fn resolve_user_ref<S: KeyValueStore>(store: &RecordStore<S>, reference: &str) -> Result<User> {
    if let Some(user) = store.find_user(reference)? {
        return Ok(user);
    }
    store
        .find_user_by_name(reference)?
        .ok_or_else(|| CliError::UserNotFound(reference.to_string()))
}

// ============================================================================
// Grants
// ============================================================================

/// Requested access window for one training
#[derive(Debug, Clone, Default)]
pub struct GrantRequest {
    pub training_id: String,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub device_ids: Vec<String>,
}

/// Replace the user's grant for a training.
///
/// Missing dates default to `today` and `today + 30 days`. Every device id
/// must belong to the training.
pub fn set_grant<S: KeyValueStore>(
    store: &RecordStore<S>,
    user_id: &str,
    request: GrantRequest,
    today: NaiveDate,
) -> Result<Grant> {
    let training = store
        .find_training(&request.training_id)?
        .ok_or_else(|| CliError::TrainingNotFound(request.training_id.clone()))?;

    let valid_from = request.valid_from.unwrap_or(today);
    let valid_until = match request.valid_until {
        Some(until) => until,
        None => valid_from
            .checked_add_signed(Duration::days(DEFAULT_GRANT_DAYS))
            .ok_or_else(|| {
                CliError::validation(format!(
                    "valid from {valid_from} leaves no room for a {DEFAULT_GRANT_DAYS}-day window"
                ))
            })?,
    };
    if valid_from > valid_until {
        return Err(CliError::validation(format!(
            "valid from {valid_from} is after valid until {valid_until}"
        )));
    }

    if let Some(foreign) = request
        .device_ids
        .iter()
        .find(|device_id| !training.has_device(device_id))
    {
        return Err(CliError::validation(format!(
            "device '{foreign}' does not belong to training '{}'",
            training.title
        )));
    }

    let grant = Grant::new(training.id.clone(), valid_from, valid_until, request.device_ids);
    let stored = grant.clone();
    store
        .update_user(user_id, move |user| user.permissions.upsert(stored))?
        .ok_or_else(|| CliError::UserNotFound(user_id.to_string()))?;

    tracing::info!(
        user_id,
        training_id = %grant.training_id,
        devices = grant.device_types.len(),
        %valid_from,
        %valid_until,
        "Grant set"
    );
    Ok(grant)
}

/// Drop the user's grants for a training; returns whether one existed
pub fn revoke_grant<S: KeyValueStore>(store: &RecordStore<S>, user_id: &str, training_id: &str) -> Result<bool> {
    let removed = store
        .update_user(user_id, |user| user.permissions.revoke(training_id))?
        .ok_or_else(|| CliError::UserNotFound(user_id.to_string()))?;

    tracing::info!(user_id, training_id, removed, "Grant revoked");
    Ok(removed)
}

// ============================================================================
// Trainings and devices
// ============================================================================

/// Fields shared by new trainings and devices
#[derive(Debug, Clone, Default)]
pub struct CatalogEntry {
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub image_scale: Option<u32>,
}

impl CatalogEntry {
    fn validate(&self) -> Result<u32> {
        require_non_empty("title", &self.title)?;
        require_non_empty("description", &self.description)?;
        check_image_scale(self.image_scale.unwrap_or(DEFAULT_IMAGE_SCALE))
    }
}

pub fn create_training<S: KeyValueStore>(store: &RecordStore<S>, entry: CatalogEntry) -> Result<Training> {
    let image_scale = entry.validate()?;

    let training = Training {
        id: new_id(),
        title: entry.title.trim().to_string(),
        description: entry.description.trim().to_string(),
        image_url: entry.image_url.trim().to_string(),
        image_scale,
        device_types: Vec::new(),
    };

    let mut trainings = store.trainings()?;
    trainings.push(training.clone());
    store.save_trainings(&trainings)?;

    tracing::info!(training_id = %training.id, title = %training.title, "Training created");
    Ok(training)
}

/// Remove a training with its devices. Grants that name it become inert.
pub fn delete_training<S: KeyValueStore>(store: &RecordStore<S>, training_id: &str) -> Result<Training> {
    let mut trainings = store.trainings()?;
    let index = trainings
        .iter()
        .position(|training| training.id == training_id)
        .ok_or_else(|| CliError::TrainingNotFound(training_id.to_string()))?;

    let removed = trainings.remove(index);
    store.save_trainings(&trainings)?;

    tracing::info!(
        training_id,
        devices = removed.device_types.len(),
        "Training deleted"
    );
    Ok(removed)
}

pub fn add_device<S: KeyValueStore>(
    store: &RecordStore<S>,
    training_id: &str,
    entry: CatalogEntry,
    passing_percentage: Option<u32>,
) -> Result<DeviceType> {
    let image_scale = entry.validate()?;
    let passing_percentage = check_passing_percentage(passing_percentage.unwrap_or(DEFAULT_PASSING_PERCENTAGE))?;

    let mut trainings = store.trainings()?;
    let training = trainings
        .iter_mut()
        .find(|training| training.id == training_id)
        .ok_or_else(|| CliError::TrainingNotFound(training_id.to_string()))?;

    let device = DeviceType {
        id: new_id(),
        training_id: training.id.clone(),
        title: entry.title.trim().to_string(),
        description: entry.description.trim().to_string(),
        image_url: entry.image_url.trim().to_string(),
        image_scale,
        passing_percentage,
        questions: Vec::new(),
        documentation: None,
    };
    training.device_types.push(device.clone());
    store.save_trainings(&trainings)?;

    tracing::info!(training_id, device_id = %device.id, passing_percentage, "Device added");
    Ok(device)
}

/// Remove a device from whichever training holds it
pub fn delete_device<S: KeyValueStore>(store: &RecordStore<S>, device_id: &str) -> Result<DeviceType> {
    let mut trainings = store.trainings()?;
    let removed = trainings.iter_mut().find_map(|training| {
        let index = training
            .device_types
            .iter()
            .position(|device| device.id == device_id)?;
        Some(training.device_types.remove(index))
    });

    let removed = removed.ok_or_else(|| CliError::DeviceNotFound(device_id.to_string()))?;
    store.save_trainings(&trainings)?;

    tracing::info!(device_id, training_id = %removed.training_id, "Device deleted");
    Ok(removed)
}

// ============================================================================
// Questions
// ============================================================================

pub fn add_question<S: KeyValueStore>(
    store: &RecordStore<S>,
    device_id: &str,
    text: &str,
    question_type: QuestionType,
    options: Vec<String>,
    correct_answers: Vec<usize>,
) -> Result<Question> {
    let question = Question::new(text.trim(), question_type, options, correct_answers)?;

    let stored = question.clone();
    store
        .update_device(device_id, move |device| device.questions.push(stored))?
        .ok_or_else(|| CliError::DeviceNotFound(device_id.to_string()))?;

    tracing::info!(device_id, question_id = %question.id, "Question added");
    Ok(question)
}

pub fn delete_question<S: KeyValueStore>(
    store: &RecordStore<S>,
    device_id: &str,
    question_id: &str,
) -> Result<Question> {
    let removed = store
        .update_device(device_id, |device| {
            let index = device
                .questions
                .iter()
                .position(|question| question.id == question_id)?;
            Some(device.questions.remove(index))
        })?
        .ok_or_else(|| CliError::DeviceNotFound(device_id.to_string()))?
        .ok_or_else(|| CliError::QuestionNotFound(question_id.to_string()))?;

    tracing::info!(device_id, question_id, "Question deleted");
    Ok(removed)
}
