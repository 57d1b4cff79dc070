//! Import of legacy browser-storage exports
//!
//! The export is one JSON object with the `users`, `trainings` and
//! `testResults` arrays. Plaintext passwords are hashed on the way in.
//! Records whose id already exists are skipped, as are users whose name is
//! taken. Imported trainings go through the same checks as administrative
//! edits; one bad record rejects the whole export.

use crate::admin::{check_image_scale, check_passing_percentage};
use crate::auth::hash_password;
use crate::error::{CliError, Result};
use crate::progress;
use crate::store::{KeyValueStore, RecordStore};
use medtrain_common::types::{DeviceType, Permissions, Role, TestResult, Training, User};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyUser {
    id: String,
    username: String,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    password_hash: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    permissions: Permissions,
}

impl LegacyUser {
    fn into_user(self) -> Result<User> {
        let password_hash = match (self.password_hash, self.password) {
            (Some(hash), _) if !hash.is_empty() => hash,
            (_, Some(password)) if !password.is_empty() => hash_password(&password)?,
            _ => {
                return Err(CliError::validation(format!(
                    "user '{}' has no password",
                    self.username
                )))
            }
        };

        let role = match self.role.as_deref() {
            Some(role) => role.parse::<Role>()?,
            None => Role::Trainee,
        };

        Ok(User {
            id: self.id,
            username: self.username,
            password_hash,
            role,
            permissions: self.permissions,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyExport {
    #[serde(default)]
    users: Vec<LegacyUser>,
    #[serde(default)]
    trainings: Vec<Training>,
    #[serde(default)]
    test_results: Vec<TestResult>,
}

/// Counts of what an import added and skipped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub users: usize,
    pub trainings: usize,
    pub test_results: usize,
    pub skipped: usize,
}

fn require_title(kind: &str, id: &str, title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(CliError::validation(format!("{kind} '{id}' has no title")));
    }
    Ok(())
}

fn validate_device(training_id: &str, mut device: DeviceType) -> Result<DeviceType> {
    require_title("device", &device.id, &device.title)?;
    if device.training_id != training_id {
        return Err(CliError::validation(format!(
            "device '{}' names training '{}' but is listed under '{training_id}'",
            device.id, device.training_id
        )));
    }
    check_image_scale(device.image_scale)?;
    check_passing_percentage(device.passing_percentage)?;

    let device_id = device.id.clone();
    device.questions = std::mem::take(&mut device.questions)
        .into_iter()
        .map(|question| {
            let question_id = question.id.clone();
            question.validated().map_err(|e| {
                CliError::validation(format!("question '{question_id}' of device '{device_id}': {e}"))
            })
        })
        .collect::<Result<_>>()?;
    Ok(device)
}

/// Check a training and its devices. Device ids must not collide with
/// `device_ids`, which collects the ids of every accepted device.
fn validate_training(mut training: Training, device_ids: &mut HashSet<String>) -> Result<Training> {
    require_title("training", &training.id, &training.title)?;
    check_image_scale(training.image_scale)?;

    let devices = std::mem::take(&mut training.device_types);
    for device in devices {
        if !device_ids.insert(device.id.clone()) {
            return Err(CliError::validation(format!("device id '{}' is already in use", device.id)));
        }
        training.device_types.push(validate_device(&training.id, device)?);
    }
    Ok(training)
}

pub fn import_file<S: KeyValueStore>(store: &RecordStore<S>, path: &Path) -> Result<ImportSummary> {
    let raw = std::fs::read_to_string(path)?;
    import_json(store, &raw)
}

/// Merge an export into the store. The whole export is validated before
/// anything is written.
pub fn import_json<S: KeyValueStore>(store: &RecordStore<S>, raw: &str) -> Result<ImportSummary> {
    let export: LegacyExport = serde_json::from_str(raw)?;
    let mut summary = ImportSummary::default();

    let mut users = store.users()?;
    let mut known_ids: HashSet<String> = users.iter().map(|user| user.id.clone()).collect();
    let mut known_names: HashSet<String> = users.iter().map(|user| user.username.clone()).collect();

    let bar = progress::create_progress_bar(export.users.len() as u64, "Hashing passwords");
    for legacy in export.users {
        bar.inc(1);
        if known_ids.contains(&legacy.id) || known_names.contains(&legacy.username) {
            tracing::debug!(user_id = %legacy.id, "Skipping existing user");
            summary.skipped += 1;
            continue;
        }
        let user = legacy.into_user()?;
        known_ids.insert(user.id.clone());
        known_names.insert(user.username.clone());
        users.push(user);
        summary.users += 1;
    }
    bar.finish_and_clear();

    let mut trainings = store.trainings()?;
    let mut training_ids: HashSet<String> = trainings.iter().map(|t| t.id.clone()).collect();
    let mut device_ids: HashSet<String> = trainings
        .iter()
        .flat_map(|t| t.device_types.iter().map(|d| d.id.clone()))
        .collect();
    for training in export.trainings {
        if !training_ids.insert(training.id.clone()) {
            summary.skipped += 1;
            continue;
        }
        trainings.push(validate_training(training, &mut device_ids)?);
        summary.trainings += 1;
    }

    let mut results = store.test_results()?;
    let mut result_ids: HashSet<String> = results.iter().map(|r| r.id.clone()).collect();
    for result in export.test_results {
        if !result_ids.insert(result.id.clone()) {
            summary.skipped += 1;
            continue;
        }
        results.push(result);
        summary.test_results += 1;
    }

    store.save_users(&users)?;
    store.save_trainings(&trainings)?;
    store.save_test_results(&results)?;

    tracing::info!(
        users = summary.users,
        trainings = summary.trainings,
        test_results = summary.test_results,
        skipped = summary.skipped,
        "Legacy export imported"
    );
    Ok(summary)
}
