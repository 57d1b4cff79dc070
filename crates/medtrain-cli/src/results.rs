//! Result lifecycle
//!
//! Test results are immutable except for the lock flag. `unlock` does no
//! authorization itself; callers restrict it to administrators.

use crate::error::{CliError, Result};
use crate::store::{KeyValueStore, RecordStore};
use medtrain_common::types::TestResult;

/// Clear the lock of a result so its owner may retake the test.
///
/// Unlocking an already unlocked result changes nothing. Returns the result
/// as stored afterwards.
pub fn unlock<S: KeyValueStore>(store: &RecordStore<S>, result_id: &str) -> Result<TestResult> {
    let mut results = store.test_results()?;
    let result = results
        .iter_mut()
        .find(|result| result.id == result_id)
        .ok_or_else(|| CliError::ResultNotFound(result_id.to_string()))?;

    if !result.is_locked {
        tracing::debug!(result_id, "Result already unlocked");
        return Ok(result.clone());
    }

    result.is_locked = false;
    let unlocked = result.clone();
    store.save_test_results(&results)?;

    tracing::info!(
        result_id,
        user_id = %unlocked.user_id,
        device_id = %unlocked.device_id,
        "Result unlocked"
    );
    Ok(unlocked)
}

/// All results for a device, newest first
pub fn results_for_device<S: KeyValueStore>(store: &RecordStore<S>, device_id: &str) -> Result<Vec<TestResult>> {
    let mut results: Vec<TestResult> = store
        .test_results()?
        .into_iter()
        .filter(|result| result.device_id == device_id)
        .collect();
    results.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(results)
}

/// A user's history, newest first
pub fn results_for_user<S: KeyValueStore>(store: &RecordStore<S>, user_id: &str) -> Result<Vec<TestResult>> {
    let mut results: Vec<TestResult> = store
        .test_results()?
        .into_iter()
        .filter(|result| result.user_id == user_id)
        .collect();
    results.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(results)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::access;
    use crate::quiz::{Advance, QuizEngine};
    use crate::store::MemoryKeyValueStore;
    use crate::testing;
    use chrono::{Duration, Utc};
    use medtrain_common::types::{Role, Session};

    #[test]
    fn test_unlock_is_idempotent() {
        let store = RecordStore::new(MemoryKeyValueStore::new());
        let locked = testing::result("u1", "d1", Utc::now(), true);
        store.save_test_results(&[locked.clone()]).unwrap();

        let once = unlock(&store, &locked.id).unwrap();
        let after_once = store.test_results().unwrap();
        let twice = unlock(&store, &locked.id).unwrap();
        let after_twice = store.test_results().unwrap();

        assert!(!once.is_locked);
        assert_eq!(once, twice);
        assert_eq!(after_once, after_twice);
        assert_eq!(
            TestResult {
                is_locked: true,
                ..after_twice[0].clone()
            },
            locked
        );
    }

    #[test]
    fn test_unlock_unknown_result() {
        let store = RecordStore::new(MemoryKeyValueStore::new());
        assert!(matches!(
            unlock(&store, "missing"),
            Err(CliError::ResultNotFound(_))
        ));
    }

    #[test]
    fn test_unlock_allows_independent_retake() {
        let store = RecordStore::new(MemoryKeyValueStore::new());
        let training = testing::training_with_device("Infusion", "Pump", 1, 70);
        let device = training.device_types[0].clone();
        let session = Session::new("u1", "Jane Doe", Role::Trainee);
        let question_id = device.questions[0].id.clone();

        let mut first = QuizEngine::start(&store, device.clone(), &session);
        first.select_answer(&question_id, 1);
        let Advance::Completed(first_outcome) = first.advance().unwrap() else {
            panic!("expected completion");
        };
        assert!(!access::can_take_test(&device, &store.test_results().unwrap(), "u1"));

        unlock(&store, &first_outcome.result.id).unwrap();
        assert!(access::can_take_test(&device, &store.test_results().unwrap(), "u1"));

        let mut second = QuizEngine::start(&store, device.clone(), &session);
        second.select_answer(&question_id, 0);
        let Advance::Completed(second_outcome) = second.advance().unwrap() else {
            panic!("expected completion");
        };

        let history = results_for_user(&store, "u1").unwrap();
        assert_eq!(history.len(), 2);
        assert_ne!(first_outcome.result.id, second_outcome.result.id);
        assert!(!history.iter().find(|r| r.id == first_outcome.result.id).unwrap().is_locked);
        assert!(second_outcome.result.is_locked);
    }

    #[test]
    fn test_result_queries_sorted_newest_first() {
        let store = RecordStore::new(MemoryKeyValueStore::new());
        let now = Utc::now();
        let older = testing::result("u1", "d1", now - Duration::hours(1), false);
        let newer = testing::result("u1", "d1", now, true);
        let other_device = testing::result("u1", "d2", now, true);
        store
            .save_test_results(&[older.clone(), newer.clone(), other_device])
            .unwrap();

        let for_device = results_for_device(&store, "d1").unwrap();
        assert_eq!(for_device, vec![newer, older]);
        assert_eq!(results_for_user(&store, "u1").unwrap().len(), 3);
        assert!(results_for_user(&store, "u2").unwrap().is_empty());
    }
}
