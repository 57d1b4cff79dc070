//! Access control
//!
//! Pure functions deciding what a user may see and whether a device's test
//! can be taken right now. Missing or malformed grants mean "no access",
//! never an error.

use chrono::NaiveDate;
use medtrain_common::types::{DeviceType, TestResult, Training, User};

/// Whether `viewer` may see `device` of `training` on `today`.
///
/// Administrators see everything. Trainees need a grant for this training
/// that lists the device and whose window contains `today` (both ends
/// inclusive).
pub fn is_device_visible(viewer: &User, training: &Training, device: &DeviceType, today: NaiveDate) -> bool {
    if viewer.is_admin() {
        return true;
    }

    viewer
        .permissions
        .grants_for(&training.id)
        .any(|grant| grant.authorizes(&training.id, &device.id, today))
}

/// A trainee sees a training when at least one of its devices is visible
pub fn is_training_visible(viewer: &User, training: &Training, today: NaiveDate) -> bool {
    viewer.is_admin()
        || training
            .device_types
            .iter()
            .any(|device| is_device_visible(viewer, training, device, today))
}

/// Copy of `trainings` reduced to what `viewer` may see on `today`
pub fn visible_trainings(viewer: &User, trainings: &[Training], today: NaiveDate) -> Vec<Training> {
    trainings
        .iter()
        .filter(|training| is_training_visible(viewer, training, today))
        .map(|training| Training {
            device_types: training
                .device_types
                .iter()
                .filter(|device| is_device_visible(viewer, training, device, today))
                .cloned()
                .collect(),
            ..training.clone()
        })
        .collect()
}

/// Most recent result of `user_id` for `device_id`.
///
/// Equal timestamps resolve to the result stored last.
pub fn latest_result<'a>(results: &'a [TestResult], user_id: &str, device_id: &str) -> Option<&'a TestResult> {
    results
        .iter()
        .filter(|result| result.belongs_to(user_id, device_id))
        .max_by_key(|result| result.timestamp)
}

/// Whether `user_id` may start the test of `device` now.
///
/// A device without questions can never be taken. Otherwise the first
/// attempt is always allowed and later ones only while the latest result is
/// unlocked.
pub fn can_take_test(device: &DeviceType, results: &[TestResult], user_id: &str) -> bool {
    if !device.has_quiz() {
        return false;
    }

    match latest_result(results, user_id, &device.id) {
        Some(latest) => !latest.is_locked,
        None => true,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::testing::{self, day};
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    #[test]
    fn test_admin_sees_everything() {
        let admin = testing::admin("root");
        let training = testing::training_with_device("Infusion", "Pump", 1, 70);
        assert!(is_device_visible(&admin, &training, &training.device_types[0], day(1999, 1, 1)));
        assert!(is_training_visible(&admin, &training, day(1999, 1, 1)));
    }

    #[test]
    fn test_grant_window_boundaries() {
        let training = testing::training_with_device("Infusion", "Pump", 1, 70);
        let device = &training.device_types[0];
        let mut user = testing::trainee("Jane");
        user.permissions.trainings.push(testing::grant(
            &training,
            day(2026, 3, 1),
            day(2026, 3, 31),
            &[device.id.as_str()],
        ));

        assert!(!is_device_visible(&user, &training, device, day(2026, 2, 28)));
        assert!(is_device_visible(&user, &training, device, day(2026, 3, 1)));
        assert!(is_device_visible(&user, &training, device, day(2026, 3, 31)));
        assert!(!is_device_visible(&user, &training, device, day(2026, 4, 1)));
    }

    #[test]
    fn test_grant_for_other_training_does_not_leak() {
        let training = testing::training_with_device("Infusion", "Pump", 1, 70);
        let other = testing::training_with_device("Imaging", "Ultrasound", 1, 70);
        let device = &training.device_types[0];
        let mut user = testing::trainee("Jane");
        user.permissions.trainings.push(testing::grant(
            &other,
            day(2026, 1, 1),
            day(2026, 12, 31),
            &[device.id.as_str()],
        ));

        assert!(!is_device_visible(&user, &training, device, day(2026, 6, 1)));
    }

    #[test]
    fn test_empty_device_set_grants_nothing() {
        let training = testing::training_with_device("Infusion", "Pump", 1, 70);
        let mut user = testing::trainee("Jane");
        user.permissions
            .trainings
            .push(testing::grant(&training, day(2026, 1, 1), day(2026, 12, 31), &[]));

        assert!(!is_training_visible(&user, &training, day(2026, 6, 1)));
        assert!(visible_trainings(&user, &[training], day(2026, 6, 1)).is_empty());
    }

    #[test]
    fn test_visible_trainings_filters_devices() {
        let mut training = testing::training_with_device("Infusion", "Pump", 1, 70);
        training
            .device_types
            .push(testing::device(&training.id, "Syringe driver", 1, 70));
        let granted = training.device_types[1].id.clone();

        let mut user = testing::trainee("Jane");
        user.permissions.trainings.push(testing::grant(
            &training,
            day(2026, 1, 1),
            day(2026, 12, 31),
            &[granted.as_str()],
        ));

        let visible = visible_trainings(&user, &[training], day(2026, 6, 1));
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].device_types.len(), 1);
        assert_eq!(visible[0].device_types[0].id, granted);
    }

    #[test]
    fn test_can_take_test_rules() {
        let training = testing::training_with_device("Infusion", "Pump", 2, 70);
        let device = &training.device_types[0];
        let empty = testing::device(&training.id, "Empty", 0, 70);
        let t0 = Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap();

        assert!(!can_take_test(&empty, &[], "u1"));
        assert!(can_take_test(device, &[], "u1"));

        let locked = testing::result("u1", &device.id, t0, true);
        assert!(!can_take_test(device, &[locked.clone()], "u1"));
        assert!(can_take_test(device, &[locked.clone()], "u2"));

        let unlocked_later = testing::result("u1", &device.id, t0 + Duration::minutes(5), false);
        assert!(can_take_test(device, &[locked.clone(), unlocked_later.clone()], "u1"));

        // Order of storage does not matter, only timestamps
        assert!(can_take_test(device, &[unlocked_later, locked], "u1"));
    }

    #[test]
    fn test_timestamp_tie_prefers_last_stored() {
        let training = testing::training_with_device("Infusion", "Pump", 1, 70);
        let device = &training.device_types[0];
        let t0 = Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap();

        let first = testing::result("u1", &device.id, t0, true);
        let second = testing::result("u1", &device.id, t0, false);
        assert!(can_take_test(device, &[first.clone(), second.clone()], "u1"));
        assert!(!can_take_test(device, &[second, first], "u1"));
    }

    proptest! {
        #[test]
        fn prop_visibility_matches_window(
            from_offset in 0i64..400,
            len in 0i64..120,
            probe in 0i64..600,
            listed in any::<bool>(),
        ) {
            let base = day(2025, 1, 1);
            let from = base + Duration::days(from_offset);
            let until = from + Duration::days(len);
            let today = base + Duration::days(probe);

            let training = testing::training_with_device("T", "D", 1, 70);
            let device = &training.device_types[0];
            let ids: Vec<&str> = if listed { vec![device.id.as_str()] } else { vec![] };

            let mut user = testing::trainee("p");
            user.permissions.trainings.push(testing::grant(&training, from, until, &ids));

            let expected = listed && from <= today && today <= until;
            prop_assert_eq!(is_device_visible(&user, &training, device, today), expected);
        }
    }
}
