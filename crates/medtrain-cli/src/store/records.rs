use super::kv::KeyValueStore;
use crate::error::Result;
use medtrain_common::types::{DeviceType, TestResult, Training, User};
use serde::{de::DeserializeOwned, Serialize};

pub const USERS_KEY: &str = "users";
pub const TRAININGS_KEY: &str = "trainings";
pub const TEST_RESULTS_KEY: &str = "testResults";

/// Typed access to the persisted collections.
///
/// Each load reads the whole entry and each save replaces it. A missing entry
/// reads as an empty collection; a malformed one is a parse error.
pub struct RecordStore<S> {
    kv: S,
}

impl<S: KeyValueStore> RecordStore<S> {
    pub fn new(kv: S) -> Self {
        Self { kv }
    }

    pub fn kv(&self) -> &S {
        &self.kv
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        match self.kv.get(key)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn save<T: Serialize>(&self, key: &str, items: &[T]) -> Result<()> {
        let raw = serde_json::to_string(items)?;
        self.kv.set(key, &raw)?;
        tracing::trace!(key, count = items.len(), "Saved collection");
        Ok(())
    }

    pub fn users(&self) -> Result<Vec<User>> {
        self.load(USERS_KEY)
    }

    pub fn save_users(&self, users: &[User]) -> Result<()> {
        self.save(USERS_KEY, users)
    }

    pub fn trainings(&self) -> Result<Vec<Training>> {
        self.load(TRAININGS_KEY)
    }

    pub fn save_trainings(&self, trainings: &[Training]) -> Result<()> {
        self.save(TRAININGS_KEY, trainings)
    }

    pub fn test_results(&self) -> Result<Vec<TestResult>> {
        self.load(TEST_RESULTS_KEY)
    }

    pub fn save_test_results(&self, results: &[TestResult]) -> Result<()> {
        self.save(TEST_RESULTS_KEY, results)
    }

    pub fn append_test_result(&self, result: TestResult) -> Result<()> {
        let mut results = self.test_results()?;
        results.push(result);
        self.save_test_results(&results)
    }

    pub fn find_user(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.users()?.into_iter().find(|user| user.id == user_id))
    }

    /// Exact, case-sensitive username match
    pub fn find_user_by_name(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .users()?
            .into_iter()
            .find(|user| user.username == username))
    }

    /// Apply `f` to one user and persist; `None` if the id is unknown
    pub fn update_user<R>(&self, user_id: &str, f: impl FnOnce(&mut User) -> R) -> Result<Option<R>> {
        let mut users = self.users()?;
        let Some(user) = users.iter_mut().find(|user| user.id == user_id) else {
            return Ok(None);
        };
        let out = f(user);
        self.save_users(&users)?;
        Ok(Some(out))
    }

    pub fn find_training(&self, training_id: &str) -> Result<Option<Training>> {
        Ok(self
            .trainings()?
            .into_iter()
            .find(|training| training.id == training_id))
    }

    /// Locate a device in the flattened device list, with its training
    pub fn find_device(&self, device_id: &str) -> Result<Option<(Training, DeviceType)>> {
        for training in self.trainings()? {
            if let Some(device) = training.device(device_id) {
                let device = device.clone();
                return Ok(Some((training, device)));
            }
        }
        Ok(None)
    }

    /// Apply `f` to one device and persist; `None` if the id is unknown
    pub fn update_device<R>(
        &self,
        device_id: &str,
        f: impl FnOnce(&mut DeviceType) -> R,
    ) -> Result<Option<R>> {
        let mut trainings = self.trainings()?;
        let Some(device) = trainings
            .iter_mut()
            .find_map(|training| training.device_mut(device_id))
        else {
            return Ok(None);
        };
        let out = f(device);
        self.save_trainings(&trainings)?;
        Ok(Some(out))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use crate::store::MemoryKeyValueStore;
    use crate::testing;
    use chrono::Utc;

    #[test]
    fn test_missing_entries_read_empty() {
        let store = RecordStore::new(MemoryKeyValueStore::new());
        assert!(store.users().unwrap().is_empty());
        assert!(store.trainings().unwrap().is_empty());
        assert!(store.test_results().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_entry_is_error() {
        let store = RecordStore::new(MemoryKeyValueStore::new());
        store.kv().set(USERS_KEY, "{not json").unwrap();
        assert!(matches!(store.users(), Err(CliError::JsonParse(_))));
    }

    #[test]
    fn test_training_graph_round_trip() {
        let store = RecordStore::new(MemoryKeyValueStore::new());
        let training = testing::training_with_device("Infusion", "Volumetric pump", 2, 70);

        store.save_trainings(std::slice::from_ref(&training)).unwrap();
        assert_eq!(store.trainings().unwrap(), vec![training]);
    }

    #[test]
    fn test_find_and_update_device() {
        let store = RecordStore::new(MemoryKeyValueStore::new());
        let training = testing::training_with_device("Infusion", "Volumetric pump", 1, 70);
        let device_id = training.device_types[0].id.clone();
        store.save_trainings(&[training.clone()]).unwrap();

        let (owner, device) = store.find_device(&device_id).unwrap().unwrap();
        assert_eq!(owner.id, training.id);
        assert_eq!(device.title, "Volumetric pump");

        let updated = store
            .update_device(&device_id, |device| device.passing_percentage = 90)
            .unwrap();
        assert!(updated.is_some());
        assert_eq!(store.find_device(&device_id).unwrap().unwrap().1.passing_percentage, 90);

        assert!(store.update_device("missing", |_| ()).unwrap().is_none());
    }

    #[test]
    fn test_append_test_result_and_user_lookup() {
        let store = RecordStore::new(MemoryKeyValueStore::new());
        let user = testing::trainee("Jane Doe");
        store.save_users(&[user.clone()]).unwrap();

        store
            .append_test_result(testing::result(&user.id, "d1", Utc::now(), true))
            .unwrap();
        store
            .append_test_result(testing::result(&user.id, "d1", Utc::now(), false))
            .unwrap();

        assert_eq!(store.test_results().unwrap().len(), 2);
        assert_eq!(store.find_user_by_name("Jane Doe").unwrap().unwrap().id, user.id);
        assert!(store.find_user_by_name("jane doe").unwrap().is_none());
    }
}
