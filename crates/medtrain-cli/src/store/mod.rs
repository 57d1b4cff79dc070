//! Record store
//!
//! Three JSON-encoded entries (`users`, `trainings`, `testResults`) behind a
//! minimal key-value interface. The store is built once per invocation and
//! handed to every component that needs it.

mod kv;
mod records;
pub mod schema;

pub use kv::{open_database, KeyValueStore, MemoryKeyValueStore, SharedConnection, SqliteKeyValueStore};
pub use records::{RecordStore, TEST_RESULTS_KEY, TRAININGS_KEY, USERS_KEY};
