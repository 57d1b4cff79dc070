//! Authentication
//!
//! Credentials are checked against argon2id hashes in the record store. The
//! resulting [`Session`] is kept in the data directory so later invocations
//! act as the same user.

pub mod password;
mod session;

pub use password::{hash_password, verify_password};
pub use session::SessionStore;

use crate::error::{CliError, Result};
use crate::store::{KeyValueStore, RecordStore};
use medtrain_common::types::{Session, User};

/// Turns a username and secret into a session
pub trait Authenticator {
    /// Unknown users and wrong secrets fail with the same
    /// [`CliError::InvalidCredentials`].
    fn authenticate(&self, username: &str, secret: &str) -> Result<Session>;
}

/// Authenticator over the stored user records
pub struct StoreAuthenticator<'a, S> {
    store: &'a RecordStore<S>,
}

impl<'a, S: KeyValueStore> StoreAuthenticator<'a, S> {
    pub fn new(store: &'a RecordStore<S>) -> Self {
        Self { store }
    }
}

impl<S: KeyValueStore> Authenticator for StoreAuthenticator<'_, S> {
    fn authenticate(&self, username: &str, secret: &str) -> Result<Session> {
        let Some(user) = self.store.find_user_by_name(username.trim())? else {
            // Same hashing work as a wrong password
            let _ = verify_password(secret, password::DUMMY_HASH);
            tracing::info!(username, "Login rejected");
            return Err(CliError::InvalidCredentials);
        };

        let verified = verify_password(secret, &user.password_hash).unwrap_or_else(|e| {
            tracing::warn!(user_id = %user.id, error = %e, "Stored password hash is unreadable");
            false
        });

        if !verified {
            tracing::info!(username, "Login rejected");
            return Err(CliError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, role = %user.role, "Login accepted");
        Ok(Session::new(user.id, user.username, user.role))
    }
}

/// Load the account behind a session.
///
/// The role comes from the stored record, not the session file, so a demoted
/// or deleted account loses its rights immediately.
pub fn resolve_user<S: KeyValueStore>(store: &RecordStore<S>, session: &Session) -> Result<User> {
    store
        .find_user(&session.user_id)?
        .ok_or_else(|| CliError::StaleSession(session.username.clone()))
}

/// Error unless `user` is an administrator
pub fn require_admin(user: &User, operation: &str) -> Result<()> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(CliError::admin_required(operation))
    }
}
