use crate::error::{CliError, Result};
use medtrain_common::types::Session;
use std::io::Write;
use std::path::PathBuf;

/// The `session.json` file of a data directory
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<Option<Session>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// The stored session, or [`CliError::NotLoggedIn`]
    pub fn require(&self) -> Result<Session> {
        self.load()?.ok_or(CliError::NotLoggedIn)
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| CliError::config("Session path has no parent directory"))?;
        std::fs::create_dir_all(dir)?;

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(serde_json::to_string_pretty(session)?.as_bytes())?;
        temp.persist(&self.path).map_err(|e| CliError::Io(e.error))?;
        Ok(())
    }

    /// Remove the session; returns whether one existed
    pub fn clear(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use medtrain_common::types::Role;
    use tempfile::TempDir;

    #[test]
    fn test_session_lifecycle() {
        let temp = TempDir::new().unwrap();
        let sessions = SessionStore::new(temp.path().join("session.json"));

        assert!(sessions.load().unwrap().is_none());
        assert!(matches!(sessions.require(), Err(CliError::NotLoggedIn)));

        let session = Session::new("u1", "Jane Doe", Role::Trainee);
        sessions.save(&session).unwrap();
        assert_eq!(sessions.require().unwrap(), session);

        assert!(sessions.clear().unwrap());
        assert!(!sessions.clear().unwrap());
    }
}
