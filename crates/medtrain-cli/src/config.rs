//! Configuration management for the MedTrain CLI
//!
//! Resolution order: built-in defaults, then `config.toml` in the data
//! directory, then environment variables (`.env` is loaded first by `main`).

use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ============================================================================
// CLI Configuration Constants
// ============================================================================

/// Issuer printed on certificates when nothing else is configured
pub const DEFAULT_ISSUER: &str = "Reinhold Medizintechnik";

/// Name of the data directory below the platform data dir
pub const DATA_DIR_NAME: &str = "medtrain";

pub const ENV_DATA_DIR: &str = "MEDTRAIN_DATA_DIR";
pub const ENV_ISSUER: &str = "MEDTRAIN_ISSUER";
pub const ENV_TEMPLATE: &str = "MEDTRAIN_TEMPLATE";

const DATABASE_FILE: &str = "medtrain.db";
const BLOBS_DIR: &str = "blobs";
const SESSION_FILE: &str = "session.json";
const CONFIG_FILE: &str = "config.toml";
const TEMPLATE_FILE: &str = "certificate-template.json";
const MACHINE_ID_FILE: &str = "machine-id";

/// Keys accepted by `medtrain config get|set`
pub const CONFIG_KEYS: &[&str] = &["issuer", "template"];

/// Persisted subset of the configuration (`config.toml`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,
}

impl FileConfig {
    /// Read `config.toml`; a missing file is an empty config
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Ok(toml::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        match key {
            "issuer" => Ok(self.issuer.clone()),
            "template" => Ok(self.template.as_ref().map(|p| p.display().to_string())),
            other => Err(unknown_key(other)),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "issuer" => self.issuer = (!value.is_empty()).then(|| value.to_string()),
            "template" => self.template = (!value.is_empty()).then(|| PathBuf::from(value)),
            other => return Err(unknown_key(other)),
        }
        Ok(())
    }
}

fn unknown_key(key: &str) -> CliError {
    CliError::config(format!(
        "Unknown key '{key}'. Valid keys: {}",
        CONFIG_KEYS.join(", ")
    ))
}

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory holding the database, blobs and session
    pub data_dir: PathBuf,

    /// Issuer name printed on certificates
    pub issuer: String,

    /// Certificate template override
    #[serde(default)]
    pub template: Option<PathBuf>,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,
}

impl Config {
    /// Create a config with default values for a data directory
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            issuer: DEFAULT_ISSUER.to_string(),
            template: None,
            verbose: false,
        }
    }

    /// Platform default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|dir| dir.join(DATA_DIR_NAME))
            .ok_or_else(|| {
                CliError::config(format!(
                    "Could not determine a data directory; set {ENV_DATA_DIR}"
                ))
            })
    }

    /// Resolve defaults, `config.toml` and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Like [`Config::load`], with an explicit data directory taking
    /// precedence over `MEDTRAIN_DATA_DIR`
    pub fn load_from(data_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => match std::env::var(ENV_DATA_DIR) {
                Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
                _ => Self::default_data_dir()?,
            },
        };

        let mut config = Self::new(data_dir);
        config.apply_file(&FileConfig::load(&config.config_path())?);
        config.apply_env();
        Ok(config)
    }

    fn apply_file(&mut self, file: &FileConfig) {
        if let Some(ref issuer) = file.issuer {
            self.issuer = issuer.clone();
        }
        if let Some(ref template) = file.template {
            self.template = Some(template.clone());
        }
    }

    fn apply_env(&mut self) {
        if let Ok(issuer) = std::env::var(ENV_ISSUER) {
            if !issuer.trim().is_empty() {
                self.issuer = issuer;
            }
        }

        if let Ok(template) = std::env::var(ENV_TEMPLATE) {
            if !template.trim().is_empty() {
                self.template = Some(PathBuf::from(template));
            }
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    pub fn blobs_dir(&self) -> PathBuf {
        self.data_dir.join(BLOBS_DIR)
    }

    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILE)
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE)
    }

    pub fn machine_id_path(&self) -> PathBuf {
        self.data_dir.join(MACHINE_ID_FILE)
    }

    /// Template in effect: the configured one, else the file saved by
    /// `certificate template import`
    pub fn template_path(&self) -> PathBuf {
        self.template
            .clone()
            .unwrap_or_else(|| self.data_dir.join(TEMPLATE_FILE))
    }

    /// Where `certificate template import` stores a template
    pub fn stored_template_path(&self) -> PathBuf {
        self.data_dir.join(TEMPLATE_FILE)
    }

    pub fn is_initialized(&self) -> bool {
        self.database_path().exists()
    }

    /// Error unless `medtrain init` has run for this data directory
    pub fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(CliError::NotInitialized(self.data_dir.display().to_string()))
        }
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_config_paths() {
        let config = Config::new("/srv/medtrain");
        assert_eq!(config.issuer, DEFAULT_ISSUER);
        assert_eq!(config.database_path(), PathBuf::from("/srv/medtrain/medtrain.db"));
        assert_eq!(config.blobs_dir(), PathBuf::from("/srv/medtrain/blobs"));
        assert_eq!(
            config.template_path(),
            PathBuf::from("/srv/medtrain/certificate-template.json")
        );
        assert!(!config.is_initialized());
    }

    #[test]
    #[serial]
    fn test_config_layers() {
        let temp = TempDir::new().unwrap();
        let mut file = FileConfig::default();
        file.set("issuer", "Acme Clinic Training").unwrap();
        file.set("template", "/tmp/cert.json").unwrap();
        file.save(&temp.path().join("config.toml")).unwrap();

        std::env::set_var(ENV_DATA_DIR, temp.path());
        std::env::remove_var(ENV_ISSUER);
        std::env::remove_var(ENV_TEMPLATE);

        let config = Config::load().unwrap();
        assert_eq!(config.data_dir, temp.path());
        assert_eq!(config.issuer, "Acme Clinic Training");
        assert_eq!(config.template, Some(PathBuf::from("/tmp/cert.json")));

        std::env::set_var(ENV_ISSUER, "Env Issuer");
        let config = Config::load().unwrap();
        assert_eq!(config.issuer, "Env Issuer");

        std::env::remove_var(ENV_ISSUER);
        std::env::remove_var(ENV_DATA_DIR);
    }

    #[test]
    fn test_file_config_keys() {
        let mut file = FileConfig::default();
        assert!(file.set("server_url", "x").is_err());
        assert!(file.get("nope").is_err());

        file.set("issuer", "  ").unwrap();
        assert_eq!(file.get("issuer").unwrap(), None);
    }

    #[test]
    fn test_missing_config_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let file = FileConfig::load(&temp.path().join("config.toml")).unwrap();
        assert_eq!(file, FileConfig::default());
    }
}
