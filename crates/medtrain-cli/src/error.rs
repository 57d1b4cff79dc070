//! Error types for the MedTrain CLI
//!
//! Every variant renders as a user-facing message that says what went wrong
//! and what to do next.

use medtrain_common::CommonError;
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Error type for CLI and library operations
#[derive(Error, Debug)]
pub enum CliError {
    /// Form input rejected; nothing was changed
    #[error("Invalid input: {0}. Nothing was changed.")]
    Validation(String),

    /// Username/password mismatch. Deliberately silent about which part failed.
    #[error("Invalid username or password.")]
    InvalidCredentials,

    /// No stored session
    #[error("Not logged in. Run 'medtrain login' first.")]
    NotLoggedIn,

    /// Stored session refers to an account that no longer exists
    #[error("Session for '{0}' is no longer valid. Run 'medtrain login' again.")]
    StaleSession(String),

    /// Command needs the admin role
    #[error("'{0}' requires an administrator account.")]
    AdminRequired(String),

    /// Latest attempt is still locked
    #[error("The test for '{0}' is locked after your last attempt. Contact an administrator to unlock it.")]
    TestLocked(String),

    /// Device has no questions yet
    #[error("Device '{0}' has no test questions yet. Contact an administrator.")]
    NoQuiz(String),

    /// Device not covered by any active grant
    #[error("Device '{0}' is not available to you today. Contact an administrator to extend your access.")]
    NotAuthorized(String),

    #[error("User '{0}' not found. Run 'medtrain user list' to see existing accounts.")]
    UserNotFound(String),

    #[error("Username '{0}' is already taken.")]
    UsernameTaken(String),

    #[error("Training '{0}' not found. Run 'medtrain training list' to see available trainings.")]
    TrainingNotFound(String),

    #[error("Device '{0}' not found. Run 'medtrain device list' to see available devices.")]
    DeviceNotFound(String),

    #[error("Question '{0}' not found. Run 'medtrain question list <device>' to see its questions.")]
    QuestionNotFound(String),

    #[error("Test result '{0}' not found. Run 'medtrain result list' to see recorded results.")]
    ResultNotFound(String),

    /// Device has no uploaded manual, or its file is missing
    #[error("No manual has been uploaded for device '{0}'.")]
    NoDocument(String),

    /// Certificate requested without a passing result
    #[error("No passed test found for device '{0}'. A certificate is issued only after passing.")]
    NotPassed(String),

    /// Certificate rendering failed; no file was written
    #[error("Certificate rendering failed: {0}. No file was written.")]
    Render(String),

    /// Password hashing or hash parsing failed
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    /// Data directory has no database yet
    #[error("Data directory not initialized: '{0}'. Run 'medtrain init' first.")]
    NotInitialized(String),

    /// Data directory already has a database
    #[error("Data directory already initialized: '{0}'. Use --force to reinitialize.")]
    AlreadyInitialized(String),

    /// Record store or audit database failure
    #[error("Database error: {0}. The data directory may be corrupted; check 'medtrain audit verify'.")]
    Database(#[from] rusqlite::Error),

    /// Record store failure outside SQLite itself (lock poisoning, corrupt blob)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Audit trail operation failed
    #[error("Audit trail error: {0}")]
    Audit(String),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your environment variables or config.toml.")]
    Config(String),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}. Check the file syntax.")]
    JsonParse(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("Failed to parse config.toml: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to write config.toml: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    /// Interactive prompt failed or was cancelled
    #[error("Prompt cancelled: {0}")]
    Prompt(String),

    /// Domain-level error from the common crate
    #[error(transparent)]
    Common(#[from] CommonError),

    /// Generic anyhow error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create an audit error
    pub fn audit(msg: impl Into<String>) -> Self {
        Self::Audit(msg.into())
    }

    /// Create a render error
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Create an admin-required error for the named operation
    pub fn admin_required(operation: impl Into<String>) -> Self {
        Self::AdminRequired(operation.into())
    }
}

impl From<inquire::InquireError> for CliError {
    fn from(err: inquire::InquireError) -> Self {
        Self::Prompt(err.to_string())
    }
}
