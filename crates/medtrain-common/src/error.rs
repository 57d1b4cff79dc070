//! Error types for MedTrain

use thiserror::Error;

/// Result type alias for MedTrain operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// Main error type shared by MedTrain crates
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Invalid checksum: {0}")]
    InvalidChecksum(String),

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Invalid question type: {0}")]
    InvalidQuestionType(String),

    #[error("Invalid question: {0}")]
    InvalidQuestion(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
