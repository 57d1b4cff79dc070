//! MedTrain Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared domain types, utilities, and error handling for the MedTrain project.
//!
//! # Overview
//!
//! This crate provides common functionality used across all MedTrain workspace members:
//!
//! - **Types**: Users and permission grants, trainings with their device types,
//!   quiz questions, device manuals, test results and login sessions
//! - **Error Handling**: Custom error types and result types
//! - **Checksums**: Content addressing and integrity verification
//! - **Logging**: Centralized `tracing` subscriber setup
//!
//! # Example
//!
//! ```no_run
//! use medtrain_common::{Result, checksum};
//!
//! fn fingerprint(manual: &[u8]) -> Result<()> {
//!     let digest = checksum::sha256_hex(manual);
//!     checksum::verify_checksum(manual, &digest)?;
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{CommonError, Result};
