//! Machine ID generation for audit trail
//!
//! Generates a stable machine identifier without collecting personal information.

use crate::error::{CliError, Result};
use std::fs;
use std::path::Path;
use uuid::Uuid;

/// Get or create the machine ID stored at `id_file`.
///
/// Format: `{hostname}-{random-suffix}`
pub fn get_machine_id(id_file: &Path) -> Result<String> {
    if let Ok(id) = fs::read_to_string(id_file) {
        let trimmed = id.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }

    let machine_id = generate_machine_id()?;

    if let Some(parent) = id_file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(id_file, &machine_id)?;

    tracing::debug!(machine_id = %machine_id, "Generated machine id");
    Ok(machine_id)
}

fn generate_machine_id() -> Result<String> {
    let hostname = hostname::get()
        .map_err(|e| CliError::audit(format!("Failed to get hostname: {e}")))?
        .to_string_lossy()
        .to_string();

    // Random suffix instead of hardware identifiers
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_string();

    Ok(format!("{}-{}", sanitize_hostname(&hostname), suffix))
}

fn sanitize_hostname(hostname: &str) -> String {
    hostname
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .take(32)
        .collect()
}
