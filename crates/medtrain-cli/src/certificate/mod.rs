//! Certificate rendering
//!
//! A passed result can be turned into a one-page A4 PDF, either in the
//! built-in design or following a custom template.

mod layout;
pub mod pdf;
pub mod template;

pub use template::CertificateTemplate;

use crate::error::{CliError, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Everything printed on a certificate
#[derive(Debug, Clone)]
pub struct CertificateRequest {
    pub username: String,
    pub device_title: String,
    pub training_title: String,
    /// Percentage in `0.0..=100.0`
    pub score: f64,
    pub date: NaiveDate,
    pub issuer: String,
    pub template: Option<CertificateTemplate>,
}

/// A rendered certificate
#[derive(Debug, Clone)]
pub struct Certificate {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// `Zertifikat-<username>.pdf` with whitespace runs in the name replaced by `-`
pub fn certificate_file_name(username: &str) -> Result<String> {
    let whitespace = Regex::new(r"\s+").map_err(|e| CliError::render(e.to_string()))?;
    Ok(format!("Zertifikat-{}.pdf", whitespace.replace_all(username, "-")))
}

/// One decimal place
pub fn format_score(score: f64) -> String {
    format!("{score:.1}")
}

/// German date notation
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// Render synchronously
pub fn render(request: &CertificateRequest) -> Result<Certificate> {
    let bytes = match request.template.as_ref() {
        Some(template) => {
            template.validate()?;
            layout::custom(request, template)?
        }
        None => layout::standard(request)?,
    };

    tracing::debug!(
        device = %request.device_title,
        user = %request.username,
        size = bytes.len(),
        custom = request.template.is_some(),
        "Certificate rendered"
    );

    Ok(Certificate {
        file_name: certificate_file_name(&request.username)?,
        bytes,
    })
}

/// Render on the blocking pool
pub async fn render_async(request: CertificateRequest) -> Result<Certificate> {
    tokio::task::spawn_blocking(move || render(&request))
        .await
        .map_err(|e| CliError::render(format!("render task failed: {e}")))?
}

/// Write the certificate into `dir`, replacing any file of the same name
pub fn write_atomically(dir: &Path, certificate: &Certificate) -> Result<PathBuf> {
    write_file_atomically(dir, &certificate.file_name, &certificate.bytes)
}

/// Write `bytes` to `dir/file_name` through a temporary file in `dir`, so the
/// target either appears complete or not at all
pub(crate) fn write_file_atomically(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let target = dir.join(file_name);

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    std::io::Write::write_all(&mut temp, bytes)?;
    temp.persist(&target).map_err(|e| CliError::Io(e.error))?;

    Ok(target)
}
