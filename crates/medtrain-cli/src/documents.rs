//! Device manuals
//!
//! Uploads are PDF only and capped at 10 MiB. Every upload creates a new
//! document version; every download is recorded on the document once the
//! file has been written.

use crate::blob::{BlobHandle, BlobStore};
use crate::certificate::write_file_atomically;
use crate::error::{CliError, Result};
use crate::store::{KeyValueStore, RecordStore};
use chrono::Utc;
use medtrain_common::types::{new_id, DeviceDocument, DocumentDownload, Session};
use std::path::{Path, PathBuf};

/// Largest accepted upload
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// Readers accept the header anywhere in the first KiB
const SIGNATURE_WINDOW: usize = 1024;

/// Content type sniffed from the leading bytes
pub fn detect_mime(bytes: &[u8]) -> mime::Mime {
    let window = &bytes[..bytes.len().min(SIGNATURE_WINDOW)];
    if window
        .windows(PDF_SIGNATURE.len())
        .any(|candidate| candidate == PDF_SIGNATURE)
    {
        mime::APPLICATION_PDF
    } else {
        mime::APPLICATION_OCTET_STREAM
    }
}

/// Reject anything that is not a non-empty PDF of at most 10 MiB
pub fn validate_upload(file_name: &str, bytes: &[u8]) -> Result<mime::Mime> {
    if file_name.trim().is_empty() {
        return Err(CliError::validation("file name is empty"));
    }
    if bytes.is_empty() {
        return Err(CliError::validation(format!("'{file_name}' is empty")));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(CliError::validation(format!(
            "'{file_name}' is {} but at most {} is allowed",
            crate::progress::format_bytes(bytes.len() as u64),
            crate::progress::format_bytes(MAX_UPLOAD_BYTES as u64)
        )));
    }

    let detected = detect_mime(bytes);
    if detected != mime::APPLICATION_PDF {
        return Err(CliError::validation(format!(
            "'{file_name}' is not a PDF (detected {detected})"
        )));
    }
    Ok(detected)
}

/// Store a new manual version for a device
pub fn upload<S: KeyValueStore, B: BlobStore + ?Sized>(
    store: &RecordStore<S>,
    blobs: &B,
    device_id: &str,
    file_name: &str,
    bytes: &[u8],
) -> Result<DeviceDocument> {
    validate_upload(file_name, bytes)?;

    let (_, device) = store
        .find_device(device_id)?
        .ok_or_else(|| CliError::DeviceNotFound(device_id.to_string()))?;

    let handle = blobs.put(bytes)?;
    let file_name = Path::new(file_name)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());

    let document = DeviceDocument {
        id: new_id(),
        device_id: device.id.clone(),
        file_name,
        file_size: bytes.len() as u64,
        upload_date: Utc::now(),
        version: DeviceDocument::next_version(device.documentation.as_ref()),
        downloads: Vec::new(),
        file_handle: Some(handle.to_string()),
    };

    let stored = document.clone();
    store
        .update_device(device_id, move |device| device.documentation = Some(stored))?
        .ok_or_else(|| CliError::DeviceNotFound(device_id.to_string()))?;

    tracing::info!(
        device_id,
        document_id = %document.id,
        version = %document.version,
        size = document.file_size,
        "Manual uploaded"
    );
    Ok(document)
}

/// A manual handed out to a user
#[derive(Debug, Clone)]
pub struct DownloadedDocument {
    pub file_name: String,
    pub path: PathBuf,
    pub download: DocumentDownload,
}

/// Save a device's manual into `output_dir` and record the download.
///
/// Nothing is recorded unless the file was written.
pub fn download<S: KeyValueStore, B: BlobStore + ?Sized>(
    store: &RecordStore<S>,
    blobs: &B,
    device_id: &str,
    identity: &Session,
    output_dir: &Path,
) -> Result<DownloadedDocument> {
    let (_, device) = store
        .find_device(device_id)?
        .ok_or_else(|| CliError::DeviceNotFound(device_id.to_string()))?;

    let no_document = || CliError::NoDocument(device.title.clone());
    let document = device.documentation.as_ref().ok_or_else(no_document)?;
    let raw_handle = document.file_handle.as_deref().ok_or_else(no_document)?;
    let handle = BlobHandle::parse(raw_handle)?;
    let bytes = blobs.get(&handle)?.ok_or_else(|| {
        tracing::warn!(device_id, handle = %handle, "Manual metadata present but blob missing");
        no_document()
    })?;

    let path = write_file_atomically(output_dir, &document.file_name, &bytes)?;

    let download = DocumentDownload {
        id: new_id(),
        user_id: identity.user_id.clone(),
        username: identity.username.clone(),
        document_id: document.id.clone(),
        download_date: Utc::now(),
    };

    let recorded = download.clone();
    store.update_device(device_id, move |device| {
        if let Some(document) = device.documentation.as_mut() {
            document.downloads.push(recorded);
        }
    })?;

    tracing::info!(
        device_id,
        document_id = %document.id,
        user_id = %identity.user_id,
        path = %path.display(),
        "Manual downloaded"
    );

    Ok(DownloadedDocument {
        file_name: document.file_name.clone(),
        path,
        download,
    })
}
