//! Content-addressed blob storage for device manuals
//!
//! A blob's handle is the SHA-256 of its bytes. On disk a blob lives at
//! `blobs/<first two hex chars>/<remaining hex chars>`.

use crate::error::{CliError, Result};
use medtrain_common::checksum;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// SHA-256 hex handle of stored content
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobHandle(String);

impl BlobHandle {
    /// Handle for the given content
    pub fn for_content(bytes: &[u8]) -> Self {
        Self(checksum::sha256_hex(bytes))
    }

    /// Parse a stored handle; anything but 64 hex chars is rejected
    pub fn parse(raw: &str) -> Result<Self> {
        checksum::validate_sha256_hex(raw)?;
        Ok(Self(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Durable byte storage keyed by content hash
pub trait BlobStore: Send + Sync {
    /// Store bytes; identical content yields the same handle
    fn put(&self, bytes: &[u8]) -> Result<BlobHandle>;

    /// Fetch bytes, `None` when the handle is unknown
    fn get(&self, handle: &BlobHandle) -> Result<Option<Vec<u8>>>;

    fn contains(&self, handle: &BlobHandle) -> Result<bool>;
}

/// Blob store on the local file system
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, handle: &BlobHandle) -> PathBuf {
        let (prefix, rest) = handle.as_str().split_at(2);
        self.root.join(prefix).join(rest)
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, bytes: &[u8]) -> Result<BlobHandle> {
        let handle = BlobHandle::for_content(bytes);
        let path = self.path_for(&handle);

        if path.exists() {
            tracing::debug!(handle = %handle, "Blob already stored");
            return Ok(handle);
        }

        let dir = path
            .parent()
            .ok_or_else(|| CliError::storage(format!("Invalid blob path '{}'", path.display())))?;
        std::fs::create_dir_all(dir)?;

        // Write next to the target so the rename stays on one file system
        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(&path).map_err(|e| CliError::Io(e.error))?;

        tracing::debug!(handle = %handle, size = bytes.len(), "Stored blob");
        Ok(handle)
    }

    fn get(&self, handle: &BlobHandle) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(handle);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        checksum::verify_checksum(&bytes, handle.as_str()).inspect_err(|_| {
            tracing::error!(handle = %handle, path = %path.display(), "Blob content does not match its handle");
        })?;
        Ok(Some(bytes))
    }

    fn contains(&self, handle: &BlobHandle) -> Result<bool> {
        Ok(self.path_for(handle).is_file())
    }
}

/// In-memory blob store for tests
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<BlobHandle, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<BlobHandle, Vec<u8>>>> {
        self.blobs
            .lock()
            .map_err(|e| CliError::storage(format!("Failed to acquire blob lock: {e}")))
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, bytes: &[u8]) -> Result<BlobHandle> {
        let handle = BlobHandle::for_content(bytes);
        self.lock()?
            .entry(handle.clone())
            .or_insert_with(|| bytes.to_vec());
        Ok(handle)
    }

    fn get(&self, handle: &BlobHandle) -> Result<Option<Vec<u8>>> {
        Ok(self.lock()?.get(handle).cloned())
    }

    fn contains(&self, handle: &BlobHandle) -> Result<bool> {
        Ok(self.lock()?.contains_key(handle))
    }
}
