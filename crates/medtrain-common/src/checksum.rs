//! Checksum utilities for content addressing and integrity checks
//!
//! Device manuals are stored by their SHA-256 digest, so the digest doubles
//! as the blob handle.

use crate::error::{CommonError, Result};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Length of a hex-encoded SHA-256 digest
pub const SHA256_HEX_LEN: usize = 64;

/// Compute the hex SHA-256 digest of a byte slice
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Compute the hex SHA-256 digest of any readable source
pub fn compute_checksum<R: Read>(reader: &mut R) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compute the hex SHA-256 digest of a file
pub fn compute_file_checksum(path: impl AsRef<Path>) -> Result<String> {
    let mut file = std::fs::File::open(path)?;
    compute_checksum(&mut file)
}

/// Verify that data matches the expected digest
pub fn verify_checksum(data: &[u8], expected: &str) -> Result<()> {
    let actual = sha256_hex(data);
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(CommonError::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}

/// Check that a string is a well-formed hex SHA-256 digest
pub fn validate_sha256_hex(candidate: &str) -> Result<()> {
    if candidate.len() == SHA256_HEX_LEN && candidate.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(CommonError::InvalidChecksum(candidate.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_compute_checksum_matches_slice_digest() {
        let data = b"%PDF-1.7 manual";
        let mut cursor = Cursor::new(data);
        assert_eq!(compute_checksum(&mut cursor).unwrap(), sha256_hex(data));
    }

    #[test]
    fn test_compute_file_checksum() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"test data").unwrap();
        temp_file.flush().unwrap();

        assert_eq!(
            compute_file_checksum(temp_file.path()).unwrap(),
            "916f0027a575074ce72a331777c3478d6513f786a591bd892da1a577bf2335f9"
        );
    }

    #[test]
    fn test_verify_checksum() {
        let digest = sha256_hex(b"hello world");
        assert!(verify_checksum(b"hello world", &digest).is_ok());
        assert!(matches!(
            verify_checksum(b"hello there", &digest),
            Err(CommonError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_validate_sha256_hex() {
        assert!(validate_sha256_hex(&sha256_hex(b"x")).is_ok());
        assert!(validate_sha256_hex("../../etc/passwd").is_err());
        assert!(validate_sha256_hex("abc").is_err());
    }
}
