//! Shared filename validation for store backends.

use crate::traits::{StorageError, StorageResult};

/// Checks that `filename` names a file directly inside the store root.
pub fn validate_filename(filename: &str) -> StorageResult<()> {
    let invalid = |reason: &str| Err(StorageError::InvalidFilename(format!("{filename:?}: {reason}")));

    if filename.is_empty() {
        return invalid("empty filename");
    }
    if filename == "." || filename.contains("..") {
        return invalid("filename contains a parent reference");
    }
    if filename.contains('/') || filename.contains('\\') {
        return invalid("filename contains a path separator");
    }
    if filename.contains('\0') {
        return invalid("filename contains NUL");
    }
    Ok(())
}
