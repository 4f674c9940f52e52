//! File store abstraction
//!
//! This module defines the [`FileStore`] trait every store backend implements,
//! plus the original-lookup logic that is shared by all of them.

use std::path::PathBuf;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use pixshrink_core::naming::{is_original_candidate, parse_optimized_filename};
use thiserror::Error;

use crate::index::OriginalIndex;

/// Store operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for store operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Chunked file contents
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Outcome of a best-effort bulk delete
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub deleted: Vec<String>,
    pub missing: Vec<String>,
    /// Filename and error message for each file that could not be removed
    pub failed: Vec<(String, String)>,
}

impl DeleteReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Flat file store
///
/// All names are plain filenames relative to the store root; see the crate
/// documentation for the rules. Missing files are an expected condition:
/// deleting one succeeds and looking one up yields `false`/`None`.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Filesystem path for a filename, after validation
    fn resolve(&self, filename: &str) -> StorageResult<PathBuf>;

    async fn exists(&self, filename: &str) -> StorageResult<bool>;

    /// Write (or replace) a file and return the number of bytes written
    async fn write(&self, filename: &str, data: &[u8]) -> StorageResult<u64>;

    async fn read(&self, filename: &str) -> StorageResult<Vec<u8>>;

    /// Size in bytes of an existing file
    async fn size(&self, filename: &str) -> StorageResult<u64>;

    /// Stream a file in chunks without loading it into memory
    async fn open_stream(&self, filename: &str) -> StorageResult<ByteStream>;

    /// Remove a file. Returns `false` when there was nothing to remove.
    async fn delete(&self, filename: &str) -> StorageResult<bool>;

    /// Names of all files in the store, in directory order
    async fn list(&self) -> StorageResult<Vec<String>>;

    /// Upload/derived pairing remembered by this store
    fn index(&self) -> &OriginalIndex;

    /// Remove every listed file, attempting each one independently.
    ///
    /// Never fails; problems are logged and collected in the report.
    async fn delete_all(&self, filenames: &[String]) -> DeleteReport {
        let mut report = DeleteReport::default();
        for filename in filenames {
            match self.delete(filename).await {
                Ok(true) => report.deleted.push(filename.clone()),
                Ok(false) => report.missing.push(filename.clone()),
                Err(e) => {
                    tracing::warn!(
                        filename = %filename,
                        error = %e,
                        "Failed to delete file"
                    );
                    report.failed.push((filename.clone(), e.to_string()));
                }
            }
        }
        report
    }

    /// Find the upload a derived file was produced from.
    ///
    /// The index is consulted first. Without an entry, `<base>` is parsed out
    /// of `<base>-optimized.<ext>` and the first store file that starts with
    /// `<base>` and is not itself derived wins. With several candidates the
    /// winner depends on directory order.
    async fn find_original_for(&self, optimized_filename: &str) -> StorageResult<Option<String>> {
        if let Some(original) = self.index().get(optimized_filename) {
            if self.exists(&original).await? {
                return Ok(Some(original));
            }
        }

        let Some(base) = parse_optimized_filename(optimized_filename) else {
            return Ok(None);
        };

        let original = self
            .list()
            .await?
            .into_iter()
            .find(|candidate| is_original_candidate(candidate, base));

        Ok(original)
    }

    fn record_original(&self, optimized_filename: &str, original_filename: &str) {
        self.index().insert(optimized_filename, original_filename);
    }

    fn forget(&self, optimized_filename: &str) {
        self.index().remove(optimized_filename);
    }
}
