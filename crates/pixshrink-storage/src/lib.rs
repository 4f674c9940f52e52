//! Pixshrink Storage Library
//!
//! A flat directory of uploaded and derived image files, behind the
//! [`FileStore`] trait.
//!
//! # Filename rules
//!
//! Every file lives directly in the store root. Names must not be empty, must
//! not be `.` or `..`, and must not contain path separators, `..` or NUL.
//! Validation is centralized in the `names` module so every backend agrees.

pub mod index;
pub mod local;
pub(crate) mod names;
pub mod traits;

// Re-export commonly used types
pub use index::OriginalIndex;
pub use local::LocalFileStore;
pub use traits::{ByteStream, DeleteReport, FileStore, StorageError, StorageResult};
