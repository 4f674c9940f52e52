//! Pixshrink Processing Library
//!
//! Image transformation and batch orchestration: decode an upload, limit its
//! width, re-encode it in the requested format and quality, and do that for a
//! whole batch while keeping per-file failures contained.

pub mod batch;
pub mod compression;
pub mod transform;
pub mod validator;

pub use batch::BatchProcessor;
pub use compression::ImageCompressor;
pub use transform::{ImageCrateTransform, ImageTransform, TransformError, TransformOutput};
pub use validator::{UploadValidator, ValidationError};
