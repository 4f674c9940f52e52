//! Constants shared across crates
//!
//! Defaults here are used when the corresponding environment variable is absent.

/// Marker inserted between the upload base name and the extension of derived files.
pub const OPTIMIZED_MARKER: &str = "-optimized";

/// Multipart field that carries the images to optimize.
pub const UPLOAD_FIELD_NAME: &str = "images";

pub const DEFAULT_QUALITY: u8 = 85;
pub const MIN_QUALITY: u8 = 1;
pub const MAX_QUALITY: u8 = 100;
pub const DEFAULT_FORMAT: &str = "webp";
pub const DEFAULT_MAX_WIDTH: u32 = 1920;

pub const DEFAULT_MAX_FILE_SIZE_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_MAX_FILES: usize = 20;

/// Input formats the upload filter accepts, by extension.
pub const SUPPORTED_INPUT_FORMATS: &[&str] = &["jpeg", "jpg", "png", "gif", "webp", "avif"];

/// Content types the upload filter accepts.
pub const SUPPORTED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/avif",
];

/// Prefix of every HTTP route.
pub const API_PREFIX: &str = "/api";
