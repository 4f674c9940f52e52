//! Pixshrink Infrastructure Library
//!
//! Shared infrastructure used by the HTTP service:
//! - Middleware (request ID, security headers)
//! - Telemetry initialization
//! - Error response body
//! - Rate limiting
//! - Post-download cleanup
//! - ZIP archive creation

#[cfg(feature = "middleware")]
pub mod middleware;

#[cfg(feature = "observability-basic")]
pub mod telemetry;

pub mod error;

#[cfg(feature = "rate-limit")]
pub mod rate_limit;

#[cfg(feature = "cleanup")]
pub mod cleanup;

#[cfg(feature = "archive")]
pub mod archive;

// Re-export commonly used types
#[cfg(feature = "middleware")]
pub use middleware::{
    get_request_id, request_id_middleware, security_headers_middleware, RequestId,
    SecurityHeaders,
};

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry, LogFormat};

pub use error::ErrorResponse;

#[cfg(feature = "rate-limit")]
pub use rate_limit::{RateLimitStatus, RateLimiter};

#[cfg(feature = "cleanup")]
pub use cleanup::{collect_cleanup_targets, schedule_cleanup, CleanupStream, CleanupTrigger};

#[cfg(feature = "archive")]
pub use archive::{create_zip_archive, ArchiveBody, ArchiveError, ZipArchiveStream};
