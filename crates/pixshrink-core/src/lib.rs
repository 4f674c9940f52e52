//! Pixshrink Core Library
//!
//! Domain models, error types, configuration and naming rules shared by every
//! pixshrink component.

pub mod config;
pub mod constants;
pub mod error;
pub mod format;
pub mod hooks;
pub mod models;
pub mod naming;

// Re-export commonly used types
pub use config::{BaseConfig, Config, OptimizerConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use format::format_file_size;
pub use hooks::{NoOpLogSink, ProcessingLogEntry, ProcessingLogSink, TracingLogSink};
pub use models::*;
