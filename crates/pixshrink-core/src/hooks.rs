//! Hooks for persisting processing history
//!
//! The optimizer records one row per successfully optimized image. Where that
//! row ends up (a database, an analytics pipeline, nowhere) is decided by the
//! embedding application through [`ProcessingLogSink`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{OutputFormat, ProcessingResult};

/// A single processing history row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingLogEntry {
    pub user_id: String,
    pub original_filename: String,
    pub original_size: u64,
    pub optimized_size: u64,
    pub format: OutputFormat,
    pub quality: u8,
    pub created_at: DateTime<Utc>,
}

impl ProcessingLogEntry {
    /// Builds a row from a successful result; failed results have nothing to log.
    pub fn from_result(user_id: &str, result: &ProcessingResult) -> Option<Self> {
        if !result.success {
            return None;
        }
        Some(Self {
            user_id: user_id.to_string(),
            original_filename: result.original_filename.clone(),
            original_size: result.original_size?,
            optimized_size: result.optimized_size?,
            format: result.format?,
            quality: result.quality?,
            created_at: Utc::now(),
        })
    }
}

/// Destination for processing history rows
///
/// Failures are reported back as strings; callers log them and carry on.
#[async_trait]
pub trait ProcessingLogSink: Send + Sync {
    async fn record(&self, entry: ProcessingLogEntry) -> Result<(), String>;
}

/// Emits each row as a structured tracing event
pub struct TracingLogSink;

#[async_trait]
impl ProcessingLogSink for TracingLogSink {
    async fn record(&self, entry: ProcessingLogEntry) -> Result<(), String> {
        tracing::info!(
            user_id = %entry.user_id,
            original_filename = %entry.original_filename,
            original_size = entry.original_size,
            optimized_size = entry.optimized_size,
            format = %entry.format,
            quality = entry.quality,
            "Image processing logged"
        );
        Ok(())
    }
}

/// No-op implementation for when history is not kept
pub struct NoOpLogSink;

#[async_trait]
impl ProcessingLogSink for NoOpLogSink {
    async fn record(&self, _entry: ProcessingLogEntry) -> Result<(), String> {
        Ok(())
    }
}
