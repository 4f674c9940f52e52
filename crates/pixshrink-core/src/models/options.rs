use crate::constants::{MAX_QUALITY, MIN_QUALITY};
use crate::error::AppError;

use super::OutputFormat;

pub const INVALID_QUALITY_MESSAGE: &str = "Quality must be between 1 and 100";
pub const INVALID_FORMAT_MESSAGE: &str = "Invalid format. Allowed: webp, jpeg, png, avif";

/// Per-batch transformation options, validated once and then shared read-only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingOptions {
    pub quality: u8,
    pub format: OutputFormat,
    pub max_width: u32,
}

impl ProcessingOptions {
    /// Validates raw form values. Absent or blank values fall back to the defaults.
    pub fn parse(
        quality: Option<&str>,
        format: Option<&str>,
        max_width: u32,
        default_quality: u8,
        default_format: OutputFormat,
    ) -> Result<Self, AppError> {
        let quality = match quality.map(str::trim).filter(|q| !q.is_empty()) {
            None => default_quality,
            Some(raw) => parse_quality(raw)?,
        };

        let format = match format.map(str::trim).filter(|f| !f.is_empty()) {
            None => default_format,
            Some(raw) => OutputFormat::parse(raw)
                .ok_or_else(|| AppError::InvalidInput(INVALID_FORMAT_MESSAGE.to_string()))?,
        };

        Ok(Self {
            quality,
            format,
            max_width,
        })
    }
}

fn parse_quality(raw: &str) -> Result<u8, AppError> {
    let invalid = || AppError::InvalidInput(INVALID_QUALITY_MESSAGE.to_string());
    let value: i64 = raw.parse().map_err(|_| invalid())?;
    if value < i64::from(MIN_QUALITY) || value > i64::from(MAX_QUALITY) {
        return Err(invalid());
    }
    u8::try_from(value).map_err(|_| invalid())
}
