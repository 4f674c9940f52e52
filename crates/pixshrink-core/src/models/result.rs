use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::format::{format_file_size, round2};

use super::OutputFormat;

/// Pixel dimensions of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Target size after limiting the width to `max_width`.
    ///
    /// Narrower images are left untouched. Wider ones get exactly `max_width`
    /// and a proportionally scaled height, rounded to the nearest pixel.
    pub fn fit_within_width(&self, max_width: u32) -> Self {
        if self.width <= max_width || self.width == 0 {
            return *self;
        }
        let scaled = (f64::from(max_width) / f64::from(self.width)) * f64::from(self.height);
        Self {
            width: max_width,
            height: (scaled.round() as u32).max(1),
        }
    }
}

/// Dimensions before and after optimization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImageDimensions {
    pub original: Dimensions,
    pub optimized: Dimensions,
}

/// Outcome of optimizing one uploaded file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    pub success: bool,
    pub original_filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimized_filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimized_size: Option<u64>,
    /// Negative when the optimized file is larger than the upload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<ImageDimensions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessingResult {
    pub fn success(
        original_filename: String,
        optimized_filename: String,
        original_size: u64,
        optimized_size: u64,
        format: OutputFormat,
        quality: u8,
        dimensions: ImageDimensions,
    ) -> Self {
        let saved_bytes = original_size as i64 - optimized_size as i64;
        Self {
            success: true,
            original_filename,
            optimized_filename: Some(optimized_filename),
            original_size: Some(original_size),
            optimized_size: Some(optimized_size),
            saved_bytes: Some(saved_bytes),
            saved_percentage: Some(saved_percentage(saved_bytes, original_size)),
            format: Some(format),
            quality: Some(quality),
            dimensions: Some(dimensions),
            error: None,
        }
    }

    pub fn failure(original_filename: String, error: String) -> Self {
        Self {
            success: false,
            original_filename,
            optimized_filename: None,
            original_size: None,
            optimized_size: None,
            saved_bytes: None,
            saved_percentage: None,
            format: None,
            quality: None,
            dimensions: None,
            error: Some(error),
        }
    }
}

/// `savedBytes / originalSize * 100` rounded to two decimals; 0 for empty originals.
pub fn saved_percentage(saved_bytes: i64, original_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    round2(saved_bytes as f64 / original_size as f64 * 100.0)
}

/// Aggregate numbers for a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total_files: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub total_original_size: u64,
    pub total_optimized_size: u64,
    pub total_saved_bytes: i64,
    pub total_saved_percentage: f64,
    pub total_original_size_formatted: String,
    pub total_optimized_size_formatted: String,
    pub total_saved_formatted: String,
}

impl BatchSummary {
    /// Failed results contribute nothing to the byte totals.
    pub fn from_results(results: &[ProcessingResult]) -> Self {
        let success_count = results.iter().filter(|r| r.success).count();
        let total_original_size: u64 = results.iter().filter_map(|r| r.original_size).sum();
        let total_optimized_size: u64 = results.iter().filter_map(|r| r.optimized_size).sum();
        let total_saved_bytes = total_original_size as i64 - total_optimized_size as i64;

        Self {
            total_files: results.len(),
            success_count,
            failure_count: results.len() - success_count,
            total_original_size,
            total_optimized_size,
            total_saved_bytes,
            total_saved_percentage: saved_percentage(total_saved_bytes, total_original_size),
            total_original_size_formatted: format_file_size(total_original_size as i64),
            total_optimized_size_formatted: format_file_size(total_optimized_size as i64),
            total_saved_formatted: format_file_size(total_saved_bytes),
        }
    }
}
