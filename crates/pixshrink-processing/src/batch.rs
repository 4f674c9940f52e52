use std::sync::Arc;

use pixshrink_core::{format_file_size, ImageDimensions, ProcessingOptions, ProcessingResult, UploadedFile};
use pixshrink_storage::FileStore;

use crate::transform::ImageTransform;

/// Runs a transform over every file of an upload batch
///
/// Files are processed one at a time, in order. A failing file becomes a
/// failed [`ProcessingResult`] and never stops the rest of the batch.
pub struct BatchProcessor {
    store: Arc<dyn FileStore>,
    transform: Arc<dyn ImageTransform>,
}

impl BatchProcessor {
    pub fn new(store: Arc<dyn FileStore>, transform: Arc<dyn ImageTransform>) -> Self {
        Self { store, transform }
    }

    pub fn store(&self) -> &Arc<dyn FileStore> {
        &self.store
    }

    /// One result per input file, in input order.
    pub async fn process_batch(
        &self,
        files: &[UploadedFile],
        options: &ProcessingOptions,
    ) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(files.len());

        for file in files {
            let result = match self.transform.transform(&file.stored_filename, options).await {
                Ok(output) => {
                    tracing::debug!(
                        optimized_filename = %output.optimized_filename,
                        original = %format_file_size(output.original_size as i64),
                        optimized = %format_file_size(output.optimized_size as i64),
                        "Image optimized"
                    );
                    self.store
                        .record_original(&output.optimized_filename, &file.stored_filename);
                    ProcessingResult::success(
                        file.original_filename.clone(),
                        output.optimized_filename,
                        output.original_size,
                        output.optimized_size,
                        options.format,
                        options.quality,
                        ImageDimensions {
                            original: output.original_dimensions,
                            optimized: output.optimized_dimensions,
                        },
                    )
                }
                Err(e) => {
                    tracing::warn!(
                        stored_filename = %file.stored_filename,
                        original_filename = %file.original_filename,
                        error = %e,
                        "Image processing failed"
                    );
                    ProcessingResult::failure(
                        file.original_filename.clone(),
                        format!("Failed to process image: {}", e),
                    )
                }
            };
            results.push(result);
        }

        tracing::info!(
            total = results.len(),
            succeeded = results.iter().filter(|r| r.success).count(),
            "Batch processed"
        );

        results
    }
}
