//! Single-image transformation
//!
//! [`ImageTransform`] is the seam between batch orchestration and the codec
//! stack. [`ImageCrateTransform`] is the production implementation; tests and
//! embedders can substitute their own.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, GenericImageView, ImageDecoder, ImageReader};
use pixshrink_core::naming::optimized_filename;
use pixshrink_core::{Dimensions, OutputFormat, ProcessingOptions};
use pixshrink_storage::{FileStore, StorageError};

use crate::compression::ImageCompressor;

/// What a successful transform produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    pub optimized_filename: String,
    pub original_size: u64,
    pub optimized_size: u64,
    pub original_dimensions: Dimensions,
    pub optimized_dimensions: Dimensions,
}

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("source file unavailable: {0}")]
    Source(#[from] StorageError),

    #[error("unsupported or corrupt image: {0}")]
    Decode(String),

    #[error("failed to encode {format}: {message}")]
    Encode {
        format: OutputFormat,
        message: String,
    },

    #[error("failed to write output: {0}")]
    Write(String),

    #[error("transform task failed: {0}")]
    Task(String),
}

/// Produces one derived file from one stored upload
#[async_trait]
pub trait ImageTransform: Send + Sync {
    /// Transform `source_filename` according to `options`.
    ///
    /// On success exactly one derived file exists in the store. On failure
    /// no derived file is left behind.
    async fn transform(
        &self,
        source_filename: &str,
        options: &ProcessingOptions,
    ) -> Result<TransformOutput, TransformError>;
}

/// Transform backed by the `image` crate decoders and the mozjpeg, webp and
/// ravif encoders
pub struct ImageCrateTransform {
    store: Arc<dyn FileStore>,
}

impl ImageCrateTransform {
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self { store }
    }

    /// Decode, apply EXIF orientation, limit width and re-encode.
    fn process_bytes(
        data: &[u8],
        options: &ProcessingOptions,
    ) -> Result<(Bytes, Dimensions, Dimensions), TransformError> {
        let img = decode_oriented(data)?;
        let (width, height) = img.dimensions();
        let original = Dimensions::new(width, height);
        let target = original.fit_within_width(options.max_width);

        let img = if target != original {
            img.resize_exact(target.width, target.height, FilterType::Lanczos3)
        } else {
            img
        };

        let encoded = ImageCompressor::compress(&img, options.format, options.quality).map_err(
            |e| TransformError::Encode {
                format: options.format,
                message: e.to_string(),
            },
        )?;

        Ok((encoded, original, target))
    }
}

fn decode_oriented(data: &[u8]) -> Result<DynamicImage, TransformError> {
    let mut decoder = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| TransformError::Decode(e.to_string()))?
        .into_decoder()
        .map_err(|e| TransformError::Decode(e.to_string()))?;

    let orientation = decoder
        .orientation()
        .unwrap_or(Orientation::NoTransforms);
    let mut img =
        DynamicImage::from_decoder(decoder).map_err(|e| TransformError::Decode(e.to_string()))?;
    img.apply_orientation(orientation);

    Ok(img)
}

#[async_trait]
impl ImageTransform for ImageCrateTransform {
    #[tracing::instrument(skip(self, options), fields(format = %options.format, quality = options.quality))]
    async fn transform(
        &self,
        source_filename: &str,
        options: &ProcessingOptions,
    ) -> Result<TransformOutput, TransformError> {
        let start = Instant::now();
        let data = self.store.read(source_filename).await?;
        let original_size = data.len() as u64;

        let task_options = *options;
        let (encoded, original_dimensions, optimized_dimensions) =
            tokio::task::spawn_blocking(move || Self::process_bytes(&data, &task_options))
                .await
                .map_err(|e| TransformError::Task(e.to_string()))??;

        let optimized_filename = optimized_filename(source_filename, options.format);
        let optimized_size = match self.store.write(&optimized_filename, &encoded).await {
            Ok(size) => size,
            Err(e) => {
                if let Err(cleanup_err) = self.store.delete(&optimized_filename).await {
                    tracing::warn!(
                        filename = %optimized_filename,
                        error = %cleanup_err,
                        "Failed to remove partial output"
                    );
                }
                return Err(TransformError::Write(e.to_string()));
            }
        };

        tracing::info!(
            source = %source_filename,
            output = %optimized_filename,
            original_size,
            optimized_size,
            original_width = original_dimensions.width,
            optimized_width = optimized_dimensions.width,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Image optimized"
        );

        Ok(TransformOutput {
            optimized_filename,
            original_size,
            optimized_size,
            original_dimensions,
            optimized_dimensions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use pixshrink_storage::LocalFileStore;
    use tempfile::tempdir;

    fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Jpeg)
            .unwrap();
        out.into_inner()
    }

    fn options(format: OutputFormat, max_width: u32) -> ProcessingOptions {
        ProcessingOptions {
            quality: 80,
            format,
            max_width,
        }
    }

    async fn setup() -> (tempfile::TempDir, Arc<dyn FileStore>) {
        let dir = tempdir().unwrap();
        let store: Arc<dyn FileStore> = Arc::new(LocalFileStore::new(dir.path()).await.unwrap());
        (dir, store)
    }

    #[tokio::test]
    async fn test_wide_image_is_resized() {
        let (_dir, store) = setup().await;
        store.write("1-1.jpg", &jpeg_bytes(2400, 300)).await.unwrap();

        let transform = ImageCrateTransform::new(store.clone());
        let output = transform
            .transform("1-1.jpg", &options(OutputFormat::Webp, 1920))
            .await
            .unwrap();

        assert_eq!(output.optimized_filename, "1-1-optimized.webp");
        assert_eq!(output.original_dimensions, Dimensions::new(2400, 300));
        assert_eq!(output.optimized_dimensions, Dimensions::new(1920, 240));
        assert_eq!(
            store.size("1-1-optimized.webp").await.unwrap(),
            output.optimized_size
        );

        let written = store.read("1-1-optimized.webp").await.unwrap();
        let decoded = image::load_from_memory(&written).unwrap();
        assert_eq!(decoded.dimensions(), (1920, 240));
    }

    #[tokio::test]
    async fn test_narrow_image_keeps_size() {
        let (_dir, store) = setup().await;
        store.write("2-2.jpg", &jpeg_bytes(64, 48)).await.unwrap();

        let transform = ImageCrateTransform::new(store.clone());
        let output = transform
            .transform("2-2.jpg", &options(OutputFormat::Png, 1920))
            .await
            .unwrap();

        assert_eq!(output.optimized_filename, "2-2-optimized.png");
        assert_eq!(output.optimized_dimensions, Dimensions::new(64, 48));
        assert_eq!(output.original_size, store.size("2-2.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_input_leaves_no_output() {
        let (_dir, store) = setup().await;
        store.write("3-3.jpg", b"definitely not an image").await.unwrap();

        let transform = ImageCrateTransform::new(store.clone());
        let err = transform
            .transform("3-3.jpg", &options(OutputFormat::Jpeg, 1920))
            .await
            .unwrap_err();

        assert!(matches!(err, TransformError::Decode(_)));
        assert!(!store.exists("3-3-optimized.jpeg").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_source() {
        let (_dir, store) = setup().await;
        let transform = ImageCrateTransform::new(store);
        let err = transform
            .transform("4-4.jpg", &options(OutputFormat::Webp, 1920))
            .await
            .unwrap_err();
        assert!(matches!(err, TransformError::Source(StorageError::NotFound(_))));
    }
}
