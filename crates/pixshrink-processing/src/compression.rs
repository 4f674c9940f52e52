use anyhow::Result;
use bytes::Bytes;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, GenericImageView};
use pixshrink_core::OutputFormat;

/// AVIF encoder speed, 1 (slowest, smallest) to 10
const AVIF_SPEED: u8 = 6;

/// Encodes decoded images into the supported output formats
pub struct ImageCompressor;

impl ImageCompressor {
    /// Encode `img` as `format`. `quality` (1-100) is ignored for PNG.
    pub fn compress(img: &DynamicImage, format: OutputFormat, quality: u8) -> Result<Bytes> {
        let quality = quality.clamp(1, 100);
        match format {
            OutputFormat::Jpeg => Self::compress_jpeg(img, quality),
            OutputFormat::Png => Self::compress_png(img),
            OutputFormat::Webp => Self::compress_webp(img, quality),
            OutputFormat::Avif => Self::compress_avif(img, quality),
        }
    }

    /// Compress to JPEG using mozjpeg
    fn compress_jpeg(img: &DynamicImage, quality: u8) -> Result<Bytes> {
        let rgb_img = img.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_quality(f32::from(quality));
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);

        let mut comp = comp.start_compress(Vec::new())?;
        comp.write_scanlines(&rgb_img)?;
        let jpeg_data = comp.finish()?;

        Ok(Bytes::from(jpeg_data))
    }

    /// Compress to PNG at the highest zlib level
    fn compress_png(img: &DynamicImage) -> Result<Bytes> {
        let mut buffer = Vec::new();
        let encoder =
            PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, FilterType::Adaptive);
        img.write_with_encoder(encoder)?;

        Ok(Bytes::from(buffer))
    }

    /// Compress to WebP
    fn compress_webp(img: &DynamicImage, quality: u8) -> Result<Bytes> {
        let (width, height) = img.dimensions();
        let rgba_img = img.to_rgba8();

        let encoder = webp::Encoder::from_rgba(&rgba_img, width, height);
        let webp_data = encoder.encode(f32::from(quality));

        Ok(Bytes::copy_from_slice(&webp_data))
    }

    /// Compress to AVIF, keeping the alpha channel when the source has one
    fn compress_avif(img: &DynamicImage, quality: u8) -> Result<Bytes> {
        let (width, height) = img.dimensions();
        let encoder = ravif::Encoder::new()
            .with_quality(f32::from(quality))
            .with_speed(AVIF_SPEED);

        let encoded = if img.color().has_alpha() {
            let rgba_img = img.to_rgba8();
            let pixels: Vec<rgb::RGBA8> = rgba_img
                .as_raw()
                .chunks_exact(4)
                .map(|c| rgb::RGBA8::new(c[0], c[1], c[2], c[3]))
                .collect();
            encoder.encode_rgba(ravif::Img::new(
                pixels.as_slice(),
                width as usize,
                height as usize,
            ))?
        } else {
            let rgb_img = img.to_rgb8();
            let pixels: Vec<rgb::RGB8> = rgb_img
                .as_raw()
                .chunks_exact(3)
                .map(|c| rgb::RGB8::new(c[0], c[1], c[2]))
                .collect();
            encoder.encode_rgb(ravif::Img::new(
                pixels.as_slice(),
                width as usize,
                height as usize,
            ))?
        };

        Ok(Bytes::from(encoded.avif_file))
    }
}
