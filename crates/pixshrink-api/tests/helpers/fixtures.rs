//! Test fixtures: real encoded images built with the `image` crate.

use std::io::Cursor;

use axum_test::multipart::Part;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, format)
        .expect("Failed to encode fixture");
    out.into_inner()
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Jpeg)
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Png)
}

/// File part for the `images` field
pub fn image_part(filename: &str, mime_type: &str, data: Vec<u8>) -> Part {
    Part::bytes(data).file_name(filename).mime_type(mime_type)
}
