//! Image utility functions

use anyhow::Result;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbImage};

/// Normalize any decoded image to 8-bit RGB.
///
/// Alpha is dropped and palette/grayscale images are expanded. Returns the
/// original color type name when a conversion happened.
pub fn ensure_rgb(image: DynamicImage) -> (RgbImage, Option<String>) {
    match image {
        DynamicImage::ImageRgb8(rgb) => (rgb, None),
        other => {
            let original = format!("{:?}", other.color());
            (other.into_rgb8(), Some(original))
        }
    }
}

/// Encode image to JPEG bytes
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    image.write_with_encoder(encoder)?;
    Ok(buffer)
}
