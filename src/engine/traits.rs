//! Transformation abstraction
//!
//! The HTTP layer only needs "RGB image in, re-aged RGB image out".
//! `FaceReager` is the OpenVINO implementation; tests plug in their own.

use anyhow::Result;
use image::RgbImage;

/// Re-ages the face in an image
/// Implementations must be thread-safe; they are shared across requests
pub trait AgeTransformer: Send + Sync + 'static {
    /// Produce a copy of `image` with the face moved from `source_age` to
    /// `target_age`. The output size is up to the implementation.
    fn transform(&self, image: &RgbImage, source_age: f32, target_age: f32) -> Result<RgbImage>;
}
