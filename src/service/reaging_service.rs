//! Re-aging Service - Core request logic
//!
//! Turns a base64 payload into a re-aged base64 JPEG: decode, normalize to
//! RGB, run the transformation on a blocking thread, encode.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::config::ReagingConfig;
use crate::engine::preprocess::decode_image;
use crate::engine::AgeTransformer;
use crate::error::{ReageError, Result};
use crate::utils::codec::{decode_base64, encode_base64};
use crate::utils::image::{encode_jpeg, ensure_rgb};

use super::types::*;

/// Face re-aging service
pub struct ReagingService<T: AgeTransformer> {
    transformer: Arc<T>,
    jpeg_quality: u8,
    exif_orientation: bool,
}

impl<T: AgeTransformer> ReagingService<T> {
    /// Create a new re-aging service
    pub fn new(transformer: Arc<T>, config: &ReagingConfig) -> Self {
        Self {
            transformer,
            jpeg_quality: config.jpeg_quality,
            exif_orientation: config.exif_orientation,
        }
    }

    /// Re-age the face in a base64-encoded image
    pub async fn process(&self, request: ReageRequest) -> Result<ReageResult> {
        let ReageRequest {
            image,
            source_age,
            target_age,
        } = request;

        let bytes = decode_base64(&image)?;
        let decoded = decode_image(&bytes, self.exif_orientation)?;
        debug!("Image decoded successfully ({}x{})", decoded.width(), decoded.height());

        let (rgb, converted_from) = ensure_rgb(decoded);
        if let Some(mode) = converted_from {
            debug!("Converted image from {} to RGB", mode);
        }

        // Inference is CPU/GPU bound; keep it off the async workers
        let transformer = self.transformer.clone();
        let start = Instant::now();
        let processed = tokio::task::spawn_blocking(move || {
            transformer.transform(&rgb, source_age, target_age)
        })
        .await
        .map_err(|e| ReageError::Transformation(anyhow::anyhow!("Worker task failed: {}", e)))?
        .map_err(ReageError::Transformation)?;

        let inference_time_ms = start.elapsed().as_millis() as u64;
        debug!("Image processed successfully");

        let jpeg = encode_jpeg(&processed, self.jpeg_quality).map_err(ReageError::Encode)?;
        let processed_image = encode_base64(&jpeg);

        info!(
            "Re-aged {}x{} image from {} to {} in {}ms",
            processed.width(),
            processed.height(),
            source_age,
            target_age,
            inference_time_ms
        );

        Ok(ReageResult {
            processed_image,
            width: processed.width(),
            height: processed.height(),
            inference_time_ms,
        })
    }

    /// Health status
    pub fn health(&self) -> HealthResult {
        HealthResult {
            healthy: true,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
    use std::sync::Mutex;

    /// Records what it was called with and inverts the image
    #[derive(Default)]
    struct RecordingTransformer {
        calls: Mutex<Vec<(u32, u32, f32, f32)>>,
    }

    impl AgeTransformer for RecordingTransformer {
        fn transform(&self, image: &RgbImage, source_age: f32, target_age: f32) -> anyhow::Result<RgbImage> {
            self.calls
                .lock()
                .unwrap()
                .push((image.width(), image.height(), source_age, target_age));
            let mut out = image.clone();
            image::imageops::invert(&mut out);
            Ok(out)
        }
    }

    struct FailingTransformer;

    /// Takes a fixed amount of time per call
    struct SlowTransformer(std::time::Duration);

    impl AgeTransformer for SlowTransformer {
        fn transform(&self, image: &RgbImage, _: f32, _: f32) -> anyhow::Result<RgbImage> {
            std::thread::sleep(self.0);
            Ok(image.clone())
        }
    }

    impl AgeTransformer for FailingTransformer {
        fn transform(&self, _: &RgbImage, _: f32, _: f32) -> anyhow::Result<RgbImage> {
            anyhow::bail!("No face detected in the image")
        }
    }

    fn png_base64(image: DynamicImage) -> String {
        let mut buffer = std::io::Cursor::new(Vec::new());
        image.write_to(&mut buffer, image::ImageFormat::Png).unwrap();
        encode_base64(buffer.get_ref())
    }

    fn service<T: AgeTransformer>(transformer: Arc<T>) -> ReagingService<T> {
        ReagingService::new(transformer, &ReagingConfig::default())
    }

    #[tokio::test]
    async fn test_process_returns_jpeg() {
        let transformer = Arc::new(RecordingTransformer::default());
        let svc = service(transformer.clone());

        let request = ReageRequest {
            image: png_base64(DynamicImage::ImageRgb8(RgbImage::from_pixel(12, 8, Rgb([0, 0, 0])))),
            source_age: 25.0,
            target_age: 65.0,
        };
        let result = svc.process(request).await.unwrap();

        let jpeg = decode_base64(&result.processed_image).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!((result.width, result.height), (12, 8));
        assert_eq!(transformer.calls.lock().unwrap().as_slice(), &[(12, 8, 25.0, 65.0)]);
    }

    #[tokio::test]
    async fn test_rgba_input_is_converted() {
        let transformer = Arc::new(RecordingTransformer::default());
        let svc = service(transformer.clone());

        let rgba = RgbaImage::from_pixel(5, 5, Rgba([255, 0, 0, 128]));
        let request = ReageRequest {
            image: png_base64(DynamicImage::ImageRgba8(rgba)),
            source_age: 30.0,
            target_age: 10.0,
        };

        assert!(svc.process(request).await.is_ok());
        assert_eq!(transformer.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_bad_base64_is_decode_error() {
        let svc = service(Arc::new(RecordingTransformer::default()));
        let request = ReageRequest {
            image: "not-base64!!".to_string(),
            source_age: 20.0,
            target_age: 40.0,
        };

        let err = svc.process(request).await.unwrap_err();
        assert!(matches!(err, ReageError::Decode(_)));
    }

    #[tokio::test]
    async fn test_non_image_bytes_is_format_error() {
        let svc = service(Arc::new(RecordingTransformer::default()));
        let request = ReageRequest {
            image: encode_base64(b"definitely not an image"),
            source_age: 20.0,
            target_age: 40.0,
        };

        let err = svc.process(request).await.unwrap_err();
        assert!(matches!(err, ReageError::ImageFormat(_)));
    }

    #[tokio::test]
    async fn test_transformer_failure_is_reported() {
        let svc = service(Arc::new(FailingTransformer));
        let request = ReageRequest {
            image: png_base64(DynamicImage::ImageRgb8(RgbImage::new(4, 4))),
            source_age: 20.0,
            target_age: 40.0,
        };

        let err = svc.process(request).await.unwrap_err();
        assert!(matches!(err, ReageError::Transformation(_)));
        assert!(err.to_string().contains("No face detected"));
    }

    #[tokio::test]
    async fn test_inference_time_covers_transform() {
        let svc = service(Arc::new(SlowTransformer(std::time::Duration::from_millis(30))));
        let request = ReageRequest {
            image: png_base64(DynamicImage::ImageRgb8(RgbImage::new(4, 4))),
            source_age: 20.0,
            target_age: 40.0,
        };

        let result = svc.process(request).await.unwrap();
        assert!(result.inference_time_ms >= 30);
    }
}
