//! Face Re-Aging
//!
//! Runs the re-aging U-Net over a crop around the detected face. The crop is
//! resized to a square network input, split into overlapping windows, and the
//! per-window RGB deltas are averaged, resized back and added to the photo.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::{Rgb, Rgb32FImage, RgbImage};
use ndarray::{s, Array2, Array4, ArrayView4};
use tracing::debug;

use crate::config::ReagingConfig;

use super::detector::FaceDetector;
use super::pool::{ModelPool, ModelType};
use super::preprocess::{preprocess_for_reaging, FaceCrop};
use super::tensor::{read_array4, to_tensor};
use super::traits::AgeTransformer;

/// Channels predicted by the network (RGB delta)
const OUTPUT_CHANNELS: usize = 3;

/// OpenVINO-backed re-aging pipeline
pub struct FaceReager {
    pool: Arc<ModelPool>,
    detector: FaceDetector,
    input_size: u32,
    window_size: usize,
    stride: usize,
}

impl FaceReager {
    pub fn new(pool: Arc<ModelPool>, config: &ReagingConfig) -> Self {
        let detector = FaceDetector::new(pool.clone(), config.face_confidence);
        Self {
            pool,
            detector,
            input_size: config.input_size,
            window_size: config.window_size as usize,
            stride: config.stride as usize,
        }
    }
}

impl AgeTransformer for FaceReager {
    fn transform(&self, image: &RgbImage, source_age: f32, target_age: f32) -> Result<RgbImage> {
        let start = Instant::now();

        let faces = self.detector.detect(image)?;
        let face = faces
            .first()
            .ok_or_else(|| anyhow::anyhow!("No face detected in the image"))?;

        let crop = FaceCrop::around(face, image.width(), image.height());
        if crop.is_empty() {
            anyhow::bail!("Detected face region is empty");
        }
        debug!(
            "Face crop {}x{} at ({}, {}), confidence {:.3}",
            crop.width(),
            crop.height(),
            crop.left,
            crop.top,
            face.confidence
        );

        let input = preprocess_for_reaging(&crop.extract(image), self.input_size, source_age, target_age);

        let model = self.pool.get_model(ModelType::Reaging);
        let mut request = model.create_infer_request()?;

        let delta = sliding_window(&input, self.window_size, self.stride, |window| {
            let tensor = to_tensor(window)?;
            request.set_input_tensor(&tensor)?;
            request.infer().context("Re-aging inference failed")?;
            read_array4(&request.get_output_tensor()?)
        })?;

        let output = apply_delta(image, &crop, &delta)?;
        debug!("Re-aged face in {:?}", start.elapsed());

        Ok(output)
    }
}

/// Window start offsets along one axis.
///
/// Offsets step by `stride` and stop below `size - window + add`, where `add`
/// is 2 when the window is not a multiple of the stride and 1 otherwise.
/// Offsets are clamped so every window lies inside `size`.
pub fn window_offsets(size: usize, window: usize, stride: usize) -> Vec<usize> {
    if window > size || stride == 0 {
        return Vec::new();
    }
    let add = if window % stride != 0 { 2 } else { 1 };
    let last = size - window;

    let mut offsets: Vec<usize> = (0..size - window + add)
        .step_by(stride)
        .map(|offset| offset.min(last))
        .collect();
    offsets.dedup();
    offsets
}

/// Run `infer` over overlapping square windows of an NCHW input and average
/// the 3-channel outputs where windows overlap.
///
/// Pixels not covered by any window get a zero delta.
pub fn sliding_window<F>(
    input: &Array4<f32>,
    window: usize,
    stride: usize,
    mut infer: F,
) -> Result<Array4<f32>>
where
    F: FnMut(ArrayView4<f32>) -> Result<Array4<f32>>,
{
    let (batch, _, height, width) = input.dim();
    if window == 0 || window > height || window > width {
        anyhow::bail!(
            "Window size {} does not fit input of {}x{}",
            window,
            width,
            height
        );
    }

    let mut sum = Array4::<f32>::zeros((batch, OUTPUT_CHANNELS, height, width));
    let mut count = Array2::<f32>::zeros((height, width));

    let ys = window_offsets(height, window, stride);
    let xs = window_offsets(width, window, stride);

    for &y in &ys {
        for &x in &xs {
            let view = input.slice(s![.., .., y..y + window, x..x + window]);
            let output = infer(view)?;
            if output.dim() != (batch, OUTPUT_CHANNELS, window, window) {
                anyhow::bail!(
                    "Unexpected re-aging output shape {:?}, expected {:?}",
                    output.shape(),
                    [batch, OUTPUT_CHANNELS, window, window]
                );
            }

            let mut region = sum.slice_mut(s![.., .., y..y + window, x..x + window]);
            region += &output;
            let mut covered = count.slice_mut(s![y..y + window, x..x + window]);
            covered += 1.0;
        }
    }

    for ((_, _, y, x), value) in sum.indexed_iter_mut() {
        let c = count[[y, x]];
        *value = if c > 0.0 { *value / c } else { 0.0 };
    }

    Ok(sum)
}

/// Resize the averaged delta to the crop and add it to the original pixels
pub fn apply_delta(image: &RgbImage, crop: &FaceCrop, delta: &Array4<f32>) -> Result<RgbImage> {
    let (_, channels, height, width) = delta.dim();
    if channels != OUTPUT_CHANNELS {
        anyhow::bail!("Delta must have {} channels, got {}", OUTPUT_CHANNELS, channels);
    }

    // Resampling clamps f32 samples to [0, 1], so the signed delta is shifted
    // into that range and back. Deltas beyond +-1 saturate the output anyway.
    let delta_image = Rgb32FImage::from_fn(width as u32, height as u32, |x, y| {
        let (x, y) = (x as usize, y as usize);
        Rgb([0, 1, 2].map(|c| (delta[[0, c, y, x]].clamp(-1.0, 1.0) + 1.0) / 2.0))
    });
    let resized = imageops::resize(&delta_image, crop.width(), crop.height(), FilterType::Triangle);

    let mut output = image.clone();
    for (dx, dy, d) in resized.enumerate_pixels() {
        let pixel = output.get_pixel_mut(crop.left + dx, crop.top + dy);
        for c in 0..3 {
            let value = (pixel[c] as f32 / 255.0 + d[c] * 2.0 - 1.0).clamp(0.0, 1.0);
            pixel[c] = (value * 255.0).round() as u8;
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_offsets_default_geometry() {
        assert_eq!(window_offsets(1024, 512, 256), vec![0, 256, 512]);
    }

    #[test]
    fn test_window_offsets_uneven_stride_stays_in_bounds() {
        // add = 2: range(0, 10 - 4 + 2, 3) = [0, 3, 6]
        assert_eq!(window_offsets(10, 4, 3), vec![0, 3, 6]);
        // add = 2: range(0, 9 - 4 + 2, 3) = [0, 3, 6] -> 6 clamped to 5
        assert_eq!(window_offsets(9, 4, 3), vec![0, 3, 5]);
    }

    #[test]
    fn test_window_offsets_window_equals_size() {
        assert_eq!(window_offsets(512, 512, 256), vec![0]);
        assert!(window_offsets(100, 512, 256).is_empty());
    }

    #[test]
    fn test_sliding_window_averages_overlaps() {
        // Input RGB channels hold a gradient; the fake model echoes them back,
        // so averaging overlapping windows must reproduce the input exactly.
        let mut input = Array4::<f32>::zeros((1, 5, 8, 8));
        for ((_, c, y, x), v) in input.indexed_iter_mut() {
            *v = (c * 100 + y * 8 + x) as f32;
        }

        let mut calls = 0;
        let output = sliding_window(&input, 4, 2, |window| {
            calls += 1;
            Ok(window.slice(s![.., 0..3, .., ..]).to_owned())
        })
        .unwrap();

        assert_eq!(calls, 9);
        assert_eq!(output.dim(), (1, 3, 8, 8));
        for ((_, c, y, x), v) in output.indexed_iter() {
            assert!((v - (c * 100 + y * 8 + x) as f32).abs() < 1e-4);
        }
    }

    #[test]
    fn test_sliding_window_counts_coverage() {
        let input = Array4::<f32>::zeros((1, 5, 8, 8));
        let output = sliding_window(&input, 4, 2, |_| Ok(Array4::from_elem((1, 3, 4, 4), 1.0))).unwrap();

        // Every pixel is covered at least once and each window adds 1.0
        assert!(output.iter().all(|v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_sliding_window_rejects_bad_output_shape() {
        let input = Array4::<f32>::zeros((1, 5, 8, 8));
        let result = sliding_window(&input, 4, 4, |_| Ok(Array4::zeros((1, 3, 2, 2))));
        assert!(result.is_err());
    }

    #[test]
    fn test_apply_delta_only_touches_crop_and_clamps() {
        let image = RgbImage::from_pixel(10, 10, Rgb([100, 200, 250]));
        let crop = FaceCrop { top: 2, bottom: 6, left: 3, right: 7 };
        let delta = Array4::from_elem((1, 3, 8, 8), 0.2);

        let output = apply_delta(&image, &crop, &delta).unwrap();

        assert_eq!(output.dimensions(), (10, 10));
        assert_eq!(output.get_pixel(0, 0), &Rgb([100, 200, 250]));
        assert_eq!(output.get_pixel(7, 6), &Rgb([100, 200, 250]));
        // 100/255 + 0.2 = 0.592 -> 151; 200/255 + 0.2 = 0.984 -> 251; 250 saturates
        assert_eq!(output.get_pixel(3, 2), &Rgb([151, 251, 255]));
        assert_eq!(output.get_pixel(6, 5), &Rgb([151, 251, 255]));
    }
}
