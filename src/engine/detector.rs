//! SCRFD Face Detector
//!
//! Locates the face to re-age. Outputs bounding boxes in original image
//! coordinates.

use std::sync::Arc;

use image::RgbImage;
use openvino::InferRequest;
use anyhow::{Result, Context};

use super::pool::{ModelPool, ModelType};
use super::preprocess::{preprocess_for_detection, ResizeInfo, DETECTOR_INPUT_SIZE};
use super::tensor::{read_f32, to_tensor};

const NMS_THRESHOLD: f32 = 0.4;

/// Face detection result
#[derive(Debug, Clone)]
pub struct FaceBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
}

/// SCRFD Face Detector
pub struct FaceDetector {
    pool: Arc<ModelPool>,
    confidence_threshold: f32,
}

impl FaceDetector {
    /// Create a new face detector
    pub fn new(pool: Arc<ModelPool>, confidence_threshold: f32) -> Self {
        Self {
            pool,
            confidence_threshold,
        }
    }

    /// Detect faces in an image, best first
    pub fn detect(&self, image: &RgbImage) -> Result<Vec<FaceBox>> {
        let resize_info = ResizeInfo::new(image.dimensions(), DETECTOR_INPUT_SIZE);
        let input_tensor = preprocess_for_detection(image);

        let model = self.pool.get_model(ModelType::Detector);
        let mut request = model.create_infer_request()?;

        let input = to_tensor(input_tensor.view())?;
        request.set_input_tensor(&input)?;
        request.infer().context("Face detection inference failed")?;

        let detections = self.parse_outputs(&request, &resize_info)?;
        let final_detections = nms(detections, NMS_THRESHOLD);

        tracing::debug!("Detected {} faces after NMS", final_detections.len());

        Ok(final_detections)
    }

    /// Parse InsightFace SCRFD model outputs
    ///
    /// det_10g has 9 outputs:
    /// - outputs 0-2: scores for stride 8, 16, 32
    /// - outputs 3-5: bbox_preds for stride 8, 16, 32
    /// - outputs 6-8: kps_preds for stride 8, 16, 32 (unused)
    fn parse_outputs(&self, request: &InferRequest, resize_info: &ResizeInfo) -> Result<Vec<FaceBox>> {
        let mut all_boxes = Vec::new();

        let mut output_count = 0;
        for i in 0..20 {
            if request.get_output_tensor_by_index(i).is_ok() {
                output_count += 1;
            } else {
                break;
            }
        }

        // Keypoint heads, when present, trail the bbox heads and are skipped
        let (fmc, num_anchors) = match output_count {
            6 | 9 => (3, 2),
            10 | 15 => (5, 1),
            _ => {
                tracing::warn!("Unknown SCRFD output count: {}, trying default", output_count);
                (3, 2)
            }
        };

        let strides: &[i32] = if fmc == 3 { &[8, 16, 32] } else { &[8, 16, 32, 64, 128] };
        let (input_h, input_w) = (DETECTOR_INPUT_SIZE.1 as i32, DETECTOR_INPUT_SIZE.0 as i32);

        for (idx, &stride) in strides.iter().enumerate() {
            let scores = read_f32(&request.get_output_tensor_by_index(idx)?)?;
            let bboxes = read_f32(&request.get_output_tensor_by_index(idx + fmc)?)?;

            let feat_h = input_h / stride;
            let feat_w = input_w / stride;
            let stride = stride as f32;

            let anchor_centers = (0..feat_h).flat_map(|y| {
                (0..feat_w).flat_map(move |x| {
                    std::iter::repeat((x as f32 * stride, y as f32 * stride)).take(num_anchors)
                })
            });

            for (i, (cx, cy)) in anchor_centers.enumerate() {
                let Some(&score) = scores.get(i) else { break };
                if score < self.confidence_threshold {
                    continue;
                }

                // Distance format: left, top, right, bottom
                let bbox_idx = i * 4;
                if bbox_idx + 3 >= bboxes.len() {
                    continue;
                }

                let x1 = cx - bboxes[bbox_idx] * stride;
                let y1 = cy - bboxes[bbox_idx + 1] * stride;
                let x2 = cx + bboxes[bbox_idx + 2] * stride;
                let y2 = cy + bboxes[bbox_idx + 3] * stride;

                let (orig_x1, orig_y1) = resize_info.to_original(x1, y1);
                let (orig_x2, orig_y2) = resize_info.to_original(x2, y2);
                let max_x = resize_info.original_width as f32;
                let max_y = resize_info.original_height as f32;

                all_boxes.push(FaceBox {
                    x1: orig_x1.clamp(0.0, max_x),
                    y1: orig_y1.clamp(0.0, max_y),
                    x2: orig_x2.clamp(0.0, max_x),
                    y2: orig_y2.clamp(0.0, max_y),
                    confidence: score,
                });
            }
        }

        tracing::debug!("Total {} faces before NMS", all_boxes.len());

        Ok(all_boxes)
    }
}

/// Non-maximum suppression; returns survivors sorted by confidence (descending)
pub fn nms(mut boxes: Vec<FaceBox>, iou_threshold: f32) -> Vec<FaceBox> {
    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<FaceBox> = Vec::new();
    for candidate in boxes {
        if keep.iter().all(|kept| iou(kept, &candidate) <= iou_threshold) {
            keep.push(candidate);
        }
    }

    keep
}

/// Compute intersection over union
pub fn iou(a: &FaceBox, b: &FaceBox) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);

    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);

    let union = area_a + area_b - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}
