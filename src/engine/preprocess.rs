//! Image preprocessing for face detection and re-aging

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, Rgb, RgbImage};
use ndarray::{Array4, Axis};

use super::detector::FaceBox;

/// Standard input size for face detection (SCRFD)
pub const DETECTOR_INPUT_SIZE: (u32, u32) = (640, 640);

/// Number of channels fed to the re-aging network: RGB + source age + target age
pub const REAGING_INPUT_CHANNELS: usize = 5;

/// Preprocess image for detection model
/// Letterboxes to 640x640 and normalizes to [-1, 1] in BGR order
pub fn preprocess_for_detection(image: &RgbImage) -> Array4<f32> {
    let (target_w, target_h) = DETECTOR_INPUT_SIZE;
    let padded = resize_with_padding(image, target_w, target_h);

    let (width, height) = padded.dimensions();
    let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

    for (x, y, pixel) in padded.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        // InsightFace uses BGR order (swapRB in cv2.dnn.blobFromImage)
        tensor[[0, 0, y, x]] = (pixel[2] as f32 - 127.5) / 128.0;
        tensor[[0, 1, y, x]] = (pixel[1] as f32 - 127.5) / 128.0;
        tensor[[0, 2, y, x]] = (pixel[0] as f32 - 127.5) / 128.0;
    }

    tensor
}

/// Resize image with padding to maintain aspect ratio
fn resize_with_padding(image: &RgbImage, target_w: u32, target_h: u32) -> RgbImage {
    let info = ResizeInfo::new(image.dimensions(), (target_w, target_h));
    let new_w = ((image.width() as f32 * info.scale) as u32).max(1);
    let new_h = ((image.height() as f32 * info.scale) as u32).max(1);

    let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);

    let mut padded = ImageBuffer::from_pixel(target_w, target_h, Rgb([0u8, 0, 0]));
    imageops::replace(&mut padded, &resized, info.offset_x as i64, info.offset_y as i64);
    padded
}

/// Letterbox geometry used to map detections back to the source image
pub struct ResizeInfo {
    pub scale: f32,
    pub offset_x: u32,
    pub offset_y: u32,
    pub original_width: u32,
    pub original_height: u32,
}

impl ResizeInfo {
    pub fn new(original: (u32, u32), target: (u32, u32)) -> Self {
        let (orig_w, orig_h) = original;
        let (target_w, target_h) = target;

        let scale = f32::min(
            target_w as f32 / orig_w as f32,
            target_h as f32 / orig_h as f32,
        );

        let new_w = ((orig_w as f32 * scale) as u32).min(target_w);
        let new_h = ((orig_h as f32 * scale) as u32).min(target_h);

        Self {
            scale,
            offset_x: (target_w - new_w) / 2,
            offset_y: (target_h - new_h) / 2,
            original_width: orig_w,
            original_height: orig_h,
        }
    }

    /// Convert detection coordinates back to original image space
    pub fn to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let x = (x - self.offset_x as f32) / self.scale;
        let y = (y - self.offset_y as f32) / self.scale;
        (x, y)
    }
}

/// Region around a detected face that is fed to the re-aging network.
///
/// Coordinates are half-open pixel ranges: `[top, bottom) x [left, right)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceCrop {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl FaceCrop {
    /// Expand a face box into a roughly square crop covering hair and chin.
    ///
    /// The vertical margin is split 63/37 between top and bottom, then the top
    /// margin is adjusted so the total vertical margin equals twice the
    /// horizontal one.
    pub fn around(face: &FaceBox, image_width: u32, image_height: u32) -> Self {
        let top = face.y1.max(0.0) as i64;
        let bottom = face.y2.max(0.0) as i64;
        let left = face.x1.max(0.0) as i64;
        let right = face.x2.max(0.0) as i64;

        let face_h = (bottom - top) as f64;
        let face_w = (right - left) as f64;

        let margin_y_b = (face_h * 0.37 * 0.85) as i64;
        let margin_x = (face_w / (2.0 / 0.85)).floor() as i64;
        let margin_y_t = 2 * margin_x - margin_y_b;

        Self {
            top: (top - margin_y_t).clamp(0, image_height as i64) as u32,
            bottom: (bottom + margin_y_b).clamp(0, image_height as i64) as u32,
            left: (left - margin_x).clamp(0, image_width as i64) as u32,
            right: (right + margin_x).clamp(0, image_width as i64) as u32,
        }
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Copy the crop region out of the image
    pub fn extract(&self, image: &RgbImage) -> RgbImage {
        imageops::crop_imm(image, self.left, self.top, self.width(), self.height()).to_image()
    }
}

/// Build the NCHW re-aging input: RGB in [0, 1] followed by two constant
/// age channels (`age / 100`).
pub fn preprocess_for_reaging(
    crop: &RgbImage,
    input_size: u32,
    source_age: f32,
    target_age: f32,
) -> Array4<f32> {
    let resized = imageops::resize(crop, input_size, input_size, FilterType::Triangle);
    let size = input_size as usize;

    let mut tensor = Array4::<f32>::zeros((1, REAGING_INPUT_CHANNELS, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        tensor[[0, 0, y, x]] = pixel[0] as f32 / 255.0;
        tensor[[0, 1, y, x]] = pixel[1] as f32 / 255.0;
        tensor[[0, 2, y, x]] = pixel[2] as f32 / 255.0;
    }
    tensor.index_axis_mut(Axis(1), 3).fill(source_age / 100.0);
    tensor.index_axis_mut(Axis(1), 4).fill(target_age / 100.0);

    tensor
}

/// Decode image from bytes, optionally honoring the EXIF orientation tag
pub fn decode_image(data: &[u8], apply_exif: bool) -> image::ImageResult<DynamicImage> {
    let image = image::load_from_memory(data)?;

    if apply_exif {
        Ok(apply_exif_orientation(data, image))
    } else {
        Ok(image)
    }
}

/// Apply EXIF orientation to correct image rotation
/// Mobile phones often store images with EXIF orientation tags instead of rotating pixels
fn apply_exif_orientation(data: &[u8], image: DynamicImage) -> DynamicImage {
    use std::io::Cursor;

    let orientation = match exif::Reader::new().read_from_container(&mut Cursor::new(data)) {
        Ok(exif_data) => exif_data
            .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .unwrap_or(1),
        Err(_) => 1,
    };

    // See: https://exiftool.org/TagNames/EXIF.html (Orientation)
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}
