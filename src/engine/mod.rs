//! Inference engine module
//!
//! Provides OpenVINO-based re-aging with:
//! - Models compiled once at startup and shared read-only
//! - SCRFD face detection to locate the region to re-age
//! - Sliding-window U-Net inference over the face crop

pub mod pool;
pub mod detector;
pub mod preprocess;
pub mod reager;
pub mod tensor;
pub mod traits;

pub use pool::ModelPool;
pub use detector::FaceDetector;
pub use reager::FaceReager;
pub use traits::AgeTransformer;
