//! Service layer types

use serde::{Deserialize, Serialize};

/// Re-aging request as submitted by clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReageRequest {
    /// Base64-encoded image bytes (PNG, JPEG, ...)
    pub image: String,
    pub source_age: f32,
    pub target_age: f32,
}

/// Re-aging result
#[derive(Debug, Clone)]
pub struct ReageResult {
    /// Base64-encoded JPEG
    pub processed_image: String,
    pub width: u32,
    pub height: u32,
    pub inference_time_ms: u64,
}

/// Health check result
#[derive(Debug, Clone)]
pub struct HealthResult {
    pub healthy: bool,
    pub version: String,
}
