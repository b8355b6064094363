//! REST API request/response data transfer objects

use serde::Serialize;

pub use crate::service::ReageRequest as ProcessImageRequest;

/// Process image response
#[derive(Debug, Serialize)]
pub struct ProcessImageResponse {
    pub processed_image: String,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: &str) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}
