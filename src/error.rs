//! Service error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReageError>;

#[derive(Error, Debug)]
pub enum ReageError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid base64 image data: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Cannot identify image file: {0}")]
    ImageFormat(#[from] image::ImageError),

    #[error("Image processing failed: {0:#}")]
    Transformation(anyhow::Error),

    #[error("Failed to encode processed image: {0:#}")]
    Encode(anyhow::Error),

    #[error("Startup failed: {0}")]
    Startup(String),
}

impl ReageError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn startup(msg: impl Into<String>) -> Self {
        Self::Startup(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;

    #[test]
    fn test_decode_error_conversion() {
        let err = base64::engine::general_purpose::STANDARD
            .decode("not-base64!!")
            .unwrap_err();
        let err: ReageError = err.into();
        assert!(matches!(err, ReageError::Decode(_)));
        assert!(err.to_string().starts_with("Invalid base64 image data"));
    }

    #[test]
    fn test_transformation_message_includes_context() {
        let inner = anyhow::anyhow!("output tensor missing").context("Re-aging inference failed");
        let err = ReageError::Transformation(inner);
        assert_eq!(
            err.to_string(),
            "Image processing failed: Re-aging inference failed: output tensor missing"
        );
    }
}
