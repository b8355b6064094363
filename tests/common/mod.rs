#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::Router;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, RgbImage};
use reage::api::rest::{AppState, create_rest_router};
use reage::config::ReagingConfig;
use reage::engine::AgeTransformer;
use reage::service::ReagingService;

/// Mock transformer that inverts colors and records each call
#[derive(Debug, Default)]
pub struct MockTransformer {
    pub calls: Mutex<Vec<MockCall>>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub width: u32,
    pub height: u32,
    pub source_age: f32,
    pub target_age: f32,
}

impl MockTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_string());
        self
    }

    pub fn get_calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl AgeTransformer for MockTransformer {
    fn transform(&self, image: &RgbImage, source_age: f32, target_age: f32) -> anyhow::Result<RgbImage> {
        self.calls.lock().unwrap().push(MockCall {
            width: image.width(),
            height: image.height(),
            source_age,
            target_age,
        });

        if let Some(ref error) = self.error {
            anyhow::bail!("{}", error);
        }

        let mut out = image.clone();
        image::imageops::invert(&mut out);
        Ok(out)
    }
}

pub fn create_test_app(transformer: Arc<MockTransformer>) -> Router {
    create_test_app_with_limit(transformer, 50 * 1024 * 1024)
}

pub fn create_test_app_with_limit(transformer: Arc<MockTransformer>, body_limit: usize) -> Router {
    let service = Arc::new(ReagingService::new(transformer, &ReagingConfig::default()));
    let state = Arc::new(AppState {
        service,
        start_time: Instant::now(),
    });
    create_rest_router(state, body_limit)
}

pub fn encode_png(image: DynamicImage) -> String {
    let mut buffer = std::io::Cursor::new(Vec::new());
    image.write_to(&mut buffer, image::ImageFormat::Png).unwrap();
    STANDARD.encode(buffer.into_inner())
}

pub fn decode_b64(data: &str) -> Vec<u8> {
    STANDARD.decode(data).unwrap()
}
