//! Face re-aging service configuration

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub inference: InferenceConfig,
    pub models: ModelsConfig,
    pub reaging: ReagingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum accepted request body, in megabytes
    pub body_limit_mb: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    /// OpenVINO device name ("AUTO", "CPU", "GPU", ...)
    pub device: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    pub detector: PathBuf,
    pub reaging: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReagingConfig {
    /// Side length the face crop is resized to before inference
    pub input_size: u32,
    pub window_size: u32,
    pub stride: u32,
    pub face_confidence: f32,
    pub jpeg_quality: u8,
    pub exif_orientation: bool,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Config file path, `REAGE_CONFIG` or `config.toml`
    pub fn default_path() -> String {
        std::env::var("REAGE_CONFIG").unwrap_or_else(|_| "config.toml".to_string())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let r = &self.reaging;
        if r.stride == 0 {
            anyhow::bail!("reaging.stride must be greater than zero");
        }
        if r.window_size == 0 || r.window_size > r.input_size {
            anyhow::bail!(
                "reaging.window_size ({}) must be in 1..={} (input_size)",
                r.window_size,
                r.input_size
            );
        }
        if !(0.0..=1.0).contains(&r.face_confidence) {
            anyhow::bail!(
                "reaging.face_confidence must be in 0.0..=1.0, got {}",
                r.face_confidence
            );
        }
        if !(1..=100).contains(&r.jpeg_quality) {
            anyhow::bail!("reaging.jpeg_quality must be in 1..=100, got {}", r.jpeg_quality);
        }
        Ok(())
    }

    pub fn body_limit_bytes(&self) -> usize {
        self.server.body_limit_mb * 1024 * 1024
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            body_limit_mb: 50,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            device: "AUTO".to_string(),
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            detector: PathBuf::from("models/scrfd_10g_kps.onnx"),
            reaging: PathBuf::from("models/face_reaging_unet.onnx"),
        }
    }
}

impl Default for ReagingConfig {
    fn default() -> Self {
        Self {
            input_size: 1024,
            window_size: 512,
            stride: 256,
            face_confidence: 0.5,
            jpeg_quality: 90,
            exif_orientation: true,
        }
    }
}
