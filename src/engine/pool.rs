//! Model Pool
//!
//! Loads and compiles every network once at startup. Compiled models are
//! inference-only and shared read-only across requests for the lifetime of
//! the process.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use openvino::{CompiledModel, Core};
use tracing::info;

use crate::config::{InferenceConfig, ModelsConfig};

/// Wrapper for OpenVINO CompiledModel that implements Send + Sync
#[derive(Clone)]
pub struct SafeCompiledModel(pub Arc<CompiledModel>);
unsafe impl Send for SafeCompiledModel {}
unsafe impl Sync for SafeCompiledModel {}

impl SafeCompiledModel {
    /// Create an inference request
    /// OpenVINO CompiledModel methods are thread-safe in C++, but Rust bindings
    /// require &mut self. We bypass this restriction safely.
    pub fn create_infer_request(&self) -> Result<openvino::InferRequest> {
        unsafe {
            let ptr = Arc::as_ptr(&self.0) as *mut CompiledModel;
            (*ptr).create_infer_request().map_err(|e| e.into())
        }
    }
}

/// Networks held by the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelType {
    Detector,
    Reaging,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Detector => "detector",
            ModelType::Reaging => "reaging",
        }
    }
}

/// Process-wide set of compiled models
pub struct ModelPool {
    device: String,
    detector: SafeCompiledModel,
    reaging: SafeCompiledModel,
}

impl ModelPool {
    /// Read and compile all configured models.
    ///
    /// Any missing or incompatible model file is an error; the caller must not
    /// start serving in that case.
    pub fn load(inference: &InferenceConfig, models: &ModelsConfig) -> Result<Self> {
        let mut core = Core::new().context("Failed to initialize OpenVINO runtime")?;
        let device = inference.device.clone();

        let detector = compile(&mut core, &device, ModelType::Detector, &models.detector)?;
        let reaging = compile(&mut core, &device, ModelType::Reaging, &models.reaging)?;

        Ok(Self {
            device,
            detector,
            reaging,
        })
    }

    /// Get a handle to a compiled model
    pub fn get_model(&self, model_type: ModelType) -> SafeCompiledModel {
        match model_type {
            ModelType::Detector => self.detector.clone(),
            ModelType::Reaging => self.reaging.clone(),
        }
    }

    /// Device the models were compiled for
    pub fn device(&self) -> &str {
        &self.device
    }
}

fn compile(
    core: &mut Core,
    device: &str,
    model_type: ModelType,
    path: &Path,
) -> Result<SafeCompiledModel> {
    if !path.is_file() {
        anyhow::bail!(
            "{} model not found at {}",
            model_type.as_str(),
            path.display()
        );
    }
    let path_str = path
        .to_str()
        .with_context(|| format!("Model path is not valid UTF-8: {}", path.display()))?;

    info!("Loading model: {} from {}", model_type.as_str(), path_str);
    let start = Instant::now();

    // IR models pick up their .bin weights next to the .xml automatically
    let model = core
        .read_model_from_file(path_str, "")
        .with_context(|| format!("Failed to read {} model", model_type.as_str()))?;
    let compiled = core
        .compile_model(&model, device.into())
        .with_context(|| format!("Failed to compile {} model for {}", model_type.as_str(), device))?;

    info!("Model {} loaded in {:?}", model_type.as_str(), start.elapsed());

    Ok(SafeCompiledModel(Arc::new(compiled)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_type_as_str() {
        assert_eq!(ModelType::Detector.as_str(), "detector");
        assert_eq!(ModelType::Reaging.as_str(), "reaging");
    }

    #[test]
    fn test_missing_model_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.onnx");
        let inference = InferenceConfig { device: "CPU".to_string() };
        let models = ModelsConfig {
            detector: missing.clone(),
            reaging: missing,
        };

        // Either the runtime is unavailable or the file check fires; both refuse to load.
        assert!(ModelPool::load(&inference, &models).is_err());
    }
}
