// ONNX Runtime detector for YOLO-style exports (`images` → `output0`)

use super::{DetectionModel, LetterboxedInput};
use crate::core::config::DetectionConfig;
use crate::core::errors::{InferenceError, InferenceResult};
use crate::utils::tensor::{DetectionTensor, Tensor};
use anyhow::{Context, Result};
use async_trait::async_trait;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub struct OnnxDetector {
    session: Arc<Mutex<Session>>,
    input_height: u32,
    input_width: u32,
}

impl OnnxDetector {
    /// Load the model at `DETECTOR_MODEL_PATH`. `input_size` is `(height, width)`.
    pub fn from_config(config: &DetectionConfig, input_size: (u32, u32)) -> Result<Self> {
        Self::from_file(&config.model_path, input_size)
    }

    /// Load a model from disk. `input_size` is `(height, width)`.
    pub fn from_file(path: impl AsRef<Path>, input_size: (u32, u32)) -> Result<Self> {
        let path = path.as_ref();
        let session = Session::builder()?
            .with_execution_providers([CPUExecutionProvider::default().build()])?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(num_cpus::get().max(1))?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load detection model {}", path.display()))?;

        info!(
            "✓ Detection model loaded: {} ({}x{})",
            path.display(),
            input_size.1,
            input_size.0
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_height: input_size.0,
            input_width: input_size.1,
        })
    }
}

#[async_trait]
impl DetectionModel for OnnxDetector {
    fn input_size(&self) -> (u32, u32) {
        (self.input_height, self.input_width)
    }

    async fn infer(&self, input: LetterboxedInput) -> InferenceResult<DetectionTensor> {
        let session = Arc::clone(&self.session);

        let (shape, data) = tokio::task::spawn_blocking(move || -> Result<(Vec<usize>, Vec<f32>)> {
            let images_value = Value::from_array(input.tensor)?;

            let mut session = session.lock();
            let outputs = session.run(ort::inputs!["images" => images_value])?;

            // Copy out while the session is borrowed
            let (shape, data) = outputs["output0"].try_extract_tensor::<f32>()?;
            let shape = shape.iter().map(|&d| d.max(0) as usize).collect();
            Ok((shape, data.to_vec()))
        })
        .await
        .map_err(|e| InferenceError::TaskFailed(e.to_string()))?
        .map_err(|e| InferenceError::Backend(format!("{:#}", e)))?;

        debug!("✓ Inference output shape {:?}", shape);
        Ok(Tensor::from_shape_vec(&shape, data)?)
    }
}
