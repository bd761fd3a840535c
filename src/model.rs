//! The model seam and its ONNX Runtime implementation

use crate::detection::detect_model_config;
use crate::error::{Error, Result};
use crate::types::{ExecutionProviderInfo, ModelConfig};
use ndarray::{Array2, ArrayViewD};
use ort::session::Session;
use ort::value::TensorRef;
use std::path::PathBuf;

/// A trained classifier mapping a batch of grids to per-label logits.
pub trait Model {
    /// Per-sample input shape, batch axis excluded.
    fn grid_shape(&self) -> &[usize];

    /// Number of labels in each output row.
    fn num_labels(&self) -> usize;

    /// Run the model on `grids` of shape `(b, *grid_shape)` and return logits
    /// of shape `(b, num_labels)`.
    ///
    /// # Errors
    ///
    /// Any failure is fatal for the run.
    fn forward(&mut self, grids: ArrayViewD<'_, f32>) -> Result<Array2<f32>>;
}

// Macro to generate execution provider builder methods
macro_rules! with_provider_method {
    ($fn_name:ident, $provider_struct:ident, $provider_enum:ident, $doc:expr) => {
        #[doc = $doc]
        #[must_use]
        pub fn $fn_name(mut self) -> Self {
            use ort::execution_providers::$provider_struct;
            self.execution_providers
                .push($provider_struct::default().into());
            // ONNX Runtime tries providers in insertion order, so the first
            // accelerator is the one worth reporting.
            if self.requested_provider == ExecutionProviderInfo::Cpu {
                self.requested_provider = ExecutionProviderInfo::$provider_enum;
            }
            self
        }
    };
}

/// Builder for [`OnnxModel`]
#[derive(Debug)]
pub struct OnnxModelBuilder {
    model_path: Option<PathBuf>,
    execution_providers: Vec<ort::execution_providers::ExecutionProviderDispatch>,
    requested_provider: ExecutionProviderInfo,
}

impl Default for OnnxModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OnnxModelBuilder {
    /// Create a new model builder
    #[must_use]
    pub const fn new() -> Self {
        Self {
            model_path: None,
            execution_providers: Vec::new(),
            requested_provider: ExecutionProviderInfo::Cpu,
        }
    }

    /// Set the path to the ONNX model file (required)
    #[must_use]
    pub fn model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(path.into());
        self
    }

    /// Add an execution provider. Providers are tried in order; CPU is the fallback.
    #[must_use]
    pub fn execution_provider(
        mut self,
        provider: impl Into<ort::execution_providers::ExecutionProviderDispatch>,
    ) -> Self {
        self.execution_providers.push(provider.into());
        self
    }

    with_provider_method!(
        with_cuda,
        CUDAExecutionProvider,
        Cuda,
        "Request CUDA execution provider (NVIDIA GPU)"
    );
    with_provider_method!(
        with_tensorrt,
        TensorRTExecutionProvider,
        TensorRt,
        "Request `TensorRT` execution provider (NVIDIA GPU)"
    );
    with_provider_method!(
        with_coreml,
        CoreMLExecutionProvider,
        CoreMl,
        "Request `CoreML` execution provider (Apple Neural Engine)"
    );
    with_provider_method!(
        with_rocm,
        ROCmExecutionProvider,
        Rocm,
        "Request `ROCm` execution provider (AMD GPU)"
    );

    /// Load the model and detect its grid shape and label count.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Model path was not set
    /// - Model file cannot be loaded
    /// - Input or output shapes are not `[batch, *grid]` / `[batch, labels]`
    pub fn build(self) -> Result<OnnxModel> {
        let model_path = self.model_path.ok_or(Error::ModelPathRequired)?;

        let mut session_builder = Session::builder().map_err(Error::ModelLoad)?;
        for provider in self.execution_providers {
            session_builder = session_builder
                .with_execution_providers([provider])
                .map_err(Error::ModelLoad)?;
        }

        let session = session_builder
            .commit_from_file(&model_path)
            .map_err(Error::ModelLoad)?;

        let input_shape = extract_input_shape(&session)?;
        let output_shapes = extract_output_shapes(&session)?;
        let config = detect_model_config(&input_shape, &output_shapes)?;

        log::info!(
            "loaded model {} (grid {:?}, {} values per sample, {} labels, provider {})",
            model_path.display(),
            config.grid_shape,
            config.grid_len(),
            config.num_labels,
            self.requested_provider.as_str()
        );

        Ok(OnnxModel {
            session,
            config,
            requested_provider: self.requested_provider,
        })
    }
}

/// Extract input tensor shape from session
fn extract_input_shape(session: &Session) -> Result<Vec<i64>> {
    let input = session
        .inputs
        .first()
        .ok_or_else(|| Error::ModelDetection {
            reason: "model has no inputs".to_string(),
        })?;

    let shape = input
        .input_type
        .tensor_shape()
        .ok_or_else(|| Error::ModelDetection {
            reason: "input is not a tensor".to_string(),
        })?;

    Ok(shape.iter().copied().collect())
}

/// Extract output tensor shapes from session
fn extract_output_shapes(session: &Session) -> Result<Vec<Vec<i64>>> {
    session
        .outputs
        .iter()
        .map(|output| {
            let shape = output
                .output_type
                .tensor_shape()
                .ok_or_else(|| Error::ModelDetection {
                    reason: "output is not a tensor".to_string(),
                })?;
            Ok(shape.iter().copied().collect())
        })
        .collect()
}

/// Pharmacophore classifier loaded from an ONNX file.
///
/// Use `OnnxModel::builder()` to construct.
pub struct OnnxModel {
    session: Session,
    config: ModelConfig,
    requested_provider: ExecutionProviderInfo,
}

impl std::fmt::Debug for OnnxModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxModel")
            .field("config", &self.config)
            .field("requested_provider", &self.requested_provider)
            .finish_non_exhaustive()
    }
}

impl OnnxModel {
    /// Create a new model builder
    #[must_use]
    pub const fn builder() -> OnnxModelBuilder {
        OnnxModelBuilder::new()
    }

    /// Get the detected model configuration
    #[must_use]
    pub const fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Execution provider requested at build time. ONNX Runtime silently
    /// falls back to CPU when it is unavailable.
    #[must_use]
    pub const fn requested_provider(&self) -> ExecutionProviderInfo {
        self.requested_provider
    }
}

impl Model for OnnxModel {
    fn grid_shape(&self) -> &[usize] {
        &self.config.grid_shape
    }

    fn num_labels(&self) -> usize {
        self.config.num_labels
    }

    fn forward(&mut self, grids: ArrayViewD<'_, f32>) -> Result<Array2<f32>> {
        let batch_size = grids.shape().first().copied().unwrap_or(0);
        let num_labels = self.config.num_labels;

        // Borrows the accumulator buffer directly, no staging copy.
        let input = TensorRef::from_array_view(grids)
            .map_err(|e| Error::Inference(format!("failed to create input tensor: {e}")))?;

        let outputs = self
            .session
            .run(ort::inputs![input])
            .map_err(|e| Error::Inference(e.to_string()))?;

        let name = outputs
            .keys()
            .next()
            .ok_or_else(|| Error::Inference("missing output tensor".to_string()))?;
        let tensor = outputs
            .get(name)
            .ok_or_else(|| Error::Inference(format!("missing output tensor '{name}'")))?;

        let (shape, data) = tensor
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::Inference(e.to_string()))?;

        let expected = [batch_size, num_labels];
        let got: Vec<i64> = shape.iter().copied().collect();
        let dims: Vec<Option<usize>> = got.iter().map(|&d| usize::try_from(d).ok()).collect();
        if dims != [Some(batch_size), Some(num_labels)] || data.len() != batch_size * num_labels {
            return Err(Error::Inference(format!(
                "expected logits of shape {expected:?}, got {got:?}"
            )));
        }

        Array2::from_shape_vec((batch_size, num_labels), data.to_vec())
            .map_err(|e| Error::Inference(format!("failed to shape logits: {e}")))
    }
}
