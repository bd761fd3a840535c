use ndarray::ArrayD;

/// Cartesian center of a grid sample, in Ångström.
pub type Center = [f32; 3];

/// One protein-ligand pair being annotated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Complex {
    /// Ligand identifier, usually a path relative to the data root.
    pub ligand: String,
    /// Protein identifier, usually a path relative to the data root.
    pub protein: String,
}

impl Complex {
    /// Create a complex from its ligand and protein identifiers.
    #[must_use]
    pub fn new(ligand: impl Into<String>, protein: impl Into<String>) -> Self {
        Self {
            ligand: ligand.into(),
            protein: protein.into(),
        }
    }
}

/// One model input: a dense grid centered on a lattice point.
#[derive(Debug, Clone)]
pub struct GridSample {
    /// Lattice point the grid is centered on.
    pub center: Center,
    /// Voxelized input, shape must equal the model's per-sample shape.
    pub grid: ArrayD<f32>,
}

impl GridSample {
    /// Create a sample from its center and grid.
    #[must_use]
    pub const fn new(center: Center, grid: ArrayD<f32>) -> Self {
        Self { center, grid }
    }
}

/// A prediction ready for the tabular writer.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledPoint<'a> {
    /// Active label names, in vocabulary order.
    pub labels: Vec<&'a str>,
    /// Lattice point the prediction belongs to.
    pub center: Center,
    /// Complex the point was sampled from.
    pub complex: &'a Complex,
}

/// Model shape information derived from the ONNX graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    /// Per-sample input shape, batch axis excluded (e.g. `[channels, d, d, d]`).
    pub grid_shape: Vec<usize>,
    /// Number of labels in the model output.
    pub num_labels: usize,
}

impl ModelConfig {
    /// Number of `f32` elements in one grid sample.
    #[must_use]
    pub fn grid_len(&self) -> usize {
        self.grid_shape.iter().product()
    }
}

/// Execution providers the CLI knows how to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionProviderInfo {
    /// Default CPU provider.
    Cpu,
    /// NVIDIA CUDA.
    Cuda,
    /// NVIDIA `TensorRT`.
    TensorRt,
    /// Apple `CoreML`.
    CoreMl,
    /// AMD `ROCm`.
    Rocm,
}

impl ExecutionProviderInfo {
    /// Lower-case name used on the command line.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Cuda => "cuda",
            Self::TensorRt => "tensorrt",
            Self::CoreMl => "coreml",
            Self::Rocm => "rocm",
        }
    }
}
