use thiserror::Error;

/// Errors that can occur while running pharmacophore inference.
#[derive(Debug, Error)]
pub enum Error {
    /// Pipeline configuration is invalid.
    #[error("invalid configuration: {reason}")]
    Config {
        /// Reason the configuration was rejected.
        reason: String,
    },

    /// Number of labels doesn't match model output size.
    #[error("label count mismatch: model expects {expected}, got {got}")]
    LabelCount {
        /// Label count produced by the model.
        expected: usize,
        /// Size of the configured vocabulary.
        got: usize,
    },

    /// Failed to load labels from file.
    #[error("failed to load labels from {path}: {reason}")]
    LabelLoad {
        /// Path that failed to load.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Failed to parse label file content.
    #[error("failed to parse labels: {0}")]
    LabelParse(String),

    /// Model path was not provided to builder.
    #[error("model path required")]
    ModelPathRequired,

    /// Failed to load ONNX model.
    #[error("failed to load model: {0}")]
    ModelLoad(#[from] ort::Error),

    /// Model tensor shapes are not usable for grid inference.
    #[error("model detection failed: {reason}")]
    ModelDetection {
        /// Reason for detection failure.
        reason: String,
    },

    /// A grid sample has a different shape than the model input.
    #[error("grid shape mismatch: sample {index} has shape {got:?}, expected {expected:?}")]
    GridShape {
        /// Position of the sample in its complex's stream.
        index: usize,
        /// Per-sample shape expected by the model.
        expected: Vec<usize>,
        /// Shape of the offending sample.
        got: Vec<usize>,
    },

    /// Inference execution failed.
    #[error("inference failed: {0}")]
    Inference(String),

    /// Sample centers don't form a regular lattice.
    #[error("inconsistent grid geometry: {reason}")]
    Geometry {
        /// Which lattice property was violated.
        reason: String,
    },

    /// The grid data source could not be read.
    #[error("failed to read grid data from {path}: {reason}")]
    DataSource {
        /// Path of the offending listing or array file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// An output file could not be created.
    #[error("failed to create output file {path}: {reason}")]
    OutputFile {
        /// Path of the output file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to initialize ONNX Runtime.
    #[error("failed to initialize ONNX Runtime: {0}")]
    RuntimeInit(String),
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
