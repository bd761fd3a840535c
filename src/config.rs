//! Pipeline configuration.

use crate::error::{Error, Result};
use crate::labels::LabelVocabulary;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default number of samples per model call.
pub const DEFAULT_BATCH_SIZE: usize = 256;

/// Default lattice spacing in angstroms.
pub const DEFAULT_RESOLUTION: f32 = 0.5;

/// Settings for one inference run.
///
/// Every field has a default, so a JSON file only needs the keys it changes:
///
/// ```
/// use pharmnn_onnx::PipelineConfig;
///
/// let config: PipelineConfig =
///     serde_json::from_str(r#"{"batch_size": 64, "create_volume_output": true}"#).unwrap();
/// assert_eq!(config.batch_size, 64);
/// assert!((config.resolution - 0.5).abs() < f32::EPSILON);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Samples per model call.
    pub batch_size: usize,
    /// Write one DX file per (complex, label).
    pub create_volume_output: bool,
    /// Write thresholded 0/1 values to DX files instead of probabilities.
    pub round_volume_values: bool,
    /// Prefix of DX file names.
    pub volume_filename_prefix: String,
    /// Label names in model output order. Takes precedence over `label_file`.
    pub labels: Option<Vec<String>>,
    /// Vocabulary file (text, CSV or JSON).
    pub label_file: Option<PathBuf>,
    /// Tabular files are written to `<output_base_path>_<split>.txt`.
    pub output_base_path: PathBuf,
    /// DX files are written below this directory.
    pub volume_root: PathBuf,
    /// Lattice spacing of the sample centers.
    pub resolution: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            create_volume_output: false,
            round_volume_values: false,
            volume_filename_prefix: String::new(),
            labels: None,
            label_file: None,
            output_base_path: PathBuf::from("predictions"),
            volume_root: PathBuf::from("."),
            resolution: DEFAULT_RESOLUTION,
        }
    }
}

impl PipelineConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file can't be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            reason: format!("failed to read {}: {e}", path.display()),
        })?;
        serde_json::from_str(&content).map_err(|e| Error::Config {
            reason: format!("failed to parse {}: {e}", path.display()),
        })
    }

    /// Set the batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Enable or disable DX output.
    #[must_use]
    pub const fn with_volume_output(mut self, enabled: bool) -> Self {
        self.create_volume_output = enabled;
        self
    }

    /// Write rounded instead of raw probabilities to DX files.
    #[must_use]
    pub const fn with_rounded_volume_values(mut self, round: bool) -> Self {
        self.round_volume_values = round;
        self
    }

    /// Set the DX file name prefix.
    #[must_use]
    pub fn with_volume_filename_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.volume_filename_prefix = prefix.into();
        self
    }

    /// Set the label names explicitly.
    #[must_use]
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = Some(labels);
        self
    }

    /// Load label names from a file.
    #[must_use]
    pub fn with_label_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.label_file = Some(path.into());
        self
    }

    /// Set the base path of the tabular files.
    #[must_use]
    pub fn with_output_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_base_path = path.into();
        self
    }

    /// Set the directory DX files are written below.
    #[must_use]
    pub fn with_volume_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.volume_root = path.into();
        self
    }

    /// Set the lattice spacing.
    #[must_use]
    pub const fn with_resolution(mut self, resolution: f32) -> Self {
        self.resolution = resolution;
        self
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a zero batch size or a resolution that
    /// is not a finite positive number.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config {
                reason: "batch size must be greater than zero".to_string(),
            });
        }
        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(Error::Config {
                reason: format!("resolution must be positive, got {}", self.resolution),
            });
        }
        Ok(())
    }

    /// Resolve the label vocabulary: explicit labels, then the label file,
    /// then the six pharmacophore categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the labels are invalid or the file can't be loaded.
    pub fn vocabulary(&self) -> Result<LabelVocabulary> {
        match (&self.labels, &self.label_file) {
            (Some(labels), _) => LabelVocabulary::new(labels.clone()),
            (None, Some(path)) => LabelVocabulary::from_file(path),
            (None, None) => Ok(LabelVocabulary::pharmacophore()),
        }
    }

    /// Path of the tabular file for `split`.
    #[must_use]
    pub fn tabular_path(&self, split: &str) -> PathBuf {
        let mut name = self.output_base_path.clone().into_os_string();
        name.push(format!("_{split}.txt"));
        PathBuf::from(name)
    }
}
