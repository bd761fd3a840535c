//! # pharmnn-onnx
//!
//! Batch inference of pharmacophore features on grid points around
//! protein-ligand binding sites.
//!
//! A trained ONNX classifier scores a voxel grid centered on each lattice
//! point. Each point gets the set of labels whose probability rounds to 1.
//! The results are written as one text line per point and, optionally, as
//! one OpenDX scalar field per label and complex.
//!
//! ## Example
//!
//! ```ignore
//! use pharmnn_onnx::{InferencePipeline, LabelVocabulary, NpyGridSource, OnnxModel, PipelineConfig};
//!
//! let model = OnnxModel::builder()
//!     .model_path("pharmnn.onnx")
//!     .with_cuda()
//!     .build()?;
//!
//! let config = PipelineConfig::new()
//!     .with_output_base_path("predictions")
//!     .with_volume_output(true);
//!
//! let train = NpyGridSource::open("data_train.txt", ".")?;
//! let test = NpyGridSource::open("data_test.txt", ".")?;
//!
//! let mut pipeline = InferencePipeline::new(model, LabelVocabulary::pharmacophore(), config)?;
//! pipeline.run(&train, &test)?;
//! ```

// Crate-level lint configuration
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![deny(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![allow(clippy::module_name_repetitions)]

mod batch;
mod config;
mod detection;
mod dx;
mod error;
mod execution_providers;
mod labels;
mod model;
mod pipeline;
mod postprocess;
mod runner;
mod runtime;
mod source;
mod tabular;
#[cfg(test)]
mod testutil;
mod types;

pub use batch::{Batch, BatchAccumulator};
pub use config::{DEFAULT_BATCH_SIZE, DEFAULT_RESOLUTION, PipelineConfig};
pub use detection::detect_model_config;
pub use dx::{GridGeometry, volume_output_path, write_dx, write_dx_file};
pub use error::{Error, Result};
pub use execution_providers::available_execution_providers;
pub use labels::{LabelVocabulary, PHARMACOPHORE_CATEGORIES};
pub use model::{Model, OnnxModel, OnnxModelBuilder};
pub use pipeline::{ComplexPredictions, InferencePipeline, SplitSummary};
pub use postprocess::{active_labels, is_active, round_half_even, sigmoid, volume_value};
pub use runner::run_batch;
pub use runtime::{find_ort_library, init_runtime};
pub use source::{GridSource, NpyGridSource, SampleStream, read_complex_list, test_listing_for};
pub use tabular::{TabularWriter, format_coordinate};
pub use types::{Center, Complex, ExecutionProviderInfo, GridSample, LabeledPoint, ModelConfig};

// Re-export ort execution providers for convenience
pub use ort::execution_providers as ort_execution_providers;
