//! End-to-end inference over dataset splits.
//!
//! For every complex of a split the pipeline streams its grid samples through
//! the batch buffer, runs the model, writes one tabular line per sample and,
//! when enabled, one DX file per label.

use crate::batch::BatchAccumulator;
use crate::config::PipelineConfig;
use crate::dx::{GridGeometry, volume_output_path, write_dx_file};
use crate::error::{Error, Result};
use crate::labels::LabelVocabulary;
use crate::model::Model;
use crate::postprocess::{active_labels, volume_value};
use crate::runner::run_batch;
use crate::source::GridSource;
use crate::tabular::TabularWriter;
use crate::types::{Center, Complex, LabeledPoint};
use std::fs::File;
use std::io::{BufWriter, Write};

/// Predictions for all samples of one complex, in stream order.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexPredictions {
    /// Sample centers.
    pub centers: Vec<Center>,
    /// Row-major probabilities, `num_labels` per center.
    pub probabilities: Vec<f32>,
    /// Probabilities per center.
    pub num_labels: usize,
    /// Model calls made for this complex.
    pub batches: usize,
}

impl ComplexPredictions {
    /// Number of predicted points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    /// Whether the complex had no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    /// `(center, probabilities)` pairs in stream order.
    pub fn rows(&self) -> impl Iterator<Item = (&Center, &[f32])> {
        self.centers
            .iter()
            .zip(self.probabilities.chunks_exact(self.num_labels.max(1)))
    }

    /// Values of one label across all points, ready for a DX file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Inference`] if `label` is not a column of the
    /// predictions.
    pub fn label_values(&self, label: usize, round: bool) -> Result<Vec<f32>> {
        if label >= self.num_labels {
            return Err(Error::Inference(format!(
                "label {label} out of range for {} predicted labels",
                self.num_labels
            )));
        }
        Ok(self
            .rows()
            .map(|(_, probs)| volume_value(probs[label], round))
            .collect())
    }
}

/// Counters for one processed split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitSummary {
    /// Complexes processed.
    pub complexes: usize,
    /// Samples predicted, equal to the tabular lines written.
    pub samples: usize,
    /// Model calls.
    pub batches: usize,
    /// DX files written.
    pub volume_files: usize,
}

/// Batch inference driver for one model and vocabulary.
#[derive(Debug)]
pub struct InferencePipeline<M: Model> {
    model: M,
    vocabulary: LabelVocabulary,
    config: PipelineConfig,
    accumulator: BatchAccumulator,
}

impl<M: Model> InferencePipeline<M> {
    /// Create a pipeline. The batch buffer is allocated here, once per run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an invalid configuration and
    /// [`Error::LabelCount`] if the vocabulary size differs from the model's
    /// label count.
    pub fn new(model: M, vocabulary: LabelVocabulary, config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        if vocabulary.len() != model.num_labels() {
            return Err(Error::LabelCount {
                expected: model.num_labels(),
                got: vocabulary.len(),
            });
        }

        let accumulator = BatchAccumulator::new(config.batch_size, model.grid_shape())?;

        Ok(Self {
            model,
            vocabulary,
            config,
            accumulator,
        })
    }

    /// The wrapped model.
    #[must_use]
    pub const fn model(&self) -> &M {
        &self.model
    }

    /// The label vocabulary.
    #[must_use]
    pub const fn vocabulary(&self) -> &LabelVocabulary {
        &self.vocabulary
    }

    /// The run configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the model over every sample of `complex`.
    ///
    /// # Errors
    ///
    /// Returns the first data source, shape or inference error.
    pub fn predict_complex(
        &mut self,
        complex: &Complex,
        source: &dyn GridSource,
    ) -> Result<ComplexPredictions> {
        let num_labels = self.vocabulary.len();
        let mut centers = Vec::new();
        let mut probabilities = Vec::new();
        let model = &mut self.model;

        let batches = self.accumulator.drain(source.samples(complex)?, |batch| {
            let probs = run_batch(model, &batch)?;
            centers.extend_from_slice(batch.centers);
            probabilities.extend(probs.iter().copied());
            Ok(())
        })?;

        log::debug!(
            "{}: {} samples in {batches} batches",
            complex.ligand,
            centers.len()
        );

        Ok(ComplexPredictions {
            centers,
            probabilities,
            num_labels,
            batches,
        })
    }

    /// Write one tabular line per prediction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if writing fails.
    pub fn write_tabular<W: Write>(
        &self,
        complex: &Complex,
        predictions: &ComplexPredictions,
        writer: &mut TabularWriter<W>,
    ) -> Result<()> {
        for (center, probs) in predictions.rows() {
            writer.write_point(&LabeledPoint {
                labels: active_labels(probs, &self.vocabulary),
                center: *center,
                complex,
            })?;
        }
        Ok(())
    }

    /// Write one DX file per label for `complex` and return how many were
    /// written. The lattice is checked before any file is created.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Geometry`] for centers that don't form a lattice at
    /// the configured resolution, or an output error.
    pub fn write_volumes(
        &self,
        complex: &Complex,
        predictions: &ComplexPredictions,
    ) -> Result<usize> {
        if predictions.is_empty() {
            log::warn!("{}: no samples, skipping volume output", complex.ligand);
            return Ok(0);
        }

        let geometry = GridGeometry::from_centers(&predictions.centers, self.config.resolution)?;

        for (index, label) in self.vocabulary.iter() {
            let path = volume_output_path(
                &complex.protein,
                &self.config.volume_root,
                &self.config.volume_filename_prefix,
                label,
            );
            let values = predictions.label_values(index, self.config.round_volume_values)?;
            write_dx_file(&path, &geometry, &values)?;
            log::debug!("wrote {}", path.display());
        }

        Ok(self.vocabulary.len())
    }

    /// Process every complex of `source`, appending lines to `writer`.
    ///
    /// # Errors
    ///
    /// Stops at the first error.
    pub fn process_split<W: Write>(
        &mut self,
        source: &dyn GridSource,
        writer: &mut TabularWriter<W>,
    ) -> Result<SplitSummary> {
        let mut summary = SplitSummary::default();

        for complex in source.complexes() {
            let predictions = self.predict_complex(complex, source)?;
            self.write_tabular(complex, &predictions, writer)?;

            if self.config.create_volume_output {
                summary.volume_files += self.write_volumes(complex, &predictions)?;
            }

            summary.complexes += 1;
            summary.samples += predictions.len();
            summary.batches += predictions.batches;
        }

        Ok(summary)
    }

    /// Process `source` into `<output_base_path>_<split>.txt`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutputFile`] if the tabular file can't be created,
    /// or the first processing error.
    pub fn run_split(&mut self, split: &str, source: &dyn GridSource) -> Result<SplitSummary> {
        let path = self.config.tabular_path(split);
        let file = File::create(&path).map_err(|e| Error::OutputFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut writer = TabularWriter::new(BufWriter::new(file));
        let summary = self.process_split(source, &mut writer)?;
        writer.finish()?;

        log::info!(
            "{split}: {} complexes, {} points written to {}",
            summary.complexes,
            summary.samples,
            path.display()
        );
        if self.config.create_volume_output {
            log::info!("{split}: {} volume files", summary.volume_files);
        }

        Ok(summary)
    }

    /// Evaluate the training split, then the test split.
    ///
    /// # Errors
    ///
    /// Stops at the first error; the test split is not started if the
    /// training split fails.
    pub fn run(
        &mut self,
        train: &dyn GridSource,
        test: &dyn GridSource,
    ) -> Result<(SplitSummary, SplitSummary)> {
        log::info!("training set eval");
        let train_summary = self.run_split("train", train)?;
        log::info!("test set eval");
        let test_summary = self.run_split("test", test)?;
        Ok((train_summary, test_summary))
    }
}
