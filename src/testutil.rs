//! Test utilities for creating mock data
//!
//! This module is only compiled in test builds.

#![allow(clippy::unwrap_used)] // Tests can use unwrap
#![allow(clippy::cast_precision_loss)] // Sample index casts are fine for test utilities
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use crate::error::{Error, Result};
use crate::model::Model;
use crate::source::GridSource;
use crate::types::{Center, Complex, GridSample};
use ndarray::{Array2, ArrayD, ArrayViewD, IxDyn};
use std::collections::HashMap;

/// Logit magnitude produced by [`MockModel`]; sigmoid(4) ≈ 0.982.
pub const MOCK_LOGIT: f32 = 4.0;

/// Create a sample whose grid is filled with `value` and whose center is `(value, 0, 0)`.
pub fn filled_sample(value: f32, shape: &[usize]) -> GridSample {
    GridSample::new([value, 0.0, 0.0], ArrayD::from_elem(IxDyn(shape), value))
}

/// Create `count` samples valued `0, 1, 2, ...`.
pub fn mock_samples(count: usize, shape: &[usize]) -> Vec<GridSample> {
    (0..count).map(|i| filled_sample(i as f32, shape)).collect()
}

/// Centers of a regular lattice in DX scan order (z fastest, x slowest).
pub fn lattice_centers(counts: [usize; 3], origin: Center, spacing: f32) -> Vec<Center> {
    let mut centers = Vec::with_capacity(counts.iter().product());
    for i in 0..counts[0] {
        for j in 0..counts[1] {
            for k in 0..counts[2] {
                centers.push([
                    (i as f32).mul_add(spacing, origin[0]),
                    (j as f32).mul_add(spacing, origin[1]),
                    (k as f32).mul_add(spacing, origin[2]),
                ]);
            }
        }
    }
    centers
}

/// Deterministic model: a sample whose grid starts with value `v` activates
/// label `v mod num_labels` and no other.
#[derive(Debug)]
pub struct MockModel {
    pub grid_shape: Vec<usize>,
    pub num_labels: usize,
    /// Batch sizes seen by `forward`, in call order.
    pub calls: Vec<usize>,
    /// Fail on this call index.
    pub fail_on: Option<usize>,
}

impl MockModel {
    pub fn new(grid_shape: &[usize], num_labels: usize) -> Self {
        Self {
            grid_shape: grid_shape.to_vec(),
            num_labels,
            calls: Vec::new(),
            fail_on: None,
        }
    }
}

impl Model for MockModel {
    fn grid_shape(&self) -> &[usize] {
        &self.grid_shape
    }

    fn num_labels(&self) -> usize {
        self.num_labels
    }

    fn forward(&mut self, grids: ArrayViewD<'_, f32>) -> Result<Array2<f32>> {
        if self.fail_on == Some(self.calls.len()) {
            return Err(Error::Inference("mock failure".into()));
        }
        let batch = grids.shape()[0];
        self.calls.push(batch);

        let mut logits = Array2::from_elem((batch, self.num_labels), -MOCK_LOGIT);
        for (row, grid) in grids.outer_iter().enumerate() {
            let value = grid.iter().next().copied().unwrap_or(0.0);
            let label = (value.max(0.0) as usize) % self.num_labels;
            logits[[row, label]] = MOCK_LOGIT;
        }
        Ok(logits)
    }
}

/// In-memory grid source.
#[derive(Debug, Default)]
pub struct MemorySource {
    complexes: Vec<Complex>,
    samples: HashMap<Complex, Vec<GridSample>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_complex(mut self, complex: Complex, samples: Vec<GridSample>) -> Self {
        self.complexes.push(complex.clone());
        self.samples.insert(complex, samples);
        self
    }
}

impl GridSource for MemorySource {
    fn complexes(&self) -> &[Complex] {
        &self.complexes
    }

    fn samples<'a>(
        &'a self,
        complex: &Complex,
    ) -> Result<Box<dyn Iterator<Item = Result<GridSample>> + 'a>> {
        let samples = self.samples.get(complex).ok_or_else(|| Error::DataSource {
            path: complex.ligand.clone(),
            reason: "unknown complex".into(),
        })?;
        Ok(Box::new(samples.iter().cloned().map(Ok::<_, Error>)))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_filled_sample() {
        let sample = filled_sample(3.0, &[1, 2, 2]);
        assert_eq!(sample.center, [3.0, 0.0, 0.0]);
        assert_eq!(sample.grid.shape(), &[1, 2, 2]);
        assert!(sample.grid.iter().all(|&v| v == 3.0));
    }

    #[test]
    fn test_lattice_centers_scan_order() {
        let centers = lattice_centers([2, 1, 2], [0.0, 0.0, 0.0], 1.0);
        assert_eq!(
            centers,
            vec![
                [0.0, 0.0, 0.0],
                [0.0, 0.0, 1.0],
                [1.0, 0.0, 0.0],
                [1.0, 0.0, 1.0]
            ]
        );
    }

    #[test]
    fn test_mock_model_activates_one_label() {
        let mut model = MockModel::new(&[2], 3);
        let mut grids = ArrayD::zeros(IxDyn(&[2, 2]));
        grids[[1, 0]] = 4.0;
        let logits = model.forward(grids.view()).unwrap();
        assert_eq!(logits.shape(), &[2, 3]);
        assert_eq!(logits[[0, 0]], MOCK_LOGIT);
        assert_eq!(logits[[1, 1]], MOCK_LOGIT);
        assert_eq!(logits[[1, 0]], -MOCK_LOGIT);
        assert_eq!(model.calls, vec![2]);
    }

    #[test]
    fn test_memory_source_unknown_complex() {
        let source = MemorySource::new();
        assert!(source.samples(&Complex::new("l", "p")).is_err());
    }
}
