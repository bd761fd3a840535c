//! Fixed-capacity batch accumulation with buffer reuse.
//!
//! [`BatchAccumulator`] owns a single input buffer of shape
//! `(capacity, *grid_shape)` that is allocated once and reused for every batch
//! of every complex. Samples are copied into slot `filled` as they arrive; when
//! the buffer is full, or the stream ends with a partial batch, the valid
//! prefix `[0, filled)` is handed to the caller as a [`Batch`] view.
//!
//! Slots past `filled` keep whatever an earlier batch left there and are never
//! exposed.
//!
//! # Example
//!
//! ```ignore
//! let mut acc = BatchAccumulator::new(256, model.grid_shape())?;
//! acc.drain(source.samples(&complex)?, |batch| {
//!     let probabilities = run_batch(&mut model, &batch)?;
//!     // ...
//!     Ok(())
//! })?;
//! ```

use crate::error::{Error, Result};
use crate::types::{Center, GridSample};
use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn, Slice};

/// The valid prefix of the accumulator buffer.
#[derive(Debug)]
pub struct Batch<'a> {
    /// Grids of shape `(len, *grid_shape)`, a view into the shared buffer.
    pub grids: ArrayViewD<'a, f32>,
    /// Centers of the grids, same order.
    pub centers: &'a [Center],
}

impl Batch<'_> {
    /// Fill count of this batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    /// Whether the batch holds no samples. Never true for emitted batches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }
}

/// Reusable input buffer that turns a sample stream into model batches.
///
/// Not thread-safe; the pipeline owns exactly one for the whole run.
#[derive(Debug)]
pub struct BatchAccumulator {
    /// Input tensor, shape `(capacity, *grid_shape)`
    buffer: ArrayD<f32>,
    /// Centers of the samples in slots `[0, filled)`
    centers: Vec<Center>,
    /// Per-sample shape
    grid_shape: Vec<usize>,
    /// Number of valid slots
    filled: usize,
}

impl BatchAccumulator {
    /// Allocate the buffer for `capacity` samples of `grid_shape`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `capacity` is zero.
    pub fn new(capacity: usize, grid_shape: &[usize]) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::Config {
                reason: "batch size must be greater than zero".to_string(),
            });
        }

        let mut shape = Vec::with_capacity(grid_shape.len() + 1);
        shape.push(capacity);
        shape.extend_from_slice(grid_shape);

        Ok(Self {
            buffer: ArrayD::zeros(IxDyn(&shape)),
            centers: Vec::with_capacity(capacity),
            grid_shape: grid_shape.to_vec(),
            filled: 0,
        })
    }

    /// Maximum number of samples per batch.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffer.len_of(Axis(0))
    }

    /// Per-sample shape accepted by [`drain`](Self::drain).
    #[must_use]
    pub fn grid_shape(&self) -> &[usize] {
        &self.grid_shape
    }

    /// Number of samples currently held.
    #[must_use]
    pub const fn filled(&self) -> usize {
        self.filled
    }

    /// Stream `samples` through the buffer, calling `on_batch` for every full
    /// batch and once more for a trailing partial batch.
    ///
    /// Returns the number of batches emitted, `ceil(n / capacity)` for `n`
    /// samples. An empty stream emits nothing.
    ///
    /// # Errors
    ///
    /// Stops at the first error from the stream, a sample with the wrong
    /// shape ([`Error::GridShape`]), or an error returned by `on_batch`.
    pub fn drain<I, F>(&mut self, samples: I, mut on_batch: F) -> Result<usize>
    where
        I: IntoIterator<Item = Result<GridSample>>,
        F: FnMut(Batch<'_>) -> Result<()>,
    {
        self.clear();
        let mut batches = 0;

        for (index, sample) in samples.into_iter().enumerate() {
            let sample = sample?;
            self.push(index, &sample)?;

            if self.filled == self.capacity() {
                on_batch(self.batch())?;
                batches += 1;
                self.clear();
            }
        }

        if self.filled > 0 {
            on_batch(self.batch())?;
            batches += 1;
            self.clear();
        }

        Ok(batches)
    }

    /// View of the valid prefix.
    fn batch(&self) -> Batch<'_> {
        Batch {
            grids: self
                .buffer
                .slice_axis(Axis(0), Slice::from(0..self.filled)),
            centers: &self.centers,
        }
    }

    /// Copy one sample into slot `filled`.
    fn push(&mut self, index: usize, sample: &GridSample) -> Result<()> {
        if sample.grid.shape() != self.grid_shape.as_slice() {
            return Err(Error::GridShape {
                index,
                expected: self.grid_shape.clone(),
                got: sample.grid.shape().to_vec(),
            });
        }

        self.buffer
            .index_axis_mut(Axis(0), self.filled)
            .assign(&sample.grid);
        self.centers.push(sample.center);
        self.filled += 1;
        Ok(())
    }

    /// Reset the fill count. Slot contents are left in place.
    fn clear(&mut self) {
        self.filled = 0;
        self.centers.clear();
    }
}
