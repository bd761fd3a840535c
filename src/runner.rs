//! Batch inference: model call plus sigmoid.

use crate::batch::Batch;
use crate::error::{Error, Result};
use crate::model::Model;
use crate::postprocess::sigmoid;
use ndarray::Array2;

/// Run `model` on the valid prefix of `batch` and return probabilities of
/// shape `(batch.len(), num_labels)`, one row per sample in batch order.
///
/// # Errors
///
/// Returns the model's error unchanged, or [`Error::Inference`] if the model
/// returns logits of the wrong shape.
pub fn run_batch<M: Model + ?Sized>(model: &mut M, batch: &Batch<'_>) -> Result<Array2<f32>> {
    let expected = (batch.len(), model.num_labels());
    let mut logits = model.forward(batch.grids.view())?;

    if logits.dim() != expected {
        return Err(Error::Inference(format!(
            "expected logits of shape {expected:?}, got {:?}",
            logits.dim()
        )));
    }

    logits.mapv_inplace(sigmoid);
    Ok(logits)
}
