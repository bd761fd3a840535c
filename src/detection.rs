//! Grid shape and label count detection from ONNX tensor shapes.

use crate::error::{Error, Result};
use crate::types::ModelConfig;

/// Derive the per-sample grid shape and label count of a model.
///
/// # Arguments
/// * `input_shape` - Input tensor shape, `[batch, *grid_shape]`; the batch axis may be dynamic
/// * `output_shapes` - Output tensor shapes; the first must be `[batch, labels]`
///
/// # Errors
/// Returns [`Error::ModelDetection`] if the model structure is not usable.
pub fn detect_model_config(input_shape: &[i64], output_shapes: &[Vec<i64>]) -> Result<ModelConfig> {
    if input_shape.len() < 2 {
        return Err(Error::ModelDetection {
            reason: format!("unexpected input shape: {input_shape:?}"),
        });
    }

    let grid_shape = input_shape[1..]
        .iter()
        .map(|&d| fixed_dim(d, "input"))
        .collect::<Result<Vec<_>>>()?;

    let logits = output_shapes.first().ok_or_else(|| Error::ModelDetection {
        reason: "model has no outputs".to_string(),
    })?;
    if logits.len() != 2 {
        return Err(Error::ModelDetection {
            reason: format!("expected [batch, labels] output, got {logits:?}"),
        });
    }
    let num_labels = fixed_dim(logits[1], "output")?;

    Ok(ModelConfig {
        grid_shape,
        num_labels,
    })
}

/// Convert a non-batch dimension, rejecting dynamic (`-1`) and zero sizes.
fn fixed_dim(value: i64, what: &str) -> Result<usize> {
    match usize::try_from(value) {
        Ok(d) if d > 0 => Ok(d),
        _ => Err(Error::ModelDetection {
            reason: format!("{what} has dynamic or invalid dimension {value}"),
        }),
    }
}
