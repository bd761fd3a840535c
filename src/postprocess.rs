//! Prediction post-processing: sigmoid, thresholding and volume values.
//!
//! Thresholding rounds half to even (`f32::round_ties_even`). A probability
//! of exactly 0.5 rounds to 0 and the label is inactive.

use crate::labels::LabelVocabulary;

/// Sigmoid activation function
#[inline]
#[must_use]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Round a probability to 0 or 1, ties to even.
#[inline]
#[must_use]
pub fn round_half_even(probability: f32) -> f32 {
    probability.round_ties_even()
}

/// Whether a probability marks its label as present.
#[inline]
#[must_use]
pub fn is_active(probability: f32) -> bool {
    round_half_even(probability) >= 1.0
}

/// Names of the active labels of one prediction, in vocabulary order.
#[must_use]
pub fn active_labels<'v>(probabilities: &[f32], vocabulary: &'v LabelVocabulary) -> Vec<&'v str> {
    vocabulary
        .iter()
        .zip(probabilities)
        .filter(|(_, p)| is_active(**p))
        .map(|((_, name), _)| name)
        .collect()
}

/// Value written to a volume file for one probability.
#[inline]
#[must_use]
pub fn volume_value(probability: f32, round: bool) -> f32 {
    if round {
        round_half_even(probability)
    } else {
        probability
    }
}
