pub mod cross_entropy;
pub mod loss_type;
pub mod mse;

pub use cross_entropy::CrossEntropyLoss;
pub use loss_type::LossType;
pub use mse::MseLoss;

use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

/// A classification loss over raw scores and integer class labels.
pub trait Loss {
    /// Scalar loss averaged over the batch.
    fn loss(&self, scores: &Matrix, labels: &[usize]) -> Result<f64>;

    /// ∂loss/∂scores, same shape as `scores`.
    fn gradient(&self, scores: &Matrix, labels: &[usize]) -> Result<Matrix>;
}

/// Checks that `labels` has one entry per row, each a valid column index.
pub fn check_labels(scores: &Matrix, labels: &[usize]) -> Result<()> {
    if scores.rows == 0 {
        return Err(Error::EmptyBatch);
    }
    if labels.len() != scores.rows {
        return Err(Error::LabelCount { rows: scores.rows, labels: labels.len() });
    }
    if let Some(&label) = labels.iter().find(|&&l| l >= scores.cols) {
        return Err(Error::LabelOutOfRange { label, classes: scores.cols });
    }
    Ok(())
}
