use crate::error::Result;
use crate::loss::{check_labels, Loss};
use crate::math::matrix::Matrix;

/// Mean squared error between the scores and one-hot encoded labels,
/// averaged over every element of the batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct MseLoss;

fn one_hot_diff(scores: &Matrix, labels: &[usize]) -> Matrix {
    let mut diff = scores.clone();
    for (row, &label) in diff.data.iter_mut().zip(labels.iter()) {
        row[label] -= 1.0;
    }
    diff
}

impl Loss for MseLoss {
    fn loss(&self, scores: &Matrix, labels: &[usize]) -> Result<f64> {
        check_labels(scores, labels)?;
        let diff = one_hot_diff(scores, labels);
        let total: f64 = diff.data.iter().flatten().map(|d| d * d).sum();
        Ok(total / scores.len() as f64)
    }

    /// 2·(scores − onehot) / (rows·cols)
    fn gradient(&self, scores: &Matrix, labels: &[usize]) -> Result<Matrix> {
        check_labels(scores, labels)?;
        Ok(one_hot_diff(scores, labels).scale(2.0 / scores.len() as f64))
    }
}
