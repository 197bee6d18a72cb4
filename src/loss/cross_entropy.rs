use crate::error::Result;
use crate::loss::{check_labels, Loss};
use crate::math::matrix::{log_sum_exp, Matrix};

/// Softmax cross-entropy computed directly on raw scores (logits).
///
/// Pair it with a linear output layer: the softmax is part of the loss, so the
/// gradient w.r.t. the scores simplifies to `(softmax - onehot) / batch`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropyLoss;

impl Loss for CrossEntropyLoss {
    /// mean over rows of `logsumexp(z) - z[label]`
    fn loss(&self, scores: &Matrix, labels: &[usize]) -> Result<f64> {
        check_labels(scores, labels)?;
        let total: f64 = scores.data.iter().zip(labels.iter())
            .map(|(row, &label)| log_sum_exp(row) - row[label])
            .sum();
        Ok(total / scores.rows as f64)
    }

    fn gradient(&self, scores: &Matrix, labels: &[usize]) -> Result<Matrix> {
        check_labels(scores, labels)?;
        let inv_batch = 1.0 / scores.rows as f64;
        let mut grad = scores.softmax_rows();
        for (row, &label) in grad.data.iter_mut().zip(labels.iter()) {
            row[label] -= 1.0;
            row.iter_mut().for_each(|g| *g *= inv_batch);
        }
        Ok(grad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use approx::assert_abs_diff_eq;

    #[test]
    fn uniform_scores_give_log_classes() {
        let scores = Matrix::zeros(3, 10);
        let loss = CrossEntropyLoss.loss(&scores, &[0, 4, 9]).unwrap();
        assert_abs_diff_eq!(loss, 10.0_f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let scores = Matrix::from_data(vec![vec![1.0, -0.5, 0.2], vec![0.0, 2.0, -1.0]]);
        let labels = [2, 1];
        let grad = CrossEntropyLoss.gradient(&scores, &labels).unwrap();
        let h = 1e-6;
        for i in 0..2 {
            for j in 0..3 {
                let mut plus = scores.clone();
                plus.data[i][j] += h;
                let mut minus = scores.clone();
                minus.data[i][j] -= h;
                let numeric = (CrossEntropyLoss.loss(&plus, &labels).unwrap()
                    - CrossEntropyLoss.loss(&minus, &labels).unwrap()) / (2.0 * h);
                assert_abs_diff_eq!(grad.data[i][j], numeric, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn rejects_bad_labels() {
        let scores = Matrix::zeros(2, 3);
        assert!(matches!(CrossEntropyLoss.loss(&scores, &[0]), Err(Error::LabelCount { rows: 2, labels: 1 })));
        assert!(matches!(CrossEntropyLoss.loss(&scores, &[0, 3]), Err(Error::LabelOutOfRange { label: 3, classes: 3 })));
        assert!(matches!(CrossEntropyLoss.loss(&Matrix::zeros(0, 3), &[]), Err(Error::EmptyBatch)));
    }
}
