use serde::{Serialize, Deserialize};

use crate::error::Result;
use crate::loss::{CrossEntropyLoss, Loss, MseLoss};
use crate::math::matrix::Matrix;

/// Selects which loss function the training loop uses.
///
/// - `CrossEntropy` — softmax cross-entropy on raw scores; pair with a linear output.
/// - `Mse`          — squared error against one-hot labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossType {
    #[default]
    CrossEntropy,
    Mse,
}

impl Loss for LossType {
    fn loss(&self, scores: &Matrix, labels: &[usize]) -> Result<f64> {
        match self {
            LossType::CrossEntropy => CrossEntropyLoss.loss(scores, labels),
            LossType::Mse          => MseLoss.loss(scores, labels),
        }
    }

    fn gradient(&self, scores: &Matrix, labels: &[usize]) -> Result<Matrix> {
        match self {
            LossType::CrossEntropy => CrossEntropyLoss.gradient(scores, labels),
            LossType::Mse          => MseLoss.gradient(scores, labels),
        }
    }
}
