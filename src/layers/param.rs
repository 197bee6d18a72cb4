use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;

/// A learnable tensor together with its accumulated gradient.
///
/// The gradient is not serialized; a freshly loaded parameter reports no
/// gradient until the first backward pass accumulates one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub value: Matrix,
    #[serde(skip)]
    grad: Option<Matrix>,
    /// Frozen parameters are ignored by optimizers and by the trainable count.
    #[serde(default = "default_trainable")]
    pub trainable: bool,
}

fn default_trainable() -> bool {
    true
}

impl Param {
    pub fn new(value: Matrix) -> Param {
        Param { value, grad: None, trainable: true }
    }

    /// Number of scalar values held by this parameter.
    pub fn numel(&self) -> usize {
        self.value.len()
    }

    pub fn grad(&self) -> Option<&Matrix> {
        self.grad.as_ref()
    }

    /// Clears the accumulated gradient.
    pub fn zero_grad(&mut self) {
        match self.grad.as_mut() {
            Some(g) if g.shape() == self.value.shape() => g.fill(0.0),
            _ => self.grad = Some(Matrix::zeros(self.value.rows, self.value.cols)),
        }
    }

    /// Adds `delta` to the accumulated gradient. No-op for frozen parameters.
    pub fn accumulate(&mut self, delta: &Matrix) {
        if !self.trainable {
            return;
        }
        match self.grad.as_mut() {
            Some(g) if g.shape() == delta.shape() => g.add_assign(delta),
            _ => self.grad = Some(delta.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_until_cleared() {
        let mut p = Param::new(Matrix::zeros(1, 2));
        assert!(p.grad().is_none());
        let d = Matrix::from_data(vec![vec![1.0, 2.0]]);
        p.accumulate(&d);
        p.accumulate(&d);
        assert_eq!(p.grad().unwrap().data, vec![vec![2.0, 4.0]]);
        p.zero_grad();
        assert_eq!(p.grad().unwrap().data, vec![vec![0.0, 0.0]]);
    }

    #[test]
    fn frozen_params_ignore_gradients() {
        let mut p = Param::new(Matrix::zeros(1, 1));
        p.trainable = false;
        p.accumulate(&Matrix::from_data(vec![vec![3.0]]));
        assert!(p.grad().is_none());
    }
}
