use serde::{Serialize, Deserialize};
use std::f64::consts::E;

use crate::math::matrix::Matrix;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActivationFunction {
    Sigmoid,
    ReLU,
    Identity,
    Tanh,
    LeakyReLU { alpha: f64 },
    /// Applied per row, not element-wise. `backward` uses the full Jacobian.
    Softmax,
}

impl ActivationFunction {
    /// Element-wise activation. `Softmax` has no scalar form and is the
    /// identity here; use `forward` for whole batches.
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => 1.0 / (1.0 + E.powf(-x)),
            ActivationFunction::ReLU => if x > 0.0 { x } else { 0.0 },
            ActivationFunction::Identity | ActivationFunction::Softmax => x,
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { x } else { alpha * x },
        }
    }

    /// Element-wise derivative with respect to the pre-activation `x`.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => {
                let fx = self.function(x);
                fx * (1.0 - fx)
            }
            ActivationFunction::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::Identity | ActivationFunction::Softmax => 1.0,
            ActivationFunction::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { 1.0 } else { *alpha },
        }
    }

    /// Applies the activation to a batch of pre-activations.
    pub fn forward(&self, z: &Matrix) -> Matrix {
        match self {
            ActivationFunction::Softmax => z.softmax_rows(),
            _ => z.map(|x| self.function(x)),
        }
    }

    /// Maps ∂L/∂a to ∂L/∂z given the cached pre-activation `z` and output `a`.
    pub fn backward(&self, grad_output: &Matrix, z: &Matrix, a: &Matrix) -> Matrix {
        match self {
            ActivationFunction::Softmax => {
                // ∂L/∂z_i = a_i · (g_i − Σ_j g_j a_j), row by row.
                let data = grad_output.data.iter().zip(a.data.iter())
                    .map(|(g, s)| {
                        let dot: f64 = g.iter().zip(s.iter()).map(|(gi, si)| gi * si).sum();
                        g.iter().zip(s.iter()).map(|(gi, si)| si * (gi - dot)).collect()
                    })
                    .collect();
                Matrix::from_data(data)
            }
            _ => grad_output.hadamard(&z.map(|x| self.derivative(x))),
        }
    }

    /// Whether He initialization suits layers using this activation.
    pub fn prefers_he_init(&self) -> bool {
        matches!(self, ActivationFunction::ReLU | ActivationFunction::LeakyReLU { .. })
    }
}
