use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{Error, Result};
use crate::layers::param::Param;
use crate::math::matrix::Matrix;

/// Values recorded by a training forward pass and consumed by `backward`.
#[derive(Debug, Clone)]
struct ForwardCache {
    input: Matrix,
    pre_activation: Matrix,
    output: Matrix,
}

/// Fully connected layer: `a = act(x·W + b)` over a batch of rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub size: usize,
    pub input_size: usize,
    /// Shape [input_size × size].
    pub weights: Param,
    /// Shape [1 × size].
    pub biases: Param,
    pub activator: ActivationFunction,
    #[serde(skip)]
    cache: Option<ForwardCache>,
}

impl Layer {
    /// He init for ReLU-family layers, Xavier for everything else; zero biases.
    pub fn new<R: Rng + ?Sized>(
        size: usize,
        input_size: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Layer {
        let weights = if activation.prefers_he_init() {
            Matrix::he(input_size, size, rng)
        } else {
            Matrix::xavier(input_size, size, rng)
        };

        Layer {
            size,
            input_size,
            weights: Param::new(weights),
            biases: Param::new(Matrix::zeros(1, size)),
            activator: activation,
            cache: None,
        }
    }

    /// Read-only forward pass.
    pub fn infer(&self, input: &Matrix) -> Matrix {
        let z = (input * &self.weights.value).add_row(&self.biases.value);
        self.activator.forward(&z)
    }

    /// Forward pass that records what `backward` needs.
    pub fn feed_from(&mut self, input: &Matrix) -> Matrix {
        let z = (input * &self.weights.value).add_row(&self.biases.value);
        let a = self.activator.forward(&z);
        self.cache = Some(ForwardCache {
            input: input.clone(),
            pre_activation: z,
            output: a.clone(),
        });
        a
    }

    /// Accumulates parameter gradients from ∂L/∂a and returns ∂L/∂x.
    ///
    /// `index` is only used to identify the layer in errors.
    pub fn backward(&mut self, grad_output: &Matrix, index: usize) -> Result<Matrix> {
        let cache = self.cache.as_ref().ok_or(Error::NoForwardPass { layer: index })?;
        if grad_output.shape() != cache.output.shape() {
            return Err(Error::ShapeMismatch {
                op: "Layer::backward",
                expected: cache.output.shape(),
                actual: grad_output.shape(),
            });
        }

        let delta = self.activator.backward(grad_output, &cache.pre_activation, &cache.output);
        let weights_grad = &cache.input.transpose() * &delta;
        let biases_grad = delta.sum_rows();
        let grad_input = &delta * &self.weights.value.transpose();

        self.weights.accumulate(&weights_grad);
        self.biases.accumulate(&biases_grad);
        Ok(grad_input)
    }

    pub fn params(&self) -> [&Param; 2] {
        [&self.weights, &self.biases]
    }

    pub fn params_mut(&mut self) -> [&mut Param; 2] {
        [&mut self.weights, &mut self.biases]
    }

    pub fn set_trainable(&mut self, trainable: bool) {
        self.weights.trainable = trainable;
        self.biases.trainable = trainable;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// `L = Σ c_j · a_ij`, with distinct column weights so softmax outputs
    /// do not collapse to a constant.
    const COLUMN_WEIGHTS: [f64; 3] = [1.0, -2.0, 0.5];

    fn weighted_loss(layer: &Layer, x: &Matrix) -> f64 {
        layer.infer(x).data.iter()
            .flat_map(|row| row.iter().zip(COLUMN_WEIGHTS.iter()).map(|(a, c)| a * c))
            .sum()
    }

    fn check_weight_gradient(activation: ActivationFunction) {
        let mut rng = StdRng::seed_from_u64(7);
        let mut layer = Layer::new(3, 2, activation, &mut rng);
        let x = Matrix::from_data(vec![vec![0.5, -1.0], vec![1.5, 0.25]]);

        let out = layer.feed_from(&x);
        let upstream = out.map(|_| 0.0).add_row(&Matrix::from_data(vec![COLUMN_WEIGHTS.to_vec()]));
        layer.backward(&upstream, 0).unwrap();
        let analytic = layer.weights.grad().unwrap().clone();

        let h = 1e-6;
        for i in 0..2 {
            for j in 0..3 {
                let mut plus = layer.clone();
                plus.weights.value.data[i][j] += h;
                let mut minus = layer.clone();
                minus.weights.value.data[i][j] -= h;
                let numeric = (weighted_loss(&plus, &x) - weighted_loss(&minus, &x)) / (2.0 * h);
                assert_abs_diff_eq!(analytic.data[i][j], numeric, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn weight_gradient_matches_finite_differences() {
        check_weight_gradient(ActivationFunction::Tanh);
    }

    #[test]
    fn every_activation_trains_with_correct_gradients() {
        for activation in [
            ActivationFunction::Sigmoid,
            ActivationFunction::ReLU,
            ActivationFunction::Identity,
            ActivationFunction::LeakyReLU { alpha: 0.1 },
            ActivationFunction::Softmax,
        ] {
            check_weight_gradient(activation);
        }
    }

    #[test]
    fn backward_without_forward_is_an_error() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut layer = Layer::new(2, 2, ActivationFunction::ReLU, &mut rng);
        let g = Matrix::zeros(1, 2);
        assert!(matches!(layer.backward(&g, 4), Err(Error::NoForwardPass { layer: 4 })));
    }

    #[test]
    fn infer_matches_feed_from() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut layer = Layer::new(4, 3, ActivationFunction::ReLU, &mut rng);
        let x = Matrix::from_data(vec![vec![0.1, 0.2, 0.3]]);
        assert_eq!(layer.infer(&x), layer.feed_from(&x));
    }
}
