use crate::error::Result;
use crate::math::matrix::Matrix;
use crate::network::model::Model;
use crate::optim::{ensure_state, Optimizer};

/// Adam with bias-corrected moment estimates.
///
/// θ_t = θ_{t-1} − lr_t · m_t / (√v_t + ε), where
/// lr_t = lr · √(1 − β₂ᵗ) / (1 − β₁ᵗ).
#[derive(Debug, Clone)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    t: u64,
    m: Vec<Option<Matrix>>,
    v: Vec<Option<Matrix>>,
}

impl Adam {
    pub fn new(learning_rate: f64, beta1: f64, beta2: f64, epsilon: f64) -> Adam {
        Adam { learning_rate, beta1, beta2, epsilon, t: 0, m: Vec::new(), v: Vec::new() }
    }

    /// β₁ = 0.9, β₂ = 0.999, ε = 1e-8.
    pub fn default_params(learning_rate: f64) -> Adam {
        Adam::new(learning_rate, 0.9, 0.999, 1e-8)
    }

    pub fn step_count(&self) -> u64 {
        self.t
    }
}

impl Optimizer for Adam {
    fn step(&mut self, model: &mut dyn Model) -> Result<()> {
        let mut params = model.params_mut();
        ensure_state(&mut self.m, &params)?;
        ensure_state(&mut self.v, &params)?;
        self.t += 1;

        let t = self.t as i32;
        let lr_t = self.learning_rate * (1.0 - self.beta2.powi(t)).sqrt() / (1.0 - self.beta1.powi(t));
        let (beta1, beta2, eps) = (self.beta1, self.beta2, self.epsilon);

        for (i, param) in params.iter_mut().enumerate() {
            if !param.trainable {
                continue;
            }
            let Some(grad) = param.grad() else { continue };

            let m = match self.m[i].take() {
                Some(m) => &m.scale(beta1) + &grad.scale(1.0 - beta1),
                None => grad.scale(1.0 - beta1),
            };
            let g2 = grad.hadamard(grad);
            let v = match self.v[i].take() {
                Some(v) => &v.scale(beta2) + &g2.scale(1.0 - beta2),
                None => g2.scale(1.0 - beta2),
            };

            let mut value = param.value.clone();
            for ((row, m_row), v_row) in value.data.iter_mut().zip(m.data.iter()).zip(v.data.iter()) {
                for ((x, mi), vi) in row.iter_mut().zip(m_row.iter()).zip(v_row.iter()) {
                    *x -= lr_t * mi / (vi.sqrt() + eps);
                }
            }
            param.value = value;
            self.m[i] = Some(m);
            self.v[i] = Some(v);
        }
        Ok(())
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::ActivationFunction;
    use crate::network::network::Network;
    use approx::assert_abs_diff_eq;

    #[test]
    fn first_step_moves_by_learning_rate() {
        let mut net = Network::new(vec![(1, 1, ActivationFunction::Identity)], 0);
        net.layers[0].weights.value = Matrix::from_data(vec![vec![1.0]]);
        for p in net.params_mut() {
            p.zero_grad();
            p.accumulate(&Matrix::from_data(vec![vec![0.3]]));
        }
        let mut opt = Adam::default_params(0.01);
        opt.step(&mut net).unwrap();
        // After bias correction the first update is lr·sign(g).
        assert_abs_diff_eq!(net.layers[0].weights.value.data[0][0], 0.99, epsilon = 1e-6);
        assert_eq!(opt.step_count(), 1);
    }

    #[test]
    fn converges_on_quadratic() {
        // Minimize w² by feeding the gradient 2w by hand.
        let mut net = Network::new(vec![(1, 1, ActivationFunction::Identity)], 0);
        net.layers[0].weights.value = Matrix::from_data(vec![vec![3.0]]);
        net.layers[0].biases.trainable = false;
        let mut opt = Adam::default_params(0.1);
        for _ in 0..500 {
            opt.zero_grad(&mut net);
            let w = net.layers[0].weights.value.data[0][0];
            net.layers[0].weights.accumulate(&Matrix::from_data(vec![vec![2.0 * w]]));
            opt.step(&mut net).unwrap();
        }
        assert!(net.layers[0].weights.value.data[0][0].abs() < 0.1);
    }

    #[test]
    fn rejects_a_model_with_a_different_parameter_count() {
        let mut small = Network::new(vec![(1, 1, ActivationFunction::Identity)], 0);
        let mut big = Network::new(vec![(1, 1, ActivationFunction::Identity), (1, 1, ActivationFunction::Identity)], 0);
        let mut opt = Adam::default_params(0.1);
        opt.step(&mut small).unwrap();
        assert!(opt.step(&mut big).is_err());
    }
}
