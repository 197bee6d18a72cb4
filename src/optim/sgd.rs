use crate::error::Result;
use crate::math::matrix::Matrix;
use crate::network::model::Model;
use crate::optim::{ensure_state, Optimizer};

/// Stochastic gradient descent with optional classical momentum:
/// `v ← μ·v + g`, `θ ← θ − lr·v`.
#[derive(Debug, Clone)]
pub struct Sgd {
    pub learning_rate: f64,
    pub momentum: f64,
    velocity: Vec<Option<Matrix>>,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd::with_momentum(learning_rate, 0.0)
    }

    pub fn with_momentum(learning_rate: f64, momentum: f64) -> Sgd {
        Sgd { learning_rate, momentum, velocity: Vec::new() }
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, model: &mut dyn Model) -> Result<()> {
        let mut params = model.params_mut();
        ensure_state(&mut self.velocity, &params)?;

        for (param, slot) in params.iter_mut().zip(self.velocity.iter_mut()) {
            if !param.trainable {
                continue;
            }
            let Some(grad) = param.grad() else { continue };

            let update = if self.momentum == 0.0 {
                grad.clone()
            } else {
                let v = match slot.take() {
                    Some(v) => &v.scale(self.momentum) + grad,
                    None => grad.clone(),
                };
                *slot = Some(v.clone());
                v
            };
            param.value = &param.value - &update.scale(self.learning_rate);
        }
        Ok(())
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}
