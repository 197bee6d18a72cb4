use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::optim::{Adam, Optimizer, Sgd};

/// Serializable optimizer choice, e.g. `{"kind": "adam", "learning_rate": 0.001}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptimizerConfig {
    Sgd {
        learning_rate: f64,
        #[serde(default)]
        momentum: f64,
    },
    Adam {
        learning_rate: f64,
        #[serde(default = "default_beta1")]
        beta1: f64,
        #[serde(default = "default_beta2")]
        beta2: f64,
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
}

fn default_beta1() -> f64 {
    0.9
}

fn default_beta2() -> f64 {
    0.999
}

fn default_epsilon() -> f64 {
    1e-8
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig::Adam {
            learning_rate: 1e-3,
            beta1: default_beta1(),
            beta2: default_beta2(),
            epsilon: default_epsilon(),
        }
    }
}

impl OptimizerConfig {
    pub fn build(&self) -> Result<Box<dyn Optimizer>> {
        match *self {
            OptimizerConfig::Sgd { learning_rate, momentum } => {
                check_rate(learning_rate)?;
                if !(0.0..1.0).contains(&momentum) {
                    return Err(Error::InvalidConfig(format!("momentum must be in [0, 1), got {}", momentum)));
                }
                Ok(Box::new(Sgd::with_momentum(learning_rate, momentum)))
            }
            OptimizerConfig::Adam { learning_rate, beta1, beta2, epsilon } => {
                check_rate(learning_rate)?;
                for (name, beta) in [("beta1", beta1), ("beta2", beta2)] {
                    if !(0.0..1.0).contains(&beta) {
                        return Err(Error::InvalidConfig(format!("{} must be in [0, 1), got {}", name, beta)));
                    }
                }
                Ok(Box::new(Adam::new(learning_rate, beta1, beta2, epsilon)))
            }
        }
    }
}

fn check_rate(learning_rate: f64) -> Result<()> {
    if learning_rate > 0.0 && learning_rate.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!("learning_rate must be positive, got {}", learning_rate)))
    }
}
