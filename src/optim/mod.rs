pub mod adam;
pub mod config;
pub mod sgd;

pub use adam::Adam;
pub use config::OptimizerConfig;
pub use sgd::Sgd;

use crate::error::{Error, Result};
use crate::layers::param::Param;
use crate::math::matrix::Matrix;
use crate::network::model::Model;

/// Parameter update rule driven by the gradients a model has accumulated.
pub trait Optimizer {
    /// Clears every accumulated gradient.
    fn zero_grad(&mut self, model: &mut dyn Model) {
        for param in model.params_mut() {
            param.zero_grad();
        }
    }

    /// Applies one update to every trainable parameter that has a gradient.
    fn step(&mut self, model: &mut dyn Model) -> Result<()>;

    fn learning_rate(&self) -> f64;
}

/// Allocates one state slot per parameter on first use and checks that the
/// model has not changed shape since.
fn ensure_state(state: &mut Vec<Option<Matrix>>, params: &[&mut Param]) -> Result<()> {
    if state.is_empty() {
        state.resize(params.len(), None);
        return Ok(());
    }
    if state.len() != params.len() {
        return Err(Error::OptimizerState(format!(
            "expected {} parameters, model has {}",
            state.len(),
            params.len()
        )));
    }
    for (i, (slot, param)) in state.iter().zip(params.iter()).enumerate() {
        if let Some(s) = slot {
            if s.shape() != param.value.shape() {
                return Err(Error::OptimizerState(format!(
                    "parameter {} changed shape from {:?} to {:?}",
                    i,
                    s.shape(),
                    param.value.shape()
                )));
            }
        }
    }
    Ok(())
}
