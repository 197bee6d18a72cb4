use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{Error, Result};
use crate::loss::loss_type::LossType;
use crate::network::metadata::ModelMetadata;

/// Describes one layer in a network specification.
///
/// - `size`       — number of neurons in this layer
/// - `input_size` — output size of the previous layer, or the raw input
///                  dimension for the first layer
/// - `activation` — activation applied after the linear transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub size: usize,
    pub input_size: usize,
    pub activation: ActivationFunction,
}

/// A serializable network architecture plus its training loss, the seed
/// used for weight initialization, and optional metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub name: String,
    /// Ordered list of layer descriptions (input → output).
    pub layers: Vec<LayerSpec>,
    pub loss: LossType,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub metadata: Option<ModelMetadata>,
}

impl NetworkSpec {
    /// Multi-layer perceptron over `sizes` (input, hidden..., output). Hidden
    /// layers use `hidden`; the output layer is linear so it emits raw scores.
    pub fn mlp(name: &str, sizes: &[usize], hidden: ActivationFunction, loss: LossType) -> NetworkSpec {
        let last = sizes.len().saturating_sub(2);
        let layers = sizes.windows(2)
            .enumerate()
            .map(|(i, pair)| LayerSpec {
                size: pair[1],
                input_size: pair[0],
                activation: if i == last { ActivationFunction::Identity } else { hidden },
            })
            .collect();
        NetworkSpec {
            name: name.to_owned(),
            layers,
            loss,
            seed: 0,
            metadata: None,
        }
    }

    /// Checks that the layer sizes chain together.
    pub fn validate(&self) -> Result<()> {
        if self.layers.is_empty() {
            return Err(Error::InvalidConfig(format!("network '{}' has no layers", self.name)));
        }
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.size == 0 || layer.input_size == 0 {
                return Err(Error::InvalidConfig(format!("layer {} has a zero dimension", i)));
            }
        }
        for (i, pair) in self.layers.windows(2).enumerate() {
            if pair[0].size != pair[1].input_size {
                return Err(Error::InvalidConfig(format!(
                    "layer {} outputs {} values but layer {} expects {}",
                    i, pair[0].size, i + 1, pair[1].input_size
                )));
            }
        }
        Ok(())
    }
}
