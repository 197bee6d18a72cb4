use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::activation::activation::ActivationFunction;
use crate::data::quickdraw::LoadOptions;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::loss::loss_type::LossType;
use crate::optim::config::OptimizerConfig;

/// Configuration for a `fit` run. Every field has a default, so a JSON file
/// only needs to name what it changes.
///
/// - `epochs`        — number of train + validation passes
/// - `batch_size`    — examples per batch for both loaders
/// - `hidden_layers` — widths of the hidden layers between input and output
/// - `activation`    — activation of the hidden layers
/// - `seed`          — weight initialization and per-epoch shuffling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub hidden_layers: Vec<usize>,
    pub activation: ActivationFunction,
    pub loss: LossType,
    pub optimizer: OptimizerConfig,
    pub device: Device,
    pub seed: u64,
    pub data: LoadOptions,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            epochs: 10,
            batch_size: 64,
            hidden_layers: vec![256, 128],
            activation: ActivationFunction::ReLU,
            loss: LossType::CrossEntropy,
            optimizer: OptimizerConfig::default(),
            device: Device::Cpu,
            seed: 0,
            data: LoadOptions::default(),
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::InvalidConfig("epochs must be at least 1".to_owned()));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be at least 1".to_owned()));
        }
        if self.hidden_layers.iter().any(|&w| w == 0) {
            return Err(Error::InvalidConfig("hidden layer widths must be positive".to_owned()));
        }
        Ok(())
    }

    /// Layer widths from `input` through the hidden layers to `classes`.
    pub fn layer_sizes(&self, input: usize, classes: usize) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(self.hidden_layers.len() + 2);
        sizes.push(input);
        sizes.extend(&self.hidden_layers);
        sizes.push(classes);
        sizes
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<TrainConfig> {
        let file = std::fs::File::open(path)?;
        let config: TrainConfig = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }
}
