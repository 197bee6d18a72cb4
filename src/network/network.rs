use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{Error, Result};
use crate::layers::dense::Layer;
use crate::layers::param::Param;
use crate::math::matrix::Matrix;
use crate::network::metadata::ModelMetadata;
use crate::network::model::Model;
use crate::network::spec::NetworkSpec;

/// A stack of dense layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub metadata: Option<ModelMetadata>,
}

impl Network {
    /// Builds a network from (size, input_size, activation) tuples, drawing
    /// initial weights from a generator seeded with `seed`.
    pub fn new(layer_specs: Vec<(usize, usize, ActivationFunction)>, seed: u64) -> Network {
        let mut rng = StdRng::seed_from_u64(seed);
        let layers = layer_specs.into_iter()
            .map(|(size, input_size, activation)| Layer::new(size, input_size, activation, &mut rng))
            .collect();
        Network { layers, metadata: None }
    }

    /// Builds and initializes the architecture described by `spec`.
    pub fn from_spec(spec: &NetworkSpec) -> Result<Network> {
        spec.validate()?;
        let mut network = Network::new(
            spec.layers.iter().map(|l| (l.size, l.input_size, l.activation)).collect(),
            spec.seed,
        );
        network.metadata = spec.metadata.clone();
        Ok(network)
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |l| l.input_size)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, |l| l.size)
    }

    /// Excludes (or re-includes) a layer's parameters from training.
    pub fn freeze_layer(&mut self, index: usize, frozen: bool) -> Result<()> {
        let count = self.layers.len();
        let layer = self.layers.get_mut(index).ok_or_else(|| {
            Error::InvalidConfig(format!("layer {} does not exist ({} layers)", index, count))
        })?;
        layer.set_trainable(!frozen);
        Ok(())
    }

    /// Checks that every layer consumes the previous layer's output and that
    /// weights are `[input_size × size]` and biases `[1 × size]`.
    pub fn validate(&self) -> Result<()> {
        let first = self.layers.first()
            .ok_or_else(|| Error::InvalidConfig("network has no layers".to_owned()))?;
        let mut width = first.input_size;
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.input_size != width {
                return Err(Error::InvalidConfig(format!(
                    "layer {} expects {} inputs but receives {}",
                    i, layer.input_size, width
                )));
            }
            layer.weights.value.check_shape("Network::validate", (layer.input_size, layer.size))?;
            layer.biases.value.check_shape("Network::validate", (1, layer.size))?;
            width = layer.size;
        }
        Ok(())
    }

    fn check_input(&self, inputs: &Matrix) -> Result<()> {
        if self.layers.is_empty() {
            return Err(Error::InvalidConfig("network has no layers".to_owned()));
        }
        if inputs.cols != self.input_size() {
            return Err(Error::ShapeMismatch {
                op: "Network::predict",
                expected: (inputs.rows, self.input_size()),
                actual: inputs.shape(),
            });
        }
        Ok(())
    }

    /// Serializes the network weights to a pretty-printed JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a network from a JSON file previously written by `save_json`
    /// and rejects it unless `validate` passes.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Network> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let network: Network = serde_json::from_reader(reader)?;
        network.validate()?;
        Ok(network)
    }
}

impl Model for Network {
    fn predict(&self, inputs: &Matrix) -> Result<Matrix> {
        self.check_input(inputs)?;
        let mut current = inputs.clone();
        for layer in &self.layers {
            current = layer.infer(&current);
        }
        Ok(current)
    }

    fn forward(&mut self, inputs: &Matrix) -> Result<Matrix> {
        self.check_input(inputs)?;
        let mut current = inputs.clone();
        for layer in &mut self.layers {
            current = layer.feed_from(&current);
        }
        Ok(current)
    }

    fn backward(&mut self, grad_scores: &Matrix) -> Result<()> {
        let mut delta = grad_scores.clone();
        for (i, layer) in self.layers.iter_mut().enumerate().rev() {
            delta = layer.backward(&delta, i)?;
        }
        Ok(())
    }

    fn params(&self) -> Vec<&Param> {
        self.layers.iter().flat_map(|l| l.params()).collect()
    }

    fn params_mut(&mut self) -> Vec<&mut Param> {
        self.layers.iter_mut().flat_map(|l| l.params_mut()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::quickdraw::LoadOptions;
    use crate::loss::loss_type::LossType;

    #[test]
    fn predict_rejects_wrong_input_width() {
        let net = Network::new(vec![(2, 3, ActivationFunction::Identity)], 0);
        let err = net.predict(&Matrix::zeros(4, 5)).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { expected: (4, 3), actual: (4, 5), .. }));
    }

    #[test]
    fn same_seed_gives_same_weights() {
        let spec = NetworkSpec::mlp("m", &[5, 4, 3], ActivationFunction::ReLU, LossType::CrossEntropy);
        let a = Network::from_spec(&spec).unwrap();
        let b = Network::from_spec(&spec).unwrap();
        assert_eq!(a.layers[0].weights.value, b.layers[0].weights.value);
        assert_eq!(a.output_size(), 3);
    }

    #[test]
    fn freeze_marks_params_untrainable() {
        let mut net = Network::new(vec![(2, 2, ActivationFunction::ReLU), (2, 2, ActivationFunction::Identity)], 1);
        net.freeze_layer(0, true).unwrap();
        let flags: Vec<bool> = net.params().iter().map(|p| p.trainable).collect();
        assert_eq!(flags, vec![false, false, true, true]);
        assert!(net.freeze_layer(9, true).is_err());
    }

    #[test]
    fn json_round_trip_keeps_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.json");
        let mut net = Network::new(vec![(3, 2, ActivationFunction::Tanh)], 5);
        let split = LoadOptions { max_items_per_class: 90_000, ..LoadOptions::default() };
        net.metadata = Some(ModelMetadata::quickdraw().with_split(split));
        net.save_json(&path).unwrap();

        let loaded = Network::load_json(&path).unwrap();
        let x = Matrix::from_data(vec![vec![0.25, -0.5]]);
        assert_eq!(net.predict(&x).unwrap(), loaded.predict(&x).unwrap());
        assert_eq!(loaded.metadata, net.metadata);
    }

    fn two_layer() -> Network {
        Network::new(vec![(3, 2, ActivationFunction::Tanh), (2, 3, ActivationFunction::Identity)], 0)
    }

    fn reload(net: &Network) -> Result<Network> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.json");
        net.save_json(&path).unwrap();
        Network::load_json(&path)
    }

    #[test]
    fn load_rejects_weights_that_do_not_fit_the_layer() {
        let mut net = two_layer();
        net.layers[1].weights.value = Matrix::zeros(4, 2);
        let err = reload(&net).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { expected: (3, 2), actual: (4, 2), .. }));
    }

    #[test]
    fn load_rejects_layers_that_do_not_chain() {
        let mut net = two_layer();
        net.layers[1].input_size = 4;
        net.layers[1].weights.value = Matrix::zeros(4, 2);
        assert!(matches!(reload(&net), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn load_rejects_ragged_matrices() {
        let mut net = two_layer();
        net.layers[0].biases.value.data[0].pop();
        let err = reload(&net).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { actual: (1, 2), .. }));
        assert!(two_layer().validate().is_ok());
    }
}
