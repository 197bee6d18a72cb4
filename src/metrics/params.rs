use crate::network::model::Model;

/// Number of scalar values the optimizer may update.
pub fn count_trainable_parameters<M: Model + ?Sized>(model: &M) -> usize {
    model.params()
        .iter()
        .filter(|p| p.trainable)
        .map(|p| p.numel())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::ActivationFunction;
    use crate::network::network::Network;

    #[test]
    fn single_linear_layer_over_doodles() {
        let net = Network::new(vec![(10, 784, ActivationFunction::Identity)], 0);
        assert_eq!(count_trainable_parameters(&net), 784 * 10 + 10);
    }

    #[test]
    fn frozen_layers_are_not_counted() {
        let mut net = Network::new(vec![
            (4, 3, ActivationFunction::ReLU),
            (2, 4, ActivationFunction::Identity),
        ], 0);
        assert_eq!(count_trainable_parameters(&net), 3 * 4 + 4 + 4 * 2 + 2);
        net.freeze_layer(0, true).unwrap();
        assert_eq!(count_trainable_parameters(&net), 4 * 2 + 2);
    }
}
