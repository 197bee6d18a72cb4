//! Low-dimensional views of what a model has learned.

pub mod pca;
pub mod tsne;

pub use pca::{pca, Pca};
pub use tsne::{tsne, TsneConfig};

use crate::data::loader::Batch;
use crate::device::Device;
use crate::error::Result;
use crate::math::matrix::Matrix;
use crate::network::model::Model;

/// Raw scores for every example of an evaluation pass, stacked in order,
/// alongside the matching labels.
pub fn representations<M, I>(model: &M, batches: I, device: Device) -> Result<(Matrix, Vec<usize>)>
where
    M: Model + ?Sized,
    I: IntoIterator<Item = Batch>,
{
    let mut outputs = Matrix::default();
    let mut labels = Vec::new();
    for batch in batches {
        let batch = device.place(batch)?;
        outputs.append_rows(model.predict(&batch.inputs)?);
        labels.extend(batch.labels);
    }
    Ok((outputs, labels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::ActivationFunction;
    use crate::data::loader::{DataLoader, Dataset};
    use crate::network::network::Network;

    #[test]
    fn stacks_scores_in_traversal_order() {
        let data = Dataset::new(
            Matrix::from_data(vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]]),
            vec![2, 0, 1],
        ).unwrap();
        let loader = DataLoader::new(&data, 2).unwrap();
        let net = Network::new(vec![(3, 2, ActivationFunction::Identity)], 4);

        let (outputs, labels) = representations(&net, &loader, Device::Cpu).unwrap();
        assert_eq!(outputs.shape(), (3, 3));
        assert_eq!(labels, vec![2, 0, 1]);
        assert_eq!(outputs.row(2), net.predict(&data.inputs).unwrap().row(2));
    }
}
