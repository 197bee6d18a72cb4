use crate::error::Result;
use crate::layers::param::Param;
use crate::math::matrix::Matrix;

/// What the training loop needs from a classifier.
///
/// `predict` is the read-only path used for evaluation; `forward` records the
/// activations that a following `backward` turns into parameter gradients.
pub trait Model {
    /// Maps a batch of inputs (one example per row) to per-class scores.
    fn predict(&self, inputs: &Matrix) -> Result<Matrix>;

    /// Same scores as `predict`, recording activations for `backward`.
    fn forward(&mut self, inputs: &Matrix) -> Result<Matrix>;

    /// Accumulates parameter gradients given ∂L/∂scores of the last `forward`.
    fn backward(&mut self, grad_scores: &Matrix) -> Result<()>;

    /// Every parameter, in a stable order.
    fn params(&self) -> Vec<&Param>;

    /// Mutable view of `params`, in the same order.
    fn params_mut(&mut self) -> Vec<&mut Param>;
}
