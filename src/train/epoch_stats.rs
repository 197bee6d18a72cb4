use serde::{Serialize, Deserialize};

/// Aggregate of one pass over a data source.
///
/// `loss` and `accuracy` are unweighted means over batches: a short final
/// batch counts as much as a full one. `examples` and `batches` make uneven
/// batching visible to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// Mean per-batch loss.
    pub loss: f64,
    /// Mean per-batch accuracy, a fraction in [0, 1].
    pub accuracy: f64,
    pub batches: usize,
    pub examples: usize,
    /// Wall-clock duration of the pass in milliseconds.
    pub elapsed_ms: u64,
}
