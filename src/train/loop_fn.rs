use std::time::Instant;

use tracing::debug;

use crate::data::loader::Batch;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::loss::Loss;
use crate::math::matrix::Matrix;
use crate::network::model::Model;
use crate::optim::Optimizer;
use crate::train::epoch_stats::EpochStats;
use crate::train::history::{Phase, RunningHistory};

/// Whether a pass updates the model.
pub enum Mode<'o> {
    /// Clear gradients, backpropagate, and step the optimizer after every batch.
    Train(&'o mut dyn Optimizer),
    /// Read-only pass: no gradients are computed and no parameter changes.
    Evaluate,
}

impl Mode<'_> {
    pub fn phase(&self) -> Phase {
        match self {
            Mode::Train(_) => Phase::Train,
            Mode::Evaluate => Phase::Eval,
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Runs one full pass over `batches` and appends the result to `history`.
///
/// Per batch: place it on `device`, score it, compute `loss_fn` and
/// `accuracy_fn`, and in training mode backpropagate and step the optimizer.
/// The returned loss and accuracy are unweighted means over batches.
///
/// # Errors
/// - `Error::EmptyEpoch` if `batches` yields nothing.
/// - Whatever the device, model, loss, or accuracy function returns; the pass
///   stops at the first failure and `history` is left untouched.
pub fn run_epoch<M, I, L, A>(
    model: &mut M,
    batches: I,
    loss_fn: &L,
    accuracy_fn: A,
    mut mode: Mode<'_>,
    device: Device,
    history: &mut RunningHistory,
) -> Result<EpochStats>
where
    M: Model,
    I: IntoIterator<Item = Batch>,
    L: Loss + ?Sized,
    A: Fn(&Matrix, &[usize]) -> Result<f64>,
{
    let t_start = Instant::now();
    let mut epoch_loss = 0.0;
    let mut epoch_acc = 0.0;
    let mut n_batches = 0usize;
    let mut n_examples = 0usize;

    for batch in batches {
        let batch = device.place(batch)?;

        let (loss, acc) = match &mut mode {
            Mode::Train(optimizer) => {
                optimizer.zero_grad(model);
                let scores = model.forward(&batch.inputs)?;
                let loss = loss_fn.loss(&scores, &batch.labels)?;
                let acc = accuracy_fn(&scores, &batch.labels)?;

                let grad = loss_fn.gradient(&scores, &batch.labels)?;
                model.backward(&grad)?;
                optimizer.step(model)?;
                (loss, acc)
            }
            Mode::Evaluate => {
                let scores = model.predict(&batch.inputs)?;
                let loss = loss_fn.loss(&scores, &batch.labels)?;
                let acc = accuracy_fn(&scores, &batch.labels)?;
                (loss, acc)
            }
        };

        epoch_loss += loss;
        epoch_acc += acc;
        n_batches += 1;
        n_examples += batch.len();
    }

    if n_batches == 0 {
        return Err(Error::EmptyEpoch);
    }

    let stats = EpochStats {
        loss: epoch_loss / n_batches as f64,
        accuracy: epoch_acc / n_batches as f64,
        batches: n_batches,
        examples: n_examples,
        elapsed_ms: t_start.elapsed().as_millis() as u64,
    };
    debug!(
        phase = ?mode.phase(),
        loss = stats.loss,
        accuracy = stats.accuracy,
        batches = n_batches,
        "pass complete"
    );
    history.record(mode.phase(), stats);
    Ok(stats)
}

/// Every example seen by an evaluation pass, with its class probabilities.
/// The three vectors are aligned and have one entry per example.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predictions {
    pub inputs: Vec<Vec<f64>>,
    pub labels: Vec<usize>,
    pub probs: Vec<Vec<f64>>,
}

impl Predictions {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Arg-max class of each probability vector.
    pub fn predicted_classes(&self) -> Vec<usize> {
        self.probs.iter().map(|p| crate::math::matrix::argmax(p)).collect()
    }
}

/// Read-only pass collecting inputs, labels, and softmax probabilities.
pub fn predict_all<M, I>(model: &M, batches: I, device: Device) -> Result<Predictions>
where
    M: Model + ?Sized,
    I: IntoIterator<Item = Batch>,
{
    let mut out = Predictions::default();
    for batch in batches {
        let batch = device.place(batch)?;
        let probs = model.predict(&batch.inputs)?.softmax_rows();
        out.inputs.extend(batch.inputs.data);
        out.labels.extend(batch.labels);
        out.probs.extend(probs.data);
    }
    Ok(out)
}
