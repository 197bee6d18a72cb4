//! Crate-wide error type.

use std::path::PathBuf;

use thiserror::Error;

use crate::device::Device;

/// Errors surfaced by the training loop, the model, and the data helpers.
///
/// Nothing in the crate retries; every variant aborts the current call and is
/// handed to the caller unchanged.
#[derive(Debug, Error)]
pub enum Error {
    #[error("data source yielded no batches; the epoch mean is undefined")]
    EmptyEpoch,

    #[error("batch contains no examples")]
    EmptyBatch,

    #[error("shape mismatch in {op}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        op: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("label count mismatch: scores have {rows} rows but {labels} labels were given")]
    LabelCount { rows: usize, labels: usize },

    #[error("label {label} is out of range for {classes} classes")]
    LabelOutOfRange { label: usize, classes: usize },

    #[error("layer {layer}: backward called without a recorded forward pass")]
    NoForwardPass { layer: usize },

    #[error("optimizer state does not match the model parameters: {0}")]
    OptimizerState(String),

    #[error("device {0} is not available; only cpu execution is supported")]
    DeviceUnavailable(Device),

    #[error("invalid npy file: {0}")]
    InvalidNpy(String),

    #[error("class file {} not found (download it from {url})", path.display())]
    MissingClassFile { path: PathBuf, url: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
