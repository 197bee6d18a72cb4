pub mod error;
pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod metrics;
pub mod device;
pub mod data;
pub mod train;
pub mod embed;

// Convenience re-exports
pub use error::{Error, Result};
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use layers::dense::Layer;
pub use network::{Model, Network};
pub use loss::{CrossEntropyLoss, Loss, LossType, MseLoss};
pub use optim::{Adam, Optimizer, OptimizerConfig, Sgd};
pub use device::Device;
pub use data::{Batch, DataLoader, Dataset};
pub use train::{fit, predict_all, run_epoch, EpochStats, Mode, RunningHistory, TrainConfig};
