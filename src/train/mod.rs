pub mod epoch_stats;
pub mod history;
pub mod loop_fn;
pub mod train_config;
pub mod trainer;

pub use epoch_stats::EpochStats;
pub use history::{Phase, RunningHistory};
pub use loop_fn::{predict_all, run_epoch, Mode, Predictions};
pub use train_config::TrainConfig;
pub use trainer::{build_network, fit, FitReport};
