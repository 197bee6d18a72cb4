use std::time::Instant;

use tracing::{info, warn};

use crate::data::loader::{DataLoader, Dataset};
use crate::error::Result;
use crate::metrics::{calculate_accuracy, count_trainable_parameters, epoch_duration};
use crate::network::metadata::ModelMetadata;
use crate::network::network::Network;
use crate::network::spec::NetworkSpec;
use crate::train::history::RunningHistory;
use crate::train::loop_fn::{run_epoch, Mode};
use crate::train::train_config::TrainConfig;

/// Outcome of `fit`: the epoch with the lowest validation loss and a copy of
/// the network as it was at the end of that epoch.
#[derive(Debug, Clone)]
pub struct FitReport {
    /// 1-based.
    pub best_epoch: usize,
    pub best_valid_loss: f64,
    pub best_network: Network,
}

/// Builds the MLP described by `config` for `input`-wide examples and
/// `classes` outputs.
pub fn build_network(config: &TrainConfig, input: usize, classes: usize, metadata: Option<ModelMetadata>) -> Result<Network> {
    let mut spec = NetworkSpec::mlp(
        "doodle-mlp",
        &config.layer_sizes(input, classes),
        config.activation,
        config.loss,
    );
    spec.seed = config.seed;
    spec.metadata = metadata;
    Network::from_spec(&spec)
}

/// Trains `network` for `config.epochs` epochs, evaluating on `valid` after
/// each one. Both passes are appended to `history`.
///
/// If `valid` is empty the best epoch is chosen by training loss instead.
pub fn fit(
    network: &mut Network,
    train: &Dataset,
    valid: &Dataset,
    config: &TrainConfig,
    history: &mut RunningHistory,
) -> Result<FitReport> {
    config.validate()?;
    let mut optimizer = config.optimizer.build()?;
    let train_loader = DataLoader::new(train, config.batch_size)?.shuffled(config.seed);
    let valid_loader = DataLoader::new(valid, config.batch_size)?;

    info!(
        parameters = count_trainable_parameters(&*network),
        train = train.len(),
        valid = valid.len(),
        device = %config.device,
        "starting training"
    );
    if valid.is_empty() {
        warn!("validation set is empty; selecting the best epoch by training loss");
    }

    let mut best: Option<(usize, f64, Network)> = None;

    for epoch in 1..=config.epochs {
        let t_start = Instant::now();

        let train_stats = run_epoch(
            network,
            &train_loader,
            &config.loss,
            calculate_accuracy,
            Mode::Train(optimizer.as_mut()),
            config.device,
            history,
        )?;

        let valid_stats = if valid.is_empty() {
            None
        } else {
            Some(run_epoch(
                network,
                &valid_loader,
                &config.loss,
                calculate_accuracy,
                Mode::Evaluate,
                config.device,
                history,
            )?)
        };

        let (mins, secs) = epoch_duration(t_start, Instant::now());
        let selection_loss = valid_stats.map_or(train_stats.loss, |s| s.loss);
        if best.as_ref().map_or(true, |(_, loss, _)| selection_loss < *loss) {
            best = Some((epoch, selection_loss, network.clone()));
        }

        info!(
            "epoch {:02}/{} | {}m {}s | train loss {:.3} acc {:.2}% | valid loss {} acc {}",
            epoch,
            config.epochs,
            mins,
            secs,
            train_stats.loss,
            train_stats.accuracy * 100.0,
            valid_stats.map_or("-".to_owned(), |s| format!("{:.3}", s.loss)),
            valid_stats.map_or("-".to_owned(), |s| format!("{:.2}%", s.accuracy * 100.0)),
        );
    }

    // validate() guarantees at least one epoch ran.
    let (best_epoch, best_valid_loss, best_network) = best.unwrap_or_else(|| (0, f64::INFINITY, network.clone()));
    info!(best_epoch, best_valid_loss, "training finished");
    Ok(FitReport { best_epoch, best_valid_loss, best_network })
}
