//! doodle-nn
//!
//! Trains and inspects a dense classifier over ten QuickDraw doodle classes.
//! Class files are read from `<data-dir>/<class>.npy`; run `doodle-nn classes`
//! to see which files are expected and where they are published.
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `info`).
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use doodle_nn::data::quickdraw::{self, class_url, LoadOptions, CLASS_NAMES, PIXELS};
use doodle_nn::embed::{pca, representations, tsne, TsneConfig};
use doodle_nn::metrics::calculate_accuracy;
use doodle_nn::network::ModelMetadata;
use doodle_nn::train::{build_network, fit, run_epoch, Mode, RunningHistory, TrainConfig};
use doodle_nn::{DataLoader, Device, Network};

#[derive(Parser)]
#[command(name = "doodle-nn", version, about = "Doodle classifier training and inspection")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train a classifier, report test metrics, and save the best epoch.
    Train {
        #[arg(long)]
        data_dir: PathBuf,
        /// JSON training config; omitted fields use their defaults.
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value = "doodle_model.json")]
        model_out: PathBuf,
        #[arg(long, default_value = "history.json")]
        history_out: PathBuf,
        /// Overrides the config's device (`cpu`, `cuda`, `cuda:N`).
        #[arg(long)]
        device: Option<Device>,
    },
    /// Project a trained model's test-set scores to two dimensions.
    Embed {
        #[arg(long)]
        data_dir: PathBuf,
        #[arg(long)]
        model: PathBuf,
        #[arg(long, value_enum, default_value_t = Method::Pca)]
        method: Method,
        /// Number of test doodles to project (default: all for PCA, 1000 for t-SNE).
        #[arg(long)]
        n_images: Option<usize>,
        #[arg(long, default_value = "embedding.json")]
        out: PathBuf,
    },
    /// List the doodle classes and their download URLs.
    Classes,
}

#[derive(Clone, Copy, ValueEnum)]
enum Method {
    Pca,
    Tsne,
}

#[derive(Serialize)]
struct EmbeddedPoint {
    x: f64,
    y: f64,
    label: usize,
    class: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Train { data_dir, config, model_out, history_out, device } => {
            let mut config = match config {
                Some(path) => TrainConfig::load_json(&path)
                    .with_context(|| format!("reading config {}", path.display()))?,
                None => TrainConfig::default(),
            };
            if let Some(device) = device {
                config.device = device;
            }
            train(&data_dir, &config, &model_out, &history_out)
        }
        Command::Embed { data_dir, model, method, n_images, out } => {
            embed(&data_dir, &model, method, n_images, &out)
        }
        Command::Classes => {
            for (label, class) in CLASS_NAMES.iter().enumerate() {
                println!("{label}\t{class}\t{}", class_url(class));
            }
            Ok(())
        }
    }
}

fn train(data_dir: &Path, config: &TrainConfig, model_out: &Path, history_out: &Path) -> anyhow::Result<()> {
    let splits = quickdraw::load(data_dir, &config.data)?;
    let metadata = ModelMetadata::quickdraw().with_split(config.data.clone());
    let mut network = build_network(config, PIXELS, splits.class_names.len(), Some(metadata))?;
    let mut history = RunningHistory::new();

    let report = fit(&mut network, &splits.train, &splits.valid, config, &mut history)?;
    history.save_json(history_out)
        .with_context(|| format!("writing history {}", history_out.display()))?;

    let mut best = report.best_network;
    if splits.test.is_empty() {
        info!("test set is empty; skipping test evaluation");
    } else {
        let test_loader = DataLoader::new(&splits.test, config.batch_size)?;
        let test = run_epoch(
            &mut best,
            &test_loader,
            &config.loss,
            calculate_accuracy,
            Mode::Evaluate,
            config.device,
            &mut RunningHistory::new(),
        )?;
        info!(
            "test loss {:.3} | test acc {:.2}% (best epoch {})",
            test.loss,
            test.accuracy * 100.0,
            report.best_epoch
        );
    }

    best.save_json(model_out)
        .with_context(|| format!("writing model {}", model_out.display()))?;
    info!(path = %model_out.display(), "model saved");
    Ok(())
}

fn embed(data_dir: &Path, model: &Path, method: Method, n_images: Option<usize>, out: &Path) -> anyhow::Result<()> {
    let network = Network::load_json(model)
        .with_context(|| format!("reading model {}", model.display()))?;
    if network.input_size() != PIXELS {
        bail!("model expects {} inputs, doodles have {}", network.input_size(), PIXELS);
    }
    let metadata = network.metadata.clone().unwrap_or_else(ModelMetadata::quickdraw);

    let split = metadata.split.clone().unwrap_or_else(|| {
        warn!("model does not record its data split; assuming the default split");
        LoadOptions::default()
    });

    let test = quickdraw::load_test(data_dir, &split)?;
    let limit = n_images.unwrap_or(match method {
        Method::Pca => test.len(),
        Method::Tsne => 1_000,
    });
    let test = test.truncate(limit);
    let loader = DataLoader::new(&test, 64)?;
    let (scores, labels) = representations(&network, &loader, Device::Cpu)?;

    let projected = match method {
        Method::Pca => pca(&scores, 2)?,
        Method::Tsne => tsne(&scores, &TsneConfig::default())?,
    };

    let points: Vec<EmbeddedPoint> = projected.data.iter()
        .zip(labels.iter())
        .map(|(row, &label)| EmbeddedPoint {
            x: row[0],
            y: row[1],
            label,
            class: metadata.class_name(label),
        })
        .collect();

    let file = std::fs::File::create(out)
        .with_context(|| format!("creating {}", out.display()))?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), &points)?;
    info!(points = points.len(), path = %out.display(), "embedding written");
    Ok(())
}
