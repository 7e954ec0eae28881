//! Asana CLI - trains the pose classifier from CSV files
//!
//! Loads the feature and label CSVs, prepares stratified train/test
//! partitions, trains the dense classifier and reports test accuracy.
//!
//! Features:
//! - TOML configuration with command-line overrides
//! - Reproducible runs with `--seed`
//! - Ctrl-C stops training after the current epoch
//! - Optional JSON model export

use anyhow::{Context, Result};
use asana_ml::{
    load_dataset, CancellationToken, DatasetPreparer, EpochMetrics, EvaluationReport,
    FeedforwardNetwork, MLConfig, MLError, ModelArtifact, NetworkArchitecture, Predictor, Trainer,
    TrainingStatus,
};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Asana CLI - pose classifier training
#[derive(Parser, Debug)]
#[command(name = "asana")]
#[command(about = "Train and evaluate the pose classifier", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Feature CSV (overrides the configuration)
    #[arg(long)]
    features: Option<PathBuf>,

    /// Label CSV (overrides the configuration)
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Seed for the split, initialization and batch order
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of training epochs
    #[arg(short, long)]
    epochs: Option<usize>,

    /// Learning rate
    #[arg(long)]
    learning_rate: Option<f64>,

    /// Write the trained model as JSON to this path
    #[arg(long)]
    export: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    async fn load_config(&self) -> Result<MLConfig> {
        let mut config = match &self.config {
            Some(path) => MLConfig::load_from_file(path)
                .await
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => MLConfig::default(),
        };

        if let Some(features) = &self.features {
            config.data.features = features.clone();
        }
        if let Some(labels) = &self.labels {
            config.data.labels = labels.clone();
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(epochs) = self.epochs {
            config.training.epochs = epochs;
        }
        if let Some(learning_rate) = self.learning_rate {
            config.training.learning_rate = learning_rate;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

/// One-line progress text; the library already logs the structured fields at `info`
fn epoch_summary(metrics: &EpochMetrics, epochs: usize) -> String {
    let mut line = format!(
        "Epoch {}/{}: loss = {:.4}, accuracy = {:.4}",
        metrics.epoch + 1,
        epochs,
        metrics.loss,
        metrics.accuracy
    );
    if let (Some(val_loss), Some(val_accuracy)) = (metrics.val_loss, metrics.val_accuracy) {
        line.push_str(&format!(
            ", val_loss = {:.4}, val_accuracy = {:.4}",
            val_loss, val_accuracy
        ));
    }
    line
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("asana=debug,asana_ml=debug")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("asana=info,asana_ml=info")
            .init();
    }

    info!("Starting Asana trainer v{}", asana_ml::version());

    let config = cli.load_config().await?;
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let dataset = load_dataset(&config.data.features, &config.data.labels)
        .await
        .context("Failed to load dataset")?;

    let preparer = DatasetPreparer::new(config.dataset.clone())?;
    let partition = preparer.prepare(&dataset.features, &dataset.labels, &mut rng)?;
    info!(
        train = partition.train_len(),
        test = partition.test_len(),
        features = partition.feature_dim(),
        classes = partition.num_classes(),
        "Prepared dataset"
    );

    let architecture = NetworkArchitecture::classifier(
        partition.feature_dim(),
        config.model.hidden_units,
        config.model.hidden_activation,
        partition.num_classes(),
    );
    let network = FeedforwardNetwork::new(architecture, &mut rng)?;
    let trainer = Trainer::new(config.training.clone())?;
    let epochs = config.training.epochs;

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current epoch");
            signal_token.cancel();
        }
    });

    let (network, partition, history) = tokio::task::spawn_blocking(move || {
        let mut network = network;
        let history = trainer
            .fit(&mut network, &partition, rng)?
            .with_cancellation(token)
            .run(|metrics| debug!("{}", epoch_summary(metrics, epochs)))?;
        Ok::<_, MLError>((network, partition, history))
    })
    .await
    .context("Training task failed")??;

    if history.status == TrainingStatus::Cancelled {
        warn!(epochs = history.epochs.len(), "Training was cancelled");
    }

    if partition.test_len() > 0 {
        let report =
            EvaluationReport::evaluate(&network, &partition.test_features, &partition.test_labels)?;
        println!(
            "Test accuracy: {:.2}% ({} samples, loss {:.4})",
            report.accuracy * 100.0,
            partition.test_len(),
            report.loss
        );
        for (index, name) in config.dataset.classes.names().iter().enumerate() {
            if let Some(recall) = report.confusion.recall(index) {
                println!("  {}: {:.2}% recall", name, recall * 100.0);
            }
        }
    } else {
        warn!("Test partition is empty, skipping evaluation");
    }

    if let Some(path) = &cli.export {
        let predictor =
            Predictor::new(network, config.dataset.classes.clone(), config.dataset.scale)?;
        ModelArtifact::from_predictor("asana", &predictor, &history)
            .save_to_file(path)
            .await
            .with_context(|| format!("Failed to export model to {}", path.display()))?;
        println!("Model written to {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_summary() {
        let mut metrics = EpochMetrics {
            epoch: 2,
            loss: 0.5,
            accuracy: 0.75,
            val_loss: None,
            val_accuracy: None,
        };
        assert_eq!(
            epoch_summary(&metrics, 10),
            "Epoch 3/10: loss = 0.5000, accuracy = 0.7500"
        );

        metrics.val_loss = Some(0.25);
        metrics.val_accuracy = Some(1.0);
        assert_eq!(
            epoch_summary(&metrics, 10),
            "Epoch 3/10: loss = 0.5000, accuracy = 0.7500, val_loss = 0.2500, val_accuracy = 1.0000"
        );
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from(["asana", "--seed", "7", "--epochs", "3", "--verbose"]);
        assert_eq!(cli.seed, Some(7));
        assert_eq!(cli.epochs, Some(3));
        assert!(cli.verbose);
        assert!(cli.export.is_none());
    }
}
