//! Mini-batch training loop with per-epoch metrics.
//!
//! [`Trainer::fit`] returns a [`TrainingRun`], a lazy iterator that trains
//! one epoch per `next()` call. Callers can stream metrics to a log or UI,
//! stop consuming early, or cancel from another thread through a
//! [`CancellationToken`] that is checked between epochs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ndarray::Axis;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::data::Partition;
use crate::error::{MLError, Result};
use crate::metrics;
use crate::neural_networks::{AdamOptimizer, FeedforwardNetwork, Optimizer, SGDOptimizer};

/// Training configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of training epochs
    pub epochs: usize,

    /// Learning rate
    pub learning_rate: f64,

    /// Batch size
    pub batch_size: usize,

    /// Reshuffle the batch order every epoch
    pub shuffle: bool,

    /// Optimizer type
    pub optimizer: OptimizerType,
}

/// Optimizer types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerType {
    /// Stochastic Gradient Descent
    Sgd {
        /// Momentum factor, 0.0 for plain SGD
        momentum: f64,
    },

    /// Adam optimizer
    Adam {
        /// First moment decay
        beta1: f64,
        /// Second moment decay
        beta2: f64,
        /// Numerical stability term
        epsilon: f64,
    },
}

impl OptimizerType {
    /// Instantiate the optimizer with the given learning rate
    pub fn build(&self, learning_rate: f64) -> Box<dyn Optimizer> {
        match *self {
            OptimizerType::Sgd { momentum } => Box::new(SGDOptimizer::new(learning_rate, momentum)),
            OptimizerType::Adam {
                beta1,
                beta2,
                epsilon,
            } => Box::new(AdamOptimizer::new(learning_rate, beta1, beta2, epsilon)),
        }
    }

    fn validate(&self) -> Result<()> {
        let in_unit = |value: f64| (0.0..1.0).contains(&value);
        match *self {
            OptimizerType::Sgd { momentum } if !in_unit(momentum) => Err(MLError::config(
                format!("momentum must be in [0, 1), got {}", momentum),
            )),
            OptimizerType::Adam {
                beta1,
                beta2,
                epsilon,
            } if !in_unit(beta1) || !in_unit(beta2) || epsilon <= 0.0 => {
                Err(MLError::config(format!(
                    "invalid Adam parameters: beta1={}, beta2={}, epsilon={}",
                    beta1, beta2, epsilon
                )))
            }
            _ => Ok(()),
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            learning_rate: 0.01,
            batch_size: 32,
            shuffle: true,
            optimizer: OptimizerType::Adam {
                beta1: 0.9,
                beta2: 0.999,
                epsilon: 1e-7,
            },
        }
    }
}

impl TrainingConfig {
    /// Create a new training configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set number of epochs
    pub fn epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Set learning rate
    pub fn learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Set batch size
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Enable or disable per-epoch batch shuffling
    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Set optimizer
    pub fn optimizer(mut self, optimizer: OptimizerType) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Check epoch count, batch size, learning rate and optimizer parameters
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(MLError::config("epochs must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(MLError::config("batch_size must be at least 1"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(MLError::config(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        self.optimizer.validate()
    }
}

/// Training run status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TrainingStatus {
    /// Epochs remain
    Running,

    /// Every configured epoch ran
    Completed,

    /// Stopped early by a cancellation token
    Cancelled,

    /// An epoch returned an error
    Failed,
}

/// Metrics reported at the end of one epoch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpochMetrics {
    /// 0-based epoch index
    pub epoch: usize,

    /// Mean training loss over the epoch's batches
    pub loss: f64,

    /// Accuracy on the train partition after the epoch
    pub accuracy: f64,

    /// Loss on the test partition, if it has rows
    pub val_loss: Option<f64>,

    /// Accuracy on the test partition, if it has rows
    pub val_accuracy: Option<f64>,
}

/// All epoch metrics of a finished run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingHistory {
    /// Metrics in epoch order
    pub epochs: Vec<EpochMetrics>,

    /// How the run ended
    pub status: TrainingStatus,
}

impl TrainingHistory {
    /// Metrics of the last epoch that ran
    pub fn final_metrics(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }
}

/// Cooperative stop signal shared between a run and its controller
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not yet cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the run stop before its next epoch
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Trainer interface
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    /// Create a new trainer
    pub fn new(config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Training configuration
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Start a lazy training run of `network` on `partition`.
    ///
    /// The test partition is used as validation data. `rng` drives the
    /// per-epoch batch shuffle.
    pub fn fit<'a, R: Rng>(
        &self,
        network: &'a mut FeedforwardNetwork,
        partition: &'a Partition,
        rng: R,
    ) -> Result<TrainingRun<'a, R>> {
        let architecture = network.architecture();
        if partition.train_len() == 0 {
            return Err(MLError::training("train partition is empty"));
        }
        if partition.feature_dim() != architecture.input_dim {
            return Err(MLError::shape_mismatch(format!(
                "partition has {} features, network expects {}",
                partition.feature_dim(),
                architecture.input_dim
            )));
        }
        if partition.num_classes() != architecture.output_dim() {
            return Err(MLError::shape_mismatch(format!(
                "partition has {} classes, network outputs {}",
                partition.num_classes(),
                architecture.output_dim()
            )));
        }

        info!(
            epochs = self.config.epochs,
            batch_size = self.config.batch_size,
            learning_rate = self.config.learning_rate,
            train = partition.train_len(),
            test = partition.test_len(),
            parameters = network.parameter_count(),
            "Starting training"
        );

        Ok(TrainingRun {
            network,
            partition,
            optimizer: self.config.optimizer.build(self.config.learning_rate),
            config: self.config.clone(),
            rng,
            epoch: 0,
            status: TrainingStatus::Running,
            cancellation: None,
        })
    }

    /// Run every epoch to completion, handing each epoch's metrics to `sink`
    pub fn train<R: Rng>(
        &self,
        network: &mut FeedforwardNetwork,
        partition: &Partition,
        rng: R,
        sink: impl FnMut(&EpochMetrics),
    ) -> Result<TrainingHistory> {
        self.fit(network, partition, rng)?.run(sink)
    }
}

/// A training run in progress; yields one [`EpochMetrics`] per epoch
pub struct TrainingRun<'a, R> {
    network: &'a mut FeedforwardNetwork,
    partition: &'a Partition,
    optimizer: Box<dyn Optimizer>,
    config: TrainingConfig,
    rng: R,
    epoch: usize,
    status: TrainingStatus,
    cancellation: Option<CancellationToken>,
}

impl<'a, R: Rng> TrainingRun<'a, R> {
    /// Stop before the next epoch once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Current status
    pub fn status(&self) -> TrainingStatus {
        self.status
    }

    /// Number of epochs finished so far
    pub fn epochs_completed(&self) -> usize {
        self.epoch
    }

    /// Drain the run, handing each epoch's metrics to `sink`
    pub fn run(mut self, mut sink: impl FnMut(&EpochMetrics)) -> Result<TrainingHistory> {
        let mut epochs = Vec::with_capacity(self.config.epochs);
        while let Some(metrics) = self.next() {
            let metrics = metrics?;
            sink(&metrics);
            epochs.push(metrics);
        }
        Ok(TrainingHistory {
            epochs,
            status: self.status,
        })
    }

    fn run_epoch(&mut self) -> Result<EpochMetrics> {
        let train_features = &self.partition.train_features;
        let train_labels = &self.partition.train_labels;

        let mut order: Vec<usize> = (0..train_features.nrows()).collect();
        if self.config.shuffle {
            order.shuffle(&mut self.rng);
        }

        let mut weighted_loss = 0.0;
        for (batch_index, batch) in order.chunks(self.config.batch_size).enumerate() {
            let inputs = train_features.select(Axis(0), batch);
            let targets = train_labels.select(Axis(0), batch);
            let loss = self
                .network
                .train_batch(&inputs, &targets, self.optimizer.as_mut())?;
            debug!(epoch = self.epoch, batch = batch_index, loss, "Trained batch");
            weighted_loss += loss * batch.len() as f64;
        }
        let loss = weighted_loss / order.len() as f64;

        let accuracy =
            metrics::accuracy(&self.network.predict(train_features)?, train_labels)?;

        let (val_loss, val_accuracy) = if self.partition.test_len() > 0 {
            let test_features = &self.partition.test_features;
            let test_labels = &self.partition.test_labels;
            let predictions = self.network.predict(test_features)?;
            (
                Some(self.network.evaluate_loss(test_features, test_labels)?),
                Some(metrics::accuracy(&predictions, test_labels)?),
            )
        } else {
            (None, None)
        };

        Ok(EpochMetrics {
            epoch: self.epoch,
            loss,
            accuracy,
            val_loss,
            val_accuracy,
        })
    }
}

impl<'a, R: Rng> Iterator for TrainingRun<'a, R> {
    type Item = Result<EpochMetrics>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.status != TrainingStatus::Running {
            return None;
        }
        if self
            .cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
        {
            warn!(
                completed = self.epoch,
                epochs = self.config.epochs,
                "Training cancelled"
            );
            self.status = TrainingStatus::Cancelled;
            return None;
        }

        match self.run_epoch() {
            Ok(metrics) => {
                info!(
                    epoch = metrics.epoch,
                    loss = metrics.loss,
                    accuracy = metrics.accuracy,
                    val_loss = metrics.val_loss,
                    val_accuracy = metrics.val_accuracy,
                    "Epoch finished"
                );
                self.epoch += 1;
                if self.epoch >= self.config.epochs {
                    self.status = TrainingStatus::Completed;
                }
                Some(Ok(metrics))
            }
            Err(err) => {
                self.status = TrainingStatus::Failed;
                Some(Err(err))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.status == TrainingStatus::Running {
            (0, Some(self.config.epochs - self.epoch))
        } else {
            (0, Some(0))
        }
    }
}
