//! # Asana ML - Pose classification dataset preparation and training
//!
//! Turns raw pose-feature CSV rows and class-name labels into stratified,
//! normalized, one-hot encoded train/test partitions, then trains and
//! evaluates a small dense classifier on them.
//!
//! ## Features
//!
//! - **Dataset Preparation**: Per-class stratified split with seedable shuffling
//! - **CSV Loading**: Concurrent async loading of feature and label files
//! - **Neural Networks**: Dense feedforward classifier with Adam and SGD
//! - **Training**: Lazy per-epoch runs with cooperative cancellation
//! - **Export**: JSON model artifacts that restore a ready predictor
//!
//! ## Quick Start
//!
//! ```rust
//! use asana_ml::{ClassLabelMap, DatasetConfig, DatasetPreparer};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! # fn main() -> asana_ml::Result<()> {
//! let preparer = DatasetPreparer::new(DatasetConfig::default())?;
//!
//! let features: Vec<Vec<String>> = (0..4)
//!     .map(|i| vec![(i * 100).to_string(), "200".to_string()])
//!     .collect();
//! let labels: Vec<String> = ["yoga1", "yoga1", "yoga2", "yoga2"]
//!     .iter()
//!     .map(|s| s.to_string())
//!     .collect();
//!
//! let partition = preparer.prepare(&features, &labels, &mut StdRng::seed_from_u64(7))?;
//! assert_eq!(partition.train_len() + partition.test_len(), 4);
//! assert_eq!(partition.num_classes(), ClassLabelMap::default().len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

// Core modules
pub mod config;
pub mod error;
/// Classification metrics
pub mod metrics;

/// Raw datasets, CSV loading and stratified preparation
pub mod data;
pub mod inference;
pub mod models;
pub mod neural_networks;
pub mod training;

// Re-exports for convenience
pub use config::{DataSources, DatasetConfig, MLConfig, ModelConfig};
pub use data::{
    load_dataset, ClassLabelMap, DatasetPreparer, Partition, RawDataset, RawFeatureSet,
    RawLabels,
};
pub use error::{MLError, Result};
pub use inference::{Prediction, Predictor};
pub use metrics::{ConfusionMatrix, EvaluationReport};
pub use models::{ModelArtifact, ModelMetadata};
pub use neural_networks::{
    ActivationType, FeedforwardNetwork, NetworkArchitecture, NeuralNetworkBuilder,
};
pub use training::{
    CancellationToken, EpochMetrics, OptimizerType, Trainer, TrainingConfig, TrainingHistory,
    TrainingRun, TrainingStatus,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library information
pub fn version() -> &'static str {
    VERSION
}
