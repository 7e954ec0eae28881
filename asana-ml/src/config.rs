//! Configuration for data sources, preparation, model topology and training.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::ClassLabelMap;
use crate::error::{MLError, Result};
use crate::neural_networks::ActivationType;
use crate::training::TrainingConfig;

/// Scale constant raw feature values are divided by
pub const DEFAULT_FEATURE_SCALE: f64 = 400.0;

/// Fraction of each class held out for testing
pub const DEFAULT_TEST_FRACTION: f64 = 0.15;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MLConfig {
    /// Seed for every random draw of a run; system entropy when absent
    pub seed: Option<u64>,

    /// Where the raw CSV files live
    pub data: DataSources,

    /// Dataset preparation settings
    pub dataset: DatasetConfig,

    /// Classifier topology
    pub model: ModelConfig,

    /// Training loop settings
    pub training: TrainingConfig,
}

/// Locations of the feature and label CSV files
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataSources {
    /// Feature rows (X)
    pub features: PathBuf,

    /// Class names, one per feature row (Y)
    pub labels: PathBuf,
}

impl Default for DataSources {
    fn default() -> Self {
        Self {
            features: PathBuf::from("data/X.csv"),
            labels: PathBuf::from("data/Y.csv"),
        }
    }
}

/// Immutable settings for the dataset preparer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatasetConfig {
    /// Divisor applied to every raw feature value
    pub scale: f64,

    /// Per-class fraction routed to the test partition, in (0, 1)
    pub test_fraction: f64,

    /// Class names in index order
    pub classes: ClassLabelMap,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            scale: DEFAULT_FEATURE_SCALE,
            test_fraction: DEFAULT_TEST_FRACTION,
            classes: ClassLabelMap::default(),
        }
    }
}

impl DatasetConfig {
    /// Create a dataset configuration
    pub fn new(classes: ClassLabelMap, scale: f64, test_fraction: f64) -> Result<Self> {
        let config = Self {
            scale,
            test_fraction,
            classes,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the scale and test fraction
    pub fn validate(&self) -> Result<()> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(MLError::config(format!(
                "feature scale must be positive, got {}",
                self.scale
            )));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(MLError::config(format!(
                "test fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        Ok(())
    }
}

/// Topology of the hidden layer; the output layer is always softmax over K
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// Width of the hidden dense layer
    pub hidden_units: usize,

    /// Activation of the hidden dense layer
    pub hidden_activation: ActivationType,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            hidden_units: 10,
            hidden_activation: ActivationType::ReLU,
        }
    }
}

impl MLConfig {
    /// Load configuration from TOML file
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.dataset.validate()?;
        if self.model.hidden_units == 0 {
            return Err(MLError::config("hidden_units must be at least 1"));
        }
        if self.model.hidden_activation == ActivationType::Softmax {
            return Err(MLError::config(
                "softmax is reserved for the output layer",
            ));
        }
        self.training.validate()
    }
}
