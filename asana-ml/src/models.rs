//! Exported model artifacts.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::data::ClassLabelMap;
use crate::error::Result;
use crate::inference::Predictor;
use crate::neural_networks::{DenseLayer, FeedforwardNetwork, NetworkArchitecture};
use crate::training::{EpochMetrics, TrainingHistory, TrainingStatus};

/// Model metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Unique artifact identifier
    pub id: Uuid,
    /// Human-readable model name
    pub name: String,
    /// Library version that wrote the artifact
    pub version: String,
    /// Export timestamp
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Epochs that actually ran
    pub epochs: usize,
    /// How training ended
    pub status: TrainingStatus,
    /// Metrics of the last epoch, if any ran
    pub final_metrics: Option<EpochMetrics>,
}

impl ModelMetadata {
    /// Describe a model produced by `history`
    pub fn new(name: impl Into<String>, history: &TrainingHistory) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            version: crate::VERSION.to_string(),
            created_at: chrono::Utc::now(),
            epochs: history.epochs.len(),
            status: history.status,
            final_metrics: history.final_metrics().cloned(),
        }
    }
}

/// Everything needed to classify raw rows after training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Provenance of the artifact
    pub metadata: ModelMetadata,
    /// Class names in output order
    pub classes: ClassLabelMap,
    /// Divisor applied to raw feature values
    pub feature_scale: f64,
    /// Network topology
    pub architecture: NetworkArchitecture,
    /// Trained parameters, input layer first
    pub layers: Vec<DenseLayer>,
}

impl ModelArtifact {
    /// Snapshot a predictor together with the history that trained it
    pub fn from_predictor(
        name: impl Into<String>,
        predictor: &Predictor,
        history: &TrainingHistory,
    ) -> Self {
        let network = predictor.network();
        Self {
            metadata: ModelMetadata::new(name, history),
            classes: predictor.classes().clone(),
            feature_scale: predictor.scale(),
            architecture: network.architecture().clone(),
            layers: network.layers().to_vec(),
        }
    }

    /// Rebuild the network and wrap it in a predictor
    pub fn into_predictor(self) -> Result<Predictor> {
        let network = FeedforwardNetwork::from_layers(self.architecture, self.layers)?;
        Predictor::new(network, self.classes, self.feature_scale)
    }

    /// Serialize as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Write the artifact to `path`
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        tokio::fs::write(path, self.to_json()?).await?;
        info!(path = %path.display(), model = %self.metadata.id, "Exported model");
        Ok(())
    }

    /// Read an artifact from `path`
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json(&content)
    }
}
