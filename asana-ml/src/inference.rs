//! Classifying raw feature rows with a trained network.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::preparer::normalize_row;
use crate::data::{ClassLabelMap, RawRow};
use crate::error::{MLError, Result};
use crate::metrics::argmax;
use crate::neural_networks::FeedforwardNetwork;

/// Individual prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Index of the most probable class
    pub class_index: usize,

    /// Name of the most probable class
    pub label: String,

    /// Probability of the predicted class (0.0 to 1.0)
    pub confidence: f64,

    /// Probability of every class, in class-index order
    pub probabilities: Vec<f64>,
}

/// Trained network bundled with the label map and normalization it was trained with
#[derive(Debug, Clone)]
pub struct Predictor {
    network: FeedforwardNetwork,
    classes: ClassLabelMap,
    scale: f64,
}

impl Predictor {
    /// Create a predictor; the network output width must equal the class count
    pub fn new(network: FeedforwardNetwork, classes: ClassLabelMap, scale: f64) -> Result<Self> {
        let outputs = network.architecture().output_dim();
        if outputs != classes.len() {
            return Err(MLError::shape_mismatch(format!(
                "network outputs {} classes but {} labels were given",
                outputs,
                classes.len()
            )));
        }
        if !(scale.is_finite() && scale > 0.0) {
            return Err(MLError::config(format!(
                "feature scale must be positive, got {}",
                scale
            )));
        }
        Ok(Self {
            network,
            classes,
            scale,
        })
    }

    /// Underlying network
    pub fn network(&self) -> &FeedforwardNetwork {
        &self.network
    }

    /// Class names in index order
    pub fn classes(&self) -> &ClassLabelMap {
        &self.classes
    }

    /// Divisor applied to raw feature values
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Classify raw feature rows
    pub fn predict(&self, rows: &[RawRow]) -> Result<Vec<Prediction>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let width = self.network.architecture().input_dim;
        let mut values = Vec::with_capacity(rows.len() * width);
        for (row, raw) in rows.iter().enumerate() {
            if raw.len() != width {
                return Err(MLError::shape_mismatch(format!(
                    "row {} has {} features, model expects {}",
                    row,
                    raw.len(),
                    width
                )));
            }
            values.extend(normalize_row(raw, self.scale, row)?);
        }

        let input = Array2::from_shape_vec((rows.len(), width), values)
            .map_err(|e| MLError::shape_mismatch(e.to_string()))?;
        let probabilities = self.network.predict(&input)?;
        debug!(rows = rows.len(), "Ran inference");

        probabilities
            .rows()
            .into_iter()
            .map(|row| -> Result<Prediction> {
                let class_index = argmax(row);
                let label = self
                    .classes
                    .name(class_index)
                    .ok_or_else(|| {
                        MLError::model(format!("no label for class index {}", class_index))
                    })?
                    .to_string();
                Ok(Prediction {
                    class_index,
                    label,
                    confidence: row[class_index],
                    probabilities: row.to_vec(),
                })
            })
            .collect()
    }
}
