//! Training objectives.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Probabilities are clipped to `[EPSILON, 1 - EPSILON]` before taking logs
pub const EPSILON: f64 = 1e-7;

/// Loss functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossFunction {
    /// Cross entropy against one-hot targets, averaged over the batch
    CategoricalCrossEntropy,

    /// Mean Squared Error over every output element
    MeanSquaredError,
}

impl LossFunction {
    /// Scalar loss of `predictions` against `targets`
    pub fn compute(&self, predictions: &Array2<f64>, targets: &Array2<f64>) -> f64 {
        let rows = predictions.nrows().max(1) as f64;
        match self {
            LossFunction::CategoricalCrossEntropy => {
                let log_likelihood: f64 = predictions
                    .iter()
                    .zip(targets.iter())
                    .map(|(p, y)| y * p.clamp(EPSILON, 1.0 - EPSILON).ln())
                    .sum();
                -log_likelihood / rows
            }
            LossFunction::MeanSquaredError => {
                let count = predictions.len().max(1) as f64;
                let squared: f64 = predictions
                    .iter()
                    .zip(targets.iter())
                    .map(|(p, y)| (p - y) * (p - y))
                    .sum();
                squared / count
            }
        }
    }

    /// Gradient of the loss with respect to `predictions`
    pub fn gradient(&self, predictions: &Array2<f64>, targets: &Array2<f64>) -> Array2<f64> {
        let rows = predictions.nrows().max(1) as f64;
        match self {
            LossFunction::CategoricalCrossEntropy => {
                let mut gradient = Array2::zeros(predictions.raw_dim());
                ndarray::Zip::from(&mut gradient)
                    .and(predictions)
                    .and(targets)
                    .for_each(|g, &p, &y| {
                        *g = -y / p.clamp(EPSILON, 1.0 - EPSILON) / rows;
                    });
                gradient
            }
            LossFunction::MeanSquaredError => {
                let count = predictions.len().max(1) as f64;
                (predictions - targets) * (2.0 / count)
            }
        }
    }
}
