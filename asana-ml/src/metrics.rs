//! Classification metrics over probability and one-hot matrices.

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::{MLError, Result};
use crate::neural_networks::FeedforwardNetwork;

/// Index of the largest value in `row`; the first one wins on ties
pub fn argmax(row: ArrayView1<'_, f64>) -> usize {
    let mut best = 0;
    for (index, value) in row.iter().enumerate() {
        if *value > row[best] {
            best = index;
        }
    }
    best
}

/// Row-wise argmax of a `[N, C]` matrix
pub fn argmax_rows(matrix: &Array2<f64>) -> Vec<usize> {
    matrix.rows().into_iter().map(argmax).collect()
}

fn check_pair(predictions: &Array2<f64>, targets: &Array2<f64>) -> Result<()> {
    if predictions.shape() != targets.shape() {
        return Err(MLError::shape_mismatch(format!(
            "predictions {:?} vs targets {:?}",
            predictions.shape(),
            targets.shape()
        )));
    }
    if predictions.nrows() == 0 {
        return Err(MLError::invalid_input("cannot score an empty batch"));
    }
    Ok(())
}

/// Fraction of rows whose predicted class matches the one-hot target
pub fn accuracy(predictions: &Array2<f64>, targets: &Array2<f64>) -> Result<f64> {
    check_pair(predictions, targets)?;
    let correct = argmax_rows(predictions)
        .into_iter()
        .zip(argmax_rows(targets))
        .filter(|(predicted, actual)| predicted == actual)
        .count();
    Ok(correct as f64 / predictions.nrows() as f64)
}

/// Counts of `(actual, predicted)` class pairs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// `counts[actual][predicted]`
    counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Tally predictions against one-hot targets
    pub fn from_predictions(predictions: &Array2<f64>, targets: &Array2<f64>) -> Result<Self> {
        check_pair(predictions, targets)?;
        let classes = targets.ncols();
        let mut counts = vec![vec![0; classes]; classes];
        for (predicted, actual) in argmax_rows(predictions).into_iter().zip(argmax_rows(targets)) {
            counts[actual][predicted] += 1;
        }
        Ok(Self { counts })
    }

    /// Number of classes
    pub fn num_classes(&self) -> usize {
        self.counts.len()
    }

    /// Rows whose actual class is `actual` and predicted class is `predicted`
    pub fn count(&self, actual: usize, predicted: usize) -> usize {
        self.counts
            .get(actual)
            .and_then(|row| row.get(predicted))
            .copied()
            .unwrap_or(0)
    }

    /// Total number of scored rows
    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Fraction of `class` rows predicted correctly, `None` without support
    pub fn recall(&self, class: usize) -> Option<f64> {
        let row = self.counts.get(class)?;
        let support: usize = row.iter().sum();
        (support > 0).then(|| row[class] as f64 / support as f64)
    }

    /// Fraction of `class` predictions that were correct, `None` if never predicted
    pub fn precision(&self, class: usize) -> Option<f64> {
        if class >= self.num_classes() {
            return None;
        }
        let predicted: usize = self.counts.iter().map(|row| row[class]).sum();
        (predicted > 0).then(|| self.counts[class][class] as f64 / predicted as f64)
    }
}

/// Summary of a model on one labelled partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Mean loss under the network's objective
    pub loss: f64,

    /// Overall accuracy
    pub accuracy: f64,

    /// Per-class tallies
    pub confusion: ConfusionMatrix,
}

impl EvaluationReport {
    /// Score `network` on `features` against one-hot `labels`
    pub fn evaluate(
        network: &FeedforwardNetwork,
        features: &Array2<f64>,
        labels: &Array2<f64>,
    ) -> Result<Self> {
        let predictions = network.predict(features)?;
        Ok(Self {
            loss: network.evaluate_loss(features, labels)?,
            accuracy: accuracy(&predictions, labels)?,
            confusion: ConfusionMatrix::from_predictions(&predictions, labels)?,
        })
    }
}
