//! Stratified, shuffled, one-hot encoded train/test partitioning.
//!
//! Samples are normalized, routed into one bucket per class, shuffled and
//! split per bucket, then concatenated in ascending class order. Splitting
//! each class separately keeps every class at the same train/test
//! proportion regardless of how imbalanced the full dataset is.

use ndarray::{Array2, Axis};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::config::DatasetConfig;
use crate::data::{ClassLabelMap, RawRow};
use crate::error::{MLError, Result};

/// One sample after normalization and label lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSample {
    /// Feature vector, each raw value divided by the scale constant
    pub features: Vec<f64>,
    /// Class index in `0..K`
    pub class_index: usize,
}

/// Samples of a single class, in original relative order.
#[derive(Debug, Clone)]
pub struct ClassBucket {
    /// Class index shared by every sample in the bucket
    pub class_index: usize,
    /// Feature vectors of the class
    pub samples: Vec<Vec<f64>>,
}

/// Train/test counts contributed by one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassSplit {
    /// Class index
    pub class_index: usize,
    /// Rows routed to the train partition
    pub train: usize,
    /// Rows routed to the test partition
    pub test: usize,
}

/// The four output containers of a preparation run.
#[derive(Debug, Clone)]
pub struct Partition {
    /// `[n_train, D]`
    pub train_features: Array2<f64>,
    /// `[n_train, K]`, one-hot
    pub train_labels: Array2<f64>,
    /// `[n_test, D]`
    pub test_features: Array2<f64>,
    /// `[n_test, K]`, one-hot
    pub test_labels: Array2<f64>,
    /// Per-class split counts in class-index order
    pub splits: Vec<ClassSplit>,
}

impl Partition {
    /// Feature dimensionality D.
    pub fn feature_dim(&self) -> usize {
        self.train_features.ncols()
    }

    /// Number of classes K.
    pub fn num_classes(&self) -> usize {
        self.train_labels.ncols()
    }

    /// Number of train rows.
    pub fn train_len(&self) -> usize {
        self.train_features.nrows()
    }

    /// Number of test rows.
    pub fn test_len(&self) -> usize {
        self.test_features.nrows()
    }

    /// Interleave the train rows across classes.
    ///
    /// `prepare` leaves train rows grouped by class; this applies one global
    /// permutation to train features and labels in lockstep. Test rows are
    /// left untouched.
    pub fn shuffled<R: Rng + ?Sized>(self, rng: &mut R) -> Self {
        let mut order: Vec<usize> = (0..self.train_len()).collect();
        order.shuffle(rng);

        Self {
            train_features: self.train_features.select(Axis(0), &order),
            train_labels: self.train_labels.select(Axis(0), &order),
            ..self
        }
    }
}

/// Turns raw feature rows and label strings into a [`Partition`].
#[derive(Debug, Clone)]
pub struct DatasetPreparer {
    config: DatasetConfig,
}

impl DatasetPreparer {
    /// Create a preparer after validating its configuration.
    pub fn new(config: DatasetConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The immutable configuration this preparer runs with.
    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    /// Normalize, stratify, shuffle, split and assemble.
    ///
    /// The only randomness is the per-bucket shuffle, drawn from `rng` in
    /// ascending class order, so a seeded `rng` yields identical partitions.
    pub fn prepare<R: Rng + ?Sized>(
        &self,
        features: &[RawRow],
        labels: &[String],
        rng: &mut R,
    ) -> Result<Partition> {
        if features.len() != labels.len() {
            return Err(MLError::shape_mismatch(format!(
                "{} feature rows but {} labels",
                features.len(),
                labels.len()
            )));
        }

        let dim = feature_width(features)?;
        let classes = &self.config.classes;

        let samples = features
            .iter()
            .zip(labels)
            .enumerate()
            .map(|(row, (raw, label))| {
                let features = normalize_row(raw, self.config.scale, row)?;
                let class_index = classes
                    .index_of(label.trim())
                    .ok_or_else(|| MLError::unknown_class(label.trim(), row))?;
                Ok(NormalizedSample {
                    features,
                    class_index,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let buckets = stratify(samples, classes)?;

        let mut train_rows = Vec::new();
        let mut train_classes = Vec::new();
        let mut test_rows = Vec::new();
        let mut test_classes = Vec::new();
        let mut splits = Vec::with_capacity(buckets.len());

        for bucket in buckets {
            let class_index = bucket.class_index;
            let (train, test) = bucket.split(self.config.test_fraction, rng);

            debug!(
                class = classes.name(class_index).unwrap_or_default(),
                train = train.len(),
                test = test.len(),
                "Split class bucket"
            );

            splits.push(ClassSplit {
                class_index,
                train: train.len(),
                test: test.len(),
            });
            train_classes.extend(std::iter::repeat(class_index).take(train.len()));
            test_classes.extend(std::iter::repeat(class_index).take(test.len()));
            train_rows.extend(train);
            test_rows.extend(test);
        }

        let partition = Partition {
            train_features: stack_rows(&train_rows, dim)?,
            train_labels: one_hot_rows(&train_classes, classes)?,
            test_features: stack_rows(&test_rows, dim)?,
            test_labels: one_hot_rows(&test_classes, classes)?,
            splits,
        };

        debug!(
            train = partition.train_len(),
            test = partition.test_len(),
            features = dim,
            classes = classes.len(),
            "Prepared dataset partition"
        );

        Ok(partition)
    }
}

impl ClassBucket {
    /// Shuffle the bucket and split it into a train prefix and test suffix.
    ///
    /// `num_test = round(len * test_fraction)`; the remainder goes to train.
    pub fn split<R: Rng + ?Sized>(
        self,
        test_fraction: f64,
        rng: &mut R,
    ) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
        let total = self.samples.len();
        let mut order: Vec<usize> = (0..total).collect();
        order.shuffle(rng);

        let mut slots: Vec<Option<Vec<f64>>> = self.samples.into_iter().map(Some).collect();
        let mut shuffled: Vec<Vec<f64>> = order
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect();

        let num_test = ((total as f64) * test_fraction).round() as usize;
        let num_train = total - num_test.min(total);
        let test = shuffled.split_off(num_train);
        (shuffled, test)
    }
}

/// Route samples into one bucket per class, preserving relative order.
fn stratify(samples: Vec<NormalizedSample>, classes: &ClassLabelMap) -> Result<Vec<ClassBucket>> {
    let mut buckets: Vec<ClassBucket> = (0..classes.len())
        .map(|class_index| ClassBucket {
            class_index,
            samples: Vec::new(),
        })
        .collect();

    for sample in samples {
        buckets[sample.class_index].samples.push(sample.features);
    }

    if let Some(empty) = buckets.iter().find(|bucket| bucket.samples.is_empty()) {
        let name = classes.name(empty.class_index).unwrap_or_default();
        return Err(MLError::empty_bucket(name));
    }

    Ok(buckets)
}

/// Common row width D, or `ShapeMismatch` when rows disagree or are empty.
fn feature_width(features: &[RawRow]) -> Result<usize> {
    let Some(first) = features.first() else {
        return Ok(0);
    };
    let dim = first.len();
    if dim == 0 {
        return Err(MLError::shape_mismatch("feature rows must not be empty"));
    }
    if let Some((row, raw)) = features
        .iter()
        .enumerate()
        .find(|(_, raw)| raw.len() != dim)
    {
        return Err(MLError::shape_mismatch(format!(
            "row {} has {} features, expected {}",
            row,
            raw.len(),
            dim
        )));
    }
    Ok(dim)
}

/// Parse and scale one raw row. `row` is only used for error reporting.
pub(crate) fn normalize_row(raw: &[String], scale: f64, row: usize) -> Result<Vec<f64>> {
    raw.iter()
        .enumerate()
        .map(|(column, value)| {
            value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|parsed| parsed.is_finite())
                .map(|parsed| parsed / scale)
                .ok_or_else(|| MLError::invalid_feature(row, column, value.as_str()))
        })
        .collect()
}

fn stack_rows(rows: &[Vec<f64>], dim: usize) -> Result<Array2<f64>> {
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows.len(), dim), flat)
        .map_err(|e| MLError::shape_mismatch(format!("failed to assemble features: {}", e)))
}

fn one_hot_rows(class_indices: &[usize], classes: &ClassLabelMap) -> Result<Array2<f64>> {
    let encoded = class_indices
        .iter()
        .map(|&class_index| classes.one_hot(class_index))
        .collect::<Result<Vec<_>>>()?;
    stack_rows(&encoded, classes.len())
}
