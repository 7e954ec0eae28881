//! Raw dataset types, CSV loading and train/test preparation.

pub mod labels;
pub mod loader;
pub mod preparer;

pub use labels::ClassLabelMap;
pub use loader::{load_dataset, parse_features, parse_labels};
pub use preparer::{ClassBucket, ClassSplit, DatasetPreparer, NormalizedSample, Partition};

/// One sample as string-encoded feature values.
pub type RawRow = Vec<String>;

/// All samples; every row has the same width D.
pub type RawFeatureSet = Vec<RawRow>;

/// One class name per feature row, positionally aligned.
pub type RawLabels = Vec<String>;

/// Features and labels as produced by the loader, before preparation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDataset {
    /// Feature rows
    pub features: RawFeatureSet,
    /// Label strings
    pub labels: RawLabels,
}

impl RawDataset {
    /// Number of feature rows.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// True when no feature rows were loaded.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
