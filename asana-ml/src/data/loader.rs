//! Headerless CSV loading for feature and label files.

use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, info};

use crate::data::{RawDataset, RawFeatureSet, RawLabels};
use crate::error::{MLError, Result};

/// Parse a headerless feature CSV into raw string rows.
///
/// Width consistency is not checked here; the preparer reports ragged
/// rows as a shape mismatch.
pub fn parse_features(bytes: &[u8]) -> Result<RawFeatureSet> {
    let rows = records(bytes)?
        .into_iter()
        .map(|record| record.iter().map(str::to_string).collect())
        .collect();
    Ok(rows)
}

/// Parse a headerless label CSV, taking the first field of every record.
pub fn parse_labels(bytes: &[u8]) -> Result<RawLabels> {
    let labels = records(bytes)?
        .into_iter()
        .map(|record| record.get(0).unwrap_or_default().to_string())
        .collect();
    Ok(labels)
}

/// Read the feature and label files concurrently and parse both.
pub async fn load_dataset(
    features_path: impl AsRef<Path>,
    labels_path: impl AsRef<Path>,
) -> Result<RawDataset> {
    let features_path = features_path.as_ref();
    let labels_path = labels_path.as_ref();
    debug!(
        "Loading features from {} and labels from {}",
        features_path.display(),
        labels_path.display()
    );

    let (feature_bytes, label_bytes) = tokio::try_join!(
        tokio::fs::read(features_path),
        tokio::fs::read(labels_path)
    )?;

    let dataset = RawDataset {
        features: parse_features(&feature_bytes)?,
        labels: parse_labels(&label_bytes)?,
    };

    if dataset.is_empty() {
        return Err(MLError::data(format!(
            "no feature rows in {}",
            features_path.display()
        )));
    }

    info!(
        rows = dataset.features.len(),
        labels = dataset.labels.len(),
        "Loaded raw dataset"
    );
    Ok(dataset)
}

fn records(bytes: &[u8]) -> Result<Vec<StringRecord>> {
    reject_interior_blank_lines(bytes)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(bytes);

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        // Only trailing blanks remain at this point
        if record.iter().all(str::is_empty) {
            continue;
        }
        records.push(record);
    }
    Ok(records)
}

/// Rows are matched by position across files, so a blank line may only trail.
fn reject_interior_blank_lines(bytes: &[u8]) -> Result<()> {
    let mut first_blank = None;
    for (index, line) in bytes.split(|b| *b == b'\n').enumerate() {
        if line.iter().all(|b| b.is_ascii_whitespace() || *b == b',') {
            first_blank.get_or_insert(index + 1);
        } else if let Some(line_number) = first_blank {
            return Err(MLError::data(format!(
                "blank line {} is followed by more records",
                line_number
            )));
        }
    }
    Ok(())
}
