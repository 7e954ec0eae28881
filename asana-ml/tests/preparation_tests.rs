//! Integration tests for stratified dataset preparation
//!
//! Samples are built so that every raw row can be identified from its first
//! feature, which lets the tests check normalization and class routing
//! regardless of the shuffle.

use std::collections::HashSet;

use asana_ml::data::ClassSplit;
use asana_ml::metrics::argmax_rows;
use asana_ml::{ClassLabelMap, DatasetConfig, DatasetPreparer, MLError, Partition};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;

const SCALE: f64 = 400.0;

/// Row `i` is `[i, 2i, 3i]`; even rows are yoga1, odd rows yoga2.
fn create_dataset(samples: usize) -> (Vec<Vec<String>>, Vec<String>) {
    let features = (0..samples)
        .map(|i| vec![i.to_string(), (2 * i).to_string(), (3 * i).to_string()])
        .collect();
    let labels = (0..samples)
        .map(|i| if i % 2 == 0 { "yoga1" } else { "yoga2" }.to_string())
        .collect();
    (features, labels)
}

fn prepare(samples: usize, seed: u64) -> Partition {
    let (features, labels) = create_dataset(samples);
    let preparer = DatasetPreparer::new(DatasetConfig::default()).unwrap();
    preparer
        .prepare(&features, &labels, &mut StdRng::seed_from_u64(seed))
        .unwrap()
}

fn sample_id(row: ndarray::ArrayView1<'_, f64>) -> usize {
    (row[0] * SCALE).round() as usize
}

fn class_counts(labels: &Array2<f64>, classes: usize) -> Vec<usize> {
    let mut counts = vec![0; classes];
    for class in argmax_rows(labels) {
        counts[class] += 1;
    }
    counts
}

#[test]
fn test_hundred_samples_split_per_class() {
    let partition = prepare(100, 42);

    // round(50 * 0.15) = 8 test rows per class
    assert_eq!(partition.train_len(), 84);
    assert_eq!(partition.test_len(), 16);
    assert_eq!(class_counts(&partition.train_labels, 2), vec![42, 42]);
    assert_eq!(class_counts(&partition.test_labels, 2), vec![8, 8]);
    assert_eq!(
        partition.splits,
        vec![
            ClassSplit {
                class_index: 0,
                train: 42,
                test: 8
            },
            ClassSplit {
                class_index: 1,
                train: 42,
                test: 8
            },
        ]
    );
}

#[test]
fn test_shape_invariant() {
    for samples in [2, 7, 20, 33, 100] {
        let partition = prepare(samples, samples as u64);
        assert_eq!(partition.train_len() + partition.test_len(), samples);
        assert_eq!(partition.feature_dim(), 3);
        assert_eq!(partition.test_features.ncols(), 3);
        assert_eq!(partition.train_labels.ncols(), 2);
        assert_eq!(partition.test_labels.ncols(), 2);
        assert_eq!(partition.train_labels.nrows(), partition.train_len());
        assert_eq!(partition.test_labels.nrows(), partition.test_len());
    }
}

#[test]
fn test_stratification_invariant() {
    let partition = prepare(61, 3);
    let totals = [31usize, 30];
    let train = class_counts(&partition.train_labels, 2);

    for class in 0..2 {
        let ratio = train[class] as f64 / totals[class] as f64;
        assert!(
            (ratio - 0.85).abs() <= 1.0 / totals[class] as f64,
            "class {} train ratio {}",
            class,
            ratio
        );
    }
}

#[test]
fn test_labels_are_one_hot() {
    let partition = prepare(40, 5);
    for labels in [&partition.train_labels, &partition.test_labels] {
        for row in labels.rows() {
            assert_eq!(row.sum(), 1.0);
            assert_eq!(row.iter().filter(|v| **v == 1.0).count(), 1);
            assert!(row.iter().all(|v| *v == 0.0 || *v == 1.0));
        }
    }
}

#[test]
fn test_normalization_and_routing() {
    let partition = prepare(100, 11);
    let mut seen = HashSet::new();

    let pairs = [
        (&partition.train_features, &partition.train_labels),
        (&partition.test_features, &partition.test_labels),
    ];
    for (features, labels) in pairs {
        for (row, class) in features.rows().into_iter().zip(argmax_rows(labels)) {
            let id = sample_id(row);
            assert_eq!(row[0], id as f64 / SCALE);
            assert_eq!(row[1], (2 * id) as f64 / SCALE);
            assert_eq!(row[2], (3 * id) as f64 / SCALE);
            assert_eq!(class, id % 2, "sample {} routed to the wrong class", id);
            assert!(seen.insert(id), "sample {} emitted twice", id);
        }
    }
    assert_eq!(seen.len(), 100);
}

#[test]
fn test_classes_concatenated_in_index_order() {
    let partition = prepare(100, 17);
    let train_classes = argmax_rows(&partition.train_labels);
    let test_classes = argmax_rows(&partition.test_labels);

    assert!(train_classes.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(test_classes.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(train_classes[0], 0);
    assert_eq!(train_classes[train_classes.len() - 1], 1);
}

#[test]
fn test_deterministic_under_fixed_seed() {
    let a = prepare(100, 1234);
    let b = prepare(100, 1234);
    assert_eq!(a.train_features, b.train_features);
    assert_eq!(a.train_labels, b.train_labels);
    assert_eq!(a.test_features, b.test_features);
    assert_eq!(a.test_labels, b.test_labels);

    let c = prepare(100, 4321);
    assert_ne!(a.train_features, c.train_features);
}

#[test]
fn test_shuffled_partition_keeps_rows_aligned() {
    let partition = prepare(100, 8);
    let before: HashSet<usize> = partition.train_features.rows().into_iter().map(sample_id).collect();

    let shuffled = partition.shuffled(&mut StdRng::seed_from_u64(9));
    let after: HashSet<usize> = shuffled.train_features.rows().into_iter().map(sample_id).collect();
    assert_eq!(before, after);

    for (row, class) in shuffled
        .train_features
        .rows()
        .into_iter()
        .zip(argmax_rows(&shuffled.train_labels))
    {
        assert_eq!(class, sample_id(row) % 2);
    }
}

#[test]
fn test_length_mismatch() {
    let (features, mut labels) = create_dataset(3);
    labels.pop();
    let preparer = DatasetPreparer::new(DatasetConfig::default()).unwrap();
    let result = preparer.prepare(&features, &labels, &mut StdRng::seed_from_u64(0));
    assert!(matches!(result, Err(MLError::ShapeMismatch { .. })));
}

#[test]
fn test_inconsistent_row_width() {
    let (mut features, labels) = create_dataset(4);
    features[2].push("7".to_string());
    let preparer = DatasetPreparer::new(DatasetConfig::default()).unwrap();
    let result = preparer.prepare(&features, &labels, &mut StdRng::seed_from_u64(0));
    assert!(matches!(result, Err(MLError::ShapeMismatch { .. })));
}

#[test]
fn test_unknown_class() {
    let (features, mut labels) = create_dataset(6);
    labels[4] = "warrior".to_string();
    let preparer = DatasetPreparer::new(DatasetConfig::default()).unwrap();
    let result = preparer.prepare(&features, &labels, &mut StdRng::seed_from_u64(0));
    match result {
        Err(MLError::UnknownClass { label, row }) => {
            assert_eq!(label, "warrior");
            assert_eq!(row, 4);
        }
        other => panic!("expected UnknownClass, got {:?}", other),
    }
}

#[test]
fn test_empty_bucket() {
    let (features, _) = create_dataset(4);
    let labels = vec!["yoga1".to_string(); 4];
    let preparer = DatasetPreparer::new(DatasetConfig::default()).unwrap();
    let result = preparer.prepare(&features, &labels, &mut StdRng::seed_from_u64(0));
    assert!(matches!(result, Err(MLError::EmptyBucket { .. })));
}

#[test]
fn test_custom_class_map_and_fraction() {
    let classes = ClassLabelMap::new(["tree", "cobra", "lotus"]).unwrap();
    let config = DatasetConfig::new(classes, 100.0, 0.5).unwrap();
    let preparer = DatasetPreparer::new(config).unwrap();

    let features: Vec<Vec<String>> = (0..12).map(|i| vec![(i * 10).to_string()]).collect();
    let labels: Vec<String> = (0..12)
        .map(|i| ["tree", "cobra", "lotus"][i % 3].to_string())
        .collect();

    let partition = preparer
        .prepare(&features, &labels, &mut StdRng::seed_from_u64(1))
        .unwrap();
    assert_eq!(partition.num_classes(), 3);
    assert_eq!(partition.train_len(), 6);
    assert_eq!(partition.test_len(), 6);
    assert!(partition.train_features.iter().all(|v| *v <= 1.1));
}
