//! Dataset format validation tests
//!
//! Loading LibSVM files with the quirks found in the wild and training on them

use rlpm::{api::LPM, FeatureStore, LabelStore, LibSVMDataset, TrainingState};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp(data: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    write!(temp_file, "{}", data).expect("Failed to write");
    temp_file.flush().expect("Failed to flush");
    temp_file
}

/// Test LibSVM format variations
#[test]
fn test_libsvm_format_variations() {
    let test_cases = vec![
        ("+1 1:0.5 3:1.2 7:0.8\n-1 2:0.3 5:2.1\n", "basic format"),
        (
            "# This is a comment\n+1 1:0.5 3:1.2\n\n# Another comment\n-1 2:0.3\n",
            "with comments",
        ),
        ("1 1:0.5 2:1.0\n-1 1:-0.5 2:-1.0\n", "unsigned positive label"),
        ("2 1:0.5\n0 1:-0.5\n", "labels mapped by sign"),
        (
            "+1 1:1.0 10:2.0 100:3.0\n-1 5:1.5 50:2.5 500:3.5\n",
            "sparse indices",
        ),
        ("+1 1:2.0\n-1 1:-2.0\n+1 1:1.8\n-1 1:-1.8\n", "single feature"),
        (
            "+1 1:0.1 2:0.2 3:0.3 4:0.4 5:0.5\n-1 1:-0.1 2:-0.2 3:-0.3 4:-0.4 5:-0.5\n",
            "many features",
        ),
    ];

    for (data, description) in test_cases {
        let temp_file = write_temp(data);

        let dataset = LibSVMDataset::from_file(temp_file.path())
            .unwrap_or_else(|e| panic!("Failed to load {description}: {e}"));

        assert!(dataset.len() >= 2, "too few examples: {description}");
        assert!(dataset.dim() > 0, "no features: {description}");
        for i in 0..dataset.len() {
            let y = dataset.label(i);
            assert!(y == 1.0 || y == -1.0, "label not +-1: {description}");
        }

        let model = LPM::new()
            .with_max_iterations(2_000)
            .train_dataset(&dataset)
            .unwrap_or_else(|e| panic!("Training failed for {description}: {e}"));

        let prediction = model.predict(dataset.row(0));
        assert!(
            prediction.label == 1.0 || prediction.label == -1.0,
            "Prediction should be binary for: {description}"
        );
    }
}

/// Sparse, high-dimensional data stays sparse in the model
#[test]
fn test_large_dimensions() {
    let mut libsvm_data = String::new();
    libsvm_data.push_str("+1 100:1.0 1000:2.0 10000:1.5\n");
    libsvm_data.push_str("+1 150:1.2 1500:1.8 15000:1.3\n");
    libsvm_data.push_str("-1 200:1.0 2000:2.0 20000:1.5\n");
    libsvm_data.push_str("-1 250:1.2 2500:1.8 25000:1.3\n");

    let temp_file = write_temp(&libsvm_data);
    let dataset = LibSVMDataset::from_file(temp_file.path())
        .expect("Failed to load high-dimensional dataset");

    assert_eq!(dataset.len(), 4);
    assert_eq!(dataset.dim(), 25000);

    let model = LPM::new()
        .with_max_iterations(1_000)
        .train_dataset(&dataset)
        .expect("Training on high-dimensional data should succeed");

    let info = model.info();
    assert_eq!(info.num_features, 25000);
    // only features that occur in the data can carry weight
    assert!(info.nonzero_weights <= 12, "{} non-zero", info.nonzero_weights);
    assert_eq!(model.evaluate(&dataset, &dataset), 1.0);
}

/// Test malformed data handling
#[test]
fn test_malformed_data_handling() {
    let malformed_cases = vec![
        ("invalid_label 1:1.0\n", "invalid label"),
        ("+1 invalid_feature\n", "invalid feature format"),
        ("+1 0:1.0\n", "zero-based index"),
        ("+1 1:invalid_value\n", "invalid feature value"),
        ("+1 x:1.0\n", "invalid feature index"),
        ("", "empty file"),
        ("# only a comment\n\n", "no examples"),
    ];

    for (data, description) in malformed_cases {
        let temp_file = write_temp(data);
        assert!(
            LibSVMDataset::from_file(temp_file.path()).is_err(),
            "LibSVM should reject malformed data: {description}"
        );
    }
}

/// A one-class file loads but cannot be turned into a classifier
#[test]
fn test_single_class_dataset() {
    let temp_file = write_temp("+1 1:1.0\n+1 1:2.0\n+1 2:0.5\n");
    let dataset = LibSVMDataset::from_file(temp_file.path()).expect("loads");

    let model = LPM::new()
        .with_max_iterations(500)
        .train_dataset(&dataset)
        .expect("training still runs");
    assert!(model.weights().iter().all(|w| w.is_finite()));
    assert!(matches!(
        model.info().state,
        TrainingState::Converged | TrainingState::Cancelled
    ));
}
