//! LibSVM format dataset implementation
//!
//! Supports loading datasets in the libsvm format:
//! label index:value index:value ...
//!
//! Example:
//! +1 1:0.5 3:1.2 7:0.8
//! -1 2:0.3 5:2.1

use crate::core::{FeatureStore, LPMError, LabelStore, Result, SparseVector};
use crate::data::{Labels, SparseFeatures};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Features and labels loaded from a LibSVM format file
#[derive(Debug, Clone)]
pub struct LibSVMDataset {
    features: SparseFeatures,
    labels: Labels,
}

impl LibSVMDataset {
    /// Load a dataset from a LibSVM format file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(LPMError::IoError)?;
        let reader = BufReader::new(file);
        Self::from_reader(reader)
    }

    /// Load a dataset from a reader (for testing and flexibility)
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut rows = Vec::new();
        let mut labels = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(LPMError::IoError)?;
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match Self::parse_line(line) {
                Ok((label, row)) => {
                    labels.push(label);
                    rows.push(row);
                }
                Err(e) => {
                    return Err(LPMError::ParseError(format!(
                        "Error parsing line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }

        if rows.is_empty() {
            return Err(LPMError::EmptyDataset);
        }

        Ok(LibSVMDataset {
            features: SparseFeatures::from_rows(rows),
            labels: Labels::new(labels)?,
        })
    }

    /// Parse a single line in libsvm format
    fn parse_line(line: &str) -> Result<(f64, SparseVector)> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        if parts.is_empty() {
            return Err(LPMError::ParseError("Empty line".to_string()));
        }

        let label = parts[0]
            .parse::<f64>()
            .map_err(|_| LPMError::ParseError(format!("Invalid label: {}", parts[0])))?;

        // Binary task: map by sign
        let label = if label > 0.0 { 1.0 } else { -1.0 };

        let mut indices = Vec::new();
        let mut values = Vec::new();

        for feature_str in &parts[1..] {
            let (index, value) = feature_str.split_once(':').ok_or_else(|| {
                LPMError::ParseError(format!("Invalid feature format: {}", feature_str))
            })?;

            let index = index
                .parse::<usize>()
                .map_err(|_| LPMError::ParseError(format!("Invalid feature index: {}", index)))?;

            let value = value
                .parse::<f64>()
                .map_err(|_| LPMError::ParseError(format!("Invalid feature value: {}", value)))?;

            // libsvm uses 1-based indexing
            if index == 0 {
                return Err(LPMError::ParseError(format!(
                    "Feature index must be positive: {}",
                    index
                )));
            }

            indices.push(index - 1);
            values.push(value);
        }

        Ok((label, SparseVector::new(indices, values)))
    }

    pub fn features(&self) -> &SparseFeatures {
        &self.features
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Split into the feature and label stores
    pub fn into_parts(self) -> (SparseFeatures, Labels) {
        (self.features, self.labels)
    }

    /// Number of examples
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of features (dimensionality)
    pub fn dim(&self) -> usize {
        self.features.num_features()
    }
}

impl FeatureStore for LibSVMDataset {
    fn num_features(&self) -> usize {
        self.features.num_features()
    }

    fn num_examples(&self) -> usize {
        self.features.num_examples()
    }

    fn row(&self, index: usize) -> &SparseVector {
        self.features.row(index)
    }
}

impl LabelStore for LibSVMDataset {
    fn label(&self, index: usize) -> f64 {
        self.labels.label(index)
    }

    fn num_labels(&self) -> usize {
        self.labels.num_labels()
    }
}
