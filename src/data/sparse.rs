//! In-memory sparse feature matrix and label vector

use crate::core::{FeatureStore, LPMError, LabelStore, Result, SparseVector};

/// Row-major collection of sparse feature vectors with a fixed dimensionality
#[derive(Debug, Clone)]
pub struct SparseFeatures {
    rows: Vec<SparseVector>,
    num_features: usize,
}

impl SparseFeatures {
    /// Create a feature matrix with a declared dimensionality
    ///
    /// Fails if any row stores an index >= `num_features`.
    pub fn new(rows: Vec<SparseVector>, num_features: usize) -> Result<Self> {
        if let Some(max_index) = rows.iter().filter_map(SparseVector::max_index).max() {
            if max_index >= num_features {
                return Err(LPMError::DimensionMismatch {
                    expected: num_features,
                    actual: max_index + 1,
                });
            }
        }
        Ok(Self { rows, num_features })
    }

    /// Create a feature matrix whose dimensionality is the largest stored index + 1
    pub fn from_rows(rows: Vec<SparseVector>) -> Self {
        let num_features = rows
            .iter()
            .filter_map(SparseVector::max_index)
            .max()
            .map_or(0, |idx| idx + 1);
        Self { rows, num_features }
    }

    /// Create a feature matrix from dense rows
    pub fn from_dense(rows: &[Vec<f64>]) -> Self {
        let num_features = rows.iter().map(Vec::len).max().unwrap_or(0);
        let rows = rows.iter().map(|r| SparseVector::from_dense(r)).collect();
        Self { rows, num_features }
    }

    pub fn rows(&self) -> &[SparseVector] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FeatureStore for SparseFeatures {
    fn num_features(&self) -> usize {
        self.num_features
    }

    fn num_examples(&self) -> usize {
        self.rows.len()
    }

    fn row(&self, index: usize) -> &SparseVector {
        &self.rows[index]
    }
}

/// Binary labels, each exactly +1 or -1
#[derive(Debug, Clone, PartialEq)]
pub struct Labels {
    values: Vec<f64>,
}

impl Labels {
    /// Create a label vector, rejecting anything other than +1/-1
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if let Some(&bad) = values.iter().find(|&&y| y != 1.0 && y != -1.0) {
            return Err(LPMError::InvalidLabel(bad));
        }
        Ok(Self { values })
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Count of (positive, negative) labels
    pub fn balance(&self) -> (usize, usize) {
        let positive = self.values.iter().filter(|&&y| y > 0.0).count();
        (positive, self.values.len() - positive)
    }
}

impl LabelStore for Labels {
    fn label(&self, index: usize) -> f64 {
        self.values[index]
    }

    fn num_labels(&self) -> usize {
        self.values.len()
    }
}
