//! Core traits for LPM training

use crate::core::{IterationProgress, Prediction, SparseVector};

/// Row-oriented sparse feature matrix
pub trait FeatureStore {
    /// Dimensionality of every feature vector
    fn num_features(&self) -> usize;

    /// Number of feature vectors
    fn num_examples(&self) -> usize;

    /// Feature vector of one example
    ///
    /// # Panics
    /// Panics if index >= num_examples()
    fn row(&self, index: usize) -> &SparseVector;

    /// `scale * (x_index · vector) + bias`
    fn dense_dot(&self, scale: f64, index: usize, vector: &[f64], bias: f64) -> f64 {
        scale * self.row(index).dot_dense(vector) + bias
    }

    /// `accumulator += scale * x_index`
    fn add_scaled_to_dense(&self, scale: f64, index: usize, accumulator: &mut [f64]) {
        self.row(index).add_scaled_to_dense(scale, accumulator);
    }
}

/// Binary labels aligned with a feature store
pub trait LabelStore {
    /// Label of one example, +1 or -1
    fn label(&self, index: usize) -> f64;

    fn num_labels(&self) -> usize;
}

/// Receives one progress record per training iteration
pub trait TrainingObserver {
    fn on_iteration(&mut self, progress: &IterationProgress);
}

impl<F> TrainingObserver for F
where
    F: FnMut(&IterationProgress),
{
    fn on_iteration(&mut self, progress: &IterationProgress) {
        self(progress)
    }
}

/// Trained linear decision function
pub trait LinearClassifier {
    /// Raw decision value `w·x + bias`
    fn decision_function(&self, features: &SparseVector) -> f64;

    /// Predict a single feature vector
    fn predict(&self, features: &SparseVector) -> Prediction {
        let decision_value = self.decision_function(features);
        let label = if decision_value >= 0.0 { 1.0 } else { -1.0 };
        Prediction::new(label, decision_value)
    }

    /// Predict multiple feature vectors
    fn predict_batch(&self, rows: &[SparseVector]) -> Vec<Prediction> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    /// Weight vector
    fn weights(&self) -> &[f64];

    /// Get the bias term
    fn bias(&self) -> f64;
}
