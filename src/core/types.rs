//! Core type definitions for LPM training

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::{LPMError, Result};

/// Prediction result containing label and decision value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Predicted class label (+1 or -1)
    pub label: f64,
    /// Raw decision function value
    pub decision_value: f64,
}

impl Prediction {
    /// Create a new prediction
    pub fn new(label: f64, decision_value: f64) -> Self {
        Self {
            label,
            decision_value,
        }
    }

    /// Get confidence as absolute value of decision value
    pub fn confidence(&self) -> f64 {
        self.decision_value.abs()
    }
}

/// Sparse vector representation with sorted indices
#[derive(Clone, Debug, PartialEq)]
pub struct SparseVector {
    /// Sorted indices of non-zero elements
    pub indices: Vec<usize>,
    /// Values corresponding to indices
    pub values: Vec<f64>,
}

impl SparseVector {
    /// Create a new sparse vector, ensuring indices are sorted
    pub fn new(indices: Vec<usize>, values: Vec<f64>) -> Self {
        assert_eq!(
            indices.len(),
            values.len(),
            "Indices and values must have same length"
        );

        let mut pairs: Vec<_> = indices.into_iter().zip(values).collect();
        pairs.sort_by_key(|&(idx, _)| idx);

        let (indices, values): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        Self { indices, values }
    }

    /// Create a sparse vector from a dense slice, dropping exact zeros
    pub fn from_dense(dense: &[f64]) -> Self {
        let (indices, values) = dense
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v != 0.0)
            .map(|(i, &v)| (i, v))
            .unzip();
        Self { indices, values }
    }

    /// Create an empty sparse vector
    pub fn empty() -> Self {
        Self {
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Get the value at a specific index (0 if not present)
    pub fn get(&self, index: usize) -> f64 {
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    /// Dot product with a dense vector; indices past its end count as zero
    pub fn dot_dense(&self, dense: &[f64]) -> f64 {
        self.indices
            .iter()
            .zip(&self.values)
            .filter(|&(&idx, _)| idx < dense.len())
            .map(|(&idx, &v)| v * dense[idx])
            .sum()
    }

    /// `dense += scale * self`, ignoring indices past the end of `dense`
    pub fn add_scaled_to_dense(&self, scale: f64, dense: &mut [f64]) {
        for (&idx, &v) in self.indices.iter().zip(&self.values) {
            if let Some(slot) = dense.get_mut(idx) {
                *slot += scale * v;
            }
        }
    }

    /// Largest stored index, if any
    pub fn max_index(&self) -> Option<usize> {
        self.indices.last().copied()
    }

    /// Compute squared L2 norm
    pub fn norm_squared(&self) -> f64 {
        self.values.iter().map(|&v| v * v).sum()
    }

    /// Compute L2 norm
    pub fn norm(&self) -> f64 {
        self.norm_squared().sqrt()
    }

    /// Number of non-zero elements
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Check if vector is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Penalty applied to the weight vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regularizer {
    /// `||w||_1`, yields sparse weights
    #[default]
    L1,
    /// `0.5 * ||w||^2`, the classic soft-margin SVM primal
    L2,
}

/// Configuration for the sub-gradient trainer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LPMConfig {
    /// Trade-off between the penalty and the hinge loss
    pub c: f64,
    /// Target tolerance for margins, weights and the optimality test
    pub epsilon: f64,
    /// Initial capacity reserved for the boundary sub-problem
    pub qpsize: usize,
    /// Above this many on-margin examples optimality is only checked
    /// after repeated non-improving iterations
    pub qpsize_max: usize,
    /// Train an unregularized bias term
    pub use_bias: bool,
    /// Weight penalty
    pub regularizer: Regularizer,
}

impl Default for LPMConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            epsilon: 1e-5,
            qpsize: 42,
            qpsize_max: 2000,
            use_bias: false,
            regularizer: Regularizer::L1,
        }
    }
}

impl LPMConfig {
    /// Check that every parameter is usable
    pub fn validate(&self) -> Result<()> {
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(LPMError::InvalidParameter(format!(
                "C must be positive and finite, got {}",
                self.c
            )));
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(LPMError::InvalidParameter(format!(
                "epsilon must be positive and finite, got {}",
                self.epsilon
            )));
        }
        if self.qpsize == 0 || self.qpsize > self.qpsize_max {
            return Err(LPMError::InvalidParameter(format!(
                "qpsize must satisfy 0 < qpsize <= qpsize_max, got qpsize={} qpsize_max={}",
                self.qpsize, self.qpsize_max
            )));
        }
        Ok(())
    }
}

/// State of the training controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingState {
    Running,
    Converged,
    Cancelled,
}

/// Snapshot handed to observers once per iteration
#[derive(Debug, Clone, Serialize)]
pub struct IterationProgress {
    pub iteration: usize,
    pub objective: f64,
    /// Step length of the previous iteration
    pub alpha: f64,
    /// Directional derivative of the previous iteration
    pub dir_deriv: f64,
    pub num_active: usize,
    pub num_bound: usize,
    pub delta_active: usize,
    pub work_epsilon: f64,
    pub epsilon: f64,
    /// Wall time of the previous iteration
    pub loop_secs: f64,
    pub elapsed_secs: f64,
}

/// Run statistics returned with every outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingStats {
    pub iterations: usize,
    pub objective: f64,
    pub alpha: f64,
    pub dir_deriv: f64,
    pub num_active: usize,
    pub num_bound: usize,
    pub work_epsilon: f64,
    /// Mean fraction of near-zero coordinates over all iterations
    pub sparsity: f64,
    pub qp_calls: usize,
    pub qp_secs: f64,
    pub elapsed_secs: f64,
    pub started_at: DateTime<Utc>,
}

/// Result of a training run that was not aborted by an error
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// `Converged` or `Cancelled`
    pub state: TrainingState,
    pub weights: Vec<f64>,
    pub bias: f64,
    pub stats: TrainingStats,
}

impl TrainingOutcome {
    pub fn is_converged(&self) -> bool {
        self.state == TrainingState::Converged
    }
}

/// Cooperative cancellation shared between the trainer and its controller
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    flag: Arc<AtomicBool>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request termination; observed at the start of the next iteration
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_vector_creation() {
        let sv = SparseVector::new(vec![2, 0, 4], vec![2.0, 1.0, 3.0]);

        assert_eq!(sv.indices, vec![0, 2, 4]);
        assert_eq!(sv.values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_sparse_vector_get() {
        let sv = SparseVector::new(vec![1, 3, 5], vec![1.0, 2.0, 3.0]);

        assert_eq!(sv.get(0), 0.0);
        assert_eq!(sv.get(1), 1.0);
        assert_eq!(sv.get(3), 2.0);
        assert_eq!(sv.get(5), 3.0);
        assert_eq!(sv.get(6), 0.0);
    }

    #[test]
    fn test_sparse_vector_dense_ops() {
        let sv = SparseVector::new(vec![0, 2], vec![2.0, -1.0]);
        assert_eq!(sv.dot_dense(&[1.0, 5.0, 3.0]), -1.0);

        let mut acc = vec![1.0, 1.0, 1.0];
        sv.add_scaled_to_dense(0.5, &mut acc);
        assert_eq!(acc, vec![2.0, 1.0, 0.5]);

        // out-of-range indices are ignored
        assert_eq!(sv.dot_dense(&[1.0]), 2.0);
        assert_eq!(sv.max_index(), Some(2));
    }

    #[test]
    fn test_sparse_vector_from_dense() {
        let sv = SparseVector::from_dense(&[0.0, 3.0, 0.0, -1.0]);
        assert_eq!(sv.indices, vec![1, 3]);
        assert_eq!(sv.values, vec![3.0, -1.0]);
        assert_eq!(sv.norm_squared(), 10.0);
    }

    #[test]
    fn test_prediction() {
        let pred = Prediction::new(1.0, 2.5);
        assert_eq!(pred.label, 1.0);
        assert_eq!(pred.confidence(), 2.5);

        let neg_pred = Prediction::new(-1.0, -1.8);
        assert_eq!(neg_pred.confidence(), 1.8);
    }

    #[test]
    fn test_config_default() {
        let config = LPMConfig::default();
        assert_eq!(config.c, 1.0);
        assert_eq!(config.epsilon, 1e-5);
        assert_eq!(config.qpsize, 42);
        assert_eq!(config.qpsize_max, 2000);
        assert!(!config.use_bias);
        assert_eq!(config.regularizer, Regularizer::L1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_bad_values() {
        for c in [0.0, -1.0, f64::NAN] {
            let config = LPMConfig {
                c,
                ..LPMConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(LPMError::InvalidParameter(_))
            ));
        }

        let config = LPMConfig {
            epsilon: 0.0,
            ..LPMConfig::default()
        };
        assert!(config.validate().is_err());

        let config = LPMConfig {
            qpsize: 10,
            qpsize_max: 5,
            ..LPMConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cancellation_flag_is_shared() {
        let flag = CancellationFlag::new();
        let handle = flag.clone();
        assert!(!flag.is_cancelled());

        handle.cancel();
        assert!(flag.is_cancelled());

        flag.reset();
        assert!(!handle.is_cancelled());
    }

    #[test]
    #[should_panic(expected = "Indices and values must have same length")]
    fn test_sparse_vector_length_mismatch() {
        SparseVector::new(vec![0, 1], vec![1.0, 2.0, 3.0]);
    }
}
