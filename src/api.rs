//! High-level API for sparse linear classification
//!
//! This module provides a builder for training, plus prediction and
//! evaluation helpers on the resulting model.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use rlpm::api::LPM;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Train a sparse model on data
//! let model = LPM::new()
//!     .with_c(1.0)
//!     .with_epsilon(1e-5)
//!     .train_from_file("data.libsvm")?;
//!
//! // Make predictions
//! let predictions = model.predict_from_file("test.libsvm")?;
//! println!("Accuracy: {:.2}%", model.evaluate_from_file("test.libsvm")? * 100.0);
//! # Ok(())
//! # }
//! ```

use crate::core::{
    CancellationFlag, FeatureStore, IterationProgress, LPMConfig, LPMError, LabelStore,
    LinearClassifier, Prediction, Regularizer, Result, SparseVector, TrainingObserver,
    TrainingState, TrainingStats,
};
use crate::data::{Labels, LibSVMDataset, SparseFeatures};
use crate::optimizer::{LPMOptimizer, TrainedLPM};
use crate::solver::{LoggingObserver, SubGradientLPM};
use std::path::Path;

/// High-level trainer interface with builder pattern
#[derive(Debug, Clone, Default)]
pub struct LPM {
    config: LPMConfig,
    max_iterations: Option<usize>,
    cancel: CancellationFlag,
}

impl LPM {
    /// Create a trainer with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a trainer from a full configuration
    pub fn with_config(config: LPMConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Set the trade-off parameter C
    pub fn with_c(mut self, c: f64) -> Self {
        self.config.c = c;
        self
    }

    /// Set the convergence tolerance
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.config.epsilon = epsilon;
        self
    }

    /// Train an unregularized bias term
    pub fn with_bias(mut self, use_bias: bool) -> Self {
        self.config.use_bias = use_bias;
        self
    }

    /// Choose the weight penalty
    pub fn with_regularizer(mut self, regularizer: Regularizer) -> Self {
        self.config.regularizer = regularizer;
        self
    }

    /// Set the boundary sub-problem thresholds
    pub fn with_qpsize(mut self, qpsize: usize, qpsize_max: usize) -> Self {
        self.config.qpsize = qpsize;
        self.config.qpsize_max = qpsize_max;
        self
    }

    /// Stop after this many steps
    ///
    /// Implemented through the cancellation flag: the returned model then
    /// reports `TrainingState::Cancelled`.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    /// Use an externally owned cancellation flag
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &LPMConfig {
        &self.config
    }

    /// Train on a feature store and a label store
    pub fn train<F, L>(self, features: &F, labels: &L) -> Result<TrainedModel>
    where
        F: FeatureStore + ?Sized,
        L: LabelStore + ?Sized,
    {
        self.train_with_observer(features, labels, LoggingObserver)
    }

    /// Train, reporting every iteration to `observer`
    pub fn train_with_observer<F, L, O>(
        self,
        features: &F,
        labels: &L,
        mut observer: O,
    ) -> Result<TrainedModel>
    where
        F: FeatureStore + ?Sized,
        L: LabelStore + ?Sized,
        O: TrainingObserver,
    {
        let model = match self.max_iterations {
            None => {
                let trainer = SubGradientLPM::new(self.config).with_cancellation(self.cancel);
                LPMOptimizer::from_trainer(trainer).train_with_observer(features, labels, observer)?
            }
            Some(max) => {
                // The budget gets its own flag so the caller's flag is never
                // raised by it; caller cancellation is forwarded.
                let budget = CancellationFlag::new();
                if max == 0 || self.cancel.is_cancelled() {
                    budget.cancel();
                }
                let trainer = SubGradientLPM::new(self.config).with_cancellation(budget.clone());
                let external = self.cancel;
                LPMOptimizer::from_trainer(trainer).train_with_observer(
                    features,
                    labels,
                    |p: &IterationProgress| {
                        observer.on_iteration(p);
                        if p.iteration + 1 >= max || external.is_cancelled() {
                            budget.cancel();
                        }
                    },
                )?
            }
        };
        Ok(TrainedModel { model })
    }

    /// Train on a dataset that stores features and labels together
    pub fn train_dataset<D>(self, dataset: &D) -> Result<TrainedModel>
    where
        D: FeatureStore + LabelStore + ?Sized,
    {
        self.train(dataset, dataset)
    }

    /// Train from LibSVM format file
    pub fn train_from_file<P: AsRef<Path>>(self, path: P) -> Result<TrainedModel> {
        let dataset = LibSVMDataset::from_file(path)?;
        self.train_dataset(&dataset)
    }
}

/// Trained model with high-level prediction interface
#[derive(Debug, Clone)]
pub struct TrainedModel {
    model: TrainedLPM,
}

impl TrainedModel {
    /// Predict a single feature vector
    pub fn predict(&self, features: &SparseVector) -> Prediction {
        self.model.predict(features)
    }

    /// Predict multiple feature vectors
    pub fn predict_batch(&self, rows: &[SparseVector]) -> Vec<Prediction> {
        self.model.predict_batch(rows)
    }

    /// Predict every example of a feature store
    pub fn predict_features<F>(&self, features: &F) -> Vec<Prediction>
    where
        F: FeatureStore + ?Sized,
    {
        (0..features.num_examples())
            .map(|i| self.model.predict(features.row(i)))
            .collect()
    }

    /// Predict from LibSVM file
    pub fn predict_from_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<Prediction>> {
        let dataset = LibSVMDataset::from_file(path)?;
        Ok(self.predict_features(&dataset))
    }

    /// Evaluate accuracy
    pub fn evaluate<F, L>(&self, features: &F, labels: &L) -> f64
    where
        F: FeatureStore + ?Sized,
        L: LabelStore + ?Sized,
    {
        self.evaluate_detailed(features, labels).accuracy()
    }

    /// Evaluate accuracy from LibSVM file
    pub fn evaluate_from_file<P: AsRef<Path>>(&self, path: P) -> Result<f64> {
        let dataset = LibSVMDataset::from_file(path)?;
        Ok(self.evaluate(&dataset, &dataset))
    }

    /// Get detailed evaluation metrics
    pub fn evaluate_detailed<F, L>(&self, features: &F, labels: &L) -> EvaluationMetrics
    where
        F: FeatureStore + ?Sized,
        L: LabelStore + ?Sized,
    {
        let predictions = self.predict_features(features);

        let mut tp = 0; // True positives
        let mut tn = 0; // True negatives
        let mut fp = 0; // False positives
        let mut fn_ = 0; // False negatives

        for (i, pred) in predictions.iter().enumerate().take(labels.num_labels()) {
            match (pred.label > 0.0, labels.label(i) > 0.0) {
                (true, true) => tp += 1,
                (false, false) => tn += 1,
                (true, false) => fp += 1,
                (false, true) => fn_ += 1,
            }
        }

        EvaluationMetrics::new(tp, tn, fp, fn_)
    }

    /// Get model information
    pub fn info(&self) -> ModelInfo {
        let stats = self.model.stats();
        ModelInfo {
            num_features: self.model.weights().len(),
            nonzero_weights: self.model.nonzero_weights().len(),
            sparsity: self.model.sparsity(0.0),
            bias: self.model.bias(),
            objective: stats.objective,
            iterations: stats.iterations,
            state: self.model.state(),
        }
    }

    /// Weight vector
    pub fn weights(&self) -> &[f64] {
        self.model.weights()
    }

    /// Bias term, 0 unless trained with a bias
    pub fn bias(&self) -> f64 {
        self.model.bias()
    }

    pub fn stats(&self) -> &TrainingStats {
        self.model.stats()
    }

    /// Get the underlying trained model
    pub fn inner(&self) -> &TrainedLPM {
        &self.model
    }
}

/// Detailed evaluation metrics
#[derive(Debug, Clone)]
pub struct EvaluationMetrics {
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl EvaluationMetrics {
    fn new(tp: usize, tn: usize, fp: usize, fn_: usize) -> Self {
        Self {
            true_positives: tp,
            true_negatives: tn,
            false_positives: fp,
            false_negatives: fn_,
        }
    }

    /// Calculate accuracy: (TP + TN) / (TP + TN + FP + FN)
    pub fn accuracy(&self) -> f64 {
        let total =
            self.true_positives + self.true_negatives + self.false_positives + self.false_negatives;
        if total == 0 {
            0.0
        } else {
            (self.true_positives + self.true_negatives) as f64 / total as f64
        }
    }

    /// Calculate precision: TP / (TP + FP)
    pub fn precision(&self) -> f64 {
        let denominator = self.true_positives + self.false_positives;
        if denominator == 0 {
            0.0
        } else {
            self.true_positives as f64 / denominator as f64
        }
    }

    /// Calculate recall: TP / (TP + FN)
    pub fn recall(&self) -> f64 {
        let denominator = self.true_positives + self.false_negatives;
        if denominator == 0 {
            0.0
        } else {
            self.true_positives as f64 / denominator as f64
        }
    }

    /// Calculate F1 score: 2 * (precision * recall) / (precision + recall)
    pub fn f1_score(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * (p * r) / (p + r)
        }
    }
}

/// Model information
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub num_features: usize,
    pub nonzero_weights: usize,
    /// Fraction of exactly-zero weights
    pub sparsity: f64,
    pub bias: f64,
    pub objective: f64,
    pub iterations: usize,
    pub state: TrainingState,
}

/// Convenience functions for quick operations
pub mod quick {
    use super::*;

    /// Train on LibSVM data with default parameters
    pub fn train_libsvm<P: AsRef<Path>>(path: P) -> Result<TrainedModel> {
        LPM::new().train_from_file(path)
    }

    /// Train with custom C parameter
    pub fn train_libsvm_with_c<P: AsRef<Path>>(path: P, c: f64) -> Result<TrainedModel> {
        LPM::new().with_c(c).train_from_file(path)
    }

    /// Quick evaluation: train on training file, test on test file
    pub fn evaluate_split<P1: AsRef<Path>, P2: AsRef<Path>>(
        train_path: P1,
        test_path: P2,
    ) -> Result<f64> {
        let model = train_libsvm(train_path)?;
        model.evaluate_from_file(test_path)
    }

    /// Train on the leading `train_ratio` share of the examples, test on the rest
    pub fn holdout_validation<D>(dataset: &D, train_ratio: f64, c: f64) -> Result<f64>
    where
        D: FeatureStore + LabelStore + ?Sized,
    {
        if train_ratio <= 0.0 || train_ratio >= 1.0 {
            return Err(LPMError::InvalidParameter(format!(
                "Train ratio must be between 0 and 1, got: {train_ratio}"
            )));
        }

        let n = dataset.num_examples();
        let train_size = (n as f64 * train_ratio) as usize;
        if train_size == 0 || train_size == n {
            return Err(LPMError::InvalidParameter(format!(
                "Train ratio {train_ratio} leaves an empty split of {n} examples"
            )));
        }

        // Sequential split for reproducibility
        let split = |range: std::ops::Range<usize>| -> Result<(SparseFeatures, Labels)> {
            let rows = range.clone().map(|i| dataset.row(i).clone()).collect();
            let labels = range.map(|i| dataset.label(i)).collect();
            Ok((
                SparseFeatures::new(rows, dataset.num_features())?,
                Labels::new(labels)?,
            ))
        };
        let (train_x, train_y) = split(0..train_size)?;
        let (test_x, test_y) = split(train_size..n)?;

        let model = LPM::new().with_c(c).train(&train_x, &train_y)?;
        Ok(model.evaluate(&test_x, &test_y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn separable() -> (SparseFeatures, Labels) {
        let features = SparseFeatures::from_dense(&[
            vec![2.0, 0.1],
            vec![-2.0, 0.2],
            vec![1.5, -0.1],
            vec![-1.5, 0.0],
            vec![1.8, 0.3],
            vec![-1.8, -0.2],
        ]);
        let labels = Labels::new(vec![1.0, -1.0, 1.0, -1.0, 1.0, -1.0]).unwrap();
        (features, labels)
    }

    #[test]
    fn test_builder_pattern() {
        let lpm = LPM::new()
            .with_c(2.0)
            .with_epsilon(0.01)
            .with_bias(true)
            .with_regularizer(Regularizer::L2)
            .with_qpsize(10, 100)
            .with_max_iterations(5000);

        assert_eq!(lpm.config.c, 2.0);
        assert_eq!(lpm.config.epsilon, 0.01);
        assert!(lpm.config.use_bias);
        assert_eq!(lpm.config.regularizer, Regularizer::L2);
        assert_eq!(lpm.config.qpsize, 10);
        assert_eq!(lpm.config.qpsize_max, 100);
        assert_eq!(lpm.max_iterations, Some(5000));
    }

    #[test]
    fn test_quick_training() {
        let (features, labels) = separable();

        let model = LPM::new()
            .train(&features, &labels)
            .expect("Training should succeed");

        let prediction = model.predict(&SparseVector::new(vec![0], vec![1.0]));
        assert_eq!(prediction.label, 1.0);
        assert_eq!(model.evaluate(&features, &labels), 1.0);

        let info = model.info();
        assert_eq!(info.state, TrainingState::Converged);
        assert_eq!(info.num_features, 2);
        assert!(info.nonzero_weights >= 1);
    }

    #[test]
    fn test_max_iterations_cancels() {
        let (features, labels) = separable();

        let model = LPM::new()
            .with_max_iterations(1)
            .train(&features, &labels)
            .unwrap();

        assert_eq!(model.info().state, TrainingState::Cancelled);
        assert_eq!(model.info().iterations, 1);
    }

    #[test]
    fn test_zero_iterations_returns_initial_point() {
        let (features, labels) = separable();

        let model = LPM::new()
            .with_max_iterations(0)
            .train(&features, &labels)
            .unwrap();

        assert_eq!(model.info().iterations, 0);
        assert!(model.weights().iter().all(|&w| w == 0.0));
    }

    #[test]
    fn test_iteration_budget_leaves_caller_flag_alone() {
        let (features, labels) = separable();
        let cancel = CancellationFlag::new();
        let lpm = LPM::new()
            .with_max_iterations(1)
            .with_cancellation(cancel.clone());

        let first = lpm.clone().train(&features, &labels).unwrap();
        assert_eq!(first.info().iterations, 1);
        assert!(!cancel.is_cancelled());

        // a raised caller flag still stops a budgeted run before its first step
        cancel.cancel();
        let second = lpm.train(&features, &labels).unwrap();
        assert_eq!(second.info().iterations, 0);
    }

    #[test]
    fn test_evaluation_metrics() {
        let metrics = EvaluationMetrics::new(10, 5, 2, 3);

        assert_eq!(metrics.accuracy(), 0.75); // (10+5)/(10+5+2+3)
        assert_eq!(metrics.precision(), 10.0 / 12.0); // 10/(10+2)
        assert_eq!(metrics.recall(), 10.0 / 13.0); // 10/(10+3)
        assert!(metrics.f1_score() > 0.0);

        let empty = EvaluationMetrics::new(0, 0, 0, 0);
        assert_eq!(empty.accuracy(), 0.0);
        assert_eq!(empty.f1_score(), 0.0);
    }

    #[test]
    fn test_file_operations() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(temp_file, "+1 1:2.0").expect("Failed to write");
        writeln!(temp_file, "-1 1:-2.0").expect("Failed to write");
        writeln!(temp_file, "+1 1:1.5").expect("Failed to write");
        writeln!(temp_file, "-1 1:-1.5").expect("Failed to write");
        temp_file.flush().expect("Failed to flush");

        let model = LPM::new()
            .train_from_file(temp_file.path())
            .expect("Training should succeed");

        let accuracy = model
            .evaluate_from_file(temp_file.path())
            .expect("Evaluation should succeed");
        assert_eq!(accuracy, 1.0);

        let predictions = model.predict_from_file(temp_file.path()).unwrap();
        assert_eq!(predictions.len(), 4);

        let model2 = quick::train_libsvm(temp_file.path()).expect("Quick training should succeed");
        assert!(model2.info().nonzero_weights > 0);
    }

    #[test]
    fn test_holdout_validation() {
        let (features, labels) = separable();
        let dataset = Pair(features, labels);

        let accuracy =
            quick::holdout_validation(&dataset, 0.7, 1.0).expect("Validation should succeed");
        assert!((0.0..=1.0).contains(&accuracy));

        assert!(quick::holdout_validation(&dataset, 1.5, 1.0).is_err());
    }

    struct Pair(SparseFeatures, Labels);

    impl FeatureStore for Pair {
        fn num_features(&self) -> usize {
            self.0.num_features()
        }
        fn num_examples(&self) -> usize {
            self.0.num_examples()
        }
        fn row(&self, index: usize) -> &SparseVector {
            self.0.row(index)
        }
    }

    impl LabelStore for Pair {
        fn label(&self, index: usize) -> f64 {
            self.1.label(index)
        }
        fn num_labels(&self) -> usize {
            self.1.num_labels()
        }
    }
}
