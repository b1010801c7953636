//! Optimization front end for sparse linear models
//!
//! This module ties a trainer to the data stores and turns a training outcome
//! into a model that can make predictions.

use crate::core::{
    FeatureStore, LPMConfig, LabelStore, LinearClassifier, Result, SparseVector,
    TrainingObserver, TrainingOutcome, TrainingState, TrainingStats,
};
use crate::qp::{BoundaryQpSolver, CoordinateDescentQp};
use crate::solver::{LoggingObserver, SubGradientLPM};

/// High-level optimizer producing `TrainedLPM` models
pub struct LPMOptimizer<S: BoundaryQpSolver = CoordinateDescentQp> {
    trainer: SubGradientLPM<S>,
}

impl LPMOptimizer<CoordinateDescentQp> {
    /// Create an optimizer with the default boundary solver
    pub fn new(config: LPMConfig) -> Self {
        Self {
            trainer: SubGradientLPM::new(config),
        }
    }
}

impl Default for LPMOptimizer<CoordinateDescentQp> {
    fn default() -> Self {
        Self::new(LPMConfig::default())
    }
}

impl<S: BoundaryQpSolver> LPMOptimizer<S> {
    /// Wrap an already configured trainer
    pub fn from_trainer(trainer: SubGradientLPM<S>) -> Self {
        Self { trainer }
    }

    /// Train with per-iteration debug logging
    pub fn train<F, L>(&mut self, features: &F, labels: &L) -> Result<TrainedLPM>
    where
        F: FeatureStore + ?Sized,
        L: LabelStore + ?Sized,
    {
        self.train_with_observer(features, labels, LoggingObserver)
    }

    /// Train, reporting each iteration to `observer`
    pub fn train_with_observer<F, L, O>(
        &mut self,
        features: &F,
        labels: &L,
        observer: O,
    ) -> Result<TrainedLPM>
    where
        F: FeatureStore + ?Sized,
        L: LabelStore + ?Sized,
        O: TrainingObserver,
    {
        let outcome = self
            .trainer
            .train_with_observer(features, labels, observer)?;
        Ok(TrainedLPM::from_outcome(outcome))
    }

    pub fn config(&self) -> &LPMConfig {
        self.trainer.config()
    }

    pub fn trainer(&self) -> &SubGradientLPM<S> {
        &self.trainer
    }

    pub fn trainer_mut(&mut self) -> &mut SubGradientLPM<S> {
        &mut self.trainer
    }
}

/// Weight vector and bias produced by a training run
#[derive(Debug, Clone)]
pub struct TrainedLPM {
    weights: Vec<f64>,
    bias: f64,
    state: TrainingState,
    stats: TrainingStats,
}

impl TrainedLPM {
    pub fn from_outcome(outcome: TrainingOutcome) -> Self {
        Self {
            weights: outcome.weights,
            bias: outcome.bias,
            state: outcome.state,
            stats: outcome.stats,
        }
    }

    /// `Converged`, or `Cancelled` when training was stopped early
    pub fn state(&self) -> TrainingState {
        self.state
    }

    pub fn stats(&self) -> &TrainingStats {
        &self.stats
    }

    /// `(index, weight)` for every weight that is exactly non-zero
    pub fn nonzero_weights(&self) -> Vec<(usize, f64)> {
        self.weights
            .iter()
            .enumerate()
            .filter(|&(_, &w)| w != 0.0)
            .map(|(j, &w)| (j, w))
            .collect()
    }

    /// Fraction of weights with `|w_j| <= tolerance`
    pub fn sparsity(&self, tolerance: f64) -> f64 {
        if self.weights.is_empty() {
            return 1.0;
        }
        let zeros = self.weights.iter().filter(|w| w.abs() <= tolerance).count();
        zeros as f64 / self.weights.len() as f64
    }
}

impl LinearClassifier for TrainedLPM {
    fn decision_function(&self, features: &SparseVector) -> f64 {
        features.dot_dense(&self.weights) + self.bias
    }

    fn weights(&self) -> &[f64] {
        &self.weights
    }

    fn bias(&self) -> f64 {
        self.bias
    }
}
