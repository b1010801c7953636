//! Per-run training state
//!
//! A `TrainingRun` owns every buffer one optimization needs, sized by the
//! number of examples and features. It is created by `TrainingRun::new`,
//! which checks every precondition before anything is allocated, and freed
//! when it goes out of scope. Its operations take `&mut self`, so one run can
//! never be driven by two callers at once.

use crate::core::{FeatureStore, LPMConfig, LPMError, LabelStore, Regularizer, Result};
use crate::qp::BoundaryQpSolver;
use crate::solver::active_set::ActiveSetTracker;
use crate::solver::line_search::{dot, LineSearch, LineSearchResult};
use crate::solver::projection::ProjectionCache;
use crate::solver::subgradient::{self, SubgradientReport};

/// `vec![value; len]` that reports allocation failure instead of aborting
pub(crate) fn allocate<T: Clone>(buffer: &'static str, len: usize, value: T) -> Result<Vec<T>> {
    let mut v = reserve(buffer, len)?;
    v.resize(len, value);
    Ok(v)
}

/// Empty vector with room for `capacity` elements
pub(crate) fn reserve<T>(buffer: &'static str, capacity: usize) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(capacity)
        .map_err(|_| LPMError::AllocationFailed {
            buffer,
            len: capacity,
        })?;
    Ok(v)
}

/// Check that a feature store and a label store describe the same examples
pub fn check_problem<F, L>(features: &F, labels: &L) -> Result<()>
where
    F: FeatureStore + ?Sized,
    L: LabelStore + ?Sized,
{
    if features.num_examples() != labels.num_labels() {
        return Err(LPMError::ExampleCountMismatch {
            features: features.num_examples(),
            labels: labels.num_labels(),
        });
    }
    if features.num_examples() == 0 {
        return Err(LPMError::EmptyDataset);
    }

    for i in 0..labels.num_labels() {
        let y = labels.label(i);
        if y != 1.0 && y != -1.0 {
            return Err(LPMError::InvalidLabel(y));
        }
    }

    let dim = features.num_features();
    for i in 0..features.num_examples() {
        if let Some(max) = features.row(i).max_index() {
            if max >= dim {
                return Err(LPMError::DimensionMismatch {
                    expected: dim,
                    actual: max + 1,
                });
            }
        }
    }
    Ok(())
}

/// Buffers and state of one optimization
pub struct TrainingRun<'a, F: ?Sized, L: ?Sized> {
    features: &'a F,
    labels: &'a L,
    config: LPMConfig,
    w: Vec<f64>,
    bias: f64,
    cache: ProjectionCache,
    tracker: ActiveSetTracker,
    grad_w: Vec<f64>,
    grad_b: f64,
    line_search: LineSearch,
    work_epsilon: f64,
}

impl<'a, F, L> TrainingRun<'a, F, L>
where
    F: FeatureStore + ?Sized,
    L: LabelStore + ?Sized,
{
    /// Validate the inputs, allocate every buffer and compute the initial margins
    ///
    /// Training starts from `w = 0`, `bias = 0`.
    pub fn new(features: &'a F, labels: &'a L, config: &LPMConfig) -> Result<Self> {
        config.validate()?;
        check_problem(features, labels)?;

        let num_examples = features.num_examples();
        let num_features = features.num_features();

        let mut cache = ProjectionCache::new(num_examples)?;
        let w = allocate("w", num_features, 0.0)?;
        cache.recompute(features, labels, &w, 0.0);

        Ok(Self {
            features,
            labels,
            config: config.clone(),
            w,
            bias: 0.0,
            cache,
            tracker: ActiveSetTracker::new(num_examples, num_features)?,
            grad_w: allocate("grad_w", num_features, 0.0)?,
            grad_b: 0.0,
            line_search: LineSearch::new(num_examples)?,
            work_epsilon: config.epsilon,
        })
    }

    /// Partition examples and coordinates; returns the number of changed examples
    pub fn find_active(&mut self) -> usize {
        self.tracker
            .find_active(self.cache.proj(), &self.w, self.work_epsilon)
    }

    /// Commit the partition into the violated-example accumulators
    pub fn update_active(&mut self) {
        self.tracker.update_active(
            self.features,
            self.labels,
            self.config.c,
            self.config.use_bias,
        );
    }

    /// Fill `grad_w`/`grad_b` with the minimum-norm sub-gradient
    pub fn compute_min_subgradient<S>(&mut self, solver: &mut S) -> Result<SubgradientReport>
    where
        S: BoundaryQpSolver + ?Sized,
    {
        subgradient::assemble(
            self.features,
            self.labels,
            &self.tracker,
            &self.w,
            &self.config,
            solver,
            &mut self.grad_w,
            &mut self.grad_b,
        )
    }

    /// Exact step along `-(grad_w, grad_b)`
    pub fn line_search(&mut self) -> LineSearchResult {
        self.line_search.search(
            &mut self.cache,
            self.features,
            self.labels,
            &self.w,
            &self.grad_w,
            self.grad_b,
            self.config.c,
            self.config.regularizer,
        )
    }

    /// `w -= alpha * grad_w`, `bias -= alpha * grad_b`, and move the margins
    ///
    /// Must follow `line_search`, which leaves the directional margins in the
    /// projection cache.
    pub fn apply_step(&mut self, alpha: f64) {
        if alpha == 0.0 {
            return;
        }
        for (wj, &gj) in self.w.iter_mut().zip(&self.grad_w) {
            *wj -= alpha * gj;
        }
        self.bias -= alpha * self.grad_b;
        self.cache.update(alpha);
    }

    /// `penalty(w) + C * sum_i max(0, 1 - proj_i)`
    pub fn objective(&self) -> f64 {
        let penalty = match self.config.regularizer {
            Regularizer::L1 => self.w.iter().map(|v| v.abs()).sum::<f64>(),
            Regularizer::L2 => 0.5 * dot(&self.w, &self.w),
        };
        penalty + self.config.c * self.hinge_loss()
    }

    /// `sum_i max(0, 1 - proj_i)`
    pub fn hinge_loss(&self) -> f64 {
        self.cache.proj().iter().map(|p| (1.0 - p).max(0.0)).sum()
    }

    /// `||grad_w||^2 + grad_b^2`
    pub fn gradient_norm_squared(&self) -> f64 {
        dot(&self.grad_w, &self.grad_w) + self.grad_b * self.grad_b
    }

    /// Fraction of coordinates classified as near-zero
    pub fn sparsity(&self) -> f64 {
        if self.w.is_empty() {
            return 1.0;
        }
        self.tracker.w_zero().len() as f64 / self.w.len() as f64
    }

    pub fn weights(&self) -> &[f64] {
        &self.w
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn grad_w(&self) -> &[f64] {
        &self.grad_w
    }

    pub fn grad_b(&self) -> f64 {
        self.grad_b
    }

    pub fn proj(&self) -> &[f64] {
        self.cache.proj()
    }

    pub fn tracker(&self) -> &ActiveSetTracker {
        &self.tracker
    }

    pub fn config(&self) -> &LPMConfig {
        &self.config
    }

    pub fn work_epsilon(&self) -> f64 {
        self.work_epsilon
    }

    /// Hand the weights and bias to the caller, releasing every other buffer
    pub fn into_solution(self) -> (Vec<f64>, f64) {
        (self.w, self.bias)
    }
}
