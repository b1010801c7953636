//! Sub-gradient active-set trainer
//!
//! Drives a `TrainingRun` until the optimality test passes or the
//! cancellation flag is raised. Each iteration:
//!
//! 1. partitions examples and coordinates and updates the accumulators
//! 2. assembles the minimum-norm sub-gradient, solving the boundary QP if needed
//! 3. finds the exact step along it
//! 4. checks optimality and stagnation
//! 5. applies the step

use std::time::Instant;

use chrono::Utc;
use log::{debug, info};

use crate::core::{
    CancellationFlag, FeatureStore, IterationProgress, LPMConfig, LabelStore, Result,
    TrainingObserver, TrainingOutcome, TrainingState, TrainingStats,
};
use crate::qp::{BoundaryQpSolver, CoordinateDescentQp};
use crate::solver::run::TrainingRun;

/// Non-improving iterations after which optimality is checked regardless of
/// the boundary size
const MAX_NO_IMPROVEMENT: usize = 10;

/// Bound on `alpha * ||grad||^2` for the optimality test
const STEP_TOLERANCE: f64 = 1e-6;

/// L1-regularized hinge-loss trainer
pub struct SubGradientLPM<S: BoundaryQpSolver = CoordinateDescentQp> {
    config: LPMConfig,
    solver: S,
    cancel: CancellationFlag,
}

impl SubGradientLPM<CoordinateDescentQp> {
    /// Create a trainer with the default boundary solver
    pub fn new(config: LPMConfig) -> Self {
        Self::with_solver(config, CoordinateDescentQp::default())
    }
}

impl<S: BoundaryQpSolver> SubGradientLPM<S> {
    /// Create a trainer with a caller-supplied boundary solver
    pub fn with_solver(config: LPMConfig, solver: S) -> Self {
        Self {
            config,
            solver,
            cancel: CancellationFlag::new(),
        }
    }

    /// Share an existing cancellation flag
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle that stops a running `train` at the start of its next iteration
    pub fn cancellation_flag(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    pub fn config(&self) -> &LPMConfig {
        &self.config
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Train from `w = 0`, `bias = 0`
    pub fn train<F, L>(&mut self, features: &F, labels: &L) -> Result<TrainingOutcome>
    where
        F: FeatureStore + ?Sized,
        L: LabelStore + ?Sized,
    {
        self.train_with_observer(features, labels, |_: &IterationProgress| {})
    }

    /// Train, reporting every iteration to `observer`
    ///
    /// Cancellation and running into the iteration budget of a caller are not
    /// errors: the outcome carries `TrainingState::Cancelled` and the weights
    /// reached so far.
    pub fn train_with_observer<F, L, O>(
        &mut self,
        features: &F,
        labels: &L,
        mut observer: O,
    ) -> Result<TrainingOutcome>
    where
        F: FeatureStore + ?Sized,
        L: LabelStore + ?Sized,
        O: TrainingObserver,
    {
        let started_at = Utc::now();
        let start = Instant::now();

        let mut run = TrainingRun::new(features, labels, &self.config)?;
        info!(
            "training on {} examples with {} features (C={}, epsilon={}, bias={}, {:?})",
            features.num_examples(),
            features.num_features(),
            self.config.c,
            self.config.epsilon,
            self.config.use_bias,
            self.config.regularizer
        );

        let epsilon = self.config.epsilon;
        let mut iteration = 0;
        let mut alpha = 0.0;
        let mut dir_deriv = 0.0;
        let mut num_it_noimprovement = 0;
        let mut last_it_noimprovement = None;
        let mut loop_secs = 0.0;
        let mut sparsity_sum = 0.0;
        let mut partitions = 0;
        let mut qp_calls = 0;
        let mut qp_secs = 0.0;

        let state = loop {
            if self.cancel.is_cancelled() {
                break TrainingState::Cancelled;
            }
            let loop_start = Instant::now();

            let delta_active = run.find_active();
            run.update_active();
            sparsity_sum += run.sparsity();
            partitions += 1;

            observer.on_iteration(&IterationProgress {
                iteration,
                objective: run.objective(),
                alpha,
                dir_deriv,
                num_active: run.tracker().num_active(),
                num_bound: run.tracker().num_bound(),
                delta_active,
                work_epsilon: run.work_epsilon(),
                epsilon,
                loop_secs,
                elapsed_secs: start.elapsed().as_secs_f64(),
            });

            let report = run.compute_min_subgradient(&mut self.solver)?;
            if report.solved_qp() {
                qp_calls += 1;
                qp_secs += report.qp_secs;
            }

            let step = run.line_search();
            alpha = step.alpha;
            dir_deriv = step.dir_deriv;

            let num_bound = run.tracker().num_bound();
            let settled = run.work_epsilon() <= epsilon && delta_active == 0;

            if num_it_noimprovement == MAX_NO_IMPROVEMENT || num_bound < self.config.qpsize_max {
                let step_size = alpha * run.gradient_norm_squared();
                debug!(
                    "optimality check at iteration {}: delta_active={}, alpha*|grad|^2={:e}",
                    iteration, delta_active, step_size
                );
                if settled && step_size < STEP_TOLERANCE {
                    break TrainingState::Converged;
                }
                num_it_noimprovement = 0;
            }

            if (dir_deriv >= 0.0 || alpha == 0.0) && settled {
                if iteration > 0 && last_it_noimprovement == Some(iteration - 1) {
                    num_it_noimprovement += 1;
                } else {
                    num_it_noimprovement = 0;
                }
                last_it_noimprovement = Some(iteration);
            }

            run.apply_step(alpha);
            iteration += 1;
            loop_secs = loop_start.elapsed().as_secs_f64();
        };

        let objective = run.objective();
        let stats = TrainingStats {
            iterations: iteration,
            objective,
            alpha,
            dir_deriv,
            num_active: run.tracker().num_active(),
            num_bound: run.tracker().num_bound(),
            work_epsilon: run.work_epsilon(),
            sparsity: if partitions == 0 {
                0.0
            } else {
                sparsity_sum / partitions as f64
            },
            qp_calls,
            qp_secs,
            elapsed_secs: start.elapsed().as_secs_f64(),
            started_at,
        };

        info!(
            "training {:?} after {} iterations, objective {:.6}, {:.3}s",
            state, stats.iterations, objective, stats.elapsed_secs
        );

        let (weights, bias) = run.into_solution();
        Ok(TrainingOutcome {
            state,
            weights,
            bias,
            stats,
        })
    }
}

/// Observer that writes one log line per iteration
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

impl TrainingObserver for LoggingObserver {
    fn on_iteration(&mut self, p: &IterationProgress) {
        debug!(
            "iter {:>5} obj {:.8} alpha {:.3e} dir_deriv {:.3e} active {} bound {} delta {} eps {:.1e}/{:.1e} {:.3}s",
            p.iteration,
            p.objective,
            p.alpha,
            p.dir_deriv,
            p.num_active,
            p.num_bound,
            p.delta_active,
            p.work_epsilon,
            p.epsilon,
            p.loop_secs
        );
    }
}
