//! Minimum-norm sub-gradient assembly
//!
//! Away from kinks the objective is differentiable and the direction is the
//! smooth gradient `g0`. When some weights sit at zero or some examples sit
//! on the margin, each of them contributes a free multiplier:
//!
//! - near-zero coordinate `j`: `beta * e_j`, `beta` in `[-1, 1]`
//! - on-margin example `i`: `-beta * C * y_i * [x_i; 1]`, `beta` in `[0, 1]`
//!
//! and the steepest-descent direction is the shortest vector
//! `g0 + sum_k beta_k * m_k`, found by the boundary QP solver.

use std::time::Instant;

use log::debug;

use crate::core::{FeatureStore, LPMConfig, LPMError, LabelStore, Regularizer, Result};
use crate::qp::{BoundaryQp, BoundaryQpSolver, QpColumn};
use crate::solver::active_set::ActiveSetTracker;

/// What the assembler did to produce the current direction
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SubgradientReport {
    /// Multipliers in the boundary sub-problem, 0 when it was skipped
    pub boundary_size: usize,
    /// Wall time spent in the boundary solver
    pub qp_secs: f64,
}

impl SubgradientReport {
    pub fn solved_qp(&self) -> bool {
        self.boundary_size > 0
    }
}

/// Smooth gradient `g0` in gradient space (features, then bias if trained)
///
/// Coordinates in `w_zero` carry no penalty sign; their multiplier supplies it.
pub fn smooth_gradient(tracker: &ActiveSetTracker, w: &[f64], config: &LPMConfig) -> Vec<f64> {
    let num_features = w.len();
    let dim = num_features + usize::from(config.use_bias);
    let mut g0 = Vec::with_capacity(dim);

    match config.regularizer {
        Regularizer::L1 => {
            g0.extend(
                tracker
                    .l1_sign()
                    .iter()
                    .zip(tracker.sum_cxy_active())
                    .map(|(s, sum)| s - sum),
            );
            for &j in tracker.w_zero() {
                g0[j] = -tracker.sum_cxy_active()[j];
            }
        }
        Regularizer::L2 => {
            g0.extend(w.iter().zip(tracker.sum_cxy_active()).map(|(wj, sum)| wj - sum));
        }
    }

    if config.use_bias {
        g0.push(-tracker.sum_cy_active());
    }
    g0
}

/// Write the minimum-norm sub-gradient into `grad_w` and `grad_b`
#[allow(clippy::too_many_arguments)]
pub fn assemble<F, L, S>(
    features: &F,
    labels: &L,
    tracker: &ActiveSetTracker,
    w: &[f64],
    config: &LPMConfig,
    solver: &mut S,
    grad_w: &mut [f64],
    grad_b: &mut f64,
) -> Result<SubgradientReport>
where
    F: FeatureStore + ?Sized,
    L: LabelStore + ?Sized,
    S: BoundaryQpSolver + ?Sized,
{
    let num_features = w.len();
    let g0 = smooth_gradient(tracker, w, config);

    let zero_coords: &[usize] = match config.regularizer {
        Regularizer::L1 => tracker.w_zero(),
        Regularizer::L2 => &[],
    };
    let boundary_size = zero_coords.len() + tracker.num_bound();

    if boundary_size == 0 {
        write_direction(&g0, num_features, config.use_bias, grad_w, grad_b);
        return Ok(SubgradientReport::default());
    }

    let bias_slot = config.use_bias.then_some(num_features);
    let mut qp = BoundaryQp::new(g0, boundary_size.max(config.qpsize));
    for &j in zero_coords {
        qp.push(QpColumn::Coordinate(j), -1.0, 1.0);
    }
    for &i in tracker.idx_bound() {
        qp.push(
            QpColumn::Example {
                row: features.row(i),
                scale: -config.c * labels.label(i),
                bias_slot,
            },
            0.0,
            1.0,
        );
    }

    debug!(
        "boundary QP: {} coordinates, {} on-margin examples",
        zero_coords.len(),
        tracker.num_bound()
    );

    let start = Instant::now();
    let beta = solver.solve(&qp)?;
    let qp_secs = start.elapsed().as_secs_f64();

    if beta.len() != qp.size() {
        return Err(LPMError::SolverFailure(format!(
            "expected {} multipliers, solver returned {}",
            qp.size(),
            beta.len()
        )));
    }
    if beta.iter().any(|b| !b.is_finite()) {
        return Err(LPMError::SolverFailure(
            "non-finite multiplier".to_string(),
        ));
    }

    let mut direction = qp.direction(&beta);

    // An interior multiplier on a unit column means that row of the
    // minimum-norm direction is zero; drop the solver's round-off there.
    for (&j, &b) in zero_coords.iter().zip(&beta) {
        if b > -1.0 && b < 1.0 {
            direction[j] = 0.0;
        }
    }

    write_direction(&direction, num_features, config.use_bias, grad_w, grad_b);

    Ok(SubgradientReport {
        boundary_size,
        qp_secs,
    })
}

fn write_direction(
    direction: &[f64],
    num_features: usize,
    use_bias: bool,
    grad_w: &mut [f64],
    grad_b: &mut f64,
) {
    grad_w.copy_from_slice(&direction[..num_features]);
    *grad_b = if use_bias {
        direction[num_features]
    } else {
        0.0
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Labels, SparseFeatures};
    use crate::qp::{BoundaryQp, CoordinateDescentQp};
    use approx::assert_relative_eq;

    struct Failing;

    impl BoundaryQpSolver for Failing {
        fn solve(&mut self, _qp: &BoundaryQp<'_>) -> Result<Vec<f64>> {
            Err(LPMError::SolverFailure("infeasible".to_string()))
        }
    }

    struct Recording {
        sizes: Vec<usize>,
    }

    impl BoundaryQpSolver for Recording {
        fn solve(&mut self, qp: &BoundaryQp<'_>) -> Result<Vec<f64>> {
            self.sizes.push(qp.size());
            Ok(vec![0.0; qp.size()])
        }
    }

    fn tracked(
        features: &SparseFeatures,
        labels: &Labels,
        proj: &[f64],
        w: &[f64],
        config: &LPMConfig,
    ) -> ActiveSetTracker {
        let mut tracker = ActiveSetTracker::new(proj.len(), w.len()).unwrap();
        tracker.find_active(proj, w, config.epsilon);
        tracker.update_active(features, labels, config.c, config.use_bias);
        tracker
    }

    #[test]
    fn test_smooth_gradient_without_boundary() {
        let features = SparseFeatures::from_dense(&[vec![1.0, 2.0], vec![3.0, -1.0]]);
        let labels = Labels::new(vec![1.0, -1.0]).unwrap();
        let config = LPMConfig {
            c: 0.5,
            use_bias: true,
            ..LPMConfig::default()
        };
        let w = [1.0, -2.0];
        // first example violated, second satisfied
        let tracker = tracked(&features, &labels, &[0.2, 3.0], &w, &config);

        let mut grad_w = vec![0.0; 2];
        let mut grad_b = 0.0;
        let mut solver = Recording { sizes: Vec::new() };
        let report = assemble(
            &features,
            &labels,
            &tracker,
            &w,
            &config,
            &mut solver,
            &mut grad_w,
            &mut grad_b,
        )
        .unwrap();

        assert!(!report.solved_qp());
        assert!(solver.sizes.is_empty());
        // sign(w) - C * y_0 * x_0
        assert_relative_eq!(grad_w[0], 1.0 - 0.5);
        assert_relative_eq!(grad_w[1], -1.0 - 1.0);
        assert_relative_eq!(grad_b, -0.5);
    }

    #[test]
    fn test_l2_smooth_gradient() {
        let features = SparseFeatures::from_dense(&[vec![1.0, 2.0]]);
        let labels = Labels::new(vec![-1.0]).unwrap();
        let config = LPMConfig {
            regularizer: Regularizer::L2,
            ..LPMConfig::default()
        };
        let w = [0.0, 0.5];
        let tracker = tracked(&features, &labels, &[-1.0], &w, &config);

        let mut grad_w = vec![0.0; 2];
        let mut grad_b = 1.0;
        let mut solver = Recording { sizes: Vec::new() };
        assemble(
            &features,
            &labels,
            &tracker,
            &w,
            &config,
            &mut solver,
            &mut grad_w,
            &mut grad_b,
        )
        .unwrap();

        // w - C * y * x, no boundary: zero weights are smooth under L2
        assert!(solver.sizes.is_empty());
        assert_eq!(grad_w, vec![1.0, 2.5]);
        assert_eq!(grad_b, 0.0);
    }

    #[test]
    fn test_zero_weights_are_shrunk_by_their_multiplier() {
        let features = SparseFeatures::from_dense(&[vec![2.0, 0.0], vec![-2.0, 0.0]]);
        let labels = Labels::new(vec![1.0, -1.0]).unwrap();
        let config = LPMConfig::default();
        let w = [0.0, 0.0];
        let tracker = tracked(&features, &labels, &[0.0, 0.0], &w, &config);

        let mut grad_w = vec![0.0; 2];
        let mut grad_b = 0.0;
        let report = assemble(
            &features,
            &labels,
            &tracker,
            &w,
            &config,
            &mut CoordinateDescentQp::default(),
            &mut grad_w,
            &mut grad_b,
        )
        .unwrap();

        assert_eq!(report.boundary_size, 2);
        // -4 pulled back by the full [-1, 1] interval, 0 stays 0
        assert_relative_eq!(grad_w[0], -3.0, epsilon = 1e-12);
        assert_relative_eq!(grad_w[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_on_margin_example_cancels_direction() {
        // w sits exactly on the margin of the only example
        let features = SparseFeatures::from_dense(&[vec![1.0]]);
        let labels = Labels::new(vec![1.0]).unwrap();
        let config = LPMConfig {
            c: 2.0,
            ..LPMConfig::default()
        };
        let w = [1.0];
        let tracker = tracked(&features, &labels, &[1.0], &w, &config);
        assert_eq!(tracker.num_bound(), 1);

        let mut grad_w = vec![0.0];
        let mut grad_b = 0.0;
        assemble(
            &features,
            &labels,
            &tracker,
            &w,
            &config,
            &mut CoordinateDescentQp::default(),
            &mut grad_w,
            &mut grad_b,
        )
        .unwrap();

        // 1 - beta * 2 is zero at beta = 0.5: w is optimal
        assert_relative_eq!(grad_w[0], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bias_row_is_part_of_the_problem() {
        let features = SparseFeatures::from_dense(&[vec![1.0], vec![1.0]]);
        let labels = Labels::new(vec![1.0, 1.0]).unwrap();
        let config = LPMConfig {
            use_bias: true,
            ..LPMConfig::default()
        };
        let w = [0.5];
        // both examples on the margin
        let tracker = tracked(&features, &labels, &[1.0, 1.0], &w, &config);

        let mut grad_w = vec![0.0];
        let mut grad_b = 0.0;
        assemble(
            &features,
            &labels,
            &tracker,
            &w,
            &config,
            &mut CoordinateDescentQp::default(),
            &mut grad_w,
            &mut grad_b,
        )
        .unwrap();

        // [1, 0] - (b1 + b2) * [1, 1]: shortest at b1 + b2 = 0.5
        assert_relative_eq!(grad_w[0], 0.5, epsilon = 1e-9);
        assert_relative_eq!(grad_b, -0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_solver_failure_is_propagated() {
        let features = SparseFeatures::from_dense(&[vec![1.0]]);
        let labels = Labels::new(vec![1.0]).unwrap();
        let config = LPMConfig::default();
        let w = [0.0];
        let tracker = tracked(&features, &labels, &[0.0], &w, &config);

        let mut grad_w = vec![0.0];
        let mut grad_b = 0.0;
        let result = assemble(
            &features,
            &labels,
            &tracker,
            &w,
            &config,
            &mut Failing,
            &mut grad_w,
            &mut grad_b,
        );

        assert!(matches!(result, Err(LPMError::SolverFailure(_))));
    }

    #[test]
    fn test_wrong_multiplier_count_is_rejected() {
        struct Short;
        impl BoundaryQpSolver for Short {
            fn solve(&mut self, _qp: &BoundaryQp<'_>) -> Result<Vec<f64>> {
                Ok(Vec::new())
            }
        }

        let features = SparseFeatures::from_dense(&[vec![1.0]]);
        let labels = Labels::new(vec![1.0]).unwrap();
        let config = LPMConfig::default();
        let w = [0.0];
        let tracker = tracked(&features, &labels, &[0.0], &w, &config);

        let mut grad_w = vec![0.0];
        let mut grad_b = 0.0;
        let result = assemble(
            &features,
            &labels,
            &tracker,
            &w,
            &config,
            &mut Short,
            &mut grad_w,
            &mut grad_b,
        );
        assert!(matches!(result, Err(LPMError::SolverFailure(_))));
    }
}
