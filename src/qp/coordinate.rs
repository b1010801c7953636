//! Projected coordinate descent for the boundary sub-problem
//!
//! Each multiplier enters the objective through a single column, so the
//! exact minimizer along one coordinate is a clipped Newton step:
//!
//! ```text
//! beta_k <- clamp(beta_k - (m_k · r) / ||m_k||^2, lower_k, upper_k)
//! r      <- r + delta * m_k
//! ```
//!
//! where `r = linear + M beta` is kept up to date. Cyclic sweeps converge
//! for this convex, separable-box problem.

use log::{debug, warn};

use crate::core::{LPMError, Result};
use crate::qp::{BoundaryQp, BoundaryQpSolver};

/// Default in-process boundary solver
#[derive(Debug, Clone)]
pub struct CoordinateDescentQp {
    /// Maximum number of full sweeps over the multipliers
    pub max_sweeps: usize,
    /// Stop once no multiplier moves the residual by more than this
    pub tolerance: f64,
}

impl Default for CoordinateDescentQp {
    fn default() -> Self {
        Self {
            max_sweeps: 10_000,
            tolerance: 1e-12,
        }
    }
}

impl CoordinateDescentQp {
    pub fn new(max_sweeps: usize, tolerance: f64) -> Self {
        Self {
            max_sweeps,
            tolerance,
        }
    }

    fn check_problem(qp: &BoundaryQp<'_>) -> Result<()> {
        let n = qp.size();
        if qp.lower.len() != n || qp.upper.len() != n {
            return Err(LPMError::SolverFailure(format!(
                "bound vectors of length {}/{} for {} multipliers",
                qp.lower.len(),
                qp.upper.len(),
                n
            )));
        }
        if let Some(k) = (0..n).find(|&k| !(qp.lower[k] <= qp.upper[k])) {
            return Err(LPMError::SolverFailure(format!(
                "infeasible box for multiplier {}: [{}, {}]",
                k, qp.lower[k], qp.upper[k]
            )));
        }
        if qp.linear.iter().any(|v| !v.is_finite()) {
            return Err(LPMError::SolverFailure(
                "non-finite linear term".to_string(),
            ));
        }
        Ok(())
    }
}

impl BoundaryQpSolver for CoordinateDescentQp {
    fn solve(&mut self, qp: &BoundaryQp<'_>) -> Result<Vec<f64>> {
        Self::check_problem(qp)?;

        let n = qp.size();
        let norms: Vec<f64> = qp.columns.iter().map(|c| c.norm_squared()).collect();

        // Start from the feasible point closest to zero
        let mut beta: Vec<f64> = (0..n)
            .map(|k| 0.0_f64.clamp(qp.lower[k], qp.upper[k]))
            .collect();
        let mut residual = qp.direction(&beta);

        for sweep in 0..self.max_sweeps {
            let mut max_change = 0.0_f64;

            for k in 0..n {
                if norms[k] == 0.0 {
                    continue;
                }
                let column = &qp.columns[k];
                let step = column.dot(&residual) / norms[k];
                let updated = (beta[k] - step).clamp(qp.lower[k], qp.upper[k]);
                let delta = updated - beta[k];
                if delta != 0.0 {
                    column.add_scaled(delta, &mut residual);
                    beta[k] = updated;
                    max_change = max_change.max(delta.abs() * norms[k].sqrt());
                }
            }

            if !max_change.is_finite() || residual.iter().any(|v| !v.is_finite()) {
                return Err(LPMError::SolverFailure(format!(
                    "numerical breakdown after {} sweeps",
                    sweep + 1
                )));
            }
            if max_change <= self.tolerance {
                debug!("boundary QP with {} multipliers solved in {} sweeps", n, sweep + 1);
                return Ok(beta);
            }
        }

        warn!(
            "boundary QP with {} multipliers stopped after {} sweeps",
            n, self.max_sweeps
        );
        Ok(beta)
    }
}
