//! Exact line search along the negative sub-gradient
//!
//! Restricted to the ray `w - alpha * d`, the objective is convex and
//! piecewise quadratic. Its derivative is
//!
//! ```text
//! phi'(alpha) = 2 * A0 * alpha + B0 + sum_B(alpha)
//! ```
//!
//! where `sum_B` is a step function that jumps up by a known amount at every
//! breakpoint: an example crossing the margin, or (for the L1 penalty) a
//! weight crossing zero. Walking the sorted breakpoints finds the root
//! without any iterative tolerance.

use crate::core::{FeatureStore, LabelStore, Regularizer, Result};
use crate::solver::projection::ProjectionCache;
use crate::solver::run::reserve;

/// Step length at which the slope of the restricted objective increases
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    pub position: f64,
    /// Non-negative increase of the slope
    pub jump: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSearchResult {
    /// Step length, never negative
    pub alpha: f64,
    /// `phi'(0+)`; negative for a descent direction
    pub dir_deriv: f64,
}

#[derive(Debug, Clone)]
pub struct LineSearch {
    breakpoints: Vec<Breakpoint>,
}

impl LineSearch {
    pub fn new(capacity: usize) -> Result<Self> {
        Ok(Self {
            breakpoints: reserve("hinge_point", capacity)?,
        })
    }

    pub fn clear(&mut self) {
        self.breakpoints.clear();
    }

    pub fn push(&mut self, position: f64, jump: f64) {
        self.breakpoints.push(Breakpoint { position, jump });
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    /// Minimize over `alpha >= 0` given the breakpoints pushed so far
    ///
    /// `base_slope` is the value of `sum_B` left of every breakpoint.
    pub fn minimize(&mut self, a0: f64, b0: f64, base_slope: f64) -> LineSearchResult {
        self.breakpoints.sort_by(|a, b| a.position.total_cmp(&b.position));

        let derivative = |alpha: f64, sum_b: f64| 2.0 * a0 * alpha + b0 + sum_b;

        // Breakpoints at or behind the origin are already crossed
        let crossed = self.breakpoints.partition_point(|bp| bp.position <= 0.0);
        let mut sum_b = base_slope
            + self.breakpoints[..crossed]
                .iter()
                .map(|bp| bp.jump)
                .sum::<f64>();

        let dir_deriv = derivative(0.0, sum_b);
        if dir_deriv >= 0.0 {
            return LineSearchResult {
                alpha: 0.0,
                dir_deriv,
            };
        }

        let mut old_alpha = 0.0;
        let mut old_grad_val = dir_deriv;

        for bp in &self.breakpoints[crossed..] {
            let grad_val = derivative(bp.position, sum_b);

            if grad_val >= 0.0 {
                // Root inside (old_alpha, bp.position]
                let denom = old_grad_val - grad_val;
                let alpha = if denom == 0.0 {
                    old_alpha
                } else {
                    let gamma = -grad_val / denom;
                    old_alpha * gamma + (1.0 - gamma) * bp.position
                };
                return LineSearchResult { alpha, dir_deriv };
            }

            sum_b += bp.jump;
            let right = grad_val + bp.jump;
            if right >= 0.0 {
                return LineSearchResult {
                    alpha: bp.position,
                    dir_deriv,
                };
            }

            old_alpha = bp.position;
            old_grad_val = right;
        }

        let alpha = if a0 > 0.0 {
            -(b0 + sum_b) / (2.0 * a0)
        } else {
            old_alpha
        };
        LineSearchResult { alpha, dir_deriv }
    }

    /// Exact step along `-(grad_w, grad_b)` for the training objective
    ///
    /// Fills `cache.grad_proj()` with the directional margins as a side effect.
    #[allow(clippy::too_many_arguments)]
    pub fn search<F, L>(
        &mut self,
        cache: &mut ProjectionCache,
        features: &F,
        labels: &L,
        w: &[f64],
        grad_w: &[f64],
        grad_b: f64,
        c: f64,
        regularizer: Regularizer,
    ) -> LineSearchResult
    where
        F: FeatureStore + ?Sized,
        L: LabelStore + ?Sized,
    {
        cache.project_direction(features, labels, grad_w, grad_b);
        self.clear();

        let mut base_slope = 0.0;
        for (&p, &gp) in cache.proj().iter().zip(cache.grad_proj()) {
            if gp != 0.0 {
                self.push((p - 1.0) / gp, c * gp.abs());
                if gp < 0.0 {
                    base_slope += c * gp;
                }
            }
        }

        let (a0, b0) = match regularizer {
            Regularizer::L1 => {
                for (&wj, &gj) in w.iter().zip(grad_w) {
                    if gj != 0.0 {
                        self.push(wj / gj, 2.0 * gj.abs());
                        base_slope -= gj.abs();
                    }
                }
                (0.0, 0.0)
            }
            Regularizer::L2 => (0.5 * dot(grad_w, grad_w), -dot(w, grad_w)),
        };

        self.minimize(a0, b0, base_slope)
    }
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
