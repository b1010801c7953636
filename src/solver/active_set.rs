//! Active-set bookkeeping
//!
//! Every iteration partitions the examples by their margin into violated,
//! on-margin and satisfied, and the weight coordinates into positive,
//! negative and near-zero. The smooth part of the hinge gradient,
//! `sum_i C * y_i * x_i` over violated examples, is kept in an accumulator
//! that is only touched for examples whose state changed.

use crate::core::{FeatureStore, LabelStore, Result};
use crate::solver::run::allocate;

/// Position of an example relative to the margin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExampleState {
    /// `proj > 1 + eps`, no loss
    #[default]
    Satisfied,
    /// `proj < 1 - eps`, inside the margin or misclassified
    Violated,
    /// `|proj - 1| <= eps`, on the kink of the hinge
    OnMargin,
}

/// Working-set tracker for one training run
#[derive(Debug, Clone)]
pub struct ActiveSetTracker {
    /// Classification being built by `find_active`
    current: Vec<ExampleState>,
    /// Classification of the previous round; holds the latest one after `update_active`
    previous: Vec<ExampleState>,
    changed: Vec<usize>,
    idx_active: Vec<usize>,
    idx_bound: Vec<usize>,
    w_pos: Vec<usize>,
    w_neg: Vec<usize>,
    w_zero: Vec<usize>,
    l1_sign: Vec<f64>,
    sum_cxy_active: Vec<f64>,
    sum_cy_active: f64,
    delta_active: usize,
}

impl ActiveSetTracker {
    pub fn new(num_examples: usize, num_features: usize) -> Result<Self> {
        Ok(Self {
            current: allocate("active", num_examples, ExampleState::Satisfied)?,
            previous: allocate("old_active", num_examples, ExampleState::Satisfied)?,
            changed: Vec::new(),
            idx_active: Vec::new(),
            idx_bound: Vec::new(),
            w_pos: Vec::new(),
            w_neg: Vec::new(),
            w_zero: Vec::new(),
            l1_sign: allocate("l1_sign", num_features, 0.0)?,
            sum_cxy_active: allocate("sum_CXy_active", num_features, 0.0)?,
            sum_cy_active: 0.0,
            delta_active: 0,
        })
    }

    /// Classify examples and coordinates under `work_epsilon`
    ///
    /// Returns the number of examples whose state differs from the previous
    /// round.
    pub fn find_active(&mut self, proj: &[f64], w: &[f64], work_epsilon: f64) -> usize {
        self.changed.clear();
        self.idx_active.clear();
        self.idx_bound.clear();

        for (i, &p) in proj.iter().enumerate() {
            let state = if p < 1.0 - work_epsilon {
                self.idx_active.push(i);
                ExampleState::Violated
            } else if (p - 1.0).abs() <= work_epsilon {
                self.idx_bound.push(i);
                ExampleState::OnMargin
            } else {
                ExampleState::Satisfied
            };

            self.current[i] = state;
            if state != self.previous[i] {
                self.changed.push(i);
            }
        }
        self.delta_active = self.changed.len();

        self.w_pos.clear();
        self.w_neg.clear();
        self.w_zero.clear();

        // Near-zero overlaps with negative; both take sign -1.
        for (j, &wj) in w.iter().enumerate() {
            if wj > work_epsilon {
                self.w_pos.push(j);
                self.l1_sign[j] = 1.0;
            } else if wj < work_epsilon {
                self.w_neg.push(j);
                self.l1_sign[j] = -1.0;
            }

            if wj.abs() <= work_epsilon {
                self.w_zero.push(j);
                self.l1_sign[j] = -1.0;
            }
        }

        self.delta_active
    }

    /// Fold state changes into the accumulators, then commit the new states
    pub fn update_active<F, L>(&mut self, features: &F, labels: &L, c: f64, use_bias: bool)
    where
        F: FeatureStore + ?Sized,
        L: LabelStore + ?Sized,
    {
        for &i in &self.changed {
            let now = self.current[i];
            let before = self.previous[i];
            let cy = c * labels.label(i);

            if now == ExampleState::Violated {
                features.add_scaled_to_dense(cy, i, &mut self.sum_cxy_active);
                if use_bias {
                    self.sum_cy_active += cy;
                }
            } else if before == ExampleState::Violated {
                features.add_scaled_to_dense(-cy, i, &mut self.sum_cxy_active);
                if use_bias {
                    self.sum_cy_active -= cy;
                }
            }
        }

        std::mem::swap(&mut self.current, &mut self.previous);
    }

    /// Latest committed classification of every example
    pub fn states(&self) -> &[ExampleState] {
        &self.previous
    }

    pub fn changed(&self) -> &[usize] {
        &self.changed
    }

    pub fn delta_active(&self) -> usize {
        self.delta_active
    }

    /// Violated examples
    pub fn idx_active(&self) -> &[usize] {
        &self.idx_active
    }

    /// On-margin examples
    pub fn idx_bound(&self) -> &[usize] {
        &self.idx_bound
    }

    pub fn num_active(&self) -> usize {
        self.idx_active.len()
    }

    pub fn num_bound(&self) -> usize {
        self.idx_bound.len()
    }

    pub fn w_pos(&self) -> &[usize] {
        &self.w_pos
    }

    pub fn w_neg(&self) -> &[usize] {
        &self.w_neg
    }

    pub fn w_zero(&self) -> &[usize] {
        &self.w_zero
    }

    /// Smooth-region sub-gradient of `||w||_1`
    pub fn l1_sign(&self) -> &[f64] {
        &self.l1_sign
    }

    pub fn sum_cxy_active(&self) -> &[f64] {
        &self.sum_cxy_active
    }

    pub fn sum_cy_active(&self) -> f64 {
        self.sum_cy_active
    }
}
