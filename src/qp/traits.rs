//! Boundary quadratic program and the solver interface

use crate::core::{Result, SparseVector};

/// One column `m_k` of the boundary sub-problem
///
/// Columns live in the gradient space: one row per feature, plus a trailing
/// bias row when the bias is trained.
#[derive(Debug, Clone, Copy)]
pub enum QpColumn<'a> {
    /// Unit vector on a feature coordinate
    Coordinate(usize),
    /// `scale * [row; 1]`, the bias entry only present with `bias_slot`
    Example {
        row: &'a SparseVector,
        scale: f64,
        bias_slot: Option<usize>,
    },
}

impl QpColumn<'_> {
    /// `m_k · v`
    pub fn dot(&self, v: &[f64]) -> f64 {
        match *self {
            QpColumn::Coordinate(j) => v.get(j).copied().unwrap_or(0.0),
            QpColumn::Example {
                row,
                scale,
                bias_slot,
            } => {
                let bias = bias_slot.map_or(0.0, |b| v.get(b).copied().unwrap_or(0.0));
                scale * (row.dot_dense(v) + bias)
            }
        }
    }

    /// `v += s * m_k`
    pub fn add_scaled(&self, s: f64, v: &mut [f64]) {
        match *self {
            QpColumn::Coordinate(j) => {
                if let Some(slot) = v.get_mut(j) {
                    *slot += s;
                }
            }
            QpColumn::Example {
                row,
                scale,
                bias_slot,
            } => {
                row.add_scaled_to_dense(s * scale, v);
                if let Some(b) = bias_slot {
                    if let Some(slot) = v.get_mut(b) {
                        *slot += s * scale;
                    }
                }
            }
        }
    }

    /// `||m_k||^2`
    pub fn norm_squared(&self) -> f64 {
        match *self {
            QpColumn::Coordinate(_) => 1.0,
            QpColumn::Example {
                row,
                scale,
                bias_slot,
            } => {
                let bias = if bias_slot.is_some() { 1.0 } else { 0.0 };
                scale * scale * (row.norm_squared() + bias)
            }
        }
    }
}

/// Box-constrained quadratic program over the boundary multipliers
///
/// ```text
/// minimize    0.5 * ||d||^2
/// subject to  d = linear + sum_k beta_k * m_k
///             lower_k <= beta_k <= upper_k
/// ```
#[derive(Debug, Clone)]
pub struct BoundaryQp<'a> {
    /// Smooth part of the gradient; its length is the gradient dimension
    pub linear: Vec<f64>,
    pub columns: Vec<QpColumn<'a>>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl<'a> BoundaryQp<'a> {
    pub fn new(linear: Vec<f64>, capacity: usize) -> Self {
        Self {
            linear,
            columns: Vec::with_capacity(capacity),
            lower: Vec::with_capacity(capacity),
            upper: Vec::with_capacity(capacity),
        }
    }

    /// Append a multiplier with its box
    pub fn push(&mut self, column: QpColumn<'a>, lower: f64, upper: f64) {
        self.columns.push(column);
        self.lower.push(lower);
        self.upper.push(upper);
    }

    /// Number of multipliers
    pub fn size(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// `linear + sum_k beta_k * m_k`
    pub fn direction(&self, beta: &[f64]) -> Vec<f64> {
        let mut d = self.linear.clone();
        for (column, &b) in self.columns.iter().zip(beta) {
            if b != 0.0 {
                column.add_scaled(b, &mut d);
            }
        }
        d
    }
}

/// Capability to solve a boundary sub-problem
///
/// Implementations are held by the trainer for a whole run and are called at
/// most once per iteration.
pub trait BoundaryQpSolver {
    /// Return multipliers `beta` with `beta.len() == qp.size()`
    ///
    /// Fails with `LPMError::SolverFailure` on infeasible boxes or
    /// numerical breakdown.
    fn solve(&mut self, qp: &BoundaryQp<'_>) -> Result<Vec<f64>>;
}
