//! Sparse linear classification with an L1-regularized hinge loss
//!
//! Trains `f(x) = w·x + bias` by minimizing
//! `||w||_1 + C * sum_i max(0, 1 - y_i f(x_i))` with a sub-gradient
//! active-set method and an exact piecewise line search.

pub mod api;
pub mod core;
pub mod data;
pub mod optimizer;
pub mod qp;
pub mod solver;

// Re-export main types for convenience
pub use crate::api::{EvaluationMetrics, ModelInfo, TrainedModel, LPM};
pub use crate::core::error::*;
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::data::{Labels, LibSVMDataset, SparseFeatures};
pub use crate::optimizer::{LPMOptimizer, TrainedLPM};
pub use crate::qp::{BoundaryQp, BoundaryQpSolver, CoordinateDescentQp, QpColumn};
pub use crate::solver::{LoggingObserver, SubGradientLPM};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
