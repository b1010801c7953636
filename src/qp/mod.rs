//! Boundary quadratic sub-problem
//!
//! At non-differentiable points the steepest-descent direction is the
//! minimum-norm element of the sub-differential. Finding it is a small
//! box-constrained QP, which the trainer hands to a `BoundaryQpSolver`.

pub mod coordinate;
pub mod traits;

pub use self::coordinate::*;
pub use self::traits::*;
