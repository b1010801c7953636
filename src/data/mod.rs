//! Data loading and in-memory feature/label stores
//!
//! This module provides the `FeatureStore` and `LabelStore` implementations
//! the trainer consumes, plus a loader for the libsvm text format.

pub mod libsvm;
pub mod sparse;

pub use self::libsvm::*;
pub use self::sparse::*;
