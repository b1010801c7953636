//! L1-regularized hinge-loss solver
//!
//! Minimizes `||w||_1 + C * sum_i max(0, 1 - y_i (w·x_i + bias))` with a
//! sub-gradient active-set method: the minimum-norm element of the
//! sub-differential gives the descent direction and an exact piecewise line
//! search gives the step.

pub mod active_set;
pub mod line_search;
pub mod lpm;
pub mod projection;
pub mod run;
pub mod subgradient;

pub use self::active_set::{ActiveSetTracker, ExampleState};
pub use self::line_search::{Breakpoint, LineSearch, LineSearchResult};
pub use self::lpm::{LoggingObserver, SubGradientLPM};
pub use self::projection::ProjectionCache;
pub use self::run::{check_problem, TrainingRun};
pub use self::subgradient::SubgradientReport;
