//! Adaptive ansatz construction for variational ground-state estimation.
//!
//! The solver grows a parameterized circuit one operator at a time: each
//! round scores a fixed pool of candidate generators by the magnitude of
//! their energy gradient, adopts the steepest one, and re-optimizes every
//! parameter with a classical minimizer before the next round. The run ends
//! when the whole pool scores below tolerance (converged) or the cycle cap
//! is hit (exhausted).

pub mod ansatz;
pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod pool;
pub mod ranker;
pub mod solver;
pub mod vqe;

pub use ansatz::AdaptAnsatz;
pub use backend::{ExpectationBackend, ShotBackend, SimulatorBackend};
pub use config::AdaptConfig;
pub use error::AdaptError;
pub use pool::PoolEntry;
pub use ranker::{RankedOperator, rank_pool};
pub use solver::{AdaptSolver, AdaptStatus, AdaptSummary, Resources, RoundRecord};
pub use vqe::{LbfgsMinimizer, Minimizer, Minimum, NelderMeadMinimizer, VqeSolver};
