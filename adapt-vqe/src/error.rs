use qsim::SimError;

/// Everything that can go wrong across an ADAPT run.
///
/// Configuration and dimension problems surface before any backend call;
/// backend failures abort the current round; optimizer non-convergence is
/// deliberately NOT represented here because the best point found is still
/// accepted (see `vqe::Minimum::converged`).
#[derive(thiserror::Error, Debug)]
pub enum AdaptError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("parameter vector has length {got}, but the ansatz holds {expected} terms")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("pool operator {0} is already part of the ansatz")]
    DuplicateOperator(usize),

    #[error("pool operator {0} has a real coefficient component and cannot be exponentiated")]
    NonAntiHermitian(usize),

    #[error("backend evaluation failed: {0}")]
    Backend(#[from] SimError),

    #[error("objective returned a non-finite energy ({0})")]
    NonFiniteEnergy(f64),

    #[error("optimizer failed: {0}")]
    Optimizer(String),
}
