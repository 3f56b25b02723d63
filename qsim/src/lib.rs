pub mod circuit;
pub mod simulator;
pub mod state;

// Re-export key components for easier access from dependent crates.
pub use circuit::{Circuit, Gate, Pauli};
pub use simulator::{SimError, StatevectorSimulator};
pub use state::StateVector;
