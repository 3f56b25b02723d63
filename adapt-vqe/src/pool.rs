use std::sync::Arc;

use hamiltonian::{QubitOperator, commutator};

/// One candidate excitation operator together with its precomputed
/// commutator with the Hamiltonian, `[H, A]`, whose expectation value is the
/// energy gradient with respect to a hypothetical new parameter on `A`.
///
/// Entries are shared by reference: the ansatz holds `Arc` clones of the
/// operators it selects, never copies. The pool itself must stay fixed for
/// the whole run — ranking relies on stable indices.
#[derive(Debug, Clone)]
pub struct PoolEntry {
    pub operator: Arc<QubitOperator>,
    pub commutator: Arc<QubitOperator>,
}

impl PoolEntry {
    pub fn new(operator: QubitOperator, commutator: QubitOperator) -> Self {
        PoolEntry {
            operator: Arc::new(operator),
            commutator: Arc::new(commutator),
        }
    }

    /// Builds an entry from a bare generator, computing the gradient probe
    /// `[H, A]` symbolically. Useful for callers whose pool source provides
    /// generators only.
    pub fn from_generator(hamiltonian: &QubitOperator, generator: QubitOperator) -> Self {
        let probe = commutator(hamiltonian, &generator);
        PoolEntry::new(generator, probe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_generator_precomputes_the_probe() {
        let h: QubitOperator = "1.0 * Z0".parse().unwrap();
        let a: QubitOperator = "1i * X0".parse().unwrap();

        let entry = PoolEntry::from_generator(&h, a);
        // [Z0, i X0] = 2i * i Y0 = -2 Y0
        let expected: QubitOperator = "-2 * Y0".parse().unwrap();
        assert_eq!(*entry.commutator, expected);
    }
}
