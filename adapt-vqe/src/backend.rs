use std::f64::consts::FRAC_PI_2;

use hamiltonian::QubitOperator;
use num_complex::Complex;
use qsim::{Circuit, Gate, Pauli, SimError, StatevectorSimulator};

/// Expectation-value service consumed by the ranker and the VQE objective.
///
/// From the core's point of view this is a pure function of its arguments
/// (shot-based implementations are internally stochastic). Implementations
/// must be safe to call concurrently, which is what the `Sync` bound is for.
pub trait ExpectationBackend: Sync {
    fn expectation(&self, operator: &QubitOperator, circuit: &Circuit) -> Result<f64, SimError>;
}

/// Exact statevector backend. A fresh simulator is spun up per call, so the
/// backend carries no round-to-round state.
#[derive(Debug, Default, Clone)]
pub struct SimulatorBackend;

impl SimulatorBackend {
    pub fn new() -> Self {
        SimulatorBackend
    }
}

impl ExpectationBackend for SimulatorBackend {
    fn expectation(&self, operator: &QubitOperator, circuit: &Circuit) -> Result<f64, SimError> {
        let mut sim = StatevectorSimulator::new(circuit.num_qubits);
        sim.run(circuit)?;

        let mut acc = Complex::new(0.0, 0.0);
        for (string, coeff) in operator.terms() {
            if string.is_identity() {
                acc += coeff;
            } else {
                acc += coeff * sim.expectation(string.ops())?;
            }
        }
        Ok(acc.re)
    }
}

/// Shot-noise backend: every Pauli term is rotated into the measurement
/// basis, sampled, and estimated from bitstring parities. The estimate
/// converges to the exact value as 1/sqrt(shots).
#[derive(Debug, Clone)]
pub struct ShotBackend {
    shots: u32,
}

impl ShotBackend {
    pub fn new(shots: u32) -> Self {
        ShotBackend { shots }
    }

    /// Appends the basis-change gates that map the term's X and Y factors
    /// onto Z before a computational-basis measurement.
    fn measurement_circuit(circuit: &Circuit, ops: &[(usize, Pauli)]) -> Circuit {
        let mut measured = circuit.clone();
        for &(qubit, pauli) in ops {
            match pauli {
                Pauli::X => measured.add_gate(Gate::H(qubit)),
                Pauli::Y => {
                    measured.add_gate(Gate::RZ(qubit, -FRAC_PI_2));
                    measured.add_gate(Gate::H(qubit));
                }
                Pauli::Z | Pauli::I => {}
            }
        }
        measured
    }

    fn estimate_term(&self, circuit: &Circuit, ops: &[(usize, Pauli)]) -> Result<f64, SimError> {
        for &(qubit, _) in ops {
            if qubit >= circuit.num_qubits {
                return Err(SimError::Qubit(qubit));
            }
        }
        let measured = Self::measurement_circuit(circuit, ops);
        let mut sim = StatevectorSimulator::new(measured.num_qubits);
        sim.run(&measured)?;
        let counts = sim.sample(self.shots)?;

        let width = measured.num_qubits;
        let mut acc = 0i64;
        for (bitstring, count) in &counts {
            // Bitstrings are MSB-first, so qubit q sits at position width-1-q.
            let parity = ops
                .iter()
                .filter(|&&(_, p)| p != Pauli::I)
                .filter(|&&(q, _)| bitstring.as_bytes()[width - 1 - q] == b'1')
                .count();
            let sign = if parity % 2 == 0 { 1 } else { -1 };
            acc += sign * *count as i64;
        }
        Ok(acc as f64 / self.shots as f64)
    }
}

impl ExpectationBackend for ShotBackend {
    fn expectation(&self, operator: &QubitOperator, circuit: &Circuit) -> Result<f64, SimError> {
        let mut acc = Complex::new(0.0, 0.0);
        for (string, coeff) in operator.terms() {
            if string.is_identity() {
                acc += coeff;
            } else {
                acc += coeff * self.estimate_term(circuit, string.ops())?;
            }
        }
        Ok(acc.re)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bell_circuit() -> Circuit {
        let mut circuit = Circuit::new(2);
        circuit.add_gate(Gate::H(0));
        circuit.add_gate(Gate::CX(0, 1));
        circuit
    }

    #[test]
    fn exact_backend_combines_weighted_terms() {
        // On the Bell state, <ZZ> = <XX> = 1 and single-qubit terms vanish.
        let operator: QubitOperator = "0.25 * Z0 Z1\n0.5 * X0 X1\n-1.0 * Z0\n2.0"
            .parse()
            .unwrap();

        let backend = SimulatorBackend::new();
        let energy = backend.expectation(&operator, &bell_circuit()).unwrap();
        assert!((energy - 2.75).abs() < 1e-9, "energy was {energy}");
    }

    #[test]
    fn shot_backend_agrees_with_exact_on_diagonal_terms() {
        // |11> is a Z-eigenstate, so sampling introduces no variance at all.
        let circuit = Circuit::prepare_reference(&[1, 1]);
        let operator: QubitOperator = "1.0 * Z0 Z1\n0.5 * Z0".parse().unwrap();

        let backend = ShotBackend::new(256);
        let energy = backend.expectation(&operator, &circuit).unwrap();
        assert!((energy - 0.5).abs() < 1e-9, "energy was {energy}");
    }

    #[test]
    fn both_backends_reject_out_of_range_operators() {
        // Z-only terms add no basis-rotation gates, so the qubit range has
        // to be checked explicitly before parity extraction.
        let operator: QubitOperator = "1.0 * Z5".parse().unwrap();
        let circuit = bell_circuit();

        let exact = SimulatorBackend::new().expectation(&operator, &circuit);
        assert_eq!(exact.unwrap_err(), SimError::Qubit(5));

        let sampled = ShotBackend::new(64).expectation(&operator, &circuit);
        assert_eq!(sampled.unwrap_err(), SimError::Qubit(5));
    }

    #[test]
    fn shot_backend_estimates_off_diagonal_terms() {
        let operator: QubitOperator = "1.0 * X0 X1".parse().unwrap();

        let backend = ShotBackend::new(8192);
        let energy = backend.expectation(&operator, &bell_circuit()).unwrap();
        // 8192 shots put the standard error well below 0.05.
        assert!((energy - 1.0).abs() < 0.05, "energy was {energy}");
    }
}
