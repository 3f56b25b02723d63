use crate::circuit::{Circuit, Gate, Pauli};
use crate::state::StateVector;
use num_complex::Complex;
use rand::thread_rng;
use std::collections::HashMap;
use std::f64::consts::FRAC_1_SQRT_2;

/// A lightweight error enum so callers don't rely on simulator internals.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid qubit index: {0}")]
    Qubit(usize),
    #[error("Internal error: {0}")]
    Internal(String),
}

// custom type for gate matrices
pub type GateMatrix = [[Complex<f64>; 2]; 2];

pub const HADAMARD: GateMatrix = [
    [
        Complex::new(FRAC_1_SQRT_2, 0.0),
        Complex::new(FRAC_1_SQRT_2, 0.0),
    ],
    [
        Complex::new(FRAC_1_SQRT_2, 0.0),
        Complex::new(-FRAC_1_SQRT_2, 0.0),
    ],
];

pub const PAULI_X: GateMatrix = [
    [Complex::new(0.0, 0.0), Complex::new(1.0, 0.0)],
    [Complex::new(1.0, 0.0), Complex::new(0.0, 0.0)],
];

pub const PAULI_Y: GateMatrix = [
    [Complex::new(0.0, 0.0), Complex::new(0.0, -1.0)],
    [Complex::new(0.0, 1.0), Complex::new(0.0, 0.0)],
];

pub const PAULI_Z: GateMatrix = [
    [Complex::new(1.0, 0.0), Complex::new(0.0, 0.0)],
    [Complex::new(0.0, 0.0), Complex::new(-1.0, 0.0)],
];

fn rotation_matrix(gate: &Gate) -> Option<GateMatrix> {
    match *gate {
        Gate::RX(_, theta) => {
            // Rx(t) = cos(t/2) I - i sin(t/2) X
            let c = theta * 0.5;
            let (ct, st) = (c.cos(), c.sin());
            Some([
                [Complex::new(ct, 0.0), Complex::new(0.0, -st)],
                [Complex::new(0.0, -st), Complex::new(ct, 0.0)],
            ])
        }
        Gate::RY(_, theta) => {
            // Ry(t) = cos(t/2) I - i sin(t/2) Y  -> matrix is real
            let c = theta * 0.5;
            let (ct, st) = (c.cos(), c.sin());
            Some([
                [Complex::new(ct, 0.0), Complex::new(-st, 0.0)],
                [Complex::new(st, 0.0), Complex::new(ct, 0.0)],
            ])
        }
        Gate::RZ(_, theta) => {
            // Rz(t) = diag(e^{-it/2}, e^{+it/2})
            let c = theta * 0.5;
            let (ct, st) = (c.cos(), c.sin());
            Some([
                [Complex::new(ct, -st), Complex::new(0.0, 0.0)],
                [Complex::new(0.0, 0.0), Complex::new(ct, st)],
            ])
        }
        _ => None,
    }
}

/// Exact statevector simulator. Each `run` starts from |0...0> so the
/// simulator is a pure function of the circuit it is given.
pub struct StatevectorSimulator {
    num_qubits: usize,
    state: StateVector,
}

impl StatevectorSimulator {
    pub fn new(num_qubits: usize) -> Self {
        Self {
            num_qubits,
            state: StateVector::new(num_qubits),
        }
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    pub fn statevector(&self) -> &StateVector {
        &self.state
    }

    pub fn reset(&mut self, num_qubits: usize) {
        if self.num_qubits != num_qubits {
            self.num_qubits = num_qubits;
            self.state = StateVector::new(num_qubits);
        } else {
            self.state.reset();
        }
    }

    pub fn run(&mut self, circuit: &Circuit) -> Result<(), SimError> {
        self.reset(circuit.num_qubits);
        for gate in &circuit.gates {
            self.apply_gate(gate)?;
        }
        Ok(())
    }

    fn apply_gate(&mut self, gate: &Gate) -> Result<(), SimError> {
        let max_qubit = gate.max_qubit();
        if max_qubit >= self.num_qubits {
            return Err(SimError::Qubit(max_qubit));
        }

        match gate {
            Gate::H(target) => self.state.apply_single_qubit_gate(&HADAMARD, *target),
            Gate::X(target) => self.state.apply_single_qubit_gate(&PAULI_X, *target),
            Gate::Y(target) => self.state.apply_single_qubit_gate(&PAULI_Y, *target),
            Gate::Z(target) => self.state.apply_single_qubit_gate(&PAULI_Z, *target),
            Gate::CX(control, target) => {
                if control == target {
                    return Err(SimError::Internal(
                        "CX control and target must differ".to_string(),
                    ));
                }
                self.state.apply_cx(*control, *target);
            }
            Gate::PauliRot { ops, theta } => self.state.apply_pauli_rotation(ops, *theta),
            rotation => {
                let matrix = rotation_matrix(rotation).ok_or_else(|| {
                    SimError::Internal(format!("unsupported gate: {rotation:?}"))
                })?;
                self.state.apply_single_qubit_gate(&matrix, max_qubit);
            }
        }
        Ok(())
    }

    /// Non-destructive expectation <psi|P|psi> for a Pauli string.
    /// Example: [(0, Z), (2, X)] means Z on q0 and X on q2, identity elsewhere.
    pub fn expectation(&self, ops: &[(usize, Pauli)]) -> Result<f64, SimError> {
        for &(qubit, _) in ops {
            if qubit >= self.num_qubits {
                return Err(SimError::Qubit(qubit));
            }
        }
        Ok(self.state.expectation_pauli_string(ops))
    }

    /// Samples computational-basis shots from the current state without
    /// collapsing it.
    pub fn sample(&self, shots: u32) -> Result<HashMap<String, u32>, SimError> {
        if shots == 0 {
            return Err(SimError::Internal("shot count must be positive".to_string()));
        }
        Ok(self.state.sample_counts(shots, &mut thread_rng()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    fn bell_circuit() -> Circuit {
        let mut circuit = Circuit::new(2);
        circuit.add_gate(Gate::H(0));
        circuit.add_gate(Gate::CX(0, 1));
        circuit
    }

    #[test]
    fn bell_state_expectations() {
        // |Phi+> = (|00> + |11>)/sqrt(2)
        let mut sim = StatevectorSimulator::new(2);
        sim.run(&bell_circuit()).expect("run");

        // <ZZ> = +1, <XX> = +1, <Z q0> = 0, <Z q1> = 0
        let zz = sim.expectation(&[(0, Pauli::Z), (1, Pauli::Z)]).unwrap();
        let xx = sim.expectation(&[(0, Pauli::X), (1, Pauli::X)]).unwrap();
        let z0 = sim.expectation(&[(0, Pauli::Z)]).unwrap();
        let z1 = sim.expectation(&[(1, Pauli::Z)]).unwrap();

        assert!(approx_eq(zz, 1.0, 1e-9), "ZZ exp was {}", zz);
        assert!(approx_eq(xx, 1.0, 1e-9), "XX exp was {}", xx);
        assert!(approx_eq(z0, 0.0, 1e-9), "Z0 exp was {}", z0);
        assert!(approx_eq(z1, 0.0, 1e-9), "Z1 exp was {}", z1);
    }

    #[test]
    fn out_of_range_qubit_is_rejected() {
        let mut circuit = Circuit::new(1);
        circuit.add_gate(Gate::X(3));

        let mut sim = StatevectorSimulator::new(1);
        assert_eq!(sim.run(&circuit), Err(SimError::Qubit(3)));
    }

    #[test]
    fn can_reuse_simulator_with_reset() {
        let mut sim = StatevectorSimulator::new(2);
        sim.run(&bell_circuit()).unwrap();

        // Rerun on a fresh single-qubit circuit; run() resets internally.
        let mut plus = Circuit::new(1);
        plus.add_gate(Gate::H(0));
        sim.run(&plus).unwrap();

        // Expectation <X> on |+> is +1
        let ex = sim.expectation(&[(0, Pauli::X)]).unwrap();
        assert!(approx_eq(ex, 1.0, 1e-9), "<X> was {}", ex);
    }

    #[test]
    fn sampling_plus_state_is_balanced() {
        let mut plus = Circuit::new(1);
        plus.add_gate(Gate::H(0));

        let mut sim = StatevectorSimulator::new(1);
        sim.run(&plus).unwrap();

        let shots = 4000;
        let counts = sim.sample(shots).expect("sample");
        let p0 = *counts.get("0").unwrap_or(&0) as f64 / shots as f64;
        let p1 = *counts.get("1").unwrap_or(&0) as f64 / shots as f64;

        // With 4000 shots, +-0.05 is a very loose bound; this keeps the test stable.
        assert!(approx_eq(p0, 0.5, 0.05), "p(0) ~ 0.5, got {}", p0);
        assert!(approx_eq(p1, 0.5, 0.05), "p(1) ~ 0.5, got {}", p1);
    }
}
