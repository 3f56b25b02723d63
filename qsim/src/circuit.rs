use serde::{Deserialize, Serialize};

/// Single-qubit Pauli operator label.
///
/// The ordering and hashing derives exist so that Pauli strings can be used
/// as canonical map keys by operator-algebra crates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Pauli {
    I,
    X,
    Y,
    Z,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Gate {
    H(usize),
    X(usize),
    Y(usize),
    Z(usize),
    CX(usize, usize),
    RX(usize, f64),
    RY(usize, f64),
    RZ(usize, f64),
    /// exp(-i theta/2 * P) for a multi-qubit Pauli string P.
    /// `ops` holds one (qubit, Pauli) pair per acted-on qubit.
    PauliRot { ops: Vec<(usize, Pauli)>, theta: f64 },
}

impl Gate {
    /// Largest qubit index touched by this gate.
    pub fn max_qubit(&self) -> usize {
        match self {
            Gate::H(q) | Gate::X(q) | Gate::Y(q) | Gate::Z(q) => *q,
            Gate::RX(q, _) | Gate::RY(q, _) | Gate::RZ(q, _) => *q,
            Gate::CX(c, t) => (*c).max(*t),
            Gate::PauliRot { ops, .. } => ops.iter().map(|&(q, _)| q).max().unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    pub num_qubits: usize,
    pub gates: Vec<Gate>,
}

impl Circuit {
    pub fn new(num_qubits: usize) -> Self {
        Self {
            num_qubits,
            gates: Vec::new(),
        }
    }

    pub fn add_gate(&mut self, gate: Gate) {
        self.gates.push(gate);
    }

    /// Builds a reference-state preparation circuit from an occupation vector,
    /// e.g. `[1, 0]` flips qubit 0 so the prepared state is |q1 q0> = |01>.
    pub fn prepare_reference(occupations: &[u8]) -> Self {
        let mut circuit = Circuit::new(occupations.len());
        for (i, &occupied) in occupations.iter().enumerate() {
            if occupied == 1 {
                circuit.add_gate(Gate::X(i));
            }
        }
        circuit
    }
}
