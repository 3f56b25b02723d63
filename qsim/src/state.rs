use num_complex::Complex;
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use serde::Serialize;
use std::collections::HashMap;

use crate::circuit::Pauli;

#[derive(Serialize, Clone, Debug)]
pub struct StateVector {
    pub num_qubits: usize,
    #[serde(rename = "amplitudes")]
    pub amplitudes: Vec<Complex<f64>>,
}

/// Maps a computational-basis index through a Pauli string.
/// Returns the target index and the accumulated phase, i.e.
/// P|index> = phase * |target>.
fn pauli_map(index: usize, ops: &[(usize, Pauli)]) -> (usize, Complex<f64>) {
    let mut target = index;
    let mut phase = Complex::new(1.0, 0.0);

    for &(qubit, pauli) in ops {
        let bit = (index >> qubit) & 1;
        match pauli {
            Pauli::I => {}
            Pauli::X => {
                target ^= 1 << qubit;
            }
            Pauli::Y => {
                target ^= 1 << qubit;
                phase *= if bit == 0 {
                    Complex::new(0.0, 1.0)
                } else {
                    Complex::new(0.0, -1.0)
                };
            }
            Pauli::Z => {
                if bit == 1 {
                    phase = -phase;
                }
            }
        }
    }

    (target, phase)
}

impl StateVector {
    pub fn new(num_qubits: usize) -> Self {
        let size = 1 << num_qubits; // 2^num_qubits
        let mut amplitudes = vec![Complex::new(0.0, 0.0); size];
        if !amplitudes.is_empty() {
            amplitudes[0] = Complex::new(1.0, 0.0);
        }
        Self {
            num_qubits,
            amplitudes,
        }
    }

    pub fn apply_single_qubit_gate(
        &mut self,
        gate_matrix: &[[Complex<f64>; 2]; 2],
        target_qubit: usize,
    ) {
        let k = 1 << target_qubit;

        for i in 0..self.amplitudes.len() {
            if (i & k) == 0 {
                let j = i | k;
                let amp_i = self.amplitudes[i];
                let amp_j = self.amplitudes[j];

                self.amplitudes[i] = gate_matrix[0][0] * amp_i + gate_matrix[0][1] * amp_j;
                self.amplitudes[j] = gate_matrix[1][0] * amp_i + gate_matrix[1][1] * amp_j;
            }
        }
    }

    pub fn apply_cx(&mut self, control_qubit: usize, target_qubit: usize) {
        let control_mask = 1 << control_qubit;
        let target_mask = 1 << target_qubit;

        for i in 0..self.amplitudes.len() {
            if (i & control_mask) != 0 && (i & target_mask) == 0 {
                let j = i | target_mask;
                self.amplitudes.swap(i, j);
            }
        }
    }

    /// Returns P|psi> for a Pauli string P, without modifying the state.
    pub fn apply_pauli(&self, ops: &[(usize, Pauli)]) -> Vec<Complex<f64>> {
        let mut mapped = vec![Complex::new(0.0, 0.0); self.amplitudes.len()];
        for (i, &amp) in self.amplitudes.iter().enumerate() {
            let (target, phase) = pauli_map(i, ops);
            mapped[target] = phase * amp;
        }
        mapped
    }

    /// Non-destructive expectation <psi|P|psi> of a Pauli string.
    pub fn expectation_pauli_string(&self, ops: &[(usize, Pauli)]) -> f64 {
        let mapped = self.apply_pauli(ops);
        let mut acc = Complex::new(0.0, 0.0);
        for (a, b) in self.amplitudes.iter().zip(mapped.iter()) {
            acc += a.conj() * b;
        }
        acc.re
    }

    /// Applies exp(-i theta/2 * P) in place. Valid for any Pauli string P
    /// because P^2 = I, so the exponential reduces to
    /// cos(theta/2) |psi> - i sin(theta/2) P|psi>.
    pub fn apply_pauli_rotation(&mut self, ops: &[(usize, Pauli)], theta: f64) {
        let mapped = self.apply_pauli(ops);
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        let minus_i_s = Complex::new(0.0, -s);

        for (amp, p_amp) in self.amplitudes.iter_mut().zip(mapped.iter()) {
            *amp = c * *amp + minus_i_s * p_amp;
        }
    }

    pub fn measure_all(&mut self, rng: &mut impl Rng) -> usize {
        let probabilities: Vec<f64> = self.amplitudes.iter().map(|a| a.norm_sqr()).collect();
        let dist =
            WeightedIndex::new(&probabilities).expect("Failed to create weighted distribution.");
        let measured_index = dist.sample(rng);

        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            *amp = if i == measured_index {
                Complex::new(1.0, 0.0)
            } else {
                Complex::new(0.0, 0.0)
            };
        }
        measured_index
    }

    /// Samples computational-basis shots without collapsing the state.
    pub fn sample_counts(&self, shots: u32, rng: &mut impl Rng) -> HashMap<String, u32> {
        let probabilities: Vec<f64> = self.amplitudes.iter().map(|a| a.norm_sqr()).collect();
        let dist =
            WeightedIndex::new(&probabilities).expect("Failed to create weighted distribution.");

        let mut counts = HashMap::new();
        let width = self.num_qubits;
        for _ in 0..shots {
            let index = dist.sample(rng);
            let bitstring = format!("{:0width$b}", index, width = width);
            *counts.entry(bitstring).or_insert(0) += 1;
        }
        counts
    }

    pub fn reset(&mut self) {
        for amp in &mut self.amplitudes {
            *amp = Complex::new(0.0, 0.0);
        }
        if !self.amplitudes.is_empty() {
            self.amplitudes[0] = Complex::new(1.0, 0.0);
        }
    }
}
