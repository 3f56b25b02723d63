use std::sync::Arc;

use hamiltonian::QubitOperator;
use qsim::{Circuit, Gate};

use crate::error::AdaptError;

/// One operator adopted into the ansatz, remembering which pool slot it
/// came from.
#[derive(Debug, Clone)]
pub struct AnsatzTerm {
    pub pool_index: usize,
    pub operator: Arc<QubitOperator>,
}

/// Where a term's rotation gates sit in the compiled circuit, and the factor
/// that maps the term's parameter onto each gate angle.
#[derive(Debug, Clone)]
struct GateSlot {
    gate: usize,
    scale: f64,
}

#[derive(Debug, Clone)]
struct BuiltCircuit {
    circuit: Circuit,
    slots: Vec<Vec<GateSlot>>,
    version: u64,
}

/// The adaptively grown circuit: a fixed reference-state preparation followed
/// by one parameterized block per adopted operator, in adoption order.
///
/// Each anti-Hermitian generator `A = sum_k (i g_k) P_k` becomes the product
/// of Pauli rotations `exp(-i phi_k/2 P_k)` with `phi_k = -2 g_k theta`, so a
/// parameter of zero leaves the state untouched. Compiled circuits are cached
/// and re-angled in place as long as the term list has not changed.
#[derive(Debug, Clone)]
pub struct AdaptAnsatz {
    reference: Circuit,
    terms: Vec<AnsatzTerm>,
    allow_duplicates: bool,
    version: u64,
    built: Option<BuiltCircuit>,
}

impl AdaptAnsatz {
    pub fn new(reference: Circuit, allow_duplicates: bool) -> Self {
        AdaptAnsatz {
            reference,
            terms: Vec::new(),
            allow_duplicates,
            version: 0,
            built: None,
        }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[AnsatzTerm] {
        &self.terms
    }

    pub fn num_qubits(&self) -> usize {
        self.reference.num_qubits
    }

    pub fn contains(&self, pool_index: usize) -> bool {
        self.terms.iter().any(|t| t.pool_index == pool_index)
    }

    /// Appends an operator and returns the new term count. The caller grows
    /// its parameter vector to match.
    pub fn add_operator(
        &mut self,
        pool_index: usize,
        operator: Arc<QubitOperator>,
    ) -> Result<usize, AdaptError> {
        if !self.allow_duplicates && self.contains(pool_index) {
            return Err(AdaptError::DuplicateOperator(pool_index));
        }
        if !operator.is_anti_hermitian() {
            return Err(AdaptError::NonAntiHermitian(pool_index));
        }
        self.terms.push(AnsatzTerm {
            pool_index,
            operator,
        });
        self.version += 1;
        Ok(self.terms.len())
    }

    fn check_len(&self, got: usize) -> Result<(), AdaptError> {
        if got != self.terms.len() {
            return Err(AdaptError::DimensionMismatch {
                expected: self.terms.len(),
                got,
            });
        }
        Ok(())
    }

    /// Compiles the circuit from scratch for the given parameters.
    pub fn build_circuit(&mut self, parameters: &[f64]) -> Result<&Circuit, AdaptError> {
        self.check_len(parameters.len())?;

        let mut circuit = self.reference.clone();
        let mut slots = Vec::with_capacity(self.terms.len());
        for (term, &value) in self.terms.iter().zip(parameters) {
            let mut term_slots = Vec::new();
            for (string, coeff) in term.operator.terms() {
                if string.is_identity() {
                    continue;
                }
                let scale = -2.0 * coeff.im;
                term_slots.push(GateSlot {
                    gate: circuit.gates.len(),
                    scale,
                });
                circuit.add_gate(Gate::PauliRot {
                    ops: string.ops().to_vec(),
                    theta: scale * value,
                });
            }
            slots.push(term_slots);
        }

        let built = self.built.insert(BuiltCircuit {
            circuit,
            slots,
            version: self.version,
        });
        Ok(&built.circuit)
    }

    /// Returns the circuit for the given parameters, rewriting cached gate
    /// angles in place when the term list is unchanged since the last build.
    pub fn update_parameters(&mut self, parameters: &[f64]) -> Result<&Circuit, AdaptError> {
        self.check_len(parameters.len())?;

        match self.built.take() {
            Some(mut built) if built.version == self.version => {
                for (term_slots, &value) in built.slots.iter().zip(parameters) {
                    for slot in term_slots {
                        if let Gate::PauliRot { theta, .. } = &mut built.circuit.gates[slot.gate] {
                            *theta = slot.scale * value;
                        }
                    }
                }
                let built = self.built.insert(built);
                Ok(&built.circuit)
            }
            _ => self.build_circuit(parameters),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(text: &str) -> Arc<QubitOperator> {
        Arc::new(text.parse().unwrap())
    }

    #[test]
    fn duplicate_operators_are_rejected_by_default() {
        let mut ansatz = AdaptAnsatz::new(Circuit::prepare_reference(&[1, 0]), false);
        assert_eq!(ansatz.add_operator(3, generator("1i * Y0 X1")).unwrap(), 1);

        let err = ansatz.add_operator(3, generator("1i * Y0 X1")).unwrap_err();
        assert!(matches!(err, AdaptError::DuplicateOperator(3)));

        let mut permissive = AdaptAnsatz::new(Circuit::prepare_reference(&[1, 0]), true);
        permissive.add_operator(3, generator("1i * Y0 X1")).unwrap();
        assert_eq!(permissive.add_operator(3, generator("1i * Y0 X1")).unwrap(), 2);
    }

    #[test]
    fn generators_with_real_components_are_rejected() {
        let mut ansatz = AdaptAnsatz::new(Circuit::prepare_reference(&[1, 0]), false);

        let err = ansatz.add_operator(0, generator("0.5 * X0 X1")).unwrap_err();
        assert!(matches!(err, AdaptError::NonAntiHermitian(0)));

        let err = ansatz
            .add_operator(1, generator("1i * Y0\n0.3 * Z0"))
            .unwrap_err();
        assert!(matches!(err, AdaptError::NonAntiHermitian(1)));
        assert!(ansatz.is_empty());
    }

    #[test]
    fn zero_parameters_compile_to_zero_angles() {
        let mut ansatz = AdaptAnsatz::new(Circuit::prepare_reference(&[1, 0]), false);
        ansatz.add_operator(0, generator("1i * Y0 X1")).unwrap();

        let circuit = ansatz.build_circuit(&[0.0]).unwrap().clone();
        assert_eq!(circuit.gates.len(), 2);
        match &circuit.gates[1] {
            Gate::PauliRot { theta, .. } => assert_eq!(*theta, 0.0),
            other => panic!("expected a Pauli rotation, got {other:?}"),
        }
    }

    #[test]
    fn parameter_update_matches_a_fresh_build() {
        let mut ansatz = AdaptAnsatz::new(Circuit::prepare_reference(&[1, 0]), false);
        ansatz.add_operator(0, generator("0.5i * Y0 X1")).unwrap();
        ansatz.add_operator(1, generator("1i * X0 Y1")).unwrap();

        ansatz.update_parameters(&[0.1, 0.2]).unwrap();
        let updated = ansatz.update_parameters(&[0.3, -0.4]).unwrap().clone();

        let mut fresh = AdaptAnsatz::new(Circuit::prepare_reference(&[1, 0]), false);
        fresh.add_operator(0, generator("0.5i * Y0 X1")).unwrap();
        fresh.add_operator(1, generator("1i * X0 Y1")).unwrap();
        let rebuilt = fresh.build_circuit(&[0.3, -0.4]).unwrap();

        assert_eq!(&updated, rebuilt);
    }

    #[test]
    fn wrong_parameter_count_is_a_dimension_error() {
        let mut ansatz = AdaptAnsatz::new(Circuit::prepare_reference(&[1, 0]), false);
        ansatz.add_operator(0, generator("1i * Y0 X1")).unwrap();

        let err = ansatz.update_parameters(&[0.1, 0.2]).unwrap_err();
        assert!(matches!(
            err,
            AdaptError::DimensionMismatch { expected: 1, got: 2 }
        ));
    }
}
