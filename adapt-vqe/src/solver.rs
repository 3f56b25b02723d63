use std::collections::HashSet;
use std::sync::Arc;

use hamiltonian::QubitOperator;
use qsim::Circuit;
use serde::Serialize;
use tracing::{debug, info};

use crate::ansatz::AdaptAnsatz;
use crate::backend::ExpectationBackend;
use crate::config::AdaptConfig;
use crate::error::AdaptError;
use crate::pool::PoolEntry;
use crate::ranker::rank_pool;
use crate::vqe::{LbfgsMinimizer, Minimizer, VqeSolver};

/// How a run ended. `Converged` means the whole pool scored below tolerance;
/// `Exhausted` means the cycle cap was reached with gradients still large.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AdaptStatus {
    Converged,
    Exhausted,
}

/// One completed growth round.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRecord {
    pub iteration: usize,
    pub selected_operator: usize,
    pub gradient: f64,
    pub parameter_count: usize,
    pub energy: f64,
    pub parameters: Vec<f64>,
}

/// Work counters accumulated over a run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resources {
    pub pool_size: usize,
    /// Gradient scores computed across all ranking passes. Excluded
    /// operators are skipped, not scored.
    pub pool_evaluations: u64,
    /// Energy evaluations requested by the classical optimizer.
    pub objective_evaluations: u64,
    /// Total expectation-value calls issued to the backend.
    pub backend_calls: u64,
}

/// Final report of a run: terminal status, best energy and parameters, the
/// per-round history and the compiled circuit at the final parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptSummary {
    pub status: AdaptStatus,
    pub reference_energy: f64,
    pub energy: f64,
    pub parameters: Vec<f64>,
    pub history: Vec<RoundRecord>,
    pub circuit: Circuit,
    pub resources: Resources,
}

/// The adaptive ansatz-growth loop: rank the pool, adopt the steepest
/// operator, re-optimize every parameter, repeat.
pub struct AdaptSolver<B: ExpectationBackend> {
    hamiltonian: QubitOperator,
    pool: Vec<PoolEntry>,
    reference: Circuit,
    backend: B,
    config: AdaptConfig,
    minimizer: Box<dyn Minimizer>,
}

impl<B: ExpectationBackend> AdaptSolver<B> {
    /// Validates the problem up front so a misconfigured run fails before the
    /// first backend call.
    pub fn new(
        hamiltonian: QubitOperator,
        pool: Vec<PoolEntry>,
        reference: Circuit,
        backend: B,
        config: AdaptConfig,
    ) -> Result<Self, AdaptError> {
        config.validate()?;
        if hamiltonian.is_empty() {
            return Err(AdaptError::Config("hamiltonian has no terms".to_string()));
        }
        if pool.is_empty() {
            return Err(AdaptError::Config("operator pool is empty".to_string()));
        }
        if hamiltonian.num_qubits() > reference.num_qubits {
            return Err(AdaptError::Config(format!(
                "hamiltonian acts on {} qubits but the reference state has {}",
                hamiltonian.num_qubits(),
                reference.num_qubits
            )));
        }
        for (index, entry) in pool.iter().enumerate() {
            if entry.operator.num_qubits() > reference.num_qubits {
                return Err(AdaptError::Config(format!(
                    "pool operator {index} acts on {} qubits but the reference state has {}",
                    entry.operator.num_qubits(),
                    reference.num_qubits
                )));
            }
            if entry.commutator.num_qubits() > reference.num_qubits {
                return Err(AdaptError::Config(format!(
                    "gradient probe {index} acts on {} qubits but the reference state has {}",
                    entry.commutator.num_qubits(),
                    reference.num_qubits
                )));
            }
            if !entry.operator.is_anti_hermitian() {
                return Err(AdaptError::NonAntiHermitian(index));
            }
        }
        Ok(AdaptSolver {
            hamiltonian,
            pool,
            reference,
            backend,
            config,
            minimizer: Box::new(LbfgsMinimizer::default()),
        })
    }

    pub fn with_minimizer(mut self, minimizer: Box<dyn Minimizer>) -> Self {
        self.minimizer = minimizer;
        self
    }

    pub fn run(&self) -> Result<AdaptSummary, AdaptError> {
        let mut ansatz = AdaptAnsatz::new(self.reference.clone(), self.config.allow_duplicates);
        let mut parameters: Vec<f64> = Vec::new();
        let mut history: Vec<RoundRecord> = Vec::new();
        let mut resources = Resources {
            pool_size: self.pool.len(),
            ..Resources::default()
        };

        let vqe = VqeSolver {
            hamiltonian: &self.hamiltonian,
            backend: &self.backend,
            minimizer: self.minimizer.as_ref(),
        };

        let start = vqe.minimize_energy(&mut ansatz, &[])?;
        let reference_energy = start.energy;
        let mut energy = reference_energy;
        resources.objective_evaluations += start.evaluations;
        resources.backend_calls += start.evaluations;
        info!(energy = reference_energy, "reference state energy");

        let mut status = None;
        while history.len() < self.config.max_cycles {
            let circuit = ansatz.update_parameters(&parameters)?.clone();

            let excluded: HashSet<usize> = if self.config.allow_duplicates {
                HashSet::new()
            } else {
                ansatz.terms().iter().map(|t| t.pool_index).collect()
            };
            let scored = (self.pool.len() - excluded.len()) as u64;
            resources.pool_evaluations += scored;
            resources.backend_calls += scored;

            let ranked = rank_pool(
                &self.pool,
                &circuit,
                &self.backend,
                self.config.tolerance,
                &excluded,
                self.config.ranker_workers,
            )?;
            let Some(winner) = ranked else {
                status = Some(AdaptStatus::Converged);
                break;
            };

            let entry = &self.pool[winner.index];
            ansatz.add_operator(winner.index, Arc::clone(&entry.operator))?;
            parameters.push(self.config.initial_parameter);

            let minimum = vqe.minimize_energy(&mut ansatz, &parameters)?;
            parameters = minimum.parameters;
            energy = minimum.energy;
            resources.objective_evaluations += minimum.evaluations;
            resources.backend_calls += minimum.evaluations;

            let record = RoundRecord {
                iteration: history.len() + 1,
                selected_operator: winner.index,
                gradient: winner.gradient,
                parameter_count: parameters.len(),
                energy,
                parameters: parameters.clone(),
            };
            if self.config.verbose {
                info!(
                    iteration = record.iteration,
                    operator = record.selected_operator,
                    gradient = record.gradient,
                    energy = record.energy,
                    "growth round completed"
                );
            } else {
                debug!(
                    iteration = record.iteration,
                    operator = record.selected_operator,
                    energy = record.energy,
                    "growth round completed"
                );
            }
            history.push(record);
        }

        let status = status.unwrap_or(AdaptStatus::Exhausted);
        let circuit = ansatz.update_parameters(&parameters)?.clone();
        info!(?status, energy, rounds = history.len(), "run finished");

        Ok(AdaptSummary {
            status,
            reference_energy,
            energy,
            parameters,
            history,
            circuit,
            resources,
        })
    }
}
