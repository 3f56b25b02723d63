use std::cell::{Cell, RefCell};

use argmin::core::{
    CostFunction, Executor, Gradient, TerminationReason, TerminationStatus,
};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::neldermead::NelderMead;
use argmin::solver::quasinewton::LBFGS;
use hamiltonian::QubitOperator;
use tracing::warn;

use crate::ansatz::AdaptAnsatz;
use crate::backend::ExpectationBackend;
use crate::error::AdaptError;

/// Result of one inner minimization.
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub energy: f64,
    pub parameters: Vec<f64>,
    pub evaluations: u64,
    /// False when the solver hit its iteration cap instead of its own
    /// convergence criterion. The best point found is still valid.
    pub converged: bool,
}

pub type Objective<'a> = dyn Fn(&[f64]) -> Result<f64, AdaptError> + 'a;

/// Classical optimizer behind the energy minimization. Implementations see an
/// opaque objective, never the circuit.
pub trait Minimizer {
    fn minimize(&self, objective: &Objective<'_>, x0: &[f64]) -> Result<Minimum, AdaptError>;
}

/// Adapter between an energy objective and argmin's problem traits.
///
/// Tracks the evaluation count and the best point seen so far outside the
/// problem itself, because argmin consumes the problem value and line-search
/// probes can land on points the solver state never reports.
struct EnergyProblem<'a> {
    objective: &'a Objective<'a>,
    evaluations: &'a Cell<u64>,
    best: &'a RefCell<Option<(f64, Vec<f64>)>>,
    gradient_step: f64,
}

impl EnergyProblem<'_> {
    fn eval(&self, params: &[f64]) -> Result<f64, AdaptError> {
        self.evaluations.set(self.evaluations.get() + 1);
        let energy = (self.objective)(params)?;
        if !energy.is_finite() {
            return Err(AdaptError::NonFiniteEnergy(energy));
        }

        let mut best = self.best.borrow_mut();
        if best.as_ref().is_none_or(|(e, _)| energy < *e) {
            *best = Some((energy, params.to_vec()));
        }
        Ok(energy)
    }
}

impl CostFunction for EnergyProblem<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<f64, argmin::core::Error> {
        Ok(self.eval(param)?)
    }
}

impl Gradient for EnergyProblem<'_> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, param: &Self::Param) -> Result<Vec<f64>, argmin::core::Error> {
        let mut gradient = Vec::with_capacity(param.len());
        let mut probe = param.clone();
        for i in 0..param.len() {
            probe[i] = param[i] + self.gradient_step;
            let above = self.eval(&probe)?;
            probe[i] = param[i] - self.gradient_step;
            let below = self.eval(&probe)?;
            probe[i] = param[i];
            gradient.push((above - below) / (2.0 * self.gradient_step));
        }
        Ok(gradient)
    }
}

/// Objective failures travel through argmin as boxed errors; unwrap them back
/// into their original form where possible.
fn into_adapt_error(error: argmin::core::Error) -> AdaptError {
    match error.downcast::<AdaptError>() {
        Ok(inner) => inner,
        Err(other) => AdaptError::Optimizer(other.to_string()),
    }
}

fn collect_minimum(
    best: &RefCell<Option<(f64, Vec<f64>)>>,
    evaluations: &Cell<u64>,
    converged: bool,
) -> Result<Minimum, AdaptError> {
    let (energy, parameters) = best
        .borrow_mut()
        .take()
        .ok_or_else(|| AdaptError::Optimizer("solver finished without evaluating".to_string()))?;
    Ok(Minimum {
        energy,
        parameters,
        evaluations: evaluations.get(),
        converged,
    })
}

fn solver_converged(status: &TerminationStatus) -> bool {
    matches!(
        status,
        TerminationStatus::Terminated(TerminationReason::SolverConverged)
    )
}

/// Limited-memory BFGS with a More-Thuente line search and central-difference
/// gradients. The default inner optimizer.
#[derive(Debug, Clone)]
pub struct LbfgsMinimizer {
    pub max_iters: u64,
    pub memory: usize,
    pub gradient_tolerance: f64,
    pub gradient_step: f64,
}

impl Default for LbfgsMinimizer {
    fn default() -> Self {
        LbfgsMinimizer {
            max_iters: 100,
            memory: 7,
            gradient_tolerance: 1e-8,
            gradient_step: 1e-6,
        }
    }
}

impl Minimizer for LbfgsMinimizer {
    fn minimize(&self, objective: &Objective<'_>, x0: &[f64]) -> Result<Minimum, AdaptError> {
        let evaluations = Cell::new(0);
        let best = RefCell::new(None);
        let problem = EnergyProblem {
            objective,
            evaluations: &evaluations,
            best: &best,
            gradient_step: self.gradient_step,
        };

        let solver = LBFGS::new(MoreThuenteLineSearch::new(), self.memory)
            .with_tolerance_grad(self.gradient_tolerance)
            .map_err(|e| AdaptError::Optimizer(e.to_string()))?;

        let result = Executor::new(problem, solver)
            .configure(|state| state.param(x0.to_vec()).max_iters(self.max_iters))
            .run()
            .map_err(into_adapt_error)?;

        collect_minimum(
            &best,
            &evaluations,
            solver_converged(&result.state.termination_status),
        )
    }
}

/// Gradient-free fallback for noisy backends, where finite differences are
/// unreliable.
#[derive(Debug, Clone)]
pub struct NelderMeadMinimizer {
    pub max_iters: u64,
    pub simplex_step: f64,
    pub sd_tolerance: f64,
}

impl Default for NelderMeadMinimizer {
    fn default() -> Self {
        NelderMeadMinimizer {
            max_iters: 400,
            simplex_step: 0.1,
            sd_tolerance: 1e-8,
        }
    }
}

impl Minimizer for NelderMeadMinimizer {
    fn minimize(&self, objective: &Objective<'_>, x0: &[f64]) -> Result<Minimum, AdaptError> {
        let evaluations = Cell::new(0);
        let best = RefCell::new(None);
        let problem = EnergyProblem {
            objective,
            evaluations: &evaluations,
            best: &best,
            gradient_step: 0.0,
        };

        let mut simplex = vec![x0.to_vec()];
        for i in 0..x0.len() {
            let mut vertex = x0.to_vec();
            vertex[i] += self.simplex_step;
            simplex.push(vertex);
        }

        let solver = NelderMead::new(simplex)
            .with_sd_tolerance(self.sd_tolerance)
            .map_err(|e| AdaptError::Optimizer(e.to_string()))?;

        let result = Executor::new(problem, solver)
            .configure(|state| state.max_iters(self.max_iters))
            .run()
            .map_err(into_adapt_error)?;

        collect_minimum(
            &best,
            &evaluations,
            solver_converged(&result.state.termination_status),
        )
    }
}

/// Binds a Hamiltonian, a backend and a classical optimizer into the energy
/// minimization the outer loop calls once per growth round.
pub struct VqeSolver<'a, B: ExpectationBackend + ?Sized> {
    pub hamiltonian: &'a QubitOperator,
    pub backend: &'a B,
    pub minimizer: &'a dyn Minimizer,
}

impl<B: ExpectationBackend + ?Sized> VqeSolver<'_, B> {
    /// Minimizes the ansatz energy starting from `x0`. All previously
    /// optimized parameters are free again, not just the newest one.
    pub fn minimize_energy(
        &self,
        ansatz: &mut AdaptAnsatz,
        x0: &[f64],
    ) -> Result<Minimum, AdaptError> {
        if x0.is_empty() {
            let circuit = ansatz.update_parameters(&[])?;
            let energy = self.backend.expectation(self.hamiltonian, circuit)?;
            if !energy.is_finite() {
                return Err(AdaptError::NonFiniteEnergy(energy));
            }
            return Ok(Minimum {
                energy,
                parameters: Vec::new(),
                evaluations: 1,
                converged: true,
            });
        }

        let shared = RefCell::new(ansatz);
        let objective = |params: &[f64]| -> Result<f64, AdaptError> {
            let mut ansatz = shared.borrow_mut();
            let circuit = ansatz.update_parameters(params)?;
            Ok(self.backend.expectation(self.hamiltonian, circuit)?)
        };

        let minimum = self.minimizer.minimize(&objective, x0)?;
        if !minimum.converged {
            warn!(
                energy = minimum.energy,
                evaluations = minimum.evaluations,
                "optimizer stopped at its iteration cap; keeping the best point found"
            );
        }
        Ok(minimum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bowl(params: &[f64]) -> Result<f64, AdaptError> {
        Ok((params[0] - 1.0).powi(2) + (params[1] + 2.0).powi(2))
    }

    #[test]
    fn lbfgs_finds_the_quadratic_minimum() {
        let minimizer = LbfgsMinimizer::default();
        let minimum = minimizer.minimize(&bowl, &[0.0, 0.0]).unwrap();

        assert!(minimum.energy < 1e-8, "energy was {}", minimum.energy);
        assert!((minimum.parameters[0] - 1.0).abs() < 1e-4);
        assert!((minimum.parameters[1] + 2.0).abs() < 1e-4);
        assert!(minimum.evaluations > 0);
    }

    #[test]
    fn nelder_mead_finds_the_quadratic_minimum() {
        let minimizer = NelderMeadMinimizer::default();
        let minimum = minimizer.minimize(&bowl, &[0.0, 0.0]).unwrap();

        assert!(minimum.energy < 1e-6, "energy was {}", minimum.energy);
        assert!((minimum.parameters[0] - 1.0).abs() < 1e-3);
        assert!((minimum.parameters[1] + 2.0).abs() < 1e-3);
    }

    #[test]
    fn non_finite_objective_values_are_rejected() {
        let objective = |_: &[f64]| -> Result<f64, AdaptError> { Ok(f64::NAN) };
        let minimizer = LbfgsMinimizer::default();

        let err = minimizer.minimize(&objective, &[0.5]).unwrap_err();
        assert!(matches!(err, AdaptError::NonFiniteEnergy(_)));
    }

    fn rosenbrock(params: &[f64]) -> Result<f64, AdaptError> {
        let (x, y) = (params[0], params[1]);
        Ok((1.0 - x).powi(2) + 100.0 * (y - x * x).powi(2))
    }

    #[test]
    fn best_point_survives_an_iteration_cap() {
        // Rosenbrock's curved valley cannot be finished in one step, so the
        // cap is what stops the solver.
        let minimizer = LbfgsMinimizer {
            max_iters: 1,
            ..LbfgsMinimizer::default()
        };
        let start_cost = rosenbrock(&[-1.2, 1.0]).unwrap();
        let minimum = minimizer.minimize(&rosenbrock, &[-1.2, 1.0]).unwrap();

        assert!(!minimum.converged);
        assert!(
            minimum.energy < start_cost,
            "energy {} did not improve on {}",
            minimum.energy,
            start_cost
        );
    }
}
