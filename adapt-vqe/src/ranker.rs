use std::collections::HashSet;

use qsim::{Circuit, SimError};
use rayon::prelude::*;

use crate::backend::ExpectationBackend;
use crate::error::AdaptError;
use crate::pool::PoolEntry;

/// Outcome of one pool-ranking pass: the winning candidate and the magnitude
/// of its energy gradient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedOperator {
    pub index: usize,
    pub gradient: f64,
}

/// Scores every eligible pool operator by `|<psi|[H, A]|psi>|` against the
/// current state and picks the largest.
///
/// Returns `Ok(None)` when no score reaches `tolerance`, which is the
/// convergence signal for the outer loop. Ties break towards the lowest pool
/// index, and the result is identical whether scoring runs on one worker or
/// many: scores are collected in pool order before the winner is chosen.
pub fn rank_pool<B>(
    pool: &[PoolEntry],
    circuit: &Circuit,
    backend: &B,
    tolerance: f64,
    excluded: &HashSet<usize>,
    workers: usize,
) -> Result<Option<RankedOperator>, AdaptError>
where
    B: ExpectationBackend + ?Sized,
{
    let score = |(index, entry): (usize, &PoolEntry)| -> Result<f64, SimError> {
        if excluded.contains(&index) {
            // Sentinel that can never win against a positive tolerance.
            return Ok(f64::NEG_INFINITY);
        }
        backend
            .expectation(&entry.commutator, circuit)
            .map(f64::abs)
    };

    let scores: Vec<Result<f64, SimError>> = if workers <= 1 {
        pool.iter().enumerate().map(score).collect()
    } else {
        let threads = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| AdaptError::Config(format!("ranker thread pool: {e}")))?;
        threads.install(|| pool.par_iter().enumerate().map(score).collect())
    };

    let mut best: Option<RankedOperator> = None;
    for (index, result) in scores.into_iter().enumerate() {
        let gradient = result?;
        if best.is_none_or(|b| gradient > b.gradient) {
            best = Some(RankedOperator { index, gradient });
        }
    }

    Ok(best.filter(|b| b.gradient >= tolerance))
}
