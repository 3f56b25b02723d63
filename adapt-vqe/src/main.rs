use std::error::Error;
use std::fs;
use std::io;
use std::path::PathBuf;

use clap::Parser;
use hamiltonian::{QubitOperator, h2_minimal};
use qsim::Circuit;
use tracing_subscriber::EnvFilter;

use adapt_vqe::events::{AdaptEvent, RunEndInfo, RunStartInfo, emit_event};
use adapt_vqe::{
    AdaptConfig, AdaptSolver, ExpectationBackend, PoolEntry, ShotBackend, SimulatorBackend,
};

/// Adaptive variational ground-state solver.
///
/// With no problem files it runs the built-in two-qubit molecular demo.
#[derive(Debug, Parser)]
#[command(name = "adapt-vqe", version)]
struct Cli {
    /// Hamiltonian file, one `coeff * X0 Z1` term per line.
    #[arg(long, requires = "pool", requires = "reference")]
    hamiltonian: Option<PathBuf>,

    /// Pool file of anti-Hermitian generators, blank-line-separated blocks
    /// of terms in the same format.
    #[arg(long, requires = "hamiltonian")]
    pool: Option<PathBuf>,

    /// Reference occupations as a bitstring, leftmost character is qubit 0.
    #[arg(long, requires = "hamiltonian")]
    reference: Option<String>,

    /// Gradient threshold for convergence.
    #[arg(long, default_value_t = 1e-3)]
    tolerance: f64,

    /// Maximum number of growth rounds.
    #[arg(long, default_value_t = 15)]
    max_cycles: usize,

    /// Worker threads for pool ranking.
    #[arg(long, default_value_t = 1)]
    workers: usize,

    /// Estimate expectation values from this many shots instead of exactly.
    #[arg(long)]
    shots: Option<u32>,

    /// Stream progress as JSON lines on stdout.
    #[arg(long)]
    json: bool,

    /// Log every growth round at info level.
    #[arg(long)]
    verbose: bool,
}

fn parse_reference(bits: &str) -> Result<Circuit, Box<dyn Error>> {
    let mut occupations = Vec::with_capacity(bits.len());
    for c in bits.chars() {
        match c {
            '0' => occupations.push(0),
            '1' => occupations.push(1),
            other => return Err(format!("invalid occupation character '{other}'").into()),
        }
    }
    if occupations.is_empty() {
        return Err("reference bitstring is empty".into());
    }
    Ok(Circuit::prepare_reference(&occupations))
}

fn parse_pool(text: &str, hamiltonian: &QubitOperator) -> Result<Vec<PoolEntry>, Box<dyn Error>> {
    let mut entries = Vec::new();
    for block in text.split("\n\n") {
        if block.trim().is_empty() {
            continue;
        }
        let generator: QubitOperator = block.parse()?;
        entries.push(PoolEntry::from_generator(hamiltonian, generator));
    }
    Ok(entries)
}

/// The built-in demo: a minimal two-qubit molecular Hamiltonian with the
/// single-excitation pool and the doubly-reduced |01> reference.
fn demo_problem() -> Result<(QubitOperator, Vec<PoolEntry>, Circuit), Box<dyn Error>> {
    let hamiltonian = h2_minimal();
    let pool = parse_pool("1i * Y0 X1\n\n1i * X0 Y1", &hamiltonian)?;
    let reference = parse_reference("10")?;
    Ok((hamiltonian, pool, reference))
}

fn run_and_report<B: ExpectationBackend>(
    hamiltonian: QubitOperator,
    pool: Vec<PoolEntry>,
    reference: Circuit,
    backend: B,
    config: AdaptConfig,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let start = RunStartInfo {
        num_qubits: reference.num_qubits,
        pool_size: pool.len(),
        tolerance: config.tolerance,
        max_cycles: config.max_cycles,
    };

    let solver = AdaptSolver::new(hamiltonian, pool, reference, backend, config)?;
    let summary = solver.run()?;

    if json {
        let mut out = io::stdout().lock();
        emit_event(&AdaptEvent::RunStart(start), &mut out)?;
        for record in &summary.history {
            emit_event(&AdaptEvent::RoundCompleted(record.clone()), &mut out)?;
        }
        emit_event(
            &AdaptEvent::RunEnd(RunEndInfo {
                status: summary.status,
                energy: summary.energy,
                rounds: summary.history.len(),
            }),
            &mut out,
        )?;
    } else {
        println!("status:           {:?}", summary.status);
        println!("reference energy: {:.8}", summary.reference_energy);
        println!("final energy:     {:.8}", summary.energy);
        for record in &summary.history {
            println!(
                "round {:>2}: operator {} (gradient {:.6}) -> energy {:.8}",
                record.iteration, record.selected_operator, record.gradient, record.energy
            );
        }
        println!(
            "work: {} gradient scores, {} objective evaluations, {} backend calls",
            summary.resources.pool_evaluations,
            summary.resources.objective_evaluations,
            summary.resources.backend_calls
        );
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "info" } else { "warn" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let (hamiltonian, pool, reference) = match (&cli.hamiltonian, &cli.pool, &cli.reference) {
        (Some(h_path), Some(p_path), Some(bits)) => {
            let hamiltonian: QubitOperator = fs::read_to_string(h_path)?.parse()?;
            let pool = parse_pool(&fs::read_to_string(p_path)?, &hamiltonian)?;
            (hamiltonian, pool, parse_reference(bits)?)
        }
        _ => demo_problem()?,
    };

    let config = AdaptConfig {
        tolerance: cli.tolerance,
        max_cycles: cli.max_cycles,
        ranker_workers: cli.workers,
        verbose: cli.verbose,
        ..AdaptConfig::default()
    };

    match cli.shots {
        Some(shots) => run_and_report(
            hamiltonian,
            pool,
            reference,
            ShotBackend::new(shots),
            config,
            cli.json,
        ),
        None => run_and_report(
            hamiltonian,
            pool,
            reference,
            SimulatorBackend::new(),
            config,
            cli.json,
        ),
    }
}
