//! Pauli-string algebra for qubit operators.
//!
//! A qubit Hamiltonian and the excitation generators it is measured against
//! are both sums of weighted Pauli strings. This crate keeps the strings in a
//! canonical order so operators can be added, multiplied and commuted
//! symbolically, and understands the `coeff * X0 Z1` wire format (one term
//! per line).

use num_complex::Complex;
use qsim::Pauli;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Mul, Sub};
use std::str::FromStr;

pub type Coefficient = Complex<f64>;

/// Coefficients with a magnitude below this are dropped by `compress`.
const COMPRESS_TOLERANCE: f64 = 1e-12;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid operator term '{0}'")]
pub struct OperatorParseError(pub String);

/// Single-qubit Pauli product, returned as (phase, result):
/// `a * b = phase * result`.
pub fn pauli_product(a: Pauli, b: Pauli) -> (Coefficient, Pauli) {
    use Pauli::*;

    let one = Complex::new(1.0, 0.0);
    let i = Complex::new(0.0, 1.0);

    match (a, b) {
        (I, p) | (p, I) => (one, p),
        (X, X) | (Y, Y) | (Z, Z) => (one, I),
        (X, Y) => (i, Z),
        (Y, X) => (-i, Z),
        (Y, Z) => (i, X),
        (Z, Y) => (-i, X),
        (Z, X) => (i, Y),
        (X, Z) => (-i, Y),
    }
}

/// A tensor product of single-qubit Paulis, identity everywhere else.
/// Stored sorted by qubit index with identities elided, which makes the
/// representation canonical and usable as a map key.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PauliString(Vec<(usize, Pauli)>);

impl PauliString {
    pub fn identity() -> Self {
        PauliString(Vec::new())
    }

    pub fn new(mut ops: Vec<(usize, Pauli)>) -> Result<Self, OperatorParseError> {
        ops.retain(|&(_, p)| p != Pauli::I);
        ops.sort_by_key(|&(q, _)| q);
        for pair in ops.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(OperatorParseError(format!(
                    "qubit {} appears twice in one term",
                    pair[0].0
                )));
            }
        }
        Ok(PauliString(ops))
    }

    pub fn ops(&self) -> &[(usize, Pauli)] {
        &self.0
    }

    pub fn is_identity(&self) -> bool {
        self.0.is_empty()
    }

    pub fn num_qubits(&self) -> usize {
        self.0.last().map_or(0, |&(q, _)| q + 1)
    }

    /// String product with phase: `self * other = phase * result`.
    pub fn product(&self, other: &PauliString) -> (Coefficient, PauliString) {
        let mut phase = Complex::new(1.0, 0.0);
        let mut ops = Vec::with_capacity(self.0.len() + other.0.len());
        let (mut i, mut j) = (0, 0);

        while i < self.0.len() && j < other.0.len() {
            let (qa, pa) = self.0[i];
            let (qb, pb) = other.0[j];
            if qa < qb {
                ops.push((qa, pa));
                i += 1;
            } else if qb < qa {
                ops.push((qb, pb));
                j += 1;
            } else {
                let (ph, p) = pauli_product(pa, pb);
                phase *= ph;
                if p != Pauli::I {
                    ops.push((qa, p));
                }
                i += 1;
                j += 1;
            }
        }
        ops.extend_from_slice(&self.0[i..]);
        ops.extend_from_slice(&other.0[j..]);

        (phase, PauliString(ops))
    }
}

impl fmt::Display for PauliString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (qubit, pauli)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:?}{}", pauli, qubit)?;
        }
        Ok(())
    }
}

/// A sum of weighted Pauli strings. Coefficients are complex so the same
/// type covers Hermitian Hamiltonians (real weights) and anti-Hermitian
/// excitation generators (imaginary weights).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QubitOperator {
    terms: BTreeMap<PauliString, Coefficient>,
}

impl QubitOperator {
    pub fn new() -> Self {
        QubitOperator {
            terms: BTreeMap::new(),
        }
    }

    pub fn add_term(&mut self, string: PauliString, coefficient: Coefficient) {
        *self
            .terms
            .entry(string)
            .or_insert_with(|| Complex::new(0.0, 0.0)) += coefficient;
    }

    pub fn with_term(mut self, string: PauliString, coefficient: Coefficient) -> Self {
        self.add_term(string, coefficient);
        self
    }

    pub fn terms(&self) -> impl Iterator<Item = (&PauliString, &Coefficient)> {
        self.terms.iter()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn num_qubits(&self) -> usize {
        self.terms
            .keys()
            .map(PauliString::num_qubits)
            .max()
            .unwrap_or(0)
    }

    /// True when every coefficient is purely imaginary, which is what makes
    /// a sum of Pauli strings a valid excitation generator (A^dag = -A).
    pub fn is_anti_hermitian(&self) -> bool {
        self.terms
            .values()
            .all(|c| c.re.abs() <= COMPRESS_TOLERANCE)
    }

    /// Drops terms whose coefficient magnitude cancelled down to noise.
    pub fn compress(&mut self) {
        self.terms.retain(|_, c| c.norm() > COMPRESS_TOLERANCE);
    }

    pub fn compressed(mut self) -> Self {
        self.compress();
        self
    }
}

impl Add for &QubitOperator {
    type Output = QubitOperator;

    fn add(self, other: &QubitOperator) -> QubitOperator {
        let mut result = self.clone();
        for (string, coeff) in other.terms() {
            result.add_term(string.clone(), *coeff);
        }
        result
    }
}

impl Sub for &QubitOperator {
    type Output = QubitOperator;

    fn sub(self, other: &QubitOperator) -> QubitOperator {
        let mut result = self.clone();
        for (string, coeff) in other.terms() {
            result.add_term(string.clone(), -*coeff);
        }
        result
    }
}

impl Mul for &QubitOperator {
    type Output = QubitOperator;

    fn mul(self, other: &QubitOperator) -> QubitOperator {
        let mut result = QubitOperator::new();
        for (sa, ca) in self.terms() {
            for (sb, cb) in other.terms() {
                let (phase, string) = sa.product(sb);
                result.add_term(string, ca * cb * phase);
            }
        }
        result
    }
}

/// Commutator [a, b] = ab - ba, with cancelled terms removed.
pub fn commutator(a: &QubitOperator, b: &QubitOperator) -> QubitOperator {
    (&(a * b) - &(b * a)).compressed()
}

fn parse_coefficient(s: &str) -> Result<Coefficient, OperatorParseError> {
    let err = || OperatorParseError(s.to_string());
    if let Some(imaginary) = s.strip_suffix('i') {
        let im = imaginary.parse::<f64>().map_err(|_| err())?;
        Ok(Complex::new(0.0, im))
    } else {
        let re = s.parse::<f64>().map_err(|_| err())?;
        Ok(Complex::new(re, 0.0))
    }
}

fn parse_term(s: &str) -> Result<(PauliString, Coefficient), OperatorParseError> {
    let parts: Vec<&str> = s.split('*').map(|p| p.trim()).collect();
    let err = || OperatorParseError(s.to_string());

    let (coefficient, operator_str) = match parts.as_slice() {
        [coeff] => return Ok((PauliString::identity(), parse_coefficient(coeff)?)),
        [coeff, ops] => (parse_coefficient(coeff)?, *ops),
        _ => return Err(err()),
    };

    let mut ops = Vec::new();
    for op in operator_str.split_whitespace() {
        if op.len() < 2 {
            return Err(err());
        }
        let (pauli_char, qubit_str) = op.split_at(1);
        let qubit = qubit_str.parse::<usize>().map_err(|_| err())?;
        let pauli = match pauli_char {
            "X" | "x" => Pauli::X,
            "Y" | "y" => Pauli::Y,
            "Z" | "z" => Pauli::Z,
            "I" | "i" => Pauli::I,
            _ => return Err(err()),
        };
        ops.push((qubit, pauli));
    }

    Ok((PauliString::new(ops)?, coefficient))
}

impl FromStr for QubitOperator {
    type Err = OperatorParseError;

    /// Parses one term per line; a leading `+ ` continuation (as produced by
    /// `Display`) is accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut operator = QubitOperator::new();
        for line in s.lines() {
            let line = line.trim().trim_start_matches("+ ").trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            let (string, coefficient) = parse_term(line)?;
            operator.add_term(string, coefficient);
        }
        Ok(operator)
    }
}

fn write_coefficient(f: &mut fmt::Formatter<'_>, c: &Coefficient) -> fmt::Result {
    if c.im == 0.0 {
        write!(f, "{:.8}", c.re)
    } else if c.re == 0.0 {
        write!(f, "{:.8}i", c.im)
    } else {
        write!(f, "{:.8}{:+.8}i", c.re, c.im)
    }
}

impl fmt::Display for QubitOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (string, coeff)) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, "\n+ ")?;
            }
            write_coefficient(f, coeff)?;
            if !string.is_identity() {
                write!(f, " * {}", string)?;
            }
        }
        Ok(())
    }
}

/// The minimal two-qubit H2 Hamiltonian used by demos and tests.
pub fn h2_minimal() -> QubitOperator {
    "-0.8126\n\
     0.1712 * Z0\n\
     -0.2228 * Z1\n\
     0.1686 * Z0 Z1\n\
     0.0453 * X0 X1"
        .parse()
        .unwrap_or_default()
}
