use std::fmt;
use std::str::FromStr;

use crate::error::{ApproxError, ApproxResult};

/// How the elimination order is chosen.
///
/// All methods except [`PermutationMethod::MinimalDifference`] fix the order
/// before the sweep starts. `MinimalDifference` picks, at every step, the
/// remaining index whose pivot needs the smallest change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PermutationMethod {
    Natural,
    DecreasingDiagonalValues,
    IncreasingDiagonalValues,
    DecreasingAbsoluteDiagonalValues,
    IncreasingAbsoluteDiagonalValues,
    #[default]
    MinimalDifference,
    /// A caller-supplied order; `order[i]` is the original index eliminated at step `i`.
    Explicit(Vec<usize>),
}

impl PermutationMethod {
    /// Names accepted by [`FromStr`], in the order they are documented.
    pub const NAMES: [&'static str; 6] = [
        "natural",
        "decreasing_diagonal_values",
        "increasing_diagonal_values",
        "decreasing_absolute_diagonal_values",
        "increasing_absolute_diagonal_values",
        "minimal_difference",
    ];

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Natural => "natural",
            Self::DecreasingDiagonalValues => "decreasing_diagonal_values",
            Self::IncreasingDiagonalValues => "increasing_diagonal_values",
            Self::DecreasingAbsoluteDiagonalValues => "decreasing_absolute_diagonal_values",
            Self::IncreasingAbsoluteDiagonalValues => "increasing_absolute_diagonal_values",
            Self::MinimalDifference => "minimal_difference",
            Self::Explicit(_) => "explicit",
        }
    }

    /// Whether the order is decided during the sweep.
    #[must_use]
    pub const fn is_dynamic(&self) -> bool {
        matches!(self, Self::MinimalDifference)
    }

    /// Elimination order computed from the real diagonal `gamma`.
    ///
    /// Sorting methods are stable, so equal keys keep their index order. The
    /// dynamic method starts from the identity.
    pub fn initial_order(&self, gamma: &[f64]) -> ApproxResult<Vec<usize>> {
        let n = gamma.len();
        let mut order: Vec<usize> = (0..n).collect();
        match self {
            Self::Natural | Self::MinimalDifference => {}
            Self::DecreasingDiagonalValues => {
                order.sort_by(|&a, &b| gamma[b].total_cmp(&gamma[a]));
            }
            Self::IncreasingDiagonalValues => {
                order.sort_by(|&a, &b| gamma[a].total_cmp(&gamma[b]));
            }
            Self::DecreasingAbsoluteDiagonalValues => {
                order.sort_by(|&a, &b| gamma[b].abs().total_cmp(&gamma[a].abs()));
            }
            Self::IncreasingAbsoluteDiagonalValues => {
                order.sort_by(|&a, &b| gamma[a].abs().total_cmp(&gamma[b].abs()));
            }
            Self::Explicit(explicit) => {
                check_permutation(explicit, n)?;
                order.clone_from(explicit);
            }
        }
        Ok(order)
    }
}

impl fmt::Display for PermutationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PermutationMethod {
    type Err = ApproxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "natural" => Ok(Self::Natural),
            "decreasing_diagonal_values" => Ok(Self::DecreasingDiagonalValues),
            "increasing_diagonal_values" => Ok(Self::IncreasingDiagonalValues),
            "decreasing_absolute_diagonal_values" => Ok(Self::DecreasingAbsoluteDiagonalValues),
            "increasing_absolute_diagonal_values" => Ok(Self::IncreasingAbsoluteDiagonalValues),
            "minimal_difference" => Ok(Self::MinimalDifference),
            other => Err(ApproxError::unsupported(format!(
                "unknown permutation method '{other}', expected one of {}",
                Self::NAMES.join(", ")
            ))),
        }
    }
}

fn check_permutation(order: &[usize], n: usize) -> ApproxResult<()> {
    if order.len() != n {
        return Err(ApproxError::unsupported(format!(
            "explicit permutation has length {}, expected {n}",
            order.len()
        )));
    }
    let mut seen = vec![false; n];
    for &index in order {
        if index >= n || std::mem::replace(&mut seen[index], true) {
            return Err(ApproxError::unsupported(format!(
                "explicit permutation is not a bijection on 0..{n} (entry {index})"
            )));
        }
    }
    Ok(())
}

/// Inverse of a permutation vector: `inverse[p[i]] = i`.
#[must_use]
pub fn invert_permutation(p: &[usize]) -> Vec<usize> {
    let mut inverse = vec![0; p.len()];
    for (position, &index) in p.iter().enumerate() {
        inverse[index] = position;
    }
    inverse
}
