//! The pivoted elimination sweep.
//!
//! Step `i` chooses the pivot `p[i]`, asks the pivot solver for `(d_i, omega)`,
//! rescales row `i` of the factor by `omega` and computes column `i` of the
//! factor together with the running sums `alpha` and `beta` of the remaining
//! candidates. Rows of the factor are indexed by elimination position, the
//! vectors `alpha`, `beta`, `omega` and `delta` by original index.

use std::cmp::Ordering;

use ldla_runtime::{PivotEvidenceEntry, PivotEvidenceLedger};

use crate::permutation::PermutationMethod;
use crate::pivot::{PivotChoice, compare_choices, minimal_change};
use crate::scalar::HermitianScalar;
use crate::validation::{EPS, ValidatedBounds};
use crate::view::{MatrixRead, MatrixView, upper_entry};

/// Where the sweep reads entries of `A`.
pub(crate) enum EntrySource<'a, T> {
    Separate(&'a dyn MatrixRead<T>),
    /// `A` lives in the upper triangle of the factor storage, which the sweep
    /// never writes. The factor only occupies the strict lower triangle.
    Shared,
}

/// Result of a sweep. The factor itself stays in the caller's view.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Sweep {
    /// Pivot values in elimination order.
    pub d: Vec<f64>,
    pub permutation: Vec<usize>,
    pub omega: Vec<f64>,
    pub delta: Vec<f64>,
}

pub(crate) struct EliminationEngine<'a, T, V> {
    factor: &'a mut V,
    source: EntrySource<'a, T>,
    bounds: &'a ValidatedBounds,
    gamma: &'a [f64],
    dynamic: bool,
    strict_lower_only: bool,
    p: Vec<usize>,
    d: Vec<f64>,
    alpha: Vec<f64>,
    beta: Vec<f64>,
    omega: Vec<f64>,
    delta: Vec<f64>,
}

impl<'a, T, V> EliminationEngine<'a, T, V>
where
    T: HermitianScalar,
    V: MatrixView<T>,
{
    /// `initial_order` comes from [`PermutationMethod::initial_order`] and
    /// must be a bijection on `0..gamma.len()`.
    pub(crate) fn new(
        factor: &'a mut V,
        source: EntrySource<'a, T>,
        bounds: &'a ValidatedBounds,
        gamma: &'a [f64],
        method: &PermutationMethod,
        initial_order: Vec<usize>,
        strict_lower_only: bool,
    ) -> Self {
        let n = gamma.len();
        debug_assert_eq!(initial_order.len(), n);
        Self {
            factor,
            source,
            bounds,
            gamma,
            dynamic: method.is_dynamic(),
            strict_lower_only,
            p: initial_order,
            d: vec![0.0; n],
            alpha: vec![0.0; n],
            beta: vec![0.0; n],
            omega: vec![1.0; n],
            delta: vec![0.0; n],
        }
    }

    pub(crate) fn run(mut self, mut evidence: Option<&mut PivotEvidenceLedger>) -> Sweep {
        let n = self.gamma.len();
        for i in 0..n {
            let (choice, candidates_scanned) = if self.dynamic {
                self.select_dynamic(i)
            } else {
                (self.solve(self.p[i]), 1)
            };
            assert!(
                choice.d.is_finite() && choice.omega.is_finite(),
                "non-finite pivot at step {i}: {choice:?}"
            );

            let pivot = self.p[i];
            self.d[i] = choice.d;
            self.omega[pivot] = choice.omega;
            self.delta[pivot] = choice.d
                + choice.omega * choice.omega * self.alpha[pivot]
                - self.gamma[pivot];
            assert!(
                self.delta[pivot].is_finite(),
                "non-finite diagonal change at step {i}"
            );

            self.factor.scale_row_prefix(i, i, choice.omega, EPS);
            self.eliminate_column(i);

            if let Some(ledger) = evidence.as_deref_mut() {
                ledger.record(PivotEvidenceEntry {
                    step: i,
                    pivot,
                    d: choice.d,
                    omega: choice.omega,
                    penalty: choice.penalty,
                    case: choice.case,
                    candidates_scanned,
                    mode: self.bounds.mode,
                });
            }
        }

        if !self.strict_lower_only {
            self.factor.fill_unit_diagonal();
            if matches!(self.source, EntrySource::Shared) {
                self.factor.clear_strict_upper();
            }
        }

        Sweep {
            d: self.d,
            permutation: self.p,
            omega: self.omega,
            delta: self.delta,
        }
    }

    fn solve(&self, index: usize) -> PivotChoice {
        minimal_change(
            self.alpha[index],
            self.beta[index],
            self.gamma[index],
            &self.bounds.pivot_bounds(index),
        )
    }

    /// Evaluate every remaining candidate and move the best one to position `i`.
    fn select_dynamic(&mut self, i: usize) -> (PivotChoice, usize) {
        let n = self.p.len();
        let mut best_position = i;
        let mut best = self.solve(self.p[i]);
        for j in (i + 1)..n {
            let choice = self.solve(self.p[j]);
            if compare_choices(&choice, &best) == Ordering::Less {
                best_position = j;
                best = choice;
            }
        }
        if best_position != i {
            self.p.swap(i, best_position);
            if i > 0 {
                self.factor.swap_row_prefixes(i, best_position, i);
            }
        }
        (best, n - i)
    }

    fn read(&self, row: usize, col: usize) -> T {
        match self.source {
            EntrySource::Separate(matrix) => matrix.entry(row, col),
            EntrySource::Shared => upper_entry(&*self.factor, row, col),
        }
    }

    fn eliminate_column(&mut self, i: usize) {
        let n = self.p.len();
        let pivot = self.p[i];
        let d_i = self.d[i];
        for j in (i + 1)..n {
            let target = self.p[j];
            let a = self.read(target, pivot);
            self.beta[target] += 2.0 * a.modulus_squared();

            if d_i == 0.0 {
                self.factor.set(j, i, T::zero());
                continue;
            }
            let projected = if i > 0 {
                self.factor.weighted_row_dot(j, i, i, &self.d)
            } else {
                T::zero()
            };
            let l = (a - projected).unscale(d_i);
            assert!(l.is_finite(), "non-finite factor entry ({j}, {i})");
            if l.modulus() < EPS {
                self.factor.set(j, i, T::zero());
            } else {
                self.factor.set(j, i, l);
                self.alpha[target] += l.modulus_squared() * d_i;
            }
        }
    }
}
