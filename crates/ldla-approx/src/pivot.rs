//! Per-pivot minimal-change solver.
//!
//! At elimination step `i` the pivot `p[i]` has accumulated
//! `alpha = sum |L[i,k]|^2 d_k` and `beta = 2 sum |A[p[i],p[k]]|^2` over the
//! previous steps, and original diagonal value `gamma`. The solver picks the
//! pivot value `d` and the row scale `omega` minimizing
//!
//! ```text
//! f(d, omega) = (d + omega^2 alpha - gamma)^2 + (omega - 1)^2 beta
//! ```
//!
//! subject to `min_diag_d <= d <= max_diag_d`, `d == 0 || d >= min_abs_value_d`,
//! `omega >= 0` and `min_diag_b <= d + omega^2 alpha <= max_diag_b`.

use std::cmp::Ordering;
use std::f64::consts::PI;

use ldla_runtime::PivotCase;

/// Newton steps applied to every closed-form cubic root.
const NEWTON_POLISH_STEPS: usize = 4;

/// Relative slack of the postcondition check on `d + omega^2 alpha`.
const BOUND_SLACK: f64 = 1e-8;

/// Bounds for a single pivot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PivotBounds {
    pub min_diag_d: f64,
    pub max_diag_d: f64,
    pub min_diag_b: f64,
    pub max_diag_b: f64,
    pub min_abs_value_d: f64,
}

impl Default for PivotBounds {
    fn default() -> Self {
        Self {
            min_diag_d: 0.0,
            max_diag_d: f64::INFINITY,
            min_diag_b: f64::NEG_INFINITY,
            max_diag_b: f64::INFINITY,
            min_abs_value_d: f64::EPSILON.sqrt(),
        }
    }
}

/// Solver result for one pivot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PivotChoice {
    pub d: f64,
    pub omega: f64,
    pub penalty: f64,
    pub case: PivotCase,
}

/// The objective `f(d, omega)`.
#[must_use]
pub fn penalty(alpha: f64, beta: f64, gamma: f64, d: f64, omega: f64) -> f64 {
    let residual = d + omega * omega * alpha - gamma;
    let scale = omega - 1.0;
    residual * residual + scale * scale * beta
}

/// Minimize the objective for one pivot.
///
/// Requires `alpha >= 0`, `beta >= 0`, `beta > 0` whenever `alpha > 0`, and
/// bounds that passed [`crate::validate_bounds`].
#[must_use]
pub fn minimal_change(alpha: f64, beta: f64, gamma: f64, bounds: &PivotBounds) -> PivotChoice {
    debug_assert!(alpha >= 0.0, "alpha must be non-negative, got {alpha}");
    debug_assert!(beta >= 0.0, "beta must be non-negative, got {beta}");
    debug_assert!(beta != 0.0 || alpha == 0.0, "alpha > 0 requires beta > 0");

    let choice = if let Some(choice) = interior(alpha, gamma, bounds) {
        choice
    } else if alpha == 0.0 {
        no_history(beta, gamma, bounds)
    } else {
        boundary(alpha, beta, gamma, bounds)
    };
    debug_check(&choice, alpha, bounds);
    choice
}

fn interior(alpha: f64, gamma: f64, bounds: &PivotBounds) -> Option<PivotChoice> {
    let d = gamma - alpha;
    let lower = bounds.min_diag_d.max(bounds.min_diag_b - alpha);
    let upper = bounds.max_diag_d.min(bounds.max_diag_b - alpha);
    let feasible = lower <= d && d <= upper && (d == 0.0 || d >= bounds.min_abs_value_d);
    feasible.then_some(PivotChoice {
        d,
        omega: 1.0,
        penalty: 0.0,
        case: PivotCase::Interior,
    })
}

fn no_history(beta: f64, gamma: f64, bounds: &PivotBounds) -> PivotChoice {
    // Snap to zero when zero is admissible and closer to gamma than the smallest non-zero pivot.
    let d = if bounds.min_diag_d == 0.0
        && bounds.min_diag_b <= 0.0
        && 2.0 * gamma < bounds.min_abs_value_d
    {
        0.0
    } else {
        bounds
            .min_diag_d
            .max(bounds.min_abs_value_d)
            .max(bounds.min_diag_b)
            .max(gamma.min(bounds.max_diag_d).min(bounds.max_diag_b))
    };
    PivotChoice {
        d,
        omega: 1.0,
        penalty: penalty(0.0, beta, gamma, d, 1.0),
        case: PivotCase::NoHistory,
    }
}

fn boundary(alpha: f64, beta: f64, gamma: f64, bounds: &PivotBounds) -> PivotChoice {
    let lower = bounds.min_diag_d.max(bounds.min_abs_value_d);
    let upper = bounds.max_diag_d.min(bounds.max_diag_b);
    let in_range = |d: f64| lower <= d && d <= upper;
    let mut candidates: Vec<(f64, f64)> = Vec::with_capacity(16);

    // omega fixed at one of its natural values
    for d in [bounds.min_diag_b - alpha, bounds.max_diag_b - alpha] {
        if d.is_finite() && in_range(d) {
            candidates.push((d, 1.0));
        }
    }
    if lower.max(bounds.min_diag_b) <= gamma && gamma <= upper {
        candidates.push((gamma, 0.0));
    }
    if in_range(gamma) {
        for bound in [bounds.min_diag_b, bounds.max_diag_b] {
            let radicand = (bound - gamma) / alpha;
            if radicand.is_finite() && radicand >= 0.0 {
                candidates.push((gamma, radicand.sqrt()));
            }
        }
    }

    // d fixed at one of its bounds, omega a stationary point of f(d, .)
    let mut pinned = vec![lower];
    if upper.is_finite() {
        pinned.push(upper);
    }
    if bounds.min_diag_d == 0.0 {
        pinned.push(0.0);
    }
    let scale = 2.0 * alpha * alpha;
    for d in pinned {
        let omega_lower = ((bounds.min_diag_b - d).max(0.0) / alpha).sqrt();
        let omega_upper = ((bounds.max_diag_b - d) / alpha).sqrt();
        if !(omega_lower <= omega_upper) {
            continue;
        }
        let p = (2.0 * alpha * (d - gamma) + beta) / scale;
        let q = -beta / scale;
        for omega in depressed_cubic_roots(p, q) {
            candidates.push((d, omega.max(omega_lower).min(omega_upper)));
        }
    }

    candidates
        .into_iter()
        .map(|(d, omega)| PivotChoice {
            d,
            omega,
            penalty: penalty(alpha, beta, gamma, d, omega),
            case: PivotCase::Boundary,
        })
        .min_by(compare_choices)
        .unwrap_or_else(|| PivotChoice {
            d: lower,
            omega: 1.0,
            penalty: f64::INFINITY,
            case: PivotCase::Boundary,
        })
}

/// Order by penalty, then larger `d`, then smaller `omega`. NaN penalties rank last.
pub(crate) fn compare_choices(left: &PivotChoice, right: &PivotChoice) -> Ordering {
    rank_penalty(left.penalty)
        .total_cmp(&rank_penalty(right.penalty))
        .then_with(|| right.d.total_cmp(&left.d))
        .then_with(|| left.omega.total_cmp(&right.omega))
}

fn rank_penalty(value: f64) -> f64 {
    if value.is_nan() { f64::INFINITY } else { value }
}

/// Real roots of `x^3 + p x + q`.
///
/// One root when the discriminant is positive (Cardano), otherwise three
/// (trigonometric form, possibly repeated). Every root is polished with a
/// few guarded Newton steps.
#[must_use]
pub fn depressed_cubic_roots(p: f64, q: f64) -> Vec<f64> {
    let half_q = q / 2.0;
    let third_p = p / 3.0;
    let discriminant = half_q * half_q + third_p * third_p * third_p;

    let mut roots = if discriminant > 0.0 {
        // pick the cube root of larger magnitude and recover the other from u v = -p/3
        let s = discriminant.sqrt();
        let u = if q >= 0.0 {
            (-half_q - s).cbrt()
        } else {
            (-half_q + s).cbrt()
        };
        let v = if u == 0.0 { 0.0 } else { -third_p / u };
        vec![u + v]
    } else if p == 0.0 {
        vec![0.0]
    } else {
        let radius = 2.0 * (-third_p).sqrt();
        let cosine = (3.0 * q / (2.0 * p) * (-3.0 / p).sqrt()).clamp(-1.0, 1.0);
        let phi = cosine.acos() / 3.0;
        (0..3)
            .map(|k| radius * (phi - 2.0 * PI * f64::from(k) / 3.0).cos())
            .collect()
    };

    for root in &mut roots {
        *root = newton_polish(*root, p, q);
    }
    roots
}

fn newton_polish(mut x: f64, p: f64, q: f64) -> f64 {
    let cubic = |x: f64| x * x * x + p * x + q;
    let mut residual = cubic(x);
    for _ in 0..NEWTON_POLISH_STEPS {
        let slope = 3.0 * x * x + p;
        if residual == 0.0 || slope == 0.0 || !slope.is_finite() {
            break;
        }
        let next = x - residual / slope;
        let next_residual = cubic(next);
        if !next.is_finite() || next_residual.abs() >= residual.abs() {
            break;
        }
        x = next;
        residual = next_residual;
    }
    x
}

fn debug_check(choice: &PivotChoice, alpha: f64, bounds: &PivotBounds) {
    debug_assert!(choice.omega >= 0.0, "omega must be non-negative: {choice:?}");
    debug_assert!(
        !(choice.penalty < 0.0),
        "penalty must be non-negative: {choice:?}"
    );
    debug_assert!(
        bounds.min_diag_d <= choice.d && choice.d <= bounds.max_diag_d,
        "d outside [min_diag_d, max_diag_d]: {choice:?} {bounds:?}"
    );
    debug_assert!(
        choice.d == 0.0 || choice.d >= bounds.min_abs_value_d,
        "non-zero d below min_abs_value_d: {choice:?} {bounds:?}"
    );
    if choice.penalty.is_finite() {
        let diagonal = choice.d + choice.omega * choice.omega * alpha;
        let slack = BOUND_SLACK * (1.0 + diagonal.abs());
        debug_assert!(
            bounds.min_diag_b - slack <= diagonal && diagonal <= bounds.max_diag_b + slack,
            "d + omega^2 alpha = {diagonal} outside diagonal bounds: {choice:?} {bounds:?}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol * (1.0 + b.abs())
    }

    #[test]
    fn interior_keeps_gamma_minus_alpha() {
        let choice = minimal_change(1.0, 2.0, 3.0, &PivotBounds::default());
        assert_eq!(choice.case, PivotCase::Interior);
        assert_eq!(choice.d, 2.0);
        assert_eq!(choice.omega, 1.0);
        assert_eq!(choice.penalty, 0.0);
    }

    #[test]
    fn interior_zero_pivot_allowed_when_min_diag_d_is_zero() {
        let choice = minimal_change(0.0, 8.0, 0.0, &PivotBounds::default());
        assert_eq!(choice.case, PivotCase::Interior);
        assert_eq!(choice.d, 0.0);
        assert_eq!(choice.penalty, 0.0);
    }

    #[test]
    fn no_history_snaps_tiny_gamma_to_zero() {
        let bounds = PivotBounds {
            min_abs_value_d: 1e-3,
            ..PivotBounds::default()
        };
        let choice = minimal_change(0.0, 0.0, 1e-4, &bounds);
        assert_eq!(choice.case, PivotCase::NoHistory);
        assert_eq!(choice.d, 0.0);
        assert!(close(choice.penalty, 1e-8, 1e-12));
    }

    #[test]
    fn no_history_raises_to_min_abs_value() {
        let bounds = PivotBounds {
            min_abs_value_d: 1e-3,
            ..PivotBounds::default()
        };
        let choice = minimal_change(0.0, 0.0, 8e-4, &bounds);
        assert_eq!(choice.case, PivotCase::NoHistory);
        assert_eq!(choice.d, 1e-3);
    }

    #[test]
    fn no_history_clamps_into_diagonal_bounds() {
        let bounds = PivotBounds {
            min_diag_d: 1.0,
            max_diag_d: 4.0,
            ..PivotBounds::default()
        };
        let low = minimal_change(0.0, 3.0, -2.0, &bounds);
        assert_eq!(low.d, 1.0);
        assert_eq!(low.omega, 1.0);
        assert!(close(low.penalty, 9.0, 1e-15));

        let high = minimal_change(0.0, 3.0, 7.0, &bounds);
        assert_eq!(high.d, 4.0);
        assert!(close(high.penalty, 9.0, 1e-15));
    }

    #[test]
    fn boundary_compensates_with_omega_below_one() {
        // second pivot of [[0, 2], [2, 0]] after the first pivot was lifted to 1
        let bounds = PivotBounds {
            min_diag_d: 1.0,
            ..PivotBounds::default()
        };
        let choice = minimal_change(4.0, 8.0, 0.0, &bounds);
        assert_eq!(choice.case, PivotCase::Boundary);
        assert_eq!(choice.d, 1.0);
        assert!(choice.omega > 0.0 && choice.omega < 1.0);
        // stationary point of 32 w^3 + 16 w - 8
        let residual = 32.0 * choice.omega.powi(3) + 16.0 * choice.omega - 8.0;
        assert!(residual.abs() < 1e-10, "residual {residual}");
        assert!(choice.penalty > 0.0);
        assert!(close(
            choice.penalty,
            penalty(4.0, 8.0, 0.0, choice.d, choice.omega),
            1e-15
        ));
    }

    #[test]
    fn boundary_respects_max_diag_b() {
        let bounds = PivotBounds {
            max_diag_b: 2.0,
            min_diag_d: 0.5,
            ..PivotBounds::default()
        };
        // interior d = 5 - 1 = 4 violates d + alpha <= 2
        let choice = minimal_change(1.0, 1.0, 5.0, &bounds);
        assert_eq!(choice.case, PivotCase::Boundary);
        let diagonal = choice.d + choice.omega * choice.omega;
        assert!(diagonal <= 2.0 + 1e-12);
        assert!(choice.d >= 0.5);
    }

    #[test]
    fn boundary_is_no_worse_than_grid_search() {
        let bounds = PivotBounds {
            min_diag_d: 0.1,
            max_diag_d: 3.0,
            min_diag_b: 0.5,
            max_diag_b: 4.0,
            min_abs_value_d: 0.1,
        };
        let (alpha, beta, gamma) = (2.5, 1.5, -1.0);
        let choice = minimal_change(alpha, beta, gamma, &bounds);
        let mut best = f64::INFINITY;
        for i in 0..=300 {
            let d = 0.1 + 2.9 * f64::from(i) / 300.0;
            for k in 0..=300 {
                let omega = 2.0 * f64::from(k) / 300.0;
                let b = d + omega * omega * alpha;
                if (0.5..=4.0).contains(&b) {
                    best = best.min(penalty(alpha, beta, gamma, d, omega));
                }
            }
        }
        assert!(choice.penalty <= best + 1e-9, "{} > {best}", choice.penalty);
    }

    #[test]
    fn ties_prefer_larger_d_then_smaller_omega() {
        let base = PivotChoice {
            d: 1.0,
            omega: 0.5,
            penalty: 2.0,
            case: PivotCase::Boundary,
        };
        let larger_d = PivotChoice { d: 2.0, ..base };
        let larger_omega = PivotChoice { omega: 0.9, ..base };
        assert_eq!(compare_choices(&larger_d, &base), Ordering::Less);
        assert_eq!(compare_choices(&base, &larger_omega), Ordering::Less);
        let nan = PivotChoice {
            penalty: f64::NAN,
            ..base
        };
        let huge = PivotChoice {
            penalty: 1e300,
            ..base
        };
        assert_eq!(compare_choices(&huge, &nan), Ordering::Less);
    }

    #[test]
    fn cubic_single_real_root() {
        // x^3 + x - 2 = (x - 1)(x^2 + x + 2)
        let roots = depressed_cubic_roots(1.0, -2.0);
        assert_eq!(roots.len(), 1);
        assert!(close(roots[0], 1.0, 1e-14));
    }

    #[test]
    fn cubic_three_real_roots() {
        // x^3 - 7x + 6 = (x - 1)(x - 2)(x + 3)
        let mut roots = depressed_cubic_roots(-7.0, 6.0);
        roots.sort_by(f64::total_cmp);
        assert_eq!(roots.len(), 3);
        for (root, expected) in roots.iter().zip([-3.0, 1.0, 2.0]) {
            assert!(close(*root, expected, 1e-12), "{root} vs {expected}");
        }
    }

    #[test]
    fn cubic_triple_root_at_zero() {
        assert_eq!(depressed_cubic_roots(0.0, 0.0), vec![0.0]);
    }
}
