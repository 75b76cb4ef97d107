#![no_main]

use arbitrary::Arbitrary;
use ldla_approx::{PivotBounds, minimal_change};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct PivotInput {
    alpha: f64,
    beta: f64,
    gamma: f64,
    min_diag_d: f64,
    span_d: f64,
    min_diag_b: f64,
    span_b: f64,
}

fn finite_abs(value: f64, cap: f64) -> f64 {
    if value.is_finite() { value.abs().min(cap) } else { 0.0 }
}

fuzz_target!(|input: PivotInput| {
    let alpha = finite_abs(input.alpha, 1e6);
    // alpha > 0 needs beta > 0
    let beta = finite_abs(input.beta, 1e6).max(if alpha > 0.0 { 1e-6 } else { 0.0 });
    let gamma = if input.gamma.is_finite() { input.gamma.clamp(-1e6, 1e6) } else { 0.0 };
    let min_diag_d = finite_abs(input.min_diag_d, 1e3);
    let min_diag_b = if input.min_diag_b.is_finite() {
        input.min_diag_b.clamp(-1e3, min_diag_d)
    } else {
        f64::NEG_INFINITY
    };
    let bounds = PivotBounds {
        min_diag_d,
        max_diag_d: min_diag_d + 1.0 + finite_abs(input.span_d, 1e3),
        min_diag_b,
        max_diag_b: min_diag_d + 1.0 + finite_abs(input.span_b, 1e3),
        ..PivotBounds::default()
    };

    let choice = minimal_change(alpha, beta, gamma, &bounds);
    assert!(choice.d.is_finite() && choice.omega.is_finite());
    assert!(choice.d >= bounds.min_diag_d && choice.d <= bounds.max_diag_d);
});
