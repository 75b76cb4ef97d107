#![no_main]

use arbitrary::Arbitrary;
use ldla_approx::{BoundValue, validate_bounds};
use ldla_runtime::RuntimeMode;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct ValidateBoundsInput {
    n: u8,
    hardened: bool,
    min_b_vector: bool,
    max_b_vector: bool,
    min_b_values: Vec<f64>,
    max_b_values: Vec<f64>,
    min_diag_d: Option<f64>,
    max_diag_d: Option<f64>,
    min_abs_value_d: Option<f64>,
}

fn build_value(as_vector: bool, values: &[f64]) -> Option<BoundValue> {
    let clipped = values.iter().copied().take(8).collect::<Vec<_>>();
    if as_vector {
        Some(BoundValue::Vector(clipped))
    } else {
        clipped.first().copied().map(BoundValue::Scalar)
    }
}

fuzz_target!(|input: ValidateBoundsInput| {
    let mode = if input.hardened {
        RuntimeMode::Hardened
    } else {
        RuntimeMode::Strict
    };
    let min_b = build_value(input.min_b_vector, &input.min_b_values);
    let max_b = build_value(input.max_b_vector, &input.max_b_values);
    if let Ok(bounds) = validate_bounds(
        usize::from(input.n % 8),
        min_b.as_ref(),
        max_b.as_ref(),
        input.min_diag_d,
        input.max_diag_d,
        input.min_abs_value_d,
        mode,
    ) {
        assert!(bounds.min_diag_d <= bounds.max_diag_d);
        assert!(bounds.min_abs_value_d >= f64::EPSILON);
    }
});
