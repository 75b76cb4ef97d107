#![no_main]

use arbitrary::Arbitrary;
use ldla_approx::{ApproximationOptions, HermitianStorage, approximate_matrix};
use ldla_runtime::RuntimeMode;
use libfuzzer_sys::fuzz_target;
use nalgebra::DMatrix;

#[derive(Debug, Arbitrary)]
struct DenseInput {
    n: u8,
    min_diag_d: u8,
    values: Vec<i16>,
}

fuzz_target!(|input: DenseInput| {
    let n = usize::from(input.n % 8);
    let mut matrix = DMatrix::<f64>::zeros(n, n);
    let mut values = input.values.iter().map(|&v| f64::from(v) / 64.0);
    for i in 0..n {
        for j in i..n {
            let value = values.next().unwrap_or(0.0);
            matrix[(i, j)] = value;
            matrix[(j, i)] = value;
        }
    }
    let options = ApproximationOptions {
        mode: RuntimeMode::Hardened,
        min_diag_d: Some(f64::from(input.min_diag_d) / 32.0),
        ..ApproximationOptions::default()
    };
    let b = approximate_matrix(HermitianStorage::Dense(matrix), &options)
        .expect("symmetric finite input with valid bounds")
        .to_dense();
    assert_eq!(b, b.transpose());
});
