#![forbid(unsafe_code)]

use ldla_runtime::RuntimeMode;

use crate::error::{ApproxError, ApproxResult};
use crate::pivot::PivotBounds;
use crate::scalar::HermitianScalar;
use crate::view::MatrixRead;

pub const EPS: f64 = f64::EPSILON;

/// Relative tolerance of the conjugate-symmetry check in hardened mode.
pub const HERMITIAN_RTOL: f64 = 1e-12;

/// A bound on the diagonal of the approximation: one value for every index,
/// or one value per index.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl BoundValue {
    /// The bound at `index`.
    #[must_use]
    pub fn at(&self, index: usize) -> f64 {
        match self {
            Self::Scalar(value) => *value,
            Self::Vector(values) => values[index],
        }
    }

    fn values(&self) -> &[f64] {
        match self {
            Self::Scalar(value) => std::slice::from_ref(value),
            Self::Vector(values) => values,
        }
    }

    fn max_value(&self) -> f64 {
        self.values().iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    fn min_value(&self) -> f64 {
        self.values().iter().copied().fold(f64::INFINITY, f64::min)
    }

    fn len_if_vector(&self) -> Option<usize> {
        match self {
            Self::Scalar(_) => None,
            Self::Vector(values) => Some(values.len()),
        }
    }
}

impl From<f64> for BoundValue {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<f64>> for BoundValue {
    fn from(values: Vec<f64>) -> Self {
        Self::Vector(values)
    }
}

impl From<&[f64]> for BoundValue {
    fn from(values: &[f64]) -> Self {
        Self::Vector(values.to_vec())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundWarning {
    MinAbsValueRaised { minimum: f64 },
}

/// Bound configuration after defaulting and consistency checks.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBounds {
    pub min_diag_b: BoundValue,
    pub max_diag_b: BoundValue,
    pub min_diag_d: f64,
    pub max_diag_d: f64,
    pub min_abs_value_d: f64,
    pub mode: RuntimeMode,
    pub warnings: Vec<BoundWarning>,
}

impl ValidatedBounds {
    /// Bounds seen by the pivot solver for original index `index`.
    #[must_use]
    pub fn pivot_bounds(&self, index: usize) -> PivotBounds {
        PivotBounds {
            min_diag_d: self.min_diag_d,
            max_diag_d: self.max_diag_d,
            min_diag_b: self.min_diag_b.at(index),
            max_diag_b: self.max_diag_b.at(index),
            min_abs_value_d: self.min_abs_value_d,
        }
    }

    /// Clamp a diagonal value of the approximation into `[min_diag_b, max_diag_b]` at `index`.
    #[must_use]
    pub fn clamp_diag(&self, index: usize, value: f64) -> f64 {
        value
            .max(self.min_diag_b.at(index))
            .min(self.max_diag_b.at(index))
    }
}

/// Default and check the bound configuration for an `n x n` matrix.
///
/// Defaults: `min_diag_b = -inf`, `max_diag_b = +inf`, `min_diag_d = 0`,
/// `max_diag_d = +inf`, `min_abs_value_d = sqrt(eps)`. The smallest-absolute
/// value is raised to at least `eps`.
pub fn validate_bounds(
    n: usize,
    min_diag_b: Option<&BoundValue>,
    max_diag_b: Option<&BoundValue>,
    min_diag_d: Option<f64>,
    max_diag_d: Option<f64>,
    min_abs_value_d: Option<f64>,
    mode: RuntimeMode,
) -> ApproxResult<ValidatedBounds> {
    let min_diag_b = check_bound_vector(
        "min_diag_b",
        min_diag_b,
        n,
        f64::NEG_INFINITY,
        |v| v.is_finite() || v == f64::NEG_INFINITY,
    )?;
    let max_diag_b = check_bound_vector(
        "max_diag_b",
        max_diag_b,
        n,
        f64::INFINITY,
        |v| v.is_finite() || v == f64::INFINITY,
    )?;

    let min_diag_d = check_bound_scalar("min_diag_d", min_diag_d, 0.0, Some(0.0), false)?;
    let max_diag_d = check_bound_scalar("max_diag_d", max_diag_d, f64::INFINITY, None, true)?;

    let lower = min_diag_b.max_value().max(min_diag_d);
    let upper = min_diag_b_upper(&max_diag_b, max_diag_d);
    if !(lower <= upper) {
        return Err(ApproxError::InconsistentBounds { lower, upper });
    }

    let mut warnings = Vec::new();
    let requested = check_bound_scalar(
        "min_abs_value_d",
        min_abs_value_d,
        EPS.sqrt(),
        Some(0.0),
        false,
    )?;
    let min_abs_value_d = if requested < EPS {
        warnings.push(BoundWarning::MinAbsValueRaised { minimum: EPS });
        EPS
    } else {
        requested
    };

    // The smallest admissible non-zero pivot must fit below every upper bound.
    let floor = min_diag_d.max(min_abs_value_d);
    if floor > upper {
        return Err(ApproxError::InconsistentBounds {
            lower: floor,
            upper,
        });
    }

    Ok(ValidatedBounds {
        min_diag_b,
        max_diag_b,
        min_diag_d,
        max_diag_d,
        min_abs_value_d,
        mode,
        warnings,
    })
}

fn min_diag_b_upper(max_diag_b: &BoundValue, max_diag_d: f64) -> f64 {
    max_diag_b.min_value().min(max_diag_d)
}

fn check_bound_vector(
    name: &'static str,
    value: Option<&BoundValue>,
    n: usize,
    default: f64,
    admissible: impl Fn(f64) -> bool,
) -> ApproxResult<BoundValue> {
    let Some(value) = value else {
        return Ok(BoundValue::Scalar(default));
    };
    if let Some(len) = value.len_if_vector()
        && len != n
    {
        return Err(ApproxError::BoundWrongShape {
            name,
            expected: n,
            actual: len,
        });
    }
    if let Some(&bad) = value.values().iter().find(|&&v| !admissible(v)) {
        return Err(ApproxError::BoundNotFinite { name, value: bad });
    }
    Ok(value.clone())
}

fn check_bound_scalar(
    name: &'static str,
    value: Option<f64>,
    default: f64,
    minimum: Option<f64>,
    plus_inf_okay: bool,
) -> ApproxResult<f64> {
    let Some(value) = value else {
        return Ok(default);
    };
    if !(value.is_finite() || (plus_inf_okay && value == f64::INFINITY)) {
        return Err(ApproxError::BoundNotFinite { name, value });
    }
    if let Some(minimum) = minimum
        && value < minimum
    {
        return Err(ApproxError::BoundBelowMinimum {
            name,
            minimum,
            value,
        });
    }
    Ok(value)
}

/// Side length of `matrix`, which must be square.
pub fn check_square<T, M: MatrixRead<T> + ?Sized>(matrix: &M) -> ApproxResult<usize> {
    let (rows, cols) = matrix.shape();
    if rows != cols {
        return Err(ApproxError::NotSquare { rows, cols });
    }
    Ok(rows)
}

/// The diagonal of `matrix` as real values. Fails on the first entry with a
/// non-zero imaginary part.
pub fn real_diagonal<T, M>(matrix: &M, n: usize) -> ApproxResult<Vec<f64>>
where
    T: HermitianScalar,
    M: MatrixRead<T> + ?Sized,
{
    (0..n)
        .map(|index| {
            let value = matrix.entry(index, index);
            let imaginary = value.imaginary();
            if imaginary != 0.0 {
                return Err(ApproxError::ComplexDiagonal { index, imaginary });
            }
            Ok(value.real())
        })
        .collect()
}

/// Hardened-mode entry checks: every stored entry finite, and every stored
/// off-diagonal entry conjugate to its mirror within [`HERMITIAN_RTOL`].
pub fn check_entries<T, M>(matrix: &M) -> ApproxResult<()>
where
    T: HermitianScalar,
    M: MatrixRead<T> + ?Sized,
{
    let mut failure = None;
    matrix.for_each_stored(&mut |row, col, value| {
        if failure.is_none() && !value.is_finite() {
            failure = Some(ApproxError::NonFiniteInput { row, col });
        }
    });
    if let Some(error) = failure {
        return Err(error);
    }

    matrix.for_each_stored(&mut |row, col, value| {
        if failure.is_some() || row == col {
            return;
        }
        let mirror = matrix.entry(col, row);
        let scale = value.modulus().max(mirror.modulus());
        if (value - mirror.conjugate()).modulus() > HERMITIAN_RTOL * scale {
            failure = Some(ApproxError::NotHermitian {
                row: row.min(col),
                col: row.max(col),
            });
        }
    });
    failure.map_or(Ok(()), Err)
}
