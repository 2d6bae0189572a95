//! Complex arithmetic primitives.
//!
//! Addition, subtraction, and multiplication come straight from
//! `num_complex::Complex`; the functions here cover division and the
//! impedance combinators, all of which carry a denominator that the caller
//! can drive to zero. Those degenerate inputs return an error rather than
//! silently producing non-finite values.

use num_complex::Complex;

use crate::error::{CwError, Result};

/// Complex baseband sample: an ordered (re, im) pair at double precision.
pub type ComplexSample = Complex<f64>;

/// Magnitude of a complex value.
#[inline]
pub fn magnitude(z: ComplexSample) -> f64 {
    z.norm()
}

/// Complex division a/b, rejecting a zero divisor.
pub fn divide(a: ComplexSample, b: ComplexSample) -> Result<ComplexSample> {
    if b.re == 0.0 && b.im == 0.0 {
        return Err(CwError::DivisionByZero);
    }
    Ok(a / b)
}

/// Equivalent impedance of two elements in parallel: Z1*Z2 / (Z1 + Z2).
pub fn parallel_combine(z1: ComplexSample, z2: ComplexSample) -> Result<ComplexSample> {
    divide(z1 * z2, z1 + z2).map_err(|_| {
        CwError::DegenerateImpedance("parallel combination of impedances summing to zero")
    })
}

/// Decompose a series impedance into its parallel equivalents.
///
/// Returns `(r_parallel, x_parallel)` where `r_parallel = |Z|^2 / Re(Z)` is
/// the parallel resistive element and `x_parallel = |Z|^2 / Im(Z)` the
/// parallel reactive element. Undefined when the corresponding series
/// component is exactly zero.
pub fn series_to_parallel(z: ComplexSample) -> Result<(f64, f64)> {
    if z.re == 0.0 {
        return Err(CwError::DegenerateImpedance(
            "series impedance has no resistive component",
        ));
    }
    if z.im == 0.0 {
        return Err(CwError::DegenerateImpedance(
            "series impedance has no reactive component",
        ));
    }
    let norm_sqr = z.norm_sqr();
    Ok((norm_sqr / z.re, norm_sqr / z.im))
}
