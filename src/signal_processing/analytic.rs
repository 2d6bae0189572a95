//! Analytic-signal (Hilbert transform) conversion.

use num_complex::Complex;
use rustfft::FftPlanner;

use crate::signal_processing::ComplexSample;

/// Convert a real-valued buffer to its analytic signal in place.
///
/// The input occupies the real components; imaginary components are
/// overwritten. The spectrum is made one-sided by zeroing the
/// negative-frequency half and doubling the positive half, keeping DC and
/// Nyquist unscaled. Callers zero-pad ahead of time when circular
/// wraparound matters.
pub fn analytic(buf: &mut [ComplexSample]) {
    let n = buf.len();
    if n < 2 {
        return;
    }
    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_forward(n).process(buf);

    let half = n / 2;
    for bin in &mut buf[1..half] {
        *bin *= 2.0;
    }
    // bin `half` is Nyquist for even n and stays unscaled
    for bin in &mut buf[half + 1..] {
        *bin = Complex::new(0.0, 0.0);
    }

    planner.plan_fft_inverse(n).process(buf);
    let norm = 1.0 / n as f64;
    for sample in buf.iter_mut() {
        *sample *= norm;
    }
}
