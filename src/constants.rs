//! Numeric constants for the CW filter designs
//!
//! These constants define the fixed design parameters shared by the
//! double-pole, Gaussian, and matched filter builders.

/// Bandwidth compensation divisor for the double-pole designs.
/// The operator-entered bandwidth is divided by this factor so the
/// resulting -3 dB width matches the other filter technologies.
pub const DPOLE_BW_COMPENSATION: f64 = 1.7;

/// Conversion factor from FWHM bandwidth to Gaussian standard deviation,
/// 2*sqrt(2*ln 2).
pub const FWHM_TO_SIGMA: f64 = 2.35482;

/// Approximate time-bandwidth product of a matched CW pulse; sets the
/// matched filter's tap count as a function of sample rate and FWHM.
pub const MATCHED_TIME_BANDWIDTH: f64 = 1.2067;

/// Minimum tap count for the double-pole impulse response.
pub const MIN_DPOLE_TAPS: usize = 2048;

/// Minimum tap count for the Gaussian impulse response.
pub const MIN_GAUSSIAN_TAPS: usize = 1024;

/// Minimum padded field size for the matched impulse response.
pub const MIN_MATCHED_TAPS: usize = 1024;

/// Base tap count of the double-pole budget, multiplied by the rate and
/// bandwidth factors in `calc_dpole_nc`.
pub const DPOLE_BASE_TAPS: usize = 256;

/// Sample-rate granularity of the double-pole tap budget.
pub const DPOLE_RATE_STEP: u32 = 12_000;

/// Full span in Hz of the frequency window evaluated by the response-based
/// double-pole design variants (+/- half of this around DC).
pub const DPOLE_DESIGN_SPAN_HZ: f64 = 3000.0;

/// Zero-pad multiple applied before the analytic-signal conversion in the
/// one-sided double-pole variant, to suppress circular wraparound.
pub const ANALYTIC_PAD_FACTOR: usize = 8;
