//! Configuration for the CW receive-filter subsystem.
//!
//! ## Pipeline position
//!
//! Each filter carries a `position` slot identifying where in the per-block
//! receive pipeline it participates. The real-time caller passes the current
//! slot to `process_block`; a filter only runs when its own slot matches.

/// CW sideband mode
///
/// Selects the spectral transform applied to each block before convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CwMode {
    /// Lower sideband (CWL); the block passes through unchanged
    Lower,
    /// Upper sideband (CWU); the imaginary component of every sample is
    /// negated (spectral mirror)
    Upper,
    /// Both sidebands (CWL+CWU); every sample's imaginary component is
    /// overwritten with its real component, folding both sidebands onto one
    /// real-driven detection path
    Both,
}

/// CW filter technology
///
/// Exactly one technology runs per receive channel at any instant; the
/// selector enforces the exclusivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CwTechnology {
    /// Double-pole resonator (closed-form single-exponential impulse)
    DoublePole,
    /// Matched filter (time-bandwidth-optimal constant-amplitude tone)
    Matched,
    /// Gaussian-windowed bandpass
    Gaussian,
    /// Recursive biquad; signal path external, control surface only
    BiQuad,
}

/// Placement of the matched impulse within its padded field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpulsePlacement {
    /// Nonzero taps occupy the left edge of the padded field
    LeftJustified,
    /// Nonzero taps are centered in the padded field
    Centered,
}

/// System-wide CW filter configuration
///
/// One instance per receive channel. Use `CwConfig::default()` for a
/// workable CW setup (48 kHz, 600 Hz pitch, 100 Hz bandwidth).
#[derive(Debug, Clone, Default)]
pub struct CwConfig {
    /// Double-pole filter configuration
    pub double_pole: DoublePoleConfig,
    /// Matched filter configuration
    pub matched: MatchedConfig,
    /// Gaussian filter configuration
    pub gaussian: GaussianConfig,
    /// BiQuad control-shadow configuration
    pub biquad: BiQuadConfig,
    /// Selector initial state
    pub selector: SelectorConfig,
}

/// Double-pole filter configuration
#[derive(Debug, Clone)]
pub struct DoublePoleConfig {
    /// Whether the filter starts enabled
    pub run: bool,
    /// Pipeline slot this stage participates in
    pub position: usize,
    /// Block length in complex samples
    pub size: usize,
    /// Center frequency in Hz
    pub f_center: f64,
    /// Bandwidth in Hz
    pub bandwidth: f64,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Linear passband gain
    pub gain: f64,
    /// Sideband mode
    pub mode: CwMode,
}

/// Gaussian filter configuration
#[derive(Debug, Clone)]
pub struct GaussianConfig {
    /// Whether the filter starts enabled
    pub run: bool,
    /// Pipeline slot this stage participates in
    pub position: usize,
    /// Block length in complex samples
    pub size: usize,
    /// Requested tap count; 0 derives it from the bandwidth on every
    /// rebuild (auto-sizing), a nonzero power of two pins it
    pub tap_count: usize,
    /// Center frequency in Hz
    pub f_center: f64,
    /// FWHM bandwidth in Hz
    pub bandwidth: f64,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Linear passband gain
    pub gain: f64,
    /// Window half-width in standard deviations
    pub nsigma: f64,
    /// Sideband mode
    pub mode: CwMode,
}

/// Matched filter configuration
#[derive(Debug, Clone)]
pub struct MatchedConfig {
    /// Whether the filter starts enabled
    pub run: bool,
    /// Pipeline slot this stage participates in
    pub position: usize,
    /// Block length in complex samples
    pub size: usize,
    /// Center frequency in Hz
    pub f_center: f64,
    /// FWHM bandwidth in Hz
    pub bandwidth: f64,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Linear passband gain
    pub gain: f64,
    /// Placement of the impulse within its padded field
    pub placement: ImpulsePlacement,
    /// Sideband mode
    pub mode: CwMode,
}

/// BiQuad control-shadow configuration
///
/// The recursive biquad signal path lives outside this crate; only the
/// control state the selector drives is held here.
#[derive(Debug, Clone)]
pub struct BiQuadConfig {
    /// Whether the filter starts enabled
    pub run: bool,
    /// Center frequency in Hz
    pub f_center: f64,
    /// Bandwidth in Hz
    pub bandwidth: f64,
    /// Linear passband gain
    pub gain: f64,
}

/// Selector initial state
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Technology initially selected
    pub technology: CwTechnology,
    /// Whether the selected technology starts enabled
    pub run: bool,
    /// Operator-visible center frequency in Hz
    pub f_center: f64,
    /// Operator-visible bandwidth in Hz
    pub bandwidth: f64,
    /// Operator-visible gain; the selector applies per-technology
    /// calibration before forwarding
    pub gain: f64,
}

impl Default for DoublePoleConfig {
    fn default() -> Self {
        Self {
            run: false,
            position: 0,
            size: 1024,
            f_center: 600.0,
            bandwidth: 100.0,
            sample_rate: 48_000,
            gain: 1.0,
            mode: CwMode::Lower,
        }
    }
}

impl Default for GaussianConfig {
    fn default() -> Self {
        Self {
            run: false,
            position: 0,
            size: 1024,
            tap_count: 0,
            f_center: 600.0,
            bandwidth: 100.0,
            sample_rate: 48_000,
            gain: 1.0,
            nsigma: 4.0,
            mode: CwMode::Lower,
        }
    }
}

impl Default for MatchedConfig {
    fn default() -> Self {
        Self {
            run: false,
            position: 0,
            size: 1024,
            f_center: 600.0,
            bandwidth: 100.0,
            sample_rate: 48_000,
            gain: 1.0,
            placement: ImpulsePlacement::LeftJustified,
            mode: CwMode::Lower,
        }
    }
}

impl Default for BiQuadConfig {
    fn default() -> Self {
        Self {
            run: false,
            f_center: 600.0,
            bandwidth: 100.0,
            gain: 1.0,
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            technology: CwTechnology::DoublePole,
            run: false,
            f_center: 600.0,
            bandwidth: 100.0,
            gain: 1.0,
        }
    }
}
