use std::f64::consts::TAU;

use approx::assert_relative_eq;
use cwpeak::ComplexSample;
use cwpeak::config::{CwMode, DoublePoleConfig, GaussianConfig, MatchedConfig};
use cwpeak::cw::{DoublePole, Gaussian, Matched};

const RATE: u32 = 48_000;
const F_CENTER: f64 = 600.0;
const BLOCK: usize = 512;

/// Complex tone at `freq` Hz, `len` samples.
fn tone(freq: f64, len: usize) -> Vec<ComplexSample> {
    (0..len)
        .map(|i| ComplexSample::from_polar(1.0, TAU * freq * i as f64 / RATE as f64))
        .collect()
}

/// Run `signal` through the filter in blocks and return the steady-state
/// magnitude averaged over the final block.
fn steady_state_magnitude(
    signal: &[ComplexSample],
    mut process: impl FnMut(&mut [ComplexSample]),
) -> f64 {
    let mut buf = signal.to_vec();
    for block in buf.chunks_mut(BLOCK) {
        process(block);
    }
    let tail = &buf[buf.len() - BLOCK..];
    tail.iter().map(|s| s.norm()).sum::<f64>() / BLOCK as f64
}

#[test]
fn test_gaussian_passes_center_tone_at_configured_gain() {
    let config = GaussianConfig {
        run: true,
        size: BLOCK,
        gain: 1.5,
        ..GaussianConfig::default()
    };
    let mut filter = Gaussian::new(&config).unwrap();
    let n = filter.tap_count() * 4;

    let passed = steady_state_magnitude(&tone(F_CENTER, n), |b| filter.process(b, 0));
    assert_relative_eq!(passed, config.gain, max_relative = 0.01);

    filter.flush();
    let stopped = steady_state_magnitude(&tone(F_CENTER + 2000.0, n), |b| filter.process(b, 0));
    assert!(
        stopped < 1e-3,
        "tone 2 kHz off center not attenuated: {stopped}"
    );
}

#[test]
fn test_double_pole_passes_center_tone_near_configured_gain() {
    let config = DoublePoleConfig {
        run: true,
        size: BLOCK,
        ..DoublePoleConfig::default()
    };
    let mut filter = DoublePole::new(&config).unwrap();
    let n = filter.tap_count() * 4;

    let passed = steady_state_magnitude(&tone(F_CENTER, n), |b| filter.process(b, 0));
    assert_relative_eq!(passed, config.gain, max_relative = 0.01);

    filter.flush();
    let skirt = steady_state_magnitude(&tone(F_CENTER + 2000.0, n), |b| filter.process(b, 0));
    assert!(skirt < 0.05, "resonator skirt too high: {skirt}");
}

#[test]
fn test_matched_passes_center_tone_at_configured_gain() {
    let config = MatchedConfig {
        run: true,
        size: BLOCK,
        gain: 0.5,
        ..MatchedConfig::default()
    };
    let mut filter = Matched::new(&config).unwrap();
    let n = filter.tap_count() * 4;

    let passed = steady_state_magnitude(&tone(F_CENTER, n), |b| filter.process(b, 0));
    assert_relative_eq!(passed, config.gain, max_relative = 0.01);

    filter.flush();
    let sidelobe = steady_state_magnitude(&tone(F_CENTER + 2000.0, n), |b| filter.process(b, 0));
    assert!(sidelobe < 0.05, "matched sidelobe too high: {sidelobe}");
}

#[test]
fn test_upper_sideband_mode_passes_mirrored_tone() {
    let config = GaussianConfig {
        run: true,
        size: BLOCK,
        mode: CwMode::Upper,
        ..GaussianConfig::default()
    };
    let mut filter = Gaussian::new(&config).unwrap();
    let n = filter.tap_count() * 4;

    // the CWU transform mirrors the spectrum, so the opposite sideband
    // lands on the filter's passband
    let passed = steady_state_magnitude(&tone(-F_CENTER, n), |b| filter.process(b, 0));
    assert_relative_eq!(passed, config.gain, max_relative = 0.01);

    filter.flush();
    let stopped = steady_state_magnitude(&tone(F_CENTER, n), |b| filter.process(b, 0));
    assert!(stopped < 1e-3, "unmirrored tone not attenuated: {stopped}");
}

#[test]
fn test_retune_while_streaming_moves_the_passband() {
    let config = GaussianConfig {
        run: true,
        size: BLOCK,
        ..GaussianConfig::default()
    };
    let mut filter = Gaussian::new(&config).unwrap();
    let n = filter.tap_count() * 4;

    let at_600 = steady_state_magnitude(&tone(600.0, n), |b| filter.process(b, 0));
    assert_relative_eq!(at_600, 1.0, max_relative = 0.01);

    // retune mid-stream; same tap count, so this is a coefficient hot-swap
    filter.recompute(800.0, 100.0, 1.0).unwrap();
    filter.flush();

    let n = filter.tap_count() * 4;
    let at_800 = steady_state_magnitude(&tone(800.0, n), |b| filter.process(b, 0));
    assert_relative_eq!(at_800, 1.0, max_relative = 0.01);

    let old_band = steady_state_magnitude(&tone(600.0, n), |b| filter.process(b, 0));
    assert!(old_band < 1e-3, "old passband still open: {old_band}");
}
