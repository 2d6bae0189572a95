//! Receive channels and the per-process channel registry.
//!
//! Each channel owns one coarse mutex guarding both the control-plane
//! setters and the real-time block-processing call. Serializing both under
//! the same lock makes a coefficient rebuild-and-swap atomic with respect
//! to sample processing; the audio thread never observes a torn
//! coefficient set. The lock is never re-entered and every critical
//! section is flat.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use log::info;

use crate::config::{CwConfig, CwTechnology};
use crate::cw::{BiQuad, DoublePole, Gaussian, Matched};
use crate::error::{CwError, Result};
use crate::selector::CwSelector;
use crate::signal_processing::ComplexSample;

/// The four CW filter instances of one receive channel.
///
/// The instances are independent and unaware of each other; the selector
/// enforces that at most one runs.
pub struct CwFilterBank {
    pub double_pole: DoublePole,
    pub matched: Matched,
    pub gaussian: Gaussian,
    pub biquad: BiQuad,
}

impl CwFilterBank {
    pub fn new(config: &CwConfig) -> Result<Self> {
        Ok(Self {
            double_pole: DoublePole::new(&config.double_pole)?,
            matched: Matched::new(&config.matched)?,
            gaussian: Gaussian::new(&config.gaussian)?,
            biquad: BiQuad::new(&config.biquad),
        })
    }
}

struct CwChain {
    bank: CwFilterBank,
    selector: CwSelector,
}

/// One receive channel: the CW filter bank, the selector, and the coarse
/// lock that serializes control against the real-time path.
pub struct RxChannel {
    chain: Mutex<CwChain>,
}

impl RxChannel {
    pub fn new(config: &CwConfig) -> Result<Self> {
        Ok(Self {
            chain: Mutex::new(CwChain {
                bank: CwFilterBank::new(config)?,
                selector: CwSelector::new(&config.selector),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, CwChain> {
        // a panicked control call must not silence the audio path; the
        // chain is structurally valid regardless of poisoning
        self.chain.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Real-time entry point: run every filter's gated process call on the
    /// block, in place, under the channel lock.
    pub fn process_block(&self, pos: usize, block: &mut [ComplexSample]) {
        let mut chain = self.lock();
        chain.bank.double_pole.process(block, pos);
        chain.bank.matched.process(block, pos);
        chain.bank.gaussian.process(block, pos);
    }

    /// Reset every engine's overlap history; call on stream
    /// discontinuities such as a band change.
    pub fn flush(&self) {
        let mut chain = self.lock();
        chain.bank.double_pole.flush();
        chain.bank.matched.flush();
        chain.bank.gaussian.flush();
    }

    /// Run a closure against the filter bank under the channel lock.
    pub fn with_bank<R>(&self, f: impl FnOnce(&CwFilterBank) -> R) -> R {
        f(&self.lock().bank)
    }

    pub fn cw_technology(&self) -> CwTechnology {
        self.lock().selector.technology()
    }

    pub fn set_cw_technology(&self, technology: CwTechnology) -> Result<()> {
        let mut guard = self.lock();
        let chain = &mut *guard;
        chain.selector.select(&mut chain.bank, technology)
    }

    pub fn set_cw_run(&self, run: bool) {
        let mut guard = self.lock();
        let chain = &mut *guard;
        chain.selector.set_run(&mut chain.bank, run);
    }

    pub fn set_cw_frequency(&self, f_center: f64) -> Result<()> {
        let mut guard = self.lock();
        let chain = &mut *guard;
        chain.selector.set_frequency(&mut chain.bank, f_center)
    }

    pub fn set_cw_bandwidth(&self, bandwidth: f64) -> Result<()> {
        let mut guard = self.lock();
        let chain = &mut *guard;
        chain.selector.set_bandwidth(&mut chain.bank, bandwidth)
    }

    pub fn set_cw_gain(&self, gain: f64) -> Result<()> {
        let mut guard = self.lock();
        let chain = &mut *guard;
        chain.selector.set_gain(&mut chain.bank, gain)
    }

    pub fn set_double_pole_run(&self, run: bool) {
        self.lock().bank.double_pole.set_run(run);
    }

    pub fn set_double_pole_freqs(&self, f_center: f64, bandwidth: f64) -> Result<()> {
        let mut chain = self.lock();
        let a = &mut chain.bank.double_pole;
        a.recompute(f_center, bandwidth, a.gain())
    }

    pub fn set_double_pole_gain(&self, gain: f64) -> Result<()> {
        let mut chain = self.lock();
        let a = &mut chain.bank.double_pole;
        a.recompute(a.f_center(), a.bandwidth(), gain)
    }

    pub fn set_matched_run(&self, run: bool) {
        self.lock().bank.matched.set_run(run);
    }

    pub fn set_matched_freqs(&self, f_center: f64, bandwidth: f64) -> Result<()> {
        let mut chain = self.lock();
        let a = &mut chain.bank.matched;
        a.recompute(f_center, bandwidth, a.gain())
    }

    pub fn set_matched_gain(&self, gain: f64) -> Result<()> {
        let mut chain = self.lock();
        let a = &mut chain.bank.matched;
        a.recompute(a.f_center(), a.bandwidth(), gain)
    }

    pub fn set_gaussian_run(&self, run: bool) {
        self.lock().bank.gaussian.set_run(run);
    }

    pub fn set_gaussian_freqs(&self, f_center: f64, bandwidth: f64) -> Result<()> {
        let mut chain = self.lock();
        let a = &mut chain.bank.gaussian;
        a.recompute(f_center, bandwidth, a.gain())
    }

    pub fn set_gaussian_gain(&self, gain: f64) -> Result<()> {
        let mut chain = self.lock();
        let a = &mut chain.bank.gaussian;
        a.recompute(a.f_center(), a.bandwidth(), gain)
    }

    pub fn set_gaussian_tap_count(&self, tap_count: usize) -> Result<()> {
        self.lock().bank.gaussian.set_tap_count(tap_count)
    }

    pub fn set_biquad_run(&self, run: bool) {
        self.lock().bank.biquad.set_run(run);
    }

    pub fn set_biquad_frequency(&self, f_center: f64) {
        self.lock().bank.biquad.set_frequency(f_center);
    }

    pub fn set_biquad_bandwidth(&self, bandwidth: f64) {
        self.lock().bank.biquad.set_bandwidth(bandwidth);
    }

    pub fn set_biquad_gain(&self, gain: f64) {
        self.lock().bank.biquad.set_gain(gain);
    }
}

/// Per-process registry of receive channels, keyed by channel id.
///
/// The map lock is only written at channel setup and teardown; audio
/// threads resolve their channel once (or per block, read-locked) and the
/// channel's own mutex does the real serialization.
pub struct ChannelRegistry {
    channels: RwLock<HashMap<usize, Arc<RxChannel>>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Create a channel's filter bank and register it under `id`,
    /// replacing any previous channel with the same id.
    pub fn open_channel(&self, id: usize, config: &CwConfig) -> Result<Arc<RxChannel>> {
        let channel = Arc::new(RxChannel::new(config)?);
        self.channels
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, Arc::clone(&channel));
        info!("opened receive channel {id}");
        Ok(channel)
    }

    /// Drop the registry's reference to channel `id`. The filter bank is
    /// released once the last audio-thread reference goes away.
    pub fn close_channel(&self, id: usize) -> Result<()> {
        self.channels
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
            .map(|_| info!("closed receive channel {id}"))
            .ok_or(CwError::UnknownChannel(id))
    }

    pub fn channel(&self, id: usize) -> Result<Arc<RxChannel>> {
        self.channels
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
            .ok_or(CwError::UnknownChannel(id))
    }

    pub fn process_block(&self, id: usize, pos: usize, block: &mut [ComplexSample]) -> Result<()> {
        self.channel(id)?.process_block(pos, block);
        Ok(())
    }

    pub fn set_cw_technology(&self, id: usize, technology: CwTechnology) -> Result<()> {
        self.channel(id)?.set_cw_technology(technology)
    }

    pub fn set_cw_run(&self, id: usize, run: bool) -> Result<()> {
        self.channel(id)?.set_cw_run(run);
        Ok(())
    }

    pub fn set_cw_frequency(&self, id: usize, f_center: f64) -> Result<()> {
        self.channel(id)?.set_cw_frequency(f_center)
    }

    pub fn set_cw_bandwidth(&self, id: usize, bandwidth: f64) -> Result<()> {
        self.channel(id)?.set_cw_bandwidth(bandwidth)
    }

    pub fn set_cw_gain(&self, id: usize, gain: f64) -> Result<()> {
        self.channel(id)?.set_cw_gain(gain)
    }

    pub fn set_double_pole_run(&self, id: usize, run: bool) -> Result<()> {
        self.channel(id)?.set_double_pole_run(run);
        Ok(())
    }

    pub fn set_double_pole_freqs(&self, id: usize, f_center: f64, bandwidth: f64) -> Result<()> {
        self.channel(id)?.set_double_pole_freqs(f_center, bandwidth)
    }

    pub fn set_double_pole_gain(&self, id: usize, gain: f64) -> Result<()> {
        self.channel(id)?.set_double_pole_gain(gain)
    }

    pub fn set_matched_run(&self, id: usize, run: bool) -> Result<()> {
        self.channel(id)?.set_matched_run(run);
        Ok(())
    }

    pub fn set_matched_freqs(&self, id: usize, f_center: f64, bandwidth: f64) -> Result<()> {
        self.channel(id)?.set_matched_freqs(f_center, bandwidth)
    }

    pub fn set_matched_gain(&self, id: usize, gain: f64) -> Result<()> {
        self.channel(id)?.set_matched_gain(gain)
    }

    pub fn set_gaussian_run(&self, id: usize, run: bool) -> Result<()> {
        self.channel(id)?.set_gaussian_run(run);
        Ok(())
    }

    pub fn set_gaussian_freqs(&self, id: usize, f_center: f64, bandwidth: f64) -> Result<()> {
        self.channel(id)?.set_gaussian_freqs(f_center, bandwidth)
    }

    pub fn set_gaussian_gain(&self, id: usize, gain: f64) -> Result<()> {
        self.channel(id)?.set_gaussian_gain(gain)
    }

    pub fn set_gaussian_tap_count(&self, id: usize, tap_count: usize) -> Result<()> {
        self.channel(id)?.set_gaussian_tap_count(tap_count)
    }

    pub fn set_biquad_run(&self, id: usize, run: bool) -> Result<()> {
        self.channel(id)?.set_biquad_run(run);
        Ok(())
    }

    pub fn set_biquad_frequency(&self, id: usize, f_center: f64) -> Result<()> {
        self.channel(id)?.set_biquad_frequency(f_center);
        Ok(())
    }

    pub fn set_biquad_bandwidth(&self, id: usize, bandwidth: f64) -> Result<()> {
        self.channel(id)?.set_biquad_bandwidth(bandwidth);
        Ok(())
    }

    pub fn set_biquad_gain(&self, id: usize, gain: f64) -> Result<()> {
        self.channel(id)?.set_biquad_gain(gain);
        Ok(())
    }

    pub fn flush(&self, id: usize) -> Result<()> {
        self.channel(id)?.flush();
        Ok(())
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_channel_is_an_error() {
        let registry = ChannelRegistry::new();
        assert!(matches!(
            registry.channel(7),
            Err(CwError::UnknownChannel(7))
        ));
        assert!(registry.close_channel(7).is_err());
    }

    #[test]
    fn test_open_resolve_close() {
        let registry = ChannelRegistry::new();
        registry.open_channel(0, &CwConfig::default()).unwrap();
        assert!(registry.channel(0).is_ok());
        registry.close_channel(0).unwrap();
        assert!(registry.channel(0).is_err());
    }

    #[test]
    fn test_process_block_without_run_leaves_block_unchanged() {
        let registry = ChannelRegistry::new();
        registry.open_channel(0, &CwConfig::default()).unwrap();

        let original: Vec<ComplexSample> = (0..1024)
            .map(|i| ComplexSample::new(i as f64, 0.5 * i as f64))
            .collect();
        let mut block = original.clone();
        registry.process_block(0, 0, &mut block).unwrap();
        assert_eq!(block, original);
    }

    #[test]
    fn test_gaussian_tap_count_override_through_channel() {
        let registry = ChannelRegistry::new();
        let channel = registry.open_channel(3, &CwConfig::default()).unwrap();

        channel.set_gaussian_tap_count(4096).unwrap();
        assert_eq!(channel.with_bank(|b| b.gaussian.tap_count()), 4096);
        assert!(!channel.with_bank(|b| b.gaussian.auto_sized()));
    }
}
