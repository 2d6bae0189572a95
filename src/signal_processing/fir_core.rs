//! Partitioned overlap-save convolution engine.
//!
//! Executes a long complex impulse response against a streaming signal in
//! fixed-size blocks. The impulse is split into block-length partitions,
//! each held as a frequency-domain mask; input spectra run through a
//! frequency-domain delay line so one forward and one inverse FFT per block
//! cover the whole response.
//!
//! The forward/inverse round trip is deliberately left unnormalized (a
//! factor of `2 * size`); the filter designers fold the normalization into
//! their `scale = gain / (2 * size)` factor.

use std::sync::Arc;

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::error::{CwError, Result};
use crate::signal_processing::ComplexSample;

/// When a freshly built impulse response takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Replace the running coefficient set immediately.
    Immediate,
    /// Swap in at the start of the next processed block, so a running
    /// stream never sees a partially written coefficient set.
    AtBlockBoundary,
}

pub struct FirCore {
    size: usize,
    nc: usize,
    fft_len: usize,
    fwd: Arc<dyn Fft<f64>>,
    inv: Arc<dyn Fft<f64>>,
    masks: Vec<Vec<ComplexSample>>,
    pending_masks: Option<Vec<Vec<ComplexSample>>>,
    fdl: Vec<Vec<ComplexSample>>,
    fdl_pos: usize,
    history: Vec<ComplexSample>,
    impulse: Vec<ComplexSample>,
    scratch: Vec<ComplexSample>,
    accum: Vec<ComplexSample>,
    loads: u64,
}

impl FirCore {
    /// Create an engine for `size`-sample blocks driving an `nc`-tap
    /// impulse response.
    pub fn new(size: usize, nc: usize, impulse: &[ComplexSample]) -> Result<Self> {
        if size == 0 {
            return Err(CwError::FilterDesign("block size must be nonzero".into()));
        }
        if size > nc {
            return Err(CwError::BlockSizeExceedsTaps { size, taps: nc });
        }
        if impulse.len() != nc {
            return Err(CwError::InvalidTapCount(format!(
                "impulse has {} taps, expected {}",
                impulse.len(),
                nc
            )));
        }

        let fft_len = 2 * size;
        let mut planner = FftPlanner::<f64>::new();
        let fwd = planner.plan_fft_forward(fft_len);
        let inv = planner.plan_fft_inverse(fft_len);
        let masks = build_masks(&fwd, size, impulse);
        let partitions = masks.len();

        Ok(Self {
            size,
            nc,
            fft_len,
            fwd,
            inv,
            masks,
            pending_masks: None,
            fdl: vec![vec![Complex::new(0.0, 0.0); fft_len]; partitions],
            fdl_pos: 0,
            history: vec![Complex::new(0.0, 0.0); size],
            impulse: impulse.to_vec(),
            scratch: vec![Complex::new(0.0, 0.0); fft_len],
            accum: vec![Complex::new(0.0, 0.0); fft_len],
            loads: 1,
        })
    }

    /// Block length in complex samples.
    pub fn block_size(&self) -> usize {
        self.size
    }

    /// Impulse length in taps.
    pub fn num_taps(&self) -> usize {
        self.nc
    }

    /// The currently loaded impulse response.
    pub fn impulse(&self) -> &[ComplexSample] {
        &self.impulse
    }

    /// Number of coefficient loads since creation, counting the initial
    /// load. Lets callers observe that an idempotent recompute did not
    /// reload anything.
    pub fn impulse_loads(&self) -> u64 {
        self.loads
    }

    /// Reset the overlap history without touching the coefficients.
    pub fn flush(&mut self) {
        self.history.fill(Complex::new(0.0, 0.0));
        for spectrum in &mut self.fdl {
            spectrum.fill(Complex::new(0.0, 0.0));
        }
        self.fdl_pos = 0;
    }

    /// Convolve one block in place. `block` must be exactly `size` samples.
    pub fn process(&mut self, block: &mut [ComplexSample]) {
        debug_assert_eq!(block.len(), self.size);
        if let Some(masks) = self.pending_masks.take() {
            self.masks = masks;
        }

        self.scratch[..self.size].copy_from_slice(&self.history);
        self.scratch[self.size..].copy_from_slice(block);
        self.history.copy_from_slice(block);

        self.fwd.process(&mut self.scratch);

        let partitions = self.fdl.len();
        self.fdl_pos = (self.fdl_pos + partitions - 1) % partitions;
        self.fdl[self.fdl_pos].copy_from_slice(&self.scratch);

        self.accum.fill(Complex::new(0.0, 0.0));
        for (p, mask) in self.masks.iter().enumerate() {
            let spectrum = &self.fdl[(self.fdl_pos + p) % partitions];
            for ((acc, m), x) in self.accum.iter_mut().zip(mask).zip(spectrum) {
                *acc += m * x;
            }
        }

        self.inv.process(&mut self.accum);
        block.copy_from_slice(&self.accum[self.size..]);
    }

    /// Load a freshly built impulse of the current tap count.
    pub fn set_impulse(&mut self, impulse: &[ComplexSample], apply: ApplyMode) -> Result<()> {
        if impulse.len() != self.nc {
            return Err(CwError::InvalidTapCount(format!(
                "impulse has {} taps, engine holds {}; use set_tap_count to resize",
                impulse.len(),
                self.nc
            )));
        }
        let masks = build_masks(&self.fwd, self.size, impulse);
        self.impulse.clear();
        self.impulse.extend_from_slice(impulse);
        match apply {
            ApplyMode::Immediate => {
                self.masks = masks;
                self.pending_masks = None;
            }
            ApplyMode::AtBlockBoundary => self.pending_masks = Some(masks),
        }
        self.loads += 1;
        Ok(())
    }

    /// Structural resize to a new tap count with its impulse. The
    /// frequency-domain delay line is rebuilt, so overlap history restarts.
    pub fn set_tap_count(&mut self, nc: usize, impulse: &[ComplexSample]) -> Result<()> {
        if self.size > nc {
            return Err(CwError::BlockSizeExceedsTaps {
                size: self.size,
                taps: nc,
            });
        }
        if impulse.len() != nc {
            return Err(CwError::InvalidTapCount(format!(
                "impulse has {} taps, expected {}",
                impulse.len(),
                nc
            )));
        }
        self.nc = nc;
        self.impulse.clear();
        self.impulse.extend_from_slice(impulse);
        self.masks = build_masks(&self.fwd, self.size, impulse);
        self.pending_masks = None;
        self.fdl = vec![vec![Complex::new(0.0, 0.0); self.fft_len]; self.masks.len()];
        self.fdl_pos = 0;
        self.loads += 1;
        Ok(())
    }

    /// Change the block length, repartitioning the retained impulse.
    pub fn set_size(&mut self, size: usize) -> Result<()> {
        if size == 0 {
            return Err(CwError::FilterDesign("block size must be nonzero".into()));
        }
        if size > self.nc {
            return Err(CwError::BlockSizeExceedsTaps {
                size,
                taps: self.nc,
            });
        }
        self.size = size;
        self.fft_len = 2 * size;
        let mut planner = FftPlanner::<f64>::new();
        self.fwd = planner.plan_fft_forward(self.fft_len);
        self.inv = planner.plan_fft_inverse(self.fft_len);
        self.masks = build_masks(&self.fwd, size, &self.impulse);
        self.pending_masks = None;
        self.fdl = vec![vec![Complex::new(0.0, 0.0); self.fft_len]; self.masks.len()];
        self.fdl_pos = 0;
        self.history = vec![Complex::new(0.0, 0.0); size];
        self.scratch = vec![Complex::new(0.0, 0.0); self.fft_len];
        self.accum = vec![Complex::new(0.0, 0.0); self.fft_len];
        self.loads += 1;
        Ok(())
    }
}

fn build_masks(
    fwd: &Arc<dyn Fft<f64>>,
    size: usize,
    impulse: &[ComplexSample],
) -> Vec<Vec<ComplexSample>> {
    let partitions = impulse.len().div_ceil(size);
    let mut masks = Vec::with_capacity(partitions);
    for p in 0..partitions {
        let mut mask = vec![Complex::new(0.0, 0.0); 2 * size];
        let start = p * size;
        let end = (start + size).min(impulse.len());
        mask[..end - start].copy_from_slice(&impulse[start..end]);
        fwd.process(&mut mask);
        masks.push(mask);
    }
    masks
}
