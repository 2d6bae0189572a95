pub mod biquad;
pub mod double_pole;
pub mod gaussian;
pub mod matched;

pub use biquad::BiQuad;
pub use double_pole::{
    DoublePole, build_double_pole_1eff, build_double_pole_1sided, build_double_pole_2sided,
};
pub use gaussian::{Gaussian, build_gaussian};
pub use matched::{Matched, build_matched};

use crate::config::CwMode;
use crate::signal_processing::ComplexSample;

/// Apply the CW sideband transform to a block in place.
///
/// CWL passes the block unchanged; CWU negates every imaginary component
/// (spectral mirror); CWL+CWU overwrites every imaginary component with the
/// real component, folding both sidebands onto one detection path.
pub(crate) fn apply_mode(mode: CwMode, block: &mut [ComplexSample]) {
    match mode {
        CwMode::Lower => {}
        CwMode::Upper => {
            for sample in block.iter_mut() {
                sample.im = -sample.im;
            }
        }
        CwMode::Both => {
            for sample in block.iter_mut() {
                sample.im = sample.re;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> Vec<ComplexSample> {
        vec![
            ComplexSample::new(1.0, 0.0),
            ComplexSample::new(2.0, 1.0),
            ComplexSample::new(3.0, -1.0),
            ComplexSample::new(4.0, 2.0),
        ]
    }

    #[test]
    fn test_mode_lower_is_identity() {
        let mut b = block();
        apply_mode(CwMode::Lower, &mut b);
        assert_eq!(b, block());
    }

    #[test]
    fn test_mode_upper_mirrors_spectrum() {
        let mut b = block();
        apply_mode(CwMode::Upper, &mut b);
        let expected = [
            ComplexSample::new(1.0, 0.0),
            ComplexSample::new(2.0, -1.0),
            ComplexSample::new(3.0, 1.0),
            ComplexSample::new(4.0, -2.0),
        ];
        assert_eq!(b.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_mode_both_folds_onto_real() {
        let mut b = block();
        apply_mode(CwMode::Both, &mut b);
        let expected = [
            ComplexSample::new(1.0, 1.0),
            ComplexSample::new(2.0, 2.0),
            ComplexSample::new(3.0, 3.0),
            ComplexSample::new(4.0, 4.0),
        ];
        assert_eq!(b.as_slice(), expected.as_slice());
    }
}
