//! Control-plane retuning racing the real-time block path.
//!
//! One thread hammers the operator controls while another streams blocks
//! through the channel; the shared channel lock must keep every observed
//! coefficient set whole, so no output sample may ever come out non-finite.

use std::f64::consts::TAU;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use cwpeak::config::CwConfig;
use cwpeak::{ChannelRegistry, ComplexSample, CwTechnology};

const BLOCK: usize = 1024;
const RATE: f64 = 48_000.0;

#[test]
fn test_retuning_never_tears_the_audio_path() {
    let registry = Arc::new(ChannelRegistry::new());
    let channel = registry.open_channel(0, &CwConfig::default()).unwrap();
    registry.set_cw_run(0, true).unwrap();

    let done = Arc::new(AtomicBool::new(false));

    let control = {
        let registry = Arc::clone(&registry);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let technologies = [
                CwTechnology::Matched,
                CwTechnology::Gaussian,
                CwTechnology::DoublePole,
            ];
            let mut i = 0usize;
            while !done.load(Ordering::Relaxed) {
                let f = 400.0 + (i % 7) as f64 * 100.0;
                let bw = 25.0 + (i % 5) as f64 * 25.0;
                registry.set_cw_frequency(0, f).unwrap();
                registry.set_cw_bandwidth(0, bw).unwrap();
                registry.set_cw_gain(0, 1.0 + (i % 3) as f64).unwrap();
                registry
                    .set_cw_technology(0, technologies[i % technologies.len()])
                    .unwrap();
                i += 1;
            }
        })
    };

    let audio = thread::spawn(move || {
        let mut offset = 0usize;
        for _ in 0..200 {
            let mut block: Vec<ComplexSample> = (0..BLOCK)
                .map(|i| ComplexSample::from_polar(1.0, TAU * 600.0 * (offset + i) as f64 / RATE))
                .collect();
            offset += BLOCK;
            channel.process_block(0, &mut block);
            assert!(
                block.iter().all(|s| s.re.is_finite() && s.im.is_finite()),
                "torn coefficient state produced non-finite output"
            );
        }
    });

    audio.join().expect("audio thread panicked");
    done.store(true, Ordering::Relaxed);
    control.join().expect("control thread panicked");

    // after the dust settles, exactly one technology may run
    let running = registry.channel(0).unwrap().with_bank(|b| {
        [
            b.double_pole.run(),
            b.matched.run(),
            b.gaussian.run(),
            b.biquad.run(),
        ]
    });
    assert_eq!(running.iter().filter(|&&r| r).count(), 1);
}
