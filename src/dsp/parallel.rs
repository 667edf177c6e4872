//! Parallel resonator bank: six independent resonators summed with
//! per-formant amplitude, crossfaded against the raw input by
//! `parallelBypass` (spec §4.3 "Parallel").

use super::resonator::Resonator;
use crate::frame::{Frame, FrameEx};

#[derive(Debug, Clone)]
pub struct ParallelBank {
    resonators: [Resonator; 6],
}

impl ParallelBank {
    pub fn new(sample_rate: i32) -> Self {
        ParallelBank {
            resonators: std::array::from_fn(|_| Resonator::new(sample_rate, false)),
        }
    }

    pub fn reset(&mut self) {
        for r in &mut self.resonators {
            r.reset();
        }
    }

    pub fn decay(&mut self, factor: f64) {
        for r in &mut self.resonators {
            r.decay(factor);
        }
    }

    /// Process one sample: each resonator's (output - input) is scaled
    /// by its `paN` amplitude and summed, then crossfaded with the raw
    /// input by `parallelBypass`. The same sweep-bandwidth widening as
    /// the cascade F2/F3 applies for pf2/pf3.
    pub fn get_next(&mut self, frame: &Frame, frame_ex: Option<&FrameEx>, _glottis_open: bool, input: f64) -> f64 {
        let freqs = [frame.pf1, frame.pf2, frame.pf3, frame.pf4, frame.pf5, frame.pf6];
        let bws = [frame.pb1, frame.pb2, frame.pb3, frame.pb4, frame.pb5, frame.pb6];
        let amps = [frame.pa1, frame.pa2, frame.pa3, frame.pa4, frame.pa5, frame.pa6];

        let end_pf2 = frame_ex.and_then(|ex| ex.end_pf2);
        let end_pf3 = frame_ex.and_then(|ex| ex.end_pf3);

        let mut sum = 0.0;
        for i in 0..6 {
            let mut bw = bws[i];
            if i == 1 {
                bw = widen_if_swept(bw, freqs[i], end_pf2);
            } else if i == 2 {
                bw = widen_if_swept(bw, freqs[i], end_pf3);
            }
            let out = self.resonators[i].resonate(input, freqs[i], bw, true);
            sum += (out - input) * amps[i];
        }

        let bypass = frame.parallel_bypass.clamp(0.0, 1.0);
        bypass * input + (1.0 - bypass) * sum
    }
}

fn widen_if_swept(base_bw: f64, freq: f64, end_target: Option<f64>) -> f64 {
    match end_target {
        Some(end) if end.is_finite() => {
            let sweep_hz = (end - freq).abs();
            (base_bw + (sweep_hz / 18.0).min(base_bw * 1.5)).clamp(base_bw, base_bw * 2.5)
        }
        _ => base_bw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fully_bypassed_parallel_bank_is_passthrough() {
        let mut bank = ParallelBank::new(22050);
        let mut f = Frame::default();
        f.parallel_bypass = 1.0;
        assert_eq!(bank.get_next(&f, None, false, 0.37), 0.37);
    }

    #[test]
    fn parallel_bank_sums_finite_resonator_contributions() {
        let mut bank = ParallelBank::new(22050);
        let mut f = Frame::default();
        f.parallel_bypass = 0.0;
        f.pf1 = 300.0;
        f.pb1 = 100.0;
        f.pa1 = 0.5;
        let mut max_abs: f64 = 0.0;
        for i in 0..2000 {
            let imp = if i % 50 == 0 { 1.0 } else { 0.0 };
            max_abs = max_abs.max(bank.get_next(&f, None, false, imp).abs());
        }
        assert!(max_abs.is_finite());
    }
}
