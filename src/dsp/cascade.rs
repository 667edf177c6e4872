//! Cascade resonator bank: F6 down to F1 in series, plus the nasal
//! pole/zero pair (spec §4.3 "Cascade").

use super::resonator::{PitchSyncF1, Resonator};
use super::voicing_tone::VoicingTone;
use crate::frame::{Frame, FrameEx};

fn fade_for_nyquist_proximity(cf: f64, nyquist: f64) -> f64 {
    let r = if nyquist > 0.0 { cf / nyquist } else { 1.0 };
    if r < 0.65 {
        1.0
    } else if r > 0.85 {
        0.0
    } else {
        1.0 - (r - 0.65) / (0.85 - 0.65)
    }
}

/// Bandwidth widening for F2/F3 when a FrameEx end-target is set for that
/// formant (spec §4.3 "swept-aware bandwidth widening").
fn swept_bandwidth(base_bw: f64, freq: f64, end_target: Option<f64>, cap_q: f64, min_bw: f64, max_bw: f64) -> f64 {
    match end_target {
        Some(end) if end.is_finite() => {
            let sweep_hz = (end - freq).abs();
            let extra = (sweep_hz / cap_q).min(max_bw - base_bw).max(0.0);
            (base_bw + extra).clamp(min_bw, max_bw)
        }
        _ => base_bw,
    }
}

#[derive(Debug, Clone)]
pub struct CascadeBank {
    sample_rate: i32,
    nyquist: f64,

    f1: PitchSyncF1,
    f2: Resonator,
    f3: Resonator,
    f4: Resonator,
    f5: Resonator,
    f6: Resonator,
    n0: Resonator,
    np: Resonator,

    bw_scale: f64,
    pitch_sync_f1_delta_hz: f64,
    pitch_sync_b1_delta_hz: f64,
}

impl CascadeBank {
    pub fn new(sample_rate: i32) -> Self {
        CascadeBank {
            sample_rate,
            nyquist: 0.5 * sample_rate as f64,
            f1: PitchSyncF1::new(sample_rate),
            f2: Resonator::new(sample_rate, false),
            f3: Resonator::new(sample_rate, false),
            f4: Resonator::new(sample_rate, false),
            f5: Resonator::new(sample_rate, false),
            f6: Resonator::new(sample_rate, false),
            n0: Resonator::new(sample_rate, true),
            np: Resonator::new(sample_rate, false),
            bw_scale: 1.0,
            pitch_sync_f1_delta_hz: 0.0,
            pitch_sync_b1_delta_hz: 0.0,
        }
    }

    pub fn apply_voicing_tone(&mut self, tone: &VoicingTone) {
        self.bw_scale = tone.cascade_bw_scale.clamp(0.3, 2.0);
        self.pitch_sync_f1_delta_hz = tone.pitch_sync_f1_delta_hz;
        self.pitch_sync_b1_delta_hz = tone.pitch_sync_b1_delta_hz;
    }

    pub fn reset(&mut self) {
        self.f1.reset();
        self.f2.reset();
        self.f3.reset();
        self.f4.reset();
        self.f5.reset();
        self.f6.reset();
        self.n0.reset();
        self.np.reset();
    }

    pub fn decay(&mut self, factor: f64) {
        self.f1.decay(factor);
        self.f2.decay(factor);
        self.f3.decay(factor);
        self.f4.decay(factor);
        self.f5.decay(factor);
        self.f6.decay(factor);
        self.n0.decay(factor);
        self.np.decay(factor);
    }

    /// Process one sample high-to-low (F6 -> F1), then the nasal pair.
    pub fn get_next(&mut self, frame: &Frame, frame_ex: Option<&FrameEx>, glottis_open: bool, input: f64) -> f64 {
        let bw = self.bw_scale;
        let mut out = input;

        // F6
        {
            let pre = out;
            out = self.f6.resonate(out, frame.cf6, frame.cb6 * bw, true);
            let fade = fade_for_nyquist_proximity(frame.cf6, self.nyquist);
            out = fade * out + (1.0 - fade) * pre;
        }
        // F5
        {
            let pre = out;
            out = self.f5.resonate(out, frame.cf5, frame.cb5 * bw, true);
            let fade = fade_for_nyquist_proximity(frame.cf5, self.nyquist);
            out = fade * out + (1.0 - fade) * pre;
        }
        // F4
        {
            let pre = out;
            out = self.f4.resonate(out, frame.cf4, frame.cb4 * bw, true);
            let fade = fade_for_nyquist_proximity(frame.cf4, self.nyquist);
            out = fade * out + (1.0 - fade) * pre;
        }

        // F3 (optional swept-bandwidth widening)
        let end_cf3 = frame_ex.and_then(|ex| ex.end_cf3);
        let cb3 = swept_bandwidth(frame.cb3 * bw, frame.cf3, end_cf3, 18.0, frame.cb3 * bw, frame.cb3 * bw * 2.5);
        out = self.f3.resonate(out, frame.cf3, cb3, true);

        // F2 (optional swept-bandwidth widening)
        let end_cf2 = frame_ex.and_then(|ex| ex.end_cf2);
        let cb2 = swept_bandwidth(frame.cb2 * bw, frame.cf2, end_cf2, 18.0, frame.cb2 * bw, frame.cb2 * bw * 2.5);
        out = self.f2.resonate(out, frame.cf2, cb2, true);

        // F1: pitch-synchronous variant, widened during the glottal open phase.
        out = self.f1.resonate(
            out,
            frame.cf1,
            frame.cb1 * bw,
            glottis_open,
            self.pitch_sync_f1_delta_hz,
            self.pitch_sync_b1_delta_hz,
        );

        // Nasal zero feeding nasal pole, crossfaded with the direct signal by caNP.
        let nasal_in = out;
        let nasal_zeroed = self.n0.resonate(nasal_in, frame.cf_n0, frame.cb_n0 * bw, true);
        let nasal_poled = self.np.resonate(nasal_zeroed, frame.cf_np, frame.cb_np * bw, true);
        let ca_np = frame.ca_np.clamp(0.0, 1.0);
        out = ca_np * nasal_poled + (1.0 - ca_np) * nasal_in;

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_vowel_frame() -> Frame {
        let mut f = Frame::default();
        f.cf1 = 500.0;
        f.cb1 = 60.0;
        f.cf2 = 1500.0;
        f.cb2 = 90.0;
        f.cf3 = 2500.0;
        f.cb3 = 150.0;
        f.cf4 = 3500.0;
        f.cb4 = 200.0;
        f.cf5 = 4500.0;
        f.cb5 = 200.0;
        f.cf6 = 5500.0;
        f.cb6 = 1000.0;
        f
    }

    #[test]
    fn cascade_is_bibo_stable_for_a_vowel_frame() {
        let mut bank = CascadeBank::new(22050);
        let frame = default_vowel_frame();
        let mut max_abs: f64 = 0.0;
        for i in 0..10_000 {
            let imp = if i % 100 == 0 { 1.0 } else { 0.0 };
            let out = bank.get_next(&frame, None, true, imp);
            max_abs = max_abs.max(out.abs());
        }
        assert!(max_abs.is_finite());
        assert!(max_abs < 1000.0);
    }

    #[test]
    fn decay_drains_state_during_silence() {
        let mut bank = CascadeBank::new(22050);
        let frame = default_vowel_frame();
        bank.get_next(&frame, None, true, 1.0);
        for _ in 0..50 {
            bank.decay(0.9);
        }
        let out = bank.get_next(&frame, None, false, 0.0);
        assert!(out.abs() < 1.0);
    }
}
