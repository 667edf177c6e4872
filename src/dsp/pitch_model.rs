//! Fujisaki-Bartman pitch contour model (spec §4.8 "Fujisaki-Bartman"),
//! grounded directly on `original_source/src/pitchModel.h`.
//!
//! Phrase and accent commands are impulses/rectangular pulses driven
//! through critically-damped second-order filters; their summed response
//! is exponentiated to give a multiplicative pitch trajectory that the
//! frame emitter layers on top of a token's flat base pitch.

const REFERENCE_SAMPLE_RATE: f64 = 22050.0;

fn clamp_i32(v: i32, lo: i32, hi: i32) -> i32 {
    v.clamp(lo, hi)
}

#[derive(Debug, Clone)]
pub struct FujisakiBartmanPitch {
    pa: f64,
    pb: f64,
    pc: f64,
    aa: f64,
    ab: f64,
    ac: f64,

    px1: f64,
    px2: f64,
    ax1: f64,
    ax2: f64,

    phr: f64,
    acc: f64,
    countdown: i32,

    default_phrase_len: i32,
    default_accent_len: i32,
    default_accent_dur: i32,
}

impl FujisakiBartmanPitch {
    pub fn new(sample_rate: i32) -> Self {
        let (mut phrase_len, mut accent_len, mut accent_dur) = (4250i32, 1024i32, 7500i32);
        if sample_rate > 0 {
            let scale = sample_rate as f64 / REFERENCE_SAMPLE_RATE;
            phrase_len = (0.5 + 4250.0 * scale).floor() as i32;
            accent_len = (0.5 + 1024.0 * scale).floor() as i32;
            accent_dur = (0.5 + 7500.0 * scale).floor() as i32;
        }
        phrase_len = clamp_i32(phrase_len, 1, 200_000);
        accent_len = clamp_i32(accent_len, 1, 200_000);
        accent_dur = clamp_i32(accent_dur, 1, 200_000);

        let mut p = FujisakiBartmanPitch {
            pa: 0.0,
            pb: 0.0,
            pc: 0.0,
            aa: 0.0,
            ab: 0.0,
            ac: 0.0,
            px1: 0.0,
            px2: 0.0,
            ax1: 0.0,
            ax2: 0.0,
            phr: 0.0,
            acc: 0.0,
            countdown: 0,
            default_phrase_len: phrase_len,
            default_accent_len: accent_len,
            default_accent_dur: accent_dur,
        };
        p.design_phrase(phrase_len);
        p.design_accent(accent_len);
        p
    }

    fn design_phrase(&mut self, l: i32) {
        let l = if l < 1 { 1 } else { l } as f64;
        let nf = -1.0 / l;
        let r = nf.exp();
        let c = -(r * r);
        let b = 2.0 * r;
        let gain_compensation = (std::f64::consts::E * nf).exp();
        let a = 1.0 - b * gain_compensation - c * gain_compensation;
        self.pa = a;
        self.pb = b;
        self.pc = c;
    }

    fn design_accent(&mut self, l: i32) {
        let l = if l < 1 { 1 } else { l } as f64;
        let nf = -1.0 / l;
        let r = nf.exp();
        let c = -(r * r);
        let b = 2.0 * r;
        let a = 1.0 - b - c;
        self.aa = a;
        self.ab = b;
        self.ac = c;
    }

    pub fn reset_past(&mut self) {
        self.px1 = 0.0;
        self.px2 = 0.0;
        self.ax1 = 0.0;
        self.ax2 = 0.0;
        self.phr = 0.0;
        self.acc = 0.0;
        self.countdown = 0;
    }

    /// Trigger a one-sample phrase-command impulse of amplitude `a`.
    /// `phrase_len_samples <= 0` keeps the current filter design.
    pub fn phrase(&mut self, a: f64, phrase_len_samples: i32) {
        if !(a > 0.0) {
            return;
        }
        self.phr = a;
        if phrase_len_samples > 0 {
            self.design_phrase(phrase_len_samples);
        }
    }

    /// Trigger a rectangular accent-command pulse of amplitude `a` and
    /// duration `duration_samples` (falls back to the scaled default).
    pub fn accent(&mut self, a: f64, duration_samples: i32, accent_len_samples: i32) {
        if !(a > 0.0) {
            return;
        }
        self.acc = a;
        self.countdown = if duration_samples > 0 {
            duration_samples
        } else {
            self.default_accent_dur
        };
        if accent_len_samples > 0 {
            self.design_accent(accent_len_samples);
        }
    }

    /// Advance one sample and return the pitch multiplier
    /// `exp(clamp(phrase_response + accent_response, -24, 24))`.
    pub fn process_multiplier(&mut self) -> f64 {
        let y1 = self.pa * self.phr + self.pb * self.px1 + self.pc * self.px2;
        self.px2 = self.px1;
        self.px1 = y1;
        self.phr = 0.0;

        let mut aimp = 0.0;
        if self.countdown > 0 {
            aimp = self.acc;
            self.countdown -= 1;
        }
        let y2 = self.aa * aimp + self.ab * self.ax1 + self.ac * self.ax2;
        self.ax2 = self.ax1;
        self.ax1 = y2;

        let e = (y1 + y2).clamp(-24.0, 24.0);
        e.exp()
    }

    pub fn default_phrase_len(&self) -> i32 {
        self.default_phrase_len
    }

    pub fn default_accent_len(&self) -> i32 {
        self.default_accent_len
    }

    pub fn default_accent_dur(&self) -> i32 {
        self.default_accent_dur
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_scale_with_sample_rate() {
        let at_22050 = FujisakiBartmanPitch::new(22050);
        let at_44100 = FujisakiBartmanPitch::new(44100);
        assert_eq!(at_22050.default_phrase_len(), 4250);
        assert_eq!(at_44100.default_phrase_len(), 8500);
    }

    #[test]
    fn idle_multiplier_is_unity() {
        let mut p = FujisakiBartmanPitch::new(22050);
        for _ in 0..10 {
            assert!((p.process_multiplier() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn phrase_impulse_produces_transient_then_decays_to_unity() {
        let mut p = FujisakiBartmanPitch::new(22050);
        p.phrase(1.0, 0);
        let mut saw_excursion = false;
        let mut last = 1.0;
        for _ in 0..20_000 {
            last = p.process_multiplier();
            if (last - 1.0).abs() > 1e-6 {
                saw_excursion = true;
            }
        }
        assert!(saw_excursion);
        assert!((last - 1.0).abs() < 1e-3);
    }

    #[test]
    fn accent_pulse_holds_for_its_duration() {
        let mut p = FujisakiBartmanPitch::new(22050);
        p.accent(1.0, 100, 0);
        let mut any_nonzero = false;
        for _ in 0..100 {
            if p.process_multiplier() != 1.0 {
                any_nonzero = true;
            }
        }
        assert!(any_nonzero);
    }
}
