//! All-pole resonator and all-zero anti-resonator (spec §4.1), grounded
//! directly on `original_source/src/resonator.h`.

use super::TWO_PI;

/// Two-pole IIR (direct-form I) resonator, or a two-zero FIR
/// anti-resonator when constructed with `anti = true`.
///
/// Coefficients are recomputed only when `frequency`/`bandwidth` change,
/// so steady-state synthesis avoids a `tan`/`cos` call per sample.
#[derive(Debug, Clone)]
pub struct Resonator {
    sample_rate: f64,
    frequency: f64,
    bandwidth: f64,
    anti: bool,
    set_once: bool,

    // All-pole output delay line and DF1 coefficients.
    y1: f64,
    y2: f64,
    df_b0: f64,
    df_fb1: f64,
    df_fb2: f64,

    // FIR anti-resonator coefficients and input delay line.
    fir_a: f64,
    fir_b: f64,
    fir_c: f64,
    z1: f64,
    z2: f64,

    disabled: bool,
}

impl Resonator {
    pub fn new(sample_rate: i32, anti: bool) -> Self {
        Resonator {
            sample_rate: sample_rate as f64,
            frequency: 0.0,
            bandwidth: 0.0,
            anti,
            set_once: false,
            y1: 0.0,
            y2: 0.0,
            df_b0: 0.0,
            df_fb1: 0.0,
            df_fb2: 0.0,
            fir_a: 1.0,
            fir_b: 0.0,
            fir_c: 0.0,
            z1: 0.0,
            z2: 0.0,
            disabled: true,
        }
    }

    /// Recompute coefficients for `(frequency, bandwidth)` if they changed
    /// since the last call.
    pub fn set_params(&mut self, frequency: f64, bandwidth: f64) {
        if self.set_once && frequency == self.frequency && bandwidth == self.bandwidth {
            return;
        }
        self.frequency = frequency;
        self.bandwidth = bandwidth;

        let nyquist = 0.5 * self.sample_rate;
        let invalid = !frequency.is_finite() || !bandwidth.is_finite();
        let off = frequency <= 0.0 || bandwidth <= 0.0 || frequency >= nyquist;

        if invalid || off {
            self.disabled = true;
            if self.anti {
                self.fir_a = 1.0;
                self.fir_b = 0.0;
                self.fir_c = 0.0;
            } else {
                self.df_b0 = 0.0;
                self.df_fb1 = 0.0;
                self.df_fb2 = 0.0;
            }
            self.set_once = true;
            return;
        }

        self.disabled = false;

        if self.anti {
            // Zeros at z = r * e^(+/-j*theta); normalized for unity
            // passband gain relative to the matching resonator.
            let r = (-std::f64::consts::PI / self.sample_rate * bandwidth).exp();
            let cos_theta = (TWO_PI * frequency / self.sample_rate).cos();
            let res_a = 1.0 - 2.0 * r * cos_theta + r * r;
            if !res_a.is_finite() || res_a.abs() < 1e-12 {
                self.fir_a = 1.0;
                self.fir_b = 0.0;
                self.fir_c = 0.0;
            } else {
                let inv_a = 1.0 / res_a;
                self.fir_a = inv_a;
                self.fir_b = -2.0 * r * cos_theta * inv_a;
                self.fir_c = r * r * inv_a;
            }
        } else {
            let g = (std::f64::consts::PI * frequency / self.sample_rate).tan();
            let g2 = g * g;
            let r = (-2.0 * std::f64::consts::PI * bandwidth / self.sample_rate).exp();
            let k = (1.0 - r) * (1.0 + g2) / (g * (1.0 + r));
            let d = 1.0 + k * g + g2;
            self.df_b0 = 4.0 * g2 / d;
            self.df_fb1 = 2.0 * (1.0 - g2) / d;
            self.df_fb2 = -(1.0 - k * g + g2) / d;
        }
        self.set_once = true;
    }

    /// Process one sample. When `allow_update` is false, the currently
    /// cached coefficients are reused even if `frequency`/`bandwidth`
    /// differ from the last call (used by callers that pre-update once
    /// per sample across several shared resonators).
    pub fn resonate(&mut self, input: f64, frequency: f64, bandwidth: f64, allow_update: bool) -> f64 {
        if allow_update {
            self.set_params(frequency, bandwidth);
        }
        if self.disabled {
            return input;
        }
        if self.anti {
            let out = self.fir_a * input + self.fir_b * self.z1 + self.fir_c * self.z2;
            self.z2 = self.z1;
            self.z1 = input;
            out
        } else {
            let out = self.df_b0 * input + self.df_fb1 * self.y1 + self.df_fb2 * self.y2;
            self.y2 = self.y1;
            self.y1 = out;
            out
        }
    }

    pub fn reset(&mut self) {
        self.y1 = 0.0;
        self.y2 = 0.0;
        self.z1 = 0.0;
        self.z2 = 0.0;
        self.set_once = false;
    }

    /// Drain residual ringing during silence by scaling delay-line state.
    pub fn decay(&mut self, factor: f64) {
        self.y1 *= factor;
        self.y2 *= factor;
    }
}

/// F1 resonator with pitch-synchronous bandwidth/frequency widening
/// during the glottal open phase (spec §4.1 "Pitch-synchronous F1 variant").
#[derive(Debug, Clone)]
pub struct PitchSyncF1 {
    inner: Resonator,
    smoothed_freq: f64,
    smoothed_bw: f64,
    initialized: bool,
    sample_rate: f64,
}

impl PitchSyncF1 {
    pub fn new(sample_rate: i32) -> Self {
        PitchSyncF1 {
            inner: Resonator::new(sample_rate, false),
            smoothed_freq: 0.0,
            smoothed_bw: 0.0,
            initialized: false,
            sample_rate: sample_rate as f64,
        }
    }

    pub fn reset(&mut self) {
        self.inner.reset();
        self.initialized = false;
    }

    /// `delta_f1`/`delta_b1` apply only while `glottis_open`. The target
    /// is smoothed through a ~2ms one-pole before reaching the resonator
    /// math, to avoid clicks at glottal phase transitions.
    pub fn resonate(
        &mut self,
        input: f64,
        base_freq: f64,
        base_bw: f64,
        glottis_open: bool,
        delta_f1: f64,
        delta_b1: f64,
    ) -> f64 {
        let target_freq = if glottis_open { base_freq + delta_f1 } else { base_freq };
        let target_bw = if glottis_open { base_bw + delta_b1 } else { base_bw };

        let time_const_ms = 2.0;
        let coeff = (-1.0 / (time_const_ms * 0.001 * self.sample_rate)).exp();

        if !self.initialized {
            self.smoothed_freq = target_freq;
            self.smoothed_bw = target_bw;
            self.initialized = true;
        } else {
            self.smoothed_freq = coeff * self.smoothed_freq + (1.0 - coeff) * target_freq;
            self.smoothed_bw = coeff * self.smoothed_bw + (1.0 - coeff) * target_bw;
        }

        self.inner.resonate(input, self.smoothed_freq, self.smoothed_bw, true)
    }

    pub fn decay(&mut self, factor: f64) {
        self.inner.decay(factor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_resonator_is_passthrough() {
        let mut r = Resonator::new(22050, false);
        assert_eq!(r.resonate(0.5, 0.0, 100.0, true), 0.5);
        assert_eq!(r.resonate(-0.25, 500.0, 0.0, true), -0.25);
    }

    #[test]
    fn resonator_is_bibo_stable_for_in_range_params() {
        let mut r = Resonator::new(22050, false);
        let mut max_out: f64 = 0.0;
        for i in 0..10_000 {
            let x = if i % 50 == 0 { 1.0 } else { 0.0 };
            let y = r.resonate(x, 800.0, 80.0, true);
            max_out = max_out.max(y.abs());
        }
        assert!(max_out.is_finite());
        assert!(max_out < 100.0);
    }

    #[test]
    fn anti_resonator_delay_line_stores_inputs() {
        let mut r = Resonator::new(22050, true);
        let out1 = r.resonate(1.0, 1000.0, 100.0, true);
        assert!(out1.is_finite());
        let out2 = r.resonate(0.0, 1000.0, 100.0, true);
        assert!(out2.is_finite());
    }

    #[test]
    fn decay_drains_state_toward_zero() {
        let mut r = Resonator::new(22050, false);
        r.resonate(1.0, 800.0, 80.0, true);
        r.decay(0.5);
        r.decay(0.5);
        let quiet = r.resonate(0.0, 800.0, 80.0, true);
        assert!(quiet.abs() < 1.0);
    }

    #[test]
    fn pitch_sync_f1_widens_only_when_glottis_open() {
        let mut p = PitchSyncF1::new(22050);
        let a = p.resonate(0.1, 700.0, 100.0, false, 50.0, 20.0);
        let mut p2 = PitchSyncF1::new(22050);
        let b = p2.resonate(0.1, 700.0, 100.0, true, 50.0, 20.0);
        assert!(a.is_finite() && b.is_finite());
    }
}
