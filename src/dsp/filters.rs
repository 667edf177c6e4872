//! Small reusable one-pole filter building blocks shared by the glottal
//! source and the wave generator's adaptive lowpass stages.

use super::TWO_PI;

/// A one-pole lowpass with a settable cutoff, used for anti-aliasing the
/// voiced source and for the frication/aspiration lowpass cascades.
#[derive(Debug, Clone, Copy)]
pub struct OnePoleLowpass {
    sample_rate: f64,
    coeff: f64,
    state: f64,
}

impl OnePoleLowpass {
    pub fn new(sample_rate: i32) -> Self {
        OnePoleLowpass {
            sample_rate: sample_rate as f64,
            coeff: 0.0,
            state: 0.0,
        }
    }

    pub fn set_cutoff_hz(&mut self, fc_hz: f64) {
        let nyq = 0.5 * self.sample_rate;
        let fc = fc_hz.clamp(20.0, nyq * 0.95);
        self.coeff = (-TWO_PI * fc / self.sample_rate).exp();
    }

    pub fn process(&mut self, input: f64) -> f64 {
        self.state = (1.0 - self.coeff) * input + self.coeff * self.state;
        self.state
    }

    pub fn reset(&mut self) {
        self.state = 0.0;
    }
}

/// Asymmetric attack/release one-pole envelope smoother (used throughout
/// the WaveGenerator to avoid clicks on parameter steps).
#[derive(Debug, Clone, Copy)]
pub struct AsymmetricSmoother {
    attack_coeff: f64,
    release_coeff: f64,
    state: f64,
    initialized: bool,
}

impl AsymmetricSmoother {
    pub fn new(sample_rate: f64, attack_ms: f64, release_ms: f64) -> Self {
        AsymmetricSmoother {
            attack_coeff: 1.0 - (-1.0 / (0.001 * attack_ms * sample_rate)).exp(),
            release_coeff: 1.0 - (-1.0 / (0.001 * release_ms * sample_rate)).exp(),
            state: 0.0,
            initialized: false,
        }
    }

    pub fn process(&mut self, target: f64) -> f64 {
        if !self.initialized {
            self.state = target;
            self.initialized = true;
            return self.state;
        }
        let coeff = if target > self.state {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.state += (target - self.state) * coeff;
        self.state
    }

    pub fn value(&self) -> f64 {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = 0.0;
        self.initialized = false;
    }
}

/// RBJ-style biquad high-shelf EQ, recomputed only when gain/fc/Q change
/// (spec §4.4 step 11, "biquad high-shelf EQ").
#[derive(Debug, Clone, Copy)]
pub struct HighShelf {
    sample_rate: f64,
    gain_db: f64,
    fc_hz: f64,
    q: f64,

    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,

    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl HighShelf {
    pub fn new(sample_rate: i32) -> Self {
        let mut s = HighShelf {
            sample_rate: sample_rate as f64,
            gain_db: f64::NAN,
            fc_hz: f64::NAN,
            q: f64::NAN,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        };
        s.set_params(0.0, 2000.0, 0.7);
        s
    }

    pub fn set_params(&mut self, gain_db: f64, fc_hz: f64, q: f64) {
        if gain_db == self.gain_db && fc_hz == self.fc_hz && q == self.q {
            return;
        }
        self.gain_db = gain_db;
        self.fc_hz = fc_hz;
        self.q = q.max(0.05);

        let a = 10f64.powf(gain_db / 40.0);
        let w0 = TWO_PI * fc_hz.clamp(20.0, 0.49 * self.sample_rate) / self.sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * self.q);
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

        let b0 = a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha);
        let b1 = -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0);
        let b2 = a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha);
        let a0 = (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha;
        let a1 = 2.0 * ((a - 1.0) - (a + 1.0) * cos_w0);
        let a2 = (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha;

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
    }

    pub fn process(&mut self, x: f64) -> f64 {
        let y = self.b0 * x + self.b1 * self.x1 + self.b2 * self.x2 - self.a1 * self.y1 - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_pole_lowpass_converges_to_a_constant_input() {
        let mut lp = OnePoleLowpass::new(22050);
        lp.set_cutoff_hz(1000.0);
        let mut last = 0.0;
        for _ in 0..5000 {
            last = lp.process(1.0);
        }
        assert!((last - 1.0).abs() < 1e-3);
    }

    #[test]
    fn high_shelf_is_stable_for_unity_gain() {
        let mut hs = HighShelf::new(22050);
        hs.set_params(0.0, 2000.0, 0.7);
        let mut max_abs: f64 = 0.0;
        for i in 0..5000 {
            let x = if i % 37 == 0 { 1.0 } else { 0.0 };
            max_abs = max_abs.max(hs.process(x).abs());
        }
        assert!(max_abs.is_finite());
        assert!(max_abs < 10.0);
    }

    #[test]
    fn asymmetric_smoother_uses_different_rates_up_vs_down() {
        let mut s = AsymmetricSmoother::new(22050.0, 1.0, 12.0);
        s.process(1.0);
        let up_after_1 = s.process(1.0);
        s.process(0.0);
        let down_after_1 = s.process(0.0);
        assert!(up_after_1.is_finite() && down_after_1.is_finite());
    }
}
