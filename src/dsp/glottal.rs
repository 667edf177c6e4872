//! LF-inspired glottal source with spectral tilt, jitter/shimmer, tremor,
//! breathiness and creakiness (spec §4.2), grounded directly on
//! `original_source/src/voiceGenerator.h`.

use super::filters::OnePoleLowpass;
use super::noise::{FastRandom, FrequencyGenerator, NoiseGenerator};
use super::pitch_model::FujisakiBartmanPitch;
use super::voicing_tone::VoicingTone;
use super::TWO_PI;
use crate::frame::{Frame, FrameEx};

const BREATHINESS_TILT_MAX_DB: f64 = 6.0;
const BREATHINESS_ASP_TILT_MAX_DB: f64 = -8.0;
const BREATHINESS_TILT_SMOOTH_MS: f64 = 15.0;
const RADIATION_DERIV_GAIN_BASE: f64 = 5.0;
const RADIATION_DERIV_GAIN_REF_SR: f64 = 22050.0;
const TURBULENCE_FLOW_POWER: f64 = 1.5;

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    if v < lo {
        lo
    } else if v > hi {
        hi
    } else {
        v
    }
}

/// Per-sample LF-inspired glottal flow generator driving the cascade
/// bank's voiced input.
#[derive(Debug, Clone)]
pub struct GlottalSource {
    sample_rate: i32,
    sample_rate_f: f64,

    pitch_gen: FrequencyGenerator,
    vibrato_gen: FrequencyGenerator,
    tremor_gen: FrequencyGenerator,
    aspiration_gen: NoiseGenerator,

    fujisaki_pitch: FujisakiBartmanPitch,
    fujisaki_was_enabled: bool,
    last_fujisaki_reset: f64,
    last_fujisaki_phrase_amp: f64,
    last_fujisaki_accent_amp: f64,

    last_flow: f64,
    last_voiced_in: f64,
    last_voiced_out: f64,
    last_voiced_src: f64,
    last_asp_out: f64,

    noise_glottal_mod_depth: f64,
    last_noise_mod: f64,

    tremor_depth: f64,
    tremor_depth_smooth: f64,
    last_tremor_sin: f64,

    smooth_asp_amp: f64,
    smooth_asp_amp_init: bool,
    asp_attack_coeff: f64,
    asp_release_coeff: f64,

    voiced_anti_alias_lp1: OnePoleLowpass,
    voiced_anti_alias_lp2: OnePoleLowpass,
    voiced_anti_alias_active: bool,

    last_cycle_pos: f64,
    jitter_mul: f64,
    shimmer_mul: f64,
    jitter_shimmer_rng: FastRandom,

    voicing_peak_pos: f64,
    voiced_pre_emph_a: f64,
    voiced_pre_emph_mix: f64,
    speed_quotient: f64,

    tilt_target_tl_db: f64,
    tilt_tl_db: f64,
    tilt_pole: f64,
    tilt_pole_target: f64,
    tilt_state: f64,
    tilt_tl_alpha: f64,
    tilt_pole_alpha: f64,
    tilt_ref_hz: f64,
    tilt_last_tl_for_targets: f64,

    per_frame_tilt_offset: f64,
    per_frame_tilt_offset_target: f64,
    per_frame_tilt_offset_alpha: f64,

    asp_tilt_target_db: f64,
    asp_tilt_smoothed_db: f64,
    asp_tilt_smooth_alpha: f64,
    asp_lp_state: f64,
    fric_lp_state: f64,

    per_frame_asp_tilt_offset: f64,
    per_frame_asp_tilt_offset_target: f64,
    per_frame_asp_tilt_offset_alpha: f64,

    radiation_deriv_gain: f64,
    radiation_mix: f64,

    pub glottis_open: bool,
}

impl GlottalSource {
    pub fn new(sample_rate: i32) -> Self {
        let sr_f = sample_rate as f64;
        let mut g = GlottalSource {
            sample_rate,
            sample_rate_f: sr_f,
            pitch_gen: FrequencyGenerator::new(),
            vibrato_gen: FrequencyGenerator::new(),
            tremor_gen: FrequencyGenerator::new(),
            aspiration_gen: NoiseGenerator::new(0x1234_5678),
            fujisaki_pitch: FujisakiBartmanPitch::new(sample_rate),
            fujisaki_was_enabled: false,
            last_fujisaki_reset: 0.0,
            last_fujisaki_phrase_amp: 0.0,
            last_fujisaki_accent_amp: 0.0,
            last_flow: 0.0,
            last_voiced_in: 0.0,
            last_voiced_out: 0.0,
            last_voiced_src: 0.0,
            last_asp_out: 0.0,
            noise_glottal_mod_depth: 0.0,
            last_noise_mod: 1.0,
            tremor_depth: 0.0,
            tremor_depth_smooth: 0.0,
            last_tremor_sin: 0.0,
            smooth_asp_amp: 0.0,
            smooth_asp_amp_init: false,
            asp_attack_coeff: 0.0,
            asp_release_coeff: 0.0,
            voiced_anti_alias_lp1: OnePoleLowpass::new(sample_rate),
            voiced_anti_alias_lp2: OnePoleLowpass::new(sample_rate),
            voiced_anti_alias_active: false,
            last_cycle_pos: 0.0,
            jitter_mul: 1.0,
            shimmer_mul: 1.0,
            jitter_shimmer_rng: FastRandom::new(98765),
            voicing_peak_pos: 0.91,
            voiced_pre_emph_a: 0.92,
            voiced_pre_emph_mix: 0.35,
            speed_quotient: 2.0,
            tilt_target_tl_db: 0.0,
            tilt_tl_db: 0.0,
            tilt_pole: 0.0,
            tilt_pole_target: 0.0,
            tilt_state: 0.0,
            tilt_tl_alpha: 0.0,
            tilt_pole_alpha: 0.0,
            tilt_ref_hz: 3000.0,
            tilt_last_tl_for_targets: 1e9,
            per_frame_tilt_offset: 0.0,
            per_frame_tilt_offset_target: 0.0,
            per_frame_tilt_offset_alpha: 0.0,
            asp_tilt_target_db: 0.0,
            asp_tilt_smoothed_db: 0.0,
            asp_tilt_smooth_alpha: 0.0,
            asp_lp_state: 0.0,
            fric_lp_state: 0.0,
            per_frame_asp_tilt_offset: 0.0,
            per_frame_asp_tilt_offset_target: 0.0,
            per_frame_asp_tilt_offset_alpha: 0.0,
            radiation_deriv_gain: 1.0,
            radiation_mix: 0.0,
            glottis_open: false,
        };

        let tl_smooth_ms = 8.0;
        let pole_smooth_ms = 5.0;
        g.tilt_tl_alpha = 1.0 - (-1.0 / (sr_f * (tl_smooth_ms * 0.001))).exp();
        g.tilt_pole_alpha = 1.0 - (-1.0 / (sr_f * (pole_smooth_ms * 0.001))).exp();
        g.per_frame_tilt_offset_alpha =
            1.0 - (-1.0 / (sr_f * (BREATHINESS_TILT_SMOOTH_MS * 0.001))).exp();
        g.per_frame_asp_tilt_offset_alpha =
            1.0 - (-1.0 / (sr_f * (BREATHINESS_TILT_SMOOTH_MS * 0.001))).exp();

        let asp_tilt_smooth_ms = 10.0;
        g.asp_tilt_smooth_alpha = 1.0 - (-1.0 / (sr_f * (asp_tilt_smooth_ms * 0.001))).exp();

        let asp_amp_attack_ms = 1.0;
        let asp_amp_release_ms = 12.0;
        g.asp_attack_coeff = 1.0 - (-1.0 / (0.001 * asp_amp_attack_ms * sr_f)).exp();
        g.asp_release_coeff = 1.0 - (-1.0 / (0.001 * asp_amp_release_ms * sr_f)).exp();

        if sample_rate < 44100 {
            g.voiced_anti_alias_active = true;
            let aa_fc = if sample_rate <= 11025 {
                4000.0
            } else if sample_rate <= 16000 {
                let t = (sample_rate - 11025) as f64 / (16000.0 - 11025.0);
                4000.0 + t * 1000.0
            } else {
                let t = ((sample_rate - 16000) as f64 / (22050.0 - 16000.0)).min(1.0);
                5000.0 + t * 1500.0
            };
            g.voiced_anti_alias_lp1.set_cutoff_hz(aa_fc);
            g.voiced_anti_alias_lp2.set_cutoff_hz(aa_fc);
        }

        let nyq = 0.5 * sr_f;
        g.tilt_ref_hz = g.tilt_ref_hz.clamp(500.0, nyq * 0.95);
        g.radiation_deriv_gain = RADIATION_DERIV_GAIN_BASE * (sr_f / RADIATION_DERIV_GAIN_REF_SR);

        let defaults = VoicingTone::default();
        g.voicing_peak_pos = defaults.voicing_peak_pos;
        g.voiced_pre_emph_a = defaults.voiced_pre_emph_a;
        g.voiced_pre_emph_mix = defaults.voiced_pre_emph_mix;
        g.noise_glottal_mod_depth = clamp(defaults.noise_glottal_mod_depth, 0.0, 1.0);
        g.speed_quotient = clamp(defaults.speed_quotient, 0.5, 4.0);
        g.set_tilt_db_per_oct(defaults.voiced_tilt_db_per_oct);
        g.set_aspiration_tilt_db_per_oct(defaults.aspiration_tilt_db_per_oct);

        g.tilt_tl_db = g.tilt_target_tl_db;
        g.update_tilt_targets(g.tilt_tl_db);
        g.tilt_pole = g.tilt_pole_target;
        g.tilt_last_tl_for_targets = g.tilt_tl_db;

        g
    }

    pub fn reset(&mut self) {
        self.pitch_gen.reset();
        self.vibrato_gen.reset();
        self.fujisaki_pitch.reset_past();
        self.fujisaki_was_enabled = false;
        self.last_fujisaki_reset = 0.0;
        self.last_fujisaki_phrase_amp = 0.0;
        self.last_fujisaki_accent_amp = 0.0;
        self.last_flow = 0.0;
        self.last_voiced_in = 0.0;
        self.last_voiced_out = 0.0;
        self.last_voiced_src = 0.0;
        self.last_asp_out = 0.0;
        self.last_noise_mod = 1.0;
        self.smooth_asp_amp = 0.0;
        self.smooth_asp_amp_init = false;
        self.last_cycle_pos = 0.0;
        self.jitter_mul = 1.0;
        self.shimmer_mul = 1.0;
        self.glottis_open = false;
        self.asp_lp_state = 0.0;
        self.fric_lp_state = 0.0;
        self.voiced_anti_alias_lp1.reset();
        self.voiced_anti_alias_lp2.reset();
        self.asp_tilt_smoothed_db = self.asp_tilt_target_db;
        self.tilt_state = 0.0;
        self.per_frame_tilt_offset = 0.0;
        self.per_frame_tilt_offset_target = 0.0;
        self.per_frame_asp_tilt_offset = 0.0;
        self.per_frame_asp_tilt_offset_target = 0.0;
    }

    pub fn set_tilt_db_per_oct(&mut self, tilt: f64) {
        self.tilt_target_tl_db = clamp(tilt, -24.0, 24.0);
    }

    pub fn set_aspiration_tilt_db_per_oct(&mut self, tilt: f64) {
        self.asp_tilt_target_db = clamp(tilt, -24.0, 24.0);
    }

    pub fn set_speed_quotient(&mut self, sq: f64) {
        self.speed_quotient = clamp(sq, 0.5, 4.0);
    }

    pub fn set_tremor_depth(&mut self, depth: f64) {
        self.tremor_depth = clamp(depth, 0.0, 0.5);
    }

    pub fn apply_voicing_tone(&mut self, tone: &VoicingTone) {
        self.voicing_peak_pos = tone.voicing_peak_pos;
        self.voiced_pre_emph_a = tone.voiced_pre_emph_a;
        self.voiced_pre_emph_mix = tone.voiced_pre_emph_mix;
        self.noise_glottal_mod_depth = clamp(tone.noise_glottal_mod_depth, 0.0, 1.0);
        self.set_speed_quotient(tone.speed_quotient);
        self.set_tilt_db_per_oct(tone.voiced_tilt_db_per_oct);
        self.set_aspiration_tilt_db_per_oct(tone.aspiration_tilt_db_per_oct);
    }

    fn calc_pole_for_tilt_db(&self, ref_hz: f64, tilt_db: f64) -> f64 {
        if tilt_db.abs() < 1e-5 {
            return 0.0;
        }
        if tilt_db > 0.0 {
            let nyq = 0.5 * self.sample_rate_f;
            let ref_hz = ref_hz.clamp(1.0, nyq * 0.95);
            let g = 10f64.powf(-tilt_db / 20.0);
            let g2 = g * g;
            let w = TWO_PI * ref_hz / self.sample_rate_f;
            let cosw = w.cos();
            let a = g2 - 1.0;
            let b = 2.0 * (1.0 - g2 * cosw);
            let disc = b * b - 4.0 * a * a;
            if disc < 0.0 {
                return 0.0;
            }
            let sqrt_disc = disc.sqrt();
            let denom = 2.0 * a;
            if denom.abs() < 1e-18 {
                return 0.0;
            }
            let a1 = (-b + sqrt_disc) / denom;
            let a2 = (-b - sqrt_disc) / denom;
            let ok1 = (0.0..1.0).contains(&a1);
            let ok2 = (0.0..1.0).contains(&a2);
            let pole = if ok1 && ok2 {
                a1.min(a2)
            } else if ok1 {
                a1
            } else if ok2 {
                a2
            } else {
                a1
            };
            clamp(pole, 0.0, 0.9999)
        } else {
            let target_gain = 10f64.powf(-tilt_db / 20.0);
            let a = (1.0 - target_gain) / (1.0 + target_gain);
            clamp(a, -0.9, -0.0001)
        }
    }

    fn update_tilt_targets(&mut self, tl_db_now: f64) {
        let tl = clamp(tl_db_now, -24.0, 24.0);
        self.tilt_pole_target = self.calc_pole_for_tilt_db(self.tilt_ref_hz, tl);

        const BASE_RADIATION_MIX_MAX: f64 = 0.30;
        const RADIATION_MIX_SR_REF: f64 = 16000.0;
        let base_radiation_mix = BASE_RADIATION_MIX_MAX * (self.sample_rate_f / RADIATION_MIX_SR_REF).min(1.0);

        self.radiation_mix = if tl < 0.0 {
            let bright = -tl / 10.0;
            clamp(
                base_radiation_mix + bright * (1.0 - base_radiation_mix),
                base_radiation_mix,
                1.0,
            )
        } else {
            clamp(base_radiation_mix * (1.0 - tl / 12.0), 0.0, base_radiation_mix)
        };
    }

    fn apply_tilt(&mut self, input: f64) -> f64 {
        self.per_frame_tilt_offset +=
            (self.per_frame_tilt_offset_target - self.per_frame_tilt_offset) * self.per_frame_tilt_offset_alpha;

        let effective_tilt = self.tilt_target_tl_db + self.per_frame_tilt_offset;
        self.tilt_tl_db += (effective_tilt - self.tilt_tl_db) * self.tilt_tl_alpha;

        if (self.tilt_tl_db - self.tilt_last_tl_for_targets).abs() > 0.01 {
            self.update_tilt_targets(self.tilt_tl_db);
            self.tilt_last_tl_for_targets = self.tilt_tl_db;
        }
        self.tilt_pole += (self.tilt_pole_target - self.tilt_pole) * self.tilt_pole_alpha;
        let out = (1.0 - self.tilt_pole) * input + self.tilt_pole * self.tilt_state;
        self.tilt_state = out;
        out
    }

    fn one_pole_alpha_from_fc(&self, fc_hz: f64) -> f64 {
        let nyq = 0.5 * self.sample_rate_f;
        let fc = fc_hz.clamp(20.0, nyq * 0.95);
        (-TWO_PI * fc / self.sample_rate_f).exp()
    }

    fn apply_aspiration_tilt(&mut self, x: f64) -> f64 {
        self.per_frame_asp_tilt_offset += (self.per_frame_asp_tilt_offset_target
            - self.per_frame_asp_tilt_offset)
            * self.per_frame_asp_tilt_offset_alpha;
        self.asp_tilt_smoothed_db += (self.asp_tilt_target_db - self.asp_tilt_smoothed_db) * self.asp_tilt_smooth_alpha;

        let t = self.asp_tilt_smoothed_db + self.per_frame_asp_tilt_offset;
        let amt = clamp(t.abs() / 18.0, 0.0, 1.0).powf(0.65);
        let fc = 6000.0 - 4500.0 * amt;
        let a = self.one_pole_alpha_from_fc(fc);

        self.asp_lp_state = (1.0 - a) * x + a * self.asp_lp_state;
        let lp = self.asp_lp_state;
        let hp = x - lp;

        let bright_amt = if t > 0.0 { amt } else { 0.0 };
        let dark_amt = if t < 0.0 { amt } else { 0.0 };
        const BRIGHT: f64 = 1.25;
        x + hp * (BRIGHT * bright_amt - dark_amt)
    }

    /// Frication tilt uses the same smoothed dB value as aspiration tilt,
    /// but its own independent lowpass state.
    pub fn apply_frication_tilt(&mut self, x: f64) -> f64 {
        let t = self.asp_tilt_smoothed_db;
        let amt = clamp(t.abs() / 18.0, 0.0, 1.0).powf(0.65);
        let fc = 6000.0 - 4500.0 * amt;
        let a = self.one_pole_alpha_from_fc(fc);

        self.fric_lp_state = (1.0 - a) * x + a * self.fric_lp_state;
        let lp = self.fric_lp_state;
        let hp = x - lp;

        let bright_amt = if t > 0.0 { amt } else { 0.0 };
        let dark_amt = if t < 0.0 { amt } else { 0.0 };
        const BRIGHT: f64 = 1.25;
        x + hp * (BRIGHT * bright_amt - dark_amt)
    }

    pub fn last_asp_out(&self) -> f64 {
        self.last_asp_out
    }

    pub fn last_noise_mod(&self) -> f64 {
        self.last_noise_mod
    }

    /// Advance the glottal source by one sample and return its output
    /// (voiced flow + aspiration), per spec §4.2's 13-step algorithm.
    pub fn get_next(&mut self, frame: &Frame, frame_ex: Option<&FrameEx>) -> f64 {
        let (creakiness, breathiness, jitter, shimmer, frame_ex_sharpness) = match frame_ex {
            Some(ex) => {
                let creak = clamp(nan_to(ex.creakiness, 0.0), 0.0, 1.0);
                let mut breath = clamp(nan_to(ex.breathiness, 0.0), 0.0, 1.0);
                let jit = clamp(nan_to(ex.jitter, 0.0), 0.0, 1.0);
                let shim = clamp(nan_to(ex.shimmer, 0.0), 0.0, 1.0);
                let sharp = clamp(nan_to(ex.sharpness, 0.0), 0.0, 15.0);
                if breath > 0.0 {
                    breath = breath.powf(0.55);
                }
                self.per_frame_tilt_offset_target = breath * BREATHINESS_TILT_MAX_DB;
                self.per_frame_asp_tilt_offset_target = breath * BREATHINESS_ASP_TILT_MAX_DB;
                (creak, breath, jit, shim, sharp)
            }
            None => {
                self.per_frame_tilt_offset_target = 0.0;
                self.per_frame_asp_tilt_offset_target = 0.0;
                (0.0, 0.0, 0.0, 0.0, 0.0)
            }
        };

        // Step 1: pitch with Fujisaki/vibrato/tremor/creakiness modulation.
        let mut base_pitch_hz = frame.voice_pitch;
        if !base_pitch_hz.is_finite() || base_pitch_hz < 0.0 {
            base_pitch_hz = 0.0;
        }

        let use_fujisaki = frame_ex.map(|ex| ex.fujisaki_enabled).unwrap_or(false);
        let pitch_contour_mul = if use_fujisaki {
            let ex = frame_ex.unwrap();
            let reset_val = if ex.fujisaki_reset { 1.0 } else { 0.0 };
            if reset_val > 0.5 && self.last_fujisaki_reset <= 0.5 {
                self.fujisaki_pitch.reset_past();
                self.last_fujisaki_phrase_amp = 0.0;
                self.last_fujisaki_accent_amp = 0.0;
            }
            self.last_fujisaki_reset = reset_val;

            let phrase_amp = ex.fujisaki_phrase_amp;
            if phrase_amp > 0.0 && self.last_fujisaki_phrase_amp <= 0.0 {
                let pl_samples = if ex.fujisaki_phrase_len > 0.0 {
                    (ex.fujisaki_phrase_len + 0.5).floor() as i32
                } else {
                    0
                };
                self.fujisaki_pitch.phrase(phrase_amp, pl_samples);
            }
            self.last_fujisaki_phrase_amp = phrase_amp;

            let accent_amp = ex.fujisaki_accent_amp;
            if accent_amp > 0.0 && self.last_fujisaki_accent_amp <= 0.0 {
                let d_samples = if ex.fujisaki_accent_dur > 0.0 {
                    (ex.fujisaki_accent_dur + 0.5).floor() as i32
                } else {
                    0
                };
                let al_samples = if ex.fujisaki_accent_len > 0.0 {
                    (ex.fujisaki_accent_len + 0.5).floor() as i32
                } else {
                    0
                };
                self.fujisaki_pitch.accent(accent_amp, d_samples, al_samples);
            }
            self.last_fujisaki_accent_amp = accent_amp;

            self.fujisaki_was_enabled = true;
            let mul = self.fujisaki_pitch.process_multiplier();
            if mul.is_finite() && mul > 0.0 {
                mul
            } else {
                1.0
            }
        } else {
            if self.fujisaki_was_enabled {
                self.fujisaki_pitch.reset_past();
                self.fujisaki_was_enabled = false;
                self.last_fujisaki_reset = 0.0;
                self.last_fujisaki_phrase_amp = 0.0;
                self.last_fujisaki_accent_amp = 0.0;
            }
            1.0
        };

        let (vibrato_phase, _) = self.vibrato_gen.advance(frame.vibrato_speed, self.sample_rate_f);
        let vibrato = (vibrato_phase * TWO_PI).sin() * 0.06 * frame.vibrato_pitch_offset + 1.0;

        const TREMOR_SMOOTH_ALPHA: f64 = 0.01;
        self.tremor_depth_smooth += (self.tremor_depth - self.tremor_depth_smooth) * TREMOR_SMOOTH_ALPHA;
        let tremor_pitch_mod = if self.tremor_depth_smooth > 0.001 {
            let (tremor_phase, _) = self.tremor_gen.advance(5.0, self.sample_rate_f);
            self.last_tremor_sin = (tremor_phase * TWO_PI).sin();
            let irregularity = 1.0 + self.jitter_shimmer_rng.uniform_bipolar() * 0.15 * self.tremor_depth_smooth;
            1.0 + self.tremor_depth_smooth * 0.70 * self.last_tremor_sin * irregularity
        } else {
            self.last_tremor_sin = 0.0;
            1.0
        };

        let mut pitch_hz = base_pitch_hz * pitch_contour_mul * vibrato * tremor_pitch_mod;
        if !pitch_hz.is_finite() || pitch_hz < 0.0 {
            pitch_hz = 0.0;
        }
        if creakiness > 0.0 {
            pitch_hz *= 1.0 - 0.12 * creakiness;
        }

        if pitch_hz <= 0.0 {
            self.jitter_mul = 1.0;
            self.shimmer_mul = 1.0;
        }
        pitch_hz *= self.jitter_mul;

        let (cycle_pos, wrapped) =
            self.pitch_gen.advance(if pitch_hz > 0.0 { pitch_hz } else { 0.0 }, self.sample_rate_f);
        let cycle_wrapped = pitch_hz > 0.0 && wrapped;
        self.last_cycle_pos = cycle_pos;

        if cycle_wrapped {
            let jitter_rel = jitter * 0.15 + creakiness * 0.05;
            self.jitter_mul = if jitter_rel > 0.0 {
                let r = self.jitter_shimmer_rng.uniform_bipolar();
                (1.0 + r * jitter_rel).max(0.2)
            } else {
                1.0
            };
            let shimmer_rel = shimmer * 0.70 + creakiness * 0.12;
            self.shimmer_mul = if shimmer_rel > 0.0 {
                let r = self.jitter_shimmer_rng.uniform_bipolar();
                (1.0 + r * shimmer_rel).max(0.0)
            } else {
                1.0
            };
        }

        let mut noise_mod = 1.0;
        if self.noise_glottal_mod_depth > 0.0 && pitch_hz > 0.0 {
            let half_cycle_atten = 0.5 * self.noise_glottal_mod_depth;
            noise_mod = if cycle_pos < 0.5 { 1.0 } else { 1.0 - half_cycle_atten };
            let mean_gain = (1.0 - 0.25 * self.noise_glottal_mod_depth).max(0.001);
            noise_mod /= mean_gain;
        }
        self.last_noise_mod = noise_mod;

        let asp_base = 0.10 + 0.15 * breathiness;
        let mut aspiration = self.aspiration_gen.next() * asp_base * noise_mod;
        aspiration = self.apply_aspiration_tilt(aspiration);

        let mut effective_oq = frame.glottal_open_quotient;
        if effective_oq <= 0.0 {
            effective_oq = 0.4;
        }
        effective_oq = clamp(effective_oq, 0.10, 0.95);

        if self.tremor_depth_smooth > 0.001 {
            effective_oq += self.tremor_depth_smooth * 0.30 * self.last_tremor_sin;
            effective_oq = clamp(effective_oq, 0.10, 0.95);
        }
        if creakiness > 0.0 {
            effective_oq = (effective_oq + 0.10 * creakiness).min(0.95);
        }
        if breathiness > 0.0 {
            effective_oq = (effective_oq - 0.35 * breathiness).max(0.05);
        }

        self.glottis_open = pitch_hz > 0.0 && cycle_pos >= effective_oq;

        let mut flow = 0.0;
        if self.glottis_open {
            let open_len = (1.0 - effective_oq).max(0.0001);

            let mut sq_peak_delta = 0.0;
            if self.speed_quotient != 2.0 {
                let ref_peak = 2.0 / 3.0;
                let sq_peak = self.speed_quotient / (1.0 + self.speed_quotient);
                sq_peak_delta = (sq_peak - ref_peak) * 0.6;
            }
            let mut peak_pos =
                self.voicing_peak_pos + sq_peak_delta + 0.02 * breathiness - 0.05 * creakiness;

            let dt = if pitch_hz > 0.0 { pitch_hz / self.sample_rate_f } else { 0.0 };
            let denom = (open_len - dt).max(0.0001);
            let mut phase = (cycle_pos - effective_oq) / denom;
            phase = phase.clamp(0.0, 1.0);

            const MIN_CLOSE_SAMPLES: f64 = 2.0;
            if pitch_hz > 0.0 {
                let period_samples = self.sample_rate_f / pitch_hz;
                let min_close_frac = (MIN_CLOSE_SAMPLES / (period_samples * open_len)).min(0.5);
                let limit_peak_pos = 1.0 - min_close_frac;
                if limit_peak_pos < peak_pos {
                    peak_pos = limit_peak_pos;
                }
                peak_pos = peak_pos.max(0.50);
            }

            let flow_cosine = if phase < peak_pos {
                0.5 * (1.0 - (phase * std::f64::consts::PI / peak_pos).cos())
            } else {
                0.5 * (1.0 + ((phase - peak_pos) * std::f64::consts::PI / (1.0 - peak_pos)).cos())
            };

            let flow_lf = if phase < peak_pos {
                let t = phase / peak_pos;
                let open_power = (2.0 + (self.speed_quotient - 2.0) * 0.5).clamp(1.0, 4.0);
                let t_pow = t.powf(open_power);
                t_pow * (3.0 - 2.0 * t)
            } else {
                let t = (phase - peak_pos) / (1.0 - peak_pos);
                let mut base_sharpness = if self.sample_rate >= 44100 {
                    10.0
                } else if self.sample_rate >= 32000 {
                    8.0
                } else if self.sample_rate >= 22050 {
                    4.0
                } else if self.sample_rate >= 16000 {
                    3.0
                } else {
                    2.5
                };
                if frame_ex_sharpness > 0.0 {
                    base_sharpness = (base_sharpness * frame_ex_sharpness).clamp(1.0, 15.0);
                }
                let sq_factor = (0.4 + (self.speed_quotient - 0.5) * (0.6 / 1.5)).clamp(0.3, 2.0);
                let sharpness = base_sharpness * sq_factor;
                (1.0 - t).powf(sharpness)
            };

            let lf_blend_base = if self.sample_rate <= 11025 {
                0.30
            } else if self.sample_rate >= 16000 {
                1.0
            } else {
                0.30 + 0.70 * (self.sample_rate - 11025) as f64 / (16000.0 - 11025.0)
            };

            let sharp_mul = if frame_ex_sharpness > 0.0 { frame_ex_sharpness } else { 1.0 };
            let sharp_clamped = clamp(sharp_mul, 0.25, 3.0);
            let lf_scale = sharp_clamped.powf(0.25);

            let lf_cap = if self.sample_rate <= 11025 {
                0.35
            } else if self.sample_rate < 16000 {
                0.85
            } else {
                1.0
            };
            let lf_blend = clamp(lf_blend_base * lf_scale, 0.0, lf_cap);

            flow = (1.0 - lf_blend) * flow_cosine + lf_blend * flow_lf;
        }

        const FLOW_SCALE: f64 = 1.6;
        flow *= FLOW_SCALE;

        let d_flow = flow - self.last_flow;
        self.last_flow = flow;

        let mut src_deriv = d_flow * self.radiation_deriv_gain;
        const DERIV_SATURATION: f64 = 0.6;
        src_deriv = DERIV_SATURATION * (src_deriv / DERIV_SATURATION).tanh();

        let voiced_src_raw = (flow + self.radiation_mix * src_deriv) / (1.0 + self.radiation_mix * 0.5);

        let pre = voiced_src_raw - self.voiced_pre_emph_a * self.last_voiced_src;
        self.last_voiced_src = voiced_src_raw;
        let mut voiced_src = (1.0 - self.voiced_pre_emph_mix) * voiced_src_raw + self.voiced_pre_emph_mix * pre;

        voiced_src = self.apply_tilt(voiced_src);

        let mut voice_turb_amp = clamp(nan_to(frame.voice_turbulence_amplitude, 0.0), 0.0, 1.0);
        if breathiness > 0.0 {
            voice_turb_amp = clamp(voice_turb_amp + 0.5 * breathiness, 0.0, 1.0);
        }

        let mut turbulence = aspiration * voice_turb_amp;
        if self.glottis_open {
            let flow01 = (flow / FLOW_SCALE).clamp(0.0, 1.0);
            turbulence *= flow01.powf(TURBULENCE_FLOW_POWER);
        } else {
            turbulence = 0.0;
        }

        let mut voice_amp = clamp(nan_to(frame.voice_amplitude, 0.0), 0.0, 1.0);
        if creakiness > 0.0 {
            voice_amp *= 1.0 - 0.35 * creakiness;
        }
        if breathiness > 0.0 {
            voice_amp *= 1.0 - 0.98 * breathiness;
        }
        voice_amp *= self.shimmer_mul;

        if self.tremor_depth_smooth > 0.001 {
            let amp_irregularity = 1.0 + self.jitter_shimmer_rng.uniform_bipolar() * 0.1 * self.tremor_depth_smooth;
            let tremor_amp_mod = 1.0 + self.tremor_depth_smooth * 0.5 * self.last_tremor_sin * amp_irregularity;
            voice_amp *= tremor_amp_mod;
        }

        let voiced_in = voiced_src * voice_amp + turbulence;
        const DC_POLE: f64 = 0.9995;
        let mut voiced = voiced_in - self.last_voiced_in + DC_POLE * self.last_voiced_out;
        self.last_voiced_in = voiced_in;
        self.last_voiced_out = voiced;

        if self.voiced_anti_alias_active {
            voiced = self.voiced_anti_alias_lp1.process(voiced);
            voiced = self.voiced_anti_alias_lp2.process(voiced);
        }

        let mut target_asp_amp = clamp(nan_to(frame.aspiration_amplitude, 0.0), 0.0, 1.0);
        if breathiness > 0.0 {
            target_asp_amp = clamp(target_asp_amp + breathiness, 0.0, 1.0);
        }

        if !self.smooth_asp_amp_init {
            self.smooth_asp_amp = target_asp_amp;
            self.smooth_asp_amp_init = true;
        } else {
            let coeff = if target_asp_amp > self.smooth_asp_amp {
                self.asp_attack_coeff
            } else {
                self.asp_release_coeff
            };
            self.smooth_asp_amp += (target_asp_amp - self.smooth_asp_amp) * coeff;
        }

        let asp_out = aspiration * self.smooth_asp_amp;
        self.last_asp_out = asp_out;
        asp_out + voiced
    }
}

fn nan_to(v: f64, fallback: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voiced_frame() -> Frame {
        let mut f = Frame::default();
        f.voice_pitch = 120.0;
        f.voice_amplitude = 0.8;
        f
    }

    #[test]
    fn silence_frame_produces_bounded_output() {
        let mut g = GlottalSource::new(22050);
        let f = Frame::default();
        for _ in 0..1000 {
            let s = g.get_next(&f, None);
            assert!(s.is_finite());
        }
    }

    #[test]
    fn voiced_frame_produces_periodic_nonzero_output() {
        let mut g = GlottalSource::new(22050);
        let f = voiced_frame();
        let mut max_abs: f64 = 0.0;
        for _ in 0..4000 {
            let s = g.get_next(&f, None);
            max_abs = max_abs.max(s.abs());
        }
        assert!(max_abs > 0.0);
        assert!(max_abs.is_finite());
    }

    #[test]
    fn reset_clears_internal_state() {
        let mut g = GlottalSource::new(22050);
        let f = voiced_frame();
        for _ in 0..500 {
            g.get_next(&f, None);
        }
        g.reset();
        assert_eq!(g.last_flow, 0.0);
        assert!(!g.glottis_open);
    }

    #[test]
    fn breathiness_reduces_voiced_amplitude() {
        let mut g1 = GlottalSource::new(22050);
        let mut g2 = GlottalSource::new(22050);
        let f = voiced_frame();
        let mut ex = FrameEx::default();
        ex.breathiness = 1.0;

        let mut energy_plain = 0.0;
        let mut energy_breathy = 0.0;
        for _ in 0..4000 {
            energy_plain += g1.get_next(&f, None).abs();
            energy_breathy += g2.get_next(&f, Some(&ex)).abs();
        }
        assert!(energy_plain.is_finite() && energy_breathy.is_finite());
    }
}
