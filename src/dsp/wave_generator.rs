//! Per-sample orchestration tying the glottal source, noise, and the
//! cascade/parallel banks together into PCM output (spec §4.4).
//!
//! The original DSP's `WaveGenerator` is an abstract base with a single
//! `generate()` virtual method (`original_source/src/waveGenerator.h`);
//! this crate expresses the same seam as a trait, with
//! [`SpeechWaveGenerator`] as the one production implementation.

use super::cascade::CascadeBank;
use super::filters::{AsymmetricSmoother, HighShelf, OnePoleLowpass};
use super::glottal::GlottalSource;
use super::noise::NoiseGenerator;
use super::parallel::ParallelBank;
use super::voicing_tone::VoicingTone;
use crate::frame::{Frame, FrameEx, SampleVal};

/// A seam for anything that can produce the next output sample given a
/// frame/frameEx pair, mirroring the original's abstract `generate()`.
pub trait WaveGenerator {
    fn generate(&mut self, frame: Option<&Frame>, frame_ex: Option<&FrameEx>) -> SampleVal;
    fn reset(&mut self);
}

fn one_pole_coeff(time_const_ms: f64, sample_rate: f64) -> f64 {
    (-1.0 / (0.001 * time_const_ms * sample_rate)).exp()
}

/// Production implementation of the per-sample synthesis pipeline
/// (spec §4.4, 12-step algorithm).
pub struct SpeechWaveGenerator {
    sample_rate: f64,

    glottal: GlottalSource,
    cascade: CascadeBank,
    parallel: ParallelBank,
    frication_noise: NoiseGenerator,

    pre_formant_gain_smooth: AsymmetricSmoother,
    frication_amp_smooth: AsymmetricSmoother,

    last_raw_frication: f64,
    last_raw_aspiration: f64,
    burst_envelope: f64,
    burst_hold_coeff: f64,

    fric_lp_burst_1: OnePoleLowpass,
    fric_lp_burst_2: OnePoleLowpass,
    fric_lp_sustain_1: OnePoleLowpass,
    fric_lp_sustain_2: OnePoleLowpass,

    asp_lp_1: OnePoleLowpass,
    asp_lp_2: OnePoleLowpass,

    dc_block_state_in: f64,
    dc_block_state_out: f64,

    high_shelf: HighShelf,
    shelf_mix_smooth: AsymmetricSmoother,
    voicing_tone: VoicingTone,

    was_silent: bool,
    fade_out_remaining: i32,
    fade_out_step: f64,
    last_output_sample: f64,
}

impl SpeechWaveGenerator {
    pub fn new(sample_rate: i32) -> Self {
        let sr_f = sample_rate as f64;
        let mut g = SpeechWaveGenerator {
            sample_rate: sr_f,
            glottal: GlottalSource::new(sample_rate),
            cascade: CascadeBank::new(sample_rate),
            parallel: ParallelBank::new(sample_rate),
            frication_noise: NoiseGenerator::new(0xC0FF_EE01),
            pre_formant_gain_smooth: AsymmetricSmoother::new(sr_f, 1.0, 0.5),
            frication_amp_smooth: AsymmetricSmoother::new(sr_f, 0.8, 1.2),
            last_raw_frication: 0.0,
            last_raw_aspiration: 0.0,
            burst_envelope: 0.0,
            burst_hold_coeff: one_pole_coeff(6.0, sr_f),
            fric_lp_burst_1: OnePoleLowpass::new(sample_rate),
            fric_lp_burst_2: OnePoleLowpass::new(sample_rate),
            fric_lp_sustain_1: OnePoleLowpass::new(sample_rate),
            fric_lp_sustain_2: OnePoleLowpass::new(sample_rate),
            asp_lp_1: OnePoleLowpass::new(sample_rate),
            asp_lp_2: OnePoleLowpass::new(sample_rate),
            dc_block_state_in: 0.0,
            dc_block_state_out: 0.0,
            high_shelf: HighShelf::new(sample_rate),
            shelf_mix_smooth: AsymmetricSmoother::new(sr_f, 4.0, 4.0),
            voicing_tone: VoicingTone::default(),
            was_silent: true,
            fade_out_remaining: 0,
            fade_out_step: 0.0,
            last_output_sample: 0.0,
        };

        let burst_fc = interp_by_sample_rate(sr_f, 3800.0, 4200.0);
        let sustain_fc = interp_by_sample_rate(sr_f, 5000.0, 14000.0);
        g.fric_lp_burst_1.set_cutoff_hz(burst_fc);
        g.fric_lp_burst_2.set_cutoff_hz(burst_fc);
        g.fric_lp_sustain_1.set_cutoff_hz(sustain_fc);
        g.fric_lp_sustain_2.set_cutoff_hz(sustain_fc);

        let asp_fc = interp_by_sample_rate(sr_f, 2200.0, 2500.0);
        g.asp_lp_1.set_cutoff_hz(asp_fc);
        g.asp_lp_2.set_cutoff_hz(asp_fc);

        g.apply_voicing_tone(&VoicingTone::default());
        g
    }

    pub fn apply_voicing_tone(&mut self, tone: &VoicingTone) {
        self.voicing_tone = *tone;
        self.glottal.apply_voicing_tone(tone);
        self.cascade.apply_voicing_tone(tone);
        self.high_shelf.set_params(tone.high_shelf_gain_db, tone.high_shelf_fc_hz, tone.high_shelf_q);
    }

    pub fn voicing_tone_snapshot(&self) -> VoicingTone {
        self.voicing_tone
    }

    fn dc_block(&mut self, input: f64) -> f64 {
        const POLE: f64 = 0.9995;
        let out = input - self.dc_block_state_in + POLE * self.dc_block_state_out;
        self.dc_block_state_in = input;
        self.dc_block_state_out = out;
        out
    }
}

fn interp_by_sample_rate(sr: f64, at_11025: f64, at_44100: f64) -> f64 {
    let t = ((sr - 11025.0) / (44100.0 - 11025.0)).clamp(0.0, 1.0);
    at_11025 + t * (at_44100 - at_11025)
}

impl WaveGenerator for SpeechWaveGenerator {
    fn reset(&mut self) {
        self.glottal.reset();
        self.cascade.reset();
        self.parallel.reset();
        self.dc_block_state_in = 0.0;
        self.dc_block_state_out = 0.0;
        self.high_shelf.reset();
        self.fric_lp_burst_1.reset();
        self.fric_lp_burst_2.reset();
        self.fric_lp_sustain_1.reset();
        self.fric_lp_sustain_2.reset();
        self.asp_lp_1.reset();
        self.asp_lp_2.reset();
        self.burst_envelope = 0.0;
        self.was_silent = true;
        self.fade_out_remaining = 0;
        self.last_output_sample = 0.0;
    }

    fn generate(&mut self, frame: Option<&Frame>, frame_ex: Option<&FrameEx>) -> SampleVal {
        // Step 1: NULL frame -> silence, with a short fade-to-zero from
        // the last rendered sample to avoid a click.
        let frame = match frame {
            Some(f) => {
                self.was_silent = false;
                f
            }
            None => {
                if !self.was_silent {
                    self.was_silent = true;
                    const FADE_MS: f64 = 4.0;
                    self.fade_out_remaining = (FADE_MS * 0.001 * self.sample_rate) as i32;
                    self.fade_out_step = if self.fade_out_remaining > 0 {
                        self.last_output_sample / self.fade_out_remaining as f64
                    } else {
                        0.0
                    };
                }
                if self.fade_out_remaining > 0 {
                    self.last_output_sample -= self.fade_out_step;
                    self.fade_out_remaining -= 1;
                } else {
                    self.last_output_sample = 0.0;
                }
                self.cascade.decay(0.995);
                self.parallel.decay(0.995);
                return clamp_to_sample(self.last_output_sample);
            }
        };

        // Step 2: smooth preFormantGain.
        let pre_gain = self.pre_formant_gain_smooth.process(frame.pre_formant_gain.max(0.0));

        // Step 3: glottal source. The Fujisaki-Bartman pitch overlay
        // (spec §4.8) is applied inside `GlottalSource::get_next` itself,
        // not here. `glottis_open` is only known after this
        // call and is shared with the cascade/parallel banks below.
        let voice = self.glottal.get_next(frame, frame_ex);
        let glottis_open = self.glottal.glottis_open;
        let asp = self.glottal.last_asp_out();
        let voiced_only = voice - asp;

        // Step 4: smoothed frication amplitude.
        let frication_amplitude_target = frame.frication_amplitude.clamp(0.0, 1.0);
        let smoothed_fric_amp = self.frication_amp_smooth.process(frication_amplitude_target);

        // Step 5: burst detection — raw target deltas, gated by (1 - voiceAmp).
        let voice_amp = frame.voice_amplitude.clamp(0.0, 1.0);
        let fric_delta = (frication_amplitude_target - self.last_raw_frication).max(0.0);
        let asp_delta = (frame.aspiration_amplitude.clamp(0.0, 1.0) - self.last_raw_aspiration).max(0.0);
        self.last_raw_frication = frication_amplitude_target;
        self.last_raw_aspiration = frame.aspiration_amplitude.clamp(0.0, 1.0);

        let sr_scale = self.sample_rate / 22050.0;
        let burst_trigger = (fric_delta * 25.0 + asp_delta * 40.0) * sr_scale * (1.0 - voice_amp);
        self.burst_envelope = if burst_trigger > self.burst_envelope {
            burst_trigger
        } else {
            self.burst_envelope * self.burst_hold_coeff
        };
        let burstiness = self.burst_envelope.clamp(0.0, 1.0);

        // Step 7: aspiration lowpass crossfade, re-joined with voiced.
        let asp_filtered = self.asp_lp_2.process(self.asp_lp_1.process(asp));
        let asp_mixed = burstiness * asp_filtered + (1.0 - burstiness) * asp;
        let cascade_input = (voiced_only + asp_mixed) * pre_gain;

        // Step 8: cascade.
        let cascade_out = self.cascade.get_next(frame, frame_ex, glottis_open, cascade_input);

        // Step 9: frication noise, adaptive-lowpass crossfaded burst <-> sustain
        // (the /k/-vs-/t/-vs-/s/ crispness), into the parallel bank.
        let white = self.frication_noise.next();
        let voiced_fric_duck = 1.0 - voice_amp * 0.5;
        let noise_glottal_mod = self.glottal.last_noise_mod();
        let bypass_gain = 1.0 - frame.parallel_bypass.clamp(0.0, 1.0);
        let mut fric_noise =
            white * 0.175 * smoothed_fric_amp * bypass_gain * voiced_fric_duck * noise_glottal_mod;
        let fric_burst = self.fric_lp_burst_2.process(self.fric_lp_burst_1.process(fric_noise));
        let fric_sustain = self.fric_lp_sustain_2.process(self.fric_lp_sustain_1.process(fric_noise));
        fric_noise = burstiness * fric_burst + (1.0 - burstiness) * fric_sustain;
        fric_noise = self.glottal.apply_frication_tilt(fric_noise);
        let parallel_out = self.parallel.get_next(frame, frame_ex, glottis_open, fric_noise * pre_gain);

        // Step 10: sum and DC-block.
        let sum = (cascade_out + parallel_out) * frame.output_gain.max(0.0);
        let sum = self.dc_block(sum);

        // Step 11: high-shelf EQ, ducked during voiceless bursts.
        let shelf_mix_target = 1.0 - 0.9 * burstiness * (1.0 - voice_amp);
        let shelf_mix = self.shelf_mix_smooth.process(shelf_mix_target);
        let shelved = self.high_shelf.process(sum);
        let out = shelf_mix * shelved + (1.0 - shelf_mix) * sum;

        // Step 12: scale and clamp to 16-bit PCM.
        self.last_output_sample = out;
        clamp_to_sample(out * 6000.0)
    }
}

fn clamp_to_sample(v: f64) -> SampleVal {
    v.clamp(-32767.0, 32767.0) as SampleVal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vowel_frame() -> Frame {
        let mut f = Frame::default();
        f.voice_pitch = 120.0;
        f.voice_amplitude = 0.8;
        f.cf1 = 500.0;
        f.cb1 = 60.0;
        f.cf2 = 1500.0;
        f.cb2 = 90.0;
        f.cf3 = 2500.0;
        f.cb3 = 150.0;
        f
    }

    #[test]
    fn null_frame_fades_to_silence_without_clicking() {
        let mut wg = SpeechWaveGenerator::new(22050);
        let frame = vowel_frame();
        for _ in 0..200 {
            wg.generate(Some(&frame), None);
        }
        let mut last = i16::MAX;
        for _ in 0..1000 {
            last = wg.generate(None, None);
        }
        assert_eq!(last, 0);
    }

    #[test]
    fn fujisaki_commands_produce_bounded_output_through_glottal_source() {
        let mut wg = SpeechWaveGenerator::new(22050);
        let frame = vowel_frame();
        let mut ex = FrameEx::default();
        ex.fujisaki_enabled = true;
        ex.fujisaki_reset = true;
        ex.fujisaki_phrase_amp = 1.0;
        ex.fujisaki_accent_amp = 0.5;
        ex.fujisaki_accent_dur = 50.0;
        ex.fujisaki_accent_len = 100.0;
        for _ in 0..200 {
            let s = wg.generate(Some(&frame), Some(&ex));
            assert!(s >= i16::MIN && s <= i16::MAX);
            ex.fujisaki_reset = false;
        }
    }

    #[test]
    fn voiced_frame_produces_bounded_pcm() {
        let mut wg = SpeechWaveGenerator::new(22050);
        let frame = vowel_frame();
        for _ in 0..5000 {
            let s = wg.generate(Some(&frame), None);
            assert!(s >= i16::MIN && s <= i16::MAX);
        }
    }
}
