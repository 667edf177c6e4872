//! Voice profiles: optional, purely overlay-based voice-quality transforms
//! (spec §3 "voice profile set"), grounded on
//! `original_source/src/frontend/voice_profile.h`.
//!
//! A profile never reshapes a pack's phonemes; it only scales/overrides
//! the field values already produced by the base phoneme lookup.

use std::collections::HashMap;

use serde::Deserialize;

use crate::dsp::voicing_tone::VoicingTone;
use crate::frame::Frame;

use super::pack::PhonemeDef;

const FORMANT_COUNT: usize = 6;

fn ones() -> [f64; FORMANT_COUNT] {
    [1.0; FORMANT_COUNT]
}

/// Class-based multiplicative scaling applied before per-phoneme overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassScales {
    pub cf_mul: [f64; FORMANT_COUNT],
    pub pf_mul: [f64; FORMANT_COUNT],
    pub cb_mul: [f64; FORMANT_COUNT],
    pub pb_mul: [f64; FORMANT_COUNT],

    pub voice_pitch_mul: Option<f64>,
    pub end_voice_pitch_mul: Option<f64>,
    pub vibrato_pitch_offset_mul: Option<f64>,
    pub vibrato_speed_mul: Option<f64>,
    pub voice_turbulence_amplitude_mul: Option<f64>,
    pub glottal_open_quotient_mul: Option<f64>,
    pub voice_amplitude_mul: Option<f64>,
    pub aspiration_amplitude_mul: Option<f64>,
    pub frication_amplitude_mul: Option<f64>,
    pub pre_formant_gain_mul: Option<f64>,
    pub output_gain_mul: Option<f64>,
}

impl Default for ClassScales {
    fn default() -> Self {
        ClassScales {
            cf_mul: ones(),
            pf_mul: ones(),
            cb_mul: ones(),
            pb_mul: ones(),
            voice_pitch_mul: None,
            end_voice_pitch_mul: None,
            vibrato_pitch_offset_mul: None,
            vibrato_speed_mul: None,
            voice_turbulence_amplitude_mul: None,
            glottal_open_quotient_mul: None,
            voice_amplitude_mul: None,
            aspiration_amplitude_mul: None,
            frication_amplitude_mul: None,
            pre_formant_gain_mul: None,
            output_gain_mul: None,
        }
    }
}

impl ClassScales {
    fn apply(&self, frame: &mut Frame) {
        let cf = [
            &mut frame.cf1, &mut frame.cf2, &mut frame.cf3, &mut frame.cf4, &mut frame.cf5, &mut frame.cf6,
        ];
        for (v, m) in cf.into_iter().zip(self.cf_mul) {
            *v *= m;
        }
        let pf = [
            &mut frame.pf1, &mut frame.pf2, &mut frame.pf3, &mut frame.pf4, &mut frame.pf5, &mut frame.pf6,
        ];
        for (v, m) in pf.into_iter().zip(self.pf_mul) {
            *v *= m;
        }
        let cb = [
            &mut frame.cb1, &mut frame.cb2, &mut frame.cb3, &mut frame.cb4, &mut frame.cb5, &mut frame.cb6,
        ];
        for (v, m) in cb.into_iter().zip(self.cb_mul) {
            *v *= m;
        }
        let pb = [
            &mut frame.pb1, &mut frame.pb2, &mut frame.pb3, &mut frame.pb4, &mut frame.pb5, &mut frame.pb6,
        ];
        for (v, m) in pb.into_iter().zip(self.pb_mul) {
            *v *= m;
        }
        if let Some(m) = self.voice_pitch_mul {
            frame.voice_pitch *= m;
        }
        if let Some(m) = self.end_voice_pitch_mul {
            frame.end_voice_pitch *= m;
        }
        if let Some(m) = self.vibrato_pitch_offset_mul {
            frame.vibrato_pitch_offset *= m;
        }
        if let Some(m) = self.vibrato_speed_mul {
            frame.vibrato_speed *= m;
        }
        if let Some(m) = self.voice_turbulence_amplitude_mul {
            frame.voice_turbulence_amplitude *= m;
        }
        if let Some(m) = self.glottal_open_quotient_mul {
            frame.glottal_open_quotient *= m;
        }
        if let Some(m) = self.voice_amplitude_mul {
            frame.voice_amplitude *= m;
        }
        if let Some(m) = self.aspiration_amplitude_mul {
            frame.aspiration_amplitude *= m;
        }
        if let Some(m) = self.frication_amplitude_mul {
            frame.frication_amplitude *= m;
        }
        if let Some(m) = self.pre_formant_gain_mul {
            frame.pre_formant_gain *= m;
        }
        if let Some(m) = self.output_gain_mul {
            frame.output_gain *= m;
        }
    }
}

/// Absolute per-phoneme overrides, applied after class scaling.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhonemeOverride {
    #[serde(flatten)]
    pub values: HashMap<String, f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VoiceProfile {
    #[serde(skip)]
    pub name: String,
    pub class_scales: HashMap<String, ClassScales>,
    pub phoneme_overrides: HashMap<String, PhonemeOverride>,
    pub voicing_tone: Option<PartialVoicingTone>,
}

/// A YAML-facing sparse overlay onto [`VoicingTone`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PartialVoicingTone {
    pub voicing_peak_pos: Option<f64>,
    pub voiced_pre_emph_a: Option<f64>,
    pub voiced_pre_emph_mix: Option<f64>,
    pub high_shelf_gain_db: Option<f64>,
    pub high_shelf_fc_hz: Option<f64>,
    pub high_shelf_q: Option<f64>,
    pub voiced_tilt_db_per_oct: Option<f64>,
    pub noise_glottal_mod_depth: Option<f64>,
    pub pitch_sync_f1_delta_hz: Option<f64>,
    pub pitch_sync_b1_delta_hz: Option<f64>,
    pub speed_quotient: Option<f64>,
    pub aspiration_tilt_db_per_oct: Option<f64>,
    pub cascade_bw_scale: Option<f64>,
}

impl PartialVoicingTone {
    pub fn apply_onto(&self, base: &mut VoicingTone) {
        macro_rules! apply {
            ($field:ident) => {
                if let Some(v) = self.$field {
                    base.$field = v;
                }
            };
        }
        apply!(voicing_peak_pos);
        apply!(voiced_pre_emph_a);
        apply!(voiced_pre_emph_mix);
        apply!(high_shelf_gain_db);
        apply!(high_shelf_fc_hz);
        apply!(high_shelf_q);
        apply!(voiced_tilt_db_per_oct);
        apply!(noise_glottal_mod_depth);
        apply!(pitch_sync_f1_delta_hz);
        apply!(pitch_sync_b1_delta_hz);
        apply!(speed_quotient);
        apply!(aspiration_tilt_db_per_oct);
        apply!(cascade_bw_scale);
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoiceProfileSet {
    #[serde(flatten)]
    pub profiles: HashMap<String, VoiceProfile>,
}

impl VoiceProfileSet {
    pub fn get(&self, name: &str) -> Option<&VoiceProfile> {
        self.profiles.get(name)
    }
}

/// Class keys in priority order, most general first, so later classes
/// compound on earlier ones (spec-equivalent of `getPhonemeClassKeys`).
pub fn phoneme_class_keys(def: &PhonemeDef, frication_amplitude: f64) -> Vec<&'static str> {
    let mut keys = Vec::new();
    if def.flags.is_vowel {
        keys.push("vowel");
        return keys;
    }
    keys.push("consonant");
    if def.flags.is_voiced {
        keys.push("voicedConsonant");
    }
    let is_fricative_like = frication_amplitude > 0.05;
    if is_fricative_like && def.flags.is_voiced {
        keys.push("voicedFricative");
    } else if is_fricative_like {
        keys.push("unvoicedFricative");
    }
    if def.flags.is_nasal {
        keys.push("nasal");
    }
    if def.flags.is_liquid {
        keys.push("liquid");
    }
    if def.flags.is_stop {
        keys.push("stop");
    }
    if def.flags.is_affricate {
        keys.push("affricate");
    }
    if def.flags.is_semivowel {
        keys.push("semivowel");
    }
    keys
}

/// Apply a named voice profile to a token's field values in place. A no-op
/// if the profile set is absent, empty-named, or the name is unknown.
pub fn apply_voice_profile(
    frame: &mut Frame,
    def: Option<&PhonemeDef>,
    frication_amplitude: f64,
    profiles: Option<&VoiceProfileSet>,
    profile_name: &str,
) {
    if profile_name.is_empty() {
        return;
    }
    let Some(profiles) = profiles else { return };
    let Some(profile) = profiles.get(profile_name) else { return };

    if let Some(def) = def {
        for key in phoneme_class_keys(def, frication_amplitude) {
            if let Some(scales) = profile.class_scales.get(key) {
                scales.apply(frame);
            }
        }
        if let Some(ov) = profile.phoneme_overrides.get(&phoneme_key_display(def)) {
            for (field_name, value) in &ov.values {
                if let Some(id) = crate::frame::parse_field_id(field_name) {
                    frame.set(id, *value);
                }
            }
        }
    }
}

fn phoneme_key_display(def: &PhonemeDef) -> String {
    def.key.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::pack::PhonemeFlags;

    #[test]
    fn vowel_class_scale_doubles_cf1() {
        let mut profile_set = VoiceProfileSet::default();
        let mut scales = ClassScales::default();
        scales.cf_mul[0] = 2.0;
        let mut profile = VoiceProfile::default();
        profile.class_scales.insert("vowel".to_string(), scales);
        profile_set.profiles.insert("female".to_string(), profile);

        let mut frame = Frame::default();
        frame.cf1 = 500.0;
        let def = PhonemeDef {
            key: "a".to_string(),
            flags: PhonemeFlags {
                is_vowel: true,
                ..PhonemeFlags::default()
            },
            ..PhonemeDef::default()
        };
        apply_voice_profile(&mut frame, Some(&def), 0.0, Some(&profile_set), "female");
        assert_eq!(frame.cf1, 1000.0);
    }

    #[test]
    fn unknown_profile_name_is_a_no_op() {
        let mut frame = Frame::default();
        frame.cf1 = 500.0;
        apply_voice_profile(&mut frame, None, 0.0, None, "anything");
        assert_eq!(frame.cf1, 500.0);
    }
}
