//! Token→frame conversion (spec §4.9).
//!
//! `FrameEmitter` walks a token slice produced by `TokenBuilder`/`Prosody`
//! and invokes a callback once per emitted `(frame, frameEx, durationMs,
//! fadeMs, userIndex)` tuple, matching the shape `nvspFrontend_queueIPA`'s
//! frame callback hands to the host.

use crate::frame::{AmplitudeTransitionMode, Frame, FrameEx};

use super::pack::{LanguagePack, PackSet, PhonemeDef};
use super::token::Token;
use super::voice_profile::apply_voice_profile;

const DEFAULT_MAX_HZ_PER_MS: f64 = 50.0;
const CLOSE_PHASE_AMPLITUDE_SCALE: f64 = 0.22;
const VOICED_THRESHOLD: f64 = 0.05;

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// One emitted unit, mirroring the frame callback's argument list.
#[derive(Debug, Clone)]
pub struct EmittedFrame {
    pub frame: Option<Frame>,
    pub frame_ex: Option<FrameEx>,
    pub duration_ms: f64,
    pub fade_ms: f64,
    pub user_index: i32,
}

pub struct FrameEmitter<'a> {
    pack: &'a PackSet,
    voice_profile_name: String,
    frame_ex_defaults: FrameEx,
    prev_frame: Option<Frame>,
    prev_def_flags_nasal: bool,
    prev_amplitude: f64,
}

impl<'a> FrameEmitter<'a> {
    pub fn new(pack: &'a PackSet) -> Self {
        FrameEmitter {
            pack,
            voice_profile_name: String::new(),
            frame_ex_defaults: FrameEx::default(),
            prev_frame: None,
            prev_def_flags_nasal: false,
            prev_amplitude: 0.0,
        }
    }

    pub fn set_voice_profile(&mut self, name: &str) {
        self.voice_profile_name = name.to_string();
    }

    /// Corresponds to `nvspFrontend_setFrameExDefaults`.
    pub fn set_frame_ex_defaults(&mut self, creakiness: f64, breathiness: f64, jitter: f64, shimmer: f64, sharpness: f64) {
        self.frame_ex_defaults.creakiness = creakiness;
        self.frame_ex_defaults.breathiness = breathiness;
        self.frame_ex_defaults.jitter = jitter;
        self.frame_ex_defaults.shimmer = shimmer;
        self.frame_ex_defaults.sharpness = sharpness;
    }

    /// Reset cross-token state (used between utterances/purges).
    pub fn reset(&mut self) {
        self.prev_frame = None;
        self.prev_def_flags_nasal = false;
        self.prev_amplitude = 0.0;
    }

    pub fn emit(&mut self, tokens: &[Token], user_index_base: i32, mut callback: impl FnMut(EmittedFrame)) {
        let pack = self.pack;
        let lang = &pack.lang;
        for (i, token) in tokens.iter().enumerate() {
            let user_index = user_index_base + i as i32;

            if token.silence {
                let fade_ms = if token.voiced_closure {
                    token.fade_ms.max(8.0)
                } else {
                    token.fade_ms
                };
                callback(EmittedFrame {
                    frame: None,
                    frame_ex: None,
                    duration_ms: token.duration_ms,
                    fade_ms,
                    user_index,
                });
                continue;
            }

            let def = token.def(pack);
            let is_trill = def.map(|d| d.flags.is_trill).unwrap_or(false);
            if is_trill && lang.trill_modulation_ms > 0.0 {
                self.emit_trill(token, def, user_index, lang, &mut callback);
                continue;
            }

            let (frame, frame_ex) = self.build_regular_frame(token, def, lang);
            callback(EmittedFrame {
                frame: Some(frame),
                frame_ex: Some(frame_ex),
                duration_ms: token.duration_ms,
                fade_ms: token.fade_ms,
                user_index,
            });
        }
    }

    fn build_regular_frame(&mut self, token: &Token, def: Option<&PhonemeDef>, lang: &LanguagePack) -> (Frame, FrameEx) {
        let mut frame = Frame::default();
        if let Some(def) = def {
            def.fields.apply_onto(&mut frame);
        }
        frame.voice_pitch = token.voice_pitch;
        frame.end_voice_pitch = token.end_voice_pitch;

        apply_voice_profile(
            &mut frame,
            def,
            frame.frication_amplitude,
            Some(&self.pack.voice_profiles),
            &self.voice_profile_name,
        );

        self.apply_trajectory_limit(&mut frame, token, def, lang);

        let frame_ex = self.build_frame_ex(token, def, &frame);

        self.prev_frame = Some(frame);
        self.prev_def_flags_nasal = def.map(|d| d.flags.is_nasal).unwrap_or(false);
        self.prev_amplitude = frame.voice_amplitude.max(frame.aspiration_amplitude).max(frame.frication_amplitude);

        (frame, frame_ex)
    }

    fn apply_trajectory_limit(&self, frame: &mut Frame, token: &Token, def: Option<&PhonemeDef>, lang: &LanguagePack) {
        let cfg = &lang.trajectory_limit;
        if !cfg.enabled {
            return;
        }
        let Some(prev) = self.prev_frame else { return };

        let skip = def
            .map(|d| d.flags.is_semivowel || d.flags.is_liquid || d.flags.is_nasal)
            .unwrap_or(false)
            || self.prev_def_flags_nasal;
        if skip {
            return;
        }
        if token.word_start && !cfg.apply_across_word_boundary {
            return;
        }

        let window_ms = token.duration_ms.max(40.0);
        for field_name in &cfg.apply_mask {
            let Some(id) = crate::frame::parse_field_id(field_name) else {
                continue;
            };
            let rate = cfg.max_hz_per_ms.get(field_name).copied().unwrap_or(DEFAULT_MAX_HZ_PER_MS);
            let max_change = rate * window_ms;
            let prev_value = prev.get(id);
            let cur_value = frame.get(id);
            let clamped = cur_value.clamp(prev_value - max_change, prev_value + max_change);
            frame.set(id, clamped);
        }
    }

    fn build_frame_ex(&self, token: &Token, def: Option<&PhonemeDef>, frame: &Frame) -> FrameEx {
        let mut ex = self.frame_ex_defaults;

        if let Some(ov) = def.and_then(|d| d.frame_ex.as_ref()) {
            if let Some(v) = ov.creakiness {
                ex.creakiness = (ex.creakiness + v).clamp(0.0, 1.0);
            }
            if let Some(v) = ov.breathiness {
                ex.breathiness = (ex.breathiness + v).clamp(0.0, 1.0);
            }
            if let Some(v) = ov.jitter {
                ex.jitter = (ex.jitter + v).clamp(0.0, 1.0);
            }
            if let Some(v) = ov.shimmer {
                ex.shimmer = (ex.shimmer + v).clamp(0.0, 1.0);
            }
            if let Some(v) = ov.sharpness {
                ex.sharpness *= v;
            }
        }

        ex.end_cf2 = token.end_target_cf2;
        ex.end_cf3 = token.end_target_cf3;
        ex.trans_f2_scale = token.trans_f2_scale.unwrap_or(1.0);
        ex.trans_f3_scale = token.trans_f3_scale.unwrap_or(1.0);

        let cur_amplitude = frame.voice_amplitude.max(frame.aspiration_amplitude).max(frame.frication_amplitude);
        let was_voiced = self.prev_amplitude >= VOICED_THRESHOLD;
        let is_voiced = cur_amplitude >= VOICED_THRESHOLD;
        ex.trans_amplitude_mode = if was_voiced != is_voiced {
            AmplitudeTransitionMode::EqualPower
        } else {
            AmplitudeTransitionMode::Linear
        };

        ex
    }

    fn emit_trill(
        &mut self,
        token: &Token,
        def: Option<&PhonemeDef>,
        user_index: i32,
        lang: &LanguagePack,
        callback: &mut impl FnMut(EmittedFrame),
    ) {
        let cycle_ms = lang.trill_modulation_ms;
        let fade_ms = lang.trill_modulation_fade_ms;
        let total_ms = token.duration_ms;
        let num_cycles = (total_ms / cycle_ms).round().max(1.0) as u32;
        let per_cycle_ms = total_ms / num_cycles as f64;

        let mut base_frame = Frame::default();
        if let Some(def) = def {
            def.fields.apply_onto(&mut base_frame);
        }
        apply_voice_profile(
            &mut base_frame,
            def,
            base_frame.frication_amplitude,
            Some(&self.pack.voice_profiles),
            &self.voice_profile_name,
        );
        let open_amplitude = base_frame.voice_amplitude;
        let close_amplitude = open_amplitude * CLOSE_PHASE_AMPLITUDE_SCALE
            + if base_frame.frication_amplitude > 0.0 { 0.05 } else { 0.0 };

        for cycle in 0..num_cycles {
            let t0 = cycle as f64 / num_cycles as f64;
            let t_mid = (cycle as f64 + 0.5) / num_cycles as f64;
            let t1 = (cycle as f64 + 1.0) / num_cycles as f64;

            let mut open_frame = base_frame;
            open_frame.voice_amplitude = open_amplitude;
            open_frame.voice_pitch = lerp(token.voice_pitch, token.end_voice_pitch, t0);
            open_frame.end_voice_pitch = lerp(token.voice_pitch, token.end_voice_pitch, t_mid);
            callback(EmittedFrame {
                frame: Some(open_frame),
                frame_ex: Some(self.frame_ex_defaults),
                duration_ms: per_cycle_ms / 2.0,
                fade_ms: fade_ms.min(per_cycle_ms / 2.0),
                user_index,
            });

            let mut close_frame = base_frame;
            close_frame.voice_amplitude = close_amplitude;
            close_frame.voice_pitch = lerp(token.voice_pitch, token.end_voice_pitch, t_mid);
            close_frame.end_voice_pitch = lerp(token.voice_pitch, token.end_voice_pitch, t1);
            callback(EmittedFrame {
                frame: Some(close_frame),
                frame_ex: Some(self.frame_ex_defaults),
                duration_ms: per_cycle_ms / 2.0,
                fade_ms: fade_ms.min(per_cycle_ms / 2.0),
                user_index,
            });
        }

        self.prev_frame = Some(base_frame);
        self.prev_def_flags_nasal = false;
        self.prev_amplitude = close_amplitude;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::pack::{LanguagePack, PackSet, PhonemeDef, PhonemeFlags};
    use std::collections::HashMap;

    fn vowel_pack() -> PackSet {
        let mut phonemes = HashMap::new();
        let mut a = PhonemeDef::default();
        a.key = "a".to_string();
        a.flags.is_vowel = true;
        a.flags.is_voiced = true;
        a.fields.cf1 = Some(700.0);
        a.fields.voice_amplitude = Some(0.8);
        phonemes.insert("a".to_string(), a);

        let mut r = PhonemeDef::default();
        r.key = "r".to_string();
        r.flags.is_trill = true;
        r.flags.is_voiced = true;
        r.fields.voice_amplitude = Some(0.7);
        phonemes.insert("r".to_string(), r);

        PackSet {
            phonemes,
            sorted_phoneme_keys: vec!["a".into(), "r".into()],
            lang: LanguagePack::default(),
            voice_profiles: Default::default(),
            load_warnings: Vec::new(),
            stress_dict: HashMap::new(),
        }
    }

    fn vowel_token() -> Token {
        let mut t = Token::silence(0.0);
        t.phoneme_key = Some("a".to_string());
        t.silence = false;
        t.duration_ms = 60.0;
        t.fade_ms = 10.0;
        t.voice_pitch = 120.0;
        t.end_voice_pitch = 120.0;
        t
    }

    #[test]
    fn silence_token_emits_null_frame() {
        let pack = vowel_pack();
        let mut emitter = FrameEmitter::new(&pack);
        let tok = Token::silence(5.0);
        let mut emitted = Vec::new();
        emitter.emit(std::slice::from_ref(&tok), 0, |ef| emitted.push(ef));
        assert_eq!(emitted.len(), 1);
        assert!(emitted[0].frame.is_none());
    }

    #[test]
    fn voiced_closure_silence_gets_generous_fade() {
        let pack = vowel_pack();
        let mut emitter = FrameEmitter::new(&pack);
        let mut tok = Token::silence(2.0);
        tok.voiced_closure = true;
        let mut emitted = Vec::new();
        emitter.emit(std::slice::from_ref(&tok), 0, |ef| emitted.push(ef));
        assert!(emitted[0].fade_ms >= 8.0);
    }

    #[test]
    fn regular_token_carries_token_pitch_into_frame() {
        let pack = vowel_pack();
        let mut emitter = FrameEmitter::new(&pack);
        let tok = vowel_token();
        let mut emitted = Vec::new();
        emitter.emit(std::slice::from_ref(&tok), 0, |ef| emitted.push(ef));
        let frame = emitted[0].frame.unwrap();
        assert_eq!(frame.voice_pitch, 120.0);
        assert_eq!(frame.cf1, 700.0);
    }

    #[test]
    fn trill_token_splits_into_multiple_micro_frames() {
        let pack = vowel_pack();
        let mut emitter = FrameEmitter::new(&pack);
        let mut tok = vowel_token();
        tok.phoneme_key = Some("r".to_string());
        tok.duration_ms = 84.0;
        let mut emitted = Vec::new();
        emitter.emit(std::slice::from_ref(&tok), 0, |ef| emitted.push(ef));
        assert!(emitted.len() >= 4);
        let total: f64 = emitted.iter().map(|ef| ef.duration_ms).sum();
        assert!((total - 84.0).abs() < 1e-6);
    }

    #[test]
    fn voicing_transition_sets_equal_power_mode() {
        let pack = vowel_pack();
        let mut emitter = FrameEmitter::new(&pack);
        emitter.prev_amplitude = 0.0;
        let tok = vowel_token();
        let mut emitted = Vec::new();
        emitter.emit(std::slice::from_ref(&tok), 0, |ef| emitted.push(ef));
        let ex = emitted[0].frame_ex.unwrap();
        assert_eq!(ex.trans_amplitude_mode, AmplitudeTransitionMode::EqualPower);
    }
}
