//! Timing and pitch assignment (spec §4.8).
//!
//! Two independent passes over a token list: [`assign_durations`] gives
//! every token a `durationMs`/`fadeMs`, and [`assign_pitch`] selects one
//! of four pitch models and fills in `voicePitch`/`endVoicePitch` such
//! that voiced-token boundaries never show a pitch discontinuity.

use super::pack::{IntonationClause, LanguagePack, PackSet};
use super::token::Token;

/// Base per-class duration in milliseconds, before any modifier.
fn base_duration_ms(lang: &LanguagePack, pack: &PackSet, token: &Token) -> f64 {
    let Some(def) = token.def(pack) else {
        return lang.default_vowel_duration_ms;
    };
    let f = &def.flags;
    if f.is_vowel {
        lang.default_vowel_duration_ms
    } else if f.is_tap {
        lang.tap_duration_ms
    } else if f.is_trill {
        lang.trill_fallback_duration_ms
    } else if f.is_affricate {
        lang.affricate_duration_ms
    } else if f.is_stop {
        lang.stop_duration_ms
    } else if f.is_nasal {
        lang.nasal_min_duration_ms.max(lang.voiced_consonant_duration_ms)
    } else if f.is_voiced {
        lang.voiced_consonant_duration_ms
    } else {
        lang.voiceless_fricative_duration_ms
    }
}

/// Compute `durationMs`/`fadeMs` for every token at the given speed
/// (1.0 = pack-default rate; > 1.0 = faster).
pub fn assign_durations(pack: &PackSet, tokens: &mut [Token], speed: f64) {
    let lang = &pack.lang;
    let speed = if speed > 0.0 { speed } else { 1.0 };

    for i in 0..tokens.len() {
        if tokens[i].pre_stop_gap || tokens[i].vowel_hiatus_gap {
            // Already assigned by the token builder.
            continue;
        }
        if tokens[i].post_stop_aspiration {
            tokens[i].duration_ms = lang.post_stop_aspiration_duration_ms;
            tokens[i].fade_ms = lang.default_fade_ms;
            continue;
        }

        let mut dur = base_duration_ms(lang, pack, &tokens[i]) / speed;

        match tokens[i].stress {
            1 => dur *= lang.primary_stress_div,
            2 => dur *= lang.secondary_stress_div,
            _ => {}
        }

        if tokens[i].lengthened {
            let scale = if lang.apply_lengthened_scale_to_vowels_only && !tokens[i].is_vowel(pack) {
                1.0
            } else if lang.lengthened_scale_hu != 0.0 && lang.language_tag.starts_with("hu") {
                lang.lengthened_scale_hu
            } else {
                lang.lengthened_scale
            };
            dur *= scale;
        }

        let is_vowel = tokens[i].is_vowel(pack);
        if is_vowel && tokens[i].stress == 0 {
            if let Some(next) = tokens.get(i + 1).and_then(|t| t.def(pack)) {
                if next.flags.is_liquid {
                    dur = lang.vowel_before_liquid_duration_ms / speed;
                } else if next.flags.is_nasal {
                    dur = lang.vowel_before_nasal_duration_ms / speed;
                }
            }
        }

        if tokens[i].tied_to {
            dur = lang.tied_vowel_duration_ms / speed;
        } else if tokens[i].tied_from {
            dur = lang.tied_from_vowel_duration_ms / speed;
        }

        if let Some(def) = tokens[i].def(pack) {
            if def.flags.is_semivowel {
                dur *= lang.semivowel_offglide_scale;
            }
        }

        if lang.english_long_u_shorten_enabled
            && tokens[i].phoneme_key.as_deref() == Some(lang.english_long_u_shorten_key.as_str())
        {
            let word_final = tokens.get(i + 1).map(|t| t.word_start).unwrap_or(true);
            if word_final {
                dur *= lang.english_long_u_shorten_word_final_scale;
            }
        }
        if lang.hu_short_a_vowel_enabled
            && tokens[i].phoneme_key.as_deref() == Some(lang.hu_short_a_vowel_key.as_str())
        {
            dur *= lang.hu_short_a_vowel_scale;
        }

        tokens[i].fade_ms = if tokens[i].tied_from {
            lang.tied_from_vowel_fade_ms
        } else if tokens[i]
            .def(pack)
            .map(|d| d.flags.is_liquid)
            .unwrap_or(false)
        {
            lang.liquid_fade_ms
        } else {
            lang.default_fade_ms
        };
        tokens[i].duration_ms = dur.max(0.001);
    }
}

// -----------------------------------------------------------------
// Pitch assignment
// -----------------------------------------------------------------

/// Region of an utterance for the eSpeak-style ToBI-inspired model.
#[derive(Clone, Copy, PartialEq)]
enum Region {
    PreHead,
    Head,
    Nucleus,
    Tail,
}

fn percent_to_hz(base_hz: f64, percent: f64) -> f64 {
    base_hz * 2f64.powf((percent - 50.0) / 50.0)
}

/// Assign `voicePitch`/`endVoicePitch` to every voiced token, selecting
/// the pack's configured pitch model.
pub fn assign_pitch(pack: &PackSet, tokens: &mut [Token], base_pitch_hz: f64, clause: char, sample_rate: i32) {
    match pack.lang.legacy_pitch_mode.as_str() {
        "legacy" => assign_pitch_legacy(pack, tokens, base_pitch_hz),
        "fujisaki_style" => assign_pitch_fujisaki(pack, tokens, base_pitch_hz, sample_rate),
        "klatt_hat" => assign_pitch_klatt_hat(pack, tokens, base_pitch_hz, clause),
        _ => assign_pitch_espeak_style(pack, tokens, base_pitch_hz, clause),
    }
    if pack.lang.tonal {
        apply_tone_overlay(pack, tokens, base_pitch_hz);
    }
}

fn voiced_indices(pack: &PackSet, tokens: &[Token]) -> Vec<usize> {
    (0..tokens.len())
        .filter(|&i| {
            !tokens[i].silence
                && tokens[i]
                    .def(pack)
                    .map(|d| d.flags.is_voiced || d.flags.is_vowel)
                    .unwrap_or(false)
        })
        .collect()
}

fn assign_pitch_espeak_style(pack: &PackSet, tokens: &mut [Token], base_pitch_hz: f64, clause: char) {
    let voiced = voiced_indices(pack, tokens);
    if voiced.is_empty() {
        return;
    }
    let clause_key = clause.to_string();
    let default_clause = IntonationClause::default();
    let intonation = pack.lang.intonation.get(&clause_key).unwrap_or(&default_clause);

    let last_stressed_pos = voiced
        .iter()
        .rposition(|&i| tokens[i].stress == 1)
        .map(|p| voiced[p]);
    let first_stressed_pos = voiced.iter().position(|&i| tokens[i].stress != 0).map(|p| voiced[p]);

    let total_voiced_ms: f64 = voiced.iter().map(|&i| tokens[i].duration_ms).sum();
    let mut acc_ms = 0.0;
    let mut prev_end_percent: Option<f64> = None;

    for &i in &voiced {
        let region = match (first_stressed_pos, last_stressed_pos) {
            (Some(first), Some(last)) if i < first => Region::PreHead,
            (Some(_), Some(last)) if i < last => Region::Head,
            (Some(_), Some(last)) if i == last => Region::Nucleus,
            _ => Region::Tail,
        };
        let t_start = if total_voiced_ms > 0.0 { acc_ms / total_voiced_ms } else { 0.0 };
        acc_ms += tokens[i].duration_ms;
        let t_end = if total_voiced_ms > 0.0 { acc_ms / total_voiced_ms } else { 1.0 };

        let (region_start, region_end) = match region {
            Region::PreHead => (intonation.pre_head_start, intonation.pre_head_end),
            Region::Head => (intonation.head_start, intonation.head_end),
            Region::Nucleus => (intonation.nucleus0_start, intonation.nucleus0_end),
            Region::Tail => (intonation.tail_start, intonation.tail_end),
        };

        let start_percent = prev_end_percent.unwrap_or_else(|| lerp(region_start, region_end, t_start));
        let end_percent = lerp(region_start, region_end, t_end);

        tokens[i].voice_pitch = percent_to_hz(base_pitch_hz, start_percent);
        tokens[i].end_voice_pitch = percent_to_hz(base_pitch_hz, end_percent);
        prev_end_percent = Some(end_percent);
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

fn assign_pitch_legacy(pack: &PackSet, tokens: &mut [Token], base_pitch_hz: f64) {
    let k = pack.lang.legacy_pitch_inflection_scale * 0.001;
    let voiced = voiced_indices(pack, tokens);
    let mut t_ms = 0.0;
    let mut accent = 0.0;
    for &i in &voiced {
        if tokens[i].stress != 0 {
            accent = 0.3;
        } else {
            accent *= 0.9;
        }
        let declined_start = base_pitch_hz / (1.0 + k * t_ms);
        let start = declined_start * (1.0 + accent);
        t_ms += tokens[i].duration_ms;
        let declined_end = base_pitch_hz / (1.0 + k * t_ms);
        let end = declined_end * (1.0 + accent * 0.9);
        tokens[i].voice_pitch = start;
        tokens[i].end_voice_pitch = end;
    }
}

/// In Fujisaki-style mode, the frontend hands off flat per-token pitch
/// and arms the `FrameEx` command fields; the actual contour shaping
/// happens sample-by-sample in `dsp::wave_generator` via
/// `dsp::pitch_model::FujisakiBartmanPitch`. This pass only ensures a
/// continuous flat baseline so the crossfade has no discontinuity.
fn assign_pitch_fujisaki(pack: &PackSet, tokens: &mut [Token], base_pitch_hz: f64, _sample_rate: i32) {
    let voiced = voiced_indices(pack, tokens);
    for &i in &voiced {
        tokens[i].voice_pitch = base_pitch_hz;
        tokens[i].end_voice_pitch = base_pitch_hz;
    }
}

#[derive(Clone, Copy, PartialEq)]
enum HatState {
    BeforeHat,
    OnHat,
    AfterHat,
}

fn assign_pitch_klatt_hat(pack: &PackSet, tokens: &mut [Token], base_pitch_hz: f64, clause: char) {
    let voiced = voiced_indices(pack, tokens);
    if voiced.is_empty() {
        return;
    }
    let first_stressed = voiced.iter().position(|&i| tokens[i].stress != 0);
    let last_stressed = voiced.iter().rposition(|&i| tokens[i].stress != 0);
    let final_fall = matches!(clause, '.' | '!');

    for (pos, &i) in voiced.iter().enumerate() {
        let state = match (first_stressed, last_stressed) {
            (Some(f), Some(_)) if pos < f => HatState::BeforeHat,
            (Some(_), Some(l)) if pos <= l => HatState::OnHat,
            _ => HatState::AfterHat,
        };
        let (start_pct, end_pct) = match state {
            HatState::BeforeHat => (45.0, 55.0),
            HatState::OnHat => (65.0, 65.0),
            HatState::AfterHat => {
                if final_fall {
                    (60.0, 30.0)
                } else {
                    (60.0, 55.0)
                }
            }
        };
        tokens[i].voice_pitch = percent_to_hz(base_pitch_hz, start_pct);
        tokens[i].end_voice_pitch = percent_to_hz(base_pitch_hz, end_pct);
    }
}

/// Overlay a piecewise-linear tone contour on top of the base pitch for
/// each syllable that carries a tone string.
fn apply_tone_overlay(pack: &PackSet, tokens: &mut [Token], base_pitch_hz: f64) {
    for token in tokens.iter_mut() {
        if token.tone.is_empty() {
            continue;
        }
        let Some(contour) = pack.lang.tone_contours.get(&token.tone) else {
            continue;
        };
        if contour.points.is_empty() {
            continue;
        }
        let (_, start_pct) = contour.points[0];
        let (_, end_pct) = *contour.points.last().unwrap();
        if pack.lang.tone_contours_absolute {
            token.voice_pitch = percent_to_hz(base_pitch_hz, start_pct);
            token.end_voice_pitch = percent_to_hz(base_pitch_hz, end_pct);
        } else {
            token.voice_pitch *= 1.0 + start_pct / 100.0;
            token.end_voice_pitch *= 1.0 + end_pct / 100.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::pack::{LanguagePack, PackSet, PhonemeDef};
    use std::collections::HashMap;

    fn vowel_def(key: &str) -> PhonemeDef {
        let mut d = PhonemeDef::default();
        d.key = key.to_string();
        d.flags.is_vowel = true;
        d.flags.is_voiced = true;
        d
    }

    fn test_pack() -> PackSet {
        let mut phonemes = HashMap::new();
        phonemes.insert("a".to_string(), vowel_def("a"));
        PackSet {
            phonemes,
            sorted_phoneme_keys: vec!["a".into()],
            lang: LanguagePack::default(),
            voice_profiles: Default::default(),
            load_warnings: Vec::new(),
            stress_dict: HashMap::new(),
        }
    }

    fn vowel_token(stress: u8) -> Token {
        let mut t = Token::silence(0.0);
        t.phoneme_key = Some("a".to_string());
        t.silence = false;
        t.stress = stress;
        t
    }

    #[test]
    fn stressed_vowel_runs_longer_than_unstressed() {
        let pack = test_pack();
        let mut stressed = vec![vowel_token(1)];
        let mut unstressed = vec![vowel_token(0)];
        assign_durations(&pack, &mut stressed, 1.0);
        assign_durations(&pack, &mut unstressed, 1.0);
        assert!(stressed[0].duration_ms > unstressed[0].duration_ms);
    }

    #[test]
    fn higher_speed_shortens_duration() {
        let pack = test_pack();
        let mut slow = vec![vowel_token(0)];
        let mut fast = vec![vowel_token(0)];
        assign_durations(&pack, &mut slow, 1.0);
        assign_durations(&pack, &mut fast, 2.0);
        assert!(fast[0].duration_ms < slow[0].duration_ms);
    }

    #[test]
    fn legacy_pitch_model_produces_positive_finite_pitch() {
        let pack = test_pack();
        let mut tokens = vec![vowel_token(1), vowel_token(0)];
        assign_durations(&pack, &mut tokens, 1.0);
        assign_pitch_legacy(&pack, &mut tokens, 120.0);
        for t in &tokens {
            assert!(t.voice_pitch.is_finite() && t.voice_pitch > 0.0);
            assert!(t.end_voice_pitch.is_finite() && t.end_voice_pitch > 0.0);
        }
    }

    #[test]
    fn espeak_style_pitch_boundaries_are_continuous() {
        let pack = test_pack();
        let mut tokens = vec![vowel_token(0), vowel_token(1), vowel_token(0)];
        assign_durations(&pack, &mut tokens, 1.0);
        assign_pitch_espeak_style(&pack, &mut tokens, 120.0, '.');
        assert_eq!(tokens[0].end_voice_pitch, tokens[1].voice_pitch);
        assert_eq!(tokens[1].end_voice_pitch, tokens[2].voice_pitch);
    }
}
