//! The 47-field synthesizer frame and its optional voice-quality extension.
//!
//! A `Frame` is a dense snapshot of every DSP parameter the resonator banks
//! and glottal source read on a given sample. `FrameEx` carries the newer,
//! optional voice-quality knobs (creakiness, breathiness, jitter, shimmer,
//! sharpness, formant end-targets, transition shaping) that keep the base
//! `Frame` layout stable while still allowing richer per-token control.

use serde::Deserialize;

/// Number of `f64` fields making up a [`Frame`], matching the C ABI's
/// "47 contiguous 64-bit floats" layout (spec §6.1).
pub const FRAME_FIELD_COUNT: usize = 47;

/// Index of each [`Frame`] field in its canonical binary layout order.
/// Used by trajectory limiting, transform rules, and the C ABI to address
/// fields without naming them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum FieldId {
    VoicePitch = 0,
    EndVoicePitch = 1,
    VibratoPitchOffset = 2,
    VibratoSpeed = 3,
    VoiceAmplitude = 4,
    AspirationAmplitude = 5,
    VoiceTurbulenceAmplitude = 6,
    GlottalOpenQuotient = 7,
    Cf1 = 8,
    Cf2 = 9,
    Cf3 = 10,
    Cf4 = 11,
    Cf5 = 12,
    Cf6 = 13,
    Cb1 = 14,
    Cb2 = 15,
    Cb3 = 16,
    Cb4 = 17,
    Cb5 = 18,
    Cb6 = 19,
    CfN0 = 20,
    CbN0 = 21,
    CfNP = 22,
    CbNP = 23,
    CaNP = 24,
    FricationAmplitude = 25,
    Pf1 = 26,
    Pf2 = 27,
    Pf3 = 28,
    Pf4 = 29,
    Pf5 = 30,
    Pf6 = 31,
    Pb1 = 32,
    Pb2 = 33,
    Pb3 = 34,
    Pb4 = 35,
    Pb5 = 36,
    Pb6 = 37,
    Pa1 = 38,
    Pa2 = 39,
    Pa3 = 40,
    Pa4 = 41,
    Pa5 = 42,
    Pa6 = 43,
    ParallelBypass = 44,
    PreFormantGain = 45,
    OutputGain = 46,
}

/// Map a pack-file field name (e.g. `"cf1"`) to its [`FieldId`].
pub fn parse_field_id(name: &str) -> Option<FieldId> {
    use FieldId::*;
    Some(match name {
        "voicePitch" => VoicePitch,
        "endVoicePitch" => EndVoicePitch,
        "vibratoPitchOffset" => VibratoPitchOffset,
        "vibratoSpeed" => VibratoSpeed,
        "voiceAmplitude" => VoiceAmplitude,
        "aspirationAmplitude" => AspirationAmplitude,
        "voiceTurbulenceAmplitude" => VoiceTurbulenceAmplitude,
        "glottalOpenQuotient" => GlottalOpenQuotient,
        "cf1" => Cf1,
        "cf2" => Cf2,
        "cf3" => Cf3,
        "cf4" => Cf4,
        "cf5" => Cf5,
        "cf6" => Cf6,
        "cb1" => Cb1,
        "cb2" => Cb2,
        "cb3" => Cb3,
        "cb4" => Cb4,
        "cb5" => Cb5,
        "cb6" => Cb6,
        "cfN0" => CfN0,
        "cbN0" => CbN0,
        "cfNP" => CfNP,
        "cbNP" => CbNP,
        "caNP" => CaNP,
        "fricationAmplitude" => FricationAmplitude,
        "pf1" => Pf1,
        "pf2" => Pf2,
        "pf3" => Pf3,
        "pf4" => Pf4,
        "pf5" => Pf5,
        "pf6" => Pf6,
        "pb1" => Pb1,
        "pb2" => Pb2,
        "pb3" => Pb3,
        "pb4" => Pb4,
        "pb5" => Pb5,
        "pb6" => Pb6,
        "pa1" => Pa1,
        "pa2" => Pa2,
        "pa3" => Pa3,
        "pa4" => Pa4,
        "pa5" => Pa5,
        "pa6" => Pa6,
        "parallelBypass" => ParallelBypass,
        "preFormantGain" => PreFormantGain,
        "outputGain" => OutputGain,
        _ => return None,
    })
}

/// A fixed-size record of synthesizer parameters interpolated per sample.
///
/// All fields are finite non-negative reals; frequencies and bandwidths are
/// in Hz, amplitudes in `[0, 1]`, gains are `>= 0` (spec §3).
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Frame {
    pub voice_pitch: f64,
    pub end_voice_pitch: f64,
    pub vibrato_pitch_offset: f64,
    pub vibrato_speed: f64,
    pub voice_amplitude: f64,
    pub aspiration_amplitude: f64,
    pub voice_turbulence_amplitude: f64,
    pub glottal_open_quotient: f64,

    pub cf1: f64,
    pub cf2: f64,
    pub cf3: f64,
    pub cf4: f64,
    pub cf5: f64,
    pub cf6: f64,
    pub cb1: f64,
    pub cb2: f64,
    pub cb3: f64,
    pub cb4: f64,
    pub cb5: f64,
    pub cb6: f64,

    pub cf_n0: f64,
    pub cb_n0: f64,
    pub cf_np: f64,
    pub cb_np: f64,
    pub ca_np: f64,

    pub frication_amplitude: f64,

    pub pf1: f64,
    pub pf2: f64,
    pub pf3: f64,
    pub pf4: f64,
    pub pf5: f64,
    pub pf6: f64,
    pub pb1: f64,
    pub pb2: f64,
    pub pb3: f64,
    pub pb4: f64,
    pub pb5: f64,
    pub pb6: f64,
    pub pa1: f64,
    pub pa2: f64,
    pub pa3: f64,
    pub pa4: f64,
    pub pa5: f64,
    pub pa6: f64,

    pub parallel_bypass: f64,
    pub pre_formant_gain: f64,
    pub output_gain: f64,
}

impl Default for Frame {
    fn default() -> Self {
        // Matches the original DSP's implicit zero-init, except gains
        // default to unity so a caller-constructed frame without explicit
        // gains doesn't silently mute itself.
        Frame {
            voice_pitch: 0.0,
            end_voice_pitch: 0.0,
            vibrato_pitch_offset: 0.0,
            vibrato_speed: 0.0,
            voice_amplitude: 0.0,
            aspiration_amplitude: 0.0,
            voice_turbulence_amplitude: 0.0,
            glottal_open_quotient: 0.4,
            cf1: 0.0,
            cf2: 0.0,
            cf3: 0.0,
            cf4: 0.0,
            cf5: 0.0,
            cf6: 0.0,
            cb1: 0.0,
            cb2: 0.0,
            cb3: 0.0,
            cb4: 0.0,
            cb5: 0.0,
            cb6: 0.0,
            cf_n0: 0.0,
            cb_n0: 0.0,
            cf_np: 0.0,
            cb_np: 0.0,
            ca_np: 0.0,
            frication_amplitude: 0.0,
            pf1: 0.0,
            pf2: 0.0,
            pf3: 0.0,
            pf4: 0.0,
            pf5: 0.0,
            pf6: 0.0,
            pb1: 0.0,
            pb2: 0.0,
            pb3: 0.0,
            pb4: 0.0,
            pb5: 0.0,
            pb6: 0.0,
            pa1: 0.0,
            pa2: 0.0,
            pa3: 0.0,
            pa4: 0.0,
            pa5: 0.0,
            pa6: 0.0,
            parallel_bypass: 0.0,
            pre_formant_gain: 1.0,
            output_gain: 1.5,
        }
    }
}

impl Frame {
    /// Read a field by [`FieldId`], as used by trajectory limiting and
    /// transform rules that address fields generically.
    pub fn get(&self, id: FieldId) -> f64 {
        use FieldId::*;
        match id {
            VoicePitch => self.voice_pitch,
            EndVoicePitch => self.end_voice_pitch,
            VibratoPitchOffset => self.vibrato_pitch_offset,
            VibratoSpeed => self.vibrato_speed,
            VoiceAmplitude => self.voice_amplitude,
            AspirationAmplitude => self.aspiration_amplitude,
            VoiceTurbulenceAmplitude => self.voice_turbulence_amplitude,
            GlottalOpenQuotient => self.glottal_open_quotient,
            Cf1 => self.cf1,
            Cf2 => self.cf2,
            Cf3 => self.cf3,
            Cf4 => self.cf4,
            Cf5 => self.cf5,
            Cf6 => self.cf6,
            Cb1 => self.cb1,
            Cb2 => self.cb2,
            Cb3 => self.cb3,
            Cb4 => self.cb4,
            Cb5 => self.cb5,
            Cb6 => self.cb6,
            CfN0 => self.cf_n0,
            CbN0 => self.cb_n0,
            CfNP => self.cf_np,
            CbNP => self.cb_np,
            CaNP => self.ca_np,
            FricationAmplitude => self.frication_amplitude,
            Pf1 => self.pf1,
            Pf2 => self.pf2,
            Pf3 => self.pf3,
            Pf4 => self.pf4,
            Pf5 => self.pf5,
            Pf6 => self.pf6,
            Pb1 => self.pb1,
            Pb2 => self.pb2,
            Pb3 => self.pb3,
            Pb4 => self.pb4,
            Pb5 => self.pb5,
            Pb6 => self.pb6,
            Pa1 => self.pa1,
            Pa2 => self.pa2,
            Pa3 => self.pa3,
            Pa4 => self.pa4,
            Pa5 => self.pa5,
            Pa6 => self.pa6,
            ParallelBypass => self.parallel_bypass,
            PreFormantGain => self.pre_formant_gain,
            OutputGain => self.output_gain,
        }
    }

    /// Write a field by [`FieldId`].
    pub fn set(&mut self, id: FieldId, value: f64) {
        use FieldId::*;
        match id {
            VoicePitch => self.voice_pitch = value,
            EndVoicePitch => self.end_voice_pitch = value,
            VibratoPitchOffset => self.vibrato_pitch_offset = value,
            VibratoSpeed => self.vibrato_speed = value,
            VoiceAmplitude => self.voice_amplitude = value,
            AspirationAmplitude => self.aspiration_amplitude = value,
            VoiceTurbulenceAmplitude => self.voice_turbulence_amplitude = value,
            GlottalOpenQuotient => self.glottal_open_quotient = value,
            Cf1 => self.cf1 = value,
            Cf2 => self.cf2 = value,
            Cf3 => self.cf3 = value,
            Cf4 => self.cf4 = value,
            Cf5 => self.cf5 = value,
            Cf6 => self.cf6 = value,
            Cb1 => self.cb1 = value,
            Cb2 => self.cb2 = value,
            Cb3 => self.cb3 = value,
            Cb4 => self.cb4 = value,
            Cb5 => self.cb5 = value,
            Cb6 => self.cb6 = value,
            CfN0 => self.cf_n0 = value,
            CbN0 => self.cb_n0 = value,
            CfNP => self.cf_np = value,
            CbNP => self.cb_np = value,
            CaNP => self.ca_np = value,
            FricationAmplitude => self.frication_amplitude = value,
            Pf1 => self.pf1 = value,
            Pf2 => self.pf2 = value,
            Pf3 => self.pf3 = value,
            Pf4 => self.pf4 = value,
            Pf5 => self.pf5 = value,
            Pf6 => self.pf6 = value,
            Pb1 => self.pb1 = value,
            Pb2 => self.pb2 = value,
            Pb3 => self.pb3 = value,
            Pb4 => self.pb4 = value,
            Pb5 => self.pb5 = value,
            Pb6 => self.pb6 = value,
            Pa1 => self.pa1 = value,
            Pa2 => self.pa2 = value,
            Pa3 => self.pa3 = value,
            Pa4 => self.pa4 = value,
            Pa5 => self.pa5 = value,
            Pa6 => self.pa6 = value,
            ParallelBypass => self.parallel_bypass = value,
            PreFormantGain => self.pre_formant_gain = value,
            OutputGain => self.output_gain = value,
        }
    }
}

/// Per-field crossfade shape, used by [`crate::frame_manager`] to pick an
/// interpolation curve (spec §4.5 "Crossfade semantics").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCurve {
    /// Amplitude-like fields: asymmetric attack/release.
    Amplitude,
    /// Formant frequencies: smooth ease-in-out S-curve.
    FormantFrequency,
    /// Formant bandwidths: lead their frequency slightly.
    FormantBandwidth,
    /// Nasal coupling: slower curve than ordinary formants.
    Nasal,
    /// Everything else: plain linear.
    Linear,
}

impl FieldId {
    pub fn curve(self) -> FieldCurve {
        use FieldCurve::*;
        use FieldId::*;
        match self {
            VoiceAmplitude | AspirationAmplitude | VoiceTurbulenceAmplitude
            | FricationAmplitude | Pa1 | Pa2 | Pa3 | Pa4 | Pa5 | Pa6 | ParallelBypass
            | PreFormantGain | OutputGain => Amplitude,
            Cf1 | Cf2 | Cf3 | Cf4 | Cf5 | Cf6 | Pf1 | Pf2 | Pf3 | Pf4 | Pf5 | Pf6 => {
                FormantFrequency
            }
            Cb1 | Cb2 | Cb3 | Cb4 | Cb5 | Cb6 | Pb1 | Pb2 | Pb3 | Pb4 | Pb5 | Pb6 => {
                FormantBandwidth
            }
            CfN0 | CbN0 | CfNP | CbNP | CaNP => Nasal,
            _ => Linear,
        }
    }
}

/// Amplitude crossfade shape signaled by the frame emitter at voicing
/// transitions (spec §4.5/§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AmplitudeTransitionMode {
    #[default]
    Linear,
    EqualPower,
}

/// Voice-quality modulators layered on top of a base [`Frame`] (spec §3,
/// "FrameEx"). Optional per queued frame; when absent, all effects are
/// disabled (matches `voiceGenerator.h`'s `if (frameEx) {...}` gating).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameEx {
    pub creakiness: f64,
    pub breathiness: f64,
    pub jitter: f64,
    pub shimmer: f64,
    /// Multiplier on glottal closing sharpness; 0.0 means "use the
    /// sample-rate default" (no override), otherwise >= 0.
    pub sharpness: f64,

    /// Formant end-targets in Hz for within-frame ramping; `None` means
    /// "no ramp" (the original's NaN-as-sentinel, made explicit).
    pub end_cf1: Option<f64>,
    pub end_cf2: Option<f64>,
    pub end_cf3: Option<f64>,
    pub end_pf1: Option<f64>,
    pub end_pf2: Option<f64>,
    pub end_pf3: Option<f64>,

    /// Fraction of the fade window in which each formant's target is
    /// reached; values < 1.0 arrive early and then hold.
    pub trans_f1_scale: f64,
    pub trans_f2_scale: f64,
    pub trans_f3_scale: f64,
    pub trans_nasal_scale: f64,

    pub trans_amplitude_mode: AmplitudeTransitionMode,

    /// Fujisaki-Bartman pitch commands (DSP v6+), consumed by
    /// [`crate::dsp::pitch_model::FujisakiBartmanPitch`] when
    /// `fujisaki_enabled` is set.
    pub fujisaki_enabled: bool,
    pub fujisaki_reset: bool,
    pub fujisaki_phrase_amp: f64,
    pub fujisaki_phrase_len: f64,
    pub fujisaki_accent_amp: f64,
    pub fujisaki_accent_dur: f64,
    pub fujisaki_accent_len: f64,
}

impl Default for FrameEx {
    fn default() -> Self {
        FrameEx {
            creakiness: 0.0,
            breathiness: 0.0,
            jitter: 0.0,
            shimmer: 0.0,
            sharpness: 0.0,
            end_cf1: None,
            end_cf2: None,
            end_cf3: None,
            end_pf1: None,
            end_pf2: None,
            end_pf3: None,
            trans_f1_scale: 1.0,
            trans_f2_scale: 1.0,
            trans_f3_scale: 1.0,
            trans_nasal_scale: 1.0,
            trans_amplitude_mode: AmplitudeTransitionMode::Linear,
            fujisaki_enabled: false,
            fujisaki_reset: false,
            fujisaki_phrase_amp: 0.0,
            fujisaki_phrase_len: 0.0,
            fujisaki_accent_amp: 0.0,
            fujisaki_accent_dur: 0.0,
            fujisaki_accent_len: 0.0,
        }
    }
}

/// A single synthesized 16-bit PCM sample, matching the C ABI's `sample`
/// struct (`original_source/src/sample.h`).
pub type SampleVal = i16;

/// YAML-facing partial frame used while loading a [`crate::frontend::pack::PhonemeDef`]:
/// only the fields actually present in a pack entry are `Some`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PartialFrameFields {
    #[serde(rename = "voicePitch")]
    pub voice_pitch: Option<f64>,
    #[serde(rename = "vibratoPitchOffset")]
    pub vibrato_pitch_offset: Option<f64>,
    #[serde(rename = "vibratoSpeed")]
    pub vibrato_speed: Option<f64>,
    #[serde(rename = "voiceAmplitude")]
    pub voice_amplitude: Option<f64>,
    #[serde(rename = "aspirationAmplitude")]
    pub aspiration_amplitude: Option<f64>,
    #[serde(rename = "voiceTurbulenceAmplitude")]
    pub voice_turbulence_amplitude: Option<f64>,
    #[serde(rename = "glottalOpenQuotient")]
    pub glottal_open_quotient: Option<f64>,
    pub cf1: Option<f64>,
    pub cf2: Option<f64>,
    pub cf3: Option<f64>,
    pub cf4: Option<f64>,
    pub cf5: Option<f64>,
    pub cf6: Option<f64>,
    pub cb1: Option<f64>,
    pub cb2: Option<f64>,
    pub cb3: Option<f64>,
    pub cb4: Option<f64>,
    pub cb5: Option<f64>,
    pub cb6: Option<f64>,
    #[serde(rename = "cfN0")]
    pub cf_n0: Option<f64>,
    #[serde(rename = "cbN0")]
    pub cb_n0: Option<f64>,
    #[serde(rename = "cfNP")]
    pub cf_np: Option<f64>,
    #[serde(rename = "cbNP")]
    pub cb_np: Option<f64>,
    #[serde(rename = "caNP")]
    pub ca_np: Option<f64>,
    #[serde(rename = "fricationAmplitude")]
    pub frication_amplitude: Option<f64>,
    pub pf1: Option<f64>,
    pub pf2: Option<f64>,
    pub pf3: Option<f64>,
    pub pf4: Option<f64>,
    pub pf5: Option<f64>,
    pub pf6: Option<f64>,
    pub pb1: Option<f64>,
    pub pb2: Option<f64>,
    pub pb3: Option<f64>,
    pub pb4: Option<f64>,
    pub pb5: Option<f64>,
    pub pb6: Option<f64>,
    pub pa1: Option<f64>,
    pub pa2: Option<f64>,
    pub pa3: Option<f64>,
    pub pa4: Option<f64>,
    pub pa5: Option<f64>,
    pub pa6: Option<f64>,
    #[serde(rename = "parallelBypass")]
    pub parallel_bypass: Option<f64>,
    #[serde(rename = "preFormantGain")]
    pub pre_formant_gain: Option<f64>,
    #[serde(rename = "outputGain")]
    pub output_gain: Option<f64>,
}

impl PartialFrameFields {
    /// Apply every `Some` field onto `base`, returning which [`FieldId`]s
    /// were touched (the phoneme's set-mask).
    pub fn apply_onto(&self, base: &mut Frame) -> Vec<FieldId> {
        let mut set = Vec::new();
        macro_rules! apply {
            ($field:ident, $id:expr) => {
                if let Some(v) = self.$field {
                    base.$field = v;
                    set.push($id);
                }
            };
        }
        apply!(voice_pitch, FieldId::VoicePitch);
        apply!(vibrato_pitch_offset, FieldId::VibratoPitchOffset);
        apply!(vibrato_speed, FieldId::VibratoSpeed);
        apply!(voice_amplitude, FieldId::VoiceAmplitude);
        apply!(aspiration_amplitude, FieldId::AspirationAmplitude);
        apply!(
            voice_turbulence_amplitude,
            FieldId::VoiceTurbulenceAmplitude
        );
        apply!(glottal_open_quotient, FieldId::GlottalOpenQuotient);
        apply!(cf1, FieldId::Cf1);
        apply!(cf2, FieldId::Cf2);
        apply!(cf3, FieldId::Cf3);
        apply!(cf4, FieldId::Cf4);
        apply!(cf5, FieldId::Cf5);
        apply!(cf6, FieldId::Cf6);
        apply!(cb1, FieldId::Cb1);
        apply!(cb2, FieldId::Cb2);
        apply!(cb3, FieldId::Cb3);
        apply!(cb4, FieldId::Cb4);
        apply!(cb5, FieldId::Cb5);
        apply!(cb6, FieldId::Cb6);
        apply!(cf_n0, FieldId::CfN0);
        apply!(cb_n0, FieldId::CbN0);
        apply!(cf_np, FieldId::CfNP);
        apply!(cb_np, FieldId::CbNP);
        apply!(ca_np, FieldId::CaNP);
        apply!(frication_amplitude, FieldId::FricationAmplitude);
        apply!(pf1, FieldId::Pf1);
        apply!(pf2, FieldId::Pf2);
        apply!(pf3, FieldId::Pf3);
        apply!(pf4, FieldId::Pf4);
        apply!(pf5, FieldId::Pf5);
        apply!(pf6, FieldId::Pf6);
        apply!(pb1, FieldId::Pb1);
        apply!(pb2, FieldId::Pb2);
        apply!(pb3, FieldId::Pb3);
        apply!(pb4, FieldId::Pb4);
        apply!(pb5, FieldId::Pb5);
        apply!(pb6, FieldId::Pb6);
        apply!(pa1, FieldId::Pa1);
        apply!(pa2, FieldId::Pa2);
        apply!(pa3, FieldId::Pa3);
        apply!(pa4, FieldId::Pa4);
        apply!(pa5, FieldId::Pa5);
        apply!(pa6, FieldId::Pa6);
        apply!(parallel_bypass, FieldId::ParallelBypass);
        apply!(pre_formant_gain, FieldId::PreFormantGain);
        apply!(output_gain, FieldId::OutputGain);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_count_matches_abi() {
        // 47 named getters/setters covering every FieldId variant.
        let f = Frame::default();
        let mut seen = 0;
        for id in [
            FieldId::VoicePitch,
            FieldId::EndVoicePitch,
            FieldId::VibratoPitchOffset,
            FieldId::VibratoSpeed,
            FieldId::VoiceAmplitude,
            FieldId::AspirationAmplitude,
            FieldId::VoiceTurbulenceAmplitude,
            FieldId::GlottalOpenQuotient,
            FieldId::Cf1,
            FieldId::Cf2,
            FieldId::Cf3,
            FieldId::Cf4,
            FieldId::Cf5,
            FieldId::Cf6,
            FieldId::Cb1,
            FieldId::Cb2,
            FieldId::Cb3,
            FieldId::Cb4,
            FieldId::Cb5,
            FieldId::Cb6,
            FieldId::CfN0,
            FieldId::CbN0,
            FieldId::CfNP,
            FieldId::CbNP,
            FieldId::CaNP,
            FieldId::FricationAmplitude,
            FieldId::Pf1,
            FieldId::Pf2,
            FieldId::Pf3,
            FieldId::Pf4,
            FieldId::Pf5,
            FieldId::Pf6,
            FieldId::Pb1,
            FieldId::Pb2,
            FieldId::Pb3,
            FieldId::Pb4,
            FieldId::Pb5,
            FieldId::Pb6,
            FieldId::Pa1,
            FieldId::Pa2,
            FieldId::Pa3,
            FieldId::Pa4,
            FieldId::Pa5,
            FieldId::Pa6,
            FieldId::ParallelBypass,
            FieldId::PreFormantGain,
            FieldId::OutputGain,
        ] {
            let _ = f.get(id);
            seen += 1;
        }
        assert_eq!(seen, FRAME_FIELD_COUNT);
    }

    #[test]
    fn parse_field_id_round_trips_known_names() {
        assert_eq!(parse_field_id("cf2"), Some(FieldId::Cf2));
        assert_eq!(parse_field_id("caNP"), Some(FieldId::CaNP));
        assert_eq!(parse_field_id("not_a_field"), None);
    }

    #[test]
    fn set_then_get_is_identity() {
        let mut f = Frame::default();
        f.set(FieldId::Cf2, 1800.0);
        assert_eq!(f.get(FieldId::Cf2), 1800.0);
    }
}
