//! Language packs: the phoneme table, alias/replacement/transform rule
//! sets, intonation and tone-contour tables, and the large tuning-knob
//! surface that shapes prosody and coarticulation.
//!
//! Grounded on `original_source/src/frontend/pack.h`. That header's
//! ~200-field flat `LanguagePack` struct is grouped here into nested
//! per-subsystem config structs (spec §3/§4 scope-management guidance);
//! fields the original itself marks deprecated (`fujisakiPhraseDecay`,
//! `fujisakiDeclinationScale`, `fujisakiDeclinationMax`,
//! `fujisakiDeclinationPostFloor`) are dropped rather than carried.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{PackError, PackResult};
use crate::frame::{FieldId, PartialFrameFields};

use super::voice_profile::VoiceProfileSet;

// ---------------------------------------------------------------------
// Phoneme definitions
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PhonemeFlags {
    pub is_vowel: bool,
    pub is_voiced: bool,
    pub is_nasal: bool,
    pub is_liquid: bool,
    pub is_semivowel: bool,
    pub is_stop: bool,
    pub is_tap: bool,
    pub is_trill: bool,
    pub is_affricate: bool,
    pub copy_adjacent: bool,
}

/// Micro-event shaping parameters for burst/voice-bar/frication onset
/// detail (spec §3 PhonemeDef; pack.h's `has*`/value pairs collapse
/// naturally onto `Option<f64>`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MicroEventShape {
    pub burst_duration_ms: Option<f64>,
    pub burst_decay_rate: Option<f64>,
    pub burst_spectral_tilt: Option<f64>,
    pub voice_bar_amplitude: Option<f64>,
    pub voice_bar_f1: Option<f64>,
    pub release_spread_ms: Option<f64>,
    pub fric_attack_ms: Option<f64>,
    pub fric_decay_ms: Option<f64>,
    pub duration_scale: Option<f64>,
}

/// Sparse FrameEx overrides a phoneme may apply on top of the defaults
/// (creakiness/breathiness/jitter/shimmer/sharpness).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FrameExOverride {
    pub creakiness: Option<f64>,
    pub breathiness: Option<f64>,
    pub jitter: Option<f64>,
    pub shimmer: Option<f64>,
    pub sharpness: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PhonemeDef {
    pub key: String,
    pub flags: PhonemeFlags,
    /// Field values this phoneme sets, keyed by the same field names
    /// [`parse_field_id`] understands; unset fields are inherited from
    /// whatever the caller's base `Frame` already holds.
    #[serde(rename = "fields")]
    pub fields: PartialFrameFields,
    pub frame_ex: Option<FrameExOverride>,
    pub micro_event: Option<MicroEventShape>,
}

// ---------------------------------------------------------------------
// Replacement / transform / allophone rules
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuleWhen {
    pub at_word_start: bool,
    pub at_word_end: bool,
    pub before_class: Option<String>,
    pub after_class: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReplacementRule {
    pub from: Vec<String>,
    pub to: String,
    pub when: RuleWhen,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TransformRule {
    pub matches: Vec<String>,
    pub set: HashMap<String, f64>,
    pub scale: HashMap<String, f64>,
    pub add: HashMap<String, f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SpecialCoarticRule {
    pub from_class: String,
    pub to_class: String,
    pub delta_hz: HashMap<String, f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AllophoneRule {
    pub phonemes: Vec<String>,
    pub flags: Vec<String>,
    pub not_flags: Vec<String>,
    pub token_type: Option<String>,
    pub position: Option<String>,
    pub stress: Option<String>,
    pub after: Vec<String>,
    pub before: Vec<String>,
    pub replace: Option<String>,
    pub scale: HashMap<String, f64>,
    pub shift: HashMap<String, f64>,
    pub insert_before: Option<String>,
    pub insert_after: Option<String>,
}

// ---------------------------------------------------------------------
// Intonation / tone contours
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IntonationClause {
    pub pre_head_start: f64,
    pub pre_head_end: f64,
    pub head_extend_from: f64,
    pub head_start: f64,
    pub head_end: f64,
    pub head_steps: u32,
    pub head_stress_end_delta: f64,
    pub head_unstressed_run_start_delta: f64,
    pub head_unstressed_run_end_delta: f64,
    pub nucleus0_start: f64,
    pub nucleus0_end: f64,
    pub nucleus_start: f64,
    pub nucleus_end: f64,
    pub tail_start: f64,
    pub tail_end: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToneContour {
    pub points: Vec<(f64, f64)>,
}

// ---------------------------------------------------------------------
// Nested tuning-knob groups (spec §4, subsystem grouping)
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StopClosureConfig {
    pub mode: String,
    pub cluster_gaps_enabled: bool,
    pub after_nasals_enabled: bool,
    pub gap_ms: f64,
    pub gap_fade_ms: f64,
    pub cluster_gap_ms: f64,
    pub cluster_gap_fade_ms: f64,
    pub word_boundary_gap_ms: Option<f64>,
    pub word_boundary_fade_ms: Option<f64>,
}

impl Default for StopClosureConfig {
    fn default() -> Self {
        StopClosureConfig {
            mode: "vowel-and-cluster".to_string(),
            cluster_gaps_enabled: true,
            after_nasals_enabled: false,
            gap_ms: 6.0,
            gap_fade_ms: 4.0,
            cluster_gap_ms: 6.0,
            cluster_gap_fade_ms: 4.0,
            word_boundary_gap_ms: None,
            word_boundary_fade_ms: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoarticulationConfig {
    pub enabled: bool,
    pub strength: f64,
    pub locus_labial_hz: f64,
    pub locus_alveolar_hz: f64,
    pub locus_velar_hz: f64,
    pub mit_alk_k: f64,
    pub f1_scale: f64,
    pub f2_scale: f64,
    pub f3_scale: f64,
    pub labial_scale: f64,
    pub alveolar_scale: f64,
    pub velar_scale: f64,
    pub velar_pinch: f64,
    pub aspiration_blend_start: f64,
    pub aspiration_blend_end: f64,
    pub cross_syllable_scale: f64,
}

impl Default for CoarticulationConfig {
    fn default() -> Self {
        CoarticulationConfig {
            enabled: true,
            strength: 0.25,
            locus_labial_hz: 250.0,
            locus_alveolar_hz: 1800.0,
            locus_velar_hz: 3000.0,
            mit_alk_k: 0.42,
            f1_scale: 1.0,
            f2_scale: 1.0,
            f3_scale: 1.0,
            labial_scale: 1.0,
            alveolar_scale: 1.0,
            velar_scale: 1.0,
            velar_pinch: 0.15,
            aspiration_blend_start: 0.0,
            aspiration_blend_end: 1.0,
            cross_syllable_scale: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClusterBlendConfig {
    pub enabled: bool,
    pub strength: f64,
    pub manner_pair_scales: HashMap<String, f64>,
    pub onset_context_scale: f64,
    pub coda_context_scale: f64,
    pub f2_scale: f64,
    pub f3_scale: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClusterTimingConfig {
    pub enabled: bool,
    pub onset_scale: f64,
    pub coda_scale: f64,
    pub max_cluster_len_scale: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrajectoryLimitConfig {
    pub enabled: bool,
    pub apply_mask: Vec<String>,
    pub max_hz_per_ms: HashMap<String, f64>,
    pub window_ms: f64,
    pub apply_across_word_boundary: bool,
    pub liquid_rate_scale: f64,
}

impl Default for TrajectoryLimitConfig {
    fn default() -> Self {
        TrajectoryLimitConfig {
            enabled: true,
            apply_mask: vec!["cf2".into(), "cf3".into(), "pf2".into(), "pf3".into()],
            max_hz_per_ms: HashMap::new(),
            window_ms: 25.0,
            apply_across_word_boundary: false,
            liquid_rate_scale: 1.5,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RateCompConfig {
    pub enabled: bool,
    pub class_floor_ms: HashMap<String, f64>,
    pub word_final_bonus_ms: f64,
    pub floor_speed_scale: f64,
    pub cluster_proportion_guard: f64,
    pub schwa_reduction: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MicroprosodyConfig {
    pub enabled: bool,
    pub voiceless_f0_raise_hz: f64,
    pub voiced_f0_lower_hz: f64,
    pub following_consonant_f0_hz: f64,
    pub voiced_fricative_lower_scale: f64,
    pub intrinsic_vowel_f0_hz: HashMap<String, f64>,
    pub pre_voiceless_shortening_scale: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PhraseFinalLengtheningConfig {
    pub enabled: bool,
    pub vowel_scale: f64,
    pub coda_scale: f64,
    pub nucleus_scale: f64,
    pub onset_scale: f64,
    pub min_scale: f64,
    pub max_scale: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProminenceConfig {
    pub enabled: bool,
    pub duration_scale: f64,
    pub amplitude_scale: f64,
    pub f0_boost_hz: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BoundarySmoothingConfig {
    pub enabled: bool,
    pub f1_scale: f64,
    pub f2_scale: f64,
    pub f3_scale: f64,
    pub per_place_overrides: HashMap<String, (f64, f64, f64)>,
    pub syllable_aware_onset_scale: f64,
    pub syllable_aware_coda_scale: f64,
    pub fade_ms: HashMap<String, f64>,
    pub plosive_release_smoothing: bool,
    pub nasal_murmur_smoothing: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LiquidDynamicsConfig {
    pub enabled: bool,
    pub lateral_onglide_ms: f64,
    pub rhotic_f3_dip_hz: f64,
    pub labial_glide_ms: f64,
}

// ---------------------------------------------------------------------
// Fujisaki-Bartman pitch-model knobs (active fields only; the four
// deprecated-in-source fields are intentionally not carried)
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FujisakiConfig {
    pub phrase_amp: f64,
    pub primary_accent_amp: f64,
    pub secondary_accent_amp: f64,
    pub accent_mode: String,
    pub phrase_len_ms: f64,
    pub accent_len_ms: f64,
    pub accent_dur_ms: f64,
    pub declination_rate: f64,
}

impl Default for FujisakiConfig {
    fn default() -> Self {
        FujisakiConfig {
            phrase_amp: 0.24,
            primary_accent_amp: 0.24,
            secondary_accent_amp: 0.12,
            accent_mode: "all".to_string(),
            phrase_len_ms: 0.0,
            accent_len_ms: 0.0,
            accent_dur_ms: 0.0,
            declination_rate: 0.0003,
        }
    }
}

// ---------------------------------------------------------------------
// LanguagePack
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LanguagePack {
    pub language_tag: String,

    pub primary_stress_div: f64,
    pub secondary_stress_div: f64,

    pub default_vowel_duration_ms: f64,
    pub default_fade_ms: f64,
    pub post_stop_aspiration_duration_ms: f64,
    pub stop_duration_ms: f64,
    pub affricate_duration_ms: f64,
    pub voiceless_fricative_duration_ms: f64,
    pub voiced_consonant_duration_ms: f64,
    pub tap_duration_ms: f64,
    pub trill_fallback_duration_ms: f64,
    pub nasal_min_duration_ms: f64,
    pub tied_vowel_duration_ms: f64,
    pub tied_from_vowel_duration_ms: f64,
    pub tied_from_vowel_fade_ms: f64,
    pub vowel_before_liquid_duration_ms: f64,
    pub vowel_before_nasal_duration_ms: f64,
    pub fade_after_liquid_ms: f64,
    pub liquid_fade_ms: f64,

    pub voice_profile_name: String,
    pub legacy_pitch_mode: String,
    pub legacy_pitch_inflection_scale: f64,
    pub fujisaki: FujisakiConfig,

    pub post_stop_aspiration_enabled: bool,
    pub post_stop_aspiration_phoneme: String,
    pub stop_closure: StopClosureConfig,

    pub segment_boundary_gap_ms: f64,
    pub segment_boundary_fade_ms: f64,
    pub skip_vowel_to_vowel_gap: bool,
    pub skip_vowel_to_semivowel_gap: bool,

    pub single_word_tuning_enabled: bool,
    pub single_word_rate_scale: f64,
    pub single_word_amplitude_scale: f64,
    pub single_word_pitch_range_scale: f64,
    pub single_word_final_lengthen_scale: f64,

    pub auto_tie_diphthongs: bool,
    pub auto_diphthong_offglide_to_semivowel: bool,
    pub semivowel_offglide_scale: f64,

    pub trill_modulation_ms: f64,
    pub trill_modulation_fade_ms: f64,

    pub stressed_vowel_hiatus_gap_ms: f64,
    pub stressed_vowel_hiatus_fade_ms: f64,

    pub spelling_diphthong_mode: String,

    pub lengthened_scale: f64,
    pub length_contrast_enabled: bool,
    pub length_contrast_short_scale: f64,
    pub length_contrast_long_scale: f64,
    pub length_contrast_overlong_scale: f64,
    pub length_contrast_apply_to_consonants: bool,
    pub length_contrast_min_scale: f64,
    pub lengthened_scale_hu: f64,
    pub apply_lengthened_scale_to_vowels_only: bool,
    pub lengthened_vowel_final_coda_scale: f64,

    pub coarticulation: CoarticulationConfig,
    pub legal_onsets: Vec<String>,
    pub special_coarticulation_enabled: bool,
    pub special_coarticulation_rules: Vec<SpecialCoarticRule>,
    pub special_coarticulation_max_delta_hz: f64,

    pub cluster_timing: ClusterTimingConfig,
    pub syllable_duration_enabled: bool,
    pub syllable_duration_onset_scale: f64,
    pub syllable_duration_coda_scale: f64,
    pub syllable_duration_nucleus_scale: f64,

    pub cluster_blend: ClusterBlendConfig,
    pub boundary_smoothing: BoundarySmoothingConfig,

    pub trajectory_limit: TrajectoryLimitConfig,
    pub liquid_dynamics: LiquidDynamicsConfig,

    pub phrase_final_lengthening: PhraseFinalLengtheningConfig,
    pub prominence: ProminenceConfig,
    pub microprosody: MicroprosodyConfig,
    pub rate_comp: RateCompConfig,

    pub word_final_schwa_reduction_enabled: bool,
    pub word_final_schwa_reduction_scale: f64,
    pub word_final_schwa_reduction_min_duration_ms: f64,

    pub nasalization_anticipatory_enabled: bool,
    pub nasalization_anticipatory_lead_ms: f64,
    pub nasalization_anticipatory_scale: f64,

    pub allophone_rules_enabled: bool,
    pub allophone_rules: Vec<AllophoneRule>,

    pub hu_short_a_vowel_enabled: bool,
    pub hu_short_a_vowel_key: String,
    pub hu_short_a_vowel_scale: f64,

    pub english_long_u_shorten_enabled: bool,
    pub english_long_u_shorten_key: String,
    pub english_long_u_shorten_word_final_scale: f64,

    pub default_pre_formant_gain: f64,
    pub default_output_gain: f64,
    pub default_vibrato_pitch_offset: f64,
    pub default_voice_turbulence_amplitude: f64,
    pub default_glottal_open_quotient: f64,

    pub strip_allophone_digits: bool,
    pub strip_hyphen: bool,

    pub aliases: HashMap<String, Vec<String>>,
    pub pre_replacements: Vec<ReplacementRule>,
    pub replacements: Vec<ReplacementRule>,
    pub classes: HashMap<String, Vec<String>>,
    pub transforms: Vec<TransformRule>,
    pub intonation: HashMap<String, IntonationClause>,

    pub tonal: bool,
    pub tone_contours: HashMap<String, ToneContour>,
    pub tone_digits_enabled: bool,
    pub tone_contours_absolute: bool,
}

impl Default for LanguagePack {
    fn default() -> Self {
        LanguagePack {
            language_tag: "default".to_string(),
            primary_stress_div: 1.4,
            secondary_stress_div: 1.1,
            default_vowel_duration_ms: 60.0,
            default_fade_ms: 10.0,
            post_stop_aspiration_duration_ms: 20.0,
            stop_duration_ms: 6.0,
            affricate_duration_ms: 24.0,
            voiceless_fricative_duration_ms: 45.0,
            voiced_consonant_duration_ms: 30.0,
            tap_duration_ms: 14.0,
            trill_fallback_duration_ms: 40.0,
            nasal_min_duration_ms: 18.0,
            tied_vowel_duration_ms: 40.0,
            tied_from_vowel_duration_ms: 20.0,
            tied_from_vowel_fade_ms: 20.0,
            vowel_before_liquid_duration_ms: 30.0,
            vowel_before_nasal_duration_ms: 40.0,
            fade_after_liquid_ms: 25.0,
            liquid_fade_ms: 20.0,
            voice_profile_name: String::new(),
            legacy_pitch_mode: "espeak_style".to_string(),
            legacy_pitch_inflection_scale: 0.58,
            fujisaki: FujisakiConfig::default(),
            post_stop_aspiration_enabled: true,
            post_stop_aspiration_phoneme: "h".to_string(),
            stop_closure: StopClosureConfig::default(),
            segment_boundary_gap_ms: 0.0,
            segment_boundary_fade_ms: 0.0,
            skip_vowel_to_vowel_gap: false,
            skip_vowel_to_semivowel_gap: false,
            single_word_tuning_enabled: false,
            single_word_rate_scale: 1.0,
            single_word_amplitude_scale: 1.0,
            single_word_pitch_range_scale: 1.0,
            single_word_final_lengthen_scale: 1.0,
            auto_tie_diphthongs: true,
            auto_diphthong_offglide_to_semivowel: false,
            semivowel_offglide_scale: 1.0,
            trill_modulation_ms: 28.0,
            trill_modulation_fade_ms: 4.0,
            stressed_vowel_hiatus_gap_ms: 0.0,
            stressed_vowel_hiatus_fade_ms: 0.0,
            spelling_diphthong_mode: "none".to_string(),
            lengthened_scale: 1.05,
            length_contrast_enabled: false,
            length_contrast_short_scale: 0.8,
            length_contrast_long_scale: 1.3,
            length_contrast_overlong_scale: 1.6,
            length_contrast_apply_to_consonants: false,
            length_contrast_min_scale: 0.5,
            lengthened_scale_hu: 1.3,
            apply_lengthened_scale_to_vowels_only: true,
            lengthened_vowel_final_coda_scale: 1.0,
            coarticulation: CoarticulationConfig::default(),
            legal_onsets: Vec::new(),
            special_coarticulation_enabled: false,
            special_coarticulation_rules: Vec::new(),
            special_coarticulation_max_delta_hz: 200.0,
            cluster_timing: ClusterTimingConfig::default(),
            syllable_duration_enabled: false,
            syllable_duration_onset_scale: 1.0,
            syllable_duration_coda_scale: 1.0,
            syllable_duration_nucleus_scale: 1.0,
            cluster_blend: ClusterBlendConfig::default(),
            boundary_smoothing: BoundarySmoothingConfig::default(),
            trajectory_limit: TrajectoryLimitConfig::default(),
            liquid_dynamics: LiquidDynamicsConfig::default(),
            phrase_final_lengthening: PhraseFinalLengtheningConfig::default(),
            prominence: ProminenceConfig::default(),
            microprosody: MicroprosodyConfig::default(),
            rate_comp: RateCompConfig::default(),
            word_final_schwa_reduction_enabled: false,
            word_final_schwa_reduction_scale: 0.7,
            word_final_schwa_reduction_min_duration_ms: 20.0,
            nasalization_anticipatory_enabled: false,
            nasalization_anticipatory_lead_ms: 30.0,
            nasalization_anticipatory_scale: 0.3,
            allophone_rules_enabled: false,
            allophone_rules: Vec::new(),
            hu_short_a_vowel_enabled: false,
            hu_short_a_vowel_key: "\u{1d12}".to_string(),
            hu_short_a_vowel_scale: 0.85,
            english_long_u_shorten_enabled: false,
            english_long_u_shorten_key: "u".to_string(),
            english_long_u_shorten_word_final_scale: 0.80,
            default_pre_formant_gain: 1.0,
            default_output_gain: 1.5,
            default_vibrato_pitch_offset: 0.0,
            default_voice_turbulence_amplitude: 0.0,
            default_glottal_open_quotient: 0.0,
            strip_allophone_digits: true,
            strip_hyphen: true,
            aliases: HashMap::new(),
            pre_replacements: Vec::new(),
            replacements: Vec::new(),
            classes: HashMap::new(),
            transforms: Vec::new(),
            intonation: HashMap::new(),
            tonal: false,
            tone_contours: HashMap::new(),
            tone_digits_enabled: false,
            tone_contours_absolute: false,
        }
    }
}

// ---------------------------------------------------------------------
// Pack set and loading
// ---------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PhonemeTableFile {
    #[serde(default)]
    phonemes: Vec<PhonemeDef>,
}

#[derive(Debug, Clone, Default)]
pub struct PackSet {
    pub phonemes: HashMap<String, PhonemeDef>,
    pub sorted_phoneme_keys: Vec<String>,
    pub lang: LanguagePack,
    pub voice_profiles: VoiceProfileSet,
    pub load_warnings: Vec<String>,
    pub stress_dict: HashMap<String, String>,
}

impl PackSet {
    pub fn has_phoneme(&self, key: &str) -> bool {
        self.phonemes.contains_key(key)
    }

    pub fn phoneme(&self, key: &str) -> Option<&PhonemeDef> {
        self.phonemes.get(key)
    }
}

/// Load a pack set from `pack_dir`, resolving `lang_tag` against the
/// directory's `lang/` subdirectory by walking hyphen-separated prefixes
/// down to `default` (spec §6.3).
pub fn load_pack_set(pack_dir: &Path, lang_tag: &str) -> PackResult<PackSet> {
    if !pack_dir.is_dir() {
        return Err(PackError::DirectoryNotFound(pack_dir.display().to_string()));
    }

    let phonemes_path = pack_dir.join("phonemes.yaml");
    let phonemes_raw = read_yaml_file(&phonemes_path)?;
    let table: PhonemeTableFile = serde_yaml::from_str(&phonemes_raw).map_err(|source| PackError::Yaml {
        path: phonemes_path.display().to_string(),
        source,
    })?;
    if table.phonemes.is_empty() {
        return Err(PackError::EmptyPhonemeTable(phonemes_path.display().to_string()));
    }

    let mut phonemes = HashMap::with_capacity(table.phonemes.len());
    let warnings = Vec::new();
    for def in table.phonemes {
        phonemes.insert(def.key.clone(), def);
    }
    let mut sorted_phoneme_keys: Vec<String> = phonemes.keys().cloned().collect();
    sorted_phoneme_keys.sort_by_key(|k| std::cmp::Reverse(k.chars().count()));

    let lang = resolve_lang_pack(pack_dir, lang_tag)?;

    let voice_profiles_path = pack_dir.join("voices.yaml");
    let voice_profiles = if voice_profiles_path.is_file() {
        let raw = read_yaml_file(&voice_profiles_path)?;
        let mut set: VoiceProfileSet = serde_yaml::from_str(&raw).map_err(|source| PackError::Yaml {
            path: voice_profiles_path.display().to_string(),
            source,
        })?;
        for (name, profile) in set.profiles.iter_mut() {
            profile.name = name.clone();
        }
        set
    } else {
        VoiceProfileSet::default()
    };

    let stress_dict = load_stress_dict(pack_dir, &lang.language_tag)?;

    Ok(PackSet {
        phonemes,
        sorted_phoneme_keys,
        lang,
        voice_profiles,
        load_warnings: warnings,
        stress_dict,
    })
}

fn resolve_lang_pack(pack_dir: &Path, lang_tag: &str) -> PackResult<LanguagePack> {
    let lang_dir = pack_dir.join("lang");
    let mut candidate = lang_tag.to_string();
    loop {
        let path = lang_dir.join(format!("{candidate}.yaml"));
        if path.is_file() {
            let raw = read_yaml_file(&path)?;
            let mut pack: LanguagePack = serde_yaml::from_str(&raw).map_err(|source| PackError::Yaml {
                path: path.display().to_string(),
                source,
            })?;
            pack.language_tag = candidate;
            return Ok(pack);
        }
        match candidate.rfind('-') {
            Some(idx) => candidate.truncate(idx),
            None => break,
        }
    }
    let default_path = lang_dir.join("default.yaml");
    if default_path.is_file() {
        let raw = read_yaml_file(&default_path)?;
        let mut pack: LanguagePack = serde_yaml::from_str(&raw).map_err(|source| PackError::Yaml {
            path: default_path.display().to_string(),
            source,
        })?;
        pack.language_tag = "default".to_string();
        return Ok(pack);
    }
    Err(PackError::LanguageTagUnresolved(lang_tag.to_string()))
}

fn load_stress_dict(pack_dir: &Path, resolved_tag: &str) -> PackResult<HashMap<String, String>> {
    let path: PathBuf = pack_dir.join("dict").join(format!("{resolved_tag}-stress.tsv"));
    if !path.is_file() {
        return Ok(HashMap::new());
    }
    let raw = fs::read_to_string(&path).map_err(|source| PackError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut dict = HashMap::new();
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((word, stressed)) = line.split_once('\t') {
            dict.insert(word.to_string(), stressed.to_string());
        }
    }
    Ok(dict)
}

fn read_yaml_file(path: &Path) -> PackResult<String> {
    fs::read_to_string(path).map_err(|source| PackError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_pack_defaults_match_documented_constants() {
        let lang = LanguagePack::default();
        assert_eq!(lang.primary_stress_div, 1.4);
        assert_eq!(lang.default_vowel_duration_ms, 60.0);
        assert_eq!(lang.stop_duration_ms, 6.0);
        assert_eq!(lang.tap_duration_ms, 14.0);
        assert_eq!(lang.fujisaki.phrase_amp, 0.24);
    }

    #[test]
    fn phoneme_def_fields_apply_onto_a_frame_and_report_set_mask() {
        let mut def = PhonemeDef::default();
        def.key = "a".to_string();
        def.fields.cf1 = Some(700.0);
        let mut frame = crate::frame::Frame::default();
        let set = def.fields.apply_onto(&mut frame);
        assert_eq!(set, vec![FieldId::Cf1]);
        assert_eq!(frame.cf1, 700.0);
    }

    #[test]
    fn load_pack_set_reports_missing_directory() {
        let result = load_pack_set(Path::new("/nonexistent/pack/dir"), "en");
        assert!(matches!(result, Err(PackError::DirectoryNotFound(_))));
    }
}
