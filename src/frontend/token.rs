//! Tokens and the left-to-right token builder (spec §4.7).
//!
//! `TokenBuilder` walks a normalized UTF-32 IPA string and produces a
//! `Vec<Token>`, inserting closure gaps, aspiration, and hiatus markers
//! along the way, then running post-passes that tie diphthongs and fix
//! up `copyAdjacent` phonemes.

use crate::frame::FieldId;

use super::pack::{LanguagePack, PackSet, PhonemeDef};

const PRIMARY_STRESS: char = 'ˈ';
const SECONDARY_STRESS: char = 'ˌ';
const TIE_BAR: char = '\u{0361}';
const LENGTH_MARK: char = 'ː';

fn is_tone_letter(c: char) -> bool {
    ('\u{02e5}'..='\u{02e9}').contains(&c)
}

fn is_tone_digit(c: char) -> bool {
    matches!(c, '1'..='5')
}

/// A single synthesis unit: either a phoneme reference or a silence
/// marker, plus the flags and computed timing spec §3 lists.
#[derive(Debug, Clone)]
pub struct Token {
    /// `None` for a silence token.
    pub phoneme_key: Option<String>,
    pub set_fields: Vec<FieldId>,

    pub word_start: bool,
    pub syllable_start: bool,
    /// 0 = unstressed, 1 = primary, 2 = secondary.
    pub stress: u8,
    pub tied_to: bool,
    pub tied_from: bool,
    pub lengthened: bool,
    pub silence: bool,
    pub pre_stop_gap: bool,
    pub post_stop_aspiration: bool,
    pub vowel_hiatus_gap: bool,
    pub cluster_gap: bool,
    pub voiced_closure: bool,
    pub copy_adjacent: bool,

    /// Populated by `Prosody`; zero until then.
    pub duration_ms: f64,
    pub fade_ms: f64,
    pub voice_pitch: f64,
    pub end_voice_pitch: f64,

    pub tone: String,

    pub end_target_cf2: Option<f64>,
    pub end_target_cf3: Option<f64>,
    pub trans_f2_scale: Option<f64>,
    pub trans_f3_scale: Option<f64>,
}

impl Token {
    fn phoneme(key: &str) -> Self {
        Token {
            phoneme_key: Some(key.to_string()),
            set_fields: Vec::new(),
            word_start: false,
            syllable_start: false,
            stress: 0,
            tied_to: false,
            tied_from: false,
            lengthened: false,
            silence: false,
            pre_stop_gap: false,
            post_stop_aspiration: false,
            vowel_hiatus_gap: false,
            cluster_gap: false,
            voiced_closure: false,
            copy_adjacent: false,
            duration_ms: 0.0,
            fade_ms: 0.0,
            voice_pitch: 0.0,
            end_voice_pitch: 0.0,
            tone: String::new(),
            end_target_cf2: None,
            end_target_cf3: None,
            trans_f2_scale: None,
            trans_f3_scale: None,
        }
    }

    pub fn silence(fade_ms: f64) -> Self {
        Token {
            phoneme_key: None,
            silence: true,
            fade_ms,
            ..Token::phoneme("")
        }
    }

    pub fn is_vowel(&self, pack: &PackSet) -> bool {
        self.phoneme_key
            .as_ref()
            .and_then(|k| pack.phoneme(k))
            .map(|d| d.flags.is_vowel)
            .unwrap_or(false)
    }

    pub fn def<'a>(&self, pack: &'a PackSet) -> Option<&'a PhonemeDef> {
        self.phoneme_key.as_ref().and_then(|k| pack.phoneme(k))
    }
}

/// Left-to-right UTF-32 token builder.
pub struct TokenBuilder<'a> {
    pack: &'a PackSet,
    lang: &'a LanguagePack,
}

impl<'a> TokenBuilder<'a> {
    pub fn new(pack: &'a PackSet) -> Self {
        TokenBuilder {
            pack,
            lang: &pack.lang,
        }
    }

    pub fn build(&self, normalized: &[char]) -> Vec<Token> {
        let mut tokens = self.walk(normalized);
        self.insert_post_stop_aspiration(&mut tokens);
        self.insert_stop_closure_gaps(&mut tokens);
        self.insert_vowel_hiatus_gaps(&mut tokens);
        if self.lang.auto_tie_diphthongs {
            self.auto_tie_diphthongs(&mut tokens);
        }
        if self.lang.spelling_diphthong_mode == "monophthong" {
            self.monophthongize_spelling_diphthongs(&mut tokens);
        }
        self.fix_copy_adjacent(&mut tokens);
        tokens
    }

    fn walk(&self, chars: &[char]) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut pending_word_start = true;
        let mut pending_stress: u8 = 0;
        let mut pending_syllable_start = true;
        let mut last_index: Option<usize> = None;
        let mut syllable_start_index: Option<usize> = None;

        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c == ' ' {
                pending_word_start = true;
                i += 1;
                continue;
            }
            if c == PRIMARY_STRESS {
                pending_stress = 1;
                pending_syllable_start = true;
                i += 1;
                continue;
            }
            if c == SECONDARY_STRESS {
                pending_stress = 2;
                pending_syllable_start = true;
                i += 1;
                continue;
            }
            if is_tone_letter(c) || (self.lang.tonal && is_tone_digit(c)) {
                if let Some(idx) = syllable_start_index.or(last_index) {
                    tokens[idx].tone.push(c);
                }
                i += 1;
                continue;
            }

            let (key, len) = match self.greedy_lookup(chars, i) {
                Some(m) => m,
                None => {
                    i += 1;
                    continue;
                }
            };
            let def = self.pack.phoneme(&key);
            let mut token = Token::phoneme(&key);
            token.word_start = pending_word_start;
            token.syllable_start = pending_syllable_start;
            token.stress = pending_stress;
            token.copy_adjacent = def.map(|d| d.flags.copy_adjacent).unwrap_or(false);
            if let Some(def) = def {
                let mut frame = crate::frame::Frame::default();
                token.set_fields = def.fields.apply_onto(&mut frame);
            }
            tokens.push(token);

            pending_word_start = false;
            pending_syllable_start = false;
            pending_stress = 0;
            last_index = Some(tokens.len() - 1);
            if tokens[tokens.len() - 1].syllable_start || syllable_start_index.is_none() {
                syllable_start_index = last_index;
            }
            i += len;
        }
        tokens
    }

    /// Greedy phoneme lookup: tied trigrams, then length-marked bigrams,
    /// then single codepoints.
    fn greedy_lookup(&self, chars: &[char], pos: usize) -> Option<(String, usize)> {
        if pos + 2 < chars.len() && chars[pos + 1] == TIE_BAR {
            let tri: String = [chars[pos], chars[pos + 1], chars[pos + 2]].iter().collect();
            if self.pack.has_phoneme(&tri) {
                return Some((tri, 3));
            }
            let without_tie: String = [chars[pos], chars[pos + 2]].iter().collect();
            if self.pack.has_phoneme(&without_tie) {
                return Some((without_tie, 3));
            }
        }
        if pos + 1 < chars.len() && chars[pos + 1] == LENGTH_MARK {
            let bi: String = [chars[pos], chars[pos + 1]].iter().collect();
            if self.pack.has_phoneme(&bi) {
                return Some((bi, 2));
            }
        }
        let single = chars[pos].to_string();
        if self.pack.has_phoneme(&single) {
            return Some((single, 1));
        }
        None
    }

    fn insert_post_stop_aspiration(&self, tokens: &mut Vec<Token>) {
        if !self.lang.post_stop_aspiration_enabled {
            return;
        }
        let phoneme = &self.lang.post_stop_aspiration_phoneme;
        if !self.pack.has_phoneme(phoneme) {
            return;
        }
        let mut i = 0;
        while i + 1 < tokens.len() {
            let is_voiceless_stop = tokens[i]
                .def(self.pack)
                .map(|d| d.flags.is_stop && !d.flags.is_voiced)
                .unwrap_or(false);
            let next_is_voiced_non_stop = tokens[i + 1]
                .def(self.pack)
                .map(|d| d.flags.is_voiced && !d.flags.is_stop && !d.flags.is_affricate)
                .unwrap_or(false);
            if is_voiceless_stop && next_is_voiced_non_stop {
                let mut asp = Token::phoneme(phoneme);
                asp.post_stop_aspiration = true;
                tokens.insert(i + 1, asp);
                i += 1;
            }
            i += 1;
        }
    }

    fn insert_stop_closure_gaps(&self, tokens: &mut Vec<Token>) {
        let mode = self.lang.stop_closure.mode.as_str();
        if mode == "none" {
            return;
        }
        let mut i = 0;
        while i < tokens.len() {
            let is_target = tokens[i]
                .def(self.pack)
                .map(|d| d.flags.is_stop || d.flags.is_affricate)
                .unwrap_or(false);
            if !is_target || tokens[i].stress != 0 {
                i += 1;
                continue;
            }
            let prev_is_vowel = i > 0 && tokens[i - 1].is_vowel(self.pack);
            let should_gap = match mode {
                "always" => true,
                "after-vowel" => prev_is_vowel,
                "vowel-and-cluster" => {
                    prev_is_vowel
                        || (i > 0
                            && self.lang.stop_closure.cluster_gaps_enabled
                            && self.is_cluster_context(tokens, i - 1))
                }
                _ => false,
            };
            if should_gap {
                let mut gap = Token::silence(self.lang.stop_closure.gap_fade_ms);
                gap.pre_stop_gap = true;
                gap.cluster_gap = !prev_is_vowel;
                gap.duration_ms = if gap.cluster_gap {
                    self.lang.stop_closure.cluster_gap_ms
                } else {
                    self.lang.stop_closure.gap_ms
                };
                tokens.insert(i, gap);
                i += 1;
            }
            i += 1;
        }
    }

    fn is_cluster_context(&self, tokens: &[Token], idx: usize) -> bool {
        tokens[idx]
            .def(self.pack)
            .map(|d| {
                d.flags.is_stop
                    || d.flags.is_liquid
                    || (self.lang.stop_closure.after_nasals_enabled && d.flags.is_nasal)
            })
            .unwrap_or(false)
    }

    fn insert_vowel_hiatus_gaps(&self, tokens: &mut Vec<Token>) {
        if self.lang.stressed_vowel_hiatus_gap_ms <= 0.0 {
            return;
        }
        let mut i = 0;
        while i + 1 < tokens.len() {
            let same_word = !tokens[i + 1].word_start;
            if same_word
                && tokens[i].is_vowel(self.pack)
                && tokens[i + 1].is_vowel(self.pack)
                && tokens[i + 1].stress != 0
            {
                let mut gap = Token::silence(self.lang.stressed_vowel_hiatus_fade_ms);
                gap.vowel_hiatus_gap = true;
                gap.duration_ms = self.lang.stressed_vowel_hiatus_gap_ms;
                tokens.insert(i + 1, gap);
                i += 1;
            }
            i += 1;
        }
    }

    /// Vowel + high-vowel offglide within a word becomes a tied
    /// diphthong; optionally remaps the offglide to its semivowel.
    fn auto_tie_diphthongs(&self, tokens: &mut [Token]) {
        for i in 0..tokens.len().saturating_sub(1) {
            let (nucleus_is_vowel, offglide_is_high_vowel) = {
                let nucleus = tokens[i].def(self.pack);
                let offglide = tokens[i + 1].def(self.pack);
                (
                    nucleus.map(|d| d.flags.is_vowel).unwrap_or(false),
                    offglide.map(|d| d.flags.is_vowel).unwrap_or(false),
                )
            };
            if nucleus_is_vowel && offglide_is_high_vowel && !tokens[i + 1].word_start {
                tokens[i].tied_to = true;
                tokens[i + 1].tied_from = true;
                if self.lang.auto_diphthong_offglide_to_semivowel {
                    if let Some(semivowel_key) = self.semivowel_for(&tokens[i + 1]) {
                        tokens[i + 1].phoneme_key = Some(semivowel_key);
                    }
                }
            }
        }
    }

    fn semivowel_for(&self, token: &Token) -> Option<String> {
        let key = token.phoneme_key.as_ref()?;
        match key.as_str() {
            "i" => Some("j".to_string()),
            "u" => Some("w".to_string()),
            other => {
                if self.pack.has_phoneme(&format!("{other}\u{032f}")) {
                    Some(format!("{other}\u{032f}"))
                } else {
                    None
                }
            }
        }
    }

    /// Heuristic acronym handling: a spelled-out diphthong letter-name
    /// (e.g. "ei" read as two separate vowel letters) collapses to its
    /// monophthong when the pack's spelling-diphthong mode demands it.
    fn monophthongize_spelling_diphthongs(&self, tokens: &mut Vec<Token>) {
        let mut i = 0;
        while i + 1 < tokens.len() {
            let both_vowels = tokens[i].is_vowel(self.pack) && tokens[i + 1].is_vowel(self.pack);
            if both_vowels && tokens[i].tied_to && !tokens[i + 1].word_start {
                tokens.remove(i + 1);
            }
            i += 1;
        }
    }

    /// Tokens flagged `copyAdjacent` inherit unset fields from the
    /// nearest real phoneme neighbor, preferring the next one.
    fn fix_copy_adjacent(&self, tokens: &mut [Token]) {
        for i in 0..tokens.len() {
            if !tokens[i].copy_adjacent {
                continue;
            }
            let donor = tokens[i + 1..]
                .iter()
                .find(|t| !t.copy_adjacent && !t.silence)
                .or_else(|| tokens[..i].iter().rev().find(|t| !t.copy_adjacent && !t.silence));
            if let Some(donor) = donor {
                let donor_fields = donor.set_fields.clone();
                for id in donor_fields {
                    if !tokens[i].set_fields.contains(&id) {
                        tokens[i].set_fields.push(id);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::pack::{LanguagePack, PackSet, PhonemeDef, PhonemeFlags};
    use std::collections::HashMap;

    fn vowel(key: &str) -> PhonemeDef {
        let mut def = PhonemeDef::default();
        def.key = key.to_string();
        def.flags.is_vowel = true;
        def.fields.cf1 = Some(500.0);
        def
    }

    fn voiceless_stop(key: &str) -> PhonemeDef {
        let mut def = PhonemeDef::default();
        def.key = key.to_string();
        def.flags.is_stop = true;
        def
    }

    fn h_aspiration() -> PhonemeDef {
        let mut def = PhonemeDef::default();
        def.key = "h".to_string();
        def
    }

    fn test_pack_set() -> PackSet {
        let mut phonemes = HashMap::new();
        phonemes.insert("a".to_string(), vowel("a"));
        phonemes.insert("t".to_string(), voiceless_stop("t"));
        phonemes.insert("h".to_string(), h_aspiration());
        let mut def_n = PhonemeDef::default();
        def_n.key = "n".to_string();
        def_n.flags.is_nasal = true;
        def_n.flags.is_voiced = true;
        phonemes.insert("n".to_string(), def_n);

        PackSet {
            phonemes,
            sorted_phoneme_keys: vec!["a".into(), "t".into(), "h".into(), "n".into()],
            lang: LanguagePack::default(),
            voice_profiles: Default::default(),
            load_warnings: Vec::new(),
            stress_dict: HashMap::new(),
        }
    }

    #[test]
    fn simple_walk_produces_one_token_per_phoneme() {
        let pack = test_pack_set();
        let builder = TokenBuilder::new(&pack);
        let tokens = builder.build(&['a', 't', 'a']);
        let keys: Vec<_> = tokens.iter().map(|t| t.phoneme_key.clone()).collect();
        assert!(keys.contains(&Some("a".to_string())));
        assert!(keys.contains(&Some("t".to_string())));
    }

    #[test]
    fn primary_stress_mark_sets_stress_on_following_token() {
        let pack = test_pack_set();
        let builder = TokenBuilder::new(&pack);
        let tokens = builder.build(&[PRIMARY_STRESS, 'a']);
        assert_eq!(tokens[0].stress, 1);
    }

    #[test]
    fn stop_closure_gap_inserted_after_vowel_in_always_mode() {
        let mut pack = test_pack_set();
        pack.lang.stop_closure.mode = "always".to_string();
        let builder = TokenBuilder::new(&pack);
        let tokens = builder.build(&['a', 't']);
        assert!(tokens.iter().any(|t| t.pre_stop_gap));
    }

    #[test]
    fn no_stop_closure_gap_in_none_mode() {
        let mut pack = test_pack_set();
        pack.lang.stop_closure.mode = "none".to_string();
        let builder = TokenBuilder::new(&pack);
        let tokens = builder.build(&['a', 't']);
        assert!(!tokens.iter().any(|t| t.pre_stop_gap));
    }
}
