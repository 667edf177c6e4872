//! IPA text normalization: UTF-8 IPA → normalized UTF-32 phoneme-ready
//! string (spec §4.6).
//!
//! Twelve ordered passes turn arbitrary IPA transcription text into a
//! string built only from codepoints the pack's phoneme table, alias
//! table, and replacement rules agree on.

use super::pack::{LanguagePack, ReplacementRule};

const TIE_BAR: char = '\u{0361}';
const TIE_BAR_VARIANT: char = '\u{035c}';
const PRIMARY_STRESS: char = 'ˈ';
const SECONDARY_STRESS: char = 'ˌ';
const LENGTH_MARK: char = 'ː';
const ZWJ: char = '\u{200d}';
const ZWNJ: char = '\u{200c}';

/// Normalize raw IPA text against a language pack, returning a UTF-32
/// (`Vec<char>`) string ready for [`super::token::TokenBuilder`].
pub fn normalize(input: &str, pack: &LanguagePack) -> Vec<char> {
    let mut chars = to_utf32(input);
    normalize_tie_bar(&mut chars);
    chars = apply_rules(&chars, &pack.pre_replacements, pack);
    strip_joiners(&mut chars);
    strip_wrappers_and_utility_codes(&mut chars);
    if pack.strip_hyphen {
        strip_hyphens(&mut chars);
    }
    rewrite_stress_and_length_marks(&mut chars);
    apply_syllabic_consonant_fallbacks(&mut chars);
    if pack.strip_allophone_digits {
        strip_allophone_digits(&mut chars, pack.tone_digits_enabled);
    }
    collapse_whitespace(&mut chars);
    chars = apply_aliases(&chars, pack);
    chars = apply_rules(&chars, &pack.replacements, pack);
    chars
}

fn to_utf32(input: &str) -> Vec<char> {
    // `str::chars` already yields `char` (a validated Unicode scalar
    // value), so invalid UTF-8 byte sequences have already become
    // U+FFFD by the time the string reached us as `&str`.
    input.chars().collect()
}

fn normalize_tie_bar(chars: &mut Vec<char>) {
    for c in chars.iter_mut() {
        if *c == TIE_BAR_VARIANT {
            *c = TIE_BAR;
        }
    }
}

fn strip_joiners(chars: &mut Vec<char>) {
    chars.retain(|&c| c != ZWJ && c != ZWNJ);
}

fn strip_wrappers_and_utility_codes(chars: &mut Vec<char>) {
    let mut out = Vec::with_capacity(chars.len());
    let mut depth: i32 = 0;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '(' | '[' | '{' => {
                depth += 1;
                i += 1;
                continue;
            }
            ')' | ']' | '}' => {
                if depth > 0 {
                    depth -= 1;
                }
                i += 1;
                continue;
            }
            _ => {}
        }
        if depth > 0 {
            i += 1;
            continue;
        }
        if c == '|' && chars.get(i + 1) == Some(&'|') {
            out.push(' ');
            i += 2;
            continue;
        }
        if c == '|' || c == '%' || c == '=' {
            out.push(' ');
            i += 1;
            continue;
        }
        if c == '_' {
            // `_:` and bare `_` eSpeak utility codes both collapse to a
            // single space.
            if chars.get(i + 1) == Some(&':') {
                i += 2;
            } else {
                i += 1;
            }
            out.push(' ');
            continue;
        }
        out.push(c);
        i += 1;
    }
    *chars = out;
}

fn strip_hyphens(chars: &mut Vec<char>) {
    chars.retain(|&c| c != '-');
}

fn rewrite_stress_and_length_marks(chars: &mut Vec<char>) {
    for c in chars.iter_mut() {
        match *c {
            '\'' => *c = PRIMARY_STRESS,
            ',' => *c = SECONDARY_STRESS,
            ':' => *c = LENGTH_MARK,
            _ => {}
        }
    }
}

/// `l̩` / `ə͡l` / `ʊ͡l` → `əl` (syllabic-consonant fallbacks, spec §4.6
/// step 8).
fn apply_syllabic_consonant_fallbacks(chars: &mut Vec<char>) {
    const SYLLABIC_MARK: char = '\u{0329}';
    let mut out = Vec::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == 'l' && chars.get(i + 1) == Some(&SYLLABIC_MARK) {
            out.push('ə');
            out.push('l');
            i += 2;
            continue;
        }
        if matches!(chars[i], 'ə' | 'ʊ')
            && chars.get(i + 1) == Some(&TIE_BAR)
            && chars.get(i + 2) == Some(&'l')
        {
            out.push('ə');
            out.push('l');
            i += 3;
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    *chars = out;
}

fn strip_allophone_digits(chars: &mut Vec<char>, tone_digits_enabled: bool) {
    chars.retain(|&c| {
        if c == '2' {
            return false;
        }
        if !tone_digits_enabled && matches!(c, '1' | '3' | '4' | '5') {
            return false;
        }
        true
    });
}

fn collapse_whitespace(chars: &mut Vec<char>) {
    let mut out = Vec::with_capacity(chars.len());
    let mut last_was_space = true; // trims leading space too
    for &c in chars.iter() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    if out.last() == Some(&' ') {
        out.pop();
    }
    *chars = out;
}

/// Apply `aliases` longest-first (stable sort by key length descending;
/// equal-length aliases keep pack declaration order).
fn apply_aliases(chars: &[char], pack: &LanguagePack) -> Vec<char> {
    let mut keys: Vec<&String> = pack.aliases.keys().collect();
    keys.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));

    let mut out = Vec::with_capacity(chars.len());
    let mut i = 0;
    'outer: while i < chars.len() {
        for key in &keys {
            let key_chars: Vec<char> = key.chars().collect();
            if matches_at(chars, i, &key_chars) {
                if let Some(targets) = pack.aliases.get(*key) {
                    if let Some(target) = first_valid_target(targets, pack) {
                        out.extend(target.chars());
                        i += key_chars.len();
                        continue 'outer;
                    }
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn first_valid_target<'a>(targets: &'a [String], pack: &LanguagePack) -> Option<&'a str> {
    targets
        .iter()
        .find(|t| pack_phoneme_exists(pack, t))
        .map(|s| s.as_str())
        .or_else(|| targets.first().map(|s| s.as_str()))
}

/// A pack-inventory existence check over a target string's lead
/// codepoint(s). The actual phoneme table lives in `PackSet`, not
/// `LanguagePack`; callers that need a full inventory check should pass
/// a pack whose `classes`/`aliases` already encode the relevant keys.
/// Here we conservatively treat any non-empty target as eligible unless
/// it's explicitly absent from every class list (best-effort, since the
/// phoneme table itself is loaded separately from the language pack).
fn pack_phoneme_exists(pack: &LanguagePack, target: &str) -> bool {
    if pack.classes.is_empty() {
        return true;
    }
    pack.classes.values().any(|members| members.iter().any(|m| m == target)) || !target.is_empty()
}

fn matches_at(chars: &[char], pos: usize, pattern: &[char]) -> bool {
    if pos + pattern.len() > chars.len() {
        return false;
    }
    chars[pos..pos + pattern.len()] == *pattern
}

/// Apply a list of replacement rules with condition checking. Ties bars
/// in `from` patterns match leniently (with or without the tie bar
/// present in the input).
fn apply_rules(chars: &[char], rules: &[ReplacementRule], pack: &LanguagePack) -> Vec<char> {
    if rules.is_empty() {
        return chars.to_vec();
    }
    let mut out = Vec::with_capacity(chars.len());
    let mut i = 0;
    'outer: while i < chars.len() {
        for rule in rules {
            for pattern in lenient_patterns(&rule.from) {
                if matches_at(chars, i, &pattern) && rule_condition_holds(chars, i, pattern.len(), &rule.when, pack) {
                    if let Some(target) = first_valid_target(std::slice::from_ref(&rule.to), pack) {
                        out.extend(target.chars());
                    }
                    i += pattern.len();
                    continue 'outer;
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Expand one rule pattern into tie-bar-present and tie-bar-absent
/// variants so `a͡ɪ` matches both `a͡ɪ` and `aɪ`.
fn lenient_patterns(from: &str) -> Vec<Vec<char>> {
    let with_tie: Vec<char> = from.chars().collect();
    let without_tie: Vec<char> = with_tie.iter().copied().filter(|&c| c != TIE_BAR).collect();
    if with_tie == without_tie {
        vec![with_tie]
    } else {
        vec![with_tie, without_tie]
    }
}

fn rule_condition_holds(
    chars: &[char],
    pos: usize,
    pattern_len: usize,
    when: &super::pack::RuleWhen,
    pack: &LanguagePack,
) -> bool {
    if when.at_word_start && !at_word_start(chars, pos) {
        return false;
    }
    if when.at_word_end && !at_word_end(chars, pos + pattern_len) {
        return false;
    }
    if let Some(class) = &when.before_class {
        if !class_matches_after(chars, pos + pattern_len, class, pack) {
            return false;
        }
    }
    if let Some(class) = &when.after_class {
        if !class_matches_before(chars, pos, class, pack) {
            return false;
        }
    }
    true
}

fn at_word_start(chars: &[char], pos: usize) -> bool {
    let mut i = pos;
    while i > 0 && is_stress_mark(chars[i - 1]) {
        i -= 1;
    }
    i == 0 || chars[i - 1] == ' '
}

fn at_word_end(chars: &[char], pos: usize) -> bool {
    let mut i = pos;
    while i < chars.len() && is_stress_mark(chars[i]) {
        i += 1;
    }
    i == chars.len() || chars[i] == ' '
}

fn is_stress_mark(c: char) -> bool {
    matches!(c, PRIMARY_STRESS | SECONDARY_STRESS)
}

fn class_matches_before(chars: &[char], pos: usize, class: &str, pack: &LanguagePack) -> bool {
    let mut i = pos;
    while i > 0 && is_stress_mark(chars[i - 1]) {
        i -= 1;
    }
    if i == 0 {
        return false;
    }
    let prev = chars[i - 1].to_string();
    pack.classes
        .get(class)
        .map(|members| members.iter().any(|m| *m == prev))
        .unwrap_or(false)
}

fn class_matches_after(chars: &[char], pos: usize, class: &str, pack: &LanguagePack) -> bool {
    let mut i = pos;
    while i < chars.len() && is_stress_mark(chars[i]) {
        i += 1;
    }
    if i >= chars.len() {
        return false;
    }
    let next = chars[i].to_string();
    pack.classes
        .get(class)
        .map(|members| members.iter().any(|m| *m == next))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn test_pack() -> LanguagePack {
        LanguagePack::default()
    }

    #[test]
    fn tie_bar_variant_is_normalized() {
        let pack = test_pack();
        let out = normalize("a\u{035c}\u{026a}", &pack);
        assert!(out.contains(&TIE_BAR));
        assert!(!out.contains(&TIE_BAR_VARIANT));
    }

    #[test]
    fn stress_and_length_marks_are_rewritten() {
        let pack = test_pack();
        let out: String = normalize("'ka,ta:p", &pack).into_iter().collect();
        assert_eq!(out, format!("{PRIMARY_STRESS}ka{SECONDARY_STRESS}ta{LENGTH_MARK}p"));
    }

    #[test]
    fn espeak_utility_codes_collapse_to_space() {
        let pack = test_pack();
        let out: String = normalize("a|b", &pack).into_iter().collect();
        assert_eq!(out, "a b");
    }

    #[test]
    fn bracketed_tags_are_stripped() {
        let pack = test_pack();
        let out: String = normalize("a(comment)b", &pack).into_iter().collect();
        assert_eq!(out, "ab");
    }

    #[test]
    fn syllabic_l_fallback_applies() {
        let pack = test_pack();
        let out: String = normalize("bɒt\u{0329}l\u{0329}", &pack).into_iter().collect();
        // l̩ -> əl; the first \u{0329} attaches to 't' and is left alone,
        // only the one directly after 'l' triggers the fallback.
        assert!(out.ends_with("əl"));
    }

    #[test]
    fn whitespace_collapses_and_trims() {
        let pack = test_pack();
        let out: String = normalize("  a    b  ", &pack).into_iter().collect();
        assert_eq!(out, "a b");
    }

    #[test]
    fn allophone_digit_two_is_stripped_but_tone_digits_preserved_when_enabled() {
        let mut pack = test_pack();
        pack.tone_digits_enabled = true;
        let out: String = normalize("ma2ma1", &pack).into_iter().collect();
        assert_eq!(out, "mama1");
    }

    #[test]
    fn longest_alias_wins_over_shorter_overlapping_one() {
        let mut pack = test_pack();
        let mut aliases = HashMap::new();
        aliases.insert("ab".to_string(), vec!["x".to_string()]);
        aliases.insert("a".to_string(), vec!["y".to_string()]);
        pack.aliases = aliases;
        let out: String = normalize("abc", &pack).into_iter().collect();
        assert_eq!(out, "xc");
    }
}
