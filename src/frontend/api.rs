//! `nvspFrontend_*` C API façade (spec §6.2), grounded on
//! `original_source/src/frontend/nvspFrontend.h` and mirroring
//! `player.rs`'s opaque-handle/`catch_ffi`/`Raw*` pattern.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_double, c_int, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::ptr;

use crate::dsp::voicing_tone::VoicingTone;
use crate::error::FrontendError;
use crate::frame::{AmplitudeTransitionMode, FrameEx};
use crate::player::{RawFrame, RawVoicingTone};

use super::frame_emitter::FrameEmitter;
use super::ipa_normalizer;
use super::pack::{load_pack_set, PackSet};
use super::prosody::{assign_durations, assign_pitch};
use super::token::TokenBuilder;

/// Raw mirror of `nvspFrontend_FrameEx` (23 fields, ABI v2+): richer than
/// `player::RawFrameEx`'s 4-field DSP-core subset, since the frontend is
/// the thing that actually produces end-target ramps, per-parameter
/// transition scales, and the Fujisaki-Bartman command fields.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawFrontendFrameEx {
    pub creakiness: f64,
    pub breathiness: f64,
    pub jitter: f64,
    pub shimmer: f64,
    pub sharpness: f64,
    pub end_cf1: f64,
    pub end_cf2: f64,
    pub end_cf3: f64,
    pub end_pf1: f64,
    pub end_pf2: f64,
    pub end_pf3: f64,
    pub fujisaki_enabled: f64,
    pub fujisaki_reset: f64,
    pub fujisaki_phrase_amp: f64,
    pub fujisaki_phrase_len: f64,
    pub fujisaki_accent_amp: f64,
    pub fujisaki_accent_dur: f64,
    pub fujisaki_accent_len: f64,
    pub trans_f1_scale: f64,
    pub trans_f2_scale: f64,
    pub trans_f3_scale: f64,
    pub trans_nasal_scale: f64,
    pub trans_amplitude_mode: f64,
}

fn opt_or_nan(v: Option<f64>) -> f64 {
    v.unwrap_or(f64::NAN)
}

impl From<&FrameEx> for RawFrontendFrameEx {
    fn from(ex: &FrameEx) -> Self {
        RawFrontendFrameEx {
            creakiness: ex.creakiness,
            breathiness: ex.breathiness,
            jitter: ex.jitter,
            shimmer: ex.shimmer,
            sharpness: ex.sharpness,
            end_cf1: opt_or_nan(ex.end_cf1),
            end_cf2: opt_or_nan(ex.end_cf2),
            end_cf3: opt_or_nan(ex.end_cf3),
            end_pf1: opt_or_nan(ex.end_pf1),
            end_pf2: opt_or_nan(ex.end_pf2),
            end_pf3: opt_or_nan(ex.end_pf3),
            fujisaki_enabled: if ex.fujisaki_enabled { 1.0 } else { 0.0 },
            fujisaki_reset: if ex.fujisaki_reset { 1.0 } else { 0.0 },
            fujisaki_phrase_amp: ex.fujisaki_phrase_amp,
            fujisaki_phrase_len: ex.fujisaki_phrase_len,
            fujisaki_accent_amp: ex.fujisaki_accent_amp,
            fujisaki_accent_dur: ex.fujisaki_accent_dur,
            fujisaki_accent_len: ex.fujisaki_accent_len,
            trans_f1_scale: ex.trans_f1_scale,
            trans_f2_scale: ex.trans_f2_scale,
            trans_f3_scale: ex.trans_f3_scale,
            trans_nasal_scale: ex.trans_nasal_scale,
            trans_amplitude_mode: match ex.trans_amplitude_mode {
                AmplitudeTransitionMode::Linear => 0.0,
                AmplitudeTransitionMode::EqualPower => 1.0,
            },
        }
    }
}

/// Legacy (ABI v1) frame callback: `cb(userData, frameOrNull, durationMs, fadeMs, userIndex)`.
pub type FrontendFrameCallback =
    unsafe extern "C" fn(*mut c_void, *const RawFrame, c_double, c_double, c_int);

/// Extended (ABI v2+) frame callback, additionally passing a `FrameEx` pointer.
pub type FrontendFrameExCallback = unsafe extern "C" fn(
    *mut c_void,
    *const RawFrame,
    *const RawFrontendFrameEx,
    c_double,
    c_double,
    c_int,
);

/// Per-handle frontend state: the loaded pack, active voice profile,
/// FrameEx defaults, and the most recent error (spec §6.4: "No global
/// errno; all state is per-handle").
pub struct Frontend {
    pack_dir: PathBuf,
    pack: Option<PackSet>,
    voice_profile_name: String,
    frame_ex_defaults: (f64, f64, f64, f64, f64),
    last_error: String,
}

impl Frontend {
    pub fn new(pack_dir: PathBuf) -> Self {
        Frontend {
            pack_dir,
            pack: None,
            voice_profile_name: String::new(),
            frame_ex_defaults: (0.0, 0.0, 0.0, 0.0, 1.0),
            last_error: String::new(),
        }
    }

    fn set_language(&mut self, lang_tag: &str) -> bool {
        match load_pack_set(&self.pack_dir, lang_tag) {
            Ok(pack) => {
                self.voice_profile_name.clear();
                self.pack = Some(pack);
                self.last_error.clear();
                true
            }
            Err(e) => {
                self.last_error = e.to_string();
                false
            }
        }
    }

    fn pack(&self) -> Result<&PackSet, FrontendError> {
        self.pack.as_ref().ok_or(FrontendError::NoLanguageSet)
    }

    fn set_voice_profile(&mut self, name: &str) -> bool {
        match &self.pack {
            Some(pack) if name.is_empty() || pack.voice_profiles.get(name).is_some() => {
                self.voice_profile_name = name.to_string();
                true
            }
            Some(_) => {
                self.last_error = FrontendError::UnknownVoiceProfile(name.to_string()).to_string();
                false
            }
            None => {
                self.last_error = FrontendError::NoLanguageSet.to_string();
                false
            }
        }
    }

    fn voice_profile_names(&self) -> String {
        let Some(pack) = &self.pack else { return String::new() };
        let mut names: Vec<&str> = pack.voice_profiles.profiles.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        let mut out = String::new();
        for name in names {
            out.push_str(name);
            out.push('\n');
        }
        out
    }

    fn voicing_tone(&self) -> (VoicingTone, bool) {
        let Some(pack) = &self.pack else { return (VoicingTone::default(), false) };
        let Some(profile) = pack.voice_profiles.get(&self.voice_profile_name) else {
            return (VoicingTone::default(), false);
        };
        match &profile.voicing_tone {
            Some(partial) => {
                let mut tone = VoicingTone::default();
                partial.apply_onto(&mut tone);
                (tone, true)
            }
            None => (VoicingTone::default(), false),
        }
    }

    /// Shared pipeline for `queueIPA`/`queueIPA_Ex`: normalize, tokenize,
    /// assign durations/pitch, then emit frames via `emit_one`.
    fn queue_ipa(
        &mut self,
        ipa_utf8: &str,
        speed: f64,
        base_pitch: f64,
        inflection: f64,
        clause_type: char,
        user_index_base: i32,
        mut emit_one: impl FnMut(super::frame_emitter::EmittedFrame),
    ) -> bool {
        let pack = match self.pack() {
            Ok(p) => p,
            Err(e) => {
                self.last_error = e.to_string();
                return false;
            }
        };

        let normalized = ipa_normalizer::normalize(ipa_utf8, &pack.lang);
        let mut tokens = TokenBuilder::new(pack).build(&normalized);
        assign_durations(pack, &mut tokens, speed);
        assign_pitch(pack, &mut tokens, base_pitch, clause_type, REFERENCE_SAMPLE_RATE);

        let inflection = inflection.clamp(0.0, 2.0);
        for token in tokens.iter_mut() {
            token.voice_pitch = base_pitch + (token.voice_pitch - base_pitch) * inflection;
            token.end_voice_pitch = base_pitch + (token.end_voice_pitch - base_pitch) * inflection;
        }

        let mut emitter = FrameEmitter::new(pack);
        emitter.set_voice_profile(&self.voice_profile_name);
        let (creak, breath, jit, shim, sharp) = self.frame_ex_defaults;
        emitter.set_frame_ex_defaults(creak, breath, jit, shim, sharp);
        emitter.emit(&tokens, user_index_base, |ef| emit_one(ef));

        self.last_error.clear();
        true
    }
}

/// Fujisaki-style pitch assignment measures its own model state in
/// samples at a fixed reference rate; the host's actual DSP sample rate
/// is irrelevant to the frontend-side flat-baseline pass (see
/// `prosody::assign_pitch_fujisaki`).
const REFERENCE_SAMPLE_RATE: i32 = 22050;

pub type FrontendHandle = *mut Frontend;

fn catch_ffi<F: FnOnce() -> R + panic::UnwindSafe, R>(default: R, f: F) -> R {
    panic::catch_unwind(f).unwrap_or_else(|_| {
        tracing::warn!("panic caught at nvspFrontend FFI boundary, returning default");
        default
    })
}

unsafe fn cstr_to_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

/// # Safety
/// `pack_dir_utf8` must be a valid, NUL-terminated UTF-8 C string. The
/// returned handle must eventually be passed to `nvspFrontend_destroy`
/// exactly once.
#[no_mangle]
pub unsafe extern "C" fn nvspFrontend_create(pack_dir_utf8: *const c_char) -> FrontendHandle {
    catch_ffi(ptr::null_mut(), AssertUnwindSafe(|| {
        let Some(dir) = cstr_to_str(pack_dir_utf8) else {
            tracing::warn!("nvspFrontend_create given a null/invalid packDir");
            return ptr::null_mut();
        };
        Box::into_raw(Box::new(Frontend::new(PathBuf::from(dir))))
    }))
}

/// # Safety
/// `handle` must be a live handle from `nvspFrontend_create` and must
/// not be used again after this call.
#[no_mangle]
pub unsafe extern "C" fn nvspFrontend_destroy(handle: FrontendHandle) {
    catch_ffi((), AssertUnwindSafe(|| {
        if !handle.is_null() {
            drop(Box::from_raw(handle));
        }
    }));
}

/// # Safety
/// `handle` must be live. `lang_tag_utf8` must be a valid, NUL-terminated
/// UTF-8 C string.
#[no_mangle]
pub unsafe extern "C" fn nvspFrontend_setLanguage(handle: FrontendHandle, lang_tag_utf8: *const c_char) -> c_int {
    catch_ffi(0, AssertUnwindSafe(|| {
        let Some(frontend) = handle.as_mut() else { return 0 };
        let Some(tag) = cstr_to_str(lang_tag_utf8) else { return 0 };
        frontend.set_language(tag) as c_int
    }))
}

/// # Safety
/// `handle` must be live, `ipa_utf8`/`clause_type_utf8` valid NUL-terminated
/// UTF-8 C strings, `frame_cb` a valid function pointer, and `user_data`
/// whatever `frame_cb` expects to receive back unchanged.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn nvspFrontend_queueIPA(
    handle: FrontendHandle,
    ipa_utf8: *const c_char,
    speed: c_double,
    base_pitch: c_double,
    inflection: c_double,
    clause_type_utf8: *const c_char,
    user_index_base: c_int,
    frame_cb: Option<FrontendFrameCallback>,
    user_data: *mut c_void,
) -> c_int {
    catch_ffi(0, AssertUnwindSafe(|| {
        let Some(frontend) = handle.as_mut() else { return 0 };
        let Some(ipa) = cstr_to_str(ipa_utf8) else { return 0 };
        let clause = cstr_to_str(clause_type_utf8).and_then(|s| s.chars().next()).unwrap_or('.');
        let Some(cb) = frame_cb else { return 0 };

        let ok = frontend.queue_ipa(ipa, speed, base_pitch, inflection, clause, user_index_base, |ef| {
            let raw_frame = ef.frame.as_ref().map(RawFrame::from);
            let frame_ptr = raw_frame.as_ref().map(|r| r as *const RawFrame).unwrap_or(ptr::null());
            cb(user_data, frame_ptr, ef.duration_ms, ef.fade_ms, ef.user_index);
        });
        ok as c_int
    }))
}

/// # Safety
/// Same as `nvspFrontend_queueIPA`, plus `frame_ex_cb` a valid function
/// pointer receiving an additional `FrameEx` pointer per frame.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn nvspFrontend_queueIPA_Ex(
    handle: FrontendHandle,
    ipa_utf8: *const c_char,
    speed: c_double,
    base_pitch: c_double,
    inflection: c_double,
    clause_type_utf8: *const c_char,
    user_index_base: c_int,
    frame_ex_cb: Option<FrontendFrameExCallback>,
    user_data: *mut c_void,
) -> c_int {
    catch_ffi(0, AssertUnwindSafe(|| {
        let Some(frontend) = handle.as_mut() else { return 0 };
        let Some(ipa) = cstr_to_str(ipa_utf8) else { return 0 };
        let clause = cstr_to_str(clause_type_utf8).and_then(|s| s.chars().next()).unwrap_or('.');
        let Some(cb) = frame_ex_cb else { return 0 };

        let ok = frontend.queue_ipa(ipa, speed, base_pitch, inflection, clause, user_index_base, |ef| {
            let raw_frame = ef.frame.as_ref().map(RawFrame::from);
            let raw_frame_ex = ef.frame_ex.as_ref().map(RawFrontendFrameEx::from);
            let frame_ptr = raw_frame.as_ref().map(|r| r as *const RawFrame).unwrap_or(ptr::null());
            let frame_ex_ptr = raw_frame_ex.as_ref().map(|r| r as *const RawFrontendFrameEx).unwrap_or(ptr::null());
            cb(user_data, frame_ptr, frame_ex_ptr, ef.duration_ms, ef.fade_ms, ef.user_index);
        });
        ok as c_int
    }))
}

/// # Safety
/// `handle` must be live; `name_utf8` a valid NUL-terminated UTF-8 C
/// string (may be empty to clear back to the pack's default voice).
#[no_mangle]
pub unsafe extern "C" fn nvspFrontend_setVoiceProfile(handle: FrontendHandle, name_utf8: *const c_char) -> c_int {
    catch_ffi(0, AssertUnwindSafe(|| {
        let Some(frontend) = handle.as_mut() else { return 0 };
        let Some(name) = cstr_to_str(name_utf8) else { return 0 };
        frontend.set_voice_profile(name) as c_int
    }))
}

/// # Safety
/// `handle` must be live. Returns an owned, NUL-terminated, `\n`-joined
/// C string the caller must free via whatever allocator-matching
/// convention the host binding documents (here: `CString::into_raw`,
/// reclaimed by the Rust side only — hosts should copy out and never
/// call `free()` on it directly).
#[no_mangle]
pub unsafe extern "C" fn nvspFrontend_getVoiceProfileNames(handle: FrontendHandle) -> *mut c_char {
    catch_ffi(ptr::null_mut(), AssertUnwindSafe(|| {
        let Some(frontend) = handle.as_ref() else { return ptr::null_mut() };
        let names = frontend.voice_profile_names();
        CString::new(names).map(CString::into_raw).unwrap_or(ptr::null_mut())
    }))
}

/// # Safety
/// `ptr` must have been returned by `nvspFrontend_getVoiceProfileNames`
/// (or be null) and must not be used again after this call.
#[no_mangle]
pub unsafe extern "C" fn nvspFrontend_freeString(ptr: *mut c_char) {
    catch_ffi((), AssertUnwindSafe(|| {
        if !ptr.is_null() {
            drop(CString::from_raw(ptr));
        }
    }));
}

/// # Safety
/// `handle` must be live.
#[no_mangle]
pub unsafe extern "C" fn nvspFrontend_setFrameExDefaults(
    handle: FrontendHandle,
    creakiness: c_double,
    breathiness: c_double,
    jitter: c_double,
    shimmer: c_double,
    sharpness: c_double,
) {
    catch_ffi((), AssertUnwindSafe(|| {
        let Some(frontend) = handle.as_mut() else { return };
        frontend.frame_ex_defaults = (creakiness, breathiness, jitter, shimmer, sharpness);
    }));
}

/// # Safety
/// `handle` must be live; `out_tone` must point to a writable `RawVoicingTone`.
#[no_mangle]
pub unsafe extern "C" fn nvspFrontend_getVoicingTone(handle: FrontendHandle, out_tone: *mut RawVoicingTone) -> c_int {
    catch_ffi(0, AssertUnwindSafe(|| {
        let Some(frontend) = handle.as_ref() else { return 0 };
        if out_tone.is_null() {
            return 0;
        }
        let (tone, has_explicit) = frontend.voicing_tone();
        *out_tone = RawVoicingTone::from(&tone);
        has_explicit as c_int
    }))
}

/// # Safety
/// `handle` must be live. Returned pointer is borrowed: valid until the
/// next call into this handle or until `nvspFrontend_destroy`.
#[no_mangle]
pub unsafe extern "C" fn nvspFrontend_getLastError(handle: FrontendHandle) -> *const c_char {
    catch_ffi(ptr::null(), AssertUnwindSafe(|| {
        let Some(frontend) = handle.as_ref() else { return ptr::null() };
        // Leaked once per call; acceptable for an infrequently-polled
        // diagnostic string, and keeps the per-handle struct free of a
        // CString field that would need to outlive `&self` borrows.
        CString::new(frontend.last_error.clone())
            .map(CString::into_raw)
            .unwrap_or(ptr::null_mut()) as *const c_char
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;
    use crate::frontend::pack::{LanguagePack, PhonemeDef};

    fn pack_with_vowel_a() -> PackSet {
        let mut phonemes = StdHashMap::new();
        let mut a = PhonemeDef::default();
        a.key = "a".to_string();
        a.flags.is_vowel = true;
        a.flags.is_voiced = true;
        a.fields.cf1 = Some(800.0);
        a.fields.cf2 = Some(1200.0);
        a.fields.voice_amplitude = Some(0.8);
        phonemes.insert("a".to_string(), a);
        PackSet {
            phonemes,
            sorted_phoneme_keys: vec!["a".into()],
            lang: LanguagePack::default(),
            voice_profiles: Default::default(),
            load_warnings: Vec::new(),
            stress_dict: StdHashMap::new(),
        }
    }

    #[test]
    fn empty_ipa_emits_nothing_and_reports_success() {
        let mut frontend = Frontend::new(PathBuf::from("/nonexistent"));
        frontend.pack = Some(pack_with_vowel_a());
        let mut count = 0;
        let ok = frontend.queue_ipa("", 1.0, 110.0, 0.5, '.', 0, |_ef| count += 1);
        assert!(ok);
        assert_eq!(count, 0);
    }

    #[test]
    fn single_vowel_emits_one_frame_with_expected_formants() {
        let mut frontend = Frontend::new(PathBuf::from("/nonexistent"));
        frontend.pack = Some(pack_with_vowel_a());
        let mut frames = Vec::new();
        let ok = frontend.queue_ipa("a", 1.0, 110.0, 0.5, '.', 0, |ef| frames.push(ef));
        assert!(ok);
        assert_eq!(frames.len(), 1);
        let frame = frames[0].frame.as_ref().unwrap();
        assert!(frame.voice_amplitude > 0.0);
        assert!((frame.cf1 - 800.0).abs() < 1.0);
        assert!((frame.cf2 - 1200.0).abs() < 1.0);
    }

    #[test]
    fn queue_ipa_without_language_set_fails() {
        let mut frontend = Frontend::new(PathBuf::from("/nonexistent"));
        let mut count = 0;
        let ok = frontend.queue_ipa("a", 1.0, 110.0, 0.5, '.', 0, |_ef| count += 1);
        assert!(!ok);
        assert_eq!(count, 0);
        assert!(!frontend.last_error.is_empty());
    }

    #[test]
    fn set_voice_profile_rejects_unknown_name() {
        let mut frontend = Frontend::new(PathBuf::from("/nonexistent"));
        frontend.pack = Some(pack_with_vowel_a());
        assert!(!frontend.set_voice_profile("nonexistent-profile"));
        assert!(!frontend.last_error.is_empty());
    }

    #[test]
    fn get_last_index_via_ffi_lifecycle_round_trips() {
        unsafe {
            let pack_dir = CString::new("/nonexistent").unwrap();
            let handle = nvspFrontend_create(pack_dir.as_ptr());
            assert!(!handle.is_null());
            let lang = CString::new("en").unwrap();
            // No pack on disk, so this should fail cleanly rather than panic.
            assert_eq!(nvspFrontend_setLanguage(handle, lang.as_ptr()), 0);
            let err = nvspFrontend_getLastError(handle);
            assert!(!err.is_null());
            nvspFrontend_freeString(err as *mut c_char);
            nvspFrontend_destroy(handle);
        }
    }
}
