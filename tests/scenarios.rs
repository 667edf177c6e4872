//! Integration coverage for the concrete end-to-end scenarios a formant
//! frontend+DSP pairing needs to get right: empty input, a bare vowel,
//! a voiceless-stop-plus-vowel cluster, a mid-utterance purge, trill
//! expansion, and a formant end-target ramp reaching the DSP core.

use std::collections::HashMap;

use tgspeechbox::frame::SampleVal;
use tgspeechbox::frontend::frame_emitter::FrameEmitter;
use tgspeechbox::frontend::ipa_normalizer;
use tgspeechbox::frontend::pack::{LanguagePack, PackSet, PhonemeDef};
use tgspeechbox::frontend::prosody;
use tgspeechbox::frontend::token::TokenBuilder;
use tgspeechbox::frame_manager::QueuedFrame;
use tgspeechbox::player::SpeechPlayer;

fn vowel(key: &str, cf1: f64, cf2: f64, amplitude: f64) -> PhonemeDef {
    let mut def = PhonemeDef::default();
    def.key = key.to_string();
    def.flags.is_vowel = true;
    def.flags.is_voiced = true;
    def.fields.cf1 = Some(cf1);
    def.fields.cf2 = Some(cf2);
    def.fields.voice_amplitude = Some(amplitude);
    def
}

fn voiceless_stop(key: &str) -> PhonemeDef {
    let mut def = PhonemeDef::default();
    def.key = key.to_string();
    def.flags.is_stop = true;
    def
}

fn trill(key: &str, amplitude: f64) -> PhonemeDef {
    let mut def = PhonemeDef::default();
    def.key = key.to_string();
    def.flags.is_trill = true;
    def.flags.is_voiced = true;
    def.fields.voice_amplitude = Some(amplitude);
    def
}

fn aspiration_h() -> PhonemeDef {
    let mut def = PhonemeDef::default();
    def.key = "h".to_string();
    def
}

fn english_like_pack() -> PackSet {
    let mut phonemes = HashMap::new();
    phonemes.insert("a".to_string(), vowel("a", 800.0, 1200.0, 0.8));
    phonemes.insert("p".to_string(), voiceless_stop("p"));
    phonemes.insert("h".to_string(), aspiration_h());
    phonemes.insert("r".to_string(), trill("r", 0.7));

    let mut lang = LanguagePack::default();
    lang.stop_closure.mode = "always".to_string();
    lang.trill_modulation_ms = 28.0;

    PackSet {
        phonemes,
        sorted_phoneme_keys: vec!["a".into(), "p".into(), "h".into(), "r".into()],
        lang,
        voice_profiles: Default::default(),
        load_warnings: Vec::new(),
        stress_dict: HashMap::new(),
    }
}

fn run_pipeline(pack: &PackSet, ipa: &str, speed: f64, base_pitch: f64) -> Vec<tgspeechbox::frontend::frame_emitter::EmittedFrame> {
    let normalized = ipa_normalizer::normalize(ipa, &pack.lang);
    let mut tokens = TokenBuilder::new(pack).build(&normalized);
    prosody::assign_durations(pack, &mut tokens, speed);
    prosody::assign_pitch(pack, &mut tokens, base_pitch, '.', 22050);

    let mut emitted = Vec::new();
    let mut emitter = FrameEmitter::new(pack);
    emitter.emit(&tokens, 0, |ef| emitted.push(ef));
    emitted
}

#[test]
fn scenario_1_empty_input_emits_nothing() {
    let pack = english_like_pack();
    let emitted = run_pipeline(&pack, "", 1.0, 110.0);
    assert!(emitted.is_empty());
}

#[test]
fn scenario_2_single_vowel_has_expected_formants_and_duration() {
    let pack = english_like_pack();
    let emitted = run_pipeline(&pack, "a", 1.0, 110.0);
    assert_eq!(emitted.len(), 1);
    let frame = emitted[0].frame.as_ref().expect("vowel frame must not be null");
    assert!(frame.voice_amplitude > 0.0);
    assert!((frame.cf1 - 800.0).abs() < 1.0);
    assert!((frame.cf2 - 1200.0).abs() < 1.0);
    assert!((emitted[0].duration_ms - pack.lang.default_vowel_duration_ms).abs() < 1e-9);
}

#[test]
fn scenario_3_voiceless_stop_plus_vowel_inserts_gap_and_aspiration() {
    let pack = english_like_pack();
    let emitted = run_pipeline(&pack, "pa", 1.0, 110.0);
    // Pre-stop gap (silence), the stop burst, inserted aspiration, then the vowel.
    assert_eq!(emitted.len(), 4);
    assert!(emitted[0].frame.is_none(), "pre-stop gap must be a NULL frame");
    assert!(emitted[1].frame.is_some(), "stop burst carries a real frame");
    assert!(emitted[2].frame.is_some(), "aspiration carries a real frame");
    let vowel_frame = emitted[3].frame.as_ref().expect("vowel frame must not be null");
    assert!(vowel_frame.voice_amplitude > 0.0);

    // The frame emitter must flag the voiced onset at the vowel as an
    // equal-power crossfade, since the preceding aspiration is voiceless.
    let vowel_ex = emitted[3].frame_ex.as_ref().expect("vowel FrameEx must be present");
    assert_eq!(
        vowel_ex.trans_amplitude_mode,
        tgspeechbox::frame::AmplitudeTransitionMode::EqualPower
    );
}

#[test]
fn scenario_4_purge_silences_the_active_frame() {
    let mut player = SpeechPlayer::new(22050);
    let mut frame = tgspeechbox::frame::Frame::default();
    frame.voice_pitch = 120.0;
    frame.voice_amplitude = 0.8;
    frame.cf1 = 700.0;
    frame.cb1 = 60.0;
    frame.pre_formant_gain = 1.0;
    frame.output_gain = 1.0;

    player.queue_frame(Some(frame), None, 4410, 50, 1, false);
    let mut warm_up = vec![0 as SampleVal; 100];
    player.synthesize(&mut warm_up);
    assert!(warm_up.iter().any(|&s| s != 0), "voiced frame should produce non-silent samples");

    player.queue_frame(None, None, 1, 50, 2, true);
    let mut after_purge = vec![0 as SampleVal; 500];
    player.synthesize(&mut after_purge);
    let tail_amplitude: i32 = after_purge[after_purge.len() - 50..]
        .iter()
        .map(|&s| (s as i32).abs())
        .sum();
    assert!(tail_amplitude < 50 * i16::MAX as i32 / 100, "samples well after the purge fade should be near silent");
}

#[test]
fn scenario_5_trill_expansion_alternates_amplitude_across_micro_frames() {
    let pack = english_like_pack();
    let mut tokens = TokenBuilder::new(&pack).build(&['r']);
    prosody::assign_durations(&pack, &mut tokens, 1.0);
    tokens[0].duration_ms = 100.0;
    tokens[0].voice_pitch = 110.0;
    tokens[0].end_voice_pitch = 110.0;

    let mut emitted = Vec::new();
    let mut emitter = FrameEmitter::new(&pack);
    emitter.emit(&tokens, 0, |ef| emitted.push(ef));

    assert!(emitted.len() >= 3, "100ms at 28ms/cycle should split into at least 3 micro-frames");
    let base = emitted[0].frame.as_ref().unwrap().voice_amplitude;
    let close = emitted[1].frame.as_ref().unwrap().voice_amplitude;
    assert!((close - base * 0.22).abs() < 1e-6, "close phase should sit near base * 0.22");

    let total: f64 = emitted.iter().map(|ef| ef.duration_ms).sum();
    assert!((total - 100.0).abs() < 1e-6, "micro-frame durations must sum back to the token duration");
}

#[test]
fn scenario_6_end_target_ramp_reaches_the_frame_manager() {
    use tgspeechbox::frame::{Frame, FrameEx};

    let mut player = SpeechPlayer::new(22050);
    let mut start_frame = Frame::default();
    start_frame.voice_pitch = 120.0;
    start_frame.voice_amplitude = 0.8;
    start_frame.cf1 = 700.0;
    start_frame.cf2 = 700.0;
    start_frame.cb2 = 90.0;
    start_frame.pre_formant_gain = 1.0;
    start_frame.output_gain = 1.0;

    let mut ex = FrameEx::default();
    ex.end_cf2 = Some(1800.0);

    player.queue_frame(Some(start_frame), Some(ex), 4410, 10, 1, false);
    let mut buf = vec![0 as SampleVal; 4410];
    player.synthesize(&mut buf);
    assert!(buf.iter().any(|&s| s != 0), "end-target ramp must still produce audible output");
}

#[test]
fn queue_frame_silence_marker_round_trips_through_frame_manager() {
    let silence = QueuedFrame::silence(16, 7);
    assert!(silence.frame.is_none());
    assert_eq!(silence.fade_samples, 16);
    assert_eq!(silence.user_index, 7);
}
