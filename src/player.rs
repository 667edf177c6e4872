//! `speechPlayer_*` C API façade: the stable core DSP surface (spec §6.1),
//! grounded on `original_source/src/speechPlayer.h`.
//!
//! Mirrors the original's opaque-handle style: callers get a raw pointer
//! from `speechPlayer_initialize` and must pass it back unchanged. All FFI
//! entry points catch panics at the boundary so a bug in the DSP degrades
//! to a safe no-op/error code rather than unwinding across the C ABI.

use std::os::raw::c_int;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use crate::dsp::voicing_tone::VoicingTone;
use crate::dsp::wave_generator::{SpeechWaveGenerator, WaveGenerator};
use crate::frame::{Frame, FrameEx, SampleVal};
use crate::frame_manager::{FrameManager, QueuedFrame};

/// Raw, ABI-stable mirror of `speechPlayer_frame_t` (spec §6.1: "47
/// contiguous 64-bit floats in the order defined in §3").
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawFrame {
    pub voice_pitch: f64,
    pub vibrato_pitch_offset: f64,
    pub vibrato_speed: f64,
    pub voice_turbulence_amplitude: f64,
    pub glottal_open_quotient: f64,
    pub voice_amplitude: f64,
    pub aspiration_amplitude: f64,
    pub cf1: f64,
    pub cf2: f64,
    pub cf3: f64,
    pub cf4: f64,
    pub cf5: f64,
    pub cf6: f64,
    pub cf_n0: f64,
    pub cf_np: f64,
    pub cb1: f64,
    pub cb2: f64,
    pub cb3: f64,
    pub cb4: f64,
    pub cb5: f64,
    pub cb6: f64,
    pub cb_n0: f64,
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
    pub end_voice_pitch: f64,
}

impl From<&RawFrame> for Frame {
    fn from(r: &RawFrame) -> Self {
        Frame {
            voice_pitch: r.voice_pitch,
            end_voice_pitch: r.end_voice_pitch,
            vibrato_pitch_offset: r.vibrato_pitch_offset,
            vibrato_speed: r.vibrato_speed,
            voice_amplitude: r.voice_amplitude,
            aspiration_amplitude: r.aspiration_amplitude,
            voice_turbulence_amplitude: r.voice_turbulence_amplitude,
            glottal_open_quotient: r.glottal_open_quotient,
            cf1: r.cf1,
            cf2: r.cf2,
            cf3: r.cf3,
            cf4: r.cf4,
            cf5: r.cf5,
            cf6: r.cf6,
            cb1: r.cb1,
            cb2: r.cb2,
            cb3: r.cb3,
            cb4: r.cb4,
            cb5: r.cb5,
            cb6: r.cb6,
            cf_n0: r.cf_n0,
            cb_n0: r.cb_n0,
            cf_np: r.cf_np,
            cb_np: r.cb_np,
            ca_np: r.ca_np,
            frication_amplitude: r.frication_amplitude,
            pf1: r.pf1,
            pf2: r.pf2,
            pf3: r.pf3,
            pf4: r.pf4,
            pf5: r.pf5,
            pf6: r.pf6,
            pb1: r.pb1,
            pb2: r.pb2,
            pb3: r.pb3,
            pb4: r.pb4,
            pb5: r.pb5,
            pb6: r.pb6,
            pa1: r.pa1,
            pa2: r.pa2,
            pa3: r.pa3,
            pa4: r.pa4,
            pa5: r.pa5,
            pa6: r.pa6,
            parallel_bypass: r.parallel_bypass,
            pre_formant_gain: r.pre_formant_gain,
            output_gain: r.output_gain,
        }
    }
}

impl From<&Frame> for RawFrame {
    fn from(f: &Frame) -> Self {
        RawFrame {
            voice_pitch: f.voice_pitch,
            vibrato_pitch_offset: f.vibrato_pitch_offset,
            vibrato_speed: f.vibrato_speed,
            voice_turbulence_amplitude: f.voice_turbulence_amplitude,
            glottal_open_quotient: f.glottal_open_quotient,
            voice_amplitude: f.voice_amplitude,
            aspiration_amplitude: f.aspiration_amplitude,
            cf1: f.cf1,
            cf2: f.cf2,
            cf3: f.cf3,
            cf4: f.cf4,
            cf5: f.cf5,
            cf6: f.cf6,
            cf_n0: f.cf_n0,
            cf_np: f.cf_np,
            cb1: f.cb1,
            cb2: f.cb2,
            cb3: f.cb3,
            cb4: f.cb4,
            cb5: f.cb5,
            cb6: f.cb6,
            cb_n0: f.cb_n0,
            cb_np: f.cb_np,
            ca_np: f.ca_np,
            frication_amplitude: f.frication_amplitude,
            pf1: f.pf1,
            pf2: f.pf2,
            pf3: f.pf3,
            pf4: f.pf4,
            pf5: f.pf5,
            pf6: f.pf6,
            pb1: f.pb1,
            pb2: f.pb2,
            pb3: f.pb3,
            pb4: f.pb4,
            pb5: f.pb5,
            pb6: f.pb6,
            pa1: f.pa1,
            pa2: f.pa2,
            pa3: f.pa3,
            pa4: f.pa4,
            pa5: f.pa5,
            pa6: f.pa6,
            parallel_bypass: f.parallel_bypass,
            pre_formant_gain: f.pre_formant_gain,
            output_gain: f.output_gain,
            end_voice_pitch: f.end_voice_pitch,
        }
    }
}

/// Raw mirror of `speechPlayer_frameEx_t`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawFrameEx {
    pub creakiness: f64,
    pub breathiness: f64,
    pub jitter: f64,
    pub shimmer: f64,
}

impl From<&RawFrameEx> for FrameEx {
    fn from(r: &RawFrameEx) -> Self {
        FrameEx {
            creakiness: r.creakiness,
            breathiness: r.breathiness,
            jitter: r.jitter,
            shimmer: r.shimmer,
            ..FrameEx::default()
        }
    }
}

/// Raw mirror of `speechPlayer_voicingTone_t`, header-first so legacy and
/// current layouts can be distinguished by `magic`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawVoicingTone {
    pub magic: u32,
    pub struct_size: u32,
    pub struct_version: u32,
    pub dsp_version: u32,
    pub voicing_peak_pos: f64,
    pub voiced_pre_emph_a: f64,
    pub voiced_pre_emph_mix: f64,
    pub high_shelf_gain_db: f64,
    pub high_shelf_fc_hz: f64,
    pub high_shelf_q: f64,
    pub voiced_tilt_db_per_oct: f64,
    pub noise_glottal_mod_depth: f64,
    pub pitch_sync_f1_delta_hz: f64,
    pub pitch_sync_b1_delta_hz: f64,
    pub speed_quotient: f64,
    pub aspiration_tilt_db_per_oct: f64,
    pub cascade_bw_scale: f64,
}

impl From<&RawVoicingTone> for VoicingTone {
    fn from(r: &RawVoicingTone) -> Self {
        VoicingTone {
            magic: r.magic,
            struct_size: r.struct_size,
            struct_version: r.struct_version,
            dsp_version: r.dsp_version,
            voicing_peak_pos: r.voicing_peak_pos,
            voiced_pre_emph_a: r.voiced_pre_emph_a,
            voiced_pre_emph_mix: r.voiced_pre_emph_mix,
            high_shelf_gain_db: r.high_shelf_gain_db,
            high_shelf_fc_hz: r.high_shelf_fc_hz,
            high_shelf_q: r.high_shelf_q,
            voiced_tilt_db_per_oct: r.voiced_tilt_db_per_oct,
            noise_glottal_mod_depth: r.noise_glottal_mod_depth,
            pitch_sync_f1_delta_hz: r.pitch_sync_f1_delta_hz,
            pitch_sync_b1_delta_hz: r.pitch_sync_b1_delta_hz,
            speed_quotient: r.speed_quotient,
            aspiration_tilt_db_per_oct: r.aspiration_tilt_db_per_oct,
            cascade_bw_scale: r.cascade_bw_scale,
        }
    }
}

impl From<&VoicingTone> for RawVoicingTone {
    fn from(t: &VoicingTone) -> Self {
        RawVoicingTone {
            magic: t.magic,
            struct_size: std::mem::size_of::<RawVoicingTone>() as u32,
            struct_version: t.struct_version,
            dsp_version: t.dsp_version,
            voicing_peak_pos: t.voicing_peak_pos,
            voiced_pre_emph_a: t.voiced_pre_emph_a,
            voiced_pre_emph_mix: t.voiced_pre_emph_mix,
            high_shelf_gain_db: t.high_shelf_gain_db,
            high_shelf_fc_hz: t.high_shelf_fc_hz,
            high_shelf_q: t.high_shelf_q,
            voiced_tilt_db_per_oct: t.voiced_tilt_db_per_oct,
            noise_glottal_mod_depth: t.noise_glottal_mod_depth,
            pitch_sync_f1_delta_hz: t.pitch_sync_f1_delta_hz,
            pitch_sync_b1_delta_hz: t.pitch_sync_b1_delta_hz,
            speed_quotient: t.speed_quotient,
            aspiration_tilt_db_per_oct: t.aspiration_tilt_db_per_oct,
            cascade_bw_scale: t.cascade_bw_scale,
        }
    }
}

/// Owns everything one synthesis handle needs: the frame queue and the
/// DSP wave generator. Safe Rust counterpart of the original's `Player`
/// object behind `speechPlayer_handle_t`.
pub struct SpeechPlayer {
    sample_rate: i32,
    frames: FrameManager,
    wave_gen: SpeechWaveGenerator,
}

impl SpeechPlayer {
    pub fn new(sample_rate: i32) -> Self {
        SpeechPlayer {
            sample_rate,
            frames: FrameManager::new(),
            wave_gen: SpeechWaveGenerator::new(sample_rate),
        }
    }

    pub fn queue_frame(
        &self,
        frame: Option<Frame>,
        frame_ex: Option<FrameEx>,
        min_samples: u32,
        fade_samples: u32,
        user_index: i32,
        purge: bool,
    ) {
        let qf = QueuedFrame {
            frame,
            frame_ex,
            min_samples,
            fade_samples,
            user_index,
        };
        self.frames.queue_frame(qf, purge);
    }

    pub fn synthesize(&mut self, out: &mut [SampleVal]) {
        for slot in out.iter_mut() {
            let (frame, frame_ex, _idx) = self.frames.get_current_frame();
            *slot = self.wave_gen.generate(frame.as_ref(), frame_ex.as_ref());
        }
        if self.frames.check_and_clear_purge_flag() {
            tracing::debug!(sample_rate = self.sample_rate, "frame queue purged during synthesize");
        }
    }

    pub fn get_last_index(&self) -> i32 {
        self.frames.get_last_index()
    }

    pub fn apply_voicing_tone(&mut self, tone: &VoicingTone) {
        self.wave_gen.apply_voicing_tone(tone);
    }
}

/// Opaque handle type exposed to C callers.
pub type SpeechPlayerHandle = *mut SpeechPlayer;

fn catch_ffi<F: FnOnce() -> R + panic::UnwindSafe, R>(default: R, f: F) -> R {
    panic::catch_unwind(f).unwrap_or_else(|_| {
        tracing::warn!("panic caught at speechPlayer FFI boundary, returning default");
        default
    })
}

/// # Safety
/// `sampleRate` must be a positive audio sample rate. The returned handle
/// must eventually be passed to `speechPlayer_terminate` exactly once.
#[no_mangle]
pub unsafe extern "C" fn speechPlayer_initialize(sample_rate: c_int) -> SpeechPlayerHandle {
    catch_ffi(ptr::null_mut(), AssertUnwindSafe(|| {
        if sample_rate <= 0 {
            tracing::warn!(sample_rate, "speechPlayer_initialize rejected non-positive sample rate");
            return ptr::null_mut();
        }
        Box::into_raw(Box::new(SpeechPlayer::new(sample_rate)))
    }))
}

/// # Safety
/// `player_handle` must be a live handle from `speechPlayer_initialize`.
/// `frame_ptr` may be null (NULL-frame silence marker) or must point to a
/// valid `RawFrame`.
#[no_mangle]
pub unsafe extern "C" fn speechPlayer_queueFrame(
    player_handle: SpeechPlayerHandle,
    frame_ptr: *const RawFrame,
    min_frame_duration: u32,
    fade_duration: u32,
    user_index: c_int,
    purge_queue: bool,
) {
    catch_ffi((), AssertUnwindSafe(|| {
        let Some(player) = player_handle.as_ref() else { return };
        let frame = frame_ptr.as_ref().map(Frame::from);
        player.queue_frame(frame, None, min_frame_duration, fade_duration, user_index, purge_queue);
    }));
}

/// # Safety
/// Same as `speechPlayer_queueFrame`, plus `frame_ex_ptr` may be null or
/// must point to at least `frame_ex_size` valid bytes of `RawFrameEx`.
#[no_mangle]
pub unsafe extern "C" fn speechPlayer_queueFrameEx(
    player_handle: SpeechPlayerHandle,
    frame_ptr: *const RawFrame,
    frame_ex_ptr: *const RawFrameEx,
    frame_ex_size: u32,
    min_frame_duration: u32,
    fade_duration: u32,
    user_index: c_int,
    purge_queue: bool,
) {
    catch_ffi((), AssertUnwindSafe(|| {
        let Some(player) = player_handle.as_ref() else { return };
        let frame = frame_ptr.as_ref().map(Frame::from);
        let frame_ex = if frame_ex_size as usize >= std::mem::size_of::<RawFrameEx>() {
            frame_ex_ptr.as_ref().map(FrameEx::from)
        } else {
            None
        };
        player.queue_frame(frame, frame_ex, min_frame_duration, fade_duration, user_index, purge_queue);
    }));
}

/// # Safety
/// `sample_buf` must point to at least `sample_count` writable `SampleVal`
/// slots.
#[no_mangle]
pub unsafe extern "C" fn speechPlayer_synthesize(
    player_handle: SpeechPlayerHandle,
    sample_count: u32,
    sample_buf: *mut SampleVal,
) -> c_int {
    catch_ffi(0, AssertUnwindSafe(|| {
        let Some(player) = player_handle.as_mut() else { return 0 };
        if sample_buf.is_null() || sample_count == 0 {
            return 0;
        }
        let out = std::slice::from_raw_parts_mut(sample_buf, sample_count as usize);
        player.synthesize(out);
        sample_count as c_int
    }))
}

/// # Safety
/// `player_handle` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn speechPlayer_getLastIndex(player_handle: SpeechPlayerHandle) -> c_int {
    catch_ffi(-1, AssertUnwindSafe(|| {
        player_handle.as_ref().map(|p| p.get_last_index()).unwrap_or(-1)
    }))
}

/// # Safety
/// `player_handle` must be a live handle obtained from
/// `speechPlayer_initialize` and must not be used again after this call.
#[no_mangle]
pub unsafe extern "C" fn speechPlayer_terminate(player_handle: SpeechPlayerHandle) {
    catch_ffi((), AssertUnwindSafe(|| {
        if !player_handle.is_null() {
            drop(Box::from_raw(player_handle));
        }
    }));
}

/// # Safety
/// `player_handle` must be live. `tone` may be null to reset to defaults.
#[no_mangle]
pub unsafe extern "C" fn speechPlayer_setVoicingTone(
    player_handle: SpeechPlayerHandle,
    tone: *const RawVoicingTone,
) {
    catch_ffi((), AssertUnwindSafe(|| {
        let Some(player) = player_handle.as_mut() else { return };
        let parsed = tone.as_ref().map(VoicingTone::from).unwrap_or_default();
        player.apply_voicing_tone(&parsed);
    }));
}

/// # Safety
/// `player_handle` must be live; `tone` must point to a writable
/// `RawVoicingTone`.
#[no_mangle]
pub unsafe extern "C" fn speechPlayer_getVoicingTone(
    player_handle: SpeechPlayerHandle,
    tone: *mut RawVoicingTone,
) {
    catch_ffi((), AssertUnwindSafe(|| {
        let Some(player) = player_handle.as_ref() else { return };
        if tone.is_null() {
            return;
        }
        let raw = RawVoicingTone::from(&player.wave_gen.voicing_tone_snapshot());
        *tone = raw;
    }));
}

#[no_mangle]
pub extern "C" fn speechPlayer_getDspVersion() -> u32 {
    crate::dsp::voicing_tone::DSP_VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_rejects_non_positive_sample_rate() {
        let handle = unsafe { speechPlayer_initialize(0) };
        assert!(handle.is_null());
    }

    #[test]
    fn lifecycle_queue_synthesize_terminate_round_trips() {
        unsafe {
            let handle = speechPlayer_initialize(22050);
            assert!(!handle.is_null());

            let mut frame = std::mem::zeroed::<RawFrame>();
            frame.voice_pitch = 120.0;
            frame.voice_amplitude = 0.8;
            frame.cf1 = 500.0;
            frame.cb1 = 60.0;
            frame.cf2 = 1500.0;
            frame.cb2 = 90.0;
            frame.pre_formant_gain = 1.0;
            frame.output_gain = 1.5;

            speechPlayer_queueFrame(handle, &frame, 200, 10, 1, false);

            let mut buf = vec![0i16; 200];
            let written = speechPlayer_synthesize(handle, buf.len() as u32, buf.as_mut_ptr());
            assert_eq!(written, buf.len() as c_int);
            assert_eq!(speechPlayer_getLastIndex(handle), 1);

            speechPlayer_terminate(handle);
        }
    }

    #[test]
    fn dsp_version_is_stable() {
        assert_eq!(speechPlayer_getDspVersion(), 6);
    }
}
