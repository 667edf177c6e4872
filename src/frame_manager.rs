//! FIFO frame queue with sample-accurate crossfading and purge/interrupt
//! semantics (spec §4.5), grounded on `original_source/src/lock.h`'s
//! recursive-mutex discipline and `src/utils.h`'s fade-position helper.

use std::collections::VecDeque;

use parking_lot::ReentrantMutex;
use std::cell::RefCell;

use crate::frame::{AmplitudeTransitionMode, FieldCurve, FieldId, Frame, FrameEx};

/// One entry in the frame queue: `frame = None` means silence
/// (spec §4.5 "NULL-frame contract").
#[derive(Debug, Clone)]
pub struct QueuedFrame {
    pub frame: Option<Frame>,
    pub frame_ex: Option<FrameEx>,
    pub min_samples: u32,
    pub fade_samples: u32,
    pub user_index: i32,
}

impl QueuedFrame {
    pub fn silence(fade_samples: u32, user_index: i32) -> Self {
        QueuedFrame {
            frame: None,
            frame_ex: None,
            min_samples: 1,
            fade_samples: fade_samples.max(1),
            user_index,
        }
    }
}

struct ActiveSlot {
    frame: Option<Frame>,
    frame_ex: Option<FrameEx>,
    samples_remaining: u32,
    user_index: i32,
}

impl ActiveSlot {
    fn silent() -> Self {
        ActiveSlot {
            frame: None,
            frame_ex: None,
            samples_remaining: 0,
            user_index: -1,
        }
    }
}

struct FadeState {
    from: ActiveSlot,
    /// Countdown from `total` to 0 across the fade window.
    remaining: u32,
    total: u32,
}

struct FrameManagerInner {
    queue: VecDeque<QueuedFrame>,
    active: ActiveSlot,
    fade: Option<FadeState>,
    last_index: i32,
    purge_pending: bool,
}

impl FrameManagerInner {
    fn new() -> Self {
        FrameManagerInner {
            queue: VecDeque::new(),
            active: ActiveSlot::silent(),
            fade: None,
            last_index: -1,
            purge_pending: false,
        }
    }

    fn queue_frame(&mut self, mut qf: QueuedFrame, purge: bool) {
        qf.fade_samples = qf.fade_samples.max(1);
        if qf.min_samples == 0 {
            qf.min_samples = 1;
        }
        if purge {
            self.queue.clear();
            self.fade = None;
            self.active = ActiveSlot::silent();
            self.purge_pending = true;
            // Insert a graceful silence marker ahead of the caller's frame
            // so the renderer fades out before the new onset.
            self.queue.push_back(QueuedFrame::silence(qf.fade_samples, qf.user_index));
        }
        self.queue.push_back(qf);
    }

    fn promote_next(&mut self) {
        if let Some(next) = self.queue.pop_front() {
            let from = ActiveSlot {
                frame: self.active.frame,
                frame_ex: self.active.frame_ex,
                samples_remaining: 0,
                user_index: self.active.user_index,
            };
            let fade_total = next.fade_samples.max(1);
            self.fade = Some(FadeState {
                from,
                remaining: fade_total,
                total: fade_total,
            });
            self.active = ActiveSlot {
                frame: next.frame,
                frame_ex: next.frame_ex,
                samples_remaining: next.min_samples.max(1),
                user_index: next.user_index,
            };
        } else {
            // Nothing queued: hold the current frame (no forced silence).
        }
    }

    fn get_current_frame(&mut self) -> (Option<Frame>, Option<FrameEx>, i32) {
        if self.active.samples_remaining == 0 && self.fade.is_none() {
            self.promote_next();
        }

        let (out_frame, out_ex) = match &self.fade {
            Some(fs) if fs.remaining > 0 => {
                let ratio = 1.0 - (fs.remaining as f64 / fs.total as f64);
                blend(&fs.from, &self.active, ratio)
            }
            _ => (self.active.frame, self.active.frame_ex),
        };

        let user_index = self.active.user_index;
        self.last_index = user_index;

        if let Some(fs) = &mut self.fade {
            if fs.remaining > 0 {
                fs.remaining -= 1;
            }
            if fs.remaining == 0 {
                self.fade = None;
            }
        }

        if self.active.samples_remaining > 0 {
            self.active.samples_remaining -= 1;
            if self.active.samples_remaining == 0 && self.fade.is_none() {
                self.promote_next();
            }
        }

        (out_frame, out_ex, user_index)
    }
}

fn ease_in_out(t: f64) -> f64 {
    // Smoothstep S-curve.
    t * t * (3.0 - 2.0 * t)
}

fn attack_release_ratio(t: f64) -> f64 {
    // Slightly faster-than-linear rise, matching an asymmetric
    // attack/release feel without needing direction information here
    // (direction-dependent shaping happens via transAmplitudeMode).
    t.powf(0.85)
}

fn scale_ramp(t: f64, scale: f64) -> f64 {
    if scale >= 1.0 || scale <= 0.0 {
        return t;
    }
    (t / scale).min(1.0)
}

fn blend(from: &ActiveSlot, to: &ActiveSlot, ratio: f64) -> (Option<Frame>, Option<FrameEx>) {
    let (Some(from_frame), Some(to_frame)) = (from.frame, to.frame) else {
        // Either side is silence (NULL-frame contract): keep the non-null
        // side's resonator coefficients and only ramp amplitude/gain to 0.
        return blend_with_silence(from, to, ratio);
    };

    let ex = to.frame_ex.or(from.frame_ex);
    let mut out = Frame::default();
    for id in all_field_ids() {
        let a = from_frame.get(id);
        let b = to_frame.get(id);
        let scale = trans_scale_for(id, ex.as_ref());
        let local_ratio = scale_ramp(ratio, scale);
        let shaped = match id.curve() {
            FieldCurve::Amplitude => {
                if ex.map(|e| e.trans_amplitude_mode) == Some(AmplitudeTransitionMode::EqualPower) {
                    equal_power_ratio(local_ratio)
                } else {
                    attack_release_ratio(local_ratio)
                }
            }
            FieldCurve::FormantFrequency => ease_in_out(local_ratio),
            FieldCurve::FormantBandwidth => ease_in_out((local_ratio + 0.1).min(1.0)),
            FieldCurve::Nasal => ease_in_out(local_ratio * local_ratio),
            FieldCurve::Linear => local_ratio,
        };
        let value = a + (b - a) * shaped;
        out.set(id, value);
    }
    (Some(out), ex)
}

fn blend_with_silence(from: &ActiveSlot, to: &ActiveSlot, ratio: f64) -> (Option<Frame>, Option<FrameEx>) {
    match (from.frame, to.frame) {
        (Some(f), None) => {
            let mut out = f;
            let gain_ratio = 1.0 - attack_release_ratio(ratio);
            out.voice_amplitude *= gain_ratio;
            out.aspiration_amplitude *= gain_ratio;
            out.frication_amplitude *= gain_ratio;
            out.pre_formant_gain *= gain_ratio;
            (Some(out), from.frame_ex)
        }
        (None, Some(f)) => {
            let mut out = f;
            let gain_ratio = attack_release_ratio(ratio);
            out.voice_amplitude *= gain_ratio;
            out.aspiration_amplitude *= gain_ratio;
            out.frication_amplitude *= gain_ratio;
            out.pre_formant_gain *= gain_ratio;
            (Some(out), to.frame_ex)
        }
        (None, None) => (None, None),
        (Some(_), Some(_)) => unreachable!("handled by caller"),
    }
}

fn equal_power_ratio(t: f64) -> f64 {
    (t * std::f64::consts::FRAC_PI_2).sin().powi(2)
}

fn trans_scale_for(id: FieldId, ex: Option<&FrameEx>) -> f64 {
    let Some(ex) = ex else { return 1.0 };
    match id {
        FieldId::Cf1 | FieldId::Cb1 => ex.trans_f1_scale,
        FieldId::Cf2 | FieldId::Cb2 => ex.trans_f2_scale,
        FieldId::Cf3 | FieldId::Cb3 => ex.trans_f3_scale,
        FieldId::CfN0 | FieldId::CbN0 | FieldId::CfNP | FieldId::CbNP | FieldId::CaNP => {
            ex.trans_nasal_scale
        }
        _ => 1.0,
    }
}

fn all_field_ids() -> [FieldId; 47] {
    use FieldId::*;
    [
        VoicePitch,
        EndVoicePitch,
        VibratoPitchOffset,
        VibratoSpeed,
        VoiceAmplitude,
        AspirationAmplitude,
        VoiceTurbulenceAmplitude,
        GlottalOpenQuotient,
        Cf1,
        Cf2,
        Cf3,
        Cf4,
        Cf5,
        Cf6,
        Cb1,
        Cb2,
        Cb3,
        Cb4,
        Cb5,
        Cb6,
        CfN0,
        CbN0,
        CfNP,
        CbNP,
        CaNP,
        FricationAmplitude,
        Pf1,
        Pf2,
        Pf3,
        Pf4,
        Pf5,
        Pf6,
        Pb1,
        Pb2,
        Pb3,
        Pb4,
        Pb5,
        Pb6,
        Pa1,
        Pa2,
        Pa3,
        Pa4,
        Pa5,
        Pa6,
        ParallelBypass,
        PreFormantGain,
        OutputGain,
    ]
}

/// Thread-safe FIFO frame queue. All mutation and reads go through one
/// re-entrant lock (spec §4.5 "Thread safety"): `parking_lot::ReentrantMutex`
/// is the idiomatic match for the original's `std::recursive_mutex`-based
/// `LockableObject` (`original_source/src/lock.h`).
pub struct FrameManager {
    inner: ReentrantMutex<RefCell<FrameManagerInner>>,
}

impl FrameManager {
    pub fn new() -> Self {
        FrameManager {
            inner: ReentrantMutex::new(RefCell::new(FrameManagerInner::new())),
        }
    }

    pub fn queue_frame(&self, qf: QueuedFrame, purge: bool) {
        let guard = self.inner.lock();
        guard.borrow_mut().queue_frame(qf, purge);
    }

    /// Advance by one sample and return `(frame, frameEx, userIndex)`.
    pub fn get_current_frame(&self) -> (Option<Frame>, Option<FrameEx>, i32) {
        let guard = self.inner.lock();
        guard.borrow_mut().get_current_frame()
    }

    pub fn get_last_index(&self) -> i32 {
        let guard = self.inner.lock();
        guard.borrow().last_index
    }

    /// Observe and clear the one-shot purge flag.
    pub fn check_and_clear_purge_flag(&self) -> bool {
        let guard = self.inner.lock();
        let mut state = guard.borrow_mut();
        let was = state.purge_pending;
        state.purge_pending = false;
        was
    }
}

impl Default for FrameManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vowel() -> Frame {
        let mut f = Frame::default();
        f.voice_pitch = 100.0;
        f.cf1 = 500.0;
        f
    }

    #[test]
    fn queue_then_drain_yields_frame_in_order() {
        let fm = FrameManager::new();
        fm.queue_frame(
            QueuedFrame {
                frame: Some(vowel()),
                frame_ex: None,
                min_samples: 10,
                fade_samples: 1,
                user_index: 7,
            },
            false,
        );
        let (frame, _, idx) = fm.get_current_frame();
        assert!(frame.is_some());
        assert_eq!(idx, 7);
    }

    #[test]
    fn purge_inserts_graceful_silence_and_clears_queue() {
        let fm = FrameManager::new();
        fm.queue_frame(
            QueuedFrame {
                frame: Some(vowel()),
                frame_ex: None,
                min_samples: 10,
                fade_samples: 5,
                user_index: 1,
            },
            false,
        );
        fm.queue_frame(
            QueuedFrame {
                frame: Some(vowel()),
                frame_ex: None,
                min_samples: 10,
                fade_samples: 5,
                user_index: 2,
            },
            true,
        );
        assert!(fm.check_and_clear_purge_flag());
        assert!(!fm.check_and_clear_purge_flag());
    }

    #[test]
    fn null_frame_ramps_gain_to_zero_preserving_coefficients() {
        let fm = FrameManager::new();
        fm.queue_frame(
            QueuedFrame {
                frame: Some(vowel()),
                frame_ex: None,
                min_samples: 5,
                fade_samples: 1,
                user_index: 1,
            },
            false,
        );
        fm.queue_frame(QueuedFrame::silence(8, 2), false);
        let mut saw_cf1 = false;
        for _ in 0..20 {
            let (frame, _, _) = fm.get_current_frame();
            if let Some(f) = frame {
                if f.cf1 > 0.0 {
                    saw_cf1 = true;
                }
            }
        }
        assert!(saw_cf1);
    }

    #[test]
    fn fade_sample_counts_below_one_are_clamped() {
        let qf = QueuedFrame {
            frame: Some(vowel()),
            frame_ex: None,
            min_samples: 0,
            fade_samples: 0,
            user_index: 0,
        };
        let fm = FrameManager::new();
        fm.queue_frame(qf, false);
        let (frame, _, _) = fm.get_current_frame();
        assert!(frame.is_some());
    }
}
