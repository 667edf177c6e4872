//! Self-describing, extensible voice-quality tuning block (spec §6.1,
//! grounded on `original_source/src/voicingTone.h`).

/// `"VOT2"` as a little-endian `u32`, matching
/// `SPEECHPLAYER_VOICINGTONE_MAGIC` in the original header.
pub const VOICING_TONE_MAGIC: u32 = 0x3254_4F56;

/// Current on-disk/ABI layout version of [`VoicingTone`].
pub const VOICING_TONE_STRUCT_VERSION: u32 = 3;

/// DSP algorithm version reported by `speechPlayer_getDspVersion`.
pub const DSP_VERSION: u32 = 6;

/// Voice-quality tuning parameters shared by the glottal source, the
/// resonator banks, and the output high-shelf EQ.
///
/// The first four fields are a self-describing ABI header: a caller that
/// only knows an older `structVersion` can still safely read a prefix of
/// this struct across the C boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct VoicingTone {
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

impl Default for VoicingTone {
    fn default() -> Self {
        VoicingTone {
            magic: VOICING_TONE_MAGIC,
            struct_size: std::mem::size_of::<VoicingTone>() as u32,
            struct_version: VOICING_TONE_STRUCT_VERSION,
            dsp_version: DSP_VERSION,
            voicing_peak_pos: 0.91,
            voiced_pre_emph_a: 0.92,
            voiced_pre_emph_mix: 0.35,
            high_shelf_gain_db: 4.0,
            high_shelf_fc_hz: 2000.0,
            high_shelf_q: 0.7,
            voiced_tilt_db_per_oct: 0.0,
            noise_glottal_mod_depth: 0.0,
            pitch_sync_f1_delta_hz: 0.0,
            pitch_sync_b1_delta_hz: 0.0,
            speed_quotient: 2.0,
            aspiration_tilt_db_per_oct: 0.0,
            cascade_bw_scale: 1.0,
        }
    }
}

impl VoicingTone {
    /// Validate the ABI header before accepting a caller-supplied struct.
    pub fn is_valid_header(&self) -> bool {
        self.magic == VOICING_TONE_MAGIC && self.struct_size as usize >= std::mem::size_of::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let t = VoicingTone::default();
        assert_eq!(t.magic, VOICING_TONE_MAGIC);
        assert_eq!(t.dsp_version, 6);
        assert_eq!(t.speed_quotient, 2.0);
        assert_eq!(t.cascade_bw_scale, 1.0);
    }

    #[test]
    fn header_validation_rejects_bad_magic() {
        let mut t = VoicingTone::default();
        t.magic = 0;
        assert!(!t.is_valid_header());
    }
}
