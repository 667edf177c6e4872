//! IPA-to-frame frontend (spec §4.6-§4.9, §6.2): language packs, IPA
//! normalization, tokenization, prosody, frame emission, and the
//! `nvspFrontend_*` C API built on top of them.

pub mod api;
pub mod frame_emitter;
pub mod ipa_normalizer;
pub mod pack;
pub mod prosody;
pub mod token;
pub mod voice_profile;

pub use api::Frontend;
