//! # tgspeechbox
//!
//! A Klatt-style cascade/parallel formant synthesizer core, driven by an
//! LF-inspired glottal source, paired with a language-pack-driven
//! IPA-to-frame frontend.
//!
//! The crate is split into two independently usable layers:
//!
//! - [`player`] / [`dsp`] / [`frame`] / [`frame_manager`]: the stable core
//!   DSP — a 47-field `Frame` drives a cascade/parallel resonator bank one
//!   sample at a time, queued and crossfaded by a re-entrant-locked frame
//!   manager. Exposed to C callers via `speechPlayer_*` (spec §6.1).
//! - [`frontend`]: turns IPA text into the `Frame`/`FrameEx` sequence the
//!   DSP core consumes — normalization, tokenization, timing and pitch
//!   assignment, and frame emission, driven by a YAML language pack.
//!   Exposed to C callers via `nvspFrontend_*` (spec §6.2).
//!
//! ## Quick Start
//!
//! ```no_run
//! use tgspeechbox::player::SpeechPlayer;
//!
//! let mut player = SpeechPlayer::new(22050);
//! let mut out = vec![0i16; 22050];
//! player.synthesize(&mut out); // silence: nothing queued yet
//! ```
//!
//! Driving the frontend directly (no FFI) looks like:
//!
//! ```no_run
//! use std::path::Path;
//! use tgspeechbox::frontend::pack::load_pack_set;
//! use tgspeechbox::frontend::token::TokenBuilder;
//! use tgspeechbox::frontend::{ipa_normalizer, prosody, frame_emitter::FrameEmitter};
//!
//! # fn run() -> Result<(), tgspeechbox::error::PackError> {
//! let pack = load_pack_set(Path::new("packs"), "en")?;
//! let normalized = ipa_normalizer::normalize("hˈɛloʊ", &pack.lang);
//! let mut tokens = TokenBuilder::new(&pack).build(&normalized);
//! prosody::assign_durations(&pack, &mut tokens, 1.0);
//! prosody::assign_pitch(&pack, &mut tokens, 110.0, '.', 22050);
//!
//! let mut emitter = FrameEmitter::new(&pack);
//! emitter.emit(&tokens, 0, |emitted| {
//!     let _ = emitted; // hand off to SpeechPlayer::queue_frame
//! });
//! # Ok(())
//! # }
//! ```

pub mod dsp;
pub mod error;
pub mod frame;
pub mod frame_manager;
pub mod frontend;
pub mod player;

pub use error::{FrontendError, FrontendResult, PackError, PackResult, PlayerError, PlayerResult};
pub use frame::{AmplitudeTransitionMode, FieldId, Frame, FrameEx, SampleVal};
pub use frontend::Frontend;
pub use player::{SpeechPlayer, SpeechPlayerHandle};
