//! Error types for the DSP core and the IPA-to-frame frontend.
//!
//! All user-visible errors are surfaced as explicit `Result`s at API
//! boundaries (see `player` and `frontend::api`); the DSP hot path itself
//! never returns `Result` — invalid parameters are clamped and produce
//! silence instead (spec §7).

use thiserror::Error;

/// Errors raised by the core synthesizer (`SpeechPlayer` / C API layer).
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(i32),
    #[error("frameEx struct size mismatch: caller passed {given} bytes, expected at least {expected}")]
    FrameExSizeMismatch { given: usize, expected: usize },
    #[error("allocation failed: {0}")]
    AllocationFailed(String),
    #[error("unknown player handle")]
    InvalidHandle,
}

pub type PlayerResult<T> = std::result::Result<T, PlayerError>;

/// Errors raised while loading a language pack.
#[derive(Debug, Error)]
pub enum PackError {
    #[error("pack directory not found: {0}")]
    DirectoryNotFound(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed YAML in {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("phoneme table in {0} is empty")]
    EmptyPhonemeTable(String),
    #[error("no pack found for language tag '{0}' (checked 'default' and all hyphen-prefixes)")]
    LanguageTagUnresolved(String),
}

pub type PackResult<T> = std::result::Result<T, PackError>;

/// Errors raised by the IPA-to-frame frontend (`Frontend` / `nvspFrontend_*`).
#[derive(Debug, Error)]
pub enum FrontendError {
    #[error(transparent)]
    Pack(#[from] PackError),
    #[error("no language has been set on this frontend handle")]
    NoLanguageSet,
    #[error("unknown voice profile: {0}")]
    UnknownVoiceProfile(String),
}

pub type FrontendResult<T> = std::result::Result<T, FrontendError>;
