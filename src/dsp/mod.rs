//! Sample-rate driven DSP core: resonators, glottal source, noise, pitch
//! modeling and the cascade/parallel resonator banks they compose into.

pub mod cascade;
pub mod filters;
pub mod glottal;
pub mod noise;
pub mod parallel;
pub mod pitch_model;
pub mod resonator;
pub mod voicing_tone;
pub mod wave_generator;

/// `2 * PI`, as `dspCommon.h`'s `PITWO` constant.
pub const TWO_PI: f64 = std::f64::consts::PI * 2.0;
