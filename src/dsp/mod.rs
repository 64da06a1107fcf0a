//! Low-level DSP primitives used by the instruments and effects.
//!
//! These components never allocate after construction and are safe to run on
//! the audio thread. They stay focused on the signal-processing math; the
//! instrument and effect modules layer parameters and note lifecycle on top.

/// Stereo ring buffer used as a feedback delay line.
pub mod delay;
/// Power-law shaping and the envelope follower behind DistEnv.
pub mod distortion;
/// Linear attack/decay/sustain/release envelope generator.
pub mod envelope;
/// Cookbook biquads with per-period coefficient crossfading.
pub mod filter;
/// Frame-level mixing, level measurement and sanitizing.
pub mod mix;
/// Seeded white noise.
pub mod noise;
/// Waveform shapes, modulation algorithms and phase accumulators.
pub mod oscillator;

pub use delay::RingBuffer;
pub use envelope::{Envelope, EnvelopeStage};
pub use filter::{FilterStage, StageKind};
pub use noise::NoiseSource;
