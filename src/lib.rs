pub mod dsp;
pub mod effect; // Effect units and the realtime effect chain
pub mod engine;
pub mod error;
pub mod instrument; // Per-note instruments (feedback synth, unison oscillators)
pub mod note;
pub mod params; // Lock-free parameters and settings persistence

pub use engine::{EngineConfig, EngineContext};
pub use error::{Error, Result};

pub const MAX_BLOCK_SIZE: usize = 2048;

/// One stereo sample: `[left, right]`.
pub type Frame = [f32; 2];
