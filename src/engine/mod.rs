//! Processing context shared by every instrument and effect call.
//!
//! There is no process-wide engine state: the host builds one
//! [`EngineContext`] from an [`EngineConfig`] and passes it by reference into
//! `play_note` / `process_audio_buffer`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result, MAX_BLOCK_SIZE};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f32,
    /// Nominal period length. Individual calls may render fewer frames.
    pub frames_per_period: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100.0,
            frames_per_period: 256,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EngineContext {
    sample_rate: f32,
    frames_per_period: usize,
}

impl EngineContext {
    pub fn new(config: EngineConfig) -> Result<Self> {
        if !(config.sample_rate.is_finite() && config.sample_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "sample rate must be positive, got {}",
                config.sample_rate
            )));
        }
        if config.frames_per_period == 0 || config.frames_per_period > MAX_BLOCK_SIZE {
            return Err(Error::InvalidConfig(format!(
                "frames per period must be in 1..={MAX_BLOCK_SIZE}, got {}",
                config.frames_per_period
            )));
        }

        debug!(
            sample_rate = config.sample_rate,
            frames_per_period = config.frames_per_period,
            "engine context created"
        );

        Ok(Self {
            sample_rate: config.sample_rate,
            frames_per_period: config.frames_per_period,
        })
    }

    #[inline]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    #[inline]
    pub fn frames_per_period(&self) -> usize {
        self.frames_per_period
    }

    /// Milliseconds to frames at the current sample rate (fractional).
    #[inline]
    pub fn ms_to_frames(&self, ms: f32) -> f32 {
        ms * self.sample_rate / 1000.0
    }
}
