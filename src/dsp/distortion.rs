//! Envelope-Following Distortion
//!
//! Power-law waveshaping whose character is steered by the signal's own
//! envelope.
//!
//! # Power-Law Shaping
//!
//! Each sample is raised to a power while keeping its sign:
//!   shaped = sign(x) · |x|^ratio
//!
//!   ratio = 1.0   Clean, the signal passes untouched
//!   ratio < 1.0   Quiet parts are lifted toward full scale: the waveform
//!                 squares off and gains odd harmonics
//!
//! # Envelope Compensation
//!
//! Lifting quiet parts also lifts the noise floor and makes decays sound
//! "stuck". Multiplying by the envelope raised to the missing exponent puts
//! the dynamics back:
//!   out = shaped · env^((1 - ratio) · amount)
//!
//! With amount = 1 a steady sine at level L comes out at level L again, only
//! with the shaped timbre. With amount = 0 the dynamics stay flattened.
//!
//! # The Follower
//!
//! The envelope moves toward the detected level linearly, at most
//! `delta / time_in_frames` per sample. When the remaining distance is small
//! enough that the slew would overshoot, it snaps straight onto the level.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Frame;

/// Sign-preserving power: `sign(x) · |x|^exponent`.
#[inline]
pub fn signed_pow(sample: f32, exponent: f32) -> f32 {
    let magnitude = sample.abs().powf(exponent);
    if sample < 0.0 {
        -magnitude
    } else {
        magnitude
    }
}

/// How the follower measures a stereo frame.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectorMode {
    /// sqrt((l² + r²) / 2)
    #[default]
    Rms,
    /// max(|l|, |r|)
    Peak,
}

impl DetectorMode {
    /// Stored integer to mode. Anything other than 0 is peak.
    pub fn from_index(index: i32) -> Self {
        if index == 0 {
            DetectorMode::Rms
        } else {
            DetectorMode::Peak
        }
    }

    #[inline]
    pub fn level(self, frame: Frame) -> f32 {
        match self {
            DetectorMode::Rms => ((frame[0] * frame[0] + frame[1] * frame[1]) / 2.0).sqrt(),
            DetectorMode::Peak => frame[0].abs().max(frame[1].abs()),
        }
    }
}

/// Linear-slew envelope follower.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeFollower {
    level: f32,
}

impl EnvelopeFollower {
    pub fn new() -> Self {
        Self { level: 0.0 }
    }

    #[inline]
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Move toward `target`. Attack and release are lengths in frames; a zero
    /// length jumps straight to the target.
    #[inline]
    pub fn follow(&mut self, target: f32, attack_frames: f32, release_frames: f32) -> f32 {
        let delta = target - self.level;
        let frames = if delta > 0.0 {
            attack_frames
        } else {
            release_frames
        };

        self.level = if delta.abs() * frames > self.level {
            self.level + delta / frames
        } else {
            target
        };
        self.level
    }

    pub fn reset(&mut self) {
        self.level = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn signed_pow_keeps_sign() {
        assert_abs_diff_eq!(signed_pow(0.25, 0.5), 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(signed_pow(-0.25, 0.5), -0.5, epsilon = 1e-6);
        assert_eq!(signed_pow(0.0, 0.3), 0.0);
    }

    #[test]
    fn unity_ratio_is_identity() {
        for x in [-0.9, -0.1, 0.0, 0.3, 1.0] {
            assert_abs_diff_eq!(signed_pow(x, 1.0), x, epsilon = 1e-7);
        }
    }

    #[test]
    fn detector_modes() {
        let frame = [0.6, -0.8];
        assert_abs_diff_eq!(DetectorMode::Peak.level(frame), 0.8, epsilon = 1e-6);
        assert_abs_diff_eq!(
            DetectorMode::Rms.level(frame),
            ((0.36f32 + 0.64) / 2.0).sqrt(),
            epsilon = 1e-6
        );
        assert_eq!(DetectorMode::from_index(0), DetectorMode::Rms);
        assert_eq!(DetectorMode::from_index(1), DetectorMode::Peak);
        assert_eq!(DetectorMode::from_index(2), DetectorMode::Peak);
    }

    #[test]
    fn follower_rises_linearly_then_snaps() {
        let mut follower = EnvelopeFollower::new();
        assert_abs_diff_eq!(follower.follow(1.0, 100.0, 100.0), 0.01, epsilon = 1e-7);

        // Close to the target the slew would overshoot, so it lands exactly.
        let mut follower = EnvelopeFollower { level: 0.999 };
        assert_eq!(follower.follow(1.0, 2.0, 2.0), 1.0);

        let mut follower = EnvelopeFollower { level: 0.5 };
        let next = follower.follow(1.0, 100.0, 100.0);
        assert_abs_diff_eq!(next, 0.505, epsilon = 1e-6);
    }

    #[test]
    fn follower_releases_gradually() {
        let mut follower = EnvelopeFollower { level: 1.0 };
        let mut previous = 1.0;
        for _ in 0..50 {
            let level = follower.follow(0.0, 10.0, 100.0);
            assert!(level < previous);
            previous = level;
        }
        assert!(previous > 0.4, "release was too fast: {}", previous);
    }

    #[test]
    fn zero_times_jump_to_target() {
        let mut follower = EnvelopeFollower { level: 0.2 };
        assert_eq!(follower.follow(0.9, 0.0, 0.0), 0.9);
        assert_eq!(follower.follow(0.1, 0.0, 0.0), 0.1);
    }
}
