use std::f32::consts::{LN_2, TAU};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Frame;

/*
Cookbook Biquads with Period Crossfade
======================================

| stage       | width parameter    | gain      | passes               |
| ----------- | ------------------ | --------- | -------------------- |
| high-pass   | Q (resonance)      | ignored   | above cutoff         |
| low-pass    | Q (resonance)      | ignored   | below cutoff         |
| low shelf   | Q (shelf slope)    | dB        | boost/cut below freq |
| high shelf  | Q (shelf slope)    | dB        | boost/cut above freq |
| peak        | bandwidth (octave) | dB        | boost/cut around freq|

Every stage is a direct-form-I biquad:

    y[n] = b0·x[n] + b1·x[n-1] + b2·x[n-2] - a1·y[n-1] - a2·y[n-2]

with coefficients normalized so a0 = 1.


Click-free parameter changes
----------------------------

Parameters arrive once per period. Swapping coefficients mid-signal makes an
audible step, so a `FilterStage` runs TWO biquads over the same input:

    initial  ── coefficients in force at the start of the period
    target   ── coefficients most recently set

    out = (1 - p) · y_initial + p · y_target        p = period progress 0..1

When p reaches 1 the target (coefficients AND history) is copied into the
initial slot, so the next period starts from where this one ended. For a
fixed input the output is a convex blend of the two responses and can never
overshoot either of them.
*/

/// Progress at which the target filter is promoted to the initial slot.
const PROMOTE_PROGRESS: f32 = 0.99999;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    HighPass,
    LowPass,
    LowShelf,
    HighShelf,
    Peak,
}

impl StageKind {
    /// Pass stages run at unity gain whatever gain they are handed.
    #[inline]
    pub fn uses_gain(self) -> bool {
        !matches!(self, StageKind::HighPass | StageKind::LowPass)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl Coefficients {
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Design a cookbook biquad.
    ///
    /// `width` is Q for pass and shelf stages and bandwidth in octaves for
    /// peak stages. The caller keeps `freq` inside (0, nyquist) and `width`
    /// positive.
    pub fn design(kind: StageKind, sample_rate: f32, freq: f32, width: f32, gain_db: f32) -> Self {
        let w0 = TAU * freq / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let a = if kind.uses_gain() {
            10.0f32.powf(gain_db / 40.0)
        } else {
            1.0
        };

        let (b0, b1, b2, a0, a1, a2) = match kind {
            StageKind::LowPass => {
                let alpha = sin_w0 / (2.0 * width);
                let b1 = 1.0 - cos_w0;
                (
                    b1 * 0.5,
                    b1,
                    b1 * 0.5,
                    1.0 + alpha,
                    -2.0 * cos_w0,
                    1.0 - alpha,
                )
            }
            StageKind::HighPass => {
                let alpha = sin_w0 / (2.0 * width);
                let b1 = 1.0 + cos_w0;
                (
                    b1 * 0.5,
                    -b1,
                    b1 * 0.5,
                    1.0 + alpha,
                    -2.0 * cos_w0,
                    1.0 - alpha,
                )
            }
            StageKind::Peak => {
                let alpha = sin_w0 * (LN_2 / 2.0 * width * w0 / sin_w0).sinh();
                (
                    1.0 + alpha * a,
                    -2.0 * cos_w0,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_w0,
                    1.0 - alpha / a,
                )
            }
            StageKind::LowShelf => {
                let beta = a.sqrt() * sin_w0 / width;
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 + beta),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 - beta),
                    (a + 1.0) + (a - 1.0) * cos_w0 + beta,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                    (a + 1.0) + (a - 1.0) * cos_w0 - beta,
                )
            }
            StageKind::HighShelf => {
                let beta = a.sqrt() * sin_w0 / width;
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 + beta),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 - beta),
                    (a + 1.0) - (a - 1.0) * cos_w0 + beta,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                    (a + 1.0) - (a - 1.0) * cos_w0 - beta,
                )
            }
        };

        let inv_a0 = 1.0 / a0;
        Self {
            b0: b0 * inv_a0,
            b1: b1 * inv_a0,
            b2: b2 * inv_a0,
            a1: a1 * inv_a0,
            a2: a2 * inv_a0,
        }
    }

    /// Gain at DC, handy for checking steady-state behaviour.
    pub fn dc_gain(&self) -> f32 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }
}

/// A single biquad with independent left/right history.
#[derive(Debug, Clone, Copy)]
pub struct Biquad {
    coeffs: Coefficients,
    x1: Frame,
    x2: Frame,
    y1: Frame,
    y2: Frame,
}

impl Biquad {
    pub fn new(coeffs: Coefficients) -> Self {
        Self {
            coeffs,
            x1: [0.0; 2],
            x2: [0.0; 2],
            y1: [0.0; 2],
            y2: [0.0; 2],
        }
    }

    pub fn set_coefficients(&mut self, coeffs: Coefficients) {
        self.coeffs = coeffs;
    }

    pub fn coefficients(&self) -> Coefficients {
        self.coeffs
    }

    #[inline]
    pub fn next_sample(&mut self, sample: f32, channel: usize) -> f32 {
        let c = &self.coeffs;
        let out = c.b0 * sample + c.b1 * self.x1[channel] + c.b2 * self.x2[channel]
            - c.a1 * self.y1[channel]
            - c.a2 * self.y2[channel];

        self.x2[channel] = self.x1[channel];
        self.x1[channel] = sample;
        self.y2[channel] = self.y1[channel];
        self.y1[channel] = out;

        out
    }

    pub fn reset(&mut self) {
        self.x1 = [0.0; 2];
        self.x2 = [0.0; 2];
        self.y1 = [0.0; 2];
        self.y2 = [0.0; 2];
    }
}

/// The last parameter set a stage was designed from.
#[derive(Debug, Clone, Copy, PartialEq)]
struct DesignParams {
    sample_rate: f32,
    freq: f32,
    width: f32,
    gain: f32,
}

/// One filter-bank stage: a biquad pair crossfaded across each period.
#[derive(Debug, Clone)]
pub struct FilterStage {
    kind: StageKind,
    initial: Biquad,
    target: Biquad,
    params: Option<DesignParams>,
}

impl FilterStage {
    pub fn new(kind: StageKind) -> Self {
        Self {
            kind,
            initial: Biquad::new(Coefficients::IDENTITY),
            target: Biquad::new(Coefficients::IDENTITY),
            params: None,
        }
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    /// Recompute the target coefficients.
    ///
    /// Repeated calls with unchanged values are free. The very first call
    /// primes both halves so a fresh stage does not sweep in from identity.
    pub fn set_parameters(&mut self, sample_rate: f32, freq: f32, width: f32, gain: f32) {
        let gain = if self.kind.uses_gain() { gain } else { 1.0 };
        let next = DesignParams {
            sample_rate,
            freq,
            width,
            gain,
        };
        if self.params == Some(next) {
            return;
        }

        let coeffs = Coefficients::design(self.kind, sample_rate, freq, width, gain);
        if self.params.is_none() {
            self.initial.set_coefficients(coeffs);
        }
        self.target.set_coefficients(coeffs);
        self.params = Some(next);
    }

    /// Filter one sample of `channel` at `progress` through the current period.
    #[inline]
    pub fn update(&mut self, sample: f32, channel: usize, progress: f32) -> f32 {
        let initial = self.initial.next_sample(sample, channel);
        let target = self.target.next_sample(sample, channel);

        if progress > PROMOTE_PROGRESS {
            self.initial = self.target;
        }

        initial * (1.0 - progress) + target * progress
    }

    pub fn reset(&mut self) {
        self.initial.reset();
        self.target.reset();
    }
}
