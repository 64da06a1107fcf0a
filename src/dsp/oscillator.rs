use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::noise::NoiseSource;

/*
Phase-Driven Waveforms
======================

Every shape here is a pure function of a phase in cycles. The integer part of
the phase is ignored, so callers may let it grow and wrap it whenever
convenient.

    sine         sin(2π·ph)
    triangle     4ph            ph ≤ 0.25
                 2 - 4ph        ph ≤ 0.75
                 4ph - 4        otherwise
    saw          -1 + 2ph
    square       1 for ph ≤ 0.5, -1 after
    moog saw     -1 + 4ph for ph < 0.5, 1 - 2ph after
    exponential  fold ph > 0.5 back to 1 - ph, then -1 + 8ph²
    white noise  uniform in [-1, 1), phase ignored
    user         linear interpolation through a host-supplied table

Modulation
----------

An oscillator may be driven by a second ("sub") oscillator. How the sub's
output `m` is combined with the carrier `c(ph)`:

    phase mod      out = c(ph + m)
    amplitude mod  out = m · c(ph)
    signal mix     out = m + c(ph)
    sync           the carrier's phase restarts whenever the sub wraps
    frequency mod  ph += m · 44100 / sample_rate, then out = c(ph)
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaveShape {
    #[default]
    Sine,
    Triangle,
    Saw,
    Square,
    MoogSaw,
    Exponential,
    WhiteNoise,
    UserDefined,
}

impl WaveShape {
    pub const ALL: [WaveShape; 8] = [
        WaveShape::Sine,
        WaveShape::Triangle,
        WaveShape::Saw,
        WaveShape::Square,
        WaveShape::MoogSaw,
        WaveShape::Exponential,
        WaveShape::WhiteNoise,
        WaveShape::UserDefined,
    ];

    /// Map a stored integer back to a shape, clamping out-of-range values.
    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.clamp(0, Self::ALL.len() as i32 - 1) as usize]
    }

    pub fn index(self) -> i32 {
        self as i32
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModulationAlgo {
    PhaseMod,
    AmpMod,
    #[default]
    SignalMix,
    Sync,
    FreqMod,
}

impl ModulationAlgo {
    pub const ALL: [ModulationAlgo; 5] = [
        ModulationAlgo::PhaseMod,
        ModulationAlgo::AmpMod,
        ModulationAlgo::SignalMix,
        ModulationAlgo::Sync,
        ModulationAlgo::FreqMod,
    ];

    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.clamp(0, Self::ALL.len() as i32 - 1) as usize]
    }

    pub fn index(self) -> i32 {
        self as i32
    }
}

/// A single-cycle wavetable supplied by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct Wavetable {
    samples: Vec<f32>,
}

impl Wavetable {
    /// Returns `None` for an empty table.
    pub fn new(samples: Vec<f32>) -> Option<Self> {
        if samples.is_empty() {
            None
        } else {
            Some(Self { samples })
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Linearly interpolated lookup, wrapping at the end of the cycle.
    #[inline]
    pub fn sample(&self, phase: f32) -> f32 {
        let len = self.samples.len();
        let pos = fraction(phase) * len as f32;
        let index = (pos as usize).min(len - 1);
        let frac = pos - index as f32;
        let a = self.samples[index];
        let b = self.samples[(index + 1) % len];
        a + (b - a) * frac
    }
}

/// Fractional part of a phase, always in `[0, 1)`.
#[inline]
pub fn fraction(phase: f32) -> f32 {
    let f = phase - phase.floor();
    // `floor` rounding can hand back exactly 1.0 for tiny negative inputs.
    if f >= 1.0 {
        0.0
    } else {
        f
    }
}

#[inline]
pub fn sine(phase: f32) -> f32 {
    (TAU * phase).sin()
}

#[inline]
pub fn triangle(phase: f32) -> f32 {
    let ph = fraction(phase);
    if ph <= 0.25 {
        ph * 4.0
    } else if ph <= 0.75 {
        2.0 - ph * 4.0
    } else {
        ph * 4.0 - 4.0
    }
}

#[inline]
pub fn saw(phase: f32) -> f32 {
    -1.0 + fraction(phase) * 2.0
}

#[inline]
pub fn square(phase: f32) -> f32 {
    if fraction(phase) > 0.5 {
        -1.0
    } else {
        1.0
    }
}

#[inline]
pub fn moog_saw(phase: f32) -> f32 {
    let ph = fraction(phase);
    if ph < 0.5 {
        -1.0 + ph * 4.0
    } else {
        1.0 - 2.0 * ph
    }
}

#[inline]
pub fn exponential(phase: f32) -> f32 {
    let mut ph = fraction(phase);
    if ph > 0.5 {
        ph = 1.0 - ph;
    }
    -1.0 + 8.0 * ph * ph
}

/// Evaluate `shape` at `phase`.
///
/// Noise draws from `noise`; a user shape without a table is silent.
#[inline]
pub fn shape_sample(
    shape: WaveShape,
    phase: f32,
    noise: &mut NoiseSource,
    table: Option<&Wavetable>,
) -> f32 {
    match shape {
        WaveShape::Sine => sine(phase),
        WaveShape::Triangle => triangle(phase),
        WaveShape::Saw => saw(phase),
        WaveShape::Square => square(phase),
        WaveShape::MoogSaw => moog_saw(phase),
        WaveShape::Exponential => exponential(phase),
        WaveShape::WhiteNoise => noise.next_bipolar(),
        WaveShape::UserDefined => table.map_or(0.0, |t| t.sample(phase)),
    }
}

/// Phase accumulator for one oscillator voice.
#[derive(Debug, Clone, Copy)]
pub struct OscillatorVoice {
    /// Current phase in cycles, kept in `[0, 1)` between periods.
    pub phase: f32,
    /// Phase the voice restarts from on sync.
    pub offset: f32,
}

impl OscillatorVoice {
    pub fn new(offset: f32) -> Self {
        Self {
            phase: fraction(offset),
            offset,
        }
    }

    /// Advance by `step` cycles and report whether the phase wrapped.
    #[inline]
    pub fn advance(&mut self, step: f32) -> bool {
        let before = self.phase.floor();
        self.phase += step;
        self.phase.floor() > before
    }

    /// Move the restart point, dragging the running phase along with it.
    pub fn set_offset(&mut self, offset: f32) {
        if offset != self.offset {
            self.phase += offset - self.offset;
            self.offset = offset;
        }
    }

    #[inline]
    pub fn sync(&mut self) {
        self.phase = self.offset;
    }

    #[inline]
    pub fn wrap(&mut self) {
        self.phase = fraction(self.phase);
    }
}
