use crate::dsp::filter::{FilterStage, StageKind};
use crate::Frame;

/*
Signal path through the bank, left to right:

  in ─► HP12 ─► HP24 ─► HP48a ─► HP48b ─► LowShelf ─► Peak1..4 ─► HighShelf ─► LP12 ─► LP24 ─► LP48a ─► LP48b ─► out
        └──────── high-pass ──────────┘                                       └──────── low-pass ───────────┘

A 12 dB pass runs one section, 24 dB runs two, 48 dB runs all four. Every
stage has its parameters refreshed each period whether or not it is in the
path, so switching a band on never starts from stale coefficients.
*/

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Roll-off of the high-pass and low-pass cascades.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassSlope {
    #[default]
    Db12,
    Db24,
    Db48,
}

impl PassSlope {
    pub fn from_index(index: i32) -> Self {
        match index {
            i if i <= 0 => PassSlope::Db12,
            1 => PassSlope::Db24,
            _ => PassSlope::Db48,
        }
    }

    pub fn index(self) -> i32 {
        self as i32
    }

    /// Number of 12 dB sections in the cascade.
    pub fn sections(self) -> usize {
        match self {
            PassSlope::Db12 => 1,
            PassSlope::Db24 => 2,
            PassSlope::Db48 => 4,
        }
    }
}

/// Parameters of one band for the current period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandSettings {
    pub active: bool,
    pub freq: f32,
    /// Q for pass and shelf bands, bandwidth in octaves for peaks.
    pub width: f32,
    /// dB; ignored by pass bands.
    pub gain: f32,
}

impl BandSettings {
    pub const fn off(freq: f32, width: f32) -> Self {
        Self {
            active: false,
            freq,
            width,
            gain: 0.0,
        }
    }
}

/// A whole bank's parameters, captured once per period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BankSettings {
    pub sample_rate: f32,
    pub high_pass: BandSettings,
    pub high_pass_slope: PassSlope,
    pub low_shelf: BandSettings,
    pub peaks: [BandSettings; 4],
    pub high_shelf: BandSettings,
    pub low_pass: BandSettings,
    pub low_pass_slope: PassSlope,
}

impl BankSettings {
    /// Everything bypassed: the bank passes audio untouched.
    pub fn bypass(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            high_pass: BandSettings::off(31.0, 0.707),
            high_pass_slope: PassSlope::Db12,
            low_shelf: BandSettings::off(80.0, 0.707),
            peaks: [
                BandSettings::off(120.0, 0.3),
                BandSettings::off(250.0, 0.3),
                BandSettings::off(2_000.0, 0.3),
                BandSettings::off(4_000.0, 0.3),
            ],
            high_shelf: BandSettings::off(12_000.0, 0.707),
            low_pass: BandSettings::off(18_000.0, 0.707),
            low_pass_slope: PassSlope::Db12,
        }
    }
}

/// Per-voice filter bank: 14 crossfading biquad stages.
pub struct FilterBank {
    high_pass: [FilterStage; 4],
    low_shelf: FilterStage,
    peaks: [FilterStage; 4],
    high_shelf: FilterStage,
    low_pass: [FilterStage; 4],

    settings: BankSettings,
    frames_per_period: usize,
    frame_index: usize,
}

impl FilterBank {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            high_pass: std::array::from_fn(|_| FilterStage::new(StageKind::HighPass)),
            low_shelf: FilterStage::new(StageKind::LowShelf),
            peaks: std::array::from_fn(|_| FilterStage::new(StageKind::Peak)),
            high_shelf: FilterStage::new(StageKind::HighShelf),
            low_pass: std::array::from_fn(|_| FilterStage::new(StageKind::LowPass)),
            settings: BankSettings::bypass(sample_rate),
            frames_per_period: 2,
            frame_index: 0,
        }
    }

    /// Start a period of `frames` frames with fresh parameters.
    pub fn begin_period(&mut self, frames: usize, settings: &BankSettings) {
        self.reset_engaged(settings);
        self.frames_per_period = frames;
        self.frame_index = 0;
        self.settings = *settings;

        let sr = settings.sample_rate;
        let hp = settings.high_pass;
        for stage in &mut self.high_pass {
            stage.set_parameters(sr, hp.freq, hp.width, 1.0);
        }
        let ls = settings.low_shelf;
        self.low_shelf.set_parameters(sr, ls.freq, ls.width, ls.gain);
        for (stage, band) in self.peaks.iter_mut().zip(settings.peaks.iter()) {
            stage.set_parameters(sr, band.freq, band.width, band.gain);
        }
        let hs = settings.high_shelf;
        self.high_shelf.set_parameters(sr, hs.freq, hs.width, hs.gain);
        let lp = settings.low_pass;
        for stage in &mut self.low_pass {
            stage.set_parameters(sr, lp.freq, lp.width, 1.0);
        }
    }

    /// Clear the history of stages that were bypassed last period and run in
    /// the next one, so they do not replay signal from before the bypass.
    fn reset_engaged(&mut self, next: &BankSettings) {
        let prev = self.settings;

        let sections = |band: &BandSettings, slope: PassSlope| {
            if band.active {
                slope.sections()
            } else {
                0
            }
        };
        let (was, now) = (
            sections(&prev.high_pass, prev.high_pass_slope),
            sections(&next.high_pass, next.high_pass_slope),
        );
        for stage in self.high_pass.iter_mut().take(now).skip(was) {
            stage.reset();
        }
        let (was, now) = (
            sections(&prev.low_pass, prev.low_pass_slope),
            sections(&next.low_pass, next.low_pass_slope),
        );
        for stage in self.low_pass.iter_mut().take(now).skip(was) {
            stage.reset();
        }

        if next.low_shelf.active && !prev.low_shelf.active {
            self.low_shelf.reset();
        }
        for ((stage, was), now) in self.peaks.iter_mut().zip(&prev.peaks).zip(&next.peaks) {
            if now.active && !was.active {
                stage.reset();
            }
        }
        if next.high_shelf.active && !prev.high_shelf.active {
            self.high_shelf.reset();
        }
    }

    /// Progress through the period for the next frame, 0 on the first and 1
    /// on the last.
    #[inline]
    fn progress(&self) -> f32 {
        if self.frames_per_period <= 1 {
            1.0
        } else {
            (self.frame_index as f32 / (self.frames_per_period - 1) as f32).min(1.0)
        }
    }

    #[inline]
    fn run(stage: &mut FilterStage, frame: Frame, progress: f32) -> Frame {
        [
            stage.update(frame[0], 0, progress),
            stage.update(frame[1], 1, progress),
        ]
    }

    /// Filter one frame through every active band.
    pub fn apply(&mut self, mut frame: Frame) -> Frame {
        let progress = self.progress();
        let s = self.settings;

        if s.high_pass.active {
            for stage in &mut self.high_pass[..s.high_pass_slope.sections()] {
                frame = Self::run(stage, frame, progress);
            }
        }
        if s.low_shelf.active {
            frame = Self::run(&mut self.low_shelf, frame, progress);
        }
        for (stage, band) in self.peaks.iter_mut().zip(s.peaks.iter()) {
            if band.active {
                frame = Self::run(stage, frame, progress);
            }
        }
        if s.high_shelf.active {
            frame = Self::run(&mut self.high_shelf, frame, progress);
        }
        if s.low_pass.active {
            for stage in &mut self.low_pass[..s.low_pass_slope.sections()] {
                frame = Self::run(stage, frame, progress);
            }
        }

        self.frame_index += 1;
        frame
    }
}
