//! Feedback-delay string synth.
//!
//! Each note excites a one-period delay loop with an enveloped noise burst.
//! The loop runs through a per-note [`FilterBank`] so the timbre of the
//! decay can be shaped with pass, shelf and peak bands.

pub mod filter_bank;
pub mod voice;

use tracing::{debug, trace};

use crate::dsp::mix;
use crate::engine::EngineContext;
use crate::note::NotePlayHandle;
use crate::params::{BoolParam, FloatParam, IntParam, ParamInfo, Settings, SettingsNode};
use crate::Frame;

use super::{apply_release, note_window, Instrument};

pub use filter_bank::{BandSettings, BankSettings, FilterBank, PassSlope};
pub use voice::{FbVoice, ImpulseShape};

/// Pass and shelf bands stay below this fraction of the sample rate.
const MAX_FREQ_RATIO: f32 = 0.49;

/// Parameters of one filter band.
#[derive(Debug, Clone)]
pub struct BandParams {
    pub active: BoolParam,
    pub freq: FloatParam,
    pub width: FloatParam,
    /// Absent on pass bands.
    pub gain: Option<FloatParam>,
}

impl BandParams {
    fn new(active: ParamInfo, freq: ParamInfo, width: ParamInfo, gain: Option<ParamInfo>) -> Self {
        Self {
            active: BoolParam::new(active),
            freq: FloatParam::new(freq),
            width: FloatParam::new(width),
            gain: gain.map(FloatParam::new),
        }
    }

    fn settings(&self, sample_rate: f32) -> BandSettings {
        BandSettings {
            active: self.active.value(),
            freq: self.freq.value().min(sample_rate * MAX_FREQ_RATIO),
            width: self.width.value(),
            gain: self.gain.as_ref().map_or(0.0, FloatParam::value),
        }
    }

    fn save(&self, node: &mut SettingsNode) {
        self.active.save(node);
        self.freq.save(node);
        self.width.save(node);
        if let Some(gain) = &self.gain {
            gain.save(node);
        }
    }

    fn load(&self, node: &SettingsNode) {
        self.active.load(node);
        self.freq.load(node);
        self.width.load(node);
        if let Some(gain) = &self.gain {
            gain.load(node);
        }
    }
}

const GAIN_MIN: f32 = -3.0;
const GAIN_MAX: f32 = 3.0;

fn gain(key: &'static str, name: &'static str) -> ParamInfo {
    ParamInfo::float(key, name, 0.0, GAIN_MIN, GAIN_MAX, 0.001)
}

fn freq(key: &'static str, name: &'static str, default: f32) -> ParamInfo {
    ParamInfo::float(key, name, default, 20.0, 20_000.0, 0.001)
}

/// Shared control surface of the synth. Clones refer to the same values.
#[derive(Debug, Clone)]
pub struct FbSynthParams {
    pub feedback_decay: FloatParam,
    pub impulse_add: FloatParam,
    pub impulse_attack: FloatParam,
    pub impulse_decay: FloatParam,
    pub impulse_sustain: FloatParam,
    pub impulse_release: FloatParam,

    pub high_pass: BandParams,
    pub high_pass_slope: IntParam,
    pub low_shelf: BandParams,
    pub peaks: [BandParams; 4],
    pub high_shelf: BandParams,
    pub low_pass: BandParams,
    pub low_pass_slope: IntParam,
}

impl Default for FbSynthParams {
    fn default() -> Self {
        let peak = |active, f, bw, g, name, default| {
            BandParams::new(
                ParamInfo::toggle(active, name, false),
                freq(f, name, default),
                ParamInfo::float(bw, name, 0.3, 0.1, 4.0, 0.001),
                Some(gain(g, name)),
            )
        };

        Self {
            feedback_decay: FloatParam::new(ParamInfo::float("FBDecay", "Decay time", 0.5, 0.1, 2.0, 0.005)),
            impulse_add: FloatParam::new(ParamInfo::float("ImpAdd", "Impulse add", 0.5, 0.0, 2.0, 0.001)),
            impulse_attack: FloatParam::new(ParamInfo::float("ImpAttack", "Impulse attack", 0.05, 0.0, 1.0, 0.001)),
            impulse_decay: FloatParam::new(ParamInfo::float("ImpDecay", "Impulse decay", 0.5, 0.01, 3.0, 0.001)),
            impulse_sustain: FloatParam::new(ParamInfo::float("ImpSustain", "Impulse sustain", 0.5, 0.0, 1.0, 0.005)),
            impulse_release: FloatParam::new(ParamInfo::float("ImpRelease", "Impulse release", 0.3, 0.0, 2.0, 0.001)),

            high_pass: BandParams::new(
                ParamInfo::toggle("HPactive", "HP active", false),
                freq("HPfreq", "HP freq", 31.0),
                ParamInfo::float("HPres", "HP res", 0.707, 0.003, 10.0, 0.001),
                None,
            ),
            high_pass_slope: IntParam::new(ParamInfo::int("HP", "High-pass type", 0, 0, 2)),
            low_shelf: BandParams::new(
                ParamInfo::toggle("Lowshelfactive", "Low-shelf active", false),
                freq("LowShelffreq", "Low-shelf freq", 80.0),
                ParamInfo::float("LowShelfres", "Low-shelf res", 0.707, 0.55, 10.0, 0.001),
                Some(gain("Lowshelfgain", "Low-shelf gain")),
            ),
            peaks: [
                peak("Peak1active", "Peak1freq", "Peak1bw", "Peak1gain", "Peak 1", 120.0),
                peak("Peak2active", "Peak2freq", "Peak2bw", "Peak2gain", "Peak 2", 250.0),
                peak("Peak3active", "Peak3freq", "Peak3bw", "Peak3gain", "Peak 3", 2_000.0),
                peak("Peak4active", "Peak4freq", "Peak4bw", "Peak4gain", "Peak 4", 4_000.0),
            ],
            high_shelf: BandParams::new(
                ParamInfo::toggle("Highshelfactive", "High-shelf active", false),
                freq("Highshelffreq", "High-shelf freq", 12_000.0),
                ParamInfo::float("HighShelfres", "High-shelf res", 0.707, 0.55, 10.0, 0.001),
                Some(gain("HighShelfgain", "High-shelf gain")),
            ),
            low_pass: BandParams::new(
                ParamInfo::toggle("LPactive", "LP active", false),
                freq("LPfreq", "LP freq", 18_000.0),
                ParamInfo::float("LPres", "LP res", 0.707, 0.003, 10.0, 0.001),
                None,
            ),
            low_pass_slope: IntParam::new(ParamInfo::int("LP", "Low-pass type", 0, 0, 2)),
        }
    }
}

impl FbSynthParams {
    /// Current filter bank parameters.
    pub fn bank_settings(&self, sample_rate: f32) -> BankSettings {
        BankSettings {
            sample_rate,
            high_pass: self.high_pass.settings(sample_rate),
            high_pass_slope: PassSlope::from_index(self.high_pass_slope.value()),
            low_shelf: self.low_shelf.settings(sample_rate),
            peaks: std::array::from_fn(|i| self.peaks[i].settings(sample_rate)),
            high_shelf: self.high_shelf.settings(sample_rate),
            low_pass: self.low_pass.settings(sample_rate),
            low_pass_slope: PassSlope::from_index(self.low_pass_slope.value()),
        }
    }

    pub fn impulse_shape(&self) -> ImpulseShape {
        ImpulseShape {
            attack: self.impulse_attack.value(),
            decay: self.impulse_decay.value(),
            sustain: self.impulse_sustain.value(),
            release: self.impulse_release.value(),
        }
    }

    fn bands(&self) -> impl Iterator<Item = &BandParams> {
        [&self.high_pass, &self.low_shelf]
            .into_iter()
            .chain(self.peaks.iter())
            .chain([&self.high_shelf, &self.low_pass])
    }
}

/// Legacy per-slope toggles, written next to the selector so older readers
/// still find them.
fn save_slope(node: &mut SettingsNode, prefix: &str, slope: PassSlope) {
    for (suffix, candidate) in [("12", PassSlope::Db12), ("24", PassSlope::Db24), ("48", PassSlope::Db48)] {
        node.set_bool(&format!("{prefix}{suffix}"), slope == candidate);
    }
}

fn load_slope(node: &SettingsNode, param: &IntParam, prefix: &str) {
    if node.contains(param.info().key) {
        param.load(node);
        return;
    }
    let legacy = |suffix: &str| node.get_bool(&format!("{prefix}{suffix}")).unwrap_or(false);
    let slope = if legacy("48") {
        PassSlope::Db48
    } else if legacy("24") {
        PassSlope::Db24
    } else {
        PassSlope::Db12
    };
    debug!(prefix, slope = ?slope, "slope selector missing, using legacy toggles");
    param.set(slope.index());
}

pub struct FbSynth {
    params: FbSynthParams,
    seed: u64,
    notes_started: u64,
}

impl FbSynth {
    pub fn new(params: FbSynthParams) -> Self {
        Self::with_seed(params, 0x5EED_F00D)
    }

    /// Every note's noise source is seeded from `seed` and a note counter.
    pub fn with_seed(params: FbSynthParams, seed: u64) -> Self {
        Self {
            params,
            seed,
            notes_started: 0,
        }
    }

    pub fn params(&self) -> &FbSynthParams {
        &self.params
    }
}

impl Default for FbSynth {
    fn default() -> Self {
        Self::new(FbSynthParams::default())
    }
}

impl Settings for FbSynth {
    fn save_settings(&self, node: &mut SettingsNode) {
        let p = &self.params;
        for param in [
            &p.feedback_decay,
            &p.impulse_add,
            &p.impulse_attack,
            &p.impulse_decay,
            &p.impulse_sustain,
            &p.impulse_release,
        ] {
            param.save(node);
        }
        for band in p.bands() {
            band.save(node);
        }
        p.high_pass_slope.save(node);
        p.low_pass_slope.save(node);
        save_slope(node, "HP", PassSlope::from_index(p.high_pass_slope.value()));
        save_slope(node, "LP", PassSlope::from_index(p.low_pass_slope.value()));
    }

    fn load_settings(&self, node: &SettingsNode) {
        let p = &self.params;
        for param in [
            &p.feedback_decay,
            &p.impulse_add,
            &p.impulse_attack,
            &p.impulse_decay,
            &p.impulse_sustain,
            &p.impulse_release,
        ] {
            param.load(node);
        }
        for band in p.bands() {
            band.load(node);
        }
        load_slope(node, &p.high_pass_slope, "HP");
        load_slope(node, &p.low_pass_slope, "LP");
    }
}

impl Instrument for FbSynth {
    type NoteData = FbVoice;

    fn name(&self) -> &'static str {
        "FBSynth"
    }

    fn play_note(
        &mut self,
        ctx: &EngineContext,
        note: &mut NotePlayHandle<FbVoice>,
        buffer: &mut [Frame],
    ) {
        let sample_rate = ctx.sample_rate();
        let frequency = note.frequency();
        let releasing = note.is_release_started();

        if !(frequency.is_finite() && frequency > 0.0) {
            trace!(frequency, "non-positive note frequency, rendering silence");
            mix::clear(note_window(note, buffer));
            return;
        }

        let start = note.note_offset().min(buffer.len());
        let end = (start + note.frames_left_for_current_period()).min(buffer.len());

        let shape = self.params.impulse_shape();
        let seed = self.seed.wrapping_add(self.notes_started);
        let mut created = false;
        let voice = note.plugin_data_or_insert_with(|| {
            created = true;
            FbVoice::new(sample_rate, shape, seed)
        });
        if created {
            self.notes_started = self.notes_started.wrapping_add(1);
        }

        let bank = self.params.bank_settings(sample_rate);
        let decay = self.params.feedback_decay.snapshot();
        let impulse_add = self.params.impulse_add.snapshot();

        voice.render(
            &mut buffer[start..end],
            frequency,
            sample_rate,
            releasing,
            &decay,
            &impulse_add,
            &bank,
        );

        apply_release(note, buffer, self.desired_release_frames(ctx));
    }

    fn desired_release_frames(&self, ctx: &EngineContext) -> usize {
        (ctx.sample_rate() * 4.0) as usize
    }
}
