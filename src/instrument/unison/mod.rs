//! Four-oscillator instrument with unison voices.
//!
//! Every oscillator can be detuned, panned and phase shifted, and modulates
//! the one above it (phase, amplitude, mix, sync or frequency). Each
//! oscillator plays N unison voices spread around the note's pitch. Left and
//! right channels run separate [`UnisonStack`]s so fine detune and stereo
//! phase detune can differ per side.

pub mod stack;

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tracing::trace;

use crate::dsp::mix;
use crate::dsp::oscillator::{ModulationAlgo, WaveShape, Wavetable};
use crate::engine::EngineContext;
use crate::note::NotePlayHandle;
use crate::params::{BoolParam, FloatParam, IntParam, ParamInfo, Settings, SettingsNode};
use crate::Frame;

use super::{apply_release, Instrument};

pub use stack::{
    detune_multipliers, unison_weights, LayerSettings, UnisonSpread, UnisonStack, LAYERS,
    MAX_VOICES,
};

const RELEASE_FRAMES: usize = 128;

struct OscKeys {
    vol: &'static str,
    pan: &'static str,
    coarse: &'static str,
    fine_left: &'static str,
    fine_right: &'static str,
    phase: &'static str,
    stereo_phase: &'static str,
    shape: &'static str,
    modulation: &'static str,
}

macro_rules! osc_keys {
    ($i:literal, $n:literal) => {
        OscKeys {
            vol: concat!("vol_", $i),
            pan: concat!("pan_", $i),
            coarse: concat!("coarse_", $i),
            fine_left: concat!("finel_", $i),
            fine_right: concat!("finer_", $i),
            phase: concat!("phoffset_", $i),
            stereo_phase: concat!("stphdetun_", $i),
            shape: concat!("wavetype_", $i),
            modulation: concat!("modalgo_", $n),
        }
    };
}

/// Controls of one oscillator.
#[derive(Debug, Clone)]
pub struct OscillatorParams {
    pub volume: FloatParam,
    pub panning: FloatParam,
    pub coarse: FloatParam,
    pub fine_left: FloatParam,
    pub fine_right: FloatParam,
    pub phase_offset: FloatParam,
    pub stereo_phase_detune: FloatParam,
    pub wave_shape: IntParam,
    /// How this oscillator combines with the next one. Unused on the last.
    pub modulation: IntParam,
    user_wave: Arc<ArcSwapOption<Wavetable>>,
}

impl OscillatorParams {
    fn new(keys: &OscKeys) -> Self {
        Self {
            volume: FloatParam::new(ParamInfo::float(keys.vol, "Volume", 25.0, 0.0, 200.0, 1.0)),
            panning: FloatParam::new(ParamInfo::float(keys.pan, "Panning", 0.0, -100.0, 100.0, 1.0)),
            coarse: FloatParam::new(ParamInfo::float(keys.coarse, "Coarse detune", 0.0, -24.0, 24.0, 1.0)),
            fine_left: FloatParam::new(ParamInfo::float(keys.fine_left, "Fine detune left", 0.0, -100.0, 100.0, 1.0)),
            fine_right: FloatParam::new(ParamInfo::float(keys.fine_right, "Fine detune right", 0.0, -100.0, 100.0, 1.0)),
            phase_offset: FloatParam::new(ParamInfo::float(keys.phase, "Phase offset", 0.0, 0.0, 360.0, 1.0)),
            stereo_phase_detune: FloatParam::new(ParamInfo::float(
                keys.stereo_phase,
                "Stereo phase detune",
                0.0,
                0.0,
                360.0,
                1.0,
            )),
            wave_shape: IntParam::new(ParamInfo::int(
                keys.shape,
                "Wave shape",
                WaveShape::Sine.index(),
                0,
                WaveShape::ALL.len() as i32 - 1,
            )),
            modulation: IntParam::new(ParamInfo::int(
                keys.modulation,
                "Modulation type",
                ModulationAlgo::SignalMix.index(),
                0,
                ModulationAlgo::ALL.len() as i32 - 1,
            )),
            user_wave: Arc::new(ArcSwapOption::empty()),
        }
    }

    /// Install (or clear) the table played by the user-defined shape.
    pub fn set_user_wave(&self, table: Option<Wavetable>) {
        self.user_wave.store(table.map(Arc::new));
    }

    pub fn user_wave(&self) -> Option<Arc<Wavetable>> {
        self.user_wave.load_full()
    }

    /// Left and right gains from the volume knob and the pan law.
    pub fn channel_volumes(&self) -> [f32; 2] {
        let pan = self.panning.value();
        let (left, right) = if pan >= 0.0 {
            (1.0 - pan / 100.0, 1.0)
        } else {
            (1.0, 1.0 + pan / 100.0)
        };
        let volume = self.volume.value() / 100.0;
        [left * volume, right * volume]
    }

    /// Pitch ratio over the sample rate for `channel`.
    pub fn detuning(&self, channel: usize, sample_rate: f32) -> f32 {
        let fine = if channel == 0 {
            self.fine_left.value()
        } else {
            self.fine_right.value()
        };
        ((self.coarse.value() * 100.0 + fine) / 1200.0).exp2() / sample_rate
    }

    /// Phase offset in cycles; the left channel adds the stereo detune.
    pub fn phase(&self, channel: usize) -> f32 {
        let base = self.phase_offset.value();
        if channel == 0 {
            (base + self.stereo_phase_detune.value()) / 360.0
        } else {
            base / 360.0
        }
    }

    fn floats(&self) -> [&FloatParam; 7] {
        [
            &self.volume,
            &self.panning,
            &self.coarse,
            &self.fine_left,
            &self.fine_right,
            &self.phase_offset,
            &self.stereo_phase_detune,
        ]
    }
}

/// Shared control surface of the instrument. Clones refer to the same values.
#[derive(Debug, Clone)]
pub struct UnisonParams {
    pub oscillators: [OscillatorParams; LAYERS],
    pub voices: IntParam,
    pub spread: FloatParam,
    pub freq_random: FloatParam,
    pub same_detune: BoolParam,
    pub phase_random: FloatParam,
    pub same_phase: BoolParam,
}

impl Default for UnisonParams {
    fn default() -> Self {
        Self {
            oscillators: [
                OscillatorParams::new(&osc_keys!(0, 1)),
                OscillatorParams::new(&osc_keys!(1, 2)),
                OscillatorParams::new(&osc_keys!(2, 3)),
                OscillatorParams::new(&osc_keys!(3, 4)),
            ],
            voices: IntParam::new(ParamInfo::int("unison_", "Unison voices", 1, 1, MAX_VOICES as i32)),
            spread: FloatParam::new(ParamInfo::float("fspread_", "Frequency spread", 0.0, 0.0, 100.0, 1.0)),
            freq_random: FloatParam::new(ParamInfo::float("frand_", "Frequency randomness", 0.0, 0.0, 100.0, 1.0)),
            same_detune: BoolParam::new(ParamInfo::toggle("fsame_", "Same detune", false)),
            phase_random: FloatParam::new(ParamInfo::float("prand_", "Phase randomness", 0.0, 0.0, 100.0, 1.0)),
            same_phase: BoolParam::new(ParamInfo::toggle("psame_", "Same phase", false)),
        }
    }
}

impl UnisonParams {
    pub fn spread(&self) -> UnisonSpread {
        UnisonSpread {
            voices: self.voices.value().max(1) as usize,
            spread: self.spread.value(),
            freq_random: self.freq_random.value(),
            same_detune: self.same_detune.value(),
            phase_random: self.phase_random.value(),
            same_phase: self.same_phase.value(),
        }
    }

    /// Live layer parameters for one channel.
    pub fn layer_settings(&self, channel: usize, sample_rate: f32) -> [LayerSettings; LAYERS] {
        std::array::from_fn(|i| {
            let osc = &self.oscillators[i];
            LayerSettings {
                shape: WaveShape::from_index(osc.wave_shape.value()),
                algo: ModulationAlgo::from_index(osc.modulation.value()),
                volume: osc.channel_volumes()[channel],
                detuning: osc.detuning(channel, sample_rate),
                offset: osc.phase(channel),
            }
        })
    }

    pub fn user_waves(&self) -> [Option<Arc<Wavetable>>; LAYERS] {
        std::array::from_fn(|i| self.oscillators[i].user_wave())
    }
}

/// Per-note state: one stack per channel.
pub struct UnisonNote {
    stacks: [UnisonStack; 2],
}

impl UnisonNote {
    pub fn stack(&self, channel: usize) -> &UnisonStack {
        &self.stacks[channel]
    }
}

pub struct UnisonOscillator {
    params: UnisonParams,
    seed: u64,
    notes_started: u64,
}

impl UnisonOscillator {
    pub fn new(params: UnisonParams) -> Self {
        Self::with_seed(params, 0x7E55_0002)
    }

    pub fn with_seed(params: UnisonParams, seed: u64) -> Self {
        Self {
            params,
            seed,
            notes_started: 0,
        }
    }

    pub fn params(&self) -> &UnisonParams {
        &self.params
    }
}

impl Default for UnisonOscillator {
    fn default() -> Self {
        Self::new(UnisonParams::default())
    }
}

impl Settings for UnisonOscillator {
    fn save_settings(&self, node: &mut SettingsNode) {
        let p = &self.params;
        for osc in &p.oscillators {
            for param in osc.floats() {
                param.save(node);
            }
            osc.wave_shape.save(node);
            osc.modulation.save(node);
        }
        p.voices.save(node);
        p.spread.save(node);
        p.freq_random.save(node);
        p.same_detune.save(node);
        p.phase_random.save(node);
        p.same_phase.save(node);
    }

    fn load_settings(&self, node: &SettingsNode) {
        let p = &self.params;
        for osc in &p.oscillators {
            for param in osc.floats() {
                param.load(node);
            }
            osc.wave_shape.load(node);
            osc.modulation.load(node);
        }
        p.voices.load(node);
        p.spread.load(node);
        p.freq_random.load(node);
        p.same_detune.load(node);
        p.phase_random.load(node);
        p.same_phase.load(node);
    }
}

impl Instrument for UnisonOscillator {
    type NoteData = UnisonNote;

    fn name(&self) -> &'static str {
        "TripleOscillator2"
    }

    fn play_note(
        &mut self,
        ctx: &EngineContext,
        note: &mut NotePlayHandle<UnisonNote>,
        buffer: &mut [Frame],
    ) {
        let sample_rate = ctx.sample_rate();
        let frequency = note.frequency();
        let start = note.note_offset().min(buffer.len());
        let end = (start + note.frames_left_for_current_period()).min(buffer.len());

        if !(frequency.is_finite() && frequency > 0.0) {
            trace!(frequency, "non-positive note frequency, rendering silence");
            mix::clear(&mut buffer[start..end]);
            return;
        }

        let settings = [
            self.params.layer_settings(0, sample_rate),
            self.params.layer_settings(1, sample_rate),
        ];
        let spread = self.params.spread();
        let seed = self.seed.wrapping_add(self.notes_started.wrapping_mul(2));
        let mut created = false;
        let data = note.plugin_data_or_insert_with(|| {
            created = true;
            UnisonNote {
                stacks: [
                    UnisonStack::new(&settings[0], &spread, seed),
                    UnisonStack::new(&settings[1], &spread, seed.wrapping_add(1)),
                ],
            }
        });
        if created {
            self.notes_started = self.notes_started.wrapping_add(1);
        }

        let tables = self.params.user_waves();
        for (channel, stack) in data.stacks.iter_mut().enumerate() {
            stack.update(&settings[channel]);
            stack.render(&mut buffer[start..end], channel, frequency, sample_rate, &tables);
        }

        apply_release(note, buffer, RELEASE_FRAMES);
    }

    fn desired_release_frames(&self, _ctx: &EngineContext) -> usize {
        RELEASE_FRAMES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;

    fn ctx() -> EngineContext {
        EngineContext::new(EngineConfig::default()).unwrap()
    }

    #[test]
    fn zero_frequency_clears_only_the_note_window() {
        let ctx = ctx();
        let mut osc = UnisonOscillator::new(UnisonParams::default());
        let mut note = NotePlayHandle::new(0.0);
        note.begin_period(192, 64);
        let mut buffer = vec![[0.25; 2]; 256];
        osc.play_note(&ctx, &mut note, &mut buffer);
        assert!(buffer[..64].iter().all(|f| *f == [0.25; 2]));
        assert!(buffer[64..].iter().all(|f| *f == [0.0; 2]));
    }

    #[test]
    fn pan_law() {
        let osc = OscillatorParams::new(&osc_keys!(0, 1));
        osc.volume.set(100.0);
        osc.panning.set(50.0);
        assert_eq!(osc.channel_volumes(), [0.5, 1.0]);
        osc.panning.set(-25.0);
        assert_eq!(osc.channel_volumes(), [1.0, 0.75]);
    }

    #[test]
    fn detuning_and_phase_per_channel() {
        let osc = OscillatorParams::new(&osc_keys!(1, 2));
        osc.coarse.set(12.0);
        osc.fine_right.set(-100.0);
        assert_eq!(osc.detuning(0, 1.0), 2.0);
        assert!((osc.detuning(1, 1.0) - (11.0f32 / 12.0).exp2()).abs() < 1e-6);

        osc.phase_offset.set(90.0);
        osc.stereo_phase_detune.set(90.0);
        assert_eq!(osc.phase(0), 0.5);
        assert_eq!(osc.phase(1), 0.25);
    }

    #[test]
    fn modulation_selectors_map_to_layers() {
        let params = UnisonParams::default();
        params.oscillators[0].modulation.set(ModulationAlgo::FreqMod.index());
        let layers = params.layer_settings(0, 44_100.0);
        assert_eq!(layers[0].algo, ModulationAlgo::FreqMod);
        assert_eq!(layers[1].algo, ModulationAlgo::SignalMix);
    }

    #[test]
    fn settings_round_trip() {
        let synth = UnisonOscillator::default();
        let p = synth.params();
        p.oscillators[2].volume.set(120.0);
        p.oscillators[3].wave_shape.set(WaveShape::MoogSaw.index());
        p.oscillators[1].modulation.set(ModulationAlgo::Sync.index());
        p.voices.set(7);
        p.same_phase.set(true);

        let mut node = SettingsNode::new();
        synth.save_settings(&mut node);
        assert!(node.contains("vol_2"));
        assert!(node.contains("modalgo_4"));
        assert!(node.contains("unison_"));

        let restored = UnisonOscillator::default();
        restored.load_settings(&node);
        let r = restored.params();
        assert_eq!(r.oscillators[2].volume.value(), 120.0);
        assert_eq!(r.oscillators[3].wave_shape.value(), WaveShape::MoogSaw.index());
        assert_eq!(r.oscillators[1].modulation.value(), ModulationAlgo::Sync.index());
        assert_eq!(r.voices.value(), 7);
        assert!(r.same_phase.value());
    }

    #[test]
    fn plays_a_note_with_release_fade() {
        let ctx = ctx();
        let mut synth = UnisonOscillator::default();
        synth.params().voices.set(4);
        synth.params().spread.set(20.0);

        let mut note = NotePlayHandle::new(220.0);
        note.begin_period(256, 0);
        let mut buffer = vec![[0.0; 2]; 256];
        synth.play_note(&ctx, &mut note, &mut buffer);
        note.end_period();
        assert!(buffer.iter().any(|f| f[0].abs() > 1e-3));
        assert_eq!(note.plugin_data().map(|d| d.stack(0).voices()), Some(4));

        note.note_off();
        for _ in 0..2 {
            note.begin_period(256, 0);
            let mut buffer = vec![[0.0; 2]; 256];
            synth.play_note(&ctx, &mut note, &mut buffer);
            note.end_period();
        }
        // The 128-frame fade is over; the next period is silent.
        note.begin_period(256, 0);
        let mut buffer = vec![[0.0; 2]; 256];
        synth.play_note(&ctx, &mut note, &mut buffer);
        assert!(buffer.iter().all(|f| f[0] == 0.0 && f[1] == 0.0));
        assert!(note.is_finished(synth.desired_release_frames(&ctx)));
    }

    #[test]
    fn user_wave_is_used_when_selected() {
        let ctx = ctx();
        let mut synth = UnisonOscillator::default();
        let p = synth.params().clone();
        for osc in p.oscillators.iter().skip(1) {
            osc.volume.set(0.0);
        }
        p.oscillators[0].wave_shape.set(WaveShape::UserDefined.index());

        let render = |synth: &mut UnisonOscillator| {
            let mut note = NotePlayHandle::new(220.0);
            note.begin_period(128, 0);
            let mut buffer = vec![[0.0; 2]; 128];
            synth.play_note(&ctx, &mut note, &mut buffer);
            buffer
        };

        assert!(render(&mut synth).iter().all(|f| f[0] == 0.0));
        p.oscillators[0].set_user_wave(Wavetable::new(vec![0.5; 16]));
        assert!(render(&mut synth).iter().all(|f| (f[0] - 0.125).abs() < 1e-6));
    }
}
