use std::sync::Arc;

use crate::dsp::oscillator::{shape_sample, ModulationAlgo, OscillatorVoice, WaveShape, Wavetable};
use crate::dsp::NoiseSource;
use crate::{Frame, MAX_BLOCK_SIZE};

/*
Unison Stack
============

Four oscillator layers for one output channel. Layer 0 is heard; layer i is
modulated by layer i + 1 according to layer i's algorithm. Each layer runs N
unison voices and voice i of a layer only ever talks to voice i of its
neighbours, so a stack is really N independent four-deep chains:

    voice 0:  L3 ─► L2 ─► L1 ─► L0 ──┐
    voice 1:  L3 ─► L2 ─► L1 ─► L0 ──┼─ Σ w_i ─► channel
    ...                              │
    voice N-1 ...               L0 ──┘

Chains render deepest first. A layer whose parent syncs to it is never heard,
only its phase advances (and nothing below it runs at all).

Voice weights are binomial: w_i = C(N-1, i) / sqrt(C(2N-2, N-1)), which gives
Σ w_i² = 1 for every N.
*/

pub const MAX_VOICES: usize = 10;
pub const LAYERS: usize = 4;

/// FM depth is specified in cycles at this rate.
const FM_REFERENCE_RATE: f32 = 44_100.0;

/// One layer's live parameters for one channel, refreshed every period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerSettings {
    pub shape: WaveShape,
    /// How this layer is combined with the layer below it.
    pub algo: ModulationAlgo,
    pub volume: f32,
    /// Pitch ratio divided by the sample rate: cycles per sample per Hz.
    pub detuning: f32,
    /// Phase offset in cycles.
    pub offset: f32,
}

impl Default for LayerSettings {
    fn default() -> Self {
        Self {
            shape: WaveShape::Sine,
            algo: ModulationAlgo::SignalMix,
            volume: 0.25,
            detuning: 1.0 / 44_100.0,
            offset: 0.0,
        }
    }
}

/// Unison controls captured at note-on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnisonSpread {
    pub voices: usize,
    /// Cents.
    pub spread: f32,
    /// Percent.
    pub freq_random: f32,
    pub same_detune: bool,
    /// Percent of a cycle.
    pub phase_random: f32,
    pub same_phase: bool,
}

impl Default for UnisonSpread {
    fn default() -> Self {
        Self {
            voices: 1,
            spread: 0.0,
            freq_random: 0.0,
            same_detune: false,
            phase_random: 0.0,
            same_phase: false,
        }
    }
}

/// Equal-power voice weights for `n` voices (clamped to `1..=MAX_VOICES`).
pub fn unison_weights(n: usize) -> Vec<f32> {
    let n = n.clamp(1, MAX_VOICES);
    let mut product = 1.0f64;
    for i in 1..n {
        product *= i as f64 / (i + n - 1) as f64;
    }
    let mut weights = Vec::with_capacity(n);
    let mut w = product.sqrt();
    weights.push(w as f32);
    for i in 1..n {
        w *= (n - i) as f64 / i as f64;
        weights.push(w as f32);
    }
    weights
}

/// Frequency multipliers for `n` voices spread `spread` cents in total
/// around the note, each nudged by up to `randomness` percent of a step.
pub fn detune_multipliers(n: usize, spread: f32, randomness: f32, noise: &mut NoiseSource) -> Vec<f32> {
    let n = n.clamp(1, MAX_VOICES);
    let step = spread / (n as f32).sqrt();
    (0..n)
        .map(|i| {
            let jitter = randomness * 0.01 * (1.0 - 2.0 * noise.next_unipolar());
            let position = 2.0 * i as f32 + 1.0 - n as f32 + jitter;
            (step / 1200.0 * position).exp2()
        })
        .collect()
}

#[derive(Debug, Clone)]
struct Layer {
    settings: LayerSettings,
    voices: Vec<OscillatorVoice>,
    multipliers: Vec<f32>,
    /// Per-voice phase deviation from the layer offset, in cycles.
    deviations: Vec<f32>,
}

impl Layer {
    #[inline]
    fn step(&self, voice: usize, frequency: f32) -> f32 {
        frequency * self.multipliers[voice] * self.settings.detuning
    }
}

/// Four-layer unison oscillator for one channel of one note.
pub struct UnisonStack {
    layers: Vec<Layer>,
    weights: Vec<f32>,
    noise: NoiseSource,
    scratch: Vec<f32>,
    wraps: Vec<bool>,
}

impl UnisonStack {
    pub fn new(settings: &[LayerSettings; LAYERS], spread: &UnisonSpread, seed: u64) -> Self {
        let n = spread.voices.clamp(1, MAX_VOICES);
        let mut noise = NoiseSource::new(seed);

        // Built deepest first: "same" spreads copy from the layer below.
        let mut layers: Vec<Layer> = Vec::with_capacity(LAYERS);
        for depth in (0..LAYERS).rev() {
            let sub = layers.last();
            let multipliers = match sub {
                Some(sub) if spread.same_detune => sub.multipliers.clone(),
                _ => detune_multipliers(n, spread.spread, spread.freq_random, &mut noise),
            };
            let deviations = match sub {
                Some(sub) if spread.same_phase => sub.deviations.clone(),
                _ => (0..n)
                    .map(|_| spread.phase_random * 0.01 * (noise.next_unipolar() - 0.5))
                    .collect(),
            };
            let layer_settings = settings[depth];
            let voices = deviations
                .iter()
                .map(|dev| OscillatorVoice::new(layer_settings.offset + dev))
                .collect();
            layers.push(Layer {
                settings: layer_settings,
                voices,
                multipliers,
                deviations,
            });
        }
        layers.reverse();

        Self {
            layers,
            weights: unison_weights(n),
            noise,
            scratch: vec![0.0; MAX_BLOCK_SIZE],
            wraps: vec![false; MAX_BLOCK_SIZE],
        }
    }

    pub fn voices(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn multipliers(&self, layer: usize) -> &[f32] {
        &self.layers[layer].multipliers
    }

    /// Apply this period's layer parameters. Phase offset changes drag the
    /// running phases along; phases are then wrapped to one cycle.
    pub fn update(&mut self, settings: &[LayerSettings; LAYERS]) {
        for (layer, new) in self.layers.iter_mut().zip(settings.iter()) {
            layer.settings = *new;
            for (voice, dev) in layer.voices.iter_mut().zip(layer.deviations.iter()) {
                voice.set_offset(new.offset + dev);
                voice.wrap();
            }
        }
    }

    /// Number of audible layers, and whether the layer just below them only
    /// serves as a sync source.
    fn rendered_depth(&self) -> (usize, bool) {
        let mut depth = 1;
        while depth < LAYERS && self.layers[depth - 1].settings.algo != ModulationAlgo::Sync {
            depth += 1;
        }
        let sync_source = depth < LAYERS;
        (depth, sync_source)
    }

    /// Overwrite `channel` of `out` with the stack's output for a note at
    /// `frequency` Hz.
    pub fn render(
        &mut self,
        out: &mut [Frame],
        channel: usize,
        frequency: f32,
        sample_rate: f32,
        tables: &[Option<Arc<Wavetable>>; LAYERS],
    ) {
        for frame in out.iter_mut() {
            frame[channel] = 0.0;
        }
        let (depth, sync_source) = self.rendered_depth();
        let fm_scale = FM_REFERENCE_RATE / sample_rate;

        let Self {
            layers,
            weights,
            noise,
            scratch,
            wraps,
        } = self;

        for chunk in out.chunks_mut(MAX_BLOCK_SIZE) {
            let frames = chunk.len();
            let buf = &mut scratch[..frames];
            let wraps = &mut wraps[..frames];

            for (i, weight) in weights.iter().enumerate() {
                if sync_source {
                    let source = &mut layers[depth];
                    let step = source.step(i, frequency);
                    for wrapped in wraps.iter_mut() {
                        *wrapped = source.voices[i].advance(step);
                    }
                }

                for l in (0..depth).rev() {
                    let has_sub = l + 1 < depth;
                    let layer = &mut layers[l];
                    let s = layer.settings;
                    let step = layer.step(i, frequency);
                    let table = tables[l].as_deref();
                    let voice = &mut layer.voices[i];

                    if step >= 0.5 {
                        buf.fill(0.0);
                        continue;
                    }

                    let algo = if has_sub || (sync_source && l + 1 == depth) {
                        Some(s.algo)
                    } else {
                        None
                    };

                    for (f, sample) in buf.iter_mut().enumerate() {
                        let sub = *sample;
                        *sample = match algo {
                            None => shape_sample(s.shape, voice.phase, noise, table) * s.volume,
                            Some(ModulationAlgo::PhaseMod) => {
                                shape_sample(s.shape, voice.phase + sub, noise, table) * s.volume
                            }
                            Some(ModulationAlgo::AmpMod) => {
                                shape_sample(s.shape, voice.phase, noise, table) * sub * s.volume
                            }
                            Some(ModulationAlgo::SignalMix) => {
                                shape_sample(s.shape, voice.phase, noise, table) * s.volume + sub
                            }
                            Some(ModulationAlgo::Sync) => {
                                if wraps[f] {
                                    voice.sync();
                                }
                                shape_sample(s.shape, voice.phase, noise, table) * s.volume
                            }
                            Some(ModulationAlgo::FreqMod) => {
                                voice.phase += sub * fm_scale;
                                shape_sample(s.shape, voice.phase, noise, table) * s.volume
                            }
                        };
                        voice.advance(step);
                    }
                }

                for (frame, sample) in chunk.iter_mut().zip(buf.iter()) {
                    frame[channel] += weight * sample;
                }
            }
        }
    }
}
