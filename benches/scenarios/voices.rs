//! Benchmarks for whole-note renders.
//!
//! Each iteration is one period of a sounding note, including the lazy
//! per-note state after the first call.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use rackdsp::instrument::{FbSynth, FbSynthParams, Instrument, UnisonOscillator, UnisonParams};
use rackdsp::note::NotePlayHandle;
use rackdsp::{EngineConfig, EngineContext};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

fn context(size: usize) -> EngineContext {
    EngineContext::new(EngineConfig {
        sample_rate: SAMPLE_RATE,
        frames_per_period: size,
    })
    .expect("valid bench config")
}

fn bench_instrument<I: Instrument>(
    group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>,
    name: &str,
    size: usize,
    instrument: &mut I,
) {
    let ctx = context(size);
    let mut note = NotePlayHandle::new(110.0);
    let mut buffer = vec![[0.0f32; 2]; size];

    group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
        b.iter(|| {
            note.begin_period(size, 0);
            instrument.play_note(black_box(&ctx), &mut note, black_box(&mut buffer));
            note.end_period();
        })
    });
}

pub fn bench_voices(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voices");

    for &size in BLOCK_SIZES {
        // === FEEDBACK SYNTH, FILTERS BYPASSED ===
        // Baseline: ring buffer, envelope and noise only
        let mut plain = FbSynth::new(FbSynthParams::default());
        bench_instrument(&mut group, "fbsynth_plain", size, &mut plain);

        // === FEEDBACK SYNTH, FULL FILTER BANK ===
        // Every band active with 48 dB pass slopes: all 14 stages run
        let params = FbSynthParams::default();
        params.high_pass.active.set(true);
        params.high_pass_slope.set(2);
        params.low_shelf.active.set(true);
        for peak in &params.peaks {
            peak.active.set(true);
        }
        params.high_shelf.active.set(true);
        params.low_pass.active.set(true);
        params.low_pass_slope.set(2);
        let mut full = FbSynth::new(params);
        bench_instrument(&mut group, "fbsynth_all_bands", size, &mut full);

        // === UNISON, ONE VOICE ===
        let mut single = UnisonOscillator::new(UnisonParams::default());
        bench_instrument(&mut group, "unison_1_voice", size, &mut single);

        // === UNISON, TEN VOICES, ALL LAYERS AUDIBLE ===
        let params = UnisonParams::default();
        params.voices.set(10);
        params.spread.set(30.0);
        params.freq_random.set(20.0);
        params.phase_random.set(50.0);
        let mut wide = UnisonOscillator::new(params);
        bench_instrument(&mut group, "unison_10_voices", size, &mut wide);
    }

    group.finish();
}
