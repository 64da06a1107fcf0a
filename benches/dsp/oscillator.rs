//! Benchmarks for waveform evaluation and phase accumulation.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use rackdsp::dsp::oscillator::{shape_sample, OscillatorVoice, WaveShape, Wavetable};
use rackdsp::dsp::NoiseSource;

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");
    let step = 440.0 / SAMPLE_RATE;

    let table_samples: Vec<f32> = (0..256)
        .map(|i| (i as f32 / 256.0 * std::f32::consts::TAU).sin())
        .collect();
    let table = Wavetable::new(table_samples);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for shape in WaveShape::ALL {
            let mut voice = OscillatorVoice::new(0.0);
            let mut noise = NoiseSource::new(7);
            group.bench_with_input(
                BenchmarkId::new(format!("{shape:?}").to_lowercase(), size),
                &size,
                |b, _| {
                    b.iter(|| {
                        for out in buffer.iter_mut() {
                            *out = shape_sample(
                                shape,
                                voice.phase,
                                &mut noise,
                                table.as_ref(),
                            );
                            voice.advance(black_box(step));
                        }
                        voice.wrap();
                    })
                },
            );
        }
    }

    group.finish();
}
