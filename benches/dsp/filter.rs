//! Benchmarks for crossfading biquad stages.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use rackdsp::dsp::filter::{FilterStage, StageKind};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");

    for &size in BLOCK_SIZES {
        // Generate a test signal (sawtooth-like ramp)
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
            .collect();
        let progress_step = 1.0 / (size - 1) as f32;

        // Steady parameters: the crossfade has already settled
        let mut stage = FilterStage::new(StageKind::LowPass);
        stage.set_parameters(SAMPLE_RATE, 1000.0, 0.707, 0.0);
        for &s in &input {
            stage.update(s, 0, 1.0);
        }
        group.bench_with_input(BenchmarkId::new("lowpass_steady", size), &size, |b, _| {
            b.iter(|| {
                let mut acc = 0.0f32;
                for &s in &input {
                    acc += stage.update(black_box(s), 0, 1.0);
                }
                acc
            })
        });

        // Parameter jump every period: both filters run and are blended
        let mut stage = FilterStage::new(StageKind::Peak);
        let mut freq = 250.0f32;
        group.bench_with_input(BenchmarkId::new("peak_crossfade", size), &size, |b, _| {
            b.iter(|| {
                freq = if freq > 2000.0 { 250.0 } else { freq * 1.5 };
                stage.set_parameters(SAMPLE_RATE, freq, 0.3, 3.0);
                let mut acc = 0.0f32;
                for (i, &s) in input.iter().enumerate() {
                    acc += stage.update(black_box(s), 0, i as f32 * progress_step);
                }
                acc
            })
        });

        // Stereo shelving pair
        let mut low = FilterStage::new(StageKind::LowShelf);
        let mut high = FilterStage::new(StageKind::HighShelf);
        low.set_parameters(SAMPLE_RATE, 80.0, 0.707, 3.0);
        high.set_parameters(SAMPLE_RATE, 12_000.0, 0.707, -3.0);
        group.bench_with_input(BenchmarkId::new("shelf_pair_stereo", size), &size, |b, _| {
            b.iter(|| {
                let mut acc = 0.0f32;
                for &s in &input {
                    for ch in 0..2 {
                        acc += high.update(low.update(black_box(s), ch, 1.0), ch, 1.0);
                    }
                }
                acc
            })
        });
    }

    group.finish();
}
