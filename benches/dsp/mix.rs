//! Benchmarks for frame-level mixing helpers.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use rackdsp::dsp::mix::{blend_frame, mean_square, sanitize, sum_in_place};

use crate::BLOCK_SIZES;

pub fn bench_mix(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/mix");

    for &size in BLOCK_SIZES {
        let input: Vec<[f32; 2]> = (0..size)
            .map(|i| {
                let s = (i as f32 * 0.1).sin();
                [s, s * 0.5]
            })
            .collect();
        let mut buffer = input.clone();

        group.bench_with_input(BenchmarkId::new("sanitize", size), &size, |b, _| {
            b.iter(|| sanitize(black_box(&mut buffer)))
        });

        group.bench_with_input(BenchmarkId::new("mean_square", size), &size, |b, _| {
            b.iter(|| mean_square(black_box(&input)))
        });

        group.bench_with_input(BenchmarkId::new("sum_in_place", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                sum_in_place(black_box(&mut buffer), black_box(&input));
            })
        });

        group.bench_with_input(BenchmarkId::new("blend", size), &size, |b, _| {
            b.iter(|| {
                for (out, frame) in buffer.iter_mut().zip(&input) {
                    *out = blend_frame(*frame, [frame[0] * 2.0, frame[1] * 2.0], 0.3, 0.7);
                }
            })
        });
    }

    group.finish();
}
