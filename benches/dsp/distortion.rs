//! Benchmarks for power-law shaping and envelope following.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use rackdsp::dsp::distortion::{signed_pow, DetectorMode, EnvelopeFollower};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_distortion(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/distortion");

    for &size in BLOCK_SIZES {
        let input: Vec<[f32; 2]> = (0..size)
            .map(|i| {
                let s = (i as f32 * 0.05).sin() * 0.8;
                [s, s * 0.5]
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("signed_pow", size), &size, |b, _| {
            b.iter(|| {
                let mut acc = 0.0f32;
                for frame in &input {
                    acc += signed_pow(black_box(frame[0]), 0.3);
                    acc += signed_pow(black_box(frame[1]), 0.3);
                }
                acc
            })
        });

        for (name, mode) in [("follow_rms", DetectorMode::Rms), ("follow_peak", DetectorMode::Peak)] {
            let mut follower = EnvelopeFollower::new();
            let attack = 0.010 * SAMPLE_RATE;
            let release = 0.100 * SAMPLE_RATE;
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    let mut acc = 0.0f32;
                    for frame in &input {
                        acc += follower.follow(mode.level(black_box(*frame)), attack, release);
                    }
                    acc
                })
            });
        }
    }

    group.finish();
}
