//! Benchmarks for the linear ADSR envelope.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use rackdsp::dsp::Envelope;

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Held note, cycling through attack/decay/sustain
        let mut env = Envelope::new(SAMPLE_RATE, 0.05, 0.5, 0.5, 0.3);
        group.bench_with_input(BenchmarkId::new("held", size), &size, |b, _| {
            b.iter(|| {
                env.render(black_box(&mut buffer));
            })
        });

        // Released note
        let mut env = Envelope::new(SAMPLE_RATE, 0.05, 0.5, 0.5, 0.3);
        env.release();
        group.bench_with_input(BenchmarkId::new("released", size), &size, |b, _| {
            b.iter(|| {
                env.render(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
