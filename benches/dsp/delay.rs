//! Benchmarks for ring buffer operations.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use rackdsp::dsp::RingBuffer;

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_delay(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/delay");

    // Feedback offsets (in frames) for a few note pitches
    let offsets: &[(&str, f32)] = &[
        ("a1_55hz", SAMPLE_RATE / 55.0),
        ("a4_440hz", SAMPLE_RATE / 440.0),
        ("a7_3520hz", SAMPLE_RATE / 3520.0),
    ];

    for &size in BLOCK_SIZES {
        let input: Vec<[f32; 2]> = (0..size)
            .map(|i| {
                let s = (i as f32 * 0.1).sin();
                [s, -s]
            })
            .collect();

        // Per-frame feedback loop, as the synthesis voice runs it
        for &(name, offset) in offsets {
            let mut ring = RingBuffer::with_duration(SAMPLE_RATE, 2.0);
            group.bench_with_input(
                BenchmarkId::new(format!("feedback_{name}"), size),
                &size,
                |b, _| {
                    b.iter(|| {
                        for frame in &input {
                            let delayed = ring.read_frame(black_box(-offset));
                            let next = [
                                delayed[0] * 0.99 + frame[0],
                                delayed[1] * 0.99 + frame[1],
                            ];
                            ring.write(&[next], 0);
                            ring.move_position(1);
                        }
                    })
                },
            );
        }

        // Block read/write
        let mut ring = RingBuffer::with_duration(SAMPLE_RATE, 2.0);
        let mut out = vec![[0.0f32; 2]; size];
        group.bench_with_input(BenchmarkId::new("block_write_read", size), &size, |b, _| {
            b.iter(|| {
                ring.write(black_box(&input), 0);
                ring.read(black_box(&mut out), -(size as f32));
                ring.move_position(size);
            })
        });
    }

    group.finish();
}
