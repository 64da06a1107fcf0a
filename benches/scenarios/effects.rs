//! Benchmarks for effects and the effect chain.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use rackdsp::effect::{effect_chain, DistEnv, Effect, Noyzr};
use rackdsp::{EngineConfig, EngineContext};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_effects(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/effects");

    for &size in BLOCK_SIZES {
        let ctx = EngineContext::new(EngineConfig {
            sample_rate: SAMPLE_RATE,
            frames_per_period: size,
        })
        .expect("valid bench config");
        let input: Vec<[f32; 2]> = (0..size)
            .map(|i| {
                let s = (i as f32 * 0.05).sin() * 0.6;
                [s, -s]
            })
            .collect();
        let mut buffer = input.clone();

        // === DISTENV ALONE ===
        // Every continuous control is snapshotted and read per frame
        let mut dist = DistEnv::default();
        dist.params().ratio.set(0.4);
        dist.params().env_amount.set(0.8);
        dist.base().params().auto_quit_disabled.set(true);
        group.bench_with_input(BenchmarkId::new("distenv", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                dist.process_audio_buffer(black_box(&ctx), black_box(&mut buffer))
            })
        });

        // === FULL CHAIN ===
        // DistEnv → Noyzr → DistEnv, including sanitizing between stages
        let (mut handle, mut chain) = effect_chain(8);
        for effect in [
            Box::new(DistEnv::default()) as Box<dyn Effect>,
            Box::new(Noyzr::default()),
            Box::new(DistEnv::default()),
        ] {
            handle.append(effect).expect("chain has room");
        }
        group.bench_with_input(BenchmarkId::new("chain_3_effects", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                chain.process_audio_buffer(black_box(&ctx), black_box(&mut buffer), true)
            })
        });

        // === STOPPED CHAIN ===
        // Cost of a chain whose gates have closed
        let (mut handle, mut chain) = effect_chain(8);
        for _ in 0..4 {
            handle.append(Box::new(DistEnv::default())).expect("chain has room");
        }
        let mut silence = vec![[0.0f32; 2]; size];
        while chain.process_audio_buffer(&ctx, &mut silence, false) {}
        group.bench_with_input(BenchmarkId::new("chain_gated", size), &size, |b, _| {
            b.iter(|| chain.process_audio_buffer(black_box(&ctx), black_box(&mut silence), false))
        });
    }

    group.finish();
}
