//! Real-world scenario benchmarks.
//!
//! These render whole notes the way a host would, period by period, and run
//! the effect chain over mixed buffers.

mod effects;
mod voices;

pub use effects::bench_effects;
pub use voices::bench_voices;
