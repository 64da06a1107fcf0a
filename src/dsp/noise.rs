use rand::{rngs::SmallRng, Rng, SeedableRng};

/// Seeded uniform white-noise generator.
///
/// Every voice owns its own source so renders are reproducible for a given
/// seed and no two notes contend for a shared generator.
#[derive(Debug, Clone)]
pub struct NoiseSource {
    rng: SmallRng,
}

impl NoiseSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Uniform sample in `[-1, 1)`.
    #[inline]
    pub fn next_bipolar(&mut self) -> f32 {
        self.rng.gen_range(-1.0..1.0)
    }

    /// Uniform sample in `[0, 1)`.
    #[inline]
    pub fn next_unipolar(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }

    pub fn fill(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_bipolar();
        }
    }
}
