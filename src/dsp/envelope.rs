/*
Linear ADSR Envelope
====================

A time-indexed linear envelope. Unlike an incremental envelope that adds a
step to a running level, this one keeps a sample counter and evaluates the
segment law directly, so the output at any sample is exact and the shape
does not drift over long notes.

Vocabulary
----------

  elapsed     Samples since note-on (or since release was triggered).

  level       Value returned by `tick()`: 0.0..1.0 relative to the peak.

  release     Exogenous. The host tells us the key went up; we snapshot the
              level we would have produced at this instant, reset elapsed
              and ramp from that snapshot to zero.


The Shape
---------

  Level
    1.0 ┐    ╱╲
        │   ╱  ╲
    S   │  ╱    ╲________
        │ ╱              ╲
    0.0 └╱────────────────╲──────→ samples
         │ A  │  D │  S   │  R  │
              a    a+d   rel   rel+r

    t <  a          level = t / a
    t <  a + d      level = S + (1 - S) · (1 - (t - a) / d)
    otherwise       level = S
    released        level = L0 · (1 - t / r)    until t ≥ r, then 0

`tick()` returns the level at the current sample and then advances, so the
very first tick of a note is exactly 0.0 and the first tick after release is
exactly L0.

Zero-length segments are skipped outright (the `t < a` test is never true
when a is 0), so no segment ever divides by zero.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Attack,
    Decay,
    Sustain,
    Release,
    Finished,
}

#[derive(Debug, Clone)]
pub struct Envelope {
    // Segment lengths in samples.
    attack: f32,
    decay: f32,
    sustain: f32,
    release: f32,

    elapsed: u64,
    released: bool,
    release_level: f32,
}

impl Envelope {
    /// Durations in seconds, sustain as a level in 0..1.
    ///
    /// Negative durations are treated as zero.
    pub fn new(sample_rate: f32, attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack: attack.max(0.0) * sample_rate,
            decay: decay.max(0.0) * sample_rate,
            sustain,
            release: release.max(0.0) * sample_rate,
            elapsed: 0,
            released: false,
            release_level: 0.0,
        }
    }

    /// Return the level for the current sample, then advance one sample.
    #[inline]
    pub fn tick(&mut self) -> f32 {
        let level = self.level();
        self.elapsed = self.elapsed.saturating_add(1);
        level
    }

    /// Level at the current sample without advancing.
    #[inline]
    pub fn level(&self) -> f32 {
        let t = self.elapsed as f32;

        if self.released {
            return if t >= self.release {
                0.0
            } else {
                self.release_level * (1.0 - t / self.release)
            };
        }

        if t < self.attack {
            t / self.attack
        } else if t < self.attack + self.decay {
            self.sustain + (1.0 - self.sustain) * (1.0 - (t - self.attack) / self.decay)
        } else {
            self.sustain
        }
    }

    /// Start the release ramp from wherever the envelope currently is.
    ///
    /// Calling this twice is a no-op.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.release_level = self.level();
        self.released = true;
        self.elapsed = 0;
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn stage(&self) -> EnvelopeStage {
        let t = self.elapsed as f32;
        if self.released {
            if t >= self.release {
                EnvelopeStage::Finished
            } else {
                EnvelopeStage::Release
            }
        } else if t < self.attack {
            EnvelopeStage::Attack
        } else if t < self.attack + self.decay {
            EnvelopeStage::Decay
        } else {
            EnvelopeStage::Sustain
        }
    }

    /// Fill `buffer` with consecutive ticks.
    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.tick();
        }
    }
}
