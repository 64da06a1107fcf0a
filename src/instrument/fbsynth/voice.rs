use crate::dsp::{Envelope, NoiseSource, RingBuffer};
use crate::params::ParamSnapshot;
use crate::Frame;

use super::filter_bank::{BankSettings, FilterBank};

/// Envelope times (seconds) and sustain level captured at note-on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpulseShape {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

/// Per-note state of the feedback-delay voice.
///
/// A noise burst shaped by the impulse envelope is injected into a delay
/// line one note period long; the line's output runs through the filter bank
/// and is fed back, scaled so the loop decays over the feedback decay time.
pub struct FbVoice {
    ring: RingBuffer,
    filter: FilterBank,
    envelope: Envelope,
    noise: NoiseSource,
}

impl FbVoice {
    pub fn new(sample_rate: f32, impulse: ImpulseShape, seed: u64) -> Self {
        Self {
            ring: RingBuffer::with_duration(sample_rate, 2.0),
            filter: FilterBank::new(sample_rate),
            envelope: Envelope::new(
                sample_rate,
                impulse.attack,
                impulse.decay,
                impulse.sustain,
                impulse.release,
            ),
            noise: NoiseSource::new(seed),
        }
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Render `out.len()` frames of a note at `frequency` Hz.
    ///
    /// `decay` is the feedback decay time in seconds and `impulse_add` the
    /// total impulse weight in the output; both may be automated per frame.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        out: &mut [Frame],
        frequency: f32,
        sample_rate: f32,
        releasing: bool,
        decay: &ParamSnapshot,
        impulse_add: &ParamSnapshot,
        bank: &BankSettings,
    ) {
        self.filter.begin_period(out.len(), bank);
        let delay = -(sample_rate / frequency);

        for (f, frame) in out.iter_mut().enumerate() {
            // A loop shorter than one cycle would need a negative feedback
            // factor; hold it at zero instead.
            let decay_per_cycle = (frequency * decay.value_at(f)).max(1.0);
            let impulse_gain = 0.5 / decay_per_cycle.sqrt();
            let dry_impulse = impulse_add.value_at(f) - 1.0;
            let feedback = 1.0 - 1.0 / decay_per_cycle;

            let delayed = self.ring.read_frame(delay);
            let mut sample = self.filter.apply(delayed);

            if releasing && !self.envelope.is_released() {
                self.envelope.release();
            }
            let impulse = impulse_gain * self.envelope.tick() * self.noise.next_bipolar();

            sample[0] = sample[0] * feedback + impulse;
            sample[1] = sample[1] * feedback + impulse;

            self.ring.write(&[sample], 0);
            self.ring.move_position(1);

            frame[0] = sample[0] + dry_impulse * impulse;
            frame[1] = sample[1] + dry_impulse * impulse;
        }
    }
}
