/*
Envelope-Following Distortion
=============================

Each sample is bent by a power law and then given back the dynamics the
power law took away, scaled by how much of the envelope we want to keep:

    y = sign(x)·|x|^ratio · env^((1 - ratio)·amount) · gain

With ratio = 1 the effect is a plain gain. Lower ratios compress the
waveform toward a square; amount = 1 restores the original loudness
contour, amount = 0 leaves it flattened.

The envelope follows the detector level (RMS of both channels, or their
peak) with linear slew: it moves toward the target by at most
`delta / (time · sr)` per sample, attack time while rising and release time
while falling.
*/

use crate::dsp::distortion::{signed_pow, DetectorMode, EnvelopeFollower};
use crate::dsp::mix::blend_frame;
use crate::engine::EngineContext;
use crate::params::{FloatParam, IntParam, ParamInfo, Settings, SettingsNode};
use crate::Frame;

use super::{BaseParams, Effect, EffectBase, EffectControls};

#[derive(Debug, Clone)]
pub struct DistEnvControls {
    pub ratio: FloatParam,
    pub env_amount: FloatParam,
    /// Milliseconds.
    pub attack: FloatParam,
    /// Milliseconds.
    pub release: FloatParam,
    pub mode: IntParam,
    /// Percent.
    pub gain: FloatParam,
}

impl Default for DistEnvControls {
    fn default() -> Self {
        Self {
            ratio: FloatParam::new(ParamInfo::float("ratio", "Ratio", 1.0, 0.01, 1.0, 0.01)),
            env_amount: FloatParam::new(ParamInfo::float("envamt", "Envelope amount", 0.0, 0.0, 1.0, 0.01)),
            attack: FloatParam::new(ParamInfo::float("att", "Attack", 10.0, 0.0, 2_000.0, 1.0)),
            release: FloatParam::new(ParamInfo::float("rel", "Release", 100.0, 0.0, 2_000.0, 1.0)),
            mode: IntParam::new(ParamInfo::int("envmode", "Envelope mode", 0, 0, 2)),
            gain: FloatParam::new(ParamInfo::float("gain", "Gain", 100.0, 0.0, 200.0, 0.1)),
        }
    }
}

impl Settings for DistEnvControls {
    fn save_settings(&self, node: &mut SettingsNode) {
        self.ratio.save(node);
        self.env_amount.save(node);
        self.attack.save(node);
        self.release.save(node);
        self.mode.save(node);
        self.gain.save(node);
    }

    fn load_settings(&self, node: &SettingsNode) {
        self.ratio.load(node);
        self.env_amount.load(node);
        self.attack.load(node);
        self.release.load(node);
        self.mode.load(node);
        self.gain.load(node);
    }
}

impl EffectControls for DistEnvControls {
    fn node_name(&self) -> &'static str {
        "DistEnvControls"
    }
}

pub struct DistEnv {
    base: EffectBase,
    controls: DistEnvControls,
    follower: EnvelopeFollower,
}

impl DistEnv {
    pub fn new(base: BaseParams, controls: DistEnvControls) -> Self {
        Self {
            base: EffectBase::new(base),
            controls,
            follower: EnvelopeFollower::new(),
        }
    }

    pub fn params(&self) -> &DistEnvControls {
        &self.controls
    }

    pub fn envelope_level(&self) -> f32 {
        self.follower.level()
    }
}

impl Default for DistEnv {
    fn default() -> Self {
        Self::new(BaseParams::default(), DistEnvControls::default())
    }
}

impl Effect for DistEnv {
    fn name(&self) -> &'static str {
        "DistEnv"
    }

    fn base(&self) -> &EffectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EffectBase {
        &mut self.base
    }

    fn controls(&self) -> &dyn EffectControls {
        &self.controls
    }

    fn start_running(&mut self) {
        // A stopped effect comes back without the envelope of its last signal.
        if !self.base.is_running() {
            self.follower.reset();
        }
        self.base.start_running();
    }

    fn process_audio_buffer(&mut self, ctx: &EngineContext, buffer: &mut [Frame]) -> bool {
        if !self.base.is_active() {
            return false;
        }
        if buffer.is_empty() {
            return true;
        }

        let (dry, wet) = self.base.levels();
        let frames_per_ms = ctx.sample_rate() / 1000.0;
        let mode = DetectorMode::from_index(self.controls.mode.value());

        let ratio = self.controls.ratio.snapshot();
        let amount = self.controls.env_amount.snapshot();
        let attack = self.controls.attack.snapshot();
        let release = self.controls.release.snapshot();
        let gain = self.controls.gain.snapshot();

        let mut power = 0.0f64;
        for (f, frame) in buffer.iter_mut().enumerate() {
            let ratio = ratio.value_at(f);
            let env = self.follower.follow(
                mode.level(*frame),
                attack.value_at(f) * frames_per_ms,
                release.value_at(f) * frames_per_ms,
            );
            let shape = env.powf((1.0 - ratio) * amount.value_at(f)) * gain.value_at(f) * 0.01;

            let processed = [
                signed_pow(frame[0], ratio) * shape,
                signed_pow(frame[1], ratio) * shape,
            ];
            *frame = blend_frame(*frame, processed, dry, wet);
            power += (frame[0] * frame[0] + frame[1] * frame[1]) as f64;
        }

        self.base
            .check_gate(ctx, (power / buffer.len() as f64) as f32);
        self.base.is_running()
    }
}
