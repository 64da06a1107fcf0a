//! Multiplicative noise: every sample is scaled by `1 + amount · n`, with a
//! fresh draw of `n ∈ [-1, 1)` per channel.

use crate::dsp::NoiseSource;
use crate::engine::EngineContext;
use crate::params::{FloatParam, ParamInfo, Settings, SettingsNode};
use crate::Frame;

use super::{BaseParams, Effect, EffectBase, EffectControls};

#[derive(Debug, Clone)]
pub struct NoyzrControls {
    pub amount: FloatParam,
}

impl Default for NoyzrControls {
    fn default() -> Self {
        Self {
            amount: FloatParam::new(ParamInfo::float("NoiseAmt", "Noise amount", 0.0, 0.0, 1.0, 0.001)),
        }
    }
}

impl Settings for NoyzrControls {
    fn save_settings(&self, node: &mut SettingsNode) {
        self.amount.save(node);
    }

    fn load_settings(&self, node: &SettingsNode) {
        self.amount.load(node);
    }
}

impl EffectControls for NoyzrControls {
    fn node_name(&self) -> &'static str {
        "NoyzrControls"
    }
}

pub struct Noyzr {
    base: EffectBase,
    controls: NoyzrControls,
    noise: NoiseSource,
}

impl Noyzr {
    pub fn new(base: BaseParams, controls: NoyzrControls, seed: u64) -> Self {
        Self {
            base: EffectBase::new(base),
            controls,
            noise: NoiseSource::new(seed),
        }
    }

    pub fn params(&self) -> &NoyzrControls {
        &self.controls
    }
}

impl Default for Noyzr {
    fn default() -> Self {
        Self::new(BaseParams::default(), NoyzrControls::default(), 0x0001_5E42)
    }
}

impl Effect for Noyzr {
    fn name(&self) -> &'static str {
        "Noyzr"
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

    fn process_audio_buffer(&mut self, ctx: &EngineContext, buffer: &mut [Frame]) -> bool {
        if !self.base.is_active() {
            return false;
        }
        if buffer.is_empty() {
            return true;
        }

        let amount = self.controls.amount.value();
        let mut power = 0.0f64;
        for frame in buffer.iter_mut() {
            frame[0] *= 1.0 + amount * self.noise.next_bipolar();
            frame[1] *= 1.0 + amount * self.noise.next_bipolar();
            power += (frame[0] * frame[0] + frame[1] * frame[1]) as f64;
        }

        self.base
            .check_gate(ctx, (power / buffer.len() as f64) as f32);
        self.base.is_running()
    }
}
