//! Effect units.
//!
//! An effect processes a period in place and reports whether it still
//! produces sound. Every effect carries an [`EffectBase`]: enable switch,
//! dry/wet mix and a noise gate that stops the effect once its output has
//! stayed quiet for the auto-quit time. A stopped effect leaves the buffer
//! alone and returns `false` until the host restarts it on fresh input.

pub mod chain;
pub mod distenv;
pub mod noyzr;

use tracing::debug;

use crate::dsp::mix::dry_wet_levels;
use crate::engine::EngineContext;
use crate::params::{BoolParam, FloatParam, ParamInfo, Settings, SettingsNode};
use crate::Frame;

pub use chain::{effect_chain, EffectChain, EffectChainHandle};
pub use distenv::{DistEnv, DistEnvControls};
pub use noyzr::{Noyzr, NoyzrControls};

/// Effect-specific parameters, persisted as a child node of the effect.
pub trait EffectControls: Settings {
    fn node_name(&self) -> &'static str;
}

/// Controls every effect has.
#[derive(Debug, Clone)]
pub struct BaseParams {
    pub enabled: BoolParam,
    /// -1..1; negative values invert the processed signal.
    pub wet: FloatParam,
    /// Output level below which the gate counts quiet periods.
    pub gate: FloatParam,
    /// Milliseconds of quiet before the effect stops.
    pub auto_quit: FloatParam,
    pub auto_quit_disabled: BoolParam,
}

impl Default for BaseParams {
    fn default() -> Self {
        Self {
            enabled: BoolParam::new(ParamInfo::toggle("on", "Effect enabled", true)),
            wet: FloatParam::new(ParamInfo::float("wet", "Wet/Dry mix", 1.0, -1.0, 1.0, 0.01)),
            gate: FloatParam::new(ParamInfo::float("gate", "Gate", 0.0, 0.0, 1.0, 0.01)),
            auto_quit: FloatParam::new(ParamInfo::float("autoquit", "Decay", 1.0, 1.0, 8_000.0, 100.0)),
            auto_quit_disabled: BoolParam::new(ParamInfo::toggle("autoquit_disabled", "Keep running", false)),
        }
    }
}

impl Settings for BaseParams {
    fn save_settings(&self, node: &mut SettingsNode) {
        self.enabled.save(node);
        self.wet.save(node);
        self.gate.save(node);
        self.auto_quit.save(node);
        self.auto_quit_disabled.save(node);
    }

    fn load_settings(&self, node: &SettingsNode) {
        self.enabled.load(node);
        self.wet.load(node);
        self.gate.load(node);
        self.auto_quit.load(node);
        self.auto_quit_disabled.load(node);
    }
}

/// Shared state of an effect: base controls plus the gate's run state.
#[derive(Debug, Clone)]
pub struct EffectBase {
    params: BaseParams,
    running: bool,
    quiet_periods: usize,
}

impl EffectBase {
    pub fn new(params: BaseParams) -> Self {
        Self {
            params,
            running: true,
            quiet_periods: 0,
        }
    }

    pub fn params(&self) -> &BaseParams {
        &self.params
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.params.enabled.value()
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// True when `process_audio_buffer` would do work this period.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.is_enabled() && self.running
    }

    pub fn start_running(&mut self) {
        self.quiet_periods = 0;
        self.running = true;
    }

    pub fn stop_running(&mut self) {
        self.running = false;
    }

    /// `(dry, wet)` gains for this period.
    pub fn levels(&self) -> (f32, f32) {
        dry_wet_levels(self.params.wet.value())
    }

    /// Number of quiet periods tolerated before the effect stops.
    pub fn timeout(&self, ctx: &EngineContext) -> usize {
        let frames = ctx.ms_to_frames(self.params.auto_quit.value()) as usize;
        1 + frames / ctx.frames_per_period()
    }

    /// Feed the period's mean output power to the gate.
    pub fn check_gate(&mut self, ctx: &EngineContext, mean_square: f32) {
        if self.params.auto_quit_disabled.value() {
            return;
        }

        let gate = self.params.gate.value();
        if mean_square - gate * gate <= f32::EPSILON {
            self.quiet_periods += 1;
            if self.quiet_periods > self.timeout(ctx) {
                self.stop_running();
                self.quiet_periods = 0;
            }
        } else {
            self.quiet_periods = 0;
        }
    }
}

impl Default for EffectBase {
    fn default() -> Self {
        Self::new(BaseParams::default())
    }
}

pub trait Effect: Send {
    fn name(&self) -> &'static str;

    fn base(&self) -> &EffectBase;

    fn base_mut(&mut self) -> &mut EffectBase;

    fn controls(&self) -> &dyn EffectControls;

    /// Process `buffer` in place. Returns whether the effect is still
    /// running; a disabled or stopped effect returns `false` and does not
    /// touch the buffer.
    fn process_audio_buffer(&mut self, ctx: &EngineContext, buffer: &mut [Frame]) -> bool;

    fn start_running(&mut self) {
        self.base_mut().start_running();
    }

    fn save_settings(&self, node: &mut SettingsNode) {
        self.base().params().save_settings(node);
        let controls = self.controls();
        let mut child = SettingsNode::new();
        controls.save_settings(&mut child);
        node.set_child(controls.node_name(), child);
    }

    fn load_settings(&self, node: &SettingsNode) {
        self.base().params().load_settings(node);
        let controls = self.controls();
        match node.child(controls.node_name()) {
            Some(child) => controls.load_settings(&child),
            None => debug!(effect = self.name(), "no control settings, keeping current values"),
        }
    }
}
