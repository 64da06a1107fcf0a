//! Lock-free parameters shared between a control thread and the audio thread.
//!
//! Every parameter is a cheap `Clone` handle around `Arc`ed atomic cells: the
//! UI or automation side writes through one clone, the instrument or effect
//! reads through another. Reads never block and never observe a torn value.
//!
//! A float parameter may additionally carry a [`ValueBuffer`] for the current
//! period (sample-accurate automation). DSP code does not branch on its
//! presence: it takes a [`ParamSnapshot`] once per period and asks it for the
//! value at each frame.

pub mod settings;

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use atomic_float::AtomicF32;
use tracing::debug;

pub use settings::{Settings, SettingsNode};

/// Static description of a parameter: persistence key, label, range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamInfo {
    pub key: &'static str,
    pub name: &'static str,
    pub default: f32,
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl ParamInfo {
    pub const fn float(
        key: &'static str,
        name: &'static str,
        default: f32,
        min: f32,
        max: f32,
        step: f32,
    ) -> Self {
        Self {
            key,
            name,
            default,
            min,
            max,
            step,
        }
    }

    pub const fn int(key: &'static str, name: &'static str, default: i32, min: i32, max: i32) -> Self {
        Self {
            key,
            name,
            default: default as f32,
            min: min as f32,
            max: max as f32,
            step: 1.0,
        }
    }

    pub const fn toggle(key: &'static str, name: &'static str, default: bool) -> Self {
        Self {
            key,
            name,
            default: if default { 1.0 } else { 0.0 },
            min: 0.0,
            max: 1.0,
            step: 1.0,
        }
    }

    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }
}

/// Per-sample values covering one period.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueBuffer {
    values: Vec<f32>,
}

impl ValueBuffer {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// A linear ramp of `len` values from `from` to `to`, inclusive.
    pub fn ramp(from: f32, to: f32, len: usize) -> Self {
        let values = match len {
            0 => Vec::new(),
            1 => vec![to],
            _ => (0..len)
                .map(|i| from + (to - from) * i as f32 / (len - 1) as f32)
                .collect(),
        };
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `frame`. Frames past the end hold the last value.
    #[inline]
    pub fn value(&self, frame: usize) -> Option<f32> {
        self.values
            .get(frame)
            .or_else(|| self.values.last())
            .copied()
    }
}

/// One period's view of a float parameter.
#[derive(Debug, Clone)]
pub struct ParamSnapshot {
    scalar: f32,
    buffer: Option<Arc<ValueBuffer>>,
}

impl ParamSnapshot {
    pub fn constant(value: f32) -> Self {
        Self {
            scalar: value,
            buffer: None,
        }
    }

    #[inline]
    pub fn value_at(&self, frame: usize) -> f32 {
        self.buffer
            .as_ref()
            .and_then(|b| b.value(frame))
            .unwrap_or(self.scalar)
    }

    #[inline]
    pub fn scalar(&self) -> f32 {
        self.scalar
    }

    pub fn is_automated(&self) -> bool {
        self.buffer.is_some()
    }
}

/// Continuous parameter.
#[derive(Debug, Clone)]
pub struct FloatParam {
    info: ParamInfo,
    value: Arc<AtomicF32>,
    automation: Arc<ArcSwapOption<ValueBuffer>>,
}

impl FloatParam {
    pub fn new(info: ParamInfo) -> Self {
        Self {
            info,
            value: Arc::new(AtomicF32::new(info.default)),
            automation: Arc::new(ArcSwapOption::empty()),
        }
    }

    pub fn info(&self) -> &ParamInfo {
        &self.info
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.value.load(Ordering::Acquire)
    }

    /// Store a new value, clamped to the declared range.
    pub fn set(&self, value: f32) {
        self.value.store(self.info.clamp(value), Ordering::Release);
    }

    pub fn reset(&self) {
        self.set(self.info.default);
    }

    /// Publish (or clear) sample-accurate values for the coming period.
    pub fn set_value_buffer(&self, buffer: Option<ValueBuffer>) {
        self.automation.store(buffer.map(Arc::new));
    }

    pub fn value_buffer(&self) -> Option<Arc<ValueBuffer>> {
        self.automation.load_full()
    }

    #[inline]
    pub fn snapshot(&self) -> ParamSnapshot {
        ParamSnapshot {
            scalar: self.value(),
            buffer: self.value_buffer(),
        }
    }

    pub fn save(&self, node: &mut SettingsNode) {
        node.set_f32(self.info.key, self.value());
    }

    pub fn load(&self, node: &SettingsNode) {
        match node.get_f32(self.info.key) {
            Some(value) => self.set(value),
            None => debug!(key = self.info.key, "setting missing, keeping current value"),
        }
    }
}

/// On/off parameter.
#[derive(Debug, Clone)]
pub struct BoolParam {
    info: ParamInfo,
    value: Arc<AtomicBool>,
}

impl BoolParam {
    pub fn new(info: ParamInfo) -> Self {
        Self {
            info,
            value: Arc::new(AtomicBool::new(info.default != 0.0)),
        }
    }

    pub fn info(&self) -> &ParamInfo {
        &self.info
    }

    #[inline]
    pub fn value(&self) -> bool {
        self.value.load(Ordering::Acquire)
    }

    pub fn set(&self, value: bool) {
        self.value.store(value, Ordering::Release);
    }

    pub fn save(&self, node: &mut SettingsNode) {
        node.set_bool(self.info.key, self.value());
    }

    pub fn load(&self, node: &SettingsNode) {
        match node.get_bool(self.info.key) {
            Some(value) => self.set(value),
            None => debug!(key = self.info.key, "setting missing, keeping current value"),
        }
    }
}

/// Discrete parameter (selectors, voice counts).
#[derive(Debug, Clone)]
pub struct IntParam {
    info: ParamInfo,
    value: Arc<AtomicI32>,
}

impl IntParam {
    pub fn new(info: ParamInfo) -> Self {
        Self {
            info,
            value: Arc::new(AtomicI32::new(info.default as i32)),
        }
    }

    pub fn info(&self) -> &ParamInfo {
        &self.info
    }

    #[inline]
    pub fn value(&self) -> i32 {
        self.value.load(Ordering::Acquire)
    }

    pub fn set(&self, value: i32) {
        let clamped = value.clamp(self.info.min as i32, self.info.max as i32);
        self.value.store(clamped, Ordering::Release);
    }

    pub fn save(&self, node: &mut SettingsNode) {
        node.set_i32(self.info.key, self.value());
    }

    pub fn load(&self, node: &SettingsNode) {
        match node.get_i32(self.info.key) {
            Some(value) => self.set(value),
            None => debug!(key = self.info.key, "setting missing, keeping current value"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAIN: ParamInfo = ParamInfo::float("gain", "Gain", 100.0, 0.0, 200.0, 1.0);

    #[test]
    fn clones_share_the_same_cell() {
        let ui = FloatParam::new(GAIN);
        let audio = ui.clone();
        ui.set(150.0);
        assert_eq!(audio.value(), 150.0);
    }

    #[test]
    fn set_clamps_to_range() {
        let param = FloatParam::new(GAIN);
        param.set(500.0);
        assert_eq!(param.value(), 200.0);
        param.set(-1.0);
        assert_eq!(param.value(), 0.0);
        param.reset();
        assert_eq!(param.value(), 100.0);
    }

    #[test]
    fn snapshot_prefers_value_buffer() {
        let param = FloatParam::new(GAIN);
        param.set(50.0);
        assert_eq!(param.snapshot().value_at(3), 50.0);
        assert!(!param.snapshot().is_automated());

        param.set_value_buffer(Some(ValueBuffer::ramp(0.0, 30.0, 4)));
        let snapshot = param.snapshot();
        assert!(snapshot.is_automated());
        assert_eq!(snapshot.value_at(0), 0.0);
        assert_eq!(snapshot.value_at(3), 30.0);
        // Past the end the last value holds.
        assert_eq!(snapshot.value_at(10), 30.0);

        param.set_value_buffer(None);
        assert_eq!(param.snapshot().value_at(0), 50.0);
    }

    #[test]
    fn empty_value_buffer_falls_back_to_scalar() {
        let param = FloatParam::new(GAIN);
        param.set_value_buffer(Some(ValueBuffer::new(Vec::new())));
        assert_eq!(param.snapshot().value_at(0), 100.0);
    }

    #[test]
    fn int_param_clamps() {
        let param = IntParam::new(ParamInfo::int("LP", "Low-pass type", 0, 0, 2));
        param.set(7);
        assert_eq!(param.value(), 2);
    }

    #[test]
    fn toggle_default() {
        let on = BoolParam::new(ParamInfo::toggle("on", "Enabled", true));
        let off = BoolParam::new(ParamInfo::toggle("HPactive", "HP active", false));
        assert!(on.value());
        assert!(!off.value());
    }
}
