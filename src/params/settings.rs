use serde_json::{Map, Number, Value};
use tracing::{debug, warn};

use crate::Result;

/// Units that persist their parameters as flat key/value pairs.
///
/// Loading goes through `&self`: parameters are shared cells, so a load is
/// just a batch of stores that the audio thread picks up on its next period.
pub trait Settings {
    fn save_settings(&self, node: &mut SettingsNode);
    fn load_settings(&self, node: &SettingsNode);
}

/// A flat JSON object of named values, optionally holding child objects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsNode {
    entries: Map<String, Value>,
}

impl SettingsNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document. It must be a JSON object.
    pub fn from_json(text: &str) -> Result<Self> {
        let entries: Map<String, Value> = serde_json::from_str(text)?;
        debug!(keys = entries.len(), "settings document parsed");
        Ok(Self { entries })
    }

    /// Parse a document, substituting an empty node when it is malformed.
    pub fn from_json_or_default(text: &str) -> Self {
        Self::from_json(text).unwrap_or_else(|err| {
            warn!(error = %err, "malformed settings document, using defaults");
            Self::default()
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn set_f32(&mut self, key: &str, value: f32) {
        // Non-finite floats have no JSON representation.
        let value = Number::from_f64(value as f64).map_or(Value::Null, Value::Number);
        self.entries.insert(key.to_owned(), value);
    }

    pub fn get_f32(&self, key: &str) -> Option<f32> {
        match self.entries.get(key)? {
            Value::Number(n) => n.as_f64().map(|v| v as f32),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            other => {
                debug!(key, value = %other, "setting has wrong type");
                None
            }
        }
    }

    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.entries.insert(key.to_owned(), Value::Bool(value));
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.entries.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|v| v != 0.0),
            other => {
                debug!(key, value = %other, "setting has wrong type");
                None
            }
        }
    }

    pub fn set_i32(&mut self, key: &str, value: i32) {
        self.entries.insert(key.to_owned(), Value::from(value));
    }

    pub fn get_i32(&self, key: &str) -> Option<i32> {
        match self.entries.get(key)? {
            Value::Number(n) => n
                .as_i64()
                .map(|v| v.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
                .or_else(|| n.as_f64().map(|v| v.round() as i32)),
            Value::Bool(b) => Some(*b as i32),
            other => {
                debug!(key, value = %other, "setting has wrong type");
                None
            }
        }
    }

    pub fn set_child(&mut self, key: &str, child: SettingsNode) {
        self.entries
            .insert(key.to_owned(), Value::Object(child.entries));
    }

    pub fn child(&self, key: &str) -> Option<SettingsNode> {
        match self.entries.get(key)? {
            Value::Object(entries) => Some(SettingsNode {
                entries: entries.clone(),
            }),
            _ => None,
        }
    }
}
