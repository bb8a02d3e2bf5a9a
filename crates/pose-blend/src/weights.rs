//! Pose weight storage and slider metadata

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Range and presentation hints for a pose weight slider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliderMeta {
    pub min: f32,
    pub max: f32,
    pub default: f32,
    pub soft_min: f32,
    pub soft_max: f32,
    pub description: String,
}

impl Default for SliderMeta {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 1.0,
            default: 0.0,
            soft_min: 0.0,
            soft_max: 1.0,
            description: "Pose weight".to_string(),
        }
    }
}

/// One weight per pose name, clamped to `[0, 1]` on write
///
/// Owned by the armature, not by the blender: other code may change weights
/// between updates, so readers should never hold on to values across ticks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightStore {
    #[serde(default)]
    values: BTreeMap<String, f32>,
    #[serde(default)]
    meta: BTreeMap<String, SliderMeta>,
}

impl WeightStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        self.values.get(name).copied()
    }

    /// Weight of `name`, zero when it has never been set
    pub fn weight(&self, name: &str) -> f32 {
        self.get(name).unwrap_or(0.0)
    }

    /// Store a clamped weight. NaN is ignored.
    pub fn set(&mut self, name: &str, value: f32) {
        if value.is_nan() {
            return;
        }
        self.values.insert(name.to_string(), value.clamp(0.0, 1.0));
    }

    /// Store a weight taken from untyped input, ignoring anything that is
    /// not a number. Returns whether the weight was written.
    pub fn set_value(&mut self, name: &str, value: &Value) -> bool {
        match value.as_f64() {
            Some(number) if !number.is_nan() => {
                self.set(name, number as f32);
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn meta(&self, name: &str) -> Option<&SliderMeta> {
        self.meta.get(name)
    }

    pub fn remove_meta(&mut self, name: &str) -> Option<SliderMeta> {
        self.meta.remove(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<f32> {
        self.values.remove(name)
    }

    /// Create the weight and its slider metadata if either is missing
    ///
    /// Returns true if anything had to be created.
    pub fn ensure_slider(&mut self, name: &str) -> bool {
        let mut created = false;
        if !self.values.contains_key(name) {
            self.values.insert(name.to_string(), SliderMeta::default().default);
            created = true;
        }
        if !self.meta.contains_key(name) {
            self.meta.insert(name.to_string(), SliderMeta::default());
            created = true;
        }
        created
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }
}
