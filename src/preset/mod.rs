//! Preset loading and storage.
//!
//! This module handles loading preset packs (ZIP files or directories) and
//! holds the preset graph the assembly compiler walks.

pub mod loader;
pub mod model;
pub mod properties;
pub mod schema;

pub use model::{MaterialBinding, PartSlot, PinAttachment, PinTarget, Preset};
pub use properties::{PropertyKey, PropertySheet, PropertyValue};
pub use schema::{NodeTypeDef, PinSetDef, PresetSchema};

use crate::database::ObjectDatabase;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Synchronous lookup of presets by key.
pub trait PresetLookup {
    fn preset(&self, key: &str) -> Option<&Preset>;
}

/// All presets of a document, owned by key.
#[derive(Debug, Default, Clone)]
pub struct PresetCollection {
    presets: BTreeMap<String, Preset>,
}

impl PresetCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a preset, returning the one it replaced.
    pub fn add(&mut self, preset: Preset) -> Option<Preset> {
        self.presets.insert(preset.key.clone(), preset)
    }

    pub fn get(&self, key: &str) -> Option<&Preset> {
        self.presets.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.presets.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Preset> {
        self.presets.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Preset> {
        self.presets.values()
    }

    pub fn preset_count(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Fill undefined scopes and object types from the schema.
    pub fn apply_schema(&mut self, schema: &PresetSchema) {
        for preset in self.presets.values_mut() {
            schema.apply_defaults(preset);
        }
    }

    /// Every preset reachable from `key` through children, parts and slot
    /// configurations, in breadth-first order. Missing keys are included;
    /// `key` itself is not.
    pub fn dependents(&self, key: &str) -> Vec<String> {
        let mut seen = BTreeSet::from([key.to_string()]);
        let mut queue = VecDeque::from([key.to_string()]);
        let mut out = Vec::new();

        while let Some(current) = queue.pop_front() {
            let Some(preset) = self.get(&current) else {
                continue;
            };
            for next in preset.referenced_keys() {
                if seen.insert(next.to_string()) {
                    out.push(next.to_string());
                    queue.push_back(next.to_string());
                }
            }
        }

        out
    }
}

impl PresetLookup for PresetCollection {
    fn preset(&self, key: &str) -> Option<&Preset> {
        self.get(key)
    }
}

impl FromIterator<Preset> for PresetCollection {
    fn from_iter<I: IntoIterator<Item = Preset>>(iter: I) -> Self {
        let mut collection = Self::new();
        for preset in iter {
            collection.add(preset);
        }
        collection
    }
}

/// Everything a preset pack provides.
#[derive(Debug, Default, Clone)]
pub struct PresetPack {
    pub schema: PresetSchema,
    pub presets: PresetCollection,
    pub database: ObjectDatabase,
}

impl PresetPack {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Scope;

    #[test]
    fn test_dependents() {
        let presets: PresetCollection = [
            Preset::new("Door", Scope::Assembly)
                .with_child("Frame")
                .with_part("SlotPanel", "Panel")
                .with_slot_config("DoorSlots"),
            Preset::new("Frame", Scope::Part).with_child("Oak"),
            Preset::new("Panel", Scope::Part).with_child("Oak"),
            Preset::new("Oak", Scope::RawMaterial),
            Preset::new("Loop", Scope::Part).with_child("Door"),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            presets.dependents("Door"),
            vec!["Frame", "SlotPanel", "Panel", "DoorSlots", "Oak"]
        );
        assert_eq!(presets.dependents("Loop").len(), 6);
        assert!(presets.dependents("Missing").is_empty());
    }

    #[test]
    fn test_lookup() {
        let mut presets = PresetCollection::new();
        assert!(presets.add(Preset::new("A", Scope::Layer)).is_none());
        assert!(presets.add(Preset::new("A", Scope::Module)).is_some());
        assert_eq!(presets.preset("A").map(|p| p.scope), Some(Scope::Module));
        assert_eq!(presets.preset_count(), 1);
    }
}
