//! Node-type declarations.
//!
//! The schema is an immutable value built once (from a pack's `schema.json`
//! or in code) and passed by reference to whatever needs it.

use super::{Preset, PresetCollection};
use crate::types::{ObjectType, Scope};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cardinality of one pin set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PinSetDef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub min_count: usize,
    /// `None` means unbounded.
    #[serde(default)]
    pub max_count: Option<usize>,
}

/// Declaration of a node type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTypeDef {
    pub name: String,
    pub scope: Scope,
    #[serde(default)]
    pub object_type: ObjectType,
    #[serde(default)]
    pub pin_sets: Vec<PinSetDef>,
}

impl NodeTypeDef {
    pub fn new(name: impl Into<String>, scope: Scope) -> Self {
        Self {
            name: name.into(),
            scope,
            object_type: ObjectType::None,
            pin_sets: Vec::new(),
        }
    }

    pub fn with_object_type(mut self, object_type: ObjectType) -> Self {
        self.object_type = object_type;
        self
    }

    pub fn with_pin_set(mut self, name: impl Into<String>, min_count: usize, max_count: Option<usize>) -> Self {
        self.pin_sets.push(PinSetDef {
            name: name.into(),
            min_count,
            max_count,
        });
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresetSchema {
    #[serde(default, with = "node_type_list")]
    node_types: BTreeMap<String, NodeTypeDef>,
}

impl PresetSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node_type(mut self, def: NodeTypeDef) -> Self {
        self.add_node_type(def);
        self
    }

    pub fn add_node_type(&mut self, def: NodeTypeDef) {
        self.node_types.insert(def.name.clone(), def);
    }

    pub fn node_type(&self, name: &str) -> Option<&NodeTypeDef> {
        self.node_types.get(name)
    }

    pub fn node_type_count(&self) -> usize {
        self.node_types.len()
    }

    /// Fill an undefined scope or object type from the preset's node type.
    pub fn apply_defaults(&self, preset: &mut Preset) {
        let Some(def) = self.node_type(&preset.node_type) else {
            return;
        };
        if !preset.scope.is_defined() {
            preset.scope = def.scope;
        }
        if preset.object_type.is_none() {
            preset.object_type = def.object_type;
        }
    }

    /// Check every preset against its node type. Returns one message per problem.
    pub fn validate(&self, presets: &PresetCollection) -> Vec<String> {
        let mut problems = Vec::new();

        for preset in presets.iter() {
            if preset.node_type.is_empty() {
                continue;
            }
            let Some(def) = self.node_type(&preset.node_type) else {
                problems.push(format!(
                    "Preset {} has unknown node type {}",
                    preset.key, preset.node_type
                ));
                continue;
            };

            let mut counts = vec![0usize; def.pin_sets.len()];
            for child in &preset.children {
                match counts.get_mut(child.pin_set) {
                    Some(count) => *count += 1,
                    None => problems.push(format!(
                        "Preset {} attaches {} to undeclared pin set {}",
                        preset.key, child.preset, child.pin_set
                    )),
                }
            }

            for (pin_set, count) in def.pin_sets.iter().zip(counts) {
                if count < pin_set.min_count {
                    problems.push(format!(
                        "Preset {} pin set {} has {} children, needs at least {}",
                        preset.key, pin_set.name, count, pin_set.min_count
                    ));
                }
                if let Some(max) = pin_set.max_count {
                    if count > max {
                        problems.push(format!(
                            "Preset {} pin set {} has {} children, allows at most {}",
                            preset.key, pin_set.name, count, max
                        ));
                    }
                }
            }
        }

        problems
    }
}

/// `schema.json` lists node types as an array.
mod node_type_list {
    use super::NodeTypeDef;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<String, NodeTypeDef>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let list: Vec<&NodeTypeDef> = map.values().collect();
        list.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, NodeTypeDef>, D::Error> {
        let list = Vec::<NodeTypeDef>::deserialize(deserializer)?;
        Ok(list.into_iter().map(|d| (d.name.clone(), d)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_schema() -> PresetSchema {
        PresetSchema::new()
            .with_node_type(
                NodeTypeDef::new("WallAssembly", Scope::Assembly)
                    .with_object_type(ObjectType::Wall)
                    .with_pin_set("Layers", 1, None),
            )
            .with_node_type(NodeTypeDef::new("Layer", Scope::Layer).with_pin_set("Color", 0, Some(1)))
    }

    #[test]
    fn test_apply_defaults() {
        let schema = create_test_schema();
        let mut preset = Preset::new("Wall", Scope::None).with_node_type("WallAssembly");
        schema.apply_defaults(&mut preset);
        assert_eq!(preset.scope, Scope::Assembly);
        assert_eq!(preset.object_type, ObjectType::Wall);

        let mut explicit = Preset::new("Layer", Scope::Module).with_node_type("Layer");
        schema.apply_defaults(&mut explicit);
        assert_eq!(explicit.scope, Scope::Module);
    }

    #[test]
    fn test_validate_pin_counts() {
        let schema = create_test_schema();
        let mut presets = PresetCollection::new();
        presets.add(Preset::new("Wall", Scope::Assembly).with_node_type("WallAssembly"));
        presets.add(
            Preset::new("Layer", Scope::Layer)
                .with_node_type("Layer")
                .with_child("Red")
                .with_child("Blue"),
        );
        presets.add(Preset::new("Odd", Scope::Layer).with_node_type("Mystery"));
        presets.add(Preset::new("Untyped", Scope::Color));

        let problems = schema.validate(&presets);
        assert_eq!(problems.len(), 3, "{:?}", problems);
        assert!(problems.iter().any(|p| p.contains("Mystery")));
        assert!(problems.iter().any(|p| p.contains("at least 1")));
        assert!(problems.iter().any(|p| p.contains("at most 1")));
    }

    #[test]
    fn test_schema_json() {
        let json = r#"{ "node_types": [
            { "name": "Door", "scope": "Assembly", "object_type": "Door",
              "pin_sets": [ { "name": "Parts", "min_count": 0, "max_count": 4 } ] }
        ] }"#;
        let schema: PresetSchema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.node_type_count(), 1);
        assert_eq!(schema.node_type("Door").unwrap().pin_sets[0].max_count, Some(4));
    }
}
