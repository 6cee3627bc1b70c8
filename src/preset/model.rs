//! Preset definitions.
//!
//! A preset is one node of the authored taxonomy. Presets reference each other
//! by key only; the [`PresetCollection`](super::PresetCollection) owns them.

use super::properties::{PropertySheet, PropertyValue};
use crate::types::{ObjectType, Scope};
use serde::{Deserialize, Serialize};

/// A keyed preset node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Preset {
    /// Unique key within the collection.
    pub key: String,

    /// Schema node type this preset was authored against.
    #[serde(default)]
    pub node_type: String,

    #[serde(default)]
    pub display_name: String,

    /// Node scope. Must be defined for the preset to compile.
    #[serde(default)]
    pub scope: Scope,

    #[serde(default)]
    pub object_type: ObjectType,

    /// Category path such as `Part_0FlexDims3Fixed/Door`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_path: Option<String>,

    #[serde(default)]
    pub properties: PropertySheet,

    /// Child presets in pin order.
    #[serde(default)]
    pub children: Vec<PinAttachment>,

    /// Part-slot declarations.
    #[serde(default)]
    pub parts: Vec<PartSlot>,

    /// Slot configuration that positions this preset's parts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_config: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<String>,

    #[serde(default)]
    pub materials: Vec<MaterialBinding>,
}

impl Preset {
    pub fn new(key: impl Into<String>, scope: Scope) -> Self {
        Self {
            key: key.into(),
            scope,
            ..Default::default()
        }
    }

    pub fn with_object_type(mut self, object_type: ObjectType) -> Self {
        self.object_type = object_type;
        self
    }

    pub fn with_node_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = node_type.into();
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_property(
        mut self,
        scope: Scope,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.properties.set(scope, name, value);
        self
    }

    /// Attach a child on the default pin.
    pub fn with_child(mut self, key: impl Into<String>) -> Self {
        let position = self.children.len();
        self.children.push(PinAttachment::new(key).at(0, position));
        self
    }

    pub fn with_pin(mut self, pin: PinAttachment) -> Self {
        self.children.push(pin);
        self
    }

    pub fn with_part(mut self, slot: impl Into<String>, part: impl Into<String>) -> Self {
        self.parts.push(PartSlot {
            slot: slot.into(),
            part: part.into(),
        });
        self
    }

    pub fn with_slot_config(mut self, key: impl Into<String>) -> Self {
        self.slot_config = Some(key.into());
        self
    }

    pub fn with_mesh(mut self, key: impl Into<String>) -> Self {
        self.mesh = Some(key.into());
        self
    }

    pub fn with_material(mut self, binding: MaterialBinding) -> Self {
        self.materials.push(binding);
        self
    }

    /// Mesh key from the `mesh` field or a `Mesh.AssetID` property.
    pub fn mesh_key(&self) -> Option<String> {
        self.mesh
            .clone()
            .filter(|m| !m.is_empty())
            .or_else(|| self.properties.text(Scope::Mesh, "AssetID"))
    }

    /// Display name, falling back to the key.
    pub fn name(&self) -> &str {
        if self.display_name.is_empty() {
            &self.key
        } else {
            &self.display_name
        }
    }

    /// Keys of every preset this one references directly.
    pub fn referenced_keys(&self) -> impl Iterator<Item = &str> {
        self.children
            .iter()
            .map(|c| c.preset.as_str())
            .chain(
                self.parts
                    .iter()
                    .flat_map(|p| [p.slot.as_str(), p.part.as_str()]),
            )
            .chain(self.slot_config.as_deref())
            .filter(|k| !k.is_empty())
    }
}

/// Layer-target override declared on a child pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PinTarget {
    #[default]
    Default,
    Tread,
    Riser,
    Cabinet,
}

/// A child preset attached to one position of a pin set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinAttachment {
    pub preset: String,
    #[serde(default)]
    pub pin_set: usize,
    #[serde(default)]
    pub position: usize,
    #[serde(default)]
    pub target: PinTarget,
}

impl PinAttachment {
    pub fn new(preset: impl Into<String>) -> Self {
        Self {
            preset: preset.into(),
            pin_set: 0,
            position: 0,
            target: PinTarget::Default,
        }
    }

    pub fn at(mut self, pin_set: usize, position: usize) -> Self {
        self.pin_set = pin_set;
        self.position = position;
        self
    }

    pub fn with_target(mut self, target: PinTarget) -> Self {
        self.target = target;
        self
    }
}

/// A part bound to a named slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartSlot {
    /// Slot preset key.
    pub slot: String,
    /// Part preset key.
    pub part: String,
}

/// Material assigned to a named mesh channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialBinding {
    pub channel: String,
    pub material: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl MaterialBinding {
    pub fn new(channel: impl Into<String>, material: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            material: material.into(),
            color: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}
