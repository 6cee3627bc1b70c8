//! Part-slot specifications for rigged assemblies.

use crate::database::{Material, Mesh};
use crate::expression::VectorExpression;
use crate::preset::{Preset, PropertySheet};
use crate::types::{Scope, AXES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fallback values (world centimeters) for named dimensions a formula
/// references but no slot provides.
const DEFAULT_NAMED_DIMENSIONS: &[(&str, f32)] = &[
    ("BevelWidth", 0.0),
    ("Clearance", 0.3175),
    ("DoorCasingDepth", 1.905),
    ("DoorCasingWidth", 6.985),
    ("HingeInset", 0.3175),
    ("JambThickness", 1.905),
    ("Overhang", 0.0),
    ("PanelThickness", 1.905),
    ("PartSizeX", 0.0),
    ("PartSizeY", 0.0),
    ("PartSizeZ", 0.0),
    ("Reveal", 0.3175),
    ("StopDepth", 1.27),
    ("ToeKickDepth", 7.62),
    ("ToeKickHeight", 10.16),
];

/// Look up a named dimension in the fallback table.
pub fn default_named_dimension(name: &str) -> Option<f32> {
    DEFAULT_NAMED_DIMENSIONS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| *v)
}

/// One node of the flattened part tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartSlotSpec {
    /// Index of the parent slot. `None` only for the root slot.
    pub parent: Option<usize>,
    /// Identifier used by formula paths (`Parent.Frame.JambSizeX`).
    pub slot_id: String,
    pub preset_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<Mesh>,
    /// Channel name to resolved material.
    #[serde(default)]
    pub channel_materials: BTreeMap<String, Material>,
    pub translation: VectorExpression,
    pub orientation: VectorExpression,
    pub size: VectorExpression,
    pub flip: [bool; 3],
    /// Named dimension overrides in world centimeters.
    #[serde(default)]
    pub named_dimensions: BTreeMap<String, f32>,
}

impl PartSlotSpec {
    /// A slot positioned at its parent's origin and sized by its mesh.
    pub fn new(preset_key: impl Into<String>, parent: Option<usize>) -> Self {
        Self {
            parent,
            slot_id: String::new(),
            preset_key: preset_key.into(),
            slot_key: None,
            mesh: None,
            channel_materials: BTreeMap::new(),
            translation: VectorExpression::zero(),
            orientation: VectorExpression::zero(),
            size: VectorExpression::self_reference("NativeSize"),
            flip: [false; 3],
            named_dimensions: BTreeMap::new(),
        }
    }

    /// The synthetic root slot that parents every top-level part.
    pub fn root(preset_key: impl Into<String>) -> Self {
        Self {
            size: VectorExpression::self_reference("ScaledSize"),
            ..Self::new(preset_key, None)
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Read named dimensions from every `Dimension` property of a preset.
    pub fn read_named_dimensions(&mut self, preset: &Preset) {
        for (name, _) in preset.properties.scope(Scope::Dimension) {
            if let Some(value) = preset.properties.dimension_cm(Scope::Dimension, name) {
                self.named_dimensions.insert(name.to_string(), value);
            }
        }
    }

    /// Read transform formulas and flips from a slot preset's `Slot` properties.
    ///
    /// Missing cells are blank and evaluate to zero.
    pub fn read_slot_transform(&mut self, slot: &PropertySheet) {
        let triple = |prefix: &str| {
            let [x, y, z] = AXES.map(|axis| {
                slot.text(Scope::Slot, &format!("{}{}", prefix, axis))
                    .unwrap_or_default()
            });
            VectorExpression { x, y, z }
        };

        self.translation = triple("Location");
        self.orientation = triple("Rotation");
        self.size = triple("Size");
        self.flip = AXES.map(|axis| slot.flag(Scope::Slot, &format!("Flip{}", axis)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let root = PartSlotSpec::root("Door");
        assert!(root.is_root());
        assert_eq!(root.size.x, "Self.ScaledSizeX");
        assert_eq!(root.translation, VectorExpression::zero());

        let part = PartSlotSpec::new("Hinge", Some(0));
        assert_eq!(part.size.z, "Self.NativeSizeZ");
    }

    #[test]
    fn test_read_slot_transform() {
        let mut sheet = PropertySheet::new();
        sheet.set(Scope::Slot, "LocationX", "Parent.NativeSizeX * 0.5");
        sheet.set(Scope::Slot, "SizeY", "Self.NativeSizeY");
        sheet.set(Scope::Slot, "FlipX", "1");
        sheet.set(Scope::Slot, "FlipZ", "false");

        let mut part = PartSlotSpec::new("Handle", Some(0));
        part.read_slot_transform(&sheet);
        assert_eq!(part.translation.x, "Parent.NativeSizeX * 0.5");
        assert_eq!(part.translation.y, "");
        assert_eq!(part.size.y, "Self.NativeSizeY");
        assert_eq!(part.flip, [true, false, false]);
    }

    #[test]
    fn test_named_dimensions() {
        let preset = Preset::new("Panel", Scope::Part)
            .with_property(Scope::Dimension, "JambThickness", "1in")
            .with_property(Scope::Dimension, "Style", "Shaker")
            .with_property(Scope::Layer, "Width", 4.0);
        let mut part = PartSlotSpec::new("Panel", Some(0));
        part.read_named_dimensions(&preset);
        assert_eq!(part.named_dimensions.len(), 1);
        approx::assert_relative_eq!(part.named_dimensions["JambThickness"], 2.54);

        assert_eq!(default_named_dimension("Reveal"), Some(0.3175));
        assert_eq!(default_named_dimension("Banana"), None);
    }
}
