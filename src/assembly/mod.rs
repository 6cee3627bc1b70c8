//! Compiled assembly specifications.
//!
//! [`AssemblySpec`] is the flat, typed output of compiling one root preset:
//! ordered layers, extrusions and a parent-before-child part list.

pub mod compiler;
pub mod extrusion;
pub mod layer;
pub mod part;

pub use compiler::{compile_assembly, AssemblyCompiler, CompilerConfig};
pub use extrusion::ExtrusionSpec;
pub use layer::{LayerGap, LayerModule, LayerSpec};
pub use part::{default_named_dimension, PartSlotSpec};

use crate::preset::{MaterialBinding, PropertySheet};
use crate::types::{ObjectType, Scope, UnitValue};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Which layer list a layer preset lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerList {
    Main,
    Tread,
    Riser,
}

/// Compiled specification of one building element.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AssemblySpec {
    pub preset_key: String,
    pub display_name: String,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub code_name: String,
    pub object_type: ObjectType,
    pub root_properties: PropertySheet,
    pub layers: Vec<LayerSpec>,
    #[serde(default)]
    pub tread_layers: Vec<LayerSpec>,
    #[serde(default)]
    pub riser_layers: Vec<LayerSpec>,
    pub extrusions: Vec<ExtrusionSpec>,
    /// Flattened part tree; every part's parent precedes it.
    pub parts: Vec<PartSlotSpec>,
    #[serde(default)]
    pub material_bindings: Vec<MaterialBinding>,
    /// Cabinet panel depth formula from the slot configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conceptual_size_y: Option<String>,
    pub tread_depth_cm: f32,
    pub toe_kick_depth_cm: f32,
    pub toe_kick_height_cm: f32,
    /// Placement axes of a single-mesh rigged assembly.
    #[serde(default = "default_normal")]
    pub normal: Vec3,
    #[serde(default = "default_tangent")]
    pub tangent: Vec3,
    #[serde(default)]
    pub z_align: bool,
}

fn default_normal() -> Vec3 {
    Vec3::Z
}

fn default_tangent() -> Vec3 {
    Vec3::X
}

impl AssemblySpec {
    pub fn new(preset_key: impl Into<String>) -> Self {
        Self {
            preset_key: preset_key.into(),
            normal: default_normal(),
            tangent: default_tangent(),
            ..Default::default()
        }
    }

    /// Display name, falling back to the root preset key.
    pub fn name(&self) -> &str {
        if self.display_name.is_empty() {
            &self.preset_key
        } else {
            &self.display_name
        }
    }

    pub fn layer_list(&self, list: LayerList) -> &[LayerSpec] {
        match list {
            LayerList::Main => &self.layers,
            LayerList::Tread => &self.tread_layers,
            LayerList::Riser => &self.riser_layers,
        }
    }

    pub fn layer_list_mut(&mut self, list: LayerList) -> &mut Vec<LayerSpec> {
        match list {
            LayerList::Main => &mut self.layers,
            LayerList::Tread => &mut self.tread_layers,
            LayerList::Riser => &mut self.riser_layers,
        }
    }

    /// Sum of the main layers' thicknesses.
    pub fn calculate_thickness(&self) -> UnitValue {
        UnitValue::world_centimeters(self.layers.iter().map(|l| l.thickness_cm).sum())
    }

    pub fn reverse_layers(&mut self) {
        self.layers.reverse();
    }

    /// Native size (centimeters) of the root slot of a rigged assembly.
    ///
    /// Starts from the first part mesh. Hosted objects take `PartSizeX/Y/Z`
    /// from the root dimensions; everything else overrides X with `Width`
    /// and Z with `Height`.
    pub fn rigged_native_size(&self) -> Vec3 {
        let mut size = self
            .parts
            .iter()
            .find_map(|p| p.mesh.as_ref())
            .map(|m| m.native_size_cm())
            .unwrap_or(Vec3::ZERO);

        let dim = |name: &str| self.root_properties.dimension_cm(Scope::Dimension, name);
        if self.object_type.is_hosted() {
            if let Some(x) = dim("PartSizeX") {
                size.x = x;
            }
            if let Some(y) = dim("PartSizeY") {
                size.y = y;
            }
            if let Some(z) = dim("PartSizeZ") {
                size.z = z;
            }
        } else {
            if let Some(width) = dim("Width") {
                size.x = width;
            }
            if let Some(height) = dim("Height") {
                size.z = height;
            }
        }
        size
    }
}
