//! Material layers of layered assemblies.

use crate::database::{AssetLookup, Material, Pattern};
use crate::error::{BimError, Result};
use crate::preset::PropertySheet;
use crate::types::Scope;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// One module of a patterned layer (a brick, a tile).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerModule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<Material>,
    pub bevel_width: f32,
    /// X = depth or length, Y = thickness, Z = width.
    pub extents: Vec3,
}

/// The single gap (grout, joint) of a patterned layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerGap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<Material>,
    /// X = width, Y = recess.
    pub extents: Vec3,
}

/// One physical layer of a wall, floor, finish...
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayerSpec {
    pub preset_key: String,
    pub zone_id: String,
    pub properties: PropertySheet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Pattern>,
    #[serde(default)]
    pub module_properties: Vec<PropertySheet>,
    #[serde(default)]
    pub gap_properties: PropertySheet,

    // Filled by `build`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<Material>,
    #[serde(default)]
    pub modules: Vec<LayerModule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap: Option<LayerGap>,
    pub thickness_cm: f32,
}

impl LayerSpec {
    pub fn new(preset_key: impl Into<String>, zone_id: impl Into<String>) -> Self {
        Self {
            preset_key: preset_key.into(),
            zone_id: zone_id.into(),
            ..Default::default()
        }
    }

    pub fn is_patterned(&self) -> bool {
        !self.module_properties.is_empty()
    }

    /// Resolve materials and dimensions from the collected property sheets.
    pub fn build(&mut self, assets: &dyn AssetLookup) -> Result<()> {
        if self.is_patterned() {
            self.build_patterned(assets);
        } else {
            self.build_unpatterned(assets);
        }

        if self.thickness_cm > 0.0 {
            Ok(())
        } else {
            Err(BimError::LayerBuild(format!(
                "layer {} has no positive thickness",
                self.zone_id
            )))
        }
    }

    fn build_unpatterned(&mut self, assets: &dyn AssetLookup) {
        self.material = resolve_material(&self.properties, assets, &self.zone_id);

        self.thickness_cm = ["Thickness", "Depth", "Width"]
            .iter()
            .find_map(|name| self.properties.dimension_cm(Scope::Dimension, name))
            .unwrap_or(0.0);
    }

    fn build_patterned(&mut self, assets: &dyn AssetLookup) {
        let thickness_dimension = self
            .pattern
            .as_ref()
            .map(|p| p.thickness_dimension.clone())
            .unwrap_or_else(|| "Depth".to_string());

        self.modules = self
            .module_properties
            .iter()
            .map(|props| {
                let dim = |name: &str| props.dimension_cm(Scope::Dimension, name);
                LayerModule {
                    material: resolve_material(props, assets, &self.zone_id),
                    bevel_width: dim("BevelWidth").unwrap_or(0.0),
                    extents: Vec3::new(
                        dim("Depth").or_else(|| dim("Length")).unwrap_or(0.0),
                        dim("Thickness")
                            .or_else(|| dim(&thickness_dimension))
                            .unwrap_or(0.0),
                        dim("Width").unwrap_or(0.0),
                    ),
                }
            })
            .collect();

        if has_material(&self.gap_properties) {
            let dim = |name: &str| self.gap_properties.dimension_cm(Scope::Dimension, name);
            self.gap = Some(LayerGap {
                material: resolve_material(&self.gap_properties, assets, &self.zone_id),
                extents: Vec3::new(dim("Width").unwrap_or(0.0), dim("Recess").unwrap_or(0.0), 0.0),
            });
        }

        if let Some(first) = self.modules.first() {
            let e = first.extents;
            self.thickness_cm = [e.y, e.x, e.z]
                .into_iter()
                .find(|v| *v > 0.0)
                .unwrap_or(0.0);
            self.material = first.material.clone();
        }
    }
}

fn has_material(props: &PropertySheet) -> bool {
    material_key(props).is_some()
}

fn material_key(props: &PropertySheet) -> Option<String> {
    props
        .text(Scope::RawMaterial, "AssetID")
        .or_else(|| props.text(Scope::Material, "AssetID"))
}

/// Material from `RawMaterial.AssetID` (or `Material.AssetID`), tinted by
/// `Color.HexValue` or the color asset named by `Color.AssetID`.
///
/// Missing materials are logged, not fatal.
pub(crate) fn resolve_material(
    props: &PropertySheet,
    assets: &dyn AssetLookup,
    context: &str,
) -> Option<Material> {
    let Some(key) = material_key(props) else {
        tracing::warn!("{} has no material", context);
        return None;
    };
    let Some(material) = assets.material(&key) else {
        tracing::warn!("{} references unknown material {}", context, key);
        return None;
    };

    let mut material = material.clone();
    let hex = props.text(Scope::Color, "HexValue").or_else(|| {
        props
            .text(Scope::Color, "AssetID")
            .and_then(|color| assets.color(&color))
            .map(|c| c.hex.clone())
    });
    if hex.is_some() {
        material.base_color = hex;
    }
    Some(material)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Color, ObjectDatabase};

    fn create_test_db() -> ObjectDatabase {
        let mut db = ObjectDatabase::new();
        db.add_material(Material::new("Brick"));
        db.add_material(Material::new("Mortar"));
        db.add_color(Color::new("Red", "FF0000"));
        db
    }

    #[test]
    fn test_unpatterned_thickness_fallbacks() {
        let db = create_test_db();

        let mut layer = LayerSpec::new("Gypsum", "Gypsum1");
        layer.properties.set(Scope::Dimension, "Width", "10");
        layer.build(&db).unwrap();
        assert_eq!(layer.thickness_cm, 10.0);

        let mut layer = LayerSpec::new("Gypsum", "Gypsum2");
        layer.properties.set(Scope::Dimension, "Width", "10");
        layer.properties.set(Scope::Dimension, "Thickness", "2");
        layer.build(&db).unwrap();
        assert_eq!(layer.thickness_cm, 2.0);
    }

    #[test]
    fn test_unpatterned_material_and_color() {
        let db = create_test_db();
        let mut layer = LayerSpec::new("Brick", "Brick1");
        layer.properties.set(Scope::RawMaterial, "AssetID", "Brick");
        layer.properties.set(Scope::Color, "AssetID", "Red");
        layer.properties.set(Scope::Dimension, "Depth", "9");
        layer.build(&db).unwrap();

        let material = layer.material.unwrap();
        assert_eq!(material.key, "Brick");
        assert_eq!(material.base_color.as_deref(), Some("FF0000"));
        assert_eq!(layer.thickness_cm, 9.0);
    }

    #[test]
    fn test_zero_thickness_fails() {
        let db = create_test_db();
        let mut layer = LayerSpec::new("Empty", "Empty1");
        assert!(matches!(layer.build(&db), Err(BimError::LayerBuild(_))));
    }

    #[test]
    fn test_patterned_layer() {
        let db = create_test_db();
        let mut layer = LayerSpec::new("BrickVeneer", "BrickVeneer1");
        layer.pattern = Some(Pattern::new("RunningBond"));

        let mut module = PropertySheet::new();
        module.set(Scope::RawMaterial, "AssetID", "Brick");
        module.set(Scope::Dimension, "Length", "20");
        module.set(Scope::Dimension, "Depth", "9");
        module.set(Scope::Dimension, "Width", "6");
        layer.module_properties.push(module);

        layer.gap_properties.set(Scope::RawMaterial, "AssetID", "Mortar");
        layer.gap_properties.set(Scope::Dimension, "Width", "1");

        layer.build(&db).unwrap();
        assert_eq!(layer.modules.len(), 1);
        // No Thickness: Y comes from the pattern's thickness dimension (Depth).
        assert_eq!(layer.modules[0].extents, Vec3::new(9.0, 9.0, 6.0));
        assert_eq!(layer.thickness_cm, 9.0);
        assert_eq!(layer.gap.as_ref().unwrap().extents.x, 1.0);
        assert_eq!(layer.material.as_ref().map(|m| m.key.as_str()), Some("Brick"));
    }

    #[test]
    fn test_patterned_thickness_falls_back_to_x_then_z() {
        let db = create_test_db();
        let mut layer = LayerSpec::new("Tile", "Tile1");

        let mut module = PropertySheet::new();
        module.set(Scope::Dimension, "Width", "30");
        layer.module_properties.push(module);

        layer.build(&db).unwrap();
        assert_eq!(layer.thickness_cm, 30.0);
        assert!(layer.gap.is_none());
    }
}
