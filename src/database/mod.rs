//! Object database: meshes, materials, colors, patterns and profiles.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::INCHES_TO_CENTIMETERS;

/// A mesh asset. Native size is authored in inches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub key: String,
    #[serde(default)]
    pub asset_path: String,
    #[serde(default)]
    pub native_size: Vec3,
}

impl Mesh {
    pub fn new(key: impl Into<String>, native_size_inches: Vec3) -> Self {
        Self {
            key: key.into(),
            asset_path: String::new(),
            native_size: native_size_inches,
        }
    }

    pub fn native_size_cm(&self) -> Vec3 {
        self.native_size * INCHES_TO_CENTIMETERS
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub key: String,
    #[serde(default)]
    pub asset_path: String,
    /// Hex color, e.g. `"FFFFFF"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_color: Option<String>,
}

impl Material {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            asset_path: String::new(),
            base_color: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub key: String,
    pub hex: String,
}

impl Color {
    pub fn new(key: impl Into<String>, hex: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            hex: hex.into(),
        }
    }
}

/// A layer pattern (brick bond, tile grid...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub key: String,
    #[serde(default)]
    pub name: String,
    /// Module dimension that gives the layer its thickness when the module
    /// carries no explicit `Thickness`.
    #[serde(default = "default_thickness_dimension")]
    pub thickness_dimension: String,
    #[serde(default)]
    pub module_count: usize,
}

fn default_thickness_dimension() -> String {
    "Depth".to_string()
}

impl Pattern {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: String::new(),
            thickness_dimension: default_thickness_dimension(),
            module_count: 1,
        }
    }
}

/// Cross-section profile for extrusions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub key: String,
    #[serde(default)]
    pub asset_path: String,
}

impl Profile {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            asset_path: String::new(),
        }
    }
}

/// Read-only asset lookups used while compiling assemblies.
pub trait AssetLookup {
    fn mesh(&self, key: &str) -> Option<&Mesh>;
    fn material(&self, key: &str) -> Option<&Material>;
    fn color(&self, key: &str) -> Option<&Color>;
    fn pattern(&self, key: &str) -> Option<&Pattern>;
    fn profile(&self, key: &str) -> Option<&Profile>;
}

/// In-memory object database.
#[derive(Debug, Default, Clone)]
pub struct ObjectDatabase {
    meshes: HashMap<String, Mesh>,
    materials: HashMap<String, Material>,
    colors: HashMap<String, Color>,
    patterns: HashMap<String, Pattern>,
    profiles: HashMap<String, Profile>,
}

impl ObjectDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(&mut self, mesh: Mesh) {
        self.meshes.insert(mesh.key.clone(), mesh);
    }

    pub fn add_material(&mut self, material: Material) {
        self.materials.insert(material.key.clone(), material);
    }

    pub fn add_color(&mut self, color: Color) {
        self.colors.insert(color.key.clone(), color);
    }

    pub fn add_pattern(&mut self, pattern: Pattern) {
        self.patterns.insert(pattern.key.clone(), pattern);
    }

    pub fn add_profile(&mut self, profile: Profile) {
        self.profiles.insert(profile.key.clone(), profile);
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn color_count(&self) -> usize {
        self.colors.len()
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }
}

impl AssetLookup for ObjectDatabase {
    fn mesh(&self, key: &str) -> Option<&Mesh> {
        self.meshes.get(key)
    }

    fn material(&self, key: &str) -> Option<&Material> {
        self.materials.get(key)
    }

    fn color(&self, key: &str) -> Option<&Color> {
        self.colors.get(key)
    }

    fn pattern(&self, key: &str) -> Option<&Pattern> {
        self.patterns.get(key)
    }

    fn profile(&self, key: &str) -> Option<&Profile> {
        self.profiles.get(key)
    }
}
