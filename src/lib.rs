//! # BIM Assembly
//!
//! Compiles hierarchical building presets into flat assembly specifications
//! and solves the placement of rigged parts.
//!
//! ## Overview
//!
//! A preset pack holds keyed presets (walls, layers, doors, slots...) and an
//! object database of meshes, materials, colors, patterns and profiles. The
//! compiler walks the preset graph from a root key and produces an
//! [`AssemblySpec`]: ordered layers, profile extrusions and a parent-first
//! part list. The layout solver then evaluates each part slot's formulas to
//! place it.
//!
//! ## Quick Start
//!
//! ```ignore
//! use bim_assembly::{compile_assembly, load_preset_pack, solve_layout};
//! use glam::Vec3;
//!
//! let pack = load_preset_pack("path/to/pack.zip")?;
//! let spec = compile_assembly(&pack.database, &pack.presets, "Door_Interior")?;
//! let layout = solve_layout(&spec, Vec3::ONE)?;
//!
//! for slot in &layout.instances {
//!     println!("{} at {}", slot.slot_id, slot.location);
//! }
//! ```
//!
//! ## Formulas
//!
//! Slot formulas are plain arithmetic over dot-qualified variables such as
//! `Parent.Frame.JambSizeX`. See [`expression`] for the evaluator on its own.

pub mod assembly;
pub mod database;
pub mod error;
pub mod export;
pub mod expression;
pub mod layout;
pub mod preset;
pub mod types;

// Re-export main types for convenience
pub use assembly::{
    compile_assembly, AssemblyCompiler, AssemblySpec, CompilerConfig, ExtrusionSpec, LayerSpec,
    PartSlotSpec,
};
pub use database::{AssetLookup, Color, Material, Mesh, ObjectDatabase, Pattern, Profile};
pub use error::{BimError, Result};
pub use export::export_json;
pub use expression::{evaluate, extract_variables, ExpressionError, VectorExpression};
pub use layout::{solve_layout, PartLayout, PartSlotInstance};
pub use preset::{
    Preset, PresetCollection, PresetLookup, PresetPack, PresetSchema, PropertySheet,
};
pub use types::{AssemblyKind, ObjectType, Scope, UnitType, UnitValue};

/// Load a preset pack from a file path (ZIP or directory).
pub fn load_preset_pack<P: AsRef<std::path::Path>>(path: P) -> Result<PresetPack> {
    preset::loader::load_from_path(path)
}

/// Load a preset pack from ZIP bytes.
pub fn load_preset_pack_from_bytes(data: &[u8]) -> Result<PresetPack> {
    preset::loader::load_from_bytes(data)
}
