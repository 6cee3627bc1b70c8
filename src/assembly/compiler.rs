//! Preset-to-assembly compilation.
//!
//! Properties and layers are collected by a depth-first walk over child pins.
//! Parts are flattened breadth-first afterwards, so a part's parent always
//! precedes it in [`AssemblySpec::parts`].

use super::{AssemblySpec, ExtrusionSpec, LayerList, LayerSpec, PartSlotSpec};
use crate::assembly::layer::resolve_material;
use crate::database::{AssetLookup, Material};
use crate::error::{BimError, Result};
use crate::layout::solve_layout;
use crate::preset::{MaterialBinding, PartSlot, PinTarget, Preset, PresetLookup, PropertySheet};
use crate::types::{parse_axis, AssemblyKind, ObjectType, Scope};
use glam::Vec3;
use std::collections::VecDeque;

/// Compiler configuration.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Deepest pin or part nesting before traversal gives up. Guards against
    /// presets that reference their own ancestors.
    pub max_depth: usize,
    /// Run a unit-scale layout after compiling rigged assemblies and fail
    /// the compile if it fails.
    pub validate_rigged_layout: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            validate_rigged_layout: true,
        }
    }
}

impl CompilerConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_layout_validation(mut self, enabled: bool) -> Self {
        self.validate_rigged_layout = enabled;
        self
    }
}

/// Where layer presets reached through the current pin should land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LayerTarget {
    Assembly,
    TreadLayer,
    RiserLayer,
    Cabinet,
}

#[derive(Debug, Clone, Copy)]
struct LayerHandle {
    list: LayerList,
    index: usize,
}

/// The property sheet that visited presets write into.
#[derive(Debug, Clone, Copy)]
enum PropertyTarget {
    Root,
    Layer(LayerHandle),
    Module(LayerHandle, usize),
    Gap(LayerHandle),
    Extrusion(usize),
}

#[derive(Debug, Clone)]
struct PresetIterator {
    key: String,
    target: LayerTarget,
    layer: Option<LayerHandle>,
    properties: PropertyTarget,
    depth: usize,
}

#[derive(Debug)]
struct PartIterator {
    slot: PartSlot,
    slot_config: Option<String>,
    parent: usize,
    depth: usize,
    /// Part preset keys from the enqueuing preset down to this item's parent.
    ancestors: Vec<String>,
}

/// Compiles root presets into [`AssemblySpec`]s.
pub struct AssemblyCompiler<'a> {
    presets: &'a dyn PresetLookup,
    assets: &'a dyn AssetLookup,
    config: CompilerConfig,
}

impl<'a> AssemblyCompiler<'a> {
    /// Create a compiler with default configuration.
    pub fn new(presets: &'a dyn PresetLookup, assets: &'a dyn AssetLookup) -> Self {
        Self::with_config(presets, assets, CompilerConfig::default())
    }

    pub fn with_config(
        presets: &'a dyn PresetLookup,
        assets: &'a dyn AssetLookup,
        config: CompilerConfig,
    ) -> Self {
        Self {
            presets,
            assets,
            config,
        }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile the preset tree rooted at `root_key`.
    pub fn compile(&self, root_key: &str) -> Result<AssemblySpec> {
        let root = self
            .presets
            .preset(root_key)
            .ok_or_else(|| BimError::PresetNotFound(root_key.to_string()))?;
        if !root.scope.is_defined() {
            return Err(BimError::UndefinedScope(root_key.to_string()));
        }

        let mut spec = AssemblySpec::new(root_key);
        spec.display_name = root
            .properties
            .text(Scope::Assembly, "Name")
            .unwrap_or_else(|| root.name().to_string());
        spec.comments = root
            .properties
            .text(Scope::Assembly, "Comments")
            .unwrap_or_default();
        spec.code_name = root
            .properties
            .text(Scope::Assembly, "Code")
            .unwrap_or_default();
        spec.material_bindings = root.materials.clone();

        let mut diagnostics = Vec::new();
        if let Some(config_key) = &root.slot_config {
            match self.presets.preset(config_key) {
                Some(config) => {
                    spec.conceptual_size_y = config.properties.text(Scope::SlotConfig, "ConceptualSizeY")
                }
                None => diagnostics.push(format!("Slot config {} not found", config_key)),
            }
        }

        let (dimensions_preset, part_queue) = self.walk_presets(root, &mut spec, &mut diagnostics)?;
        self.flatten_parts(root_key, dimensions_preset, part_queue, &mut spec, &mut diagnostics)?;

        if !diagnostics.is_empty() {
            for d in &diagnostics {
                tracing::error!("{}", d);
            }
            return Err(BimError::Compile {
                preset: root_key.to_string(),
                diagnostics,
            });
        }

        let kind = spec
            .object_type
            .assembly_kind()
            .ok_or_else(|| BimError::UnresolvedObjectType(root_key.to_string()))?;

        match kind {
            AssemblyKind::Extruded => self.make_extruded(&mut spec)?,
            AssemblyKind::Layered => self.make_layered(&mut spec)?,
            AssemblyKind::Rigged => self.make_rigged(&mut spec, root)?,
            AssemblyKind::Cabinet => self.make_cabinet(&mut spec)?,
        }

        tracing::debug!(
            preset = root_key,
            object_type = ?spec.object_type,
            layers = spec.layers.len(),
            extrusions = spec.extrusions.len(),
            parts = spec.parts.len(),
            "compiled assembly"
        );
        Ok(spec)
    }

    /// Depth-first property pass. Returns the preset that supplies the root
    /// slot's named dimensions and the queued top-level parts.
    fn walk_presets(
        &self,
        root: &'a Preset,
        spec: &mut AssemblySpec,
        diagnostics: &mut Vec<String>,
    ) -> Result<(&'a Preset, VecDeque<PartIterator>)> {
        let mut dimensions_preset = root;
        let mut part_queue = VecDeque::new();
        let mut zone_id = 0;

        let mut stack = vec![PresetIterator {
            key: root.key.clone(),
            target: LayerTarget::Assembly,
            layer: None,
            properties: PropertyTarget::Root,
            depth: 0,
        }];

        while let Some(mut it) = stack.pop() {
            if it.depth > self.config.max_depth {
                return Err(BimError::TraversalTooDeep {
                    key: it.key,
                    limit: self.config.max_depth,
                });
            }

            let Some(preset) = self.presets.preset(&it.key) else {
                diagnostics.push(format!("Preset {} not found", it.key));
                continue;
            };
            if !preset.scope.is_defined() {
                diagnostics.push(format!("Preset {} has an undefined node scope", preset.key));
                continue;
            }
            tracing::debug!(preset = %preset.key, scope = %preset.scope, depth = it.depth, "visiting preset");

            bind_object_type(spec, preset, diagnostics);

            match preset.scope {
                Scope::Layer => {
                    let list = match it.target {
                        LayerTarget::Assembly => LayerList::Main,
                        LayerTarget::TreadLayer => LayerList::Tread,
                        LayerTarget::RiserLayer => LayerList::Riser,
                        LayerTarget::Cabinet => {
                            tracing::warn!("Layer {} pinned to a cabinet target, skipping", preset.key);
                            continue;
                        }
                    };
                    zone_id += 1;
                    let layers = spec.layer_list_mut(list);
                    layers.push(LayerSpec::new(
                        &preset.key,
                        format!("{}{}", preset.name(), zone_id),
                    ));
                    let handle = LayerHandle {
                        list,
                        index: layers.len() - 1,
                    };
                    it.layer = Some(handle);
                    it.properties = PropertyTarget::Layer(handle);
                }
                Scope::Pattern => match it.layer {
                    Some(handle) => {
                        let pattern_key = preset
                            .properties
                            .text(Scope::Pattern, "AssetID")
                            .unwrap_or_else(|| preset.key.clone());
                        match self.assets.pattern(&pattern_key) {
                            Some(pattern) => {
                                layer_mut(spec, handle).pattern = Some(pattern.clone());
                            }
                            None => diagnostics.push(format!(
                                "Pattern {} for preset {} not found",
                                pattern_key, preset.key
                            )),
                        }
                    }
                    None => diagnostics.push(format!(
                        "Pattern {} has no layer to apply to",
                        preset.key
                    )),
                },
                Scope::Module => match it.layer {
                    Some(handle) => {
                        let layer = layer_mut(spec, handle);
                        layer.module_properties.push(PropertySheet::new());
                        it.properties =
                            PropertyTarget::Module(handle, layer.module_properties.len() - 1);
                    }
                    None => diagnostics.push(format!("Module {} has no layer", preset.key)),
                },
                Scope::Gap => match it.layer {
                    Some(handle) => it.properties = PropertyTarget::Gap(handle),
                    None => diagnostics.push(format!("Gap {} has no layer", preset.key)),
                },
                // The color key is the preset itself; explicit AssetIDs merged below still win.
                Scope::Color if it.target != LayerTarget::Cabinet => {
                    target_sheet(spec, it.properties).set(Scope::Color, "AssetID", preset.key.clone());
                }
                _ if preset.object_type.is_extruded() && !has_layers(spec) => {
                    spec.extrusions.push(ExtrusionSpec::new(&preset.key));
                    it.properties = PropertyTarget::Extrusion(spec.extrusions.len() - 1);
                    if !preset.materials.is_empty() {
                        spec.material_bindings = preset.materials.clone();
                    }
                }
                _ => {}
            }

            // A preset pinned as a cabinet face supplies named dimensions
            // without writing into the assembly's own properties.
            if it.target == LayerTarget::Cabinet {
                dimensions_preset = preset;
            } else {
                target_sheet(spec, it.properties).merge(&preset.properties);
            }

            for pin in preset.children.iter().rev() {
                let mut child = it.clone();
                child.key = pin.preset.clone();
                child.depth = it.depth + 1;
                match pin.target {
                    PinTarget::Tread => child.target = LayerTarget::TreadLayer,
                    PinTarget::Riser => child.target = LayerTarget::RiserLayer,
                    PinTarget::Cabinet => child.target = LayerTarget::Cabinet,
                    PinTarget::Default => {}
                }
                stack.push(child);
            }

            for part in preset.parts.iter().filter(|p| !p.part.is_empty()) {
                part_queue.push_back(PartIterator {
                    slot: part.clone(),
                    slot_config: preset.slot_config.clone(),
                    parent: 0,
                    depth: it.depth + 1,
                    ancestors: vec![preset.key.clone()],
                });

                if spec.conceptual_size_y.is_none() {
                    spec.conceptual_size_y = preset
                        .slot_config
                        .as_deref()
                        .and_then(|k| self.presets.preset(k))
                        .and_then(|c| c.properties.text(Scope::SlotConfig, "ConceptualSizeY"));
                }
            }
        }

        Ok((dimensions_preset, part_queue))
    }

    /// Breadth-first part pass.
    fn flatten_parts(
        &self,
        root_key: &str,
        dimensions_preset: &Preset,
        mut queue: VecDeque<PartIterator>,
        spec: &mut AssemblySpec,
        diagnostics: &mut Vec<String>,
    ) -> Result<()> {
        if queue.is_empty() {
            return Ok(());
        }

        let mut root = PartSlotSpec::root(root_key);
        root.read_named_dimensions(dimensions_preset);
        spec.parts.push(root);

        while let Some(item) = queue.pop_front() {
            if item.depth > self.config.max_depth {
                return Err(BimError::TraversalTooDeep {
                    key: item.slot.part,
                    limit: self.config.max_depth,
                });
            }

            // A part nested in itself would fan out without bound before the depth limit trips.
            if item.ancestors.contains(&item.slot.part) {
                diagnostics.push(format!(
                    "Part {} contains itself through {}",
                    item.slot.part,
                    item.ancestors.join(" > ")
                ));
                continue;
            }

            let part_preset = self.presets.preset(&item.slot.part);
            let slot_preset = self.presets.preset(&item.slot.slot);
            let slot_config = item
                .slot_config
                .as_deref()
                .and_then(|k| self.presets.preset(k));

            let (Some(part_preset), Some(slot_preset), Some(slot_config)) =
                (part_preset, slot_preset, slot_config)
            else {
                if part_preset.is_none() {
                    diagnostics.push(format!("Part preset {} not found", item.slot.part));
                }
                if slot_preset.is_none() {
                    diagnostics.push(format!("Slot preset {} not found", item.slot.slot));
                }
                if slot_config.is_none() {
                    diagnostics.push(format!(
                        "Slot config {} for part {} not found",
                        item.slot_config.as_deref().unwrap_or("<none>"),
                        item.slot.part
                    ));
                }
                continue;
            };

            let mut part = PartSlotSpec::new(&part_preset.key, Some(item.parent));
            part.slot_key = Some(slot_preset.key.clone());
            part.slot_id = slot_preset
                .properties
                .text(Scope::Slot, "ID")
                .unwrap_or_else(|| slot_preset.key.clone());
            part.read_named_dimensions(part_preset);

            if let Some(mesh_key) = part_preset.mesh_key() {
                match self.assets.mesh(&mesh_key) {
                    Some(mesh) => part.mesh = Some(mesh.clone()),
                    None => {
                        diagnostics.push(format!(
                            "Part {} references unknown mesh {}",
                            part_preset.key, mesh_key
                        ));
                        break;
                    }
                }
            }

            for binding in &part_preset.materials {
                match resolve_binding(self.assets, binding) {
                    Ok(material) => {
                        part.channel_materials.insert(binding.channel.clone(), material);
                    }
                    Err(e) => tracing::warn!("Part {}: {}", part_preset.key, e),
                }
            }

            if slot_config
                .children
                .iter()
                .any(|c| c.preset == item.slot.slot)
            {
                part.read_slot_transform(&slot_preset.properties);
            }

            spec.parts.push(part);

            // Assemblies parent their own parts; plain parts pass theirs through.
            let parent = if part_preset.scope == Scope::Assembly {
                spec.parts.len() - 1
            } else {
                item.parent
            };
            let mut ancestors = item.ancestors;
            ancestors.push(part_preset.key.clone());
            for next in part_preset.parts.iter().filter(|p| !p.part.is_empty()) {
                queue.push_back(PartIterator {
                    slot: next.clone(),
                    slot_config: part_preset.slot_config.clone(),
                    parent,
                    depth: item.depth + 1,
                    ancestors: ancestors.clone(),
                });
            }
        }

        Ok(())
    }

    fn make_extruded(&self, spec: &mut AssemblySpec) -> Result<()> {
        let bound = match spec.material_bindings.first() {
            Some(binding) => Some(resolve_binding(self.assets, binding)?),
            None => None,
        };

        for extrusion in &mut spec.extrusions {
            extrusion.material = match &bound {
                Some(material) => Some(material.clone()),
                None => resolve_material(&extrusion.properties, self.assets, &extrusion.preset_key),
            };
            extrusion.build(self.assets)?;
        }
        Ok(())
    }

    fn make_layered(&self, spec: &mut AssemblySpec) -> Result<()> {
        if spec.object_type == ObjectType::Staircase {
            spec.tread_depth_cm = spec
                .root_properties
                .dimension_cm(Scope::Dimension, "TreadDepthIdeal")
                .filter(|d| *d > 0.0)
                .unwrap_or(1.0);
        }

        for layer in spec
            .layers
            .iter_mut()
            .chain(spec.tread_layers.iter_mut())
            .chain(spec.riser_layers.iter_mut())
        {
            layer.build(self.assets)?;
        }

        // Finish layers are authored face-out but built substrate-first.
        if spec.object_type == ObjectType::Finish {
            spec.reverse_layers();
        }
        Ok(())
    }

    fn make_rigged(&self, spec: &mut AssemblySpec, root: &Preset) -> Result<()> {
        if spec.parts.is_empty() {
            // Legacy single-mesh presets carry their mesh on the root.
            let mesh_key = root.mesh_key().ok_or_else(|| BimError::Compile {
                preset: root.key.clone(),
                diagnostics: vec![format!(
                    "Rigged assembly {} has neither parts nor a mesh",
                    root.key
                )],
            })?;
            let mesh = self
                .assets
                .mesh(&mesh_key)
                .ok_or_else(|| BimError::AssetNotFound {
                    kind: "mesh",
                    key: mesh_key.clone(),
                })?;

            self.read_orientation(spec)?;

            let mut slot = PartSlotSpec::root(&root.key);
            slot.mesh = Some(mesh.clone());
            if spec.object_type.is_hosted() || spec.object_type == ObjectType::Furniture {
                for binding in &spec.material_bindings {
                    match resolve_binding(self.assets, binding) {
                        Ok(material) => {
                            slot.channel_materials.insert(binding.channel.clone(), material);
                        }
                        Err(e) => tracing::warn!("Assembly {}: {}", root.key, e),
                    }
                }
            }
            spec.parts.push(slot);
        }

        if self.config.validate_rigged_layout {
            solve_layout(spec, Vec3::ONE)?;
        }
        Ok(())
    }

    /// Read the `Part.Normal`, `Part.Tangent` and `Part.Zalign` cells of a
    /// single-mesh assembly. Blank axes keep their defaults.
    fn read_orientation(&self, spec: &mut AssemblySpec) -> Result<()> {
        let mut diagnostics = Vec::new();
        let props = &spec.root_properties;
        let mut read_axis = |name: &str, current: Vec3| match props.text(Scope::Part, name) {
            None => current,
            Some(text) => parse_axis(&text).unwrap_or_else(|| {
                diagnostics.push(format!("Part.{} '{}' is not a signed axis such as +X", name, text));
                current
            }),
        };
        let normal = read_axis("Normal", spec.normal);
        let tangent = read_axis("Tangent", spec.tangent);
        let z_align = props.flag(Scope::Part, "Zalign");

        if !diagnostics.is_empty() {
            return Err(BimError::Compile {
                preset: spec.preset_key.clone(),
                diagnostics,
            });
        }
        spec.normal = normal;
        spec.tangent = tangent;
        spec.z_align = z_align;
        Ok(())
    }

    fn make_cabinet(&self, spec: &mut AssemblySpec) -> Result<()> {
        let root = &spec.root_properties;
        let toe_kick_depth = root.dimension_cm(Scope::Dimension, "ToeKickDepth");
        let toe_kick_height = root.dimension_cm(Scope::Dimension, "ToeKickHeight");
        spec.toe_kick_depth_cm = toe_kick_depth.unwrap_or(0.0);
        spec.toe_kick_height_cm = toe_kick_height.unwrap_or(0.0);

        let binding = spec.material_bindings.first().ok_or_else(|| {
            BimError::ExtrusionBuild(format!("cabinet {} has no carcass material", spec.preset_key))
        })?;
        let mut carcass = ExtrusionSpec::new(&spec.preset_key);
        carcass.material = Some(resolve_binding(self.assets, binding)?);
        spec.extrusions.push(carcass);

        if self.config.validate_rigged_layout && !spec.parts.is_empty() {
            if let Err(e) = solve_layout(spec, Vec3::ONE) {
                tracing::warn!("Cabinet {} layout: {}", spec.preset_key, e);
            }
        }
        Ok(())
    }
}

/// Compile `root_key` with the default configuration.
pub fn compile_assembly(
    assets: &dyn AssetLookup,
    presets: &dyn PresetLookup,
    root_key: &str,
) -> Result<AssemblySpec> {
    AssemblyCompiler::new(presets, assets).compile(root_key)
}

/// Bind the assembly's object type to the first non-`None` type seen.
/// A cabinet may host doors; any other mismatch is an error.
fn bind_object_type(spec: &mut AssemblySpec, preset: &Preset, diagnostics: &mut Vec<String>) {
    if preset.object_type.is_none() {
        return;
    }
    if spec.object_type.is_none() {
        spec.object_type = preset.object_type;
    } else if spec.object_type != preset.object_type
        && !(spec.object_type == ObjectType::Cabinet && preset.object_type == ObjectType::Door)
    {
        diagnostics.push(format!(
            "Preset {} has object type {:?}, assembly is already {:?}",
            preset.key, preset.object_type, spec.object_type
        ));
    }
}

fn has_layers(spec: &AssemblySpec) -> bool {
    !(spec.layers.is_empty() && spec.tread_layers.is_empty() && spec.riser_layers.is_empty())
}

fn layer_mut(spec: &mut AssemblySpec, handle: LayerHandle) -> &mut LayerSpec {
    &mut spec.layer_list_mut(handle.list)[handle.index]
}

fn target_sheet(spec: &mut AssemblySpec, target: PropertyTarget) -> &mut PropertySheet {
    match target {
        PropertyTarget::Root => &mut spec.root_properties,
        PropertyTarget::Layer(handle) => &mut layer_mut(spec, handle).properties,
        PropertyTarget::Module(handle, index) => {
            &mut layer_mut(spec, handle).module_properties[index]
        }
        PropertyTarget::Gap(handle) => &mut layer_mut(spec, handle).gap_properties,
        PropertyTarget::Extrusion(index) => &mut spec.extrusions[index].properties,
    }
}

/// Resolve a channel binding to a material, applying its color override.
fn resolve_binding(assets: &dyn AssetLookup, binding: &MaterialBinding) -> Result<Material> {
    let mut material = assets
        .material(&binding.material)
        .cloned()
        .ok_or_else(|| BimError::AssetNotFound {
            kind: "material",
            key: binding.material.clone(),
        })?;

    if let Some(color_key) = &binding.color {
        let color = assets.color(color_key).ok_or_else(|| BimError::AssetNotFound {
            kind: "color",
            key: color_key.clone(),
        })?;
        material.base_color = Some(color.hex.clone());
    }
    Ok(material)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Color, Mesh, ObjectDatabase, Pattern, Profile};
    use crate::preset::{PinAttachment, PresetCollection};
    use crate::types::UnitValue;

    fn create_test_db() -> ObjectDatabase {
        let mut db = ObjectDatabase::new();
        db.add_material(Material::new("Oak"));
        db.add_material(Material::new("Brick"));
        db.add_material(Material::new("Mortar"));
        db.add_color(Color::new("White", "FFFFFF"));
        db.add_pattern(Pattern::new("RunningBond"));
        db.add_profile(Profile::new("Colonial"));
        db.add_mesh(Mesh::new("FrameMesh", Vec3::new(40.0, 6.0, 84.0)));
        db.add_mesh(Mesh::new("PanelMesh", Vec3::new(36.0, 2.0, 80.0)));
        db.add_mesh(Mesh::new("ChairMesh", Vec3::new(20.0, 20.0, 36.0)));
        db
    }

    fn layer(key: &str, width: &str) -> Preset {
        Preset::new(key, Scope::Layer).with_property(Scope::Dimension, "Width", width)
    }

    fn wall_presets(object_type: ObjectType) -> PresetCollection {
        [
            Preset::new("Wall", Scope::Assembly)
                .with_object_type(object_type)
                .with_child("L1")
                .with_child("L2"),
            layer("L1", "10"),
            layer("L2", "5"),
        ]
        .into_iter()
        .collect()
    }

    /// Door -> Frame (assembly part) -> Panel.
    fn door_presets() -> PresetCollection {
        [
            Preset::new("Door", Scope::Assembly)
                .with_object_type(ObjectType::Door)
                .with_property(Scope::Dimension, "Width", "100")
                .with_property(Scope::Dimension, "Height", "200")
                .with_part("SlotFrame", "Frame")
                .with_slot_config("DoorSlots"),
            Preset::new("DoorSlots", Scope::SlotConfig).with_child("SlotFrame"),
            Preset::new("SlotFrame", Scope::Slot)
                .with_property(Scope::Slot, "ID", "Frame")
                .with_property(Scope::Slot, "SizeX", "Parent.ScaledSizeX")
                .with_property(Scope::Slot, "SizeY", "Self.NativeSizeY")
                .with_property(Scope::Slot, "SizeZ", "Parent.ScaledSizeZ"),
            Preset::new("Frame", Scope::Assembly)
                .with_mesh("FrameMesh")
                .with_part("SlotPanel", "Panel")
                .with_slot_config("FrameSlots"),
            Preset::new("FrameSlots", Scope::SlotConfig).with_child("SlotPanel"),
            Preset::new("SlotPanel", Scope::Slot)
                .with_property(Scope::Slot, "ID", "Panel")
                .with_property(Scope::Slot, "SizeX", "Parent.Parent.ScaledSizeX - 2JambThickness")
                .with_property(Scope::Slot, "FlipX", "true"),
            Preset::new("Panel", Scope::Part)
                .with_mesh("PanelMesh")
                .with_property(Scope::Dimension, "JambThickness", "2")
                .with_material(MaterialBinding::new("Finish", "Oak").with_color("White")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_wall_layers_in_encounter_order() {
        let db = create_test_db();
        let presets = wall_presets(ObjectType::Wall);
        let spec = compile_assembly(&db, &presets, "Wall").unwrap();

        assert_eq!(spec.object_type, ObjectType::Wall);
        assert_eq!(spec.layers.len(), 2);
        assert_eq!(spec.layers[0].preset_key, "L1");
        assert_eq!(spec.layers[1].preset_key, "L2");
        assert_eq!(spec.calculate_thickness(), UnitValue::world_centimeters(15.0));
        assert!(spec.parts.is_empty());
    }

    #[test]
    fn test_finish_layers_are_reversed() {
        let db = create_test_db();
        let presets = wall_presets(ObjectType::Finish);
        let spec = compile_assembly(&db, &presets, "Wall").unwrap();
        let keys: Vec<_> = spec.layers.iter().map(|l| l.preset_key.as_str()).collect();
        assert_eq!(keys, vec!["L2", "L1"]);

        let presets = wall_presets(ObjectType::Floor);
        let spec = compile_assembly(&db, &presets, "Wall").unwrap();
        let keys: Vec<_> = spec.layers.iter().map(|l| l.preset_key.as_str()).collect();
        assert_eq!(keys, vec!["L1", "L2"]);
    }

    #[test]
    fn test_compile_is_deterministic() {
        let db = create_test_db();
        let presets = door_presets();
        let first = compile_assembly(&db, &presets, "Door").unwrap();
        let second = compile_assembly(&db, &presets, "Door").unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_missing_child_preset_fails() {
        let db = create_test_db();
        let mut presets = wall_presets(ObjectType::Wall);
        presets.remove("L2");

        let err = compile_assembly(&db, &presets, "Wall").unwrap_err();
        assert!(matches!(err, BimError::Compile { .. }));
        assert!(err.diagnostics().iter().any(|d| d.contains("L2")));
    }

    #[test]
    fn test_missing_root_preset_fails() {
        let db = create_test_db();
        let presets = PresetCollection::new();
        assert!(matches!(
            compile_assembly(&db, &presets, "Nothing"),
            Err(BimError::PresetNotFound(_))
        ));
    }

    #[test]
    fn test_undefined_scope_fails() {
        let db = create_test_db();
        let mut presets = wall_presets(ObjectType::Wall);
        presets.add(Preset::new("L2", Scope::None).with_node_type("Unknown"));
        let err = compile_assembly(&db, &presets, "Wall").unwrap_err();
        assert!(err.diagnostics()[0].contains("undefined node scope"));

        presets.add(Preset::new("Wall", Scope::None));
        assert!(matches!(
            compile_assembly(&db, &presets, "Wall"),
            Err(BimError::UndefinedScope(_))
        ));
    }

    #[test]
    fn test_unresolved_object_type_fails() {
        let db = create_test_db();
        let presets = wall_presets(ObjectType::None);
        assert!(matches!(
            compile_assembly(&db, &presets, "Wall"),
            Err(BimError::UnresolvedObjectType(_))
        ));
    }

    #[test]
    fn test_conflicting_object_types_fail() {
        let db = create_test_db();
        let mut presets = wall_presets(ObjectType::Wall);
        presets.add(layer("L2", "5").with_object_type(ObjectType::Floor));
        assert!(matches!(
            compile_assembly(&db, &presets, "Wall"),
            Err(BimError::Compile { .. })
        ));
    }

    #[test]
    fn test_cyclic_presets_hit_depth_limit() {
        let db = create_test_db();
        let presets: PresetCollection = [
            Preset::new("A", Scope::Assembly)
                .with_object_type(ObjectType::Wall)
                .with_child("B"),
            Preset::new("B", Scope::Layer).with_child("A"),
        ]
        .into_iter()
        .collect();

        let compiler = AssemblyCompiler::with_config(
            &presets,
            &db,
            CompilerConfig::default().with_max_depth(8),
        );
        assert!(matches!(
            compiler.compile("A"),
            Err(BimError::TraversalTooDeep { limit: 8, .. })
        ));
    }

    #[test]
    fn test_patterned_layer() {
        let db = create_test_db();
        let presets: PresetCollection = [
            Preset::new("Wall", Scope::Assembly)
                .with_object_type(ObjectType::Wall)
                .with_child("Veneer"),
            Preset::new("Veneer", Scope::Layer)
                .with_child("Bond")
                .with_child("BrickModule")
                .with_child("Joint")
                .with_child("WhiteColor"),
            Preset::new("Bond", Scope::Pattern).with_property(Scope::Pattern, "AssetID", "RunningBond"),
            Preset::new("BrickModule", Scope::Module)
                .with_property(Scope::RawMaterial, "AssetID", "Brick")
                .with_property(Scope::Dimension, "Length", "20")
                .with_property(Scope::Dimension, "Thickness", "9")
                .with_property(Scope::Dimension, "Width", "6"),
            Preset::new("Joint", Scope::Gap)
                .with_property(Scope::RawMaterial, "AssetID", "Mortar")
                .with_property(Scope::Dimension, "Width", "1"),
            Preset::new("WhiteColor", Scope::Color).with_property(Scope::Color, "AssetID", "White"),
        ]
        .into_iter()
        .collect();

        let spec = compile_assembly(&db, &presets, "Wall").unwrap();
        let layer = &spec.layers[0];
        assert_eq!(layer.pattern.as_ref().map(|p| p.key.as_str()), Some("RunningBond"));
        assert_eq!(layer.module_properties.len(), 1);
        assert_eq!(layer.thickness_cm, 9.0);
        assert_eq!(layer.gap.as_ref().unwrap().material.as_ref().unwrap().key, "Mortar");
        assert_eq!(
            layer.properties.text(Scope::Color, "AssetID").as_deref(),
            Some("White")
        );
        assert!(!spec.root_properties.contains(Scope::RawMaterial, "AssetID"));
    }

    #[test]
    fn test_color_preset_key_becomes_asset_id() {
        let db = create_test_db();
        let presets: PresetCollection = [
            Preset::new("Wall", Scope::Assembly)
                .with_object_type(ObjectType::Wall)
                .with_child("Paint")
                .with_child("Stain"),
            layer("Paint", "1")
                .with_property(Scope::RawMaterial, "AssetID", "Oak")
                .with_child("White"),
            layer("Stain", "1").with_child("Accent"),
            Preset::new("White", Scope::Color),
            Preset::new("Accent", Scope::Color).with_property(Scope::Color, "AssetID", "White"),
        ]
        .into_iter()
        .collect();

        let spec = compile_assembly(&db, &presets, "Wall").unwrap();
        let paint = &spec.layers[0];
        assert_eq!(paint.properties.text(Scope::Color, "AssetID").as_deref(), Some("White"));
        assert_eq!(
            paint.material.as_ref().unwrap().base_color.as_deref(),
            Some("FFFFFF")
        );
        // An explicit AssetID overrides the preset key.
        assert_eq!(
            spec.layers[1].properties.text(Scope::Color, "AssetID").as_deref(),
            Some("White")
        );
        assert!(!spec.root_properties.contains(Scope::Color, "AssetID"));
    }

    #[test]
    fn test_color_routes_to_module_and_gap() {
        let db = create_test_db();
        let presets: PresetCollection = [
            Preset::new("Wall", Scope::Assembly)
                .with_object_type(ObjectType::Wall)
                .with_child("Veneer"),
            Preset::new("Veneer", Scope::Layer)
                .with_child("Bond")
                .with_child("BrickModule")
                .with_child("Joint"),
            Preset::new("Bond", Scope::Pattern).with_property(Scope::Pattern, "AssetID", "RunningBond"),
            Preset::new("BrickModule", Scope::Module)
                .with_property(Scope::RawMaterial, "AssetID", "Brick")
                .with_property(Scope::Dimension, "Length", "20")
                .with_property(Scope::Dimension, "Thickness", "9")
                .with_property(Scope::Dimension, "Width", "6")
                .with_child("White"),
            Preset::new("Joint", Scope::Gap)
                .with_property(Scope::RawMaterial, "AssetID", "Mortar")
                .with_property(Scope::Dimension, "Width", "1")
                .with_child("White"),
            Preset::new("White", Scope::Color),
        ]
        .into_iter()
        .collect();

        let spec = compile_assembly(&db, &presets, "Wall").unwrap();
        let layer = &spec.layers[0];
        assert!(!layer.properties.contains(Scope::Color, "AssetID"));
        assert_eq!(
            layer.module_properties[0].text(Scope::Color, "AssetID").as_deref(),
            Some("White")
        );
        assert_eq!(
            layer.gap_properties.text(Scope::Color, "AssetID").as_deref(),
            Some("White")
        );
        let module = layer.modules[0].material.as_ref().unwrap();
        assert_eq!(module.base_color.as_deref(), Some("FFFFFF"));
        let gap = layer.gap.as_ref().unwrap().material.as_ref().unwrap();
        assert_eq!(gap.base_color.as_deref(), Some("FFFFFF"));
    }

    #[test]
    fn test_color_routes_to_extrusion() {
        let db = create_test_db();
        let presets: PresetCollection = [
            Preset::new("BaseTrim", Scope::Assembly)
                .with_object_type(ObjectType::Trim)
                .with_property(Scope::Profile, "AssetID", "Colonial")
                .with_property(Scope::Dimension, "Width", "10")
                .with_material(MaterialBinding::new("Body", "Oak"))
                .with_child("White"),
            Preset::new("White", Scope::Color),
        ]
        .into_iter()
        .collect();

        let spec = compile_assembly(&db, &presets, "BaseTrim").unwrap();
        assert_eq!(
            spec.extrusions[0].properties.text(Scope::Color, "AssetID").as_deref(),
            Some("White")
        );
        assert!(spec.root_properties.is_empty());
    }

    #[test]
    fn test_pattern_without_layer_fails() {
        let db = create_test_db();
        let presets: PresetCollection = [
            Preset::new("Wall", Scope::Assembly)
                .with_object_type(ObjectType::Wall)
                .with_child("Bond"),
            Preset::new("Bond", Scope::Pattern),
        ]
        .into_iter()
        .collect();
        let err = compile_assembly(&db, &presets, "Wall").unwrap_err();
        assert!(err.diagnostics()[0].contains("no layer"));
    }

    #[test]
    fn test_stair_tread_and_riser_layers() {
        let db = create_test_db();
        let presets: PresetCollection = [
            Preset::new("Stair", Scope::Assembly)
                .with_object_type(ObjectType::Staircase)
                .with_pin(PinAttachment::new("Tread").with_target(PinTarget::Tread))
                .with_pin(PinAttachment::new("Riser").at(1, 0).with_target(PinTarget::Riser)),
            Preset::new("Tread", Scope::Assembly).with_child("TreadBoard"),
            Preset::new("Riser", Scope::Assembly).with_child("RiserBoard"),
            layer("TreadBoard", "3"),
            layer("RiserBoard", "2"),
        ]
        .into_iter()
        .collect();

        let spec = compile_assembly(&db, &presets, "Stair").unwrap();
        assert!(spec.layers.is_empty());
        assert_eq!(spec.tread_layers.len(), 1);
        assert_eq!(spec.riser_layers[0].thickness_cm, 2.0);
        assert_eq!(spec.tread_depth_cm, 1.0);
    }

    #[test]
    fn test_trim_extrusion() {
        let db = create_test_db();
        let presets: PresetCollection = [Preset::new("BaseTrim", Scope::Assembly)
            .with_object_type(ObjectType::Trim)
            .with_property(Scope::Profile, "AssetID", "Colonial")
            .with_property(Scope::Dimension, "Width", "10")
            .with_material(MaterialBinding::new("Body", "Oak"))]
        .into_iter()
        .collect();

        let spec = compile_assembly(&db, &presets, "BaseTrim").unwrap();
        assert_eq!(spec.extrusions.len(), 1);
        let extrusion = &spec.extrusions[0];
        assert_eq!(extrusion.material.as_ref().unwrap().key, "Oak");
        assert_eq!(extrusion.profile.as_ref().unwrap().key, "Colonial");
        assert_eq!(extrusion.width_cm, 10.0);
        assert!(spec.root_properties.is_empty());
    }

    #[test]
    fn test_door_parts_are_flattened_breadth_first() {
        let db = create_test_db();
        let presets = door_presets();
        let spec = compile_assembly(&db, &presets, "Door").unwrap();

        assert_eq!(spec.parts.len(), 3);
        let parents: Vec<_> = spec.parts.iter().map(|p| p.parent).collect();
        assert_eq!(parents, vec![None, Some(0), Some(1)]);
        for (i, part) in spec.parts.iter().enumerate().skip(1) {
            assert!(part.parent.unwrap() < i);
        }

        assert_eq!(spec.parts[1].slot_id, "Frame");
        assert_eq!(spec.parts[2].slot_id, "Panel");
        assert_eq!(spec.parts[2].flip, [true, false, false]);
        assert_eq!(spec.parts[0].named_dimensions["Width"], 100.0);

        let finish = &spec.parts[2].channel_materials["Finish"];
        assert_eq!(finish.base_color.as_deref(), Some("FFFFFF"));
    }

    #[test]
    fn test_non_assembly_part_passes_children_through() {
        let db = create_test_db();
        let mut presets = door_presets();
        let frame = presets.get("Frame").cloned().unwrap();
        presets.add(Preset {
            scope: Scope::Part,
            ..frame
        });

        // The panel's formulas assume the frame parents it, so skip layout.
        let config = CompilerConfig::default().with_layout_validation(false);
        let spec = AssemblyCompiler::with_config(&presets, &db, config)
            .compile("Door")
            .unwrap();
        assert_eq!(spec.parts[2].parent, Some(0));
    }

    #[test]
    fn test_self_containing_part_fails() {
        let db = create_test_db();
        let presets: PresetCollection = [
            Preset::new("P", Scope::Assembly)
                .with_object_type(ObjectType::Door)
                .with_mesh("PanelMesh")
                .with_part("S", "P")
                .with_part("S", "P")
                .with_slot_config("PSlots"),
            Preset::new("PSlots", Scope::SlotConfig).with_child("S"),
            Preset::new("S", Scope::Slot).with_property(Scope::Slot, "ID", "Self"),
        ]
        .into_iter()
        .collect();

        let err = compile_assembly(&db, &presets, "P").unwrap_err();
        assert!(matches!(err, BimError::Compile { .. }));
        assert_eq!(err.diagnostics().len(), 2);
        assert!(err.diagnostics()[0].contains("P contains itself"));
    }

    #[test]
    fn test_indirect_part_cycle_fails() {
        let db = create_test_db();
        let mut presets = door_presets();
        let frame = presets.get("Frame").cloned().unwrap();
        presets.add(frame.with_part("SlotPanel", "Door"));

        let err = compile_assembly(&db, &presets, "Door").unwrap_err();
        assert!(err
            .diagnostics()
            .iter()
            .any(|d| d.contains("Door contains itself through Door > Frame")));
    }

    #[test]
    fn test_missing_part_mesh_fails() {
        let db = create_test_db();
        let mut presets = door_presets();
        let panel = presets.get("Panel").cloned().unwrap();
        presets.add(panel.with_mesh("NoSuchMesh"));

        let err = compile_assembly(&db, &presets, "Door").unwrap_err();
        assert!(err.diagnostics().iter().any(|d| d.contains("NoSuchMesh")));
    }

    #[test]
    fn test_missing_slot_config_fails() {
        let db = create_test_db();
        let mut presets = door_presets();
        presets.remove("FrameSlots");
        let err = compile_assembly(&db, &presets, "Door").unwrap_err();
        assert!(err.diagnostics().iter().any(|d| d.contains("FrameSlots")));
    }

    #[test]
    fn test_stubby_furniture() {
        let db = create_test_db();
        let presets: PresetCollection = [Preset::new("Chair", Scope::Assembly)
            .with_object_type(ObjectType::Furniture)
            .with_mesh("ChairMesh")
            .with_material(MaterialBinding::new("Seat", "Oak"))]
        .into_iter()
        .collect();

        let spec = compile_assembly(&db, &presets, "Chair").unwrap();
        assert_eq!(spec.parts.len(), 1);
        assert!(spec.parts[0].is_root());
        assert_eq!(spec.parts[0].mesh.as_ref().unwrap().key, "ChairMesh");
        assert!(spec.parts[0].channel_materials.contains_key("Seat"));
    }

    #[test]
    fn test_stubby_orientation() {
        let db = create_test_db();
        let chair = Preset::new("Chair", Scope::Assembly)
            .with_object_type(ObjectType::Furniture)
            .with_mesh("ChairMesh");

        let presets: PresetCollection = [chair.clone()].into_iter().collect();
        let spec = compile_assembly(&db, &presets, "Chair").unwrap();
        assert_eq!(spec.normal, Vec3::Z);
        assert_eq!(spec.tangent, Vec3::X);
        assert!(!spec.z_align);

        let presets: PresetCollection = [chair
            .clone()
            .with_property(Scope::Part, "Normal", "+X")
            .with_property(Scope::Part, "Tangent", "-Z")
            .with_property(Scope::Part, "Zalign", "true")]
        .into_iter()
        .collect();
        let spec = compile_assembly(&db, &presets, "Chair").unwrap();
        assert_eq!(spec.normal, Vec3::X);
        assert_eq!(spec.tangent, Vec3::NEG_Z);
        assert!(spec.z_align);

        let presets: PresetCollection = [chair.with_property(Scope::Part, "Normal", "Q")]
            .into_iter()
            .collect();
        let err = compile_assembly(&db, &presets, "Chair").unwrap_err();
        assert!(matches!(err, BimError::Compile { .. }));
        assert!(err.diagnostics()[0].contains("Part.Normal 'Q'"));
    }

    #[test]
    fn test_rigged_without_mesh_fails() {
        let db = create_test_db();
        let presets: PresetCollection = [Preset::new("Chair", Scope::Assembly)
            .with_object_type(ObjectType::Furniture)]
        .into_iter()
        .collect();
        assert!(compile_assembly(&db, &presets, "Chair").is_err());
    }

    #[test]
    fn test_cabinet_face_supplies_dimensions() {
        let db = create_test_db();
        let presets: PresetCollection = [
            Preset::new("Cabinet", Scope::Assembly)
                .with_object_type(ObjectType::Cabinet)
                .with_property(Scope::Dimension, "ToeKickDepth", "8")
                .with_material(MaterialBinding::new("Carcass", "Oak"))
                .with_pin(PinAttachment::new("Face").with_target(PinTarget::Cabinet))
                .with_part("SlotDoor", "CabDoor")
                .with_slot_config("CabinetSlots"),
            Preset::new("Face", Scope::Assembly).with_property(Scope::Dimension, "Width", "50"),
            Preset::new("CabinetSlots", Scope::SlotConfig)
                .with_property(Scope::SlotConfig, "ConceptualSizeY", "Depth - 2")
                .with_child("SlotDoor"),
            Preset::new("SlotDoor", Scope::Slot)
                .with_property(Scope::Slot, "ID", "Door")
                .with_property(Scope::Slot, "SizeX", "Parent.Width"),
            Preset::new("CabDoor", Scope::Part)
                .with_object_type(ObjectType::Door)
                .with_mesh("PanelMesh"),
        ]
        .into_iter()
        .collect();

        let spec = compile_assembly(&db, &presets, "Cabinet").unwrap();
        assert_eq!(spec.object_type, ObjectType::Cabinet);
        assert_eq!(spec.toe_kick_depth_cm, 8.0);
        assert_eq!(spec.toe_kick_height_cm, 0.0);
        assert_eq!(spec.extrusions.len(), 1);
        assert_eq!(spec.extrusions[0].material.as_ref().unwrap().key, "Oak");
        assert!(!spec.root_properties.contains(Scope::Dimension, "Width"));
        assert_eq!(spec.parts[0].named_dimensions["Width"], 50.0);
        assert_eq!(spec.conceptual_size_y.as_deref(), Some("Depth - 2"));
    }

    #[test]
    fn test_layers_under_cabinet_pin_are_skipped() {
        let db = create_test_db();
        let presets: PresetCollection = [
            Preset::new("Cabinet", Scope::Assembly)
                .with_object_type(ObjectType::Cabinet)
                .with_material(MaterialBinding::new("Carcass", "Oak"))
                .with_pin(PinAttachment::new("Shelf").with_target(PinTarget::Cabinet)),
            layer("Shelf", "2").with_child("White"),
            Preset::new("White", Scope::Color),
        ]
        .into_iter()
        .collect();

        let spec = compile_assembly(&db, &presets, "Cabinet").unwrap();
        assert!(spec.layers.is_empty());
        assert!(!spec.root_properties.contains(Scope::Dimension, "Width"));
        assert!(!spec.root_properties.contains(Scope::Color, "AssetID"));
        assert_eq!(spec.extrusions.len(), 1);
    }

    #[test]
    fn test_cabinet_without_material_fails() {
        let db = create_test_db();
        let presets: PresetCollection = [Preset::new("Cabinet", Scope::Assembly)
            .with_object_type(ObjectType::Cabinet)]
        .into_iter()
        .collect();
        assert!(matches!(
            compile_assembly(&db, &presets, "Cabinet"),
            Err(BimError::ExtrusionBuild(_))
        ));
    }

    #[test]
    fn test_assembly_metadata() {
        let db = create_test_db();
        let mut presets = wall_presets(ObjectType::Wall);
        let wall = presets.get("Wall").cloned().unwrap();
        presets.add(
            wall.with_property(Scope::Assembly, "Name", "Stud Wall")
                .with_property(Scope::Assembly, "Code", "W1"),
        );
        let spec = compile_assembly(&db, &presets, "Wall").unwrap();
        assert_eq!(spec.name(), "Stud Wall");
        assert_eq!(spec.code_name, "W1");
        assert_eq!(spec.comments, "");
    }
}
