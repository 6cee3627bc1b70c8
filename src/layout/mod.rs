//! Part-slot layout solver.
//!
//! Turns the flattened part list of a compiled [`AssemblySpec`] into concrete
//! placements. Slots are processed front to back, so every slot can rely on
//! its parent having been solved first.
//!
//! Formula variables are dot-qualified paths resolved by walking the slot
//! tree: `Self` stays put, `Parent` moves up, any other segment selects a
//! child slot by its identifier, and the final segment names a variable on
//! the slot reached. `Parent.Frame.JambSizeX` reads `JambSizeX` from the
//! sibling slot `Frame`.

use crate::assembly::{default_named_dimension, AssemblySpec, PartSlotSpec};
use crate::database::Mesh;
use crate::error::{BimError, Result};
use crate::expression::{evaluate, extract_variables, Variables};
use crate::types::{flip_vector, AXES};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Solved placement of one part slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartSlotInstance {
    pub preset_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_key: Option<String>,
    pub slot_id: String,
    pub parent: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh_key: Option<String>,
    /// Every variable bound on this slot, including the native, scaled,
    /// location and rotation triples.
    pub variables: Variables,
    pub location: Vec3,
    pub rotation: Vec3,
    pub size: Vec3,
    /// +1/-1 per axis, compounded with every ancestor's flip.
    pub flip: Vec3,
    /// Unqualified variable names other slots' formulas read from this one.
    #[serde(default)]
    pub visible_named_dimensions: Vec<String>,
}

impl PartSlotInstance {
    fn from_spec(spec: &PartSlotSpec) -> Self {
        Self {
            preset_key: spec.preset_key.clone(),
            slot_key: spec.slot_key.clone(),
            slot_id: spec.slot_id.clone(),
            parent: spec.parent,
            mesh_key: spec.mesh.as_ref().map(|m| m.key.clone()),
            variables: Variables::new(),
            location: Vec3::ZERO,
            rotation: Vec3::ZERO,
            size: Vec3::ZERO,
            flip: Vec3::ONE,
            visible_named_dimensions: Vec::new(),
        }
    }

    /// Bound value of a variable on this slot.
    pub fn variable(&self, name: &str) -> Option<f32> {
        self.variables.get(name).copied()
    }
}

/// Solved layout of a rigged assembly.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PartLayout {
    /// One instance per part slot, in `AssemblySpec::parts` order.
    pub instances: Vec<PartSlotInstance>,
    /// Evaluated cabinet conceptual size, when the assembly declares one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conceptual_size_y: Option<f32>,
}

impl PartLayout {
    /// Solve every slot of `spec` at the given overall scale.
    ///
    /// All slots are processed even after a formula fails; the error carries
    /// every collected diagnostic.
    pub fn solve(spec: &AssemblySpec, scale: Vec3) -> Result<Self> {
        validate_hierarchy(spec)?;
        let parts = spec.parts.as_slice();

        let mut instances: Vec<PartSlotInstance> =
            parts.iter().map(PartSlotInstance::from_spec).collect();
        let mut diagnostics = Vec::new();

        // Root seeding.
        let native = spec.rigged_native_size();
        let root = &mut instances[0];
        root.variables
            .extend(parts[0].named_dimensions.iter().map(|(k, v)| (k.clone(), *v)));
        set_vector(&mut root.variables, "NativeSize", native);
        set_vector(&mut root.variables, "ScaledSize", native * scale);

        // Named dimensions and native sizes of every other slot.
        for (i, part) in parts.iter().enumerate().skip(1) {
            let native = part
                .mesh
                .as_ref()
                .or_else(|| child_mesh(parts, i))
                .map(Mesh::native_size_cm)
                .unwrap_or(Vec3::ZERO);

            let vars = &mut instances[i].variables;
            vars.extend(part.named_dimensions.iter().map(|(k, v)| (k.clone(), *v)));
            set_vector(vars, "NativeSize", native);
        }

        let conceptual_size_y = spec.conceptual_size_y.as_deref().map(|formula| {
            let mut failures = Vec::new();
            for name in extract_variables(formula) {
                let value = resolve_variable(&mut instances, parts, 0, &name, &mut failures);
                instances[0].variables.insert(name, value.unwrap_or(0.0));
            }
            let size = evaluate(&instances[0].variables, formula).unwrap_or_else(|e| {
                failures.push(e.to_string());
                0.0
            });
            diagnostics.extend(failures.into_iter().map(|d| format!("{} (ConceptualSize)", d)));
            size
        });

        for (i, part) in parts.iter().enumerate() {
            instances[i].flip = flip_vector(part.flip);

            let mut names = Vec::new();
            part.size.extract_variables(&mut names);
            part.translation.extract_variables(&mut names);
            part.orientation.extract_variables(&mut names);

            for name in names {
                let value = resolve_variable(&mut instances, parts, i, &name, &mut diagnostics);
                instances[i].variables.insert(name, value.unwrap_or(0.0));
            }

            let instance = &mut instances[i];
            match part.size.evaluate(&instance.variables) {
                Ok(size) => {
                    instance.size = size;
                    set_vector(&mut instance.variables, "ScaledSize", size);
                }
                Err(e) => diagnostics.push(format!("{} size: {}", describe(instance), e)),
            }
            match part.translation.evaluate(&instance.variables) {
                Ok(location) => {
                    instance.location = location;
                    set_vector(&mut instance.variables, "Location", location);
                }
                Err(e) => diagnostics.push(format!("{} translation: {}", describe(instance), e)),
            }
            match part.orientation.evaluate(&instance.variables) {
                Ok(rotation) => {
                    instance.rotation = rotation;
                    set_vector(&mut instance.variables, "Rotation", rotation);
                }
                Err(e) => diagnostics.push(format!("{} orientation: {}", describe(instance), e)),
            }
        }

        // Propagation.
        for (i, part) in parts.iter().enumerate().skip(1) {
            let Some(parent) = part.parent else {
                continue;
            };
            let (parent_flip, parent_rotation, parent_location) = {
                let p = &instances[parent];
                (p.flip, p.rotation, p.location)
            };

            let instance = &mut instances[i];
            instance.flip *= parent_flip;
            instance.rotation += parent_rotation;
            if part.mesh.is_some() {
                // Flips about the parent's origin, not the slot's own.
                instance.location =
                    parent_location + (instance.location - parent_location) * instance.flip;
            }
        }

        if !diagnostics.is_empty() {
            return Err(BimError::Layout {
                assembly: spec.name().to_string(),
                diagnostics,
            });
        }

        tracing::debug!(
            assembly = spec.name(),
            slots = instances.len(),
            "solved part layout"
        );
        Ok(Self {
            instances,
            conceptual_size_y,
        })
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// First instance with the given slot identifier.
    pub fn find(&self, slot_id: &str) -> Option<&PartSlotInstance> {
        self.instances.iter().find(|i| i.slot_id == slot_id)
    }
}

/// Solve the part layout of `spec` at `scale`.
pub fn solve_layout(spec: &AssemblySpec, scale: Vec3) -> Result<PartLayout> {
    PartLayout::solve(spec, scale)
}

fn validate_hierarchy(spec: &AssemblySpec) -> Result<()> {
    if spec.parts.is_empty() {
        return Err(BimError::EmptyLayout(spec.preset_key.clone()));
    }
    for (index, part) in spec.parts.iter().enumerate() {
        let valid = match (index, part.parent) {
            (0, None) => true,
            (_, Some(parent)) => parent < index,
            _ => false,
        };
        if !valid {
            return Err(BimError::InvalidPartHierarchy {
                index,
                parent: part.parent,
            });
        }
    }
    Ok(())
}

/// Mesh of the first direct child that has one.
fn child_mesh(parts: &[PartSlotSpec], index: usize) -> Option<&Mesh> {
    parts
        .iter()
        .skip(index + 1)
        .filter(|p| p.parent == Some(index))
        .find_map(|p| p.mesh.as_ref())
}

/// Walk `name`'s path from slot `start` and read its last segment there.
///
/// Navigation failures are recorded and leave the walk where it was. The
/// final name is marked visible on the destination slot even when it does
/// not resolve.
fn resolve_variable(
    instances: &mut [PartSlotInstance],
    parts: &[PartSlotSpec],
    start: usize,
    name: &str,
    diagnostics: &mut Vec<String>,
) -> Option<f32> {
    let segments: Vec<&str> = name.split('.').collect();
    let (variable, path) = segments.split_last()?;

    let mut current = start;
    for segment in path {
        match *segment {
            "Self" => {}
            "Parent" => match parts[current].parent {
                Some(parent) => current = parent,
                None => diagnostics.push(format!(
                    "Bad path {}: slot {} has no parent",
                    name,
                    describe(&instances[current])
                )),
            },
            slot_id => match parts
                .iter()
                .position(|p| p.parent == Some(current) && p.slot_id == slot_id)
            {
                Some(child) => current = child,
                None => diagnostics.push(format!(
                    "No such slot {} under {} in {}",
                    slot_id,
                    describe(&instances[current]),
                    name
                )),
            },
        }
    }

    let destination = &mut instances[current];
    if !destination
        .visible_named_dimensions
        .iter()
        .any(|v| v == variable)
    {
        destination.visible_named_dimensions.push(variable.to_string());
    }

    if let Some(value) = destination.variable(variable) {
        return Some(value);
    }
    if let Some(value) = default_named_dimension(variable) {
        return Some(value);
    }

    diagnostics.push(format!(
        "Could not resolve {} on slot {}",
        name,
        describe(&instances[start])
    ));
    None
}

fn set_vector(vars: &mut Variables, prefix: &str, value: Vec3) {
    for (axis, v) in AXES.iter().zip(value.to_array()) {
        vars.insert(format!("{}{}", prefix, axis), v);
    }
}

fn describe(instance: &PartSlotInstance) -> &str {
    if instance.slot_id.is_empty() {
        &instance.preset_key
    } else {
        &instance.slot_id
    }
}
