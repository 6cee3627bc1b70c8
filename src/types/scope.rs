//! Node scopes, object types and the assembly kinds they dispatch to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classifies what kind of data a preset carries, and which part of an
/// assembly a property applies to.
///
/// Node scopes and property scopes share this enum: a `Dimension.Width`
/// property lives in the `Dimension` scope, a layer preset has node scope `Layer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Scope {
    #[default]
    None,
    Assembly,
    Layer,
    Part,
    Pattern,
    Profile,
    Module,
    Mesh,
    Gap,
    RawMaterial,
    Material,
    Color,
    Dimension,
    Preset,
    SlotConfig,
    Slot,
    Node,
}

impl Scope {
    pub const ALL: [Scope; 17] = [
        Scope::None,
        Scope::Assembly,
        Scope::Layer,
        Scope::Part,
        Scope::Pattern,
        Scope::Profile,
        Scope::Module,
        Scope::Mesh,
        Scope::Gap,
        Scope::RawMaterial,
        Scope::Material,
        Scope::Color,
        Scope::Dimension,
        Scope::Preset,
        Scope::SlotConfig,
        Scope::Slot,
        Scope::Node,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::None => "None",
            Scope::Assembly => "Assembly",
            Scope::Layer => "Layer",
            Scope::Part => "Part",
            Scope::Pattern => "Pattern",
            Scope::Profile => "Profile",
            Scope::Module => "Module",
            Scope::Mesh => "Mesh",
            Scope::Gap => "Gap",
            Scope::RawMaterial => "RawMaterial",
            Scope::Material => "Material",
            Scope::Color => "Color",
            Scope::Dimension => "Dimension",
            Scope::Preset => "Preset",
            Scope::SlotConfig => "SlotConfig",
            Scope::Slot => "Slot",
            Scope::Node => "Node",
        }
    }

    /// Whether this scope is defined (every preset node needs one).
    pub fn is_defined(&self) -> bool {
        *self != Scope::None
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scope::ALL
            .iter()
            .find(|scope| scope.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown scope '{}'", s))
    }
}

/// The kind of building element an assembly represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ObjectType {
    #[default]
    None,
    Wall,
    Floor,
    Roof,
    Ceiling,
    Rail,
    Countertop,
    SystemPanel,
    Finish,
    Staircase,
    Door,
    Window,
    Furniture,
    Cabinet,
    Trim,
    Mullion,
    StructureLine,
    PointHosted,
    EdgeHosted,
    FaceHosted,
}

/// Post-processing routine selected by an assembly's object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyKind {
    /// Profile extrusions (trim, mullions, beams and columns).
    Extruded,
    /// Stacked material layers (walls, floors, finishes, stairs...).
    Layered,
    /// Mesh parts placed by slot formulas (doors, windows, furniture).
    Rigged,
    /// Rigged parts plus a single-material carcass extrusion.
    Cabinet,
}

impl ObjectType {
    pub fn is_none(&self) -> bool {
        *self == ObjectType::None
    }

    /// Object types whose presets open a new extrusion during traversal.
    pub fn is_extruded(&self) -> bool {
        matches!(
            self,
            ObjectType::Trim | ObjectType::Mullion | ObjectType::StructureLine
        )
    }

    /// Object types that take their rigged size from `PartSizeX/Y/Z`.
    pub fn is_hosted(&self) -> bool {
        matches!(
            self,
            ObjectType::PointHosted | ObjectType::EdgeHosted | ObjectType::FaceHosted
        )
    }

    pub fn assembly_kind(&self) -> Option<AssemblyKind> {
        match self {
            ObjectType::Trim | ObjectType::Mullion | ObjectType::StructureLine => {
                Some(AssemblyKind::Extruded)
            }
            ObjectType::Wall
            | ObjectType::Floor
            | ObjectType::Roof
            | ObjectType::Ceiling
            | ObjectType::Rail
            | ObjectType::Countertop
            | ObjectType::SystemPanel
            | ObjectType::Finish
            | ObjectType::Staircase => Some(AssemblyKind::Layered),
            ObjectType::Door
            | ObjectType::Window
            | ObjectType::Furniture
            | ObjectType::PointHosted
            | ObjectType::EdgeHosted
            | ObjectType::FaceHosted => Some(AssemblyKind::Rigged),
            ObjectType::Cabinet => Some(AssemblyKind::Cabinet),
            ObjectType::None => None,
        }
    }
}
