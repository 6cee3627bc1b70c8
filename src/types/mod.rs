//! Shared types used throughout the library.

mod scope;
mod units;

pub use scope::{AssemblyKind, ObjectType, Scope};
pub use units::{
    parse_dimension, UnitType, UnitValue, DEFAULT_WORLD_TO_FLOORPLAN, INCHES_TO_CENTIMETERS,
};

use glam::Vec3;

/// Convert per-axis flip flags into a scale vector of +1/-1 components.
pub fn flip_vector(flip: [bool; 3]) -> Vec3 {
    Vec3::new(
        if flip[0] { -1.0 } else { 1.0 },
        if flip[1] { -1.0 } else { 1.0 },
        if flip[2] { -1.0 } else { 1.0 },
    )
}

/// Parse a signed axis such as `+X` or `-Z` into a unit vector.
pub fn parse_axis(text: &str) -> Option<Vec3> {
    let mut chars = text.trim().chars();
    let sign = match chars.next()? {
        '+' => 1.0,
        '-' => -1.0,
        _ => return None,
    };
    let axis = match chars.next()?.to_ascii_uppercase() {
        'X' => Vec3::X,
        'Y' => Vec3::Y,
        'Z' => Vec3::Z,
        _ => return None,
    };
    match chars.next() {
        None => Some(axis * sign),
        Some(_) => None,
    }
}

/// Axis suffixes used by the X/Y/Z triples of slot properties and layout variables.
pub const AXES: [&str; 3] = ["X", "Y", "Z"];
