//! Unit-tagged values and dimension string parsing.

use serde::{Deserialize, Serialize};

pub const INCHES_TO_CENTIMETERS: f32 = 2.54;

/// Default drawing scale (1/4" = 1').
pub const DEFAULT_WORLD_TO_FLOORPLAN: f32 = 48.0;

/// Unit a value is expressed in. Declaration order is the tie-break order
/// when picking a common unit for an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnitType {
    Points,
    FloorplanInches,
    FontHeight,
    AngleRadians,
    AngleDegrees,
    #[default]
    WorldCentimeters,
    WorldInches,
}

impl UnitType {
    pub const ALL: [UnitType; 7] = [
        UnitType::Points,
        UnitType::FloorplanInches,
        UnitType::FontHeight,
        UnitType::AngleRadians,
        UnitType::AngleDegrees,
        UnitType::WorldCentimeters,
        UnitType::WorldInches,
    ];

    pub fn is_angle(&self) -> bool {
        matches!(self, UnitType::AngleRadians | UnitType::AngleDegrees)
    }
}

/// A float tagged with its unit.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct UnitValue {
    pub value: f32,
    pub unit: UnitType,
}

impl UnitValue {
    pub fn new(value: f32, unit: UnitType) -> Self {
        Self { value, unit }
    }

    pub fn world_centimeters(value: f32) -> Self {
        Self::new(value, UnitType::WorldCentimeters)
    }

    pub fn world_inches(value: f32) -> Self {
        Self::new(value, UnitType::WorldInches)
    }

    pub fn degrees(value: f32) -> Self {
        Self::new(value, UnitType::AngleDegrees)
    }

    pub fn radians(value: f32) -> Self {
        Self::new(value, UnitType::AngleRadians)
    }

    /// Convert to floorplan inches. Angles have no length equivalent.
    pub fn as_floorplan_inches(&self) -> Option<f32> {
        let w2f = DEFAULT_WORLD_TO_FLOORPLAN;
        match self.unit {
            UnitType::Points => Some(self.value / 72.0),
            UnitType::FloorplanInches => Some(self.value),
            UnitType::FontHeight => Some(self.value / 100.0),
            UnitType::WorldInches => Some(self.value / w2f),
            UnitType::WorldCentimeters => Some(self.value / (w2f * INCHES_TO_CENTIMETERS)),
            UnitType::AngleRadians | UnitType::AngleDegrees => None,
        }
    }

    pub fn as_world_centimeters(&self) -> Option<f32> {
        match self.unit {
            UnitType::WorldCentimeters => Some(self.value),
            UnitType::WorldInches => Some(self.value * INCHES_TO_CENTIMETERS),
            _ => self
                .as_floorplan_inches()
                .map(|v| v * DEFAULT_WORLD_TO_FLOORPLAN * INCHES_TO_CENTIMETERS),
        }
    }

    pub fn as_world_inches(&self) -> Option<f32> {
        match self.unit {
            UnitType::WorldInches => Some(self.value),
            UnitType::WorldCentimeters => Some(self.value / INCHES_TO_CENTIMETERS),
            _ => self
                .as_floorplan_inches()
                .map(|v| v * DEFAULT_WORLD_TO_FLOORPLAN),
        }
    }

    pub fn as_degrees(&self) -> Option<f32> {
        match self.unit {
            UnitType::AngleDegrees => Some(self.value),
            UnitType::AngleRadians => Some(self.value.to_degrees()),
            _ => None,
        }
    }

    pub fn as_radians(&self) -> Option<f32> {
        match self.unit {
            UnitType::AngleRadians => Some(self.value),
            UnitType::AngleDegrees => Some(self.value.to_radians()),
            _ => None,
        }
    }

    /// Convert into `unit`, or `None` when the two units measure different things.
    pub fn as_unit(&self, unit: UnitType) -> Option<f32> {
        match unit {
            UnitType::Points => self.as_floorplan_inches().map(|v| v * 72.0),
            UnitType::FloorplanInches => self.as_floorplan_inches(),
            UnitType::FontHeight => self.as_floorplan_inches().map(|v| v * 100.0),
            UnitType::AngleRadians => self.as_radians(),
            UnitType::AngleDegrees => self.as_degrees(),
            UnitType::WorldCentimeters => self.as_world_centimeters(),
            UnitType::WorldInches => self.as_world_inches(),
        }
    }
}

/// Parse a dimension cell into world centimeters.
///
/// Bare numbers are centimeters. Accepts `cm`, `mm`, `m`, `in`/`"` and
/// `ft`/`'` suffixes, and feet-inch forms such as `3'-4"` or `3' 4 1/2"`.
pub fn parse_dimension(text: &str) -> Option<f32> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(v) = text.parse::<f32>() {
        return Some(v);
    }

    if let Some((feet, rest)) = text.split_once('\'') {
        let feet = parse_number(feet)?;
        let rest = rest.trim().trim_start_matches('-').trim();
        let inches = if rest.is_empty() {
            0.0
        } else {
            parse_number(rest.trim_end_matches('"').trim_end_matches("in"))?
        };
        let sign = if feet < 0.0 || text.starts_with('-') { -1.0 } else { 1.0 };
        return Some(sign * (feet.abs() * 12.0 + inches) * INCHES_TO_CENTIMETERS);
    }

    const SUFFIXES: [(&str, f32); 6] = [
        ("mm", 0.1),
        ("cm", 1.0),
        ("in", INCHES_TO_CENTIMETERS),
        ("ft", 12.0 * INCHES_TO_CENTIMETERS),
        ("\"", INCHES_TO_CENTIMETERS),
        ("m", 100.0),
    ];
    for (suffix, factor) in SUFFIXES {
        if let Some(number) = text.strip_suffix(suffix) {
            return parse_number(number).map(|v| v * factor);
        }
    }

    None
}

/// Parse a decimal, a fraction (`1/2`) or a mixed number (`4 1/2`).
fn parse_number(text: &str) -> Option<f32> {
    let text = text.trim();
    if let Ok(v) = text.parse::<f32>() {
        return Some(v);
    }

    let (whole, fraction) = match text.rsplit_once(' ') {
        Some((whole, fraction)) => (whole.trim().parse::<f32>().ok()?, fraction),
        None => (0.0, text),
    };
    let (num, den) = fraction.split_once('/')?;
    let num = num.trim().parse::<f32>().ok()?;
    let den = den.trim().parse::<f32>().ok()?;
    if den == 0.0 {
        return None;
    }
    Some(whole + num / den)
}
