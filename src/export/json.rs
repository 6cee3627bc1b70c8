//! JSON export of compiled assemblies and their layouts.

use crate::assembly::AssemblySpec;
use crate::error::Result;
use crate::layout::PartLayout;
use serde::Serialize;

/// Serializable view of a compile result.
#[derive(Debug, Serialize)]
pub struct AssemblyExport<'a> {
    pub name: &'a str,
    /// Total thickness of the main layers in centimeters.
    pub thickness_cm: f32,
    pub assembly: &'a AssemblySpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<&'a PartLayout>,
}

impl<'a> AssemblyExport<'a> {
    pub fn new(spec: &'a AssemblySpec, layout: Option<&'a PartLayout>) -> Self {
        Self {
            name: spec.name(),
            thickness_cm: spec.calculate_thickness().value,
            assembly: spec,
            layout,
        }
    }
}

/// Export a compiled assembly (and optionally its solved layout) as JSON.
pub fn export_json(spec: &AssemblySpec, layout: Option<&PartLayout>, pretty: bool) -> Result<String> {
    let export = AssemblyExport::new(spec, layout);
    let json = if pretty {
        serde_json::to_string_pretty(&export)?
    } else {
        serde_json::to_string(&export)?
    };
    Ok(json)
}
