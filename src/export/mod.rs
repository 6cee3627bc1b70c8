//! Export formats for compiled assemblies.

pub mod json;

pub use json::{export_json, AssemblyExport};
