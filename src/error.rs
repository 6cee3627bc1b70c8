//! Error types for preset compilation and part layout.

use crate::expression::ExpressionError;
use thiserror::Error;

/// Result type alias using BimError.
pub type Result<T> = std::result::Result<T, BimError>;

/// Main error type for assembly compilation and layout operations.
#[derive(Error, Debug)]
pub enum BimError {
    /// Failed to read or parse a ZIP archive.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Failed to parse JSON data.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid preset pack structure.
    #[error("Invalid preset pack: {0}")]
    InvalidPack(String),

    /// A preset key did not resolve in the preset collection.
    #[error("Preset not found: {0}")]
    PresetNotFound(String),

    /// An asset key did not resolve in the object database.
    #[error("{kind} not found: {key}")]
    AssetNotFound {
        /// Asset kind (mesh, material, ...).
        kind: &'static str,
        /// The missing key.
        key: String,
    },

    /// A preset declares no node scope.
    #[error("Preset {0} has an undefined node scope")]
    UndefinedScope(String),

    /// Traversal never bound the assembly to an object type.
    #[error("Assembly {0} did not resolve to an object type")]
    UnresolvedObjectType(String),

    /// Traversal exceeded the configured depth (cyclic preset references).
    #[error("Preset traversal too deep at {key} (possible circular reference, limit {limit})")]
    TraversalTooDeep {
        /// Preset being visited when the limit was hit.
        key: String,
        /// Configured depth limit.
        limit: usize,
    },

    /// Compilation collected one or more errors.
    #[error("Failed to compile assembly {preset}: {}", .diagnostics.join("; "))]
    Compile {
        /// Root preset key.
        preset: String,
        /// Every diagnostic collected during the compile.
        diagnostics: Vec<String>,
    },

    /// A layer could not be built from its properties.
    #[error("Layer build error: {0}")]
    LayerBuild(String),

    /// An extrusion could not be built from its properties.
    #[error("Extrusion build error: {0}")]
    ExtrusionBuild(String),

    /// Part list violates the parent-before-child ordering.
    #[error("Invalid part hierarchy: part {index} has parent {parent:?}")]
    InvalidPartHierarchy {
        /// Offending part index.
        index: usize,
        /// Its parent index.
        parent: Option<usize>,
    },

    /// Layout requested for an assembly with no parts.
    #[error("Assembly {0} has no parts to lay out")]
    EmptyLayout(String),

    /// Layout formulas failed to resolve.
    #[error("Failed to lay out assembly {assembly}: {}", .diagnostics.join("; "))]
    Layout {
        /// Assembly display name or root key.
        assembly: String,
        /// Every formula diagnostic collected during the layout.
        diagnostics: Vec<String>,
    },

    /// Formula evaluation error outside of a layout pass.
    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),
}

impl BimError {
    /// Collected diagnostics for compile/layout failures, empty otherwise.
    pub fn diagnostics(&self) -> &[String] {
        match self {
            BimError::Compile { diagnostics, .. } | BimError::Layout { diagnostics, .. } => {
                diagnostics
            }
            _ => &[],
        }
    }
}
