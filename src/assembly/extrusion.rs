//! Profile extrusions for trim, mullions and structure lines.

use crate::database::{AssetLookup, Material, Profile};
use crate::error::{BimError, Result};
use crate::preset::PropertySheet;
use crate::types::Scope;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtrusionSpec {
    pub preset_key: String,
    pub properties: PropertySheet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<Material>,
    pub width_cm: f32,
    pub depth_cm: f32,
}

impl ExtrusionSpec {
    pub fn new(preset_key: impl Into<String>) -> Self {
        Self {
            preset_key: preset_key.into(),
            ..Default::default()
        }
    }

    /// Resolve the profile and cross-section dimensions.
    ///
    /// An extrusion without a profile key is allowed; a profile key that does
    /// not resolve is an error.
    pub fn build(&mut self, assets: &dyn AssetLookup) -> Result<()> {
        match self.properties.text(Scope::Profile, "AssetID") {
            Some(key) => {
                let profile = assets.profile(&key).ok_or_else(|| {
                    BimError::ExtrusionBuild(format!(
                        "extrusion {} references unknown profile {}",
                        self.preset_key, key
                    ))
                })?;
                self.profile = Some(profile.clone());
            }
            None => tracing::warn!("extrusion {} has no profile", self.preset_key),
        }

        self.width_cm = self
            .properties
            .dimension_cm(Scope::Dimension, "Width")
            .unwrap_or(0.0);
        self.depth_cm = self
            .properties
            .dimension_cm(Scope::Dimension, "Depth")
            .unwrap_or(0.0);
        Ok(())
    }
}
