//! Scoped property sheets.
//!
//! Properties are addressed by `(Scope, name)` and serialize as a flat map
//! keyed by `"Scope.Name"`:
//!
//! ```json
//! { "Dimension.Width": "10", "RawMaterial.AssetID": "Brick" }
//! ```

use crate::types::{parse_dimension, Scope};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Address of a property: the scope it applies to and its name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyKey {
    pub scope: Scope,
    pub name: String,
}

impl PropertyKey {
    pub fn new(scope: Scope, name: impl Into<String>) -> Self {
        Self {
            scope,
            name: name.into(),
        }
    }

    /// Parse a `"Scope.Name"` string.
    pub fn parse(text: &str) -> Option<Self> {
        let (scope, name) = text.split_once('.')?;
        let scope = scope.parse::<Scope>().ok()?;
        if name.is_empty() {
            return None;
        }
        Some(Self::new(scope, name))
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.scope, self.name)
    }
}

/// A property value as authored: a number or a text cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Number(f32),
    Text(String),
}

impl PropertyValue {
    /// Empty text cells are blank; numbers never are.
    pub fn is_blank(&self) -> bool {
        match self {
            PropertyValue::Number(_) => false,
            PropertyValue::Text(s) => s.trim().is_empty(),
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            PropertyValue::Number(v) => v.to_string(),
            PropertyValue::Text(s) => s.clone(),
        }
    }

    pub fn as_number(&self) -> Option<f32> {
        match self {
            PropertyValue::Number(v) => Some(*v),
            PropertyValue::Text(s) => s.trim().parse::<f32>().ok(),
        }
    }
}

impl From<f32> for PropertyValue {
    fn from(value: f32) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

/// Ordered map of scoped properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, PropertyValue>",
    into = "BTreeMap<String, PropertyValue>"
)]
pub struct PropertySheet {
    values: BTreeMap<PropertyKey, PropertyValue>,
}

impl PropertySheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, scope: Scope, name: impl Into<String>, value: impl Into<PropertyValue>) {
        self.values
            .insert(PropertyKey::new(scope, name), value.into());
    }

    pub fn get(&self, scope: Scope, name: &str) -> Option<&PropertyValue> {
        // BTreeMap lookups need an owned key.
        self.values.get(&PropertyKey::new(scope, name))
    }

    pub fn contains(&self, scope: Scope, name: &str) -> bool {
        self.get(scope, name).is_some()
    }

    pub fn remove(&mut self, scope: Scope, name: &str) -> Option<PropertyValue> {
        self.values.remove(&PropertyKey::new(scope, name))
    }

    /// Non-blank text value of a property.
    pub fn text(&self, scope: Scope, name: &str) -> Option<String> {
        self.get(scope, name)
            .filter(|v| !v.is_blank())
            .map(|v| v.to_text().trim().to_string())
    }

    pub fn number(&self, scope: Scope, name: &str) -> Option<f32> {
        self.get(scope, name).and_then(PropertyValue::as_number)
    }

    /// A dimension in world centimeters. Text cells go through [`parse_dimension`].
    pub fn dimension_cm(&self, scope: Scope, name: &str) -> Option<f32> {
        match self.get(scope, name)? {
            PropertyValue::Number(v) => Some(*v),
            PropertyValue::Text(s) => parse_dimension(s),
        }
    }

    /// Boolean cell: any non-blank value other than `0`, `false` or `no`.
    pub fn flag(&self, scope: Scope, name: &str) -> bool {
        match self.get(scope, name) {
            Some(PropertyValue::Number(v)) => *v != 0.0,
            Some(PropertyValue::Text(s)) => {
                let s = s.trim();
                !s.is_empty()
                    && s != "0"
                    && !s.eq_ignore_ascii_case("false")
                    && !s.eq_ignore_ascii_case("no")
            }
            None => false,
        }
    }

    /// Merge `other` into this sheet.
    ///
    /// Incoming values overwrite existing ones, except that a blank cell never
    /// erases a value that is already set.
    pub fn merge(&mut self, other: &PropertySheet) {
        for (key, value) in &other.values {
            if value.is_blank() && self.values.contains_key(key) {
                continue;
            }
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// All properties in one scope, in name order.
    pub fn scope(&self, scope: Scope) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.values
            .iter()
            .filter(move |(k, _)| k.scope == scope)
            .map(|(k, v)| (k.name.as_str(), v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PropertyKey, &PropertyValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl TryFrom<BTreeMap<String, PropertyValue>> for PropertySheet {
    type Error = String;

    fn try_from(map: BTreeMap<String, PropertyValue>) -> Result<Self, Self::Error> {
        let mut values = BTreeMap::new();
        for (key, value) in map {
            let key = PropertyKey::parse(&key)
                .ok_or_else(|| format!("invalid property key '{}', expected Scope.Name", key))?;
            values.insert(key, value);
        }
        Ok(Self { values })
    }
}

impl From<PropertySheet> for BTreeMap<String, PropertyValue> {
    fn from(sheet: PropertySheet) -> Self {
        sheet
            .values
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }
}
