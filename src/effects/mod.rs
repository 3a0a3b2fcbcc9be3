// SPDX-License-Identifier: GPL-3.0-only

//! Video effects
//!
//! - [`EffectDescriptor`]: what the user asked for (effect id + optional parameter)
//! - [`EffectDefinition`]: what gets attached to a preview stream; its
//!   [`PropertySet`] is shared with the running effect so parameter changes
//!   take effect without reattaching
//! - [`catalog`]: the effects offered to the user and the current selection
//! - [`processing`]: CPU implementation of each effect on RGBA frames

pub mod catalog;
pub mod processing;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// The effects the preview pipeline knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    /// Sobel edge detection blended over the source
    EdgeDetection,
    /// Colour saturation (0 = grayscale, 1 = unchanged)
    Saturation,
    /// Warm brown sepia toning
    Sepia,
    /// Darkened frame edges
    Vignette,
}

impl EffectKind {
    pub const ALL: [EffectKind; 4] = [
        EffectKind::EdgeDetection,
        EffectKind::Saturation,
        EffectKind::Sepia,
        EffectKind::Vignette,
    ];

    /// Identifier used in effect descriptors and the config file
    pub fn id(&self) -> &'static str {
        match self {
            EffectKind::EdgeDetection => "EdgeDetection",
            EffectKind::Saturation => "Saturation",
            EffectKind::Sepia => "Sepia",
            EffectKind::Vignette => "Vignette",
        }
    }

    /// Resolve an effect identifier (case-insensitive)
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.id().eq_ignore_ascii_case(id.trim()))
    }

    /// Name of the single tunable property read by this effect
    pub fn parameter_name(&self) -> &'static str {
        match self {
            EffectKind::EdgeDetection | EffectKind::Vignette => "Amount",
            EffectKind::Saturation | EffectKind::Sepia => "Intensity",
        }
    }
}

impl std::fmt::Display for EffectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// A named numeric effect parameter
#[derive(Debug, Clone, PartialEq)]
pub struct EffectParameter {
    pub name: String,
    pub value: f32,
}

/// Description of one effect to apply to the preview stream
#[derive(Debug, Clone, PartialEq)]
pub struct EffectDescriptor {
    /// Effect identifier, resolved by the backend
    pub effect_id: String,
    /// The effect's tunable parameter, if it has one
    pub parameter: Option<EffectParameter>,
}

impl EffectDescriptor {
    /// Descriptor for an effect without a tunable parameter
    pub fn new(effect_id: impl Into<String>) -> Self {
        Self {
            effect_id: effect_id.into(),
            parameter: None,
        }
    }

    /// Descriptor carrying a single parameter value
    pub fn with_parameter(effect_id: impl Into<String>, name: impl Into<String>, value: f32) -> Self {
        Self {
            effect_id: effect_id.into(),
            parameter: Some(EffectParameter {
                name: name.into(),
                value,
            }),
        }
    }

    pub fn parameter_name(&self) -> Option<&str> {
        self.parameter.as_ref().map(|p| p.name.as_str())
    }

    pub fn parameter_value(&self) -> Option<f32> {
        self.parameter.as_ref().map(|p| p.value)
    }

    /// Build the configuration attached to the stream.
    ///
    /// A descriptor with a parameter gets a single-entry property set.
    pub fn to_definition(&self) -> EffectDefinition {
        let properties = self.parameter.as_ref().map(|param| {
            let set = PropertySet::new();
            set.insert(&param.name, param.value);
            set
        });

        EffectDefinition {
            effect_id: self.effect_id.clone(),
            properties,
        }
    }
}

/// Shared string → value map read by a running effect.
///
/// Clones share storage: a value written through one clone is seen by the
/// capture thread holding another.
#[derive(Debug, Clone, Default)]
pub struct PropertySet {
    values: Arc<RwLock<HashMap<String, f32>>>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, value: f32) {
        self.values
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<f32> {
        self.values
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .copied()
    }

    pub fn len(&self) -> usize {
        self.values.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if both handles share the same storage
    pub fn shares_storage_with(&self, other: &PropertySet) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }
}

/// Effect configuration attached to a stream: identifier plus optional properties
#[derive(Debug, Clone)]
pub struct EffectDefinition {
    pub effect_id: String,
    pub properties: Option<PropertySet>,
}

impl EffectDefinition {
    /// Look up a property value, if this definition has a property set
    pub fn property(&self, key: &str) -> Option<f32> {
        self.properties.as_ref().and_then(|p| p.get(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_id_roundtrip() {
        for kind in EffectKind::ALL {
            assert_eq!(EffectKind::from_id(kind.id()), Some(kind));
        }
        assert_eq!(EffectKind::from_id("sepia"), Some(EffectKind::Sepia));
        assert_eq!(EffectKind::from_id("Blur"), None);
        assert_eq!(EffectKind::from_id(""), None);
    }

    #[test]
    fn test_definition_without_parameter_has_no_properties() {
        let definition = EffectDescriptor::new("Sepia").to_definition();
        assert_eq!(definition.effect_id, "Sepia");
        assert!(definition.properties.is_none());
    }

    #[test]
    fn test_definition_has_single_property() {
        let definition = EffectDescriptor::with_parameter("Sepia", "Intensity", 0.5).to_definition();
        let properties = definition.properties.as_ref().unwrap();
        assert_eq!(properties.len(), 1);
        assert_eq!(definition.property("Intensity"), Some(0.5));
    }

    #[test]
    fn test_property_set_clones_share_values() {
        let a = PropertySet::new();
        let b = a.clone();
        a.insert("Amount", 0.25);
        assert_eq!(b.get("Amount"), Some(0.25));
        assert!(a.shares_storage_with(&b));
        assert!(!a.shares_storage_with(&PropertySet::new()));
    }
}
