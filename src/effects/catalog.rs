// SPDX-License-Identifier: GPL-3.0-only

//! Effect catalog and the user's current selection

use super::{EffectDescriptor, EffectKind};
use crate::constants::effect_parameter;

/// One selectable effect
#[derive(Debug, Clone, PartialEq)]
pub struct EffectCatalogEntry {
    pub display_name: String,
    pub effect: EffectKind,
    pub parameter_name: String,
    pub default_value: f32,
    pub min_value: f32,
    pub max_value: f32,
    pub icon_path: String,
}

impl EffectCatalogEntry {
    /// Entry for `effect` with the given parameter range.
    ///
    /// The bounds may be given in either order; the default is clamped into
    /// the resulting range.
    pub fn new(effect: EffectKind, default_value: f32, min_value: f32, max_value: f32) -> Self {
        let (min_value, max_value) = if min_value <= max_value {
            (min_value, max_value)
        } else {
            (max_value, min_value)
        };
        let display_name = effect.id().to_string();
        Self {
            icon_path: format!("images/{}.jpg", display_name),
            display_name,
            effect,
            parameter_name: effect.parameter_name().to_string(),
            default_value: default_value.clamp(min_value, max_value),
            min_value,
            max_value,
        }
    }

    /// Backing effect identifier
    pub fn effect_id(&self) -> &'static str {
        self.effect.id()
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min_value, self.max_value)
    }

    /// Descriptor for this entry with the given parameter value
    pub fn descriptor(&self, value: f32) -> EffectDescriptor {
        EffectDescriptor::with_parameter(self.effect_id(), &self.parameter_name, self.clamp(value))
    }
}

/// Read-only list of effects offered to the user
#[derive(Debug, Clone, PartialEq)]
pub struct EffectCatalog {
    entries: Vec<EffectCatalogEntry>,
}

impl Default for EffectCatalog {
    fn default() -> Self {
        let entry = |kind| {
            EffectCatalogEntry::new(
                kind,
                effect_parameter::DEFAULT,
                effect_parameter::MIN,
                effect_parameter::MAX,
            )
        };

        Self {
            entries: EffectKind::ALL.into_iter().map(entry).collect(),
        }
    }
}

impl EffectCatalog {
    pub fn new(entries: Vec<EffectCatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[EffectCatalogEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&EffectCatalogEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the entry backed by `effect_id` (case-insensitive)
    pub fn position(&self, effect_id: &str) -> Option<usize> {
        let kind = EffectKind::from_id(effect_id)?;
        self.entries.iter().position(|e| e.effect == kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Selected {
    index: usize,
    value: f32,
}

/// The catalog plus the single "currently selected" slot.
///
/// Changing the selection has no effect on a camera session by itself;
/// the caller clears and re-applies the effect afterwards.
#[derive(Debug, Clone)]
pub struct EffectSelection {
    catalog: EffectCatalog,
    selected: Option<Selected>,
}

impl EffectSelection {
    pub fn new(catalog: EffectCatalog) -> Self {
        Self {
            catalog,
            selected: None,
        }
    }

    pub fn catalog(&self) -> &EffectCatalog {
        &self.catalog
    }

    /// Select the entry at `index` with its default parameter value
    pub fn select(&mut self, index: usize) -> Option<&EffectCatalogEntry> {
        let entry = self.catalog.get(index)?;
        self.selected = Some(Selected {
            index,
            value: entry.default_value,
        });
        Some(entry)
    }

    /// Select by effect identifier
    pub fn select_id(&mut self, effect_id: &str) -> Option<&EffectCatalogEntry> {
        let index = self.catalog.position(effect_id)?;
        self.select(index)
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected.map(|s| s.index)
    }

    pub fn selected(&self) -> Option<&EffectCatalogEntry> {
        self.selected.and_then(|s| self.catalog.get(s.index))
    }

    /// Current parameter value of the selected entry
    pub fn value(&self) -> Option<f32> {
        self.selected.map(|s| s.value)
    }

    /// Set the selected entry's parameter value, clamped to its range.
    ///
    /// Returns the stored value, or `None` if nothing is selected.
    pub fn set_value(&mut self, value: f32) -> Option<f32> {
        let entry = self.selected()?;
        let clamped = entry.clamp(value);
        if let Some(selected) = self.selected.as_mut() {
            selected.value = clamped;
        }
        Some(clamped)
    }

    /// Descriptor for the current selection
    pub fn descriptor(&self) -> Option<EffectDescriptor> {
        let selected = self.selected?;
        self.catalog
            .get(selected.index)
            .map(|entry| entry.descriptor(selected.value))
    }
}

impl Default for EffectSelection {
    fn default() -> Self {
        Self::new(EffectCatalog::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_matches_effect_kinds() {
        let catalog = EffectCatalog::default();
        assert_eq!(catalog.len(), EffectKind::ALL.len());

        let sepia = &catalog.entries()[catalog.position("Sepia").unwrap()];
        assert_eq!(sepia.parameter_name, "Intensity");
        assert_eq!(sepia.default_value, 0.5);
        assert_eq!(sepia.min_value, 0.0);
        assert_eq!(sepia.max_value, 1.0);
        assert_eq!(sepia.icon_path, "images/Sepia.jpg");

        let edges = &catalog.entries()[catalog.position("EdgeDetection").unwrap()];
        assert_eq!(edges.parameter_name, "Amount");
    }

    #[test]
    fn test_entry_orders_reversed_bounds() {
        let entry = EffectCatalogEntry::new(EffectKind::Sepia, 0.5, 1.0, 0.0);
        assert_eq!(entry.min_value, 0.0);
        assert_eq!(entry.max_value, 1.0);

        let mut selection = EffectSelection::new(EffectCatalog::new(vec![entry]));
        selection.select(0).unwrap();
        assert_eq!(selection.set_value(0.3), Some(0.3));
        assert_eq!(selection.set_value(4.0), Some(1.0));
    }

    #[test]
    fn test_entry_clamps_default_into_range() {
        let entry = EffectCatalogEntry::new(EffectKind::Vignette, 2.0, 0.0, 1.0);
        assert_eq!(entry.default_value, 1.0);
    }

    #[test]
    fn test_selection_starts_empty() {
        let selection = EffectSelection::default();
        assert!(selection.selected().is_none());
        assert!(selection.descriptor().is_none());
    }

    #[test]
    fn test_set_value_without_selection_is_noop() {
        let mut selection = EffectSelection::default();
        assert_eq!(selection.set_value(0.8), None);
        assert!(selection.value().is_none());
    }

    #[test]
    fn test_set_value_clamps_to_entry_range() {
        let mut selection = EffectSelection::default();
        selection.select_id("Vignette").unwrap();
        assert_eq!(selection.set_value(1.7), Some(1.0));
        assert_eq!(selection.set_value(-0.3), Some(0.0));
        assert_eq!(selection.set_value(0.3), Some(0.3));

        let descriptor = selection.descriptor().unwrap();
        assert_eq!(descriptor.effect_id, "Vignette");
        assert_eq!(descriptor.parameter_name(), Some("Amount"));
        assert_eq!(descriptor.parameter_value(), Some(0.3));
    }

    #[test]
    fn test_reselect_resets_value() {
        let mut selection = EffectSelection::default();
        selection.select_id("Sepia");
        selection.set_value(0.9);
        selection.select_id("Sepia");
        assert_eq!(selection.value(), Some(0.5));
    }

    #[test]
    fn test_select_out_of_range() {
        let mut selection = EffectSelection::default();
        assert!(selection.select(99).is_none());
        assert!(selection.selected().is_none());
    }
}
