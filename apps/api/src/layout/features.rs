//! OpenType feature toggles and their `font-feature-settings` descriptor.

use serde::{Deserialize, Serialize};

/// Boolean feature flags plus an optional free-form stylistic-set tag.
///
/// Tags are not validated: `ss` passes through verbatim (after trimming) even
/// if it is not a 4-character OpenType tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSet {
    pub liga: bool,
    pub calt: bool,
    pub kern: bool,
    pub dlig: bool,
    pub hlig: bool,
    pub salt: bool,
    pub ss: String,
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self {
            liga: true,
            calt: true,
            kern: true,
            dlig: false,
            hlig: false,
            salt: false,
            ss: String::new(),
        }
    }
}

impl FeatureSet {
    /// Flags in canonical order.
    fn flags(&self) -> [(&'static str, bool); 6] {
        [
            ("liga", self.liga),
            ("calt", self.calt),
            ("kern", self.kern),
            ("dlig", self.dlig),
            ("hlig", self.hlig),
            ("salt", self.salt),
        ]
    }

    fn stylistic_set(&self) -> Option<&str> {
        let tag = self.ss.trim();
        (!tag.is_empty()).then_some(tag)
    }

    /// Builds the descriptor string, e.g. `'liga' 1, 'calt' 0, ..., 'ss01' 1`.
    pub fn to_feature_settings(&self) -> String {
        let mut items: Vec<String> = self
            .flags()
            .iter()
            .map(|(tag, on)| format!("'{tag}' {}", u8::from(*on)))
            .collect();
        if let Some(tag) = self.stylistic_set() {
            items.push(format!("'{tag}' 1"));
        }
        items.join(", ")
    }

    /// Short human label of the enabled tags, `(none)` when nothing is on.
    pub fn label(&self) -> String {
        let mut tags: Vec<&str> = self
            .flags()
            .iter()
            .filter(|(_, on)| *on)
            .map(|(tag, _)| *tag)
            .collect();
        if let Some(tag) = self.stylistic_set() {
            tags.push(tag);
        }
        if tags.is_empty() {
            "(none)".to_string()
        } else {
            tags.join(",")
        }
    }
}
