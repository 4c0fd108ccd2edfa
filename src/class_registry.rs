//! Enumerated class registry shared by the detector, the dataset and the renderer.
//!
//! Maps class id ↔ label ↔ display color ↔ split policy. Validated once when it
//! is built, so lookups later on can only fail for ids the registry never had.

use crate::core_modules::mask::ClassId;
use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How raw masks of a class are decomposed into regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitPolicy {
    /// Kept as a single region even when it has several disconnected parts.
    WholeObject,
    /// Split into its connected components.
    #[default]
    Splittable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub id: ClassId,
    pub label: String,
    /// RGB display color used by overlay renderers.
    pub color: [u8; 3],
    #[serde(default)]
    pub policy: SplitPolicy,
}

impl ClassInfo {
    pub fn new(id: ClassId, label: &str, color: [u8; 3], policy: SplitPolicy) -> Self {
        Self {
            id,
            label: label.to_string(),
            color,
            policy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ClassInfo>", into = "Vec<ClassInfo>")]
pub struct ClassRegistry {
    classes: Vec<ClassInfo>,
}

impl ClassRegistry {
    /// Builds a registry. Ids must be exactly `0..n` in order, labels must be
    /// unique and non-empty. Class 0 is the background class.
    pub fn new(classes: Vec<ClassInfo>) -> Result<Self> {
        if classes.is_empty() {
            return Err(EvalError::InvalidRegistry(
                "registry needs at least the background class".to_string(),
            ));
        }

        let mut labels: HashSet<&str> = HashSet::new();
        for (index, class) in classes.iter().enumerate() {
            if class.id != index {
                return Err(EvalError::InvalidRegistry(format!(
                    "class '{}' has id {} but sits at position {}",
                    class.label, class.id, index
                )));
            }
            if class.label.trim().is_empty() {
                return Err(EvalError::InvalidRegistry(format!(
                    "class {} has an empty label",
                    class.id
                )));
            }
            if !labels.insert(class.label.as_str()) {
                return Err(EvalError::InvalidRegistry(format!(
                    "duplicate label '{}'",
                    class.label
                )));
            }
        }
        drop(labels);

        Ok(Self { classes })
    }

    /// Background, sidelobe and compact source classes (splittable) plus two
    /// extended galaxy morphologies (whole-object).
    pub fn radio_astronomy() -> Self {
        Self {
            classes: vec![
                ClassInfo::new(0, "bkg", [0, 0, 0], SplitPolicy::Splittable),
                ClassInfo::new(1, "sidelobe", [255, 255, 0], SplitPolicy::Splittable),
                ClassInfo::new(2, "source", [255, 0, 0], SplitPolicy::Splittable),
                ClassInfo::new(3, "galaxy_C2", [0, 0, 255], SplitPolicy::WholeObject),
                ClassInfo::new(4, "galaxy_C3", [0, 255, 0], SplitPolicy::WholeObject),
            ],
        }
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn get(&self, id: ClassId) -> Result<&ClassInfo> {
        self.classes.get(id).ok_or(EvalError::UnknownClass(id))
    }

    pub fn label(&self, id: ClassId) -> Result<&str> {
        self.get(id).map(|c| c.label.as_str())
    }

    pub fn policy(&self, id: ClassId) -> Result<SplitPolicy> {
        self.get(id).map(|c| c.policy)
    }

    pub fn color(&self, id: ClassId) -> Result<[u8; 3]> {
        self.get(id).map(|c| c.color)
    }

    pub fn by_label(&self, label: &str) -> Option<&ClassInfo> {
        self.classes.iter().find(|c| c.label == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.iter()
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::radio_astronomy()
    }
}

impl TryFrom<Vec<ClassInfo>> for ClassRegistry {
    type Error = EvalError;

    fn try_from(classes: Vec<ClassInfo>) -> Result<Self> {
        Self::new(classes)
    }
}

impl From<ClassRegistry> for Vec<ClassInfo> {
    fn from(registry: ClassRegistry) -> Self {
        registry.classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_is_valid() {
        let registry = ClassRegistry::default();
        assert_eq!(registry.n_classes(), 5);
        assert!(ClassRegistry::new(registry.iter().cloned().collect()).is_ok());
        assert_eq!(registry.label(1).unwrap(), "sidelobe");
        assert_eq!(registry.policy(3).unwrap(), SplitPolicy::WholeObject);
        assert_eq!(registry.policy(2).unwrap(), SplitPolicy::Splittable);
        assert_eq!(registry.by_label("galaxy_C3").map(|c| c.id), Some(4));
    }

    #[test]
    fn unknown_id_is_an_error() {
        let registry = ClassRegistry::default();
        assert!(matches!(registry.get(7), Err(EvalError::UnknownClass(7))));
    }

    #[test]
    fn ids_must_be_contiguous() {
        let result = ClassRegistry::new(vec![
            ClassInfo::new(0, "bkg", [0, 0, 0], SplitPolicy::Splittable),
            ClassInfo::new(2, "source", [255, 0, 0], SplitPolicy::Splittable),
        ]);
        assert!(matches!(result, Err(EvalError::InvalidRegistry(_))));
    }

    #[test]
    fn labels_must_be_unique() {
        let result = ClassRegistry::new(vec![
            ClassInfo::new(0, "bkg", [0, 0, 0], SplitPolicy::Splittable),
            ClassInfo::new(1, "bkg", [255, 0, 0], SplitPolicy::Splittable),
        ]);
        assert!(result.is_err());
        assert!(ClassRegistry::new(Vec::new()).is_err());
    }

    #[test]
    fn json_round_trip_validates() {
        let json = r#"[
            {"id": 0, "label": "bkg", "color": [0, 0, 0]},
            {"id": 1, "label": "galaxy", "color": [0, 0, 255], "policy": "whole_object"}
        ]"#;
        let registry: ClassRegistry = serde_json::from_str(json).unwrap();
        assert_eq!(registry.policy(0).unwrap(), SplitPolicy::Splittable);
        assert_eq!(registry.policy(1).unwrap(), SplitPolicy::WholeObject);

        let bad = r#"[{"id": 1, "label": "bkg", "color": [0, 0, 0]}]"#;
        assert!(serde_json::from_str::<ClassRegistry>(bad).is_err());
    }
}
