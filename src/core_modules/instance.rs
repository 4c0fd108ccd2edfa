// THEORY:
// Three containers describe an object as it moves up through the engine:
//
// 1.  `Region`: one connected raster component produced by splitting a raw mask.
//     It is the node type of the grouping graph.
// 2.  `Instance`: one or more same-class touching regions unioned into a single
//     logical object. Detections carry an averaged score, ground truth does not.
// 3.  `AnnotatedInstance`: an instance that survived degenerate-box filtering and
//     was decorated with its box, label, caption and display color. This is the
//     only thing matching and rendering ever see.

use crate::class_registry::ClassRegistry;
use crate::core_modules::bounding_box::BoundingBox;
use crate::core_modules::mask::{ClassId, Mask};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub mask: Mask,
    pub class_id: ClassId,
    /// Confidence inherited from the parent detection; `None` for ground truth.
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub mask: Mask,
    pub class_id: ClassId,
    /// Mean confidence of the merged regions; `None` for ground truth.
    pub score: Option<f64>,
}

impl From<Instance> for Region {
    fn from(instance: Instance) -> Self {
        Self {
            mask: instance.mask,
            class_id: instance.class_id,
            score: instance.score,
        }
    }
}

/// A final, drawable object handed to matching and to renderers.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedInstance {
    pub mask: Mask,
    pub class_id: ClassId,
    pub score: Option<f64>,
    pub bbox: BoundingBox,
    pub label: String,
    /// `"{label}"` for ground truth, `"{label} {score:.3}"` for detections.
    pub caption: String,
    pub color: [u8; 3],
}

impl AnnotatedInstance {
    /// Decorates `instance`. Returns `Ok(None)` when the mask has no foreground,
    /// since such an instance has no meaningful box.
    pub fn annotate(instance: Instance, registry: &ClassRegistry) -> Result<Option<Self>> {
        let Some(bbox) = BoundingBox::from_mask(&instance.mask) else {
            return Ok(None);
        };
        let class = registry.get(instance.class_id)?;
        let caption = match instance.score {
            Some(score) => format!("{} {:.3}", class.label, score),
            None => class.label.clone(),
        };
        Ok(Some(Self {
            mask: instance.mask,
            class_id: instance.class_id,
            score: instance.score,
            bbox,
            label: class.label.clone(),
            caption,
            color: class.color,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_caption_has_three_decimals() {
        let registry = ClassRegistry::default();
        let instance = Instance {
            mask: Mask::from_ascii(&[".#", "##"]),
            class_id: 2,
            score: Some(0.91234),
        };
        let annotated = AnnotatedInstance::annotate(instance, &registry)
            .unwrap()
            .expect("non-empty mask");
        assert_eq!(annotated.caption, "source 0.912");
        assert_eq!(annotated.bbox, BoundingBox::new(0, 0, 2, 2));
        assert_eq!(annotated.color, [255, 0, 0]);
    }

    #[test]
    fn ground_truth_caption_is_the_label() {
        let registry = ClassRegistry::default();
        let instance = Instance {
            mask: Mask::from_ascii(&["#"]),
            class_id: 1,
            score: None,
        };
        let annotated = AnnotatedInstance::annotate(instance, &registry).unwrap().unwrap();
        assert_eq!(annotated.caption, "sidelobe");
    }

    #[test]
    fn degenerate_instance_is_dropped() {
        let registry = ClassRegistry::default();
        let instance = Instance {
            mask: Mask::new(3, 3),
            class_id: 1,
            score: Some(0.9),
        };
        assert!(AnnotatedInstance::annotate(instance, &registry).unwrap().is_none());
    }

    #[test]
    fn unknown_class_fails_annotation() {
        let registry = ClassRegistry::default();
        let instance = Instance {
            mask: Mask::from_ascii(&["#"]),
            class_id: 42,
            score: None,
        };
        assert!(AnnotatedInstance::annotate(instance, &registry).is_err());
    }
}
