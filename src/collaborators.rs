//! Interfaces of the external collaborators: the detector that produces raw
//! instance masks and the dataset that provides images and ground truth.

use crate::core_modules::bounding_box::BoundingBox;
use crate::core_modules::mask::{ClassId, Mask};
use crate::error::{EvalError, Result};
use image::GrayImage;

/// Identifier of an image inside a dataset.
pub type ImageId = usize;

/// Raw detector output for one image: `K` masks with their boxes, classes and scores.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detections {
    pub masks: Vec<Mask>,
    pub boxes: Vec<BoundingBox>,
    pub class_ids: Vec<ClassId>,
    pub scores: Vec<f64>,
}

impl Detections {
    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    /// Checks that all per-object fields have the same length, that every score
    /// is finite and that all masks share one shape.
    pub fn validate(&self) -> Result<()> {
        let k = self.masks.len();
        if self.boxes.len() != k || self.class_ids.len() != k || self.scores.len() != k {
            return Err(EvalError::LengthMismatch(format!(
                "{} masks, {} boxes, {} class ids, {} scores",
                k,
                self.boxes.len(),
                self.class_ids.len(),
                self.scores.len()
            )));
        }
        if let Some((i, score)) = self.scores.iter().enumerate().find(|(_, s)| !s.is_finite()) {
            return Err(EvalError::InvalidDetection(format!(
                "object {} has a non-finite score {}",
                i, score
            )));
        }
        if let Some((first, rest)) = self.masks.split_first() {
            for mask in rest {
                first.check_same_dimensions(mask)?;
            }
        }
        Ok(())
    }
}

/// An instance-segmentation model. Invoking it is a blocking call.
pub trait Detector {
    type Image;

    fn detect(&self, image: &Self::Image) -> Result<Detections>;
}

/// A labelled image collection.
pub trait Dataset {
    type Image;

    fn image_ids(&self) -> Vec<ImageId>;

    /// Human-readable location of the image, used in logs.
    fn image_path(&self, id: ImageId) -> String;

    fn load_image(&self, id: ImageId) -> Result<Self::Image>;

    /// Raw ground-truth rasters, one per annotation channel. Non-zero pixels are
    /// foreground; their value is the class of the object they belong to.
    fn load_gt_masks(&self, id: ImageId) -> Result<Vec<GrayImage>>;

    /// Image-level class label.
    fn image_class(&self, id: ImageId) -> Result<ClassId>;
}
