//! In-memory collaborators: a dataset held entirely in memory and a detector
//! that replays cached outputs. Used for offline re-scoring of stored detector
//! runs and throughout the tests.

use crate::collaborators::{Dataset, Detections, Detector, ImageId};
use crate::core_modules::mask::ClassId;
use crate::error::{EvalError, Result};
use image::{GrayImage, RgbImage};
use std::collections::HashMap;

/// An image tagged with its dataset id so replayed detections can find it.
#[derive(Debug, Clone)]
pub struct SampleImage {
    pub id: ImageId,
    pub pixels: RgbImage,
}

#[derive(Debug, Clone)]
pub struct AnnotatedSample {
    pub path: String,
    pub pixels: RgbImage,
    pub gt_masks: Vec<GrayImage>,
    pub class_id: ClassId,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryDataset {
    samples: Vec<AnnotatedSample>,
}

impl InMemoryDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sample and returns its image id.
    pub fn push(&mut self, sample: AnnotatedSample) -> ImageId {
        self.samples.push(sample);
        self.samples.len() - 1
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn sample(&self, id: ImageId) -> Result<&AnnotatedSample> {
        self.samples
            .get(id)
            .ok_or_else(|| EvalError::Dataset(format!("no image with id {}", id)))
    }
}

impl Dataset for InMemoryDataset {
    type Image = SampleImage;

    fn image_ids(&self) -> Vec<ImageId> {
        (0..self.samples.len()).collect()
    }

    fn image_path(&self, id: ImageId) -> String {
        self.samples
            .get(id)
            .map(|s| s.path.clone())
            .unwrap_or_else(|| format!("<image {}>", id))
    }

    fn load_image(&self, id: ImageId) -> Result<SampleImage> {
        let sample = self.sample(id)?;
        Ok(SampleImage {
            id,
            pixels: sample.pixels.clone(),
        })
    }

    fn load_gt_masks(&self, id: ImageId) -> Result<Vec<GrayImage>> {
        Ok(self.sample(id)?.gt_masks.clone())
    }

    fn image_class(&self, id: ImageId) -> Result<ClassId> {
        Ok(self.sample(id)?.class_id)
    }
}

/// Replays previously recorded detector output, keyed by image id.
#[derive(Debug, Clone, Default)]
pub struct ReplayDetector {
    outputs: HashMap<ImageId, Detections>,
}

impl ReplayDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, id: ImageId, detections: Detections) {
        self.outputs.insert(id, detections);
    }
}

impl Detector for ReplayDetector {
    type Image = SampleImage;

    fn detect(&self, image: &SampleImage) -> Result<Detections> {
        self.outputs
            .get(&image.id)
            .cloned()
            .ok_or_else(|| EvalError::Detector(format!("no recorded output for image {}", image.id)))
    }
}
