// THEORY:
// The `RegionSplitter` decomposes a raw mask into the regions the grouping layer
// works with. Detectors routinely emit one mask that covers several disjoint
// blobs, and annotators often paint several objects into one raster, so the first
// step of reconciliation is always to pull those blobs apart.
//
// Two policies exist:
// 1.  **Whole-object**: extended classes (e.g. galaxies with detached lobes) keep
//     their raw mask as a single region, disconnected parts included.
// 2.  **Splittable**: every 4-connected component becomes its own region.
//
// Ground-truth rasters encode the per-object class in their pixel values. They
// are labeled by value, so a component never mixes two classes even when two
// differently-valued objects touch. The class of a component is read from the
// raw raster at its first foreground cell (row-major).

use crate::class_registry::SplitPolicy;
use crate::core_modules::instance::Region;
use crate::core_modules::mask::{ClassId, Mask};
use crate::core_modules::raster_labeler;
use image::GrayImage;
use tracing::debug;

/// Splits one ground-truth raster.
///
/// `declared_class` is the image-level class; it is used as is for whole-object
/// images and ignored for splittable ones, where the pixel value decides.
pub fn split_ground_truth(raw: &GrayImage, declared_class: ClassId, policy: SplitPolicy) -> Vec<Region> {
    match policy {
        SplitPolicy::WholeObject => vec![Region {
            mask: Mask::from_luma(raw),
            class_id: declared_class,
            score: None,
        }],
        SplitPolicy::Splittable => {
            let labeling = raster_labeler::label_by_value(raw);
            debug!("Found {} sub components in ground truth mask", labeling.count());

            let mut regions = Vec::with_capacity(labeling.count() as usize);
            for component in 1..=labeling.count() {
                let Some((x, y)) = labeling.first_pixel(component) else {
                    continue;
                };
                let class_id = raw.get_pixel(x, y).0[0] as ClassId;
                debug!("Ground truth component {}: class_id={}", component, class_id);
                regions.push(Region {
                    mask: labeling.component_mask(component),
                    class_id,
                    score: None,
                });
            }
            regions
        }
    }
}

/// Splits one detection mask. Every region inherits the detection's class and score.
pub fn split_detection(mask: &Mask, class_id: ClassId, score: f64, policy: SplitPolicy) -> Vec<Region> {
    match policy {
        SplitPolicy::WholeObject => vec![Region {
            mask: mask.clone(),
            class_id,
            score: Some(score),
        }],
        SplitPolicy::Splittable => {
            let labeling = raster_labeler::label(mask);
            debug!("Found {} sub components in detected mask", labeling.count());
            (1..=labeling.count())
                .map(|component| Region {
                    mask: labeling.component_mask(component),
                    class_id,
                    score: Some(score),
                })
                .collect()
        }
    }
}
