//! Box-overlap matching between ground truth and detections, and the per-image
//! confusion/purity accounting built on it.

use crate::core_modules::bounding_box::BoundingBox;
use crate::core_modules::instance::AnnotatedInstance;
use crate::core_modules::performance::ImageReport;
use tracing::{debug, info};

/// Index of the candidate with the greatest IoU above `iou_threshold`.
///
/// A candidate qualifies when `IoU > iou_threshold`. Among qualifying candidates,
/// one whose IoU equals the current best replaces it, so exact ties resolve to
/// the later candidate in scan order.
pub fn best_match<'a>(
    target: &BoundingBox,
    candidates: impl IntoIterator<Item = &'a BoundingBox>,
    iou_threshold: f64,
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (index, candidate) in candidates.into_iter().enumerate() {
        let iou = candidate.iou(target);
        if iou > iou_threshold && best.is_none_or(|(_, best_iou)| iou >= best_iou) {
            best = Some((index, iou));
        }
    }
    best
}

/// Builds the confusion and purity contribution of one image.
///
/// The two directions are scanned independently: each ground-truth instance picks
/// its best detection for the confusion matrix, each detection picks its best
/// ground-truth instance for purity. They may disagree on pairings.
pub fn compute_performances(
    ground_truth: &[AnnotatedInstance],
    detections: &[AnnotatedInstance],
    iou_threshold: f64,
    n_classes: usize,
) -> ImageReport {
    let mut report = ImageReport::new(n_classes);

    for (i, gt) in ground_truth.iter().enumerate() {
        report.counters.nobjs_true[gt.class_id] += 1;

        match best_match(&gt.bbox, detections.iter().map(|d| &d.bbox), iou_threshold) {
            Some((j, iou)) => {
                let assigned = detections[j].class_id;
                report.confusion.increment(gt.class_id, assigned);
                info!(
                    "True object no. {} (class_id={}) associated to detected object no. {} (class_id={}, iou={:.3})",
                    i + 1,
                    gt.class_id,
                    j,
                    assigned,
                    iou
                );
            }
            None => info!(
                "True object no. {} (class_id={}) not associated to any detected object",
                i + 1,
                gt.class_id
            ),
        }
    }

    for (j, det) in detections.iter().enumerate() {
        report.counters.nobjs_det[det.class_id] += 1;

        let matched = best_match(&det.bbox, ground_truth.iter().map(|g| &g.bbox), iou_threshold);
        if let Some((i, _)) = matched {
            if ground_truth[i].class_id == det.class_id {
                report.counters.nobjs_det_right[det.class_id] += 1;
            } else {
                debug!(
                    "Detected object no. {} (class_id={}) matches true object of class {}",
                    j, det.class_id, ground_truth[i].class_id
                );
            }
        }
    }

    report
}
