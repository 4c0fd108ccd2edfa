// THEORY:
// The `Analyzer` is the per-image orchestrator of the reconciliation engine. It
// runs the full stack for a single image and hands back everything a renderer or
// a tester needs, without keeping any state between images.
//
// Stages:
// 1.  **Ground Truth Extraction**: raw annotation rasters → regions → same-class
//     merge → annotated instances.
// 2.  **Detection Extraction**: score filter → descending sort → split → same-class
//     merge → class-blind overlap resolution → annotated instances.
// 3.  **Matching**: box IoU association in both directions, producing the image's
//     confusion-matrix and purity contribution (`ImageReport`).

use crate::class_registry::ClassRegistry;
use crate::collaborators::{Dataset, Detections, Detector, ImageId};
use crate::config::AnalyzerConfig;
use crate::core_modules::group_merger::{self, EdgeRule};
use crate::core_modules::instance::{AnnotatedInstance, Instance, Region};
use crate::core_modules::mask::ClassId;
use crate::core_modules::matcher;
use crate::core_modules::performance::ImageReport;
use crate::core_modules::region_splitter;
use crate::error::{EvalError, Result};
use image::GrayImage;
use tracing::{debug, info, warn};

/// Everything produced for one inspected image.
#[derive(Debug, Clone)]
pub struct ImageAnalysis {
    pub image_id: ImageId,
    pub image_path: String,
    pub ground_truth: Vec<AnnotatedInstance>,
    pub detections: Vec<AnnotatedInstance>,
    pub report: ImageReport,
}

#[derive(Debug, Clone)]
pub struct Analyzer {
    config: AnalyzerConfig,
    registry: ClassRegistry,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig, registry: ClassRegistry) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    /// Runs detection and ground-truth reconciliation for `image_id` and scores
    /// the result. Fails with `MissingDataset` when no dataset is bound.
    pub fn inspect<D, M>(&self, dataset: Option<&D>, detector: &M, image_id: ImageId) -> Result<ImageAnalysis>
    where
        D: Dataset,
        M: Detector<Image = D::Image>,
    {
        let dataset = dataset.ok_or(EvalError::MissingDataset)?;
        let image_path = dataset.image_path(image_id);

        // Stage 0: Data retrieval
        info!("Retrieve data from dataset & model for image {} ...", image_path);
        let image = dataset.load_image(image_id)?;
        let detections = detector.detect(&image)?;
        let raw_gt = dataset.load_gt_masks(image_id)?;
        let image_class = dataset.image_class(image_id)?;

        // Stage 1: Ground truth
        info!("Processing ground truth masks ...");
        let ground_truth = self.extract_ground_truth(&raw_gt, image_class)?;

        // Stage 2: Detections
        let detections = if detections.is_empty() {
            warn!("No detected object found for image {} ...", image_path);
            Vec::new()
        } else {
            info!("Processing detected masks ...");
            self.extract_detections(&detections)?
        };

        // Stage 3: Matching
        info!("Compute performance results for image {} ...", image_path);
        let report = self.compute_performances(&ground_truth, &detections);
        debug!("Sample performances for image {}:\n{}", image_path, report.summary());

        Ok(ImageAnalysis {
            image_id,
            image_path,
            ground_truth,
            detections,
            report,
        })
    }

    /// Runs the detector on an image without ground truth and returns the final,
    /// drawable detections.
    pub fn predict<M: Detector>(&self, detector: &M, image: &M::Image) -> Result<Vec<AnnotatedInstance>> {
        let detections = detector.detect(image)?;
        if detections.is_empty() {
            warn!("No detected object found ...");
            return Ok(Vec::new());
        }
        self.extract_detections(&detections)
    }

    /// Splits and merges the raw ground-truth rasters of one image.
    ///
    /// Whole-object image classes keep each raster as a single region with the
    /// image class; otherwise every connected component becomes a region whose
    /// class is read from its pixel values.
    pub fn extract_ground_truth(&self, raw_masks: &[GrayImage], image_class: ClassId) -> Result<Vec<AnnotatedInstance>> {
        let policy = self.registry.policy(image_class)?;
        if let Some((first, rest)) = raw_masks.split_first() {
            for raw in rest {
                if raw.dimensions() != first.dimensions() {
                    return Err(EvalError::DimensionMismatch {
                        expected: first.dimensions(),
                        found: raw.dimensions(),
                    });
                }
            }
        }

        let mut regions: Vec<Region> = Vec::new();
        for (k, raw) in raw_masks.iter().enumerate() {
            let split = region_splitter::split_ground_truth(raw, image_class, policy);
            debug!("Ground truth mask no. {} split into {} regions", k, split.len());
            for region in &split {
                self.registry.get(region.class_id)?;
            }
            regions.extend(split);
        }

        let merged = group_merger::merge(&regions, EdgeRule::SameClassTouching)?;
        self.annotate_all(merged)
    }

    /// Turns raw detector output into final, non-overlapping instances.
    pub fn extract_detections(&self, detections: &Detections) -> Result<Vec<AnnotatedInstance>> {
        detections.validate()?;
        info!("{} objects found in this image ...", detections.len());

        // Score filter.
        let mut selected: Vec<usize> = Vec::with_capacity(detections.len());
        for i in 0..detections.len() {
            let class_id = detections.class_ids[i];
            let score = detections.scores[i];
            if score < self.config.score_threshold {
                info!(
                    "Skipping object {} (id={}) with score {:.3} < thr={:.3} ...",
                    self.registry.label(class_id).unwrap_or("?"),
                    class_id,
                    score,
                    self.config.score_threshold
                );
                continue;
            }
            let label = self.registry.label(class_id)?;
            debug!("Selecting object {} (id={}) with score {:.3} ...", label, class_id, score);
            selected.push(i);
        }
        info!("{} objects selected in this image ...", selected.len());

        // Highest scores first, later detections first on equal scores. The order
        // carries through merging and matching.
        selected.sort_by(|&a, &b| {
            detections.scores[b]
                .total_cmp(&detections.scores[a])
                .then(b.cmp(&a))
        });

        let mut regions: Vec<Region> = Vec::new();
        for &i in &selected {
            let class_id = detections.class_ids[i];
            let policy = self.registry.policy(class_id)?;
            regions.extend(region_splitter::split_detection(
                &detections.masks[i],
                class_id,
                detections.scores[i],
                policy,
            ));
        }
        info!("Found {} components overall after splitting ...", regions.len());

        let merged = group_merger::merge(&regions, EdgeRule::SameClassTouching)?;
        info!("{} masks found after merging ...", merged.len());

        let resolved = group_merger::resolve_overlaps(merged)?;
        info!("{} masks finally selected ...", resolved.len());

        self.annotate_all(resolved)
    }

    /// Matches ground truth against detections with the configured IoU threshold.
    pub fn compute_performances(&self, ground_truth: &[AnnotatedInstance], detections: &[AnnotatedInstance]) -> ImageReport {
        matcher::compute_performances(
            ground_truth,
            detections,
            self.config.iou_threshold,
            self.registry.n_classes(),
        )
    }

    fn annotate_all(&self, instances: Vec<Instance>) -> Result<Vec<AnnotatedInstance>> {
        let mut annotated = Vec::with_capacity(instances.len());
        for instance in instances {
            match AnnotatedInstance::annotate(instance, &self.registry)? {
                Some(a) => annotated.push(a),
                None => debug!("Dropping instance with an empty mask"),
            }
        }
        Ok(annotated)
    }
}
