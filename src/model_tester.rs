// THEORY:
// The `ModelTester` drives one `Analyzer` over a whole dataset and keeps the
// running totals. It is the single-threaded reference driver: images are handled
// strictly one after another and each image's `ImageReport` is folded into the
// totals exactly once, after that image finished successfully.
//
// Failure isolation: any error raised while inspecting an image is caught at the
// image boundary, logged, and the image contributes nothing. One bad image never
// aborts the pass.
//
// Cancellation: a shared `CancelFlag` is checked between images. Stopping early
// leaves the already-accumulated totals intact because accumulation is
// append-only.

use crate::analyzer::{Analyzer, ImageAnalysis};
use crate::collaborators::{Dataset, Detector};
use crate::config::TesterConfig;
use crate::core_modules::performance::{ImageReport, PerformanceSummary};
use crate::error::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};

/// Cooperative stop request shared between a driver and whoever wants to stop it.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct ModelTester<D, M> {
    dataset: D,
    detector: M,
    config: TesterConfig,
    analyzer: Analyzer,
    totals: ImageReport,
    images_processed: usize,
    images_failed: usize,
    cancel: CancelFlag,
}

impl<D, M> ModelTester<D, M>
where
    D: Dataset,
    M: Detector<Image = D::Image>,
{
    pub fn new(dataset: D, detector: M, config: TesterConfig) -> Result<Self> {
        config.validate()?;
        let analyzer = Analyzer::new(config.analyzer.clone(), config.classes.clone());
        let totals = ImageReport::new(config.classes.n_classes());
        Ok(Self {
            dataset,
            detector,
            config,
            analyzer,
            totals,
            images_processed: 0,
            images_failed: 0,
            cancel: CancelFlag::new(),
        })
    }

    /// Handle that stops the pass before the next image when cancelled.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Running totals accumulated so far.
    pub fn totals(&self) -> &ImageReport {
        &self.totals
    }

    /// Images successfully analyzed and folded into the totals.
    pub fn images_processed(&self) -> usize {
        self.images_processed
    }

    /// Images skipped because their analysis failed.
    pub fn images_failed(&self) -> usize {
        self.images_failed
    }

    /// Runs a fresh pass over the dataset and returns the final metrics.
    pub fn test(&mut self) -> PerformanceSummary {
        self.test_with(|_| {})
    }

    /// Like [`test`](Self::test), handing every successful `ImageAnalysis` to
    /// `on_image` (e.g. a renderer) before its counts are accumulated.
    pub fn test_with<F>(&mut self, mut on_image: F) -> PerformanceSummary
    where
        F: FnMut(&ImageAnalysis),
    {
        self.totals = ImageReport::new(self.config.classes.n_classes());
        self.images_processed = 0;
        self.images_failed = 0;

        let image_ids = self.dataset.image_ids();
        match self.config.max_images {
            Some(cap) => info!("Processing up to {} of {} images", cap, image_ids.len()),
            None => info!("Processing {} images", image_ids.len()),
        }

        for (attempted, image_id) in image_ids.into_iter().enumerate() {
            if self.config.max_images.is_some_and(|cap| attempted >= cap) {
                info!("Max number of images to inspect reached, stop here.");
                break;
            }
            if self.cancel.is_cancelled() {
                info!("Cancellation requested, stop after {} images.", attempted);
                break;
            }

            let image_path = self.dataset.image_path(image_id);
            info!("Inspecting results for image {} ...", image_path);
            match self.analyzer.inspect(Some(&self.dataset), &self.detector, image_id) {
                Ok(analysis) => {
                    on_image(&analysis);
                    info!("Updating test performances using results for image {} ...", image_path);
                    match self.update_performances(&analysis.report) {
                        Ok(()) => self.images_processed += 1,
                        Err(e) => {
                            error!("Failed to accumulate results for image {}: {}", image_path, e);
                            self.images_failed += 1;
                        }
                    }
                }
                Err(e) => {
                    error!("Failed to analyze results for image {}: {}", image_path, e);
                    self.images_failed += 1;
                }
            }
        }

        info!("Computing final performances ...");
        let summary = self.compute_performances();
        info!("Final performances:\n{}", summary);
        summary
    }

    /// Folds one image's counts into the running totals. A report covering a
    /// different number of classes is rejected and leaves the totals untouched.
    pub fn update_performances(&mut self, report: &ImageReport) -> Result<()> {
        self.totals.accumulate(report)
    }

    /// Derives normalized confusion and purity from the current totals.
    pub fn compute_performances(&self) -> PerformanceSummary {
        self.totals.summary()
    }
}
