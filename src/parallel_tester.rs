// THEORY:
// The `ParallelModelTester` spreads a dataset pass over a pool of tokio workers.
// It keeps the determinism of the single-threaded `ModelTester` by making the
// reducer the only place that touches shared totals:
//
// 1.  **Dispatcher**: one task hands image ids round-robin to the workers and
//     stops forwarding as soon as cancellation is requested.
// 2.  **Workers**: each worker owns a clone of the `Analyzer` and computes an
//     independent `ImageReport` per image on the blocking thread pool (analysis
//     is CPU-bound and never awaits).
// 3.  **Reducer**: a single task receives the per-image outcomes and sums them.
//     Summation is commutative, so the totals do not depend on completion order.

use crate::analyzer::Analyzer;
use crate::collaborators::{Dataset, Detector, ImageId};
use crate::config::TesterConfig;
use crate::core_modules::performance::{ImageReport, PerformanceSummary};
use crate::error::{EvalError, Result};
use crate::model_tester::CancelFlag;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

enum WorkerMessage {
    Done(ImageId, ImageReport),
    Failed(ImageId, String),
}

/// Totals and bookkeeping of a finished parallel pass.
#[derive(Debug, Clone)]
pub struct PassOutcome {
    pub totals: ImageReport,
    pub summary: PerformanceSummary,
    pub images_processed: usize,
    pub images_failed: usize,
}

pub struct ParallelModelTester<D, M> {
    dataset: Arc<D>,
    detector: Arc<M>,
    config: TesterConfig,
    cancel: CancelFlag,
}

impl<D, M> ParallelModelTester<D, M>
where
    D: Dataset + Send + Sync + 'static,
    M: Detector<Image = D::Image> + Send + Sync + 'static,
{
    pub fn new(dataset: Arc<D>, detector: Arc<M>, config: TesterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            dataset,
            detector,
            config,
            cancel: CancelFlag::new(),
        })
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Runs the pass on the current tokio runtime.
    pub async fn test(&self) -> Result<PassOutcome> {
        let worker_count = self.config.worker_count();
        let mut image_ids = self.dataset.image_ids();
        if let Some(cap) = self.config.max_images {
            image_ids.truncate(cap);
        }
        info!("Processing {} images with {} workers", image_ids.len(), worker_count);

        let (result_sender, mut result_receiver) = mpsc::unbounded_channel::<WorkerMessage>();
        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<ImageId>())
            .unzip();

        // Spawn dispatcher
        let cancel = self.cancel.clone();
        let dispatcher = tokio::spawn(async move {
            for (i, image_id) in image_ids.into_iter().enumerate() {
                if cancel.is_cancelled() {
                    info!("Cancellation requested, dispatched {} images.", i);
                    break;
                }
                if worker_senders[i % worker_count].send(image_id).is_err() {
                    break;
                }
            }
        });

        // Spawn workers
        let analyzer = Arc::new(Analyzer::new(
            self.config.analyzer.clone(),
            self.config.classes.clone(),
        ));
        let mut workers = Vec::with_capacity(worker_count);
        for mut worker_receiver in worker_receivers {
            let analyzer = Arc::clone(&analyzer);
            let dataset = Arc::clone(&self.dataset);
            let detector = Arc::clone(&self.detector);
            let result_sender = result_sender.clone();

            workers.push(tokio::spawn(async move {
                while let Some(image_id) = worker_receiver.recv().await {
                    let analyzer = Arc::clone(&analyzer);
                    let dataset = Arc::clone(&dataset);
                    let detector = Arc::clone(&detector);
                    let outcome = tokio::task::spawn_blocking(move || {
                        analyzer.inspect(Some(dataset.as_ref()), detector.as_ref(), image_id)
                    })
                    .await;

                    let message = match outcome {
                        Ok(Ok(analysis)) => WorkerMessage::Done(image_id, analysis.report),
                        Ok(Err(e)) => WorkerMessage::Failed(image_id, e.to_string()),
                        Err(join_error) => WorkerMessage::Failed(image_id, join_error.to_string()),
                    };
                    if result_sender.send(message).is_err() {
                        break;
                    }
                }
            }));
        }
        drop(result_sender);

        // Single reducer
        let n_classes = self.config.classes.n_classes();
        let reducer = tokio::spawn(async move {
            let mut totals = ImageReport::new(n_classes);
            let mut processed = 0usize;
            let mut failed = 0usize;
            while let Some(message) = result_receiver.recv().await {
                match message {
                    WorkerMessage::Done(image_id, report) => {
                        debug!("Accumulating performances of image {}", image_id);
                        match totals.accumulate(&report) {
                            Ok(()) => processed += 1,
                            Err(e) => {
                                error!("Failed to accumulate results for image {}: {}", image_id, e);
                                failed += 1;
                            }
                        }
                    }
                    WorkerMessage::Failed(image_id, reason) => {
                        error!("Failed to analyze results for image {}: {}", image_id, reason);
                        failed += 1;
                    }
                }
            }
            (totals, processed, failed)
        });

        dispatcher
            .await
            .map_err(|e| EvalError::Dataset(format!("dispatcher task failed: {}", e)))?;
        for joined in futures::future::join_all(workers).await {
            joined.map_err(|e| EvalError::Dataset(format!("worker task failed: {}", e)))?;
        }
        let (totals, images_processed, images_failed) = reducer
            .await
            .map_err(|e| EvalError::Dataset(format!("reducer task failed: {}", e)))?;

        info!("Computing final performances ...");
        let summary = totals.summary();
        info!("Final performances:\n{}", summary);
        Ok(PassOutcome {
            totals,
            summary,
            images_processed,
            images_failed,
        })
    }
}
