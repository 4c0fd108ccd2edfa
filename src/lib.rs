// THEORY:
// This file is the main entry point for the `mask_eval` library crate. It
// exposes the reconciliation engine for instance-segmentation output: raw
// detector masks and raw annotation rasters go in, reconciled object instances
// and a confusion-matrix / purity scorecard come out.
//
// The public surface is layered:
// - `core_modules`: the geometry and graph primitives (masks, boxes, labeling,
//   merging, matching, performance bookkeeping).
// - `analyzer`: the per-image orchestrator tying the primitives together.
// - `model_tester` / `parallel_tester`: dataset-wide drivers that accumulate
//   per-image reports into final metrics.
// - `collaborators`, `replay`: the detector/dataset seams and their in-memory
//   implementations.

pub mod analyzer;
pub mod class_registry;
pub mod collaborators;
pub mod config;
pub mod core_modules;
pub mod error;
pub mod model_tester;
pub mod parallel_tester;
pub mod replay;

pub use analyzer::{Analyzer, ImageAnalysis};
pub use class_registry::{ClassInfo, ClassRegistry, SplitPolicy};
pub use collaborators::{Dataset, Detections, Detector, ImageId};
pub use config::{AnalyzerConfig, TesterConfig};
pub use core_modules::bounding_box::BoundingBox;
pub use core_modules::instance::{AnnotatedInstance, Instance, Region};
pub use core_modules::mask::{ClassId, Mask};
pub use core_modules::performance::{ImageReport, PerformanceSummary};
pub use error::{EvalError, Result};
pub use model_tester::{CancelFlag, ModelTester};
pub use parallel_tester::{ParallelModelTester, PassOutcome};
