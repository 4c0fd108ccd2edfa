//! Configuration for the analyzer and the dataset testers.

use crate::class_registry::ClassRegistry;
use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-image processing thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Raw detections scoring below this are discarded before splitting.
    pub score_threshold: f64,
    /// A detection and a ground-truth instance match only when their box IoU
    /// is strictly greater than this.
    pub iou_threshold: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.7,
            iou_threshold: 0.6,
        }
    }
}

impl AnalyzerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(EvalError::InvalidConfig(format!(
                "score_threshold must be in [0, 1], got {}",
                self.score_threshold
            )));
        }
        if !(0.0..1.0).contains(&self.iou_threshold) {
            return Err(EvalError::InvalidConfig(format!(
                "iou_threshold must be in [0, 1), got {}",
                self.iou_threshold
            )));
        }
        Ok(())
    }
}

/// Configuration of a whole dataset pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesterConfig {
    pub analyzer: AnalyzerConfig,
    pub classes: ClassRegistry,
    /// Stop after this many images; `None` processes the whole dataset.
    pub max_images: Option<usize>,
    /// Worker count for the parallel tester; `None` uses one per CPU.
    pub workers: Option<usize>,
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            analyzer: AnalyzerConfig::default(),
            classes: ClassRegistry::default(),
            max_images: None,
            workers: None,
        }
    }
}

impl TesterConfig {
    pub fn validate(&self) -> Result<()> {
        self.analyzer.validate()?;
        if self.max_images == Some(0) {
            return Err(EvalError::InvalidConfig(
                "max_images must be at least 1 when set".to_string(),
            ));
        }
        if self.workers == Some(0) {
            return Err(EvalError::InvalidConfig(
                "workers must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Reads and validates a JSON configuration file. Missing fields take
    /// their default values.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }
}
