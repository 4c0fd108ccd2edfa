// This file is an example runner for the `mask_eval` library. It scores a
// small synthetic radio-astronomy field with replayed detector output, once
// sequentially and once on the worker pool, and prints the final metrics.
//
// Usage: mask_eval [config.json]
// Log verbosity follows RUST_LOG (defaults to `info`).

use anyhow::Context;
use image::{GrayImage, Luma, RgbImage};
use mask_eval::replay::{AnnotatedSample, InMemoryDataset, ReplayDetector};
use mask_eval::{BoundingBox, Detections, Mask, ModelTester, ParallelModelTester, TesterConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SIDE: u32 = 64;

fn square(y1: u32, x1: u32, y2: u32, x2: u32) -> Mask {
    let mut mask = Mask::new(SIDE, SIDE);
    mask.fill_rect(y1, x1, y2, x2);
    mask
}

fn annotation(objects: &[(u32, u32, u32, u32, u8)]) -> GrayImage {
    let mut raw = GrayImage::new(SIDE, SIDE);
    for &(y1, x1, y2, x2, class_value) in objects {
        for y in y1..y2 {
            for x in x1..x2 {
                raw.put_pixel(x, y, Luma([class_value]));
            }
        }
    }
    raw
}

fn detections(objects: Vec<(Mask, usize, f64)>) -> Detections {
    let mut out = Detections::default();
    for (mask, class_id, score) in objects {
        out.boxes.push(BoundingBox::from_mask(&mask).unwrap_or(BoundingBox::new(0, 0, 0, 0)));
        out.masks.push(mask);
        out.class_ids.push(class_id);
        out.scores.push(score);
    }
    out
}

/// A handful of fields covering a clean match, a missed source, a fragmented
/// sidelobe and a confused extended galaxy.
fn synthetic_field() -> (InMemoryDataset, ReplayDetector) {
    let mut dataset = InMemoryDataset::new();
    let mut detector = ReplayDetector::new();

    let id = dataset.push(AnnotatedSample {
        path: "field_000.png".to_string(),
        pixels: RgbImage::new(SIDE, SIDE),
        gt_masks: vec![annotation(&[(10, 10, 50, 50, 2)])],
        class_id: 2,
    });
    detector.record(id, detections(vec![(square(12, 12, 48, 48), 2, 0.93)]));

    let id = dataset.push(AnnotatedSample {
        path: "field_001.png".to_string(),
        pixels: RgbImage::new(SIDE, SIDE),
        gt_masks: vec![annotation(&[(5, 5, 15, 15, 2)])],
        class_id: 2,
    });
    detector.record(id, detections(vec![(square(5, 5, 15, 15), 2, 0.5)]));

    let id = dataset.push(AnnotatedSample {
        path: "field_002.png".to_string(),
        pixels: RgbImage::new(SIDE, SIDE),
        gt_masks: vec![annotation(&[(20, 20, 30, 40, 1)])],
        class_id: 1,
    });
    detector.record(
        id,
        detections(vec![
            (square(20, 20, 30, 30), 1, 0.85),
            (square(20, 30, 30, 40), 1, 0.75),
        ]),
    );

    let id = dataset.push(AnnotatedSample {
        path: "field_003.png".to_string(),
        pixels: RgbImage::new(SIDE, SIDE),
        gt_masks: vec![annotation(&[(8, 8, 20, 20, 3), (40, 40, 52, 52, 3)])],
        class_id: 3,
    });
    let mut lobes = square(8, 8, 20, 20);
    lobes.fill_rect(40, 40, 52, 52);
    detector.record(id, detections(vec![(lobes, 4, 0.88)]));

    (dataset, detector)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Mask Eval - Example Runner");

    let config = match std::env::args().nth(1) {
        Some(path) => TesterConfig::from_json_file(&path)
            .with_context(|| format!("failed to load tester config from {}", path))?,
        None => TesterConfig::default(),
    };

    let (dataset, detector) = synthetic_field();

    let mut tester = ModelTester::new(dataset.clone(), detector.clone(), config.clone())
        .context("invalid tester configuration")?;
    let summary = tester.test_with(|analysis| {
        for instance in &analysis.detections {
            info!("{}: {} at {:?}", analysis.image_path, instance.caption, instance.bbox);
        }
    });
    println!("{}", summary);

    let parallel = ParallelModelTester::new(Arc::new(dataset), Arc::new(detector), config)?;
    let outcome = parallel.test().await?;
    info!(
        "Worker pool processed {} images ({} failed)",
        outcome.images_processed, outcome.images_failed
    );
    anyhow::ensure!(
        outcome.summary == summary,
        "parallel and sequential passes disagree"
    );

    Ok(())
}
