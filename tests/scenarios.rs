//! End-to-end scoring scenarios driven through the public API with in-memory
//! collaborators.

use image::{GrayImage, Luma, RgbImage};
use mask_eval::core_modules::group_merger::{self, EdgeRule};
use mask_eval::replay::{AnnotatedSample, InMemoryDataset, ReplayDetector};
use mask_eval::{
    Analyzer, AnalyzerConfig, BoundingBox, ClassRegistry, Detections, ImageReport, Instance, Mask,
    ModelTester, Region, TesterConfig,
};

const SIDE: u32 = 64;

fn annotation(y1: u32, x1: u32, y2: u32, x2: u32, class_value: u8) -> GrayImage {
    GrayImage::from_fn(SIDE, SIDE, |x, y| {
        if (x1..x2).contains(&x) && (y1..y2).contains(&y) {
            Luma([class_value])
        } else {
            Luma([0])
        }
    })
}

fn square(y1: u32, x1: u32, y2: u32, x2: u32) -> Mask {
    let mut mask = Mask::new(SIDE, SIDE);
    mask.fill_rect(y1, x1, y2, x2);
    mask
}

fn single_detection(mask: Mask, class_id: usize, score: f64) -> Detections {
    Detections {
        boxes: vec![BoundingBox::from_mask(&mask).unwrap()],
        masks: vec![mask],
        class_ids: vec![class_id],
        scores: vec![score],
    }
}

fn one_image(gt: GrayImage, class_id: usize, detections: Detections) -> (InMemoryDataset, ReplayDetector) {
    let mut dataset = InMemoryDataset::new();
    let mut detector = ReplayDetector::new();
    let id = dataset.push(AnnotatedSample {
        path: "scenario.png".to_string(),
        pixels: RgbImage::new(SIDE, SIDE),
        gt_masks: vec![gt],
        class_id,
    });
    detector.record(id, detections);
    (dataset, detector)
}

fn analyzer() -> Analyzer {
    Analyzer::new(AnalyzerConfig::default(), ClassRegistry::radio_astronomy())
}

#[test]
fn confident_overlapping_detection_is_a_correct_match() {
    let (dataset, detector) = one_image(
        annotation(10, 10, 50, 50, 1),
        1,
        single_detection(square(12, 12, 48, 48), 1, 0.9),
    );
    let analysis = analyzer().inspect(Some(&dataset), &detector, 0).unwrap();

    let iou = analysis.ground_truth[0].bbox.iou(&analysis.detections[0].bbox);
    assert!((iou - 0.81).abs() < 1e-12);

    let summary = analysis.report.summary();
    assert_eq!(summary.confusion.get(1, 1), 1);
    assert_eq!(summary.counters.nobjs_true, vec![0, 1, 0, 0, 0]);
    assert_eq!(summary.counters.nobjs_det_right, vec![0, 1, 0, 0, 0]);
    assert_eq!(summary.purity[1], 1.0);
}

#[test]
fn low_score_detection_leaves_ground_truth_missed() {
    let (dataset, detector) = one_image(
        annotation(10, 10, 50, 50, 1),
        1,
        single_detection(square(12, 12, 48, 48), 1, 0.5),
    );
    let analysis = analyzer().inspect(Some(&dataset), &detector, 0).unwrap();

    assert!(analysis.detections.is_empty());
    assert_eq!(analysis.report.counters.nobjs_true[1], 1);
    assert!(analysis.report.confusion.row(1).iter().all(|&c| c == 0));
    assert!(analysis.report.counters.nobjs_det.iter().all(|&c| c == 0));
}

#[test]
fn touching_same_class_regions_merge_into_one_instance() {
    let regions = vec![
        Region {
            mask: square(0, 0, 10, 10),
            class_id: 2,
            score: Some(0.9),
        },
        Region {
            mask: square(0, 10, 10, 20),
            class_id: 2,
            score: Some(0.7),
        },
    ];
    let merged = group_merger::merge(&regions, EdgeRule::SameClassTouching).unwrap();
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].mask, square(0, 0, 10, 20));
    assert!((merged[0].score.unwrap() - 0.8).abs() < 1e-12);
}

#[test]
fn overlapping_instances_keep_the_most_confident() {
    let instances = vec![
        Instance {
            mask: square(0, 0, 10, 10),
            class_id: 2,
            score: Some(0.6),
        },
        Instance {
            mask: square(5, 5, 15, 15),
            class_id: 1,
            score: Some(0.9),
        },
    ];
    let kept = group_merger::resolve_overlaps(instances).unwrap();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].score, Some(0.9));
    assert_eq!(kept[0].class_id, 1);
}

#[test]
fn detection_pipeline_resolves_cross_class_overlap() {
    let detections = Detections {
        masks: vec![square(10, 10, 30, 30), square(20, 20, 40, 40)],
        boxes: vec![BoundingBox::new(10, 10, 30, 30), BoundingBox::new(20, 20, 40, 40)],
        class_ids: vec![2, 1],
        scores: vec![0.75, 0.95],
    };
    let out = analyzer().extract_detections(&detections).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].label, "sidelobe");
    assert_eq!(out[0].caption, "sidelobe 0.950");
}

#[test]
fn batches_sum_to_a_single_pass() {
    let mut dataset = InMemoryDataset::new();
    let mut detector = ReplayDetector::new();
    let cases = [
        (1u8, 1usize, 0.9),
        (2, 2, 0.8),
        (2, 1, 0.95),
        (1, 1, 0.4),
        (2, 2, 0.99),
    ];
    for (i, &(gt_class, det_class, score)) in cases.iter().enumerate() {
        let id = dataset.push(AnnotatedSample {
            path: format!("batch_{}.png", i),
            pixels: RgbImage::new(SIDE, SIDE),
            gt_masks: vec![annotation(10, 10, 50, 50, gt_class)],
            class_id: gt_class as usize,
        });
        detector.record(id, single_detection(square(12, 12, 48, 48), det_class, score));
    }

    let config = TesterConfig::default();
    let mut whole = ModelTester::new(dataset.clone(), detector.clone(), config.clone()).unwrap();
    let whole_summary = whole.test();

    let analyzer = Analyzer::new(config.analyzer.clone(), config.classes.clone());
    let mut first = ImageReport::new(5);
    let mut second = ImageReport::new(5);
    for id in 0..cases.len() {
        let report = analyzer.inspect(Some(&dataset), &detector, id).unwrap().report;
        if id < 2 {
            first += &report;
        } else {
            second += &report;
        }
    }
    first += &second;

    assert_eq!(&first, whole.totals());
    assert_eq!(first.summary(), whole_summary);
    assert_eq!(whole_summary.confusion.get(2, 1), 1);
    assert_eq!(whole_summary.counters.nobjs_true, vec![0, 2, 3, 0, 0]);
}

#[test]
fn predict_returns_drawable_instances_without_ground_truth() {
    let (_, detector) = one_image(
        annotation(0, 0, 1, 1, 1),
        1,
        single_detection(square(5, 5, 25, 25), 2, 0.88),
    );
    let image = mask_eval::replay::SampleImage {
        id: 0,
        pixels: RgbImage::new(SIDE, SIDE),
    };
    let out = analyzer().predict(&detector, &image).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].bbox, BoundingBox::new(5, 5, 25, 25));
    assert_eq!(out[0].color, [255, 0, 0]);
}
