// THEORY:
// Performance bookkeeping is split into a per-image contribution and a derived
// summary.
//
// 1.  **Append-Only Contributions**: An `ImageReport` holds raw integer counts
//     (confusion matrix plus per-class object counters) for one image. Reports
//     only ever get added together, so summing them is commutative and
//     associative: batching or parallel reduction cannot change the totals.
// 2.  **Derived Metrics at the End**: Ratios (row-normalized confusion matrix,
//     purity) are computed once from the summed counts in `summary()`; they are
//     never averaged across images.

use crate::core_modules::mask::ClassId;
use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::AddAssign;

/// `n × n` counts indexed `[true_class][assigned_class]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    n_classes: usize,
    counts: Vec<u64>,
}

impl ConfusionMatrix {
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            counts: vec![0; n_classes * n_classes],
        }
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn get(&self, true_class: ClassId, assigned_class: ClassId) -> u64 {
        self.counts[true_class * self.n_classes + assigned_class]
    }

    pub fn increment(&mut self, true_class: ClassId, assigned_class: ClassId) {
        self.counts[true_class * self.n_classes + assigned_class] += 1;
    }

    pub fn row(&self, true_class: ClassId) -> &[u64] {
        let start = true_class * self.n_classes;
        &self.counts[start..start + self.n_classes]
    }

    /// Divides row `i` by `row_totals[i]`; rows with a zero total stay zero.
    pub fn normalized(&self, row_totals: &[u64]) -> Vec<Vec<f64>> {
        (0..self.n_classes)
            .map(|i| {
                let norm = row_totals.get(i).copied().unwrap_or(0);
                if norm == 0 {
                    return vec![0.0; self.n_classes];
                }
                self.row(i).iter().map(|&c| c as f64 / norm as f64).collect()
            })
            .collect()
    }
}

/// # Panics
///
/// Panics when the two matrices have different class counts. Use
/// [`ImageReport::accumulate`] where the shapes are not known to agree.
impl AddAssign<&ConfusionMatrix> for ConfusionMatrix {
    fn add_assign(&mut self, other: &ConfusionMatrix) {
        assert_eq!(self.n_classes, other.n_classes, "confusion matrices of different sizes");
        for (a, b) in self.counts.iter_mut().zip(&other.counts) {
            *a += b;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerClassCounters {
    /// Ground-truth instances per class.
    pub nobjs_true: Vec<u64>,
    /// Detected instances per class.
    pub nobjs_det: Vec<u64>,
    /// Detected instances whose best ground-truth match has the same class.
    pub nobjs_det_right: Vec<u64>,
}

impl PerClassCounters {
    pub fn new(n_classes: usize) -> Self {
        Self {
            nobjs_true: vec![0; n_classes],
            nobjs_det: vec![0; n_classes],
            nobjs_det_right: vec![0; n_classes],
        }
    }

    /// Number of classes covered, or `None` when the three vectors disagree.
    fn consistent_len(&self) -> Option<usize> {
        let n = self.nobjs_true.len();
        (self.nobjs_det.len() == n && self.nobjs_det_right.len() == n).then_some(n)
    }

    fn len(&self) -> usize {
        self.nobjs_true.len()
    }

    /// `nobjs_det_right[j] / nobjs_det[j]`, 0 for classes never detected.
    pub fn purity(&self) -> Vec<f64> {
        self.nobjs_det
            .iter()
            .zip(&self.nobjs_det_right)
            .map(|(&det, &right)| if det == 0 { 0.0 } else { right as f64 / det as f64 })
            .collect()
    }
}

/// # Panics
///
/// Panics when the two counter sets cover different numbers of classes.
impl AddAssign<&PerClassCounters> for PerClassCounters {
    fn add_assign(&mut self, other: &PerClassCounters) {
        assert_eq!(self.len(), other.len(), "counters of different sizes");
        let pairs = [
            (&mut self.nobjs_true, &other.nobjs_true),
            (&mut self.nobjs_det, &other.nobjs_det),
            (&mut self.nobjs_det_right, &other.nobjs_det_right),
        ];
        for (mine, theirs) in pairs {
            for (a, b) in mine.iter_mut().zip(theirs) {
                *a += b;
            }
        }
    }
}

/// Raw counts contributed by one image (or the running sum of many).
///
/// `+=` requires both sides to cover the same classes and panics otherwise;
/// `accumulate` reports the mismatch as an error instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReport {
    pub confusion: ConfusionMatrix,
    pub counters: PerClassCounters,
}

impl ImageReport {
    pub fn new(n_classes: usize) -> Self {
        Self {
            confusion: ConfusionMatrix::new(n_classes),
            counters: PerClassCounters::new(n_classes),
        }
    }

    pub fn n_classes(&self) -> usize {
        self.confusion.n_classes()
    }

    /// Adds `other` into `self` after checking that both cover the same classes.
    /// On mismatch nothing is added.
    pub fn accumulate(&mut self, other: &ImageReport) -> Result<()> {
        let expected = self.n_classes();
        for found in [
            other.n_classes(),
            other.counters.consistent_len().unwrap_or(usize::MAX),
            self.counters.consistent_len().unwrap_or(usize::MAX),
        ] {
            if found != expected {
                return Err(EvalError::ClassCountMismatch { expected, found });
            }
        }
        *self += other;
        Ok(())
    }

    /// Derives normalized confusion and purity from the counts held so far.
    pub fn summary(&self) -> PerformanceSummary {
        PerformanceSummary {
            confusion: self.confusion.clone(),
            confusion_norm: self.confusion.normalized(&self.counters.nobjs_true),
            purity: self.counters.purity(),
            counters: self.counters.clone(),
        }
    }
}

impl AddAssign<&ImageReport> for ImageReport {
    fn add_assign(&mut self, other: &ImageReport) {
        self.confusion += &other.confusion;
        self.counters += &other.counters;
    }
}

/// Final metrics of a dataset pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub confusion: ConfusionMatrix,
    /// Row `i` is the distribution of assigned classes for true class `i`.
    pub confusion_norm: Vec<Vec<f64>>,
    pub purity: Vec<f64>,
    pub counters: PerClassCounters,
}

impl fmt::Display for PerformanceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== NOBJ TRUE ==")?;
        writeln!(f, "{:?}", self.counters.nobjs_true)?;
        writeln!(f, "== NOBJ DET ==")?;
        writeln!(f, "{:?}", self.counters.nobjs_det)?;
        writeln!(f, "== NOBJ DET CORRECTLY ==")?;
        writeln!(f, "{:?}", self.counters.nobjs_det_right)?;
        writeln!(f, "== CLASSIFICATION MATRIX ==")?;
        for i in 0..self.confusion.n_classes() {
            writeln!(f, "{:?}", self.confusion.row(i))?;
        }
        writeln!(f, "== CLASSIFICATION MATRIX (NORM) ==")?;
        for row in &self.confusion_norm {
            let cells: Vec<String> = row.iter().map(|v| format!("{:.3}", v)).collect();
            writeln!(f, "[{}]", cells.join(", "))?;
        }
        writeln!(f, "== PURITY ==")?;
        let cells: Vec<String> = self.purity.iter().map(|v| format!("{:.3}", v)).collect();
        write!(f, "[{}]", cells.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_skips_empty_rows() {
        let mut confusion = ConfusionMatrix::new(3);
        confusion.increment(1, 1);
        confusion.increment(1, 1);
        confusion.increment(1, 2);
        let norm = confusion.normalized(&[0, 4, 0]);
        assert_eq!(norm[0], vec![0.0, 0.0, 0.0]);
        assert_eq!(norm[1], vec![0.0, 0.5, 0.25]);
        assert_eq!(norm[2], vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn purity_is_zero_for_undetected_classes() {
        let counters = PerClassCounters {
            nobjs_true: vec![0, 2, 1],
            nobjs_det: vec![0, 4, 0],
            nobjs_det_right: vec![0, 3, 0],
        };
        assert_eq!(counters.purity(), vec![0.0, 0.75, 0.0]);
    }

    #[test]
    fn reports_add_cellwise() {
        let mut a = ImageReport::new(2);
        a.confusion.increment(1, 1);
        a.counters.nobjs_true[1] += 1;
        let mut b = ImageReport::new(2);
        b.confusion.increment(1, 0);
        b.counters.nobjs_true[1] += 1;
        b.counters.nobjs_det[0] += 1;

        a += &b;
        assert_eq!(a.confusion.row(1), &[1, 1]);
        assert_eq!(a.counters.nobjs_true, vec![0, 2]);
        assert_eq!(a.counters.nobjs_det, vec![1, 0]);
    }

    #[test]
    fn summary_renders_all_sections() {
        let mut report = ImageReport::new(2);
        report.confusion.increment(1, 1);
        report.counters.nobjs_true[1] = 1;
        report.counters.nobjs_det[1] = 1;
        report.counters.nobjs_det_right[1] = 1;
        let text = report.summary().to_string();
        assert!(text.contains("== PURITY =="));
        assert!(text.contains("[0.000, 1.000]"));
    }

    #[test]
    fn accumulating_reports_of_different_sizes_fails_cleanly() {
        let mut totals = ImageReport::new(3);
        totals.counters.nobjs_true[1] = 2;
        let other = ImageReport::new(5);
        assert!(matches!(
            totals.accumulate(&other),
            Err(EvalError::ClassCountMismatch { expected: 3, found: 5 })
        ));
        assert_eq!(totals.counters.nobjs_true, vec![0, 2, 0]);

        let mut ragged = ImageReport::new(3);
        ragged.counters.nobjs_det.push(1);
        assert!(totals.accumulate(&ragged).is_err());

        let mut same = ImageReport::new(3);
        same.counters.nobjs_true[1] = 1;
        totals.accumulate(&same).unwrap();
        assert_eq!(totals.counters.nobjs_true, vec![0, 3, 0]);
    }

    #[test]
    #[should_panic(expected = "confusion matrices of different sizes")]
    fn adding_matrices_of_different_sizes_panics() {
        let mut a = ConfusionMatrix::new(2);
        a += &ConfusionMatrix::new(3);
    }
}
