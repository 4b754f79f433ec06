//! Classification metrics over dense class indices.
//!
//! Precision, recall and F1 follow the zero-division-is-zero convention: a
//! class that is never predicted (or never present) contributes 0 rather than
//! failing the evaluation.

use crate::data::Label;
use ndarray::{Array1, Array2};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Precision/recall/F1 for one class or one average
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassStats {
    pub precision: f64,
    pub recall: f64,
    #[serde(rename = "f1-score")]
    pub f1_score: f64,
    pub support: usize,
}

/// Averaging weights for multi-class scores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Average {
    /// Unweighted mean over classes
    Macro,
    /// Mean weighted by each class's support
    Weighted,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Fraction of exact matches; 0.0 for empty input
pub fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| (*t - *p).abs() < 0.5)
        .count();
    ratio(correct, y_true.len())
}

/// Confusion matrix with rows = true class, columns = predicted class
pub fn confusion_matrix(y_true: &Array1<f64>, y_pred: &Array1<f64>, n_classes: usize) -> Array2<usize> {
    let mut matrix = Array2::zeros((n_classes, n_classes));
    for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
        let (t, p) = (t as usize, p as usize);
        if t < n_classes && p < n_classes {
            matrix[[t, p]] += 1;
        }
    }
    matrix
}

/// Per-class statistics derived from a confusion matrix
pub fn per_class_stats(matrix: &Array2<usize>) -> Vec<ClassStats> {
    let n = matrix.nrows();
    (0..n)
        .map(|c| {
            let tp = matrix[[c, c]];
            let support: usize = matrix.row(c).sum();
            let predicted: usize = matrix.column(c).sum();
            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            let f1_score = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassStats {
                precision,
                recall,
                f1_score,
                support,
            }
        })
        .collect()
}

/// Average per-class statistics
pub fn average(stats: &[ClassStats], average: Average) -> ClassStats {
    let support: usize = stats.iter().map(|s| s.support).sum();
    let weights: Vec<f64> = match average {
        Average::Macro => vec![1.0; stats.len()],
        Average::Weighted => stats.iter().map(|s| s.support as f64).collect(),
    };
    let total: f64 = weights.iter().sum();
    let mean = |f: fn(&ClassStats) -> f64| {
        if total > 0.0 {
            stats.iter().zip(&weights).map(|(s, w)| f(s) * w).sum::<f64>() / total
        } else {
            0.0
        }
    };
    ClassStats {
        precision: mean(|s| s.precision),
        recall: mean(|s| s.recall),
        f1_score: mean(|s| s.f1_score),
        support,
    }
}

/// Per-class dictionary plus overall accuracy and the two averages.
///
/// Serializes as `{"<label>": {...}, ..., "accuracy": x, "macro avg": {...},
/// "weighted avg": {...}}` with classes in sorted label order. Only classes
/// that occur in the true or predicted labels get an entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub classes: Vec<(Label, ClassStats)>,
    pub accuracy: f64,
    pub macro_avg: ClassStats,
    pub weighted_avg: ClassStats,
}

impl ClassificationReport {
    pub fn new(classes: &[Label], matrix: &Array2<usize>, accuracy: f64) -> Self {
        let classes: Vec<(Label, ClassStats)> = classes
            .iter()
            .cloned()
            .zip(per_class_stats(matrix))
            .enumerate()
            .filter(|(c, (_, stats))| stats.support > 0 || matrix.column(*c).sum() > 0)
            .map(|(_, entry)| entry)
            .collect();
        let stats: Vec<ClassStats> = classes.iter().map(|(_, s)| *s).collect();
        Self {
            macro_avg: average(&stats, Average::Macro),
            weighted_avg: average(&stats, Average::Weighted),
            classes,
            accuracy,
        }
    }
}

impl Serialize for ClassificationReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.classes.len() + 3))?;
        for (label, stats) in &self.classes {
            map.serialize_entry(&label.to_string(), stats)?;
        }
        map.serialize_entry("accuracy", &self.accuracy)?;
        map.serialize_entry("macro avg", &self.macro_avg)?;
        map.serialize_entry("weighted avg", &self.weighted_avg)?;
        map.end()
    }
}
