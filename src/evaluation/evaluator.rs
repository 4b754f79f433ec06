//! Fit-and-score protocols for each task.

use super::classification::{accuracy, average, confusion_matrix, per_class_stats, Average, ClassificationReport};
use super::clustering::{cluster_counts, silhouette_score};
use super::regression::RegressionMetrics;
use super::result::{preview, PREVIEW_LEN, ClassificationResult, ClusteringResult, RegressionResult};
use crate::data::{Label, LabelSet, TrainTestSplit};
use crate::error::Result;
use crate::training::models::{Classifier, Clusterer, Regressor};
use ndarray::{Array1, Array2};
use tracing::{debug, warn};

fn matrix_rows<T: Clone>(matrix: &Array2<T>) -> Vec<Vec<T>> {
    matrix.rows().into_iter().map(|row| row.to_vec()).collect()
}

fn finite_or_zero(name: &str, value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        warn!(metric = name, "metric undefined, reporting 0");
        0.0
    }
}

/// Fit on the training split and score predictions on the test split.
///
/// `classes` spans every label of the full target, so the confusion matrix keeps
/// a row for classes the test split happens to miss. The report lists only the
/// classes that occur in the test labels or the predictions.
pub fn evaluate_classifier(
    model: &mut dyn Classifier,
    data: &TrainTestSplit<Label>,
    classes: &LabelSet,
) -> Result<ClassificationResult> {
    let y_train = classes.encode(&data.y_train)?;
    let y_test = classes.encode(&data.y_test)?;

    model.fit(&data.x_train, &y_train)?;
    let y_pred = model.predict(&data.x_test)?;
    debug!(test_rows = y_test.len(), classes = classes.len(), "scoring classifier");

    let acc = accuracy(&y_test, &y_pred);
    let matrix = confusion_matrix(&y_test, &y_pred, classes.len());
    let weighted = average(&per_class_stats(&matrix), Average::Weighted);
    let report = ClassificationReport::new(classes.classes(), &matrix, acc);

    let predictions = y_pred
        .iter()
        .take(PREVIEW_LEN)
        .map(|&p| classes.decode(p))
        .collect::<Result<Vec<_>>>()?;

    Ok(ClassificationResult {
        accuracy: acc,
        precision: finite_or_zero("precision", weighted.precision),
        recall: finite_or_zero("recall", weighted.recall),
        f1_score: finite_or_zero("f1_score", weighted.f1_score),
        report,
        confusion_matrix: matrix_rows(&matrix),
        predictions,
        actual: preview(&data.y_test),
    })
}

/// Fit on the training split and score predictions on the test split.
pub fn evaluate_regressor(
    model: &mut dyn Regressor,
    data: &TrainTestSplit<f64>,
) -> Result<RegressionResult> {
    let y_train = Array1::from(data.y_train.clone());
    let y_test = Array1::from(data.y_test.clone());

    model.fit(&data.x_train, &y_train)?;
    let y_pred = model.predict(&data.x_test)?;
    debug!(test_rows = y_test.len(), "scoring regressor");

    let metrics = RegressionMetrics::compute(&y_test, &y_pred);
    if !metrics.mse.is_finite() {
        warn!(mse = metrics.mse, "regressor produced non-finite predictions");
    }

    Ok(RegressionResult {
        metrics,
        predictions: preview(&y_pred.to_vec()),
        actual: preview(&data.y_test),
        extras: model.extras(),
    })
}

/// Fit on the whole matrix and describe the clusters found.
pub fn evaluate_clusterer(
    model: &mut dyn Clusterer,
    x: &Array2<f64>,
    algorithm: &str,
) -> Result<ClusteringResult> {
    let labels = model.fit_predict(x)?;
    let counts = cluster_counts(&labels);
    let silhouette = silhouette_score(x, &labels);
    if silhouette.is_none() {
        debug!(clusters = counts.len(), "silhouette undefined for this labelling");
    }

    Ok(ClusteringResult {
        algorithm: algorithm.to_string(),
        n_clusters: model.n_clusters(),
        silhouette,
        cluster_counts: counts,
        labels_preview: preview(&labels.to_vec()),
        centers: model.centers().map(|c| matrix_rows(&c)),
        inertia: model.inertia(),
    })
}
