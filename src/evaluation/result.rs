//! Tagged evaluation results, one shape per task.

use super::classification::ClassificationReport;
use super::regression::RegressionMetrics;
use crate::data::Label;
use crate::training::models::ModelExtras;
use crate::training::TaskType;
use serde::Serialize;
use std::collections::BTreeMap;

/// Number of predictions, actual values or labels echoed back
pub const PREVIEW_LEN: usize = 50;

/// First `PREVIEW_LEN` items of `values`
pub fn preview<T: Clone>(values: &[T]) -> Vec<T> {
    values.iter().take(PREVIEW_LEN).cloned().collect()
}

/// Outcome of one evaluation; serialized with a `type` tag
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EvaluationResult {
    Classification(ClassificationResult),
    Regression(RegressionResult),
    Clustering(ClusteringResult),
}

impl EvaluationResult {
    pub fn task_type(&self) -> TaskType {
        match self {
            EvaluationResult::Classification(_) => TaskType::Classification,
            EvaluationResult::Regression(_) => TaskType::Regression,
            EvaluationResult::Clustering(_) => TaskType::Clustering,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub accuracy: f64,
    /// Support-weighted averages
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub report: ClassificationReport,
    /// Rows are true classes, columns predicted classes, both in sorted label order
    pub confusion_matrix: Vec<Vec<usize>>,
    pub predictions: Vec<Label>,
    pub actual: Vec<Label>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionResult {
    #[serde(flatten)]
    pub metrics: RegressionMetrics,
    pub predictions: Vec<f64>,
    pub actual: Vec<f64>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub extras: Option<ModelExtras>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusteringResult {
    pub algorithm: String,
    pub n_clusters: usize,
    pub silhouette: Option<f64>,
    /// Rows per label, noise (`-1`) included
    pub cluster_counts: BTreeMap<i64, usize>,
    pub labels_preview: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub centers: Option<Vec<Vec<f64>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inertia: Option<f64>,
}
