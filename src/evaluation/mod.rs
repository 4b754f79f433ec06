//! Metrics and the fit-and-score protocol for each task type.

pub mod classification;
pub mod clustering;
pub mod evaluator;
pub mod regression;
pub mod result;

pub use classification::{ClassStats, ClassificationReport};
pub use clustering::{cluster_counts, silhouette_score};
pub use evaluator::{evaluate_classifier, evaluate_clusterer, evaluate_regressor};
pub use regression::RegressionMetrics;
pub use result::{ClassificationResult, ClusteringResult, EvaluationResult, RegressionResult, PREVIEW_LEN};
