//! The closed set of algorithms a request may name.

use crate::error::TabfitError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Algorithm identifier, parsed from its display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    KMeans,
    Dbscan,
    Agglomerative,
    LinearRegression,
    LogisticRegression,
    DecisionTree,
    RandomForest,
    Svm,
    NaiveBayes,
    Knn,
}

/// How an algorithm constrains the task type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskRule {
    /// Never uses a target.
    Unsupervised,
    RegressionOnly,
    ClassificationOnly,
    /// Classification or regression, decided from the target column.
    DualMode,
}

/// Resolved learning task for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Classification,
    Regression,
    Clustering,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskType::Classification => "classification",
            TaskType::Regression => "regression",
            TaskType::Clustering => "clustering",
        };
        f.write_str(name)
    }
}

impl Algorithm {
    /// Every algorithm, in catalogue order.
    pub const ALL: [Algorithm; 10] = [
        Algorithm::KMeans,
        Algorithm::Dbscan,
        Algorithm::Agglomerative,
        Algorithm::LinearRegression,
        Algorithm::LogisticRegression,
        Algorithm::DecisionTree,
        Algorithm::RandomForest,
        Algorithm::Svm,
        Algorithm::NaiveBayes,
        Algorithm::Knn,
    ];

    /// Name accepted in requests.
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::KMeans => "K-Means Clustering",
            Algorithm::Dbscan => "DBSCAN",
            Algorithm::Agglomerative => "Agglomerative Clustering",
            Algorithm::LinearRegression => "Linear Regression",
            Algorithm::LogisticRegression => "Logistic Regression",
            Algorithm::DecisionTree => "Decision Tree",
            Algorithm::RandomForest => "Random Forest",
            Algorithm::Svm => "SVM",
            Algorithm::NaiveBayes => "Naive Bayes",
            Algorithm::Knn => "KNN",
        }
    }

    pub fn task_rule(self) -> TaskRule {
        match self {
            Algorithm::KMeans | Algorithm::Dbscan | Algorithm::Agglomerative => {
                TaskRule::Unsupervised
            }
            Algorithm::LinearRegression => TaskRule::RegressionOnly,
            Algorithm::LogisticRegression | Algorithm::NaiveBayes => TaskRule::ClassificationOnly,
            Algorithm::DecisionTree | Algorithm::RandomForest | Algorithm::Svm | Algorithm::Knn => {
                TaskRule::DualMode
            }
        }
    }

    pub fn is_supervised(self) -> bool {
        self.task_rule() != TaskRule::Unsupervised
    }

    /// What a missing target is "required for" in the error message.
    pub fn target_requirement(self) -> &'static str {
        match self.task_rule() {
            TaskRule::RegressionOnly => "regression",
            TaskRule::ClassificationOnly if self == Algorithm::LogisticRegression => {
                "classification"
            }
            _ => self.name(),
        }
    }

    /// Short name reported in clustering results.
    pub fn short_name(self) -> &'static str {
        match self {
            Algorithm::KMeans => "kmeans",
            Algorithm::Dbscan => "dbscan",
            Algorithm::Agglomerative => "agglomerative",
            Algorithm::LinearRegression => "linear_regression",
            Algorithm::LogisticRegression => "logistic_regression",
            Algorithm::DecisionTree => "decision_tree",
            Algorithm::RandomForest => "random_forest",
            Algorithm::Svm => "svm",
            Algorithm::NaiveBayes => "naive_bayes",
            Algorithm::Knn => "knn",
        }
    }

    fn expected_names() -> String {
        Self::ALL
            .iter()
            .map(|a| a.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = TabfitError;

    /// Exact, case-sensitive match on the display name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.name() == s)
            .ok_or_else(|| TabfitError::UnrecognizedAlgorithm {
                name: s.to_string(),
                expected: Self::expected_names(),
            })
    }
}
