//! Model training module
//!
//! Provides the model families the service can fit:
//! - Linear and logistic regression
//! - Decision trees and Random Forests
//! - K-Nearest Neighbors
//! - Gaussian Naive Bayes
//! - Support Vector Machines
//! - Clustering (KMeans, DBSCAN, Agglomerative)
//!
//! plus the pieces that choose and configure them: algorithm names, task
//! resolution, hyperparameter parsing and the estimator dispatch table.

pub mod algorithm;
pub mod clustering;
pub mod decision_tree;
pub mod dispatch;
pub mod knn;
pub mod linear_models;
pub mod models;
pub mod naive_bayes;
pub mod params;
pub mod random_forest;
pub mod svm;
pub mod task;

pub use algorithm::{Algorithm, TaskRule, TaskType};
pub use clustering::{AgglomerativeClustering, DbscanMetric, KMeans, Linkage, DBSCAN};
pub use decision_tree::{Criterion, DecisionTree, MaxFeatures, TreeNode};
pub use dispatch::{build_estimator, Estimator};
pub use knn::{DistanceMetric, KNNClassifier, KNNConfig, KNNRegressor, WeightScheme};
pub use linear_models::{LinearRegression, LogisticRegression};
pub use models::{Classifier, Clusterer, ModelExtras, Regressor};
pub use naive_bayes::GaussianNaiveBayes;
pub use params::{parse_hyperparams, HyperParams};
pub use random_forest::RandomForest;
pub use svm::{Gamma, KernelType, SVMClassifier, SVMConfig, SVMRegressor};
pub use task::{resolve_task_type, CLASSIFICATION_THRESHOLD};
