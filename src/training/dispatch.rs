//! Algorithm + task → freshly configured model.

use super::algorithm::{Algorithm, TaskType};
use super::clustering::{AgglomerativeClustering, KMeans, DBSCAN};
use super::decision_tree::DecisionTree;
use super::knn::{KNNClassifier, KNNConfig, KNNRegressor};
use super::linear_models::{LinearRegression, LogisticRegression};
use super::models::{Classifier, Clusterer, Regressor};
use super::naive_bayes::GaussianNaiveBayes;
use super::params::*;
use super::random_forest::RandomForest;
use super::svm::{SVMClassifier, SVMConfig, SVMRegressor};
use crate::error::{Result, TabfitError};

/// A model ready to be fitted, grouped by capability.
pub enum Estimator {
    Classifier(Box<dyn Classifier>),
    Regressor(Box<dyn Regressor>),
    Clusterer(Box<dyn Clusterer>),
}

impl Estimator {
    pub fn task_type(&self) -> TaskType {
        match self {
            Estimator::Classifier(_) => TaskType::Classification,
            Estimator::Regressor(_) => TaskType::Regression,
            Estimator::Clusterer(_) => TaskType::Clustering,
        }
    }
}

impl std::fmt::Debug for Estimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Estimator::{:?}", self.task_type())
    }
}

/// Build the model for `algorithm` running as `task`, configured from `params`.
///
/// Every algorithm maps to a constructor for each task it supports; any other
/// pairing is rejected.
pub fn build_estimator(
    algorithm: Algorithm,
    task: TaskType,
    params: &HyperParams,
) -> Result<Estimator> {
    let estimator = match (algorithm, task) {
        (Algorithm::KMeans, TaskType::Clustering) => {
            let p: KMeansParams = parse_params(algorithm, params)?;
            check_tol(p.tol).map_err(|e| construction(algorithm, e))?;
            Estimator::Clusterer(Box::new(
                KMeans::new(p.n_clusters)
                    .with_max_iter(p.max_iter)
                    .with_tol(p.tol)
                    .with_n_init(p.n_init.resolve())
                    .with_random_state(p.random_state),
            ))
        }
        (Algorithm::Dbscan, TaskType::Clustering) => {
            let p: DbscanParams = parse_params(algorithm, params)?;
            Estimator::Clusterer(Box::new(
                DBSCAN::new(p.eps, p.min_samples).with_metric(p.metric),
            ))
        }
        (Algorithm::Agglomerative, TaskType::Clustering) => {
            let p: AgglomerativeParams = parse_params(algorithm, params)?;
            let model = AgglomerativeClustering {
                n_clusters: p.n_clusters,
                distance_threshold: p.distance_threshold,
                ..AgglomerativeClustering::default()
            }
            .with_linkage(p.linkage);
            Estimator::Clusterer(Box::new(model))
        }
        (Algorithm::LinearRegression, TaskType::Regression) => {
            let p: LinearRegressionParams = parse_params(algorithm, params)?;
            Estimator::Regressor(Box::new(
                LinearRegression::new().with_fit_intercept(p.fit_intercept),
            ))
        }
        (Algorithm::LogisticRegression, TaskType::Classification) => {
            let p: LogisticRegressionParams = parse_params(algorithm, params)?;
            if p.c.is_nan() || p.c <= 0.0 {
                return Err(construction(
                    algorithm,
                    TabfitError::invalid_param("C", p.c, "must be positive"),
                ));
            }
            check_tol(p.tol).map_err(|e| construction(algorithm, e))?;
            Estimator::Classifier(Box::new(
                LogisticRegression::new()
                    .with_c(p.c)
                    .with_penalty(p.penalty.is_some())
                    .with_max_iter(p.max_iter)
                    .with_tol(p.tol)
                    .with_fit_intercept(p.fit_intercept),
            ))
        }
        (Algorithm::NaiveBayes, TaskType::Classification) => {
            let p: NaiveBayesParams = parse_params(algorithm, params)?;
            let mut model = GaussianNaiveBayes::new().with_var_smoothing(p.var_smoothing);
            if let Some(priors) = p.priors {
                model = model.with_priors(priors);
            }
            Estimator::Classifier(Box::new(model))
        }
        (Algorithm::DecisionTree, TaskType::Classification | TaskType::Regression) => {
            let p: DecisionTreeParams = parse_params(algorithm, params)?;
            let tree = decision_tree(&p, task).map_err(|e| construction(algorithm, e))?;
            if task == TaskType::Classification {
                Estimator::Classifier(Box::new(tree))
            } else {
                Estimator::Regressor(Box::new(tree))
            }
        }
        (Algorithm::RandomForest, TaskType::Classification | TaskType::Regression) => {
            let p: RandomForestParams = parse_params(algorithm, params)?;
            let forest = random_forest(&p, task).map_err(|e| construction(algorithm, e))?;
            if task == TaskType::Classification {
                Estimator::Classifier(Box::new(forest))
            } else {
                Estimator::Regressor(Box::new(forest))
            }
        }
        (Algorithm::Svm, TaskType::Classification | TaskType::Regression) => {
            let p: SvmParams = parse_params(algorithm, params)?;
            let config = svm_config(&p, task).map_err(|e| construction(algorithm, e))?;
            if task == TaskType::Classification {
                Estimator::Classifier(Box::new(SVMClassifier::new(config)))
            } else {
                Estimator::Regressor(Box::new(SVMRegressor::new(config)))
            }
        }
        (Algorithm::Knn, TaskType::Classification | TaskType::Regression) => {
            let p: KnnParams = parse_params(algorithm, params)?;
            let config = KNNConfig {
                n_neighbors: p.n_neighbors,
                metric: p.metric(),
                weights: p.weights,
            };
            if task == TaskType::Classification {
                Estimator::Classifier(Box::new(KNNClassifier::new(config)))
            } else {
                Estimator::Regressor(Box::new(KNNRegressor::new(config)))
            }
        }
        (algorithm, task) => {
            return Err(TabfitError::Construction {
                algorithm: algorithm.name().to_string(),
                reason: format!("{} does not support {} tasks", algorithm, task),
            })
        }
    };
    Ok(estimator)
}

fn decision_tree(p: &DecisionTreeParams, task: TaskType) -> Result<DecisionTree> {
    let mut tree = if task == TaskType::Classification {
        DecisionTree::new_classifier()
    } else {
        DecisionTree::new_regressor()
    }
    .with_min_samples_split(p.min_samples_split)
    .with_min_samples_leaf(p.min_samples_leaf);

    check_min_samples(p.min_samples_split, p.min_samples_leaf)?;
    if let Some(criterion) = p.criterion {
        tree = tree.with_criterion(criterion.into())?;
    }
    if let Some(depth) = p.max_depth {
        tree = tree.with_max_depth(depth);
    }
    if let Some(max_features) = p.max_features {
        tree = tree.with_max_features(max_features.resolve()?);
    }
    if let Some(seed) = p.random_state {
        tree = tree.with_random_state(seed);
    }
    Ok(tree)
}

fn random_forest(p: &RandomForestParams, task: TaskType) -> Result<RandomForest> {
    let mut forest = if task == TaskType::Classification {
        RandomForest::new_classifier(p.n_estimators)
    } else {
        RandomForest::new_regressor(p.n_estimators)
    }
    .with_min_samples_split(p.min_samples_split)
    .with_min_samples_leaf(p.min_samples_leaf)
    .with_bootstrap(p.bootstrap)
    .with_random_state(p.random_state);

    check_min_samples(p.min_samples_split, p.min_samples_leaf)?;
    if p.n_estimators == 0 {
        return Err(TabfitError::invalid_param("n_estimators", 0, "must be at least 1"));
    }
    if let Some(criterion) = p.criterion {
        forest = forest.with_criterion(criterion.into())?;
    }
    if let Some(depth) = p.max_depth {
        forest = forest.with_max_depth(depth);
    }
    if let Some(max_features) = p.max_features {
        forest = forest.with_max_features(max_features.resolve()?);
    }
    Ok(forest)
}

fn check_min_samples(split: usize, leaf: usize) -> Result<()> {
    if split < 2 {
        return Err(TabfitError::invalid_param(
            "min_samples_split",
            split,
            "must be at least 2",
        ));
    }
    if leaf < 1 {
        return Err(TabfitError::invalid_param(
            "min_samples_leaf",
            leaf,
            "must be at least 1",
        ));
    }
    Ok(())
}

/// Stopping tolerances must be finite and non-negative.
fn check_tol(tol: f64) -> Result<()> {
    if !tol.is_finite() || tol < 0.0 {
        return Err(TabfitError::invalid_param("tol", tol, "must be non-negative"));
    }
    Ok(())
}

fn svm_config(p: &SvmParams, task: TaskType) -> Result<SVMConfig> {
    if p.c.is_nan() || p.c <= 0.0 {
        return Err(TabfitError::invalid_param("C", p.c, "must be positive"));
    }
    check_tol(p.tol)?;
    if p.max_iter < -1 {
        return Err(TabfitError::invalid_param(
            "max_iter",
            p.max_iter,
            "must be -1 (no limit) or non-negative",
        ));
    }
    let epsilon = match (task, p.epsilon) {
        (TaskType::Classification, Some(e)) => {
            return Err(TabfitError::invalid_param(
                "epsilon",
                e,
                "only applies to regression",
            ))
        }
        (_, Some(e)) if e < 0.0 => {
            return Err(TabfitError::invalid_param("epsilon", e, "must be non-negative"))
        }
        (_, Some(e)) => e,
        (_, None) => 0.1,
    };
    Ok(SVMConfig {
        c: p.c,
        kernel: p.kernel(),
        gamma: p.gamma.resolve()?,
        tol: p.tol,
        max_iter: p.max_iter(),
        random_state: p.random_state,
        epsilon,
    })
}
