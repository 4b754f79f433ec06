//! Hyperparameter mapping and the typed parameter set of every model.
//!
//! Requests carry a free-form JSON object. Each algorithm deserializes it into
//! its own struct; unknown keys and ill-typed values are construction errors.

use super::algorithm::Algorithm;
use super::clustering::{DbscanMetric, Linkage};
use super::decision_tree::{Criterion, MaxFeatures};
use super::knn::{DistanceMetric, WeightScheme};
use super::svm::{Gamma, KernelType};
use crate::error::{Result, TabfitError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Caller-supplied hyperparameters, applied verbatim.
pub type HyperParams = Map<String, Value>;

/// Parse a JSON object string into a hyperparameter mapping.
pub fn parse_hyperparams(text: &str) -> Result<HyperParams> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(HyperParams::new());
    }
    match serde_json::from_str::<Value>(trimmed)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(HyperParams::new()),
        other => Err(TabfitError::SerializationError(format!(
            "hyperparameters must be a JSON object, got {}",
            other
        ))),
    }
}

/// Deserialize `params` into the parameter struct of `algorithm`.
pub fn parse_params<T: DeserializeOwned>(algorithm: Algorithm, params: &HyperParams) -> Result<T> {
    serde_json::from_value(Value::Object(params.clone())).map_err(|e| TabfitError::Construction {
        algorithm: algorithm.name().to_string(),
        reason: e.to_string(),
    })
}

/// Re-raise a model-level parameter rejection as a construction error.
pub(crate) fn construction(algorithm: Algorithm, err: TabfitError) -> TabfitError {
    match err {
        TabfitError::InvalidParameter { name, value, reason } => TabfitError::Construction {
            algorithm: algorithm.name().to_string(),
            reason: format!("{} = {}: {}", name, value, reason),
        },
        other => other,
    }
}

/// `"auto"`, or a literal count
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum NInit {
    Count(usize),
    Keyword(AutoKeyword),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoKeyword {
    Auto,
}

impl NInit {
    pub fn resolve(self) -> usize {
        match self {
            NInit::Count(n) => n,
            NInit::Keyword(AutoKeyword::Auto) => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct KMeansParams {
    pub n_clusters: usize,
    pub max_iter: usize,
    pub tol: f64,
    pub n_init: NInit,
    pub random_state: Option<u64>,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            n_clusters: 8,
            max_iter: 300,
            tol: 1e-4,
            n_init: NInit::Keyword(AutoKeyword::Auto),
            random_state: Some(42),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DbscanParams {
    pub eps: f64,
    pub min_samples: usize,
    pub metric: DbscanMetric,
}

impl Default for DbscanParams {
    fn default() -> Self {
        Self {
            eps: 0.5,
            min_samples: 5,
            metric: DbscanMetric::Euclidean,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgglomerativeParams {
    pub n_clusters: Option<usize>,
    pub linkage: Linkage,
    pub distance_threshold: Option<f64>,
}

impl Default for AgglomerativeParams {
    fn default() -> Self {
        Self {
            n_clusters: Some(2),
            linkage: Linkage::Ward,
            distance_threshold: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinearRegressionParams {
    pub fit_intercept: bool,
}

impl Default for LinearRegressionParams {
    fn default() -> Self {
        Self { fit_intercept: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Penalty {
    L2,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogisticRegressionParams {
    #[serde(rename = "C")]
    pub c: f64,
    /// `null` disables regularization
    pub penalty: Option<Penalty>,
    pub max_iter: usize,
    pub tol: f64,
    pub fit_intercept: bool,
}

impl Default for LogisticRegressionParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            penalty: Some(Penalty::L2),
            max_iter: 1000,
            tol: 1e-4,
            fit_intercept: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct NaiveBayesParams {
    pub var_smoothing: f64,
    pub priors: Option<Vec<f64>>,
}

impl Default for NaiveBayesParams {
    fn default() -> Self {
        Self {
            var_smoothing: 1e-9,
            priors: None,
        }
    }
}

/// Split quality measure, by its familiar name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionName {
    Gini,
    Entropy,
    LogLoss,
    SquaredError,
    AbsoluteError,
}

impl From<CriterionName> for Criterion {
    fn from(name: CriterionName) -> Self {
        match name {
            CriterionName::Gini => Criterion::Gini,
            CriterionName::Entropy | CriterionName::LogLoss => Criterion::Entropy,
            CriterionName::SquaredError => Criterion::MSE,
            CriterionName::AbsoluteError => Criterion::MAE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MaxFeaturesKeyword {
    Sqrt,
    Log2,
}

/// `"sqrt"`, `"log2"`, an integer count or a fraction
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MaxFeaturesParam {
    Count(usize),
    Fraction(f64),
    Keyword(MaxFeaturesKeyword),
}

impl MaxFeaturesParam {
    pub fn resolve(self) -> Result<MaxFeatures> {
        match self {
            MaxFeaturesParam::Count(0) => Err(TabfitError::invalid_param(
                "max_features",
                0,
                "must be at least 1",
            )),
            MaxFeaturesParam::Count(n) => Ok(MaxFeatures::Fixed(n)),
            MaxFeaturesParam::Fraction(f) if f > 0.0 && f <= 1.0 => Ok(MaxFeatures::Fraction(f)),
            MaxFeaturesParam::Fraction(f) => Err(TabfitError::invalid_param(
                "max_features",
                f,
                "a fraction must lie in (0, 1]",
            )),
            MaxFeaturesParam::Keyword(MaxFeaturesKeyword::Sqrt) => Ok(MaxFeatures::Sqrt),
            MaxFeaturesParam::Keyword(MaxFeaturesKeyword::Log2) => Ok(MaxFeatures::Log2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecisionTreeParams {
    /// Defaults to `gini` or `squared_error` by task
    pub criterion: Option<CriterionName>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: Option<MaxFeaturesParam>,
    pub random_state: Option<u64>,
}

impl Default for DecisionTreeParams {
    fn default() -> Self {
        Self {
            criterion: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            random_state: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RandomForestParams {
    pub n_estimators: usize,
    pub criterion: Option<CriterionName>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Defaults to `sqrt` for classification, all features for regression
    pub max_features: Option<MaxFeaturesParam>,
    pub bootstrap: bool,
    pub random_state: Option<u64>,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            criterion: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            random_state: Some(42),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelName {
    Linear,
    Poly,
    Rbf,
    Sigmoid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GammaKeyword {
    Scale,
    Auto,
}

/// `"scale"`, `"auto"` or a positive number
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum GammaParam {
    Value(f64),
    Keyword(GammaKeyword),
}

impl GammaParam {
    pub fn resolve(self) -> Result<Gamma> {
        match self {
            GammaParam::Keyword(GammaKeyword::Scale) => Ok(Gamma::Scale),
            GammaParam::Keyword(GammaKeyword::Auto) => Ok(Gamma::Auto),
            GammaParam::Value(g) if g > 0.0 => Ok(Gamma::Value(g)),
            GammaParam::Value(g) => Err(TabfitError::invalid_param("gamma", g, "must be positive")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SvmParams {
    #[serde(rename = "C")]
    pub c: f64,
    pub kernel: KernelName,
    pub gamma: GammaParam,
    pub degree: u32,
    pub coef0: f64,
    pub tol: f64,
    /// `-1` leaves the epoch count to the solver
    pub max_iter: i64,
    /// Regression only
    pub epsilon: Option<f64>,
    pub random_state: Option<u64>,
}

impl Default for SvmParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            kernel: KernelName::Rbf,
            gamma: GammaParam::Keyword(GammaKeyword::Scale),
            degree: 3,
            coef0: 0.0,
            tol: 1e-3,
            max_iter: -1,
            epsilon: None,
            random_state: Some(42),
        }
    }
}

impl SvmParams {
    pub fn kernel(&self) -> KernelType {
        match self.kernel {
            KernelName::Linear => KernelType::Linear,
            KernelName::Poly => KernelType::Polynomial {
                degree: self.degree,
                coef0: self.coef0,
            },
            KernelName::Rbf => KernelType::RBF,
            KernelName::Sigmoid => KernelType::Sigmoid { coef0: self.coef0 },
        }
    }

    pub fn max_iter(&self) -> Option<usize> {
        usize::try_from(self.max_iter).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricName {
    Minkowski,
    Euclidean,
    Manhattan,
    Chebyshev,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct KnnParams {
    pub n_neighbors: usize,
    pub weights: WeightScheme,
    pub metric: MetricName,
    /// Power of the Minkowski metric
    pub p: f64,
}

impl Default for KnnParams {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            weights: WeightScheme::Uniform,
            metric: MetricName::Minkowski,
            p: 2.0,
        }
    }
}

impl KnnParams {
    pub fn metric(&self) -> DistanceMetric {
        match self.metric {
            MetricName::Minkowski => DistanceMetric::Minkowski(self.p),
            MetricName::Euclidean => DistanceMetric::Euclidean,
            MetricName::Manhattan => DistanceMetric::Manhattan,
            MetricName::Chebyshev => DistanceMetric::Chebyshev,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> HyperParams {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_defaults_from_empty_mapping() {
        let p: KMeansParams = parse_params(Algorithm::KMeans, &HyperParams::new()).unwrap();
        assert_eq!(p, KMeansParams::default());
        assert_eq!(p.n_init.resolve(), 1);
    }

    #[test]
    fn test_unknown_key_is_construction_error() {
        let err = parse_params::<DbscanParams>(Algorithm::Dbscan, &params(json!({"epsilon": 1.0})))
            .unwrap_err();
        assert!(matches!(err, TabfitError::Construction { .. }));
        assert!(err.to_string().starts_with("Invalid parameters for DBSCAN:"));
        assert!(err.to_string().contains("epsilon"));
    }

    #[test]
    fn test_ill_typed_value() {
        let err = parse_params::<KnnParams>(Algorithm::Knn, &params(json!({"n_neighbors": "five"})))
            .unwrap_err();
        assert!(matches!(err, TabfitError::Construction { .. }));
    }

    #[test]
    fn test_untagged_values() {
        let p: KMeansParams =
            parse_params(Algorithm::KMeans, &params(json!({"n_init": 10, "random_state": null})))
                .unwrap();
        assert_eq!(p.n_init, NInit::Count(10));
        assert_eq!(p.random_state, None);

        let p: SvmParams =
            parse_params(Algorithm::Svm, &params(json!({"C": 2.5, "gamma": 0.1, "kernel": "poly"})))
                .unwrap();
        assert_eq!(p.gamma.resolve().unwrap(), Gamma::Value(0.1));
        assert!(matches!(p.kernel(), KernelType::Polynomial { degree: 3, .. }));
        assert_eq!(p.max_iter(), None);

        let p: RandomForestParams = parse_params(
            Algorithm::RandomForest,
            &params(json!({"max_features": "log2", "criterion": "entropy"})),
        )
        .unwrap();
        assert_eq!(p.max_features.unwrap().resolve().unwrap(), MaxFeatures::Log2);
        assert_eq!(Criterion::from(p.criterion.unwrap()), Criterion::Entropy);
    }

    #[test]
    fn test_max_features_fraction_and_count() {
        let p: DecisionTreeParams =
            parse_params(Algorithm::DecisionTree, &params(json!({"max_features": 0.5}))).unwrap();
        assert_eq!(p.max_features.unwrap().resolve().unwrap(), MaxFeatures::Fraction(0.5));
        let p: DecisionTreeParams =
            parse_params(Algorithm::DecisionTree, &params(json!({"max_features": 3}))).unwrap();
        assert_eq!(p.max_features.unwrap().resolve().unwrap(), MaxFeatures::Fixed(3));
    }

    #[test]
    fn test_parse_hyperparams() {
        assert!(parse_hyperparams("").unwrap().is_empty());
        assert!(parse_hyperparams("null").unwrap().is_empty());
        assert_eq!(parse_hyperparams(r#"{"eps": 0.3}"#).unwrap()["eps"], 0.3);
        assert!(parse_hyperparams("[1, 2]").is_err());
        assert!(parse_hyperparams("{oops").is_err());
    }

    #[test]
    fn test_knn_metric_mapping() {
        let p: KnnParams =
            parse_params(Algorithm::Knn, &params(json!({"metric": "minkowski", "p": 1}))).unwrap();
        assert_eq!(p.metric(), DistanceMetric::Minkowski(1.0));
        assert_eq!(p.weights, WeightScheme::Uniform);
    }
}
