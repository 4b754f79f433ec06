//! Request pipeline: dataset in, one evaluation (or one error) out.

use super::config::TrainerConfig;
use super::envelope::ResponseEnvelope;
use crate::data::{
    drop_null_rows, encode_features, ensure_column, train_test_split, CsvLoader, LabelSet,
    TargetVector,
};
use crate::error::{Result, TabfitError};
use crate::evaluation::{evaluate_classifier, evaluate_clusterer, evaluate_regressor, EvaluationResult};
use crate::training::{build_estimator, resolve_task_type, Algorithm, Estimator, HyperParams};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info};

/// One training request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainRequest {
    /// Human-readable algorithm name, e.g. `"Random Forest"`
    pub algorithm: String,
    /// Target column; empty or absent means unsupervised
    pub target: Option<String>,
    pub params: HyperParams,
}

impl TrainRequest {
    pub fn new(algorithm: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            ..Self::default()
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_params(mut self, params: HyperParams) -> Self {
        self.params = params;
        self
    }

    fn target_name(&self) -> Option<&str> {
        self.target.as_deref().filter(|t| !t.is_empty())
    }
}

/// Runs the load, encode, fit and evaluate pipeline for each request.
///
/// Requests share nothing; a `Trainer` can serve any number of them.
pub struct Trainer {
    config: TrainerConfig,
    loader: CsvLoader,
    pool: Option<rayon::ThreadPool>,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Result<Self> {
        let pool = match config.threads {
            Some(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| TabfitError::ConfigError(e.to_string()))?,
            ),
            None => None,
        };
        let loader = CsvLoader::new()
            .with_infer_schema_length(config.infer_schema_length)
            .with_max_input_bytes(config.max_input_bytes);
        Ok(Self {
            config,
            loader,
            pool,
        })
    }

    /// Trainer configured from the environment.
    pub fn from_env() -> Result<Self> {
        Self::new(TrainerConfig::default())
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Run a request, converting every failure (panics included) into an
    /// error envelope.
    pub fn train(&self, csv: &[u8], request: &TrainRequest) -> ResponseEnvelope {
        let started = Instant::now();
        info!(algorithm = %request.algorithm, target = ?request.target_name(), bytes = csv.len(), "Training request");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.try_train(csv, request)))
            .unwrap_or_else(|payload| Err(TabfitError::Unhandled(panic_message(payload.as_ref()))));

        match &outcome {
            Ok(result) => info!(
                algorithm = %request.algorithm,
                task = %result.task_type(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Training finished"
            ),
            Err(err) => error!(
                algorithm = %request.algorithm,
                kind = ?err.kind(),
                error = %err,
                "Training failed"
            ),
        }
        ResponseEnvelope::from(outcome)
    }

    /// Read a CSV file and run a request against it.
    pub fn train_csv(&self, path: impl AsRef<Path>, request: &TrainRequest) -> ResponseEnvelope {
        match std::fs::read(path.as_ref()) {
            Ok(bytes) => self.train(&bytes, request),
            Err(err) => {
                let err = TabfitError::from(err);
                error!(path = %path.as_ref().display(), error = %err, "Cannot read dataset");
                ResponseEnvelope::from_error(&err)
            }
        }
    }

    /// Run a request, propagating failures instead of enveloping them.
    pub fn try_train(&self, csv: &[u8], request: &TrainRequest) -> Result<EvaluationResult> {
        match &self.pool {
            Some(pool) => pool.install(|| self.run(csv, request)),
            None => self.run(csv, request),
        }
    }

    fn run(&self, csv: &[u8], request: &TrainRequest) -> Result<EvaluationResult> {
        let algorithm: Algorithm = request.algorithm.parse()?;
        let target_name = request.target_name();

        let df = self.loader.load_bytes(csv)?;
        if let Some(name) = target_name {
            ensure_column(&df, name)?;
        }
        let df = drop_null_rows(&df)?;
        debug!(rows = df.height(), columns = df.width(), "Dropped rows with nulls");

        let target = match target_name {
            Some(name) if algorithm.is_supervised() => Some(TargetVector::from_frame(&df, name)?),
            _ => None,
        };
        let task = resolve_task_type(algorithm, target.as_ref())?;
        debug!(algorithm = %algorithm.name(), task = %task, "Resolved task type");

        let features = encode_features(&df, target_name)?;
        debug!(
            rows = features.n_rows(),
            features = features.n_features(),
            "Encoded feature matrix"
        );

        let estimator = build_estimator(algorithm, task, &request.params)?;
        match estimator {
            Estimator::Clusterer(mut model) => {
                let result = evaluate_clusterer(model.as_mut(), &features.values, algorithm.short_name())?;
                Ok(EvaluationResult::Clustering(result))
            }
            Estimator::Classifier(mut model) => {
                let target = require_target(algorithm, target)?;
                let classes = LabelSet::from_labels(&target.labels);
                let split = train_test_split(&features.values, &target.labels)?;
                debug!(
                    train = split.x_train.nrows(),
                    test = split.x_test.nrows(),
                    classes = classes.len(),
                    "Split dataset"
                );
                let result = evaluate_classifier(model.as_mut(), &split, &classes)?;
                Ok(EvaluationResult::Classification(result))
            }
            Estimator::Regressor(mut model) => {
                let target = require_target(algorithm, target)?;
                let y = target.to_numeric()?.to_vec();
                let split = train_test_split(&features.values, &y)?;
                debug!(train = split.x_train.nrows(), test = split.x_test.nrows(), "Split dataset");
                let result = evaluate_regressor(model.as_mut(), &split)?;
                Ok(EvaluationResult::Regression(result))
            }
        }
    }
}

fn require_target(algorithm: Algorithm, target: Option<TargetVector>) -> Result<TargetVector> {
    target.ok_or_else(|| TabfitError::TargetRequired(algorithm.target_requirement().to_string()))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}
