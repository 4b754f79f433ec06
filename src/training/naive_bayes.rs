//! Gaussian Naive Bayes for continuous features.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::linear_models::argmax;
use super::models::{check_xy, Classifier};
use crate::error::{Result, TabfitError};

/// Gaussian Naive Bayes Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianNaiveBayes {
    /// Class indices seen during fit, ascending
    classes: Vec<usize>,
    /// Mean of each feature for each class
    means: Vec<Vec<f64>>,
    /// Variance of each feature for each class
    variances: Vec<Vec<f64>>,
    /// Prior probability of each class
    priors: Vec<f64>,
    /// User supplied priors, in class order
    fixed_priors: Option<Vec<f64>>,
    /// Portion of the largest feature variance added to every variance
    var_smoothing: f64,
    pub is_fitted: bool,
}

impl Default for GaussianNaiveBayes {
    fn default() -> Self {
        Self::new()
    }
}

impl GaussianNaiveBayes {
    pub fn new() -> Self {
        Self {
            classes: Vec::new(),
            means: Vec::new(),
            variances: Vec::new(),
            priors: Vec::new(),
            fixed_priors: None,
            var_smoothing: 1e-9,
            is_fitted: false,
        }
    }

    /// Set variance smoothing parameter
    pub fn with_var_smoothing(mut self, smoothing: f64) -> Self {
        self.var_smoothing = smoothing;
        self
    }

    /// Fix class priors instead of estimating them from the data
    pub fn with_priors(mut self, priors: Vec<f64>) -> Self {
        self.fixed_priors = Some(priors);
        self
    }

    /// Fit the classifier
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_xy(x, y)?;
        let n_samples = x.nrows();
        let n_features = x.ncols();

        let mut classes: Vec<usize> = y.iter().map(|&v| v as usize).collect();
        classes.sort_unstable();
        classes.dedup();

        let epsilon = self.var_smoothing
            * x.var_axis(Axis(0), 0.0)
                .iter()
                .fold(0.0_f64, |m, &v| m.max(v));

        let mut means = Vec::with_capacity(classes.len());
        let mut variances = Vec::with_capacity(classes.len());
        let mut counts = Vec::with_capacity(classes.len());

        for &class in &classes {
            // Single-pass Welford's algorithm for mean and variance
            let mut feature_means = vec![0.0; n_features];
            let mut feature_m2 = vec![0.0; n_features];
            let mut count = 0usize;
            for (row, _) in x
                .rows()
                .into_iter()
                .zip(y.iter())
                .filter(|(_, &label)| label as usize == class)
            {
                count += 1;
                for (j, &val) in row.iter().enumerate() {
                    let delta = val - feature_means[j];
                    feature_means[j] += delta / count as f64;
                    let delta2 = val - feature_means[j];
                    feature_m2[j] += delta * delta2;
                }
            }
            let feature_vars: Vec<f64> = feature_m2
                .iter()
                .map(|&m2| m2 / count as f64 + epsilon)
                .collect();

            means.push(feature_means);
            variances.push(feature_vars);
            counts.push(count);
        }

        let priors = match &self.fixed_priors {
            Some(p) => {
                if p.len() != classes.len() {
                    return Err(TabfitError::invalid_param(
                        "priors",
                        format!("{:?}", p),
                        format!("number of priors must match number of classes ({})", classes.len()),
                    ));
                }
                let total: f64 = p.iter().sum();
                if (total - 1.0).abs() > 1e-8 {
                    return Err(TabfitError::invalid_param(
                        "priors",
                        format!("{:?}", p),
                        "the sum of the priors should be 1",
                    ));
                }
                if p.iter().any(|&v| v < 0.0) {
                    return Err(TabfitError::invalid_param(
                        "priors",
                        format!("{:?}", p),
                        "priors must be non-negative",
                    ));
                }
                p.clone()
            }
            None => counts
                .iter()
                .map(|&c| c as f64 / n_samples as f64)
                .collect(),
        };

        if variances.iter().flatten().any(|&v| v <= 0.0) {
            return Err(TabfitError::ComputationError(
                "zero variance feature; increase var_smoothing".to_string(),
            ));
        }

        self.classes = classes;
        self.means = means;
        self.variances = variances;
        self.priors = priors;
        self.is_fitted = true;
        Ok(self)
    }

    /// Predict class indices
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let log_probs = self.predict_log_proba(x)?;
        Ok(log_probs
            .rows()
            .into_iter()
            .map(|row| self.classes[argmax(row.iter().copied())] as f64)
            .collect())
    }

    /// Normalized log probabilities (n_samples × fitted classes)
    pub fn predict_log_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(TabfitError::ModelNotFitted);
        }
        let n_features = self.means.first().map_or(0, |m| m.len());
        if x.ncols() != n_features {
            return Err(TabfitError::ShapeError {
                expected: format!("{} features", n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut log_probs = Array2::zeros((x.nrows(), self.classes.len()));
        for (i, row) in x.rows().into_iter().enumerate() {
            for j in 0..self.classes.len() {
                log_probs[[i, j]] = self.priors[j].ln() + self.log_likelihood(&row, j);
            }
        }

        // Normalize (log-sum-exp trick)
        for mut row in log_probs.rows_mut() {
            let max_val = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            if !max_val.is_finite() {
                continue;
            }
            let log_sum: f64 = row.iter().map(|&v| (v - max_val).exp()).sum::<f64>().ln();
            for val in row.iter_mut() {
                *val = *val - max_val - log_sum;
            }
        }

        Ok(log_probs)
    }

    fn log_likelihood(&self, x: &ArrayView1<f64>, class_pos: usize) -> f64 {
        x.iter()
            .zip(self.means[class_pos].iter())
            .zip(self.variances[class_pos].iter())
            .map(|((&xi, &mean), &var)| {
                // Log of Gaussian PDF
                -0.5 * ((xi - mean).powi(2) / var + var.ln() + (2.0 * PI).ln())
            })
            .sum()
    }

    /// Class priors in class order
    pub fn class_priors(&self) -> &[f64] {
        &self.priors
    }
}

impl Classifier for GaussianNaiveBayes {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        GaussianNaiveBayes::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        GaussianNaiveBayes::predict(self, x)
    }
}
