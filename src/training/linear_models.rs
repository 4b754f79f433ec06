//! Linear model implementations

use super::models::{check_xy, n_classes, Classifier, ModelExtras, Regressor};
use crate::error::{Result, TabfitError};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

const JACOBI_MAX_SWEEPS: usize = 100;

/// Eigen-decomposition of a symmetric matrix by cyclic Jacobi rotations.
///
/// Returns `(eigenvalues, eigenvectors)` with eigenvectors stored as columns.
fn symmetric_eigen(a: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = a.nrows();
    let mut m = a.clone();
    let mut v = Array2::<f64>::eye(n);

    let scale = m.iter().map(|x| x * x).sum::<f64>().sqrt().max(f64::MIN_POSITIVE);

    for _sweep in 0..JACOBI_MAX_SWEEPS {
        let off: f64 = (0..n)
            .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
            .map(|(i, j)| m[[i, j]] * m[[i, j]])
            .sum::<f64>()
            .sqrt();
        if off <= 1e-14 * scale {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = m[[p, q]];
                if apq.abs() <= f64::MIN_POSITIVE {
                    continue;
                }
                let theta = (m[[q, q]] - m[[p, p]]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let mkp = m[[k, p]];
                    let mkq = m[[k, q]];
                    m[[k, p]] = c * mkp - s * mkq;
                    m[[k, q]] = s * mkp + c * mkq;
                }
                for k in 0..n {
                    let mpk = m[[p, k]];
                    let mqk = m[[q, k]];
                    m[[p, k]] = c * mpk - s * mqk;
                    m[[q, k]] = s * mpk + c * mqk;
                }
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    (m.diag().to_owned(), v)
}

/// Minimum-norm least squares solution of `x w = y`.
///
/// Works through the pseudo-inverse of `XᵀX`, so collinear columns (such as a
/// full set of one-hot indicators) get a well-defined answer.
fn solve_least_squares(x: &Array2<f64>, y: &Array1<f64>) -> Result<Array1<f64>> {
    let xtx = x.t().dot(x);
    let xty = x.t().dot(y);
    if xtx.iter().any(|v| !v.is_finite()) || xty.iter().any(|v| !v.is_finite()) {
        return Err(TabfitError::ComputationError(
            "Input contains NaN or infinity".to_string(),
        ));
    }

    let (eigvals, eigvecs) = symmetric_eigen(&xtx);
    let max_eig = eigvals.iter().fold(0.0_f64, |m, &v| m.max(v.abs()));
    let cutoff = max_eig * 1e-10;

    // w = V diag(1/λ) Vᵀ Xᵀy over the non-negligible spectrum
    let projected = eigvecs.t().dot(&xty);
    let scaled: Array1<f64> = projected
        .iter()
        .zip(eigvals.iter())
        .map(|(p, &l)| if l > cutoff { p / l } else { 0.0 })
        .collect();
    Ok(eigvecs.dot(&scaled))
}

// ═══════════════════════════════════════════════════════════════════════════
//  Linear Regression
// ═══════════════════════════════════════════════════════════════════════════

/// Ordinary least squares linear regression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    /// Fitted coefficients (weights)
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept (bias)
    pub intercept: Option<f64>,
    /// Whether to fit intercept
    pub fit_intercept: bool,
    /// Whether model is fitted
    pub is_fitted: bool,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    /// Create a new linear regression model
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            fit_intercept: true,
            is_fitted: false,
        }
    }

    /// Enable/disable fitting intercept
    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    /// Fit the model to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_xy(x, y)?;

        // Center data if fitting intercept
        let (coefficients, intercept) = if self.fit_intercept {
            let x_mean = x
                .mean_axis(Axis(0))
                .ok_or_else(|| TabfitError::TrainingError("empty design matrix".into()))?;
            let y_mean = y.mean().unwrap_or(0.0);

            let x_centered = x - &x_mean.clone().insert_axis(Axis(0));
            let y_centered = y - y_mean;

            let coefficients = solve_least_squares(&x_centered, &y_centered)?;
            let intercept = y_mean - coefficients.dot(&x_mean);
            (coefficients, intercept)
        } else {
            (solve_least_squares(x, y)?, 0.0)
        };

        self.coefficients = Some(coefficients);
        self.intercept = Some(intercept);
        self.is_fitted = true;

        Ok(self)
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = match (&self.coefficients, self.is_fitted) {
            (Some(c), true) => c,
            _ => return Err(TabfitError::ModelNotFitted),
        };
        if x.ncols() != coefficients.len() {
            return Err(TabfitError::ShapeError {
                expected: format!("{} features", coefficients.len()),
                actual: format!("{} features", x.ncols()),
            });
        }

        Ok(x.dot(coefficients) + self.intercept.unwrap_or(0.0))
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        LinearRegression::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        LinearRegression::predict(self, x)
    }

    fn extras(&self) -> Option<ModelExtras> {
        let coefficients = self.coefficients.as_ref()?;
        Some(ModelExtras::Linear {
            coefficients: coefficients.to_vec(),
            intercept: self.intercept.unwrap_or(0.0),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Logistic Regression
// ═══════════════════════════════════════════════════════════════════════════

/// Multinomial logistic regression trained by full-batch gradient descent
///
/// Features are standardized internally; the L2 penalty strength is the
/// inverse of `c`, scaled by the number of samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Inverse regularization strength
    pub c: f64,
    /// Whether to apply the L2 penalty at all
    pub penalize: bool,
    pub fit_intercept: bool,
    pub max_iter: usize,
    /// Convergence tolerance on the largest gradient component
    pub tol: f64,
    pub learning_rate: f64,
    /// Weights (n_features × n_classes) in standardized space
    weights: Option<Array2<f64>>,
    /// Per-class bias
    bias: Option<Array1<f64>>,
    mean: Option<Array1<f64>>,
    scale: Option<Array1<f64>>,
    pub n_iter: usize,
    pub is_fitted: bool,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            c: 1.0,
            penalize: true,
            fit_intercept: true,
            max_iter: 1000,
            tol: 1e-4,
            learning_rate: 0.5,
            weights: None,
            bias: None,
            mean: None,
            scale: None,
            n_iter: 0,
            is_fitted: false,
        }
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_penalty(mut self, penalize: bool) -> Self {
        self.penalize = penalize;
        self
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Row-wise softmax, stabilized by subtracting the row max
    fn softmax(z: &mut Array2<f64>) {
        for mut row in z.rows_mut() {
            let max = row.iter().fold(f64::NEG_INFINITY, |m, &v| m.max(v));
            row.mapv_inplace(|v| (v - max).exp());
            let sum = row.sum();
            if sum > 0.0 {
                row.mapv_inplace(|v| v / sum);
            }
        }
    }

    fn standardize(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        match (&self.mean, &self.scale) {
            (Some(mean), Some(scale)) => Ok((x - mean) / scale),
            _ => Err(TabfitError::ModelNotFitted),
        }
    }

    /// Fit the model using gradient descent on the cross-entropy loss
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_xy(x, y)?;
        let n_samples = x.nrows();
        let n_features = x.ncols();
        let k = n_classes(y);

        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| TabfitError::TrainingError("empty design matrix".into()))?;
        let scale = x.std_axis(Axis(0), 0.0).mapv(|s| if s > 1e-12 { s } else { 1.0 });
        self.mean = Some(mean);
        self.scale = Some(scale);
        let xs = self.standardize(x)?;

        let mut one_hot = Array2::<f64>::zeros((n_samples, k));
        for (i, &label) in y.iter().enumerate() {
            one_hot[[i, label as usize]] = 1.0;
        }

        let mut weights = Array2::<f64>::zeros((n_features, k));
        let mut bias = Array1::<f64>::zeros(k);
        let l2 = if self.penalize {
            1.0 / (self.c * n_samples as f64)
        } else {
            0.0
        };

        self.n_iter = 0;
        for _iter in 0..self.max_iter {
            self.n_iter += 1;
            let mut proba = xs.dot(&weights) + &bias;
            Self::softmax(&mut proba);

            let errors = proba - &one_hot;
            let dw = xs.t().dot(&errors) / n_samples as f64 + &weights * l2;
            let db = errors
                .mean_axis(Axis(0))
                .unwrap_or_else(|| Array1::zeros(k));

            let grad_max = dw
                .iter()
                .chain(db.iter())
                .fold(0.0_f64, |m, &v| m.max(v.abs()));
            if !grad_max.is_finite() {
                return Err(TabfitError::ComputationError(
                    "logistic regression diverged".to_string(),
                ));
            }
            if grad_max < self.tol {
                break;
            }

            weights.scaled_add(-self.learning_rate, &dw);
            if self.fit_intercept {
                bias.scaled_add(-self.learning_rate, &db);
            }
        }

        self.weights = Some(weights);
        self.bias = Some(bias);
        self.is_fitted = true;
        Ok(self)
    }

    /// Class probabilities (n_samples × n_classes)
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (weights, bias) = match (&self.weights, &self.bias, self.is_fitted) {
            (Some(w), Some(b), true) => (w, b),
            _ => return Err(TabfitError::ModelNotFitted),
        };
        if x.ncols() != weights.nrows() {
            return Err(TabfitError::ShapeError {
                expected: format!("{} features", weights.nrows()),
                actual: format!("{} features", x.ncols()),
            });
        }
        let mut proba = self.standardize(x)?.dot(weights) + bias;
        Self::softmax(&mut proba);
        Ok(proba)
    }

    /// Predict class indices
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| argmax(row.iter().copied()) as f64)
            .collect())
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        LogisticRegression::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        LogisticRegression::predict(self, x)
    }
}

/// Index of the largest value; ties go to the lowest index.
pub(crate) fn argmax(values: impl Iterator<Item = f64>) -> usize {
    let mut best = 0;
    let mut best_val = f64::NEG_INFINITY;
    for (i, v) in values.enumerate() {
        if v > best_val {
            best_val = v;
            best = i;
        }
    }
    best
}
