//! Support Vector Machine implementations
//!
//! Classifier and regressor are trained by coordinate descent on the dual
//! problem over a precomputed kernel matrix. The bias is absorbed by adding a
//! constant to the kernel. Multi-class classification uses one-vs-rest.

use super::models::{check_xy, Classifier, Regressor};
use crate::error::{Result, TabfitError};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Maximum number of samples for eager kernel matrix computation.
/// Beyond this, training will return an error to prevent OOM.
const MAX_KERNEL_MATRIX_SAMPLES: usize = 10_000;

/// Epoch cap used when no iteration limit is requested
const DEFAULT_MAX_EPOCHS: usize = 1_000;

/// Kernel function type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum KernelType {
    /// Linear kernel: K(x, y) = x · y
    Linear,
    /// Polynomial kernel: K(x, y) = (γ * x · y + r)^d
    Polynomial { degree: u32, coef0: f64 },
    /// Radial Basis Function (Gaussian): K(x, y) = exp(-γ * ||x - y||²)
    RBF,
    /// Sigmoid kernel: K(x, y) = tanh(γ * x · y + r)
    Sigmoid { coef0: f64 },
}

/// Kernel coefficient γ
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Gamma {
    /// 1 / (n_features * X.var())
    Scale,
    /// 1 / n_features
    Auto,
    Value(f64),
}

impl Gamma {
    fn resolve(self, x: &Array2<f64>) -> f64 {
        let n_features = x.ncols().max(1) as f64;
        match self {
            Gamma::Value(g) => g,
            Gamma::Auto => 1.0 / n_features,
            Gamma::Scale => {
                let n = x.len() as f64;
                if n == 0.0 {
                    return 1.0;
                }
                let mean = x.sum() / n;
                let var = x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                if var > 0.0 {
                    1.0 / (n_features * var)
                } else {
                    1.0
                }
            }
        }
    }
}

/// SVM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMConfig {
    /// Regularization parameter (C)
    pub c: f64,
    /// Kernel function
    pub kernel: KernelType,
    pub gamma: Gamma,
    /// Tolerance for stopping criterion
    pub tol: f64,
    /// Maximum number of epochs; `None` uses an internal cap
    pub max_iter: Option<usize>,
    /// Random seed for coordinate order
    pub random_state: Option<u64>,
    /// Epsilon for regression (SVR tube width)
    pub epsilon: f64,
}

impl Default for SVMConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            kernel: KernelType::RBF,
            gamma: Gamma::Scale,
            tol: 1e-3,
            max_iter: None,
            random_state: Some(42),
            epsilon: 0.1,
        }
    }
}

/// Kernel with γ resolved against the training data
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct FittedKernel {
    kernel: KernelType,
    gamma: f64,
}

impl FittedKernel {
    fn eval(&self, a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
        match self.kernel {
            KernelType::Linear => a.dot(b),
            KernelType::Polynomial { degree, coef0 } => {
                (self.gamma * a.dot(b) + coef0).powi(degree.min(i32::MAX as u32) as i32)
            }
            KernelType::RBF => {
                let norm_sq: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum();
                (-self.gamma * norm_sq).exp()
            }
            KernelType::Sigmoid { coef0 } => (self.gamma * a.dot(b) + coef0).tanh(),
        }
    }

    /// Kernel matrix plus the constant bias term (parallelized for large datasets)
    fn matrix(&self, x: &Array2<f64>) -> Array2<f64> {
        let n = x.nrows();
        let mut k = Array2::zeros((n, n));

        // For small matrices, sequential is faster due to overhead
        if n < 100 {
            for i in 0..n {
                for j in i..n {
                    let val = self.eval(&x.row(i), &x.row(j)) + 1.0;
                    k[[i, j]] = val;
                    k[[j, i]] = val;
                }
            }
            return k;
        }

        let rows: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| (i..n).map(|j| self.eval(&x.row(i), &x.row(j)) + 1.0).collect())
            .collect();
        for (i, row_vals) in rows.into_iter().enumerate() {
            for (offset, val) in row_vals.into_iter().enumerate() {
                let j = i + offset;
                k[[i, j]] = val;
                k[[j, i]] = val;
            }
        }
        k
    }

    /// Σ coef_j (K(sv_j, sample) + 1)
    fn expand(&self, sample: &ArrayView1<f64>, sv: &Array2<f64>, coef: &Array1<f64>) -> f64 {
        sv.rows()
            .into_iter()
            .zip(coef.iter())
            .map(|(row, &c)| c * (self.eval(&row, sample) + 1.0))
            .sum()
    }
}

fn check_kernel_size(n: usize) -> Result<()> {
    if n > MAX_KERNEL_MATRIX_SAMPLES {
        return Err(TabfitError::TrainingError(format!(
            "Dataset has {} samples, exceeding the maximum {} for SVM kernel matrix. \
             Consider subsampling or using a different algorithm.",
            n, MAX_KERNEL_MATRIX_SAMPLES
        )));
    }
    Ok(())
}

fn make_rng(seed: Option<u64>) -> Xoshiro256PlusPlus {
    match seed {
        Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
        None => Xoshiro256PlusPlus::from_entropy(),
    }
}

/// A single binary SVM trained for one class vs rest
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BinarySVM {
    support_vectors: Array2<f64>,
    /// α_j y_j for each support vector
    dual_coef: Array1<f64>,
}

impl BinarySVM {
    /// Dual coordinate descent for the hinge loss with labels in {-1, +1}
    fn train(
        x: &Array2<f64>,
        k: &Array2<f64>,
        y: &Array1<f64>,
        config: &SVMConfig,
        rng: &mut Xoshiro256PlusPlus,
    ) -> Self {
        let n = x.nrows();
        let c = config.c;
        let mut alphas = Array1::<f64>::zeros(n);
        // grad_i = (Qα)_i - 1 with Q_ij = y_i y_j K_ij
        let mut grad = Array1::<f64>::from_elem(n, -1.0);
        let mut order: Vec<usize> = (0..n).collect();
        let max_epochs = config.max_iter.unwrap_or(DEFAULT_MAX_EPOCHS);

        for _epoch in 0..max_epochs {
            order.shuffle(rng);
            let mut max_violation: f64 = 0.0;

            for &i in &order {
                let g = grad[i];
                let projected = if alphas[i] <= 0.0 {
                    g.min(0.0)
                } else if alphas[i] >= c {
                    g.max(0.0)
                } else {
                    g
                };
                max_violation = max_violation.max(projected.abs());
                if projected.abs() < 1e-12 {
                    continue;
                }

                let q_ii = k[[i, i]];
                if q_ii <= 0.0 {
                    continue;
                }
                let old = alphas[i];
                let new = (old - g / q_ii).clamp(0.0, c);
                let delta = new - old;
                if delta == 0.0 {
                    continue;
                }
                alphas[i] = new;
                for j in 0..n {
                    grad[j] += delta * y[i] * y[j] * k[[i, j]];
                }
            }

            if max_violation < config.tol {
                break;
            }
        }

        let support: Vec<usize> = (0..n).filter(|&i| alphas[i] > 1e-8).collect();
        let mut support_vectors = Array2::zeros((support.len(), x.ncols()));
        let mut dual_coef = Array1::zeros(support.len());
        for (row, &idx) in support.iter().enumerate() {
            support_vectors.row_mut(row).assign(&x.row(idx));
            dual_coef[row] = alphas[idx] * y[idx];
        }

        Self {
            support_vectors,
            dual_coef,
        }
    }

    fn score(&self, kernel: &FittedKernel, sample: &ArrayView1<f64>) -> f64 {
        kernel.expand(sample, &self.support_vectors, &self.dual_coef)
    }
}

/// Support Vector Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMClassifier {
    config: SVMConfig,
    kernel: Option<FittedKernel>,
    /// Class indices seen during fit, ascending
    classes: Vec<usize>,
    /// One machine for binary problems, one per class otherwise
    machines: Vec<BinarySVM>,
    n_features: usize,
    is_fitted: bool,
}

impl SVMClassifier {
    /// Create a new SVM classifier
    pub fn new(config: SVMConfig) -> Self {
        Self {
            config,
            kernel: None,
            classes: Vec::new(),
            machines: Vec::new(),
            n_features: 0,
            is_fitted: false,
        }
    }

    /// Fit the classifier (supports binary and multi-class via One-vs-Rest)
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_xy(x, y)?;
        check_kernel_size(x.nrows())?;

        let mut classes: Vec<usize> = y.iter().map(|&v| v as usize).collect();
        classes.sort_unstable();
        classes.dedup();
        if classes.len() < 2 {
            return Err(TabfitError::TrainingError(format!(
                "The number of classes has to be greater than one; got {} class",
                classes.len()
            )));
        }

        let kernel = FittedKernel {
            kernel: self.config.kernel,
            gamma: self.config.gamma.resolve(x),
        };
        let k = kernel.matrix(x);
        let mut rng = make_rng(self.config.random_state);

        // Binary problems train a single machine for the larger class index
        let positives: &[usize] = if classes.len() == 2 { &classes[1..] } else { &classes };
        let machines = positives
            .iter()
            .map(|&cls| {
                let y_binary = y.mapv(|v| if v as usize == cls { 1.0 } else { -1.0 });
                BinarySVM::train(x, &k, &y_binary, &self.config, &mut rng)
            })
            .collect();

        self.kernel = Some(kernel);
        self.classes = classes;
        self.machines = machines;
        self.n_features = x.ncols();
        self.is_fitted = true;
        Ok(self)
    }

    /// Per-machine decision scores (n_samples × n_machines)
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let kernel = match (&self.kernel, self.is_fitted) {
            (Some(k), true) => k,
            _ => return Err(TabfitError::ModelNotFitted),
        };
        if x.ncols() != self.n_features {
            return Err(TabfitError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let rows: Vec<Vec<f64>> = x
            .rows()
            .into_iter()
            .collect::<Vec<_>>()
            .par_iter()
            .map(|row| self.machines.iter().map(|m| m.score(kernel, row)).collect())
            .collect();

        let mut scores = Array2::zeros((x.nrows(), self.machines.len()));
        for (i, row) in rows.into_iter().enumerate() {
            for (j, v) in row.into_iter().enumerate() {
                scores[[i, j]] = v;
            }
        }
        Ok(scores)
    }

    /// Predict class indices
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let scores = self.decision_function(x)?;
        Ok(scores
            .rows()
            .into_iter()
            .map(|row| {
                let class = if self.classes.len() == 2 {
                    if row[0] > 0.0 {
                        self.classes[1]
                    } else {
                        self.classes[0]
                    }
                } else {
                    self.classes[super::linear_models::argmax(row.iter().copied())]
                };
                class as f64
            })
            .collect())
    }

    /// Get number of support vectors across all machines
    pub fn n_support_vectors(&self) -> usize {
        self.machines.iter().map(|m| m.support_vectors.nrows()).sum()
    }
}

impl Classifier for SVMClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        SVMClassifier::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        SVMClassifier::predict(self, x)
    }
}

/// Support Vector Regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMRegressor {
    config: SVMConfig,
    kernel: Option<FittedKernel>,
    support_vectors: Option<Array2<f64>>,
    /// α - α* for each support vector
    dual_coef: Option<Array1<f64>>,
    is_fitted: bool,
}

impl SVMRegressor {
    /// Create a new SVM regressor
    pub fn new(config: SVMConfig) -> Self {
        Self {
            config,
            kernel: None,
            support_vectors: None,
            dual_coef: None,
            is_fitted: false,
        }
    }

    /// Fit by dual coordinate descent on the epsilon-insensitive loss
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_xy(x, y)?;
        let n = x.nrows();
        check_kernel_size(n)?;

        let kernel = FittedKernel {
            kernel: self.config.kernel,
            gamma: self.config.gamma.resolve(x),
        };
        let k = kernel.matrix(x);
        let c = self.config.c;
        let eps = self.config.epsilon;
        let mut rng = make_rng(self.config.random_state);

        let mut beta = Array1::<f64>::zeros(n);
        // Current fitted values (Kβ)
        let mut fitted = Array1::<f64>::zeros(n);
        let mut order: Vec<usize> = (0..n).collect();
        let max_epochs = self.config.max_iter.unwrap_or(DEFAULT_MAX_EPOCHS);

        for _epoch in 0..max_epochs {
            order.shuffle(&mut rng);
            let mut max_step: f64 = 0.0;

            for &i in &order {
                let q_ii = k[[i, i]];
                if q_ii <= 0.0 {
                    continue;
                }
                let grad = fitted[i] - y[i];
                // Soft-threshold the unconstrained minimizer, then clip to the box
                let z = q_ii * beta[i] - grad;
                let shrunk = z.signum() * (z.abs() - eps).max(0.0);
                let new = (shrunk / q_ii).clamp(-c, c);
                let delta = new - beta[i];
                if delta == 0.0 {
                    continue;
                }
                beta[i] = new;
                max_step = max_step.max(delta.abs() * q_ii);
                for j in 0..n {
                    fitted[j] += delta * k[[i, j]];
                }
            }

            if max_step < self.config.tol {
                break;
            }
        }

        let support: Vec<usize> = (0..n).filter(|&i| beta[i].abs() > 1e-8).collect();
        let mut support_vectors = Array2::zeros((support.len(), x.ncols()));
        let mut dual_coef = Array1::zeros(support.len());
        for (row, &idx) in support.iter().enumerate() {
            support_vectors.row_mut(row).assign(&x.row(idx));
            dual_coef[row] = beta[idx];
        }

        self.kernel = Some(kernel);
        self.support_vectors = Some(support_vectors);
        self.dual_coef = Some(dual_coef);
        self.is_fitted = true;
        Ok(self)
    }

    /// Predict target values
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (kernel, sv, coef) = match (&self.kernel, &self.support_vectors, &self.dual_coef) {
            (Some(k), Some(sv), Some(c)) if self.is_fitted => (k, sv, c),
            _ => return Err(TabfitError::ModelNotFitted),
        };
        if x.ncols() != sv.ncols() {
            return Err(TabfitError::ShapeError {
                expected: format!("{} features", sv.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let rows: Vec<ArrayView1<f64>> = x.rows().into_iter().collect();
        let predictions: Vec<f64> = rows.par_iter().map(|row| kernel.expand(row, sv, coef)).collect();
        Ok(Array1::from_vec(predictions))
    }

    /// Get number of support vectors
    pub fn n_support_vectors(&self) -> usize {
        self.support_vectors.as_ref().map_or(0, |sv| sv.nrows())
    }
}

impl Regressor for SVMRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        SVMRegressor::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        SVMRegressor::predict(self, x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_linear_separable_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec(
            (10, 2),
            vec![
                1.0, 1.0, 1.5, 1.2, 2.0, 2.0, 1.2, 1.8, 0.8, 1.5, //
                5.0, 5.0, 5.5, 5.2, 6.0, 6.0, 5.2, 5.8, 4.8, 5.5,
            ],
        )
        .unwrap();
        let y = Array1::from_vec(vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
        (x, y)
    }

    #[test]
    fn test_svm_classifier_linear() {
        let (x, y) = create_linear_separable_data();
        let config = SVMConfig {
            kernel: KernelType::Linear,
            ..Default::default()
        };

        let mut svm = SVMClassifier::new(config);
        svm.fit(&x, &y).unwrap();
        assert_eq!(svm.predict(&x).unwrap(), y);
        assert!(svm.n_support_vectors() > 0);
    }

    #[test]
    fn test_svm_classifier_rbf() {
        let (x, y) = create_linear_separable_data();
        let mut svm = SVMClassifier::new(SVMConfig::default());
        svm.fit(&x, &y).unwrap();
        assert_eq!(svm.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_svm_classifier_multiclass() {
        let x = Array2::from_shape_vec(
            (15, 2),
            vec![
                1.0, 1.0, 1.5, 1.2, 2.0, 2.0, 1.2, 1.8, 0.8, 1.5, //
                5.0, 5.0, 5.5, 5.2, 6.0, 6.0, 5.2, 5.8, 4.8, 5.5, //
                1.0, 5.0, 1.5, 5.2, 2.0, 6.0, 1.2, 5.8, 0.8, 5.5,
            ],
        )
        .unwrap();
        let y = Array1::from_vec(vec![
            0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0, 2.0,
        ]);

        let config = SVMConfig {
            c: 10.0,
            gamma: Gamma::Value(0.5),
            ..Default::default()
        };
        let mut svm = SVMClassifier::new(config);
        svm.fit(&x, &y).unwrap();
        assert_eq!(svm.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_single_class_rejected() {
        let x = Array2::from_shape_vec((3, 1), vec![1.0, 2.0, 3.0]).unwrap();
        let y = Array1::from_vec(vec![1.0, 1.0, 1.0]);
        let mut svm = SVMClassifier::new(SVMConfig::default());
        assert!(svm.fit(&x, &y).is_err());
    }

    #[test]
    fn test_svm_regressor() {
        let x = Array2::from_shape_vec((10, 1), (1..=10).map(|v| v as f64).collect()).unwrap();
        let y: Array1<f64> = (1..=10).map(|v| 2.0 * v as f64).collect();

        let config = SVMConfig {
            c: 100.0,
            kernel: KernelType::Linear,
            epsilon: 0.1,
            ..Default::default()
        };
        let mut svr = SVMRegressor::new(config);
        svr.fit(&x, &y).unwrap();

        let predictions = svr.predict(&x).unwrap();
        for (pred, actual) in predictions.iter().zip(y.iter()) {
            assert!((pred - actual).abs() < 0.5, "pred={}, actual={}", pred, actual);
        }
    }

    #[test]
    fn test_gamma_resolution() {
        let x = Array2::from_shape_vec((2, 2), vec![0.0, 0.0, 2.0, 2.0]).unwrap();
        assert_eq!(Gamma::Auto.resolve(&x), 0.5);
        // var over all entries = 1.0
        assert_eq!(Gamma::Scale.resolve(&x), 0.5);
        assert_eq!(Gamma::Value(3.0).resolve(&x), 3.0);
    }
}
