//! Regression metrics.

use ndarray::Array1;
use serde::Serialize;

/// Error metrics for one set of predictions
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r2_score: f64,
}

impl RegressionMetrics {
    /// Compute regression metrics
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let n = y_true.len() as f64;
        if n == 0.0 {
            return Self {
                mse: 0.0,
                rmse: 0.0,
                mae: 0.0,
                r2_score: 0.0,
            };
        }

        let errors: Vec<f64> = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| t - p)
            .collect();

        let ss_res: f64 = errors.iter().map(|e| e * e).sum();
        let mse = ss_res / n;
        let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

        Self {
            mse,
            rmse: mse.sqrt(),
            mae,
            r2_score: r2_score(y_true, ss_res),
        }
    }
}

/// R² = 1 - SS_res / SS_tot, or 0.0 when undefined
fn r2_score(y_true: &Array1<f64>, ss_res: f64) -> f64 {
    // A single sample has no variance to explain
    if y_true.len() < 2 {
        return 0.0;
    }
    let mean = y_true.mean().unwrap_or(0.0);
    let ss_tot: f64 = y_true.iter().map(|y| (y - mean).powi(2)).sum();
    let r2 = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    };
    if r2.is_finite() {
        r2
    } else {
        0.0
    }
}
