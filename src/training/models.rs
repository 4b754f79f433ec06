//! Capability traits implemented by every model family

use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::Serialize;

/// Supervised model predicting class indices.
///
/// `y` holds dense class indices `0..n_classes` stored as `f64`; predictions
/// use the same encoding.
pub trait Classifier: Send + Sync {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}

/// Supervised model predicting a continuous value.
pub trait Regressor: Send + Sync {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Fitted parameters worth reporting alongside the metrics.
    fn extras(&self) -> Option<ModelExtras> {
        None
    }
}

/// Unsupervised model assigning a label to every row it is fitted on.
///
/// Noise points are labelled `-1`.
pub trait Clusterer: Send + Sync {
    fn fit_predict(&mut self, x: &Array2<f64>) -> Result<Array1<i64>>;

    /// Number of clusters the fitted model reports.
    fn n_clusters(&self) -> usize;

    /// Cluster centers, when the model has them.
    fn centers(&self) -> Option<Array2<f64>> {
        None
    }

    fn inertia(&self) -> Option<f64> {
        None
    }
}

/// Family-specific fitted parameters attached to a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ModelExtras {
    Linear {
        coefficients: Vec<f64>,
        intercept: f64,
    },
}

/// Check that `x` and `y` agree on the number of samples.
pub(crate) fn check_xy(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(crate::error::TabfitError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(crate::error::TabfitError::TrainingError(
            "cannot fit on an empty dataset".to_string(),
        ));
    }
    Ok(())
}

/// Number of classes implied by dense class indices.
pub(crate) fn n_classes(y: &Array1<f64>) -> usize {
    y.iter().fold(0.0_f64, |m, &v| m.max(v)) as usize + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_check_xy() {
        let x = array![[1.0], [2.0]];
        assert!(check_xy(&x, &array![0.0, 1.0]).is_ok());
        assert!(check_xy(&x, &array![0.0]).is_err());
        assert!(check_xy(&Array2::zeros((0, 2)), &Array1::zeros(0)).is_err());
    }

    #[test]
    fn test_extras_serialize_flat() {
        let extras = ModelExtras::Linear {
            coefficients: vec![1.5, -2.0],
            intercept: 0.25,
        };
        let json = serde_json::to_value(&extras).unwrap();
        assert_eq!(json["coefficients"][1], -2.0);
        assert_eq!(json["intercept"], 0.25);
    }
}
