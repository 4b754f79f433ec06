//! K-Nearest Neighbors implementation
//!
//! KNN classifier and regressor with distance metrics.

use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::linear_models::argmax;
use super::models::{check_xy, n_classes, Classifier, Regressor};
use crate::error::{Result, TabfitError};

/// Distance metric for KNN
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Euclidean distance (L2)
    Euclidean,
    /// Manhattan distance (L1)
    Manhattan,
    /// Chebyshev distance (L∞)
    Chebyshev,
    /// Minkowski distance with parameter p
    Minkowski(f64),
}

impl Default for DistanceMetric {
    fn default() -> Self {
        Self::Minkowski(2.0)
    }
}

impl DistanceMetric {
    /// Compute distance between two points
    pub fn distance(self, a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
        let diffs = a.iter().zip(b.iter()).map(|(ai, bi)| (ai - bi).abs());
        match self {
            DistanceMetric::Euclidean => diffs.map(|d| d * d).sum::<f64>().sqrt(),
            DistanceMetric::Minkowski(p) if p == 2.0 => diffs.map(|d| d * d).sum::<f64>().sqrt(),
            DistanceMetric::Manhattan => diffs.sum(),
            DistanceMetric::Minkowski(p) if p == 1.0 => diffs.sum(),
            DistanceMetric::Chebyshev => diffs.fold(0.0, f64::max),
            DistanceMetric::Minkowski(p) => diffs.map(|d| d.powf(p)).sum::<f64>().powf(1.0 / p),
        }
    }
}

/// Weighting scheme for neighbors
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightScheme {
    /// All neighbors have equal weight
    #[default]
    Uniform,
    /// Closer neighbors have more weight (inverse distance)
    Distance,
}

/// KNN configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNConfig {
    /// Number of neighbors
    pub n_neighbors: usize,
    /// Distance metric
    pub metric: DistanceMetric,
    /// Weighting scheme
    pub weights: WeightScheme,
}

impl Default for KNNConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            metric: DistanceMetric::default(),
            weights: WeightScheme::Uniform,
        }
    }
}

/// Stored training data shared by both estimators
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Memory {
    x: Array2<f64>,
    y: Array1<f64>,
}

impl Memory {
    fn store(config: &KNNConfig, x: &Array2<f64>, y: &Array1<f64>) -> Result<Self> {
        check_xy(x, y)?;
        if config.n_neighbors == 0 {
            return Err(TabfitError::invalid_param(
                "n_neighbors",
                0,
                "must be at least 1",
            ));
        }
        if config.n_neighbors > x.nrows() {
            return Err(TabfitError::invalid_param(
                "n_neighbors",
                config.n_neighbors,
                format!(
                    "expected n_neighbors <= n_samples, but n_samples = {}",
                    x.nrows()
                ),
            ));
        }
        if let DistanceMetric::Minkowski(p) = config.metric {
            if p < 1.0 {
                return Err(TabfitError::invalid_param("p", p, "must be at least 1"));
            }
        }
        Ok(Self {
            x: x.clone(),
            y: y.clone(),
        })
    }

    fn check_features(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.x.ncols() {
            return Err(TabfitError::ShapeError {
                expected: format!("{} features", self.x.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }

    /// Apply `f` to the neighbors of every query row (parallelized over rows)
    fn map_neighbors<F>(&self, x: &Array2<f64>, config: &KNNConfig, f: F) -> Array1<f64>
    where
        F: Fn(&[Neighbor]) -> f64 + Sync,
    {
        let predictions: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let neighbors = find_k_nearest(&x.row(i), &self.x, &self.y, config);
                f(&neighbors)
            })
            .collect();
        Array1::from_vec(predictions)
    }
}

/// K-Nearest Neighbors Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNClassifier {
    config: KNNConfig,
    memory: Option<Memory>,
    n_classes: usize,
}

impl KNNClassifier {
    pub fn new(config: KNNConfig) -> Self {
        Self {
            config,
            memory: None,
            n_classes: 0,
        }
    }

    /// Create with default config and specified k
    pub fn with_k(k: usize) -> Self {
        Self::new(KNNConfig {
            n_neighbors: k,
            ..Default::default()
        })
    }

    /// Fit the classifier (stores training data)
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        self.memory = Some(Memory::store(&self.config, x, y)?);
        self.n_classes = n_classes(y);
        Ok(self)
    }

    /// Predict class indices
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let memory = self.memory.as_ref().ok_or(TabfitError::ModelNotFitted)?;
        memory.check_features(x)?;
        let weights = self.config.weights;
        let n_classes = self.n_classes;
        Ok(memory.map_neighbors(x, &self.config, |neighbors| {
            let votes = class_votes(neighbors, n_classes, weights);
            argmax(votes.into_iter()) as f64
        }))
    }

    /// Predict class probabilities (n_samples × n_classes)
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let memory = self.memory.as_ref().ok_or(TabfitError::ModelNotFitted)?;
        memory.check_features(x)?;
        let mut proba = Array2::zeros((x.nrows(), self.n_classes));
        for (i, row) in x.rows().into_iter().enumerate() {
            let neighbors = find_k_nearest(&row, &memory.x, &memory.y, &self.config);
            let votes = class_votes(&neighbors, self.n_classes, self.config.weights);
            let total: f64 = votes.iter().sum();
            for (j, v) in votes.into_iter().enumerate() {
                proba[[i, j]] = if total > 0.0 { v / total } else { 0.0 };
            }
        }
        Ok(proba)
    }
}

impl Classifier for KNNClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        KNNClassifier::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        KNNClassifier::predict(self, x)
    }
}

/// K-Nearest Neighbors Regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNRegressor {
    config: KNNConfig,
    memory: Option<Memory>,
}

impl KNNRegressor {
    pub fn new(config: KNNConfig) -> Self {
        Self {
            config,
            memory: None,
        }
    }

    /// Create with default config and specified k
    pub fn with_k(k: usize) -> Self {
        Self::new(KNNConfig {
            n_neighbors: k,
            ..Default::default()
        })
    }

    /// Fit the regressor (stores training data)
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        self.memory = Some(Memory::store(&self.config, x, y)?);
        Ok(self)
    }

    /// Predict target values
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let memory = self.memory.as_ref().ok_or(TabfitError::ModelNotFitted)?;
        memory.check_features(x)?;
        let weights = self.config.weights;
        Ok(memory.map_neighbors(x, &self.config, |neighbors| {
            weighted_mean(neighbors, weights)
        }))
    }
}

impl Regressor for KNNRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        KNNRegressor::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        KNNRegressor::predict(self, x)
    }
}

// ============================================================================
// Shared helpers (used by both Classifier and Regressor)
// ============================================================================

/// A training row near the query point
#[derive(Debug, Clone, Copy, PartialEq)]
struct Neighbor {
    dist: f64,
    index: usize,
    target: f64,
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Closer first; equal distances prefer the earlier training row
impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist
            .total_cmp(&other.dist)
            .then(self.index.cmp(&other.index))
    }
}

/// Find k nearest neighbors using a max-heap, O(n log k)
fn find_k_nearest(
    point: &ArrayView1<f64>,
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    config: &KNNConfig,
) -> Vec<Neighbor> {
    let k = config.n_neighbors;
    let mut heap = BinaryHeap::with_capacity(k + 1);

    for (index, row) in x_train.rows().into_iter().enumerate() {
        let candidate = Neighbor {
            dist: config.metric.distance(point, &row),
            index,
            target: y_train[index],
        };
        if heap.len() < k {
            heap.push(candidate);
        } else if let Some(top) = heap.peek() {
            if candidate < *top {
                heap.pop();
                heap.push(candidate);
            }
        }
    }

    heap.into_sorted_vec()
}

/// Neighbor weights; exact matches take all the weight under distance weighting
fn neighbor_weights(neighbors: &[Neighbor], weights: WeightScheme) -> Vec<f64> {
    match weights {
        WeightScheme::Uniform => vec![1.0; neighbors.len()],
        WeightScheme::Distance => {
            if neighbors.iter().any(|n| n.dist == 0.0) {
                neighbors
                    .iter()
                    .map(|n| if n.dist == 0.0 { 1.0 } else { 0.0 })
                    .collect()
            } else {
                neighbors.iter().map(|n| 1.0 / n.dist).collect()
            }
        }
    }
}

fn class_votes(neighbors: &[Neighbor], n_classes: usize, weights: WeightScheme) -> Vec<f64> {
    let mut votes = vec![0.0; n_classes.max(1)];
    for (n, w) in neighbors.iter().zip(neighbor_weights(neighbors, weights)) {
        let class = n.target as usize;
        if class < votes.len() {
            votes[class] += w;
        }
    }
    votes
}

fn weighted_mean(neighbors: &[Neighbor], weights: WeightScheme) -> f64 {
    let w = neighbor_weights(neighbors, weights);
    let total: f64 = w.iter().sum();
    if total <= 0.0 {
        return f64::NAN;
    }
    neighbors
        .iter()
        .zip(w.iter())
        .map(|(n, wi)| n.target * wi)
        .sum::<f64>()
        / total
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn create_classification_data() -> (Array2<f64>, Array1<f64>) {
        // Create linearly separable data
        let x = Array2::from_shape_vec(
            (20, 2),
            vec![
                // Class 0 (low values)
                1.0, 1.0, 1.5, 1.5, 2.0, 2.0, 2.5, 2.5, 1.0, 2.0, //
                1.5, 2.5, 2.0, 1.5, 2.5, 1.0, 1.2, 1.8, 1.8, 1.2, //
                // Class 1 (high values)
                8.0, 8.0, 8.5, 8.5, 9.0, 9.0, 9.5, 9.5, 8.0, 9.0, //
                8.5, 9.5, 9.0, 8.5, 9.5, 8.0, 8.2, 8.8, 8.8, 8.2,
            ],
        )
        .unwrap();

        let y = Array1::from_vec(
            (0..20).map(|i| if i < 10 { 0.0 } else { 1.0 }).collect(),
        );

        (x, y)
    }

    #[test]
    fn test_knn_classifier() {
        let (x, y) = create_classification_data();

        let mut knn = KNNClassifier::with_k(3);
        knn.fit(&x, &y).unwrap();

        assert_eq!(knn.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_knn_regressor() {
        let x = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
        let y = array![0.0, 10.0, 20.0, 30.0, 40.0];

        let mut knn = KNNRegressor::with_k(3);
        knn.fit(&x, &y).unwrap();

        let predictions = knn.predict(&array![[2.0]]).unwrap();
        assert!((predictions[0] - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_distance_metrics() {
        let a = array![0.0, 0.0];
        let b = array![3.0, 4.0];
        let (a, b) = (a.view(), b.view());

        assert!((DistanceMetric::Euclidean.distance(&a, &b) - 5.0).abs() < 1e-12);
        assert!((DistanceMetric::Minkowski(2.0).distance(&a, &b) - 5.0).abs() < 1e-12);
        assert_eq!(DistanceMetric::Manhattan.distance(&a, &b), 7.0);
        assert_eq!(DistanceMetric::Chebyshev.distance(&a, &b), 4.0);
        let d3 = DistanceMetric::Minkowski(3.0).distance(&a, &b);
        assert!((d3 - 91.0_f64.powf(1.0 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn test_distance_weights_exact_match() {
        let x = array![[0.0], [1.0], [2.0]];
        let y = array![5.0, 100.0, 100.0];
        let mut knn = KNNRegressor::new(KNNConfig {
            n_neighbors: 3,
            weights: WeightScheme::Distance,
            ..Default::default()
        });
        knn.fit(&x, &y).unwrap();
        assert_eq!(knn.predict(&array![[0.0]]).unwrap()[0], 5.0);
    }

    #[test]
    fn test_proba_rows_sum_to_one() {
        let (x, y) = create_classification_data();
        let mut knn = KNNClassifier::with_k(5);
        knn.fit(&x, &y).unwrap();
        let proba = knn.predict_proba(&array![[5.0, 5.0]]).unwrap();
        assert!((proba.row(0).sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_too_many_neighbors() {
        let x = array![[0.0], [1.0]];
        let y = array![0.0, 1.0];
        let mut knn = KNNClassifier::with_k(5);
        assert!(matches!(
            knn.fit(&x, &y),
            Err(TabfitError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_unfitted() {
        let knn = KNNRegressor::with_k(1);
        assert!(matches!(
            knn.predict(&array![[0.0]]),
            Err(TabfitError::ModelNotFitted)
        ));
    }
}
