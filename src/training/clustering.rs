//! Clustering algorithms: KMeans, DBSCAN and agglomerative clustering
//!
//! These are unsupervised models. They take X only and assign an integer
//! label to every row; DBSCAN marks noise with `-1`.

use super::models::Clusterer;
use crate::error::{Result, TabfitError};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Label assigned to DBSCAN noise points
pub const NOISE: i64 = -1;

/// Pairwise-distance clustering refuses inputs larger than this
const MAX_LINKAGE_SAMPLES: usize = 5_000;

fn squared_euclidean(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

fn check_samples(x: &Array2<f64>) -> Result<()> {
    if x.nrows() == 0 {
        return Err(TabfitError::TrainingError(
            "cannot cluster an empty dataset".to_string(),
        ));
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
//  K-Means Clustering
// ═══════════════════════════════════════════════════════════════════════════

/// K-Means clustering with k-means++ initialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeans {
    pub n_clusters: usize,
    pub max_iter: usize,
    pub tol: f64,
    /// Number of k-means++ restarts; the run with the lowest inertia wins
    pub n_init: usize,
    pub random_state: Option<u64>,
    /// Fitted cluster centroids (n_clusters × n_features)
    centroids: Option<Array2<f64>>,
    /// Cluster labels assigned during fit
    pub labels: Option<Array1<i64>>,
    /// Sum of squared distances to nearest centroid (inertia)
    pub inertia: Option<f64>,
    pub n_iter: usize,
    pub is_fitted: bool,
}

impl Default for KMeans {
    fn default() -> Self {
        Self::new(8)
    }
}

/// Outcome of a single Lloyd run
struct LloydRun {
    centroids: Array2<f64>,
    labels: Array1<i64>,
    inertia: f64,
    n_iter: usize,
}

impl KMeans {
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            max_iter: 300,
            tol: 1e-4,
            n_init: 1,
            random_state: Some(42),
            centroids: None,
            labels: None,
            inertia: None,
            n_iter: 0,
            is_fitted: false,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    /// Set random state; `None` draws a fresh seed on every fit
    pub fn with_random_state(mut self, seed: Option<u64>) -> Self {
        self.random_state = seed;
        self
    }

    /// K-means++ initialization: pick centroids spread apart
    fn kmeans_pp_init(x: &Array2<f64>, k: usize, rng: &mut ChaCha8Rng) -> Array2<f64> {
        let n_samples = x.nrows();
        let mut centroids = Array2::zeros((k, x.ncols()));

        // Pick first centroid uniformly at random
        let first = rng.gen_range(0..n_samples);
        centroids.row_mut(0).assign(&x.row(first));

        let mut closest: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| squared_euclidean(&row, &centroids.row(0)))
            .collect();

        for c in 1..k {
            // Weighted random selection proportional to D²
            let total: f64 = closest.iter().sum();
            let chosen = if total <= 0.0 {
                rng.gen_range(0..n_samples)
            } else {
                let r = rng.gen::<f64>() * total;
                let mut cumulative = 0.0;
                let mut chosen = n_samples - 1;
                for (i, &d) in closest.iter().enumerate() {
                    cumulative += d;
                    if cumulative >= r {
                        chosen = i;
                        break;
                    }
                }
                chosen
            };
            centroids.row_mut(c).assign(&x.row(chosen));

            for (i, row) in x.rows().into_iter().enumerate() {
                let d = squared_euclidean(&row, &centroids.row(c));
                if d < closest[i] {
                    closest[i] = d;
                }
            }
        }

        centroids
    }

    /// Nearest centroid for every row, with its squared distance
    fn assign(x: &Array2<f64>, centroids: &Array2<f64>) -> Vec<(i64, f64)> {
        (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let row = x.row(i);
                let mut best_c = 0;
                let mut best_dist = f64::INFINITY;
                for (c, centroid) in centroids.rows().into_iter().enumerate() {
                    let d = squared_euclidean(&row, &centroid);
                    if d < best_dist {
                        best_dist = d;
                        best_c = c;
                    }
                }
                (best_c as i64, best_dist)
            })
            .collect()
    }

    fn lloyd(&self, x: &Array2<f64>, tol: f64, rng: &mut ChaCha8Rng) -> LloydRun {
        let n_samples = x.nrows();
        let k = self.n_clusters;
        let mut centroids = Self::kmeans_pp_init(x, k, rng);
        let mut labels = vec![-1i64; n_samples];
        let mut n_iter = 0;

        for iter in 0..self.max_iter {
            n_iter = iter + 1;

            // Assignment step: assign each point to nearest centroid
            let assignment = Self::assign(x, &centroids);
            let changed = assignment
                .iter()
                .zip(labels.iter())
                .filter(|((new, _), old)| new != *old)
                .count();
            labels = assignment.into_iter().map(|(c, _)| c).collect();

            // Update step: recompute centroids
            let mut new_centroids = Array2::<f64>::zeros(centroids.dim());
            let mut counts = vec![0usize; k];
            for (row, &c) in x.rows().into_iter().zip(labels.iter()) {
                let c = c as usize;
                counts[c] += 1;
                new_centroids.row_mut(c).scaled_add(1.0, &row);
            }
            for (c, &count) in counts.iter().enumerate() {
                if count > 0 {
                    new_centroids
                        .row_mut(c)
                        .mapv_inplace(|v| v / count as f64);
                } else {
                    // Empty cluster, reseed from a random sample
                    let idx = rng.gen_range(0..n_samples);
                    new_centroids.row_mut(c).assign(&x.row(idx));
                }
            }

            let shift: f64 = centroids
                .iter()
                .zip(new_centroids.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum();
            centroids = new_centroids;

            if changed == 0 || shift <= tol {
                break;
            }
        }

        // Final labels agree with the final centroids
        let assignment = Self::assign(x, &centroids);
        let inertia = assignment.iter().map(|(_, d)| d).sum();
        let labels = assignment.into_iter().map(|(c, _)| c).collect();

        LloydRun {
            centroids,
            labels,
            inertia,
            n_iter,
        }
    }

    /// Fit the model (unsupervised, no y needed)
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        check_samples(x)?;
        let n_samples = x.nrows();
        if self.n_clusters == 0 {
            return Err(TabfitError::invalid_param(
                "n_clusters",
                0,
                "must be at least 1",
            ));
        }
        if n_samples < self.n_clusters {
            return Err(TabfitError::TrainingError(format!(
                "n_samples={} should be >= n_clusters={}",
                n_samples, self.n_clusters
            )));
        }
        if self.n_init == 0 {
            return Err(TabfitError::invalid_param("n_init", 0, "must be at least 1"));
        }

        // Tolerance is relative to the mean feature variance
        let mean_var = x
            .var_axis(Axis(0), 0.0)
            .mean()
            .unwrap_or(0.0);
        let tol = self.tol * mean_var;

        let mut rng = match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let mut best: Option<LloydRun> = None;
        for _ in 0..self.n_init {
            let mut run_rng = ChaCha8Rng::seed_from_u64(rng.next_u64());
            let run = self.lloyd(x, tol, &mut run_rng);
            if best.as_ref().map_or(true, |b| run.inertia < b.inertia) {
                best = Some(run);
            }
        }
        let best = best.ok_or_else(|| {
            TabfitError::TrainingError("k-means produced no run".to_string())
        })?;

        self.centroids = Some(best.centroids);
        self.labels = Some(best.labels);
        self.inertia = Some(best.inertia);
        self.n_iter = best.n_iter;
        self.is_fitted = true;
        Ok(self)
    }

    /// Predict cluster labels for new data
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        let centroids = self.centroids.as_ref().ok_or(TabfitError::ModelNotFitted)?;
        if x.ncols() != centroids.ncols() {
            return Err(TabfitError::ShapeError {
                expected: format!("{} features", centroids.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(Self::assign(x, centroids).into_iter().map(|(c, _)| c).collect())
    }

    /// Get cluster centroids
    pub fn centroids(&self) -> Option<&Array2<f64>> {
        self.centroids.as_ref()
    }
}

impl Clusterer for KMeans {
    fn fit_predict(&mut self, x: &Array2<f64>) -> Result<Array1<i64>> {
        self.fit(x)?;
        self.labels.clone().ok_or(TabfitError::ModelNotFitted)
    }

    fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    fn centers(&self) -> Option<Array2<f64>> {
        self.centroids.clone()
    }

    fn inertia(&self) -> Option<f64> {
        self.inertia
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  DBSCAN Clustering
// ═══════════════════════════════════════════════════════════════════════════

/// Neighborhood metric for DBSCAN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbscanMetric {
    #[default]
    Euclidean,
    Manhattan,
}

impl DbscanMetric {
    fn distance(self, a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
        match self {
            DbscanMetric::Euclidean => squared_euclidean(a, b).sqrt(),
            DbscanMetric::Manhattan => a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum(),
        }
    }
}

/// DBSCAN (Density-Based Spatial Clustering of Applications with Noise)
///
/// Points are classified as core, border, or noise:
/// - Core: has ≥ min_samples neighbors within eps radius (itself included)
/// - Border: within eps of a core point but not core itself
/// - Noise: neither core nor border (label = -1)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DBSCAN {
    /// Maximum distance between neighbors
    pub eps: f64,
    /// Minimum points to form a dense region
    pub min_samples: usize,
    pub metric: DbscanMetric,
    /// Assigned cluster labels (-1 = noise)
    pub labels: Option<Array1<i64>>,
    /// Number of clusters found (excluding noise)
    pub n_clusters_found: usize,
    /// Number of noise points
    pub n_noise: usize,
    pub is_fitted: bool,
}

impl Default for DBSCAN {
    fn default() -> Self {
        Self::new(0.5, 5)
    }
}

impl DBSCAN {
    pub fn new(eps: f64, min_samples: usize) -> Self {
        Self {
            eps,
            min_samples,
            metric: DbscanMetric::Euclidean,
            labels: None,
            n_clusters_found: 0,
            n_noise: 0,
            is_fitted: false,
        }
    }

    pub fn with_metric(mut self, metric: DbscanMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Find all neighbors within eps distance
    fn region_query(&self, x: &Array2<f64>, point_idx: usize) -> Vec<usize> {
        let row = x.row(point_idx);
        (0..x.nrows())
            .filter(|&i| self.metric.distance(&row, &x.row(i)) <= self.eps)
            .collect()
    }

    /// Fit the model (unsupervised)
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        check_samples(x)?;
        if self.eps.is_nan() || self.eps <= 0.0 {
            return Err(TabfitError::invalid_param("eps", self.eps, "must be positive"));
        }
        if self.min_samples == 0 {
            return Err(TabfitError::invalid_param(
                "min_samples",
                0,
                "must be at least 1",
            ));
        }
        let n_samples = x.nrows();

        // Pre-compute neighbor lists for all points (parallelized)
        let neighbors: Vec<Vec<usize>> = (0..n_samples)
            .into_par_iter()
            .map(|i| self.region_query(x, i))
            .collect();

        // Identify core points
        let is_core: Vec<bool> = neighbors
            .iter()
            .map(|n| n.len() >= self.min_samples)
            .collect();

        let mut labels = vec![NOISE; n_samples];
        let mut cluster_id: i64 = 0;

        for i in 0..n_samples {
            if labels[i] != NOISE || !is_core[i] {
                continue;
            }

            // Expand cluster from core point i
            labels[i] = cluster_id;
            let mut queue: Vec<usize> = neighbors[i].clone();
            let mut head = 0;

            while head < queue.len() {
                let q = queue[head];
                head += 1;

                if labels[q] == NOISE {
                    labels[q] = cluster_id;
                }
                if !is_core[q] {
                    continue;
                }
                // Expand from this core point
                for &neighbor in &neighbors[q] {
                    if labels[neighbor] == NOISE {
                        labels[neighbor] = cluster_id;
                        queue.push(neighbor);
                    }
                }
            }

            cluster_id += 1;
        }

        self.n_noise = labels.iter().filter(|&&l| l == NOISE).count();
        self.labels = Some(Array1::from_vec(labels));
        self.n_clusters_found = cluster_id as usize;
        self.is_fitted = true;
        Ok(self)
    }
}

impl Clusterer for DBSCAN {
    fn fit_predict(&mut self, x: &Array2<f64>) -> Result<Array1<i64>> {
        self.fit(x)?;
        self.labels.clone().ok_or(TabfitError::ModelNotFitted)
    }

    fn n_clusters(&self) -> usize {
        self.n_clusters_found
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Agglomerative Clustering
// ═══════════════════════════════════════════════════════════════════════════

/// Inter-cluster distance used when merging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    /// Minimize the increase in within-cluster variance
    #[default]
    Ward,
    /// Maximum pairwise distance
    Complete,
    /// Mean pairwise distance
    Average,
    /// Minimum pairwise distance
    Single,
}

impl Linkage {
    /// Lance-Williams update: distance from `k` to the union of `i` and `j`
    fn update(self, d_ki: f64, d_kj: f64, d_ij: f64, n_i: f64, n_j: f64, n_k: f64) -> f64 {
        match self {
            Linkage::Single => d_ki.min(d_kj),
            Linkage::Complete => d_ki.max(d_kj),
            Linkage::Average => (n_i * d_ki + n_j * d_kj) / (n_i + n_j),
            Linkage::Ward => {
                let total = n_i + n_j + n_k;
                (((n_i + n_k) * d_ki * d_ki + (n_j + n_k) * d_kj * d_kj - n_k * d_ij * d_ij)
                    / total)
                    .max(0.0)
                    .sqrt()
            }
        }
    }
}

/// Bottom-up hierarchical clustering over Euclidean distances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgglomerativeClustering {
    /// Stop when this many clusters remain
    pub n_clusters: Option<usize>,
    /// Stop when the closest pair is at least this far apart
    pub distance_threshold: Option<f64>,
    pub linkage: Linkage,
    pub labels: Option<Array1<i64>>,
    pub n_clusters_found: usize,
    pub is_fitted: bool,
}

impl Default for AgglomerativeClustering {
    fn default() -> Self {
        Self::new(2)
    }
}

impl AgglomerativeClustering {
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters: Some(n_clusters),
            distance_threshold: None,
            linkage: Linkage::Ward,
            labels: None,
            n_clusters_found: 0,
            is_fitted: false,
        }
    }

    /// Cut the tree at a merge distance instead of a cluster count
    pub fn with_distance_threshold(threshold: f64) -> Self {
        Self {
            n_clusters: None,
            distance_threshold: Some(threshold),
            ..Self::new(2)
        }
    }

    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    fn validate(&self, n_samples: usize) -> Result<()> {
        match (self.n_clusters, self.distance_threshold) {
            (Some(_), Some(_)) | (None, None) => Err(TabfitError::invalid_param(
                "n_clusters",
                format!("{:?}", self.n_clusters),
                "exactly one of n_clusters and distance_threshold has to be set",
            )),
            (Some(k), None) if k == 0 || k > n_samples => Err(TabfitError::invalid_param(
                "n_clusters",
                k,
                format!("must be between 1 and n_samples ({})", n_samples),
            )),
            (None, Some(t)) if t.is_nan() || t < 0.0 => Err(TabfitError::invalid_param(
                "distance_threshold",
                t,
                "must be non-negative",
            )),
            _ => Ok(()),
        }
    }

    /// Fit the model (unsupervised)
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        check_samples(x)?;
        let n = x.nrows();
        self.validate(n)?;
        if n > MAX_LINKAGE_SAMPLES {
            return Err(TabfitError::TrainingError(format!(
                "Dataset has {} samples, exceeding the maximum {} for agglomerative clustering",
                n, MAX_LINKAGE_SAMPLES
            )));
        }

        // Condensed working copy of the full distance matrix
        let rows: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| {
                (0..n)
                    .map(|j| squared_euclidean(&x.row(i), &x.row(j)).sqrt())
                    .collect()
            })
            .collect();
        let mut dist = Array2::<f64>::zeros((n, n));
        for (i, row) in rows.into_iter().enumerate() {
            for (j, d) in row.into_iter().enumerate() {
                dist[[i, j]] = d;
            }
        }

        let mut active = vec![true; n];
        let mut sizes = vec![1usize; n];
        // Cluster slot owning each sample
        let mut owner: Vec<usize> = (0..n).collect();
        let mut remaining = n;

        while remaining > 1 {
            if let Some(k) = self.n_clusters {
                if remaining <= k {
                    break;
                }
            }

            // Closest active pair; ties go to the lowest (i, j)
            let mut best: Option<(usize, usize, f64)> = None;
            for i in (0..n).filter(|&i| active[i]) {
                for j in ((i + 1)..n).filter(|&j| active[j]) {
                    let d = dist[[i, j]];
                    if best.map_or(true, |(_, _, bd)| d < bd) {
                        best = Some((i, j, d));
                    }
                }
            }
            let Some((i, j, d_ij)) = best else {
                break;
            };
            if let Some(threshold) = self.distance_threshold {
                if d_ij >= threshold {
                    break;
                }
            }

            // Merge j into i
            let (n_i, n_j) = (sizes[i] as f64, sizes[j] as f64);
            for k in (0..n).filter(|&k| active[k] && k != i && k != j) {
                let updated = self.linkage.update(
                    dist[[k, i]],
                    dist[[k, j]],
                    d_ij,
                    n_i,
                    n_j,
                    sizes[k] as f64,
                );
                dist[[k, i]] = updated;
                dist[[i, k]] = updated;
            }
            active[j] = false;
            sizes[i] += sizes[j];
            for o in owner.iter_mut().filter(|o| **o == j) {
                *o = i;
            }
            remaining -= 1;
        }

        // Relabel slots by order of first appearance
        let mut relabel: HashMap<usize, i64> = HashMap::new();
        let labels: Array1<i64> = owner
            .iter()
            .map(|slot| {
                let next = relabel.len() as i64;
                *relabel.entry(*slot).or_insert(next)
            })
            .collect();

        self.n_clusters_found = relabel.len();
        self.labels = Some(labels);
        self.is_fitted = true;
        Ok(self)
    }
}

impl Clusterer for AgglomerativeClustering {
    fn fit_predict(&mut self, x: &Array2<f64>) -> Result<Array1<i64>> {
        self.fit(x)?;
        self.labels.clone().ok_or(TabfitError::ModelNotFitted)
    }

    fn n_clusters(&self) -> usize {
        self.n_clusters_found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_blobs() -> Array2<f64> {
        array![
            [1.0, 1.0],
            [1.5, 1.5],
            [1.2, 1.3],
            [8.0, 8.0],
            [8.5, 8.5],
            [8.2, 8.3],
        ]
    }

    #[test]
    fn test_kmeans_basic() {
        let x = two_blobs();
        let mut model = KMeans::new(2);
        model.fit(&x).unwrap();
        assert!(model.is_fitted);
        let labels = model.labels.as_ref().unwrap();
        assert_eq!(labels.len(), 6);
        // First 3 should be in same cluster, last 3 in different cluster
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[0], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[3], labels[5]);
        assert_ne!(labels[0], labels[3]);
        assert_eq!(model.centroids().unwrap().dim(), (2, 2));
    }

    #[test]
    fn test_kmeans_predict() {
        let x = array![[0.0, 0.0], [0.5, 0.5], [10.0, 10.0], [10.5, 10.5]];
        let mut model = KMeans::new(2);
        model.fit(&x).unwrap();

        let labels = model.predict(&array![[0.1, 0.1], [10.1, 10.1]]).unwrap();
        assert_ne!(labels[0], labels[1]);
    }

    #[test]
    fn test_kmeans_inertia() {
        let x = array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [10.0, 10.0]];
        let mut model = KMeans::new(2);
        model.fit(&x).unwrap();
        // {three corner points} and {far point}: 2/3 around the mean of the corners
        assert!((model.inertia.unwrap() - 4.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_kmeans_single_cluster() {
        let x = two_blobs();
        let mut model = KMeans::new(1);
        let labels = model.fit_predict(&x).unwrap();
        assert!(labels.iter().all(|&l| l == 0));
        assert_eq!(Clusterer::n_clusters(&model), 1);
    }

    #[test]
    fn test_kmeans_seeded_is_deterministic() {
        let x = two_blobs();
        let run = || {
            let mut model = KMeans::new(3).with_n_init(4).with_random_state(Some(7));
            model.fit_predict(&x).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_kmeans_too_many_clusters() {
        let x = array![[0.0], [1.0]];
        assert!(KMeans::new(3).fit(&x).is_err());
    }

    #[test]
    fn test_dbscan_basic() {
        let x = array![
            [1.0, 1.0],
            [1.1, 1.1],
            [1.2, 1.0],
            [1.0, 1.2],
            [8.0, 8.0],
            [8.1, 8.1],
            [8.2, 8.0],
            [8.0, 8.2],
            [50.0, 50.0], // noise point
        ];
        let mut model = DBSCAN::new(0.5, 3);
        let labels = model.fit_predict(&x).unwrap();
        assert_eq!(model.n_clusters_found, 2);
        assert_eq!(model.n_noise, 1);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[4], labels[5]);
        assert_ne!(labels[0], labels[4]);
        assert_eq!(labels[8], NOISE);
    }

    #[test]
    fn test_dbscan_manhattan_is_stricter() {
        // Diagonal neighbors 0.3 apart per axis: L2 ≈ 0.42, L1 = 0.6
        let x = array![[0.0, 0.0], [0.3, 0.3], [0.6, 0.6]];
        let mut euclid = DBSCAN::new(0.5, 2);
        euclid.fit(&x).unwrap();
        assert_eq!(euclid.n_clusters_found, 1);

        let mut manhattan = DBSCAN::new(0.5, 2).with_metric(DbscanMetric::Manhattan);
        manhattan.fit(&x).unwrap();
        assert_eq!(manhattan.n_clusters_found, 0);
        assert_eq!(manhattan.n_noise, 3);
    }

    #[test]
    fn test_agglomerative_linkages() {
        let x = two_blobs();
        for linkage in [Linkage::Ward, Linkage::Complete, Linkage::Average, Linkage::Single] {
            let mut model = AgglomerativeClustering::new(2).with_linkage(linkage);
            let labels = model.fit_predict(&x).unwrap();
            assert_eq!(labels.to_vec(), vec![0, 0, 0, 1, 1, 1], "{:?}", linkage);
        }
    }

    #[test]
    fn test_agglomerative_distance_threshold() {
        let x = array![[0.0], [0.1], [5.0], [5.1], [20.0]];
        let mut model =
            AgglomerativeClustering::with_distance_threshold(1.0).with_linkage(Linkage::Single);
        let labels = model.fit_predict(&x).unwrap();
        assert_eq!(labels.to_vec(), vec![0, 0, 1, 1, 2]);
        assert_eq!(Clusterer::n_clusters(&model), 3);
    }

    #[test]
    fn test_agglomerative_requires_one_stopping_rule() {
        let x = two_blobs();
        let mut model = AgglomerativeClustering {
            distance_threshold: Some(1.0),
            ..AgglomerativeClustering::new(2)
        };
        assert!(matches!(
            model.fit(&x),
            Err(TabfitError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_ward_update_matches_centroid_distance() {
        // Singletons at 0 and 2 merged; k at 5. Ward distance sqrt(2·n_k·n_ij/(n_k+n_ij))·|c_k - c_ij|
        let d = Linkage::Ward.update(5.0, 3.0, 2.0, 1.0, 1.0, 1.0);
        let expected = (2.0_f64 * 1.0 * 2.0 / 3.0).sqrt() * 4.0;
        assert!((d - expected).abs() < 1e-9);
    }
}
