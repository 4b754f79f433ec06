//! Cluster quality metrics.

use crate::training::clustering::NOISE;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};

fn euclidean(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Number of rows per label, noise included
pub fn cluster_counts(labels: &Array1<i64>) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for &label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

/// Distinct labels other than noise
pub fn n_distinct_clusters(labels: &Array1<i64>) -> usize {
    cluster_counts(labels).keys().filter(|&&l| l != NOISE).count()
}

/// Mean silhouette coefficient over non-noise rows.
///
/// `None` when fewer than two clusters remain after dropping noise, or when
/// every remaining row is its own cluster.
pub fn silhouette_score(x: &Array2<f64>, labels: &Array1<i64>) -> Option<f64> {
    let keep: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] != NOISE).collect();
    let n = keep.len();

    let mut index: HashMap<i64, usize> = HashMap::new();
    for &i in &keep {
        let next = index.len();
        index.entry(labels[i]).or_insert(next);
    }
    let k = index.len();
    if k < 2 || k > n.saturating_sub(1) {
        return None;
    }

    let x = x.select(Axis(0), &keep);
    let cluster: Vec<usize> = keep.iter().map(|&i| index[&labels[i]]).collect();
    let mut sizes = vec![0usize; k];
    for &c in &cluster {
        sizes[c] += 1;
    }

    let total: f64 = (0..n)
        .into_par_iter()
        .map(|i| {
            let own = cluster[i];
            if sizes[own] < 2 {
                return 0.0;
            }
            let mut sums = vec![0.0; k];
            let row = x.row(i);
            for j in 0..n {
                if j != i {
                    sums[cluster[j]] += euclidean(&row, &x.row(j));
                }
            }
            let a = sums[own] / (sizes[own] - 1) as f64;
            let b = (0..k)
                .filter(|&c| c != own)
                .map(|c| sums[c] / sizes[c] as f64)
                .fold(f64::INFINITY, f64::min);
            let denom = a.max(b);
            if denom > 0.0 {
                (b - a) / denom
            } else {
                0.0
            }
        })
        .sum();

    Some(total / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_well_separated_clusters() {
        let x = array![[0.0, 0.0], [0.1, 0.1], [5.0, 5.0], [5.1, 5.1]];
        let score = silhouette_score(&x, &array![0, 0, 1, 1]).unwrap();
        assert!(score > 0.9, "score = {}", score);
    }

    #[test]
    fn test_single_cluster_is_none() {
        let x = array![[0.0], [1.0], [2.0]];
        assert_eq!(silhouette_score(&x, &array![0, 0, 0]), None);
    }

    #[test]
    fn test_all_singletons_is_none() {
        let x = array![[0.0], [1.0], [2.0]];
        assert_eq!(silhouette_score(&x, &array![0, 1, 2]), None);
    }

    #[test]
    fn test_noise_is_excluded() {
        let x = array![[0.0], [0.1], [5.0], [5.1], [100.0]];
        let with_noise = silhouette_score(&x, &array![0, 0, 1, 1, -1]).unwrap();
        let without = silhouette_score(&x.slice(ndarray::s![..4, ..]).to_owned(), &array![0, 0, 1, 1])
            .unwrap();
        assert!((with_noise - without).abs() < 1e-12);
        assert_eq!(silhouette_score(&x, &array![0, 0, 0, 0, -1]), None);
    }

    #[test]
    fn test_known_value() {
        // Outer points: a = 1, b = 5.5; inner points: a = 1, b = 4.5
        let x = array![[0.0], [1.0], [5.0], [6.0]];
        let expected = (2.0 * (4.5 / 5.5) + 2.0 * (3.5 / 4.5)) / 4.0;
        let score = silhouette_score(&x, &array![0, 0, 1, 1]).unwrap();
        assert!((score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_counts() {
        let labels = array![1, 0, 1, -1, 1];
        let counts = cluster_counts(&labels);
        assert_eq!(counts.get(&1), Some(&3));
        assert_eq!(counts.get(&-1), Some(&1));
        assert_eq!(counts.values().sum::<usize>(), 5);
        assert_eq!(n_distinct_clusters(&labels), 2);
    }
}
