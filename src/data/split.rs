//! Seeded train/test partitioning

use crate::error::{Result, TabfitError};
use ndarray::{Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Fraction of rows held out for evaluation.
pub const TEST_FRACTION: f64 = 0.2;

/// Seed for the partition shuffle.
pub const SPLIT_SEED: u64 = 42;

/// Row indices of a train/test partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n_samples` with a fixed seed and hold out `ceil(test_fraction * n)` rows.
///
/// Depends only on `n_samples`, `test_fraction` and `seed`.
pub fn train_test_indices(n_samples: usize, test_fraction: f64, seed: u64) -> Result<SplitIndices> {
    if !(0.0..1.0).contains(&test_fraction) || test_fraction == 0.0 {
        return Err(TabfitError::invalid_param(
            "test_fraction",
            test_fraction,
            "must be in (0, 1)",
        ));
    }

    let n_test = (n_samples as f64 * test_fraction).ceil() as usize;
    let n_train = n_samples.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(TabfitError::DataError(format!(
            "With n_samples={}, test_size={} the resulting train set will be empty",
            n_samples, test_fraction
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok(SplitIndices {
        train,
        test: indices,
    })
}

/// Train/test subsets of a feature matrix and its aligned target.
#[derive(Debug, Clone)]
pub struct TrainTestSplit<T> {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Vec<T>,
    pub y_test: Vec<T>,
}

/// 80/20 split with the service's fixed seed.
pub fn train_test_split<T: Clone>(x: &Array2<f64>, y: &[T]) -> Result<TrainTestSplit<T>> {
    if x.nrows() != y.len() {
        return Err(TabfitError::ShapeError {
            expected: format!("{} targets", x.nrows()),
            actual: format!("{} targets", y.len()),
        });
    }
    let idx = train_test_indices(x.nrows(), TEST_FRACTION, SPLIT_SEED)?;

    Ok(TrainTestSplit {
        x_train: x.select(Axis(0), &idx.train),
        x_test: x.select(Axis(0), &idx.test),
        y_train: idx.train.iter().map(|&i| y[i].clone()).collect(),
        y_test: idx.test.iter().map(|&i| y[i].clone()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        let idx = train_test_indices(10, 0.2, 42).unwrap();
        assert_eq!(idx.test.len(), 2);
        assert_eq!(idx.train.len(), 8);

        let idx = train_test_indices(11, 0.2, 42).unwrap();
        assert_eq!(idx.test.len(), 3);
        assert_eq!(idx.train.len(), 8);
    }

    #[test]
    fn test_partition_is_complete_and_disjoint() {
        let idx = train_test_indices(37, 0.2, 42).unwrap();
        let mut all: Vec<usize> = idx.train.iter().chain(idx.test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..37).collect::<Vec<_>>());
    }

    #[test]
    fn test_deterministic() {
        let a = train_test_indices(100, 0.2, 42).unwrap();
        let b = train_test_indices(100, 0.2, 42).unwrap();
        assert_eq!(a, b);
        let c = train_test_indices(100, 0.2, 7).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_too_few_rows() {
        assert!(train_test_indices(1, 0.2, 42).is_err());
        assert!(train_test_indices(0, 0.2, 42).is_err());
    }

    #[test]
    fn test_split_aligns_rows() {
        let x = Array2::from_shape_fn((20, 2), |(r, c)| (r * 10 + c) as f64);
        let y: Vec<usize> = (0..20).collect();
        let split = train_test_split(&x, &y).unwrap();
        for (row, label) in split.x_test.rows().into_iter().zip(split.y_test.iter()) {
            assert_eq!(row[0], (*label * 10) as f64);
        }
        assert_eq!(split.x_train.nrows(), 16);
    }
}
