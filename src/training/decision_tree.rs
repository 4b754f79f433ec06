//! Decision tree implementation

use super::models::{check_xy, n_classes, Classifier, Regressor};
use crate::error::{Result, TabfitError};
use ndarray::{Array1, Array2, ArrayView1};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf { value: f64, n_samples: usize },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Criterion {
    /// Gini impurity (classification)
    Gini,
    /// Entropy (classification)
    Entropy,
    /// Mean squared error (regression)
    MSE,
    /// Mean absolute error (regression)
    MAE,
}

impl Criterion {
    pub fn is_classification(self) -> bool {
        matches!(self, Criterion::Gini | Criterion::Entropy)
    }
}

/// Strategy for max features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fraction of n_features
    Fraction(f64),
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

impl MaxFeatures {
    /// Resolve to a feature count, never below one
    pub fn resolve(self, n_features: usize) -> usize {
        let n = n_features as f64;
        match self {
            MaxFeatures::Sqrt => n.sqrt().floor() as usize,
            MaxFeatures::Log2 => n.log2().floor() as usize,
            MaxFeatures::Fraction(f) => (n * f).floor() as usize,
            MaxFeatures::Fixed(k) => k,
            MaxFeatures::All => n_features,
        }
        .clamp(1, n_features.max(1))
    }
}

/// Best split candidate for one feature: (feature, threshold, gain)
type SplitCandidate = (usize, f64, f64);

/// Decision tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features sampled at each split; `None` considers all
    pub max_features: Option<MaxFeatures>,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Seed for feature sampling
    pub random_state: Option<u64>,
    /// Number of features
    n_features: usize,
    /// Features examined per split, resolved at fit time
    n_candidate_features: usize,
    /// Number of classes (classification only)
    n_classes: usize,
    /// Is classification task
    is_classification: bool,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_classifier()
    }
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new_classifier() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
            random_state: None,
            n_features: 0,
            n_candidate_features: 0,
            n_classes: 0,
            is_classification: true,
        }
    }

    /// Create a new regressor tree
    pub fn new_regressor() -> Self {
        Self {
            criterion: Criterion::MSE,
            is_classification: false,
            ..Self::new_classifier()
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set features considered per split
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Result<Self> {
        if criterion.is_classification() != self.is_classification {
            return Err(TabfitError::invalid_param(
                "criterion",
                format!("{:?}", criterion),
                "criterion does not match the tree's task",
            ));
        }
        self.criterion = criterion;
        Ok(self)
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_xy(x, y)?;
        let n_samples = x.nrows();
        let n_features = x.ncols();

        self.n_features = n_features;
        self.n_candidate_features = self
            .max_features
            .map_or(n_features, |m| m.resolve(n_features));
        if self.is_classification {
            self.n_classes = n_classes(y);
        }

        let mut rng = match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(x, y, &indices, 0, &mut rng));

        Ok(self)
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let y_subset: Vec<f64> = indices.iter().map(|&i| y[i]).collect();
        let leaf = |y_subset: &[f64]| TreeNode::Leaf {
            value: self.compute_leaf_value(y_subset),
            n_samples,
        };

        // Check stopping conditions
        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.is_some_and(|d| depth >= d)
            || is_pure(&y_subset);
        if should_stop {
            return leaf(&y_subset);
        }

        let features = self.candidate_features(rng);
        let Some((best_feature, best_threshold, _gain)) =
            self.find_best_split(x, y, indices, &y_subset, &features)
        else {
            return leaf(&y_subset);
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, best_feature]] <= best_threshold);

        if left_indices.len() < self.min_samples_leaf || right_indices.len() < self.min_samples_leaf {
            return leaf(&y_subset);
        }

        let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, rng));
        let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, rng));

        TreeNode::Split {
            feature_idx: best_feature,
            threshold: best_threshold,
            left,
            right,
            n_samples,
            impurity: self.compute_impurity(&y_subset),
        }
    }

    /// Features examined at one node, in ascending order
    fn candidate_features(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        let k = self.n_candidate_features;
        if k >= self.n_features {
            return (0..self.n_features).collect();
        }
        let mut chosen = rand::seq::index::sample(rng, self.n_features, k.max(1)).into_vec();
        chosen.sort_unstable();
        chosen
    }

    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        y_subset: &[f64],
        features: &[usize],
    ) -> Option<SplitCandidate> {
        let parent_impurity = self.compute_impurity(y_subset);

        // Parallelize feature scanning; each feature independently finds its best split
        let feature_results: Vec<Option<SplitCandidate>> = features
            .par_iter()
            .map(|&feature_idx| self.best_split_for_feature(x, y, indices, feature_idx, parent_impurity))
            .collect();

        // Strictly greater keeps the lowest feature index on ties
        feature_results
            .into_iter()
            .flatten()
            .fold(None, |best: Option<SplitCandidate>, cand| match best {
                Some(b) if b.2 >= cand.2 => Some(b),
                _ => Some(cand),
            })
    }

    /// Sweep thresholds over one feature in sorted order with running statistics
    fn best_split_for_feature(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        feature_idx: usize,
        parent_impurity: f64,
    ) -> Option<SplitCandidate> {
        let mut order: Vec<(f64, f64)> = indices.iter().map(|&i| (x[[i, feature_idx]], y[i])).collect();
        order.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = order.len();
        let total_sum: f64 = order.iter().map(|(_, v)| v).sum();
        let total_sq: f64 = order.iter().map(|(_, v)| v * v).sum();
        let mut total_counts = vec![0usize; self.n_classes];
        if self.is_classification {
            for (_, v) in &order {
                total_counts[*v as usize] += 1;
            }
        }

        let mut left_counts = vec![0usize; self.n_classes];
        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        let mut best: Option<(f64, f64)> = None;

        for split in 1..n {
            let (value, target) = order[split - 1];
            left_sum += target;
            left_sq += target * target;
            if self.is_classification {
                left_counts[target as usize] += 1;
            }

            let next_value = order[split].0;
            if next_value <= value {
                continue;
            }
            let left_n = split;
            let right_n = n - split;
            if left_n < self.min_samples_leaf || right_n < self.min_samples_leaf {
                continue;
            }

            let (left_imp, right_imp) = match self.criterion {
                Criterion::Gini | Criterion::Entropy => {
                    let right_counts: Vec<usize> = total_counts
                        .iter()
                        .zip(left_counts.iter())
                        .map(|(t, l)| t - l)
                        .collect();
                    (
                        self.class_impurity(&left_counts, left_n),
                        self.class_impurity(&right_counts, right_n),
                    )
                }
                Criterion::MSE => (
                    variance(left_n, left_sum, left_sq),
                    variance(right_n, total_sum - left_sum, total_sq - left_sq),
                ),
                Criterion::MAE => {
                    let left: Vec<f64> = order[..split].iter().map(|(_, v)| *v).collect();
                    let right: Vec<f64> = order[split..].iter().map(|(_, v)| *v).collect();
                    (mae(&left), mae(&right))
                }
            };

            let weighted = (left_n as f64 * left_imp + right_n as f64 * right_imp) / n as f64;
            let gain = parent_impurity - weighted;
            if gain > 1e-12 && best.map_or(true, |(g, _)| gain > g) {
                best = Some((gain, (value + next_value) / 2.0));
            }
        }

        best.map(|(gain, threshold)| (feature_idx, threshold, gain))
    }

    fn class_impurity(&self, counts: &[usize], total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        let n = total as f64;
        match self.criterion {
            Criterion::Entropy => -counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    p * p.log2()
                })
                .sum::<f64>(),
            _ => 1.0 - counts.iter().map(|&c| (c as f64 / n).powi(2)).sum::<f64>(),
        }
    }

    fn compute_impurity(&self, y: &[f64]) -> f64 {
        if y.is_empty() {
            return 0.0;
        }
        match self.criterion {
            Criterion::Gini | Criterion::Entropy => {
                let counts = self.class_counts(y);
                self.class_impurity(&counts, y.len())
            }
            Criterion::MSE => {
                let sum: f64 = y.iter().sum();
                let sq: f64 = y.iter().map(|v| v * v).sum();
                variance(y.len(), sum, sq)
            }
            Criterion::MAE => mae(y),
        }
    }

    fn class_counts(&self, y: &[f64]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &v in y {
            counts[v as usize] += 1;
        }
        counts
    }

    fn compute_leaf_value(&self, y: &[f64]) -> f64 {
        if y.is_empty() {
            return 0.0;
        }

        if self.is_classification {
            // Mode; ties go to the lowest class index
            let counts = self.class_counts(y);
            let mut best = 0;
            for (class, &count) in counts.iter().enumerate() {
                if count > counts[best] {
                    best = class;
                }
            }
            best as f64
        } else if self.criterion == Criterion::MAE {
            median(y)
        } else {
            y.iter().sum::<f64>() / y.len() as f64
        }
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(TabfitError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(TabfitError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        Ok(x.rows().into_iter().map(|row| Self::predict_sample(root, &row)).collect())
    }

    fn predict_sample(node: &TreeNode, sample: &ArrayView1<f64>) -> f64 {
        match node {
            TreeNode::Leaf { value, .. } => *value,
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                if sample[*feature_idx] <= *threshold {
                    Self::predict_sample(left, sample)
                } else {
                    Self::predict_sample(right, sample)
                }
            }
        }
    }

    /// Get tree depth (a lone leaf has depth 0)
    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        fn leaves(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => leaves(left) + leaves(right),
            }
        }
        self.root.as_ref().map_or(0, leaves)
    }
}

fn is_pure(y: &[f64]) -> bool {
    match y.first() {
        None => true,
        Some(&first) => y.iter().all(|&v| (v - first).abs() < 1e-10),
    }
}

fn variance(n: usize, sum: f64, sq_sum: f64) -> f64 {
    if n == 0 {
        return 0.0;
    }
    // Var = E[X²] - E[X]²
    let n = n as f64;
    (sq_sum / n - (sum / n).powi(2)).max(0.0)
}

fn median(y: &[f64]) -> f64 {
    let mut sorted = y.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn mae(y: &[f64]) -> f64 {
    if y.is_empty() {
        return 0.0;
    }
    let m = median(y);
    y.iter().map(|&v| (v - m).abs()).sum::<f64>() / y.len() as f64
}

impl Classifier for DecisionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        DecisionTree::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        DecisionTree::predict(self, x)
    }
}

impl Regressor for DecisionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        DecisionTree::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        DecisionTree::predict(self, x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classifier_simple() {
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_classifier();
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.predict(&x).unwrap(), y);
        assert_eq!(tree.get_depth(), 1);
        assert_eq!(tree.get_n_leaves(), 2);
    }

    #[test]
    fn test_regressor_simple() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0];

        let mut tree = DecisionTree::new_regressor();
        tree.fit(&x, &y).unwrap();

        // Fully grown tree reproduces the training targets
        assert_eq!(tree.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_mae_criterion_uses_median_leaves() {
        let x = array![[1.0], [2.0], [3.0], [10.0]];
        let y = array![1.0, 1.0, 4.0, 50.0];
        let mut tree = DecisionTree::new_regressor()
            .with_criterion(Criterion::MAE)
            .unwrap()
            .with_max_depth(0);
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.predict(&array![[0.0]]).unwrap()[0], 2.5);
    }

    #[test]
    fn test_criterion_task_mismatch() {
        assert!(DecisionTree::new_classifier()
            .with_criterion(Criterion::MSE)
            .is_err());
    }

    #[test]
    fn test_max_depth() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let y = array![0.0, 1.0, 0.0, 1.0];

        let mut tree = DecisionTree::new_classifier().with_max_depth(2);
        tree.fit(&x, &y).unwrap();

        assert!(tree.get_depth() <= 2);
    }

    #[test]
    fn test_splits_on_informative_feature() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_classifier();
        tree.fit(&x, &y).unwrap();

        match tree.root.as_ref().unwrap() {
            TreeNode::Split { feature_idx, .. } => assert_eq!(*feature_idx, 0),
            TreeNode::Leaf { .. } => panic!("expected a split"),
        }
        assert_eq!(tree.get_depth(), 1);
    }

    #[test]
    fn test_split_records_node_impurity() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];

        let mut classifier = DecisionTree::new_classifier();
        classifier.fit(&x, &array![0.0, 0.0, 1.0, 1.0]).unwrap();
        match classifier.root.as_ref().unwrap() {
            TreeNode::Split { impurity, n_samples, .. } => {
                // Gini of a balanced binary node
                assert!((impurity - 0.5).abs() < 1e-12);
                assert_eq!(*n_samples, 4);
            }
            TreeNode::Leaf { .. } => panic!("expected a split"),
        }

        let mut regressor = DecisionTree::new_regressor();
        regressor.fit(&x, &array![1.0, 1.0, 3.0, 3.0]).unwrap();
        match regressor.root.as_ref().unwrap() {
            TreeNode::Split { impurity, .. } => assert!((impurity - 1.0).abs() < 1e-12),
            TreeNode::Leaf { .. } => panic!("expected a split"),
        }
        assert_eq!(regressor.get_n_leaves(), 2);
    }

    #[test]
    fn test_seeded_feature_sampling_is_reproducible() {
        let x = Array2::from_shape_fn((40, 6), |(r, c)| ((r * 7 + c * 3) % 11) as f64);
        let y: Array1<f64> = (0..40).map(|r| (r % 3) as f64).collect();

        let fit = || {
            let mut tree = DecisionTree::new_classifier()
                .with_max_features(MaxFeatures::Fixed(2))
                .with_random_state(7);
            tree.fit(&x, &y).unwrap();
            tree.predict(&x).unwrap()
        };
        assert_eq!(fit(), fit());
    }
}
