//! Cross-validation
//!
//! [`CrossValidator`] turns a dataset into train/test splits and scores a
//! freshly built classifier on each held-out fold with 0-1 loss.
//! [`evaluate`] is the shorthand for shuffled k-fold.
//!
//! K-fold cuts a seeded permutation of the row indices into `k` contiguous
//! groups. With `base = n / k` and `remainder = n % k`, the first
//! `remainder` groups hold `base + 1` rows and the rest hold `base`.

use crate::config::{CvConfig, DEFAULT_SEED};
use crate::data::{Dataset, IntoDataset};
use crate::error::{FoldwiseError, Result};
use crate::metrics::ConfusionCounts;
use crate::models::Classifier;
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Cross-validation strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CVStrategy {
    /// K-Fold cross-validation
    KFold { n_splits: usize, shuffle: bool },
    /// K-Fold that keeps the class ratio of every fold close to the whole
    StratifiedKFold { n_splits: usize, shuffle: bool },
    /// One fold per sample
    LeaveOneOut,
    /// K-Fold run `n_repeats` times with a different permutation each time
    RepeatedKFold { n_splits: usize, n_repeats: usize },
}

impl Default for CVStrategy {
    fn default() -> Self {
        CVStrategy::KFold { n_splits: 5, shuffle: true }
    }
}

/// A single train/test split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Outcome of one held-out fold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    pub fold_idx: usize,
    pub n_train: usize,
    pub n_test: usize,
    /// Misclassified fraction of the test fold, in `[0, 1]`
    pub error: f64,
    pub confusion: ConfusionCounts,
}

/// Cross-validation results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvReport {
    /// 0-1 error for each fold, in fold order
    pub fold_errors: Vec<f64>,
    /// Arithmetic mean of `fold_errors`
    pub mean_error: f64,
    /// Population standard deviation of `fold_errors`
    pub std_error: f64,
    pub n_folds: usize,
    pub folds: Vec<FoldResult>,
    /// Confusion counts summed over all folds
    pub confusion: ConfusionCounts,
}

impl CvReport {
    /// `folds` is non-empty: every strategy yields at least two splits
    pub(crate) fn from_folds(folds: Vec<FoldResult>) -> Self {
        let fold_errors: Vec<f64> = folds.iter().map(|f| f.error).collect();
        let n_folds = fold_errors.len();
        let mean_error = fold_errors.iter().sum::<f64>() / n_folds as f64;
        let variance = fold_errors
            .iter()
            .map(|e| (e - mean_error).powi(2))
            .sum::<f64>()
            / n_folds as f64;
        let confusion = folds.iter().map(|f| f.confusion).sum();

        Self {
            fold_errors,
            mean_error,
            std_error: variance.sqrt(),
            n_folds,
            folds,
            confusion,
        }
    }

    /// `1 - mean_error`
    pub fn mean_accuracy(&self) -> f64 {
        1.0 - self.mean_error
    }
}

/// Cross-validation splitter and evaluator
#[derive(Debug, Clone)]
pub struct CrossValidator {
    strategy: CVStrategy,
    random_state: u64,
    parallel: bool,
}

impl Default for CrossValidator {
    fn default() -> Self {
        Self::new(CVStrategy::default())
    }
}

impl CrossValidator {
    /// Create a new cross-validator, seeded with [`DEFAULT_SEED`]
    pub fn new(strategy: CVStrategy) -> Self {
        Self {
            strategy,
            random_state: DEFAULT_SEED,
            parallel: false,
        }
    }

    pub fn from_config(config: &CvConfig) -> Self {
        Self {
            strategy: config.strategy.clone(),
            random_state: config.random_state,
            parallel: config.parallel,
        }
    }

    /// Seed for every shuffle this validator performs
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Evaluate folds on the rayon pool. Results keep fold order either way.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn strategy(&self) -> &CVStrategy {
        &self.strategy
    }

    /// Generate train/test splits. `y` is required for stratified folds.
    pub fn split(&self, n_samples: usize, y: Option<&Array1<f64>>) -> Result<Vec<CVSplit>> {
        match &self.strategy {
            CVStrategy::KFold { n_splits, shuffle } => {
                self.k_fold_split(n_samples, *n_splits, *shuffle, self.random_state)
            }
            CVStrategy::StratifiedKFold { n_splits, shuffle } => {
                let y = y.ok_or_else(|| {
                    FoldwiseError::invalid("stratified k-fold requires the label vector")
                })?;
                self.stratified_k_fold_split(n_samples, y, *n_splits, *shuffle)
            }
            CVStrategy::LeaveOneOut => self.leave_one_out_split(n_samples),
            CVStrategy::RepeatedKFold { n_splits, n_repeats } => {
                self.repeated_k_fold_split(n_samples, *n_splits, *n_repeats)
            }
        }
    }

    fn check_n_splits(n_samples: usize, n_splits: usize) -> Result<()> {
        if n_splits < 2 {
            return Err(FoldwiseError::invalid(format!(
                "number of folds must be at least 2, got {}",
                n_splits
            )));
        }
        if n_splits > n_samples {
            return Err(FoldwiseError::invalid(format!(
                "number of folds ({}) cannot exceed number of samples ({})",
                n_splits, n_samples
            )));
        }
        Ok(())
    }

    fn k_fold_split(
        &self,
        n_samples: usize,
        n_splits: usize,
        shuffle: bool,
        seed: u64,
    ) -> Result<Vec<CVSplit>> {
        Self::check_n_splits(n_samples, n_splits)?;

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if shuffle {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            indices.shuffle(&mut rng);
        }

        let base = n_samples / n_splits;
        let remainder = n_samples % n_splits;

        let mut splits = Vec::with_capacity(n_splits);
        let mut current = 0;

        for fold_idx in 0..n_splits {
            let fold_size = if fold_idx < remainder { base + 1 } else { base };
            let test_indices = indices[current..current + fold_size].to_vec();
            let train_indices: Vec<usize> = indices[..current]
                .iter()
                .chain(indices[current + fold_size..].iter())
                .copied()
                .collect();

            splits.push(CVSplit {
                train_indices,
                test_indices,
                fold_idx,
            });

            current += fold_size;
        }

        Ok(splits)
    }

    /// Deal class 0 then class 1 round-robin over the folds with a single
    /// running counter, so fold sizes stay within one of each other.
    fn stratified_k_fold_split(
        &self,
        n_samples: usize,
        y: &Array1<f64>,
        n_splits: usize,
        shuffle: bool,
    ) -> Result<Vec<CVSplit>> {
        if y.len() != n_samples {
            return Err(FoldwiseError::invalid(format!(
                "label vector has {} entries for {} samples",
                y.len(),
                n_samples
            )));
        }
        Self::check_n_splits(n_samples, n_splits)?;

        let (mut negatives, mut positives): (Vec<usize>, Vec<usize>) =
            (0..n_samples).partition(|&i| y[i] != 1.0);

        if shuffle {
            let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
            negatives.shuffle(&mut rng);
            positives.shuffle(&mut rng);
        }

        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];
        for (i, idx) in negatives.into_iter().chain(positives).enumerate() {
            folds[i % n_splits].push(idx);
        }

        let splits = (0..n_splits)
            .map(|fold_idx| CVSplit {
                train_indices: folds
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != fold_idx)
                    .flat_map(|(_, f)| f.iter().copied())
                    .collect(),
                test_indices: folds[fold_idx].clone(),
                fold_idx,
            })
            .collect();

        Ok(splits)
    }

    fn leave_one_out_split(&self, n_samples: usize) -> Result<Vec<CVSplit>> {
        if n_samples < 2 {
            return Err(FoldwiseError::invalid(format!(
                "leave-one-out needs at least 2 samples, got {}",
                n_samples
            )));
        }

        Ok((0..n_samples)
            .map(|i| CVSplit {
                train_indices: (0..n_samples).filter(|&j| j != i).collect(),
                test_indices: vec![i],
                fold_idx: i,
            })
            .collect())
    }

    fn repeated_k_fold_split(
        &self,
        n_samples: usize,
        n_splits: usize,
        n_repeats: usize,
    ) -> Result<Vec<CVSplit>> {
        if n_repeats == 0 {
            return Err(FoldwiseError::invalid("n_repeats must be at least 1"));
        }
        Self::check_n_splits(n_samples, n_splits)?;

        let mut all_splits = Vec::new();
        for repeat in 0..n_repeats {
            let seed = self.random_state.wrapping_add(repeat as u64);
            let mut splits = self.k_fold_split(n_samples, n_splits, true, seed)?;

            // Fold indices stay unique across repeats
            for split in &mut splits {
                split.fold_idx += repeat * n_splits;
            }
            all_splits.extend(splits);
        }

        Ok(all_splits)
    }

    /// Train a fresh model from `model_factory` on each split's training rows
    /// and score it on the held-out rows. Any fold failure aborts the run.
    pub fn evaluate<M, F>(&self, dataset: &Dataset, model_factory: F) -> Result<CvReport>
    where
        M: Classifier,
        F: Fn() -> M + Sync,
    {
        let splits = self.split(dataset.n_samples(), Some(dataset.labels()))?;

        info!(
            strategy = ?self.strategy,
            n_samples = dataset.n_samples(),
            n_splits = splits.len(),
            parallel = self.parallel,
            "starting cross-validation"
        );

        let folds: Vec<FoldResult> = if self.parallel {
            splits
                .par_iter()
                .map(|split| evaluate_split(dataset, split, &model_factory))
                .collect::<Result<Vec<_>>>()?
        } else {
            splits
                .iter()
                .map(|split| evaluate_split(dataset, split, &model_factory))
                .collect::<Result<Vec<_>>>()?
        };

        let report = CvReport::from_folds(folds);
        info!(
            n_folds = report.n_folds,
            mean_error = report.mean_error,
            std_error = report.std_error,
            "cross-validation complete"
        );

        Ok(report)
    }
}

fn evaluate_split<M, F>(dataset: &Dataset, split: &CVSplit, model_factory: &F) -> Result<FoldResult>
where
    M: Classifier,
    F: Fn() -> M,
{
    let (x_train, y_train) = dataset.select(&split.train_indices);
    let (x_test, y_test) = dataset.select(&split.test_indices);

    let mut model = model_factory();
    model.fit(&x_train, &y_train)?;
    let y_pred = model.predict(&x_test)?;

    // Predictions other than exact 0/1 labels are rejected here
    let confusion = ConfusionCounts::compute(&y_test, &y_pred)?;
    let error = confusion.error_rate();

    debug!(
        model = model.name(),
        fold = split.fold_idx,
        n_train = split.train_indices.len(),
        n_test = split.test_indices.len(),
        error,
        "fold evaluated"
    );

    Ok(FoldResult {
        fold_idx: split.fold_idx,
        n_train: split.train_indices.len(),
        n_test: split.test_indices.len(),
        error,
        confusion,
    })
}

/// Shuffled k-fold cross-validation.
///
/// `data` may be a [`Dataset`], a `(features, labels)` array pair or a
/// `(&DataFrame, target_column)` pair. `seed` defaults to [`DEFAULT_SEED`];
/// the same seed always yields the same folds.
///
/// ```no_run
/// use foldwise::{evaluate, models::DecisionTree};
/// use ndarray::array;
///
/// let x = array![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0]];
/// let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
/// let report = evaluate((x, y), 3, DecisionTree::new, Some(7)).unwrap();
/// assert_eq!(report.fold_errors.len(), 3);
/// ```
pub fn evaluate<'a, D, M, F>(data: D, k: usize, model_factory: F, seed: Option<u64>) -> Result<CvReport>
where
    D: IntoDataset<'a>,
    M: Classifier,
    F: Fn() -> M + Sync,
{
    let dataset = data.into_dataset()?;
    CrossValidator::new(CVStrategy::KFold { n_splits: k, shuffle: true })
        .with_random_state(seed.unwrap_or(DEFAULT_SEED))
        .evaluate(&dataset, model_factory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MajorityClass;
    use ndarray::{array, Array2};

    fn assert_partition(splits: &[CVSplit], n_samples: usize) {
        let mut all_test: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        all_test.sort_unstable();
        assert_eq!(all_test, (0..n_samples).collect::<Vec<_>>());

        for split in splits {
            assert_eq!(split.train_indices.len() + split.test_indices.len(), n_samples);
            for idx in &split.test_indices {
                assert!(!split.train_indices.contains(idx));
            }
        }
    }

    #[test]
    fn test_k_fold() {
        let cv = CrossValidator::new(CVStrategy::KFold { n_splits: 5, shuffle: false });
        let splits = cv.split(100, None).unwrap();

        assert_eq!(splits.len(), 5);
        for split in &splits {
            assert_eq!(split.test_indices.len(), 20);
            assert_eq!(split.train_indices.len(), 80);
        }
        assert_partition(&splits, 100);
        // Unshuffled folds are contiguous blocks
        assert_eq!(splits[1].test_indices, (20..40).collect::<Vec<_>>());
    }

    #[test]
    fn test_k_fold_remainder_goes_to_first_folds() {
        let cv = CrossValidator::new(CVStrategy::KFold { n_splits: 4, shuffle: true });
        let splits = cv.split(11, None).unwrap();
        let sizes: Vec<usize> = splits.iter().map(|s| s.test_indices.len()).collect();
        assert_eq!(sizes, vec![3, 3, 3, 2]);
        assert_partition(&splits, 11);
    }

    #[test]
    fn test_k_fold_seed_controls_permutation() {
        let a = CrossValidator::default().with_random_state(1).split(30, None).unwrap();
        let b = CrossValidator::default().with_random_state(1).split(30, None).unwrap();
        let c = CrossValidator::default().with_random_state(2).split(30, None).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_invalid_fold_counts() {
        for k in [0, 1] {
            let cv = CrossValidator::new(CVStrategy::KFold { n_splits: k, shuffle: true });
            assert!(matches!(cv.split(10, None), Err(FoldwiseError::InvalidArgument(_))));
        }
        let cv = CrossValidator::new(CVStrategy::KFold { n_splits: 11, shuffle: true });
        assert!(matches!(cv.split(10, None), Err(FoldwiseError::InvalidArgument(_))));
    }

    #[test]
    fn test_stratified_k_fold() {
        let y = array![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0];

        let cv = CrossValidator::new(CVStrategy::StratifiedKFold { n_splits: 5, shuffle: false });
        let splits = cv.split(10, Some(&y)).unwrap();

        assert_eq!(splits.len(), 5);
        for split in &splits {
            assert_eq!(split.test_indices.len(), 2);
            let positives = split.test_indices.iter().filter(|&&i| y[i] == 1.0).count();
            assert_eq!(positives, 1);
        }
        assert_partition(&splits, 10);
    }

    #[test]
    fn test_stratified_sizes_within_one() {
        let y = Array1::from_iter((0..23).map(|i| if i % 3 == 0 { 1.0 } else { 0.0 }));
        let cv = CrossValidator::new(CVStrategy::StratifiedKFold { n_splits: 4, shuffle: true });
        let splits = cv.split(23, Some(&y)).unwrap();

        let sizes: Vec<usize> = splits.iter().map(|s| s.test_indices.len()).collect();
        let (min, max) = (sizes.iter().min().unwrap(), sizes.iter().max().unwrap());
        assert!(max - min <= 1, "sizes {:?}", sizes);
        assert_partition(&splits, 23);
    }

    #[test]
    fn test_stratified_requires_labels() {
        let cv = CrossValidator::new(CVStrategy::StratifiedKFold { n_splits: 2, shuffle: true });
        assert!(cv.split(10, None).is_err());
    }

    #[test]
    fn test_leave_one_out() {
        let cv = CrossValidator::new(CVStrategy::LeaveOneOut);
        let splits = cv.split(10, None).unwrap();

        assert_eq!(splits.len(), 10);
        for split in &splits {
            assert_eq!(split.test_indices.len(), 1);
            assert_eq!(split.train_indices.len(), 9);
        }
        assert!(cv.split(1, None).is_err());
    }

    #[test]
    fn test_repeated_k_fold() {
        let cv = CrossValidator::new(CVStrategy::RepeatedKFold { n_splits: 5, n_repeats: 3 })
            .with_random_state(42);
        let splits = cv.split(100, None).unwrap();

        assert_eq!(splits.len(), 15);
        for repeat in splits.chunks(5) {
            assert_partition(repeat, 100);
        }
        assert_ne!(splits[0].test_indices, splits[5].test_indices);
        assert_eq!(splits[14].fold_idx, 14);
    }

    #[test]
    fn test_repeated_k_fold_validates_before_allocating() {
        for n_splits in [0, 1, 11, usize::MAX] {
            let cv = CrossValidator::new(CVStrategy::RepeatedKFold { n_splits, n_repeats: 2 });
            assert!(
                matches!(cv.split(10, None), Err(FoldwiseError::InvalidArgument(_))),
                "n_splits={}",
                n_splits
            );
        }
        let cv = CrossValidator::new(CVStrategy::RepeatedKFold { n_splits: 2, n_repeats: 0 });
        assert!(cv.split(10, None).is_err());
    }

    #[test]
    fn test_report_statistics() {
        let fold = |fold_idx, error| FoldResult {
            fold_idx,
            n_train: 8,
            n_test: 2,
            error,
            confusion: ConfusionCounts::default(),
        };
        let report = CvReport::from_folds(vec![fold(0, 0.0), fold(1, 0.5), fold(2, 1.0)]);
        assert_eq!(report.n_folds, 3);
        assert!((report.mean_error - 0.5).abs() < 1e-12);
        assert!((report.std_error - (1.0f64 / 6.0).sqrt()).abs() < 1e-12);
        assert!((report.mean_accuracy() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_evaluate_majority_baseline() {
        let x = Array2::from_shape_fn((12, 1), |(i, _)| i as f64);
        let y = Array1::from_iter((0..12).map(|i| if i < 3 { 1.0 } else { 0.0 }));

        let report = evaluate((x, y), 4, MajorityClass::new, None).unwrap();
        assert_eq!(report.n_folds, 4);
        // The majority label is 0 in every training set, so exactly the
        // three positives are wrong
        assert!((report.mean_error - 0.25).abs() < 1e-12);
        assert_eq!(report.confusion.fn_, 3);
        assert_eq!(report.confusion.total(), 12);
    }
}
