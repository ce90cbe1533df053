//! Random Forest implementation

use super::decision_tree::{Criterion, DecisionTree};
use super::{check_n_features, check_training_data, majority_vote, Classifier};
use crate::error::{FoldwiseError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Strategy for max features
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// Square root of n_features
    #[default]
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
    /// Features to sample per split, clamped to `1..=n_features`
    pub fn resolve(self, n_features: usize) -> usize {
        match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
            MaxFeatures::Fixed(n) => n,
            MaxFeatures::All => n_features,
        }
        .clamp(1, n_features.max(1))
    }
}

/// Random Forest classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features sampled per split (sqrt by default)
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    /// Compute the out-of-bag error during fit
    pub oob_score: bool,
    pub criterion: Criterion,
    /// Tree `i` is seeded with `random_state + i`
    pub random_state: u64,
    oob_error: Option<f64>,
    feature_importances: Option<Array1<f64>>,
    n_features: usize,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForest {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            oob_score: false,
            criterion: Criterion::Gini,
            random_state: crate::DEFAULT_SEED,
            oob_error: None,
            feature_importances: None,
            n_features: 0,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_oob_score(mut self, oob_score: bool) -> Self {
        self.oob_score = oob_score;
        self
    }

    /// Fit the forest to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_training_data(x, y)?;
        if self.n_estimators == 0 {
            return Err(FoldwiseError::invalid("n_estimators must be at least 1"));
        }
        if let MaxFeatures::Fraction(f) = self.max_features {
            if !(f > 0.0 && f <= 1.0) {
                return Err(FoldwiseError::invalid(format!(
                    "max_features fraction must be in (0, 1], got {}",
                    f
                )));
            }
        }

        let n_samples = x.nrows();
        self.n_features = x.ncols();
        let max_features = self.max_features.resolve(self.n_features);

        // Build trees in parallel; each returns its in-bag mask for OOB scoring
        let fitted: Vec<(DecisionTree, Vec<bool>)> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.wrapping_add(tree_idx as u64));

                let sample_indices: Vec<usize> = if self.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let mut in_bag = vec![false; n_samples];
                for &i in &sample_indices {
                    in_bag[i] = true;
                }

                let x_boot = x.select(Axis(0), &sample_indices);
                let y_boot = y.select(Axis(0), &sample_indices);

                let mut tree = DecisionTree::new()
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_max_features(max_features)
                    .with_criterion(self.criterion)
                    .with_random_state(rng.next_u64());
                if let Some(d) = self.max_depth {
                    tree = tree.with_max_depth(d);
                }
                tree.fit(&x_boot, &y_boot)?;

                Ok((tree, in_bag))
            })
            .collect::<Result<Vec<_>>>()?;

        let (trees, in_bag): (Vec<DecisionTree>, Vec<Vec<bool>>) = fitted.into_iter().unzip();
        self.trees = trees;

        self.oob_error = if self.oob_score && self.bootstrap {
            self.compute_oob_error(x, y, &in_bag)?
        } else {
            None
        };

        self.compute_feature_importances();

        Ok(self)
    }

    /// Error of the forest on each row, voting only with trees that never
    /// saw that row. Rows every tree saw are skipped.
    fn compute_oob_error(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        in_bag: &[Vec<bool>],
    ) -> Result<Option<f64>> {
        let n_samples = x.nrows();
        let mut votes = vec![0usize; n_samples];
        let mut positives = vec![0usize; n_samples];

        for (tree, mask) in self.trees.iter().zip(in_bag) {
            let oob_rows: Vec<usize> = (0..n_samples).filter(|&i| !mask[i]).collect();
            if oob_rows.is_empty() {
                continue;
            }
            let preds = tree.predict(&x.select(Axis(0), &oob_rows))?;
            for (&row, &pred) in oob_rows.iter().zip(preds.iter()) {
                votes[row] += 1;
                if pred == 1.0 {
                    positives[row] += 1;
                }
            }
        }

        let scored: Vec<usize> = (0..n_samples).filter(|&i| votes[i] > 0).collect();
        if scored.is_empty() {
            debug!(n_estimators = self.n_estimators, "no out-of-bag rows, OOB error unavailable");
            return Ok(None);
        }

        let wrong = scored
            .iter()
            .filter(|&&i| majority_vote(positives[i], votes[i]) != y[i])
            .count();
        Ok(Some(wrong as f64 / scored.len() as f64))
    }

    fn compute_feature_importances(&mut self) {
        let mut total_importances = vec![0.0; self.n_features];

        for tree in &self.trees {
            if let Some(imp) = tree.feature_importances() {
                for (acc, &val) in total_importances.iter_mut().zip(imp.iter()) {
                    *acc += val;
                }
            }
        }

        let total: f64 = total_importances.iter().sum();
        if total > 0.0 {
            for imp in &mut total_importances {
                *imp /= total;
            }
        }

        self.feature_importances = Some(Array1::from_vec(total_importances));
    }

    /// Number of trees voting for class 1, per row
    fn positive_votes(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        if self.trees.is_empty() {
            return Err(FoldwiseError::ModelNotFitted);
        }
        check_n_features(self.n_features, x)?;

        let all_predictions: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        Ok((0..x.nrows())
            .map(|i| all_predictions.iter().filter(|p| p[i] == 1.0).count())
            .collect())
    }

    /// Majority vote; ties go to class 0
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let n_trees = self.trees.len();
        Ok(self
            .positive_votes(x)?
            .into_iter()
            .map(|pos| majority_vote(pos, n_trees))
            .collect())
    }

    /// Share of trees voting for class 1
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let n_trees = self.trees.len() as f64;
        Ok(self
            .positive_votes(x)?
            .into_iter()
            .map(|pos| pos as f64 / n_trees)
            .collect())
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Out-of-bag error, when `oob_score` and `bootstrap` were both set
    pub fn oob_error(&self) -> Option<f64> {
        self.oob_error
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        RandomForest::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        RandomForest::predict(self, x)
    }

    fn name(&self) -> &'static str {
        "Random Forest"
    }
}
