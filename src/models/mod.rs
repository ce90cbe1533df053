//! Binary classifiers
//!
//! Provides the [`Classifier`] capability the cross-validator is generic over,
//! and the model families compared in the analysis:
//! - Majority-class baseline
//! - Decision tree (CART)
//! - Random forest
//! - Boosted decision stumps (discrete AdaBoost)

pub mod boosted_stumps;
pub mod decision_tree;
pub mod random_forest;

pub use boosted_stumps::BoostedStumps;
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use random_forest::{MaxFeatures, RandomForest};

use crate::error::{FoldwiseError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// A trainable binary classifier.
///
/// Labels are `0.0` / `1.0`. A fresh value must be untrained; the
/// cross-validator builds one per fold and never reuses it.
pub trait Classifier: Send {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict a label for every row of `x`
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Short display name
    fn name(&self) -> &'static str;
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        (**self).fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        (**self).predict(x)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Predicts the most frequent training label (ties go to 0)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MajorityClass {
    label: Option<f64>,
}

impl MajorityClass {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Classifier for MajorityClass {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        let positives = y.iter().filter(|&&v| v == 1.0).count();
        self.label = Some(majority_vote(positives, y.len()));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let label = self.label.ok_or(FoldwiseError::ModelNotFitted)?;
        Ok(Array1::from_elem(x.nrows(), label))
    }

    fn name(&self) -> &'static str {
        "Majority Class"
    }
}

/// Class 1 wins only with a strict majority of votes
pub(crate) fn majority_vote(positives: usize, total: usize) -> f64 {
    if 2 * positives > total {
        1.0
    } else {
        0.0
    }
}

/// Shared checks for every `fit`: aligned, non-empty, binary
pub(crate) fn check_training_data(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(FoldwiseError::invalid(format!(
            "x has {} rows but y has {} labels",
            x.nrows(),
            y.len()
        )));
    }
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(FoldwiseError::invalid(format!(
            "cannot fit on an empty {}x{} matrix",
            x.nrows(),
            x.ncols()
        )));
    }
    if y.iter().any(|&v| v != 0.0 && v != 1.0) {
        return Err(FoldwiseError::invalid("labels must be 0 or 1"));
    }
    Ok(())
}

/// Cut point between two adjacent distinct sorted values. When they are one
/// float step apart the midpoint rounds onto `upper`, so fall back to `lower`
/// to keep `lower <= t < upper`.
pub(crate) fn split_threshold(lower: f64, upper: f64) -> f64 {
    let mid = lower + (upper - lower) / 2.0;
    if mid >= upper {
        lower
    } else {
        mid
    }
}

pub(crate) fn check_n_features(expected: usize, x: &Array2<f64>) -> Result<()> {
    if x.ncols() != expected {
        return Err(FoldwiseError::invalid(format!(
            "model was fitted on {} features, got {}",
            expected,
            x.ncols()
        )));
    }
    Ok(())
}
