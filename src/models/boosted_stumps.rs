//! Boosted decision stumps (discrete AdaBoost)
//!
//! Each round fits a one-split stump against the current sample weights,
//! then up-weights the samples it got wrong. The ensemble predicts with the
//! sign of the alpha-weighted vote.

use super::{check_n_features, check_training_data, split_threshold, Classifier};
use crate::error::{FoldwiseError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Weighted errors at or below this count as a perfect fit
const PERFECT_FIT: f64 = 1e-12;

/// A single decision stump: splits on one feature at one threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Stump {
    feature_idx: usize,
    threshold: f64,
    /// Prediction when feature <= threshold
    left_label: f64,
    /// Prediction when feature > threshold
    right_label: f64,
}

impl Stump {
    fn predict_sample(&self, sample: &ArrayView1<f64>) -> f64 {
        if sample[self.feature_idx] <= self.threshold {
            self.left_label
        } else {
            self.right_label
        }
    }

    /// Find the stump with the lowest weighted 0-1 error. Every feature is
    /// scanned once in sorted order and both label orientations are scored
    /// at each cut.
    fn fit(x: &Array2<f64>, y: &Array1<f64>, weights: &Array1<f64>) -> (Stump, f64) {
        let n_samples = x.nrows();
        let w_pos: f64 = weights.iter().zip(y.iter()).filter(|(_, &l)| l == 1.0).map(|(w, _)| w).sum();
        let w_neg: f64 = weights.sum() - w_pos;

        // Constant stump: everything goes left
        let majority = if w_pos > w_neg { 1.0 } else { 0.0 };
        let mut best = Stump {
            feature_idx: 0,
            threshold: f64::MAX,
            left_label: majority,
            right_label: majority,
        };
        let mut best_error = w_pos.min(w_neg);

        for f in 0..x.ncols() {
            let col = x.column(f);
            let mut order: Vec<usize> = (0..n_samples).collect();
            order.sort_by(|&a, &b| col[a].total_cmp(&col[b]));

            let mut left_pos = 0.0;
            let mut left_neg = 0.0;
            for k in 0..n_samples - 1 {
                let i = order[k];
                if y[i] == 1.0 {
                    left_pos += weights[i];
                } else {
                    left_neg += weights[i];
                }

                let (v, next) = (col[i], col[order[k + 1]]);
                if v == next {
                    continue;
                }

                // left -> 0, right -> 1
                let error_low_left = left_pos + (w_neg - left_neg);
                // left -> 1, right -> 0
                let error_high_left = left_neg + (w_pos - left_pos);

                let (error, left_label, right_label) = if error_low_left <= error_high_left {
                    (error_low_left, 0.0, 1.0)
                } else {
                    (error_high_left, 1.0, 0.0)
                };

                if error < best_error {
                    best_error = error;
                    best = Stump {
                        feature_idx: f,
                        threshold: split_threshold(v, next),
                        left_label,
                        right_label,
                    };
                }
            }
        }

        (best, best_error)
    }
}

/// AdaBoost over decision stumps, binary labels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostedStumps {
    /// Maximum number of boosting rounds
    pub n_estimators: usize,
    /// Shrinks each stump's vote weight
    pub learning_rate: f64,
    stumps: Vec<Stump>,
    alphas: Vec<f64>,
    n_features: usize,
}

impl Default for BoostedStumps {
    fn default() -> Self {
        Self::new(50, 1.0)
    }
}

impl BoostedStumps {
    pub fn new(n_estimators: usize, learning_rate: f64) -> Self {
        Self {
            n_estimators,
            learning_rate,
            stumps: Vec::new(),
            alphas: Vec::new(),
            n_features: 0,
        }
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_training_data(x, y)?;
        if self.n_estimators == 0 {
            return Err(FoldwiseError::invalid("n_estimators must be at least 1"));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(FoldwiseError::invalid(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }

        let n_samples = x.nrows();
        self.n_features = x.ncols();
        self.stumps.clear();
        self.alphas.clear();

        let mut weights = Array1::from_elem(n_samples, 1.0 / n_samples as f64);

        for round in 0..self.n_estimators {
            let (stump, error) = Stump::fit(x, y, &weights);

            if error <= PERFECT_FIT {
                debug!(round, "stump fits the weighted sample exactly, stopping");
                // A perfect stump decides alone
                if self.stumps.is_empty() {
                    self.stumps.push(stump);
                    self.alphas.push(1.0);
                }
                break;
            }
            if error >= 0.5 {
                debug!(round, error, "stump no better than chance, stopping");
                if self.stumps.is_empty() {
                    self.stumps.push(stump);
                    self.alphas.push(1.0);
                }
                break;
            }

            let alpha = self.learning_rate * ((1.0 - error) / error).ln();

            let boost = alpha.exp();
            for (i, row) in x.rows().into_iter().enumerate() {
                if stump.predict_sample(&row) != y[i] {
                    weights[i] *= boost;
                }
            }
            let w_sum = weights.sum();
            weights /= w_sum;

            self.stumps.push(stump);
            self.alphas.push(alpha);
        }

        Ok(self)
    }

    /// Alpha-weighted vote per row: positive favors class 1
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.stumps.is_empty() {
            return Err(FoldwiseError::ModelNotFitted);
        }
        check_n_features(self.n_features, x)?;

        Ok(x.rows()
            .into_iter()
            .map(|row| {
                self.stumps
                    .iter()
                    .zip(self.alphas.iter())
                    .map(|(stump, &alpha)| alpha * (2.0 * stump.predict_sample(&row) - 1.0))
                    .sum::<f64>()
            })
            .collect())
    }

    /// Sign of the weighted vote; a zero score predicts class 0
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self
            .decision_function(x)?
            .mapv(|score| if score > 0.0 { 1.0 } else { 0.0 }))
    }

    /// Number of stumps actually kept (early stopping may keep fewer than
    /// `n_estimators`)
    pub fn n_rounds(&self) -> usize {
        self.stumps.len()
    }

    /// Alpha mass per feature, normalized
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        if self.stumps.is_empty() {
            return None;
        }
        let mut importances = vec![0.0f64; self.n_features];
        for (stump, &alpha) in self.stumps.iter().zip(self.alphas.iter()) {
            // constant stumps carry no feature signal
            if stump.left_label != stump.right_label {
                importances[stump.feature_idx] += alpha.abs();
            }
        }
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for v in importances.iter_mut() {
                *v /= total;
            }
        }
        Some(Array1::from_vec(importances))
    }
}

impl Classifier for BoostedStumps {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        BoostedStumps::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        BoostedStumps::predict(self, x)
    }

    fn name(&self) -> &'static str {
        "Boosted Stumps"
    }
}
