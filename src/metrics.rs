//! Binary classification metrics

use crate::error::{FoldwiseError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Confusion counts for a binary problem. Class 1 is the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub fn_: usize,
}

impl ConfusionCounts {
    /// Tally predictions against truth. Both vectors must hold exact
    /// `0.0` / `1.0` labels; anything else is rejected rather than rounded.
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        check_lengths(y_true, y_pred)?;
        check_binary("label", y_true)?;
        check_binary("prediction", y_pred)?;

        let mut counts = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t == 1.0, p == 1.0) {
                (true, true) => counts.tp += 1,
                (false, true) => counts.fp += 1,
                (false, false) => counts.tn += 1,
                (true, false) => counts.fn_ += 1,
            }
        }
        Ok(counts)
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }

    pub fn errors(&self) -> usize {
        self.fp + self.fn_
    }

    pub fn error_rate(&self) -> f64 {
        if self.total() == 0 {
            return 0.0;
        }
        self.errors() as f64 / self.total() as f64
    }

    pub fn precision(&self) -> f64 {
        if self.tp + self.fp > 0 {
            self.tp as f64 / (self.tp + self.fp) as f64
        } else {
            0.0
        }
    }

    pub fn recall(&self) -> f64 {
        if self.tp + self.fn_ > 0 {
            self.tp as f64 / (self.tp + self.fn_) as f64
        } else {
            0.0
        }
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r > 0.0 {
            2.0 * p * r / (p + r)
        } else {
            0.0
        }
    }
}

impl std::ops::Add for ConfusionCounts {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            tp: self.tp + other.tp,
            fp: self.fp + other.fp,
            tn: self.tn + other.tn,
            fn_: self.fn_ + other.fn_,
        }
    }
}

impl std::iter::Sum for ConfusionCounts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, c| acc + c)
    }
}

/// Fraction of misclassified examples
pub fn zero_one_loss(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    Ok(ConfusionCounts::compute(y_true, y_pred)?.error_rate())
}

/// Fraction of correctly classified examples
pub fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    Ok(1.0 - zero_one_loss(y_true, y_pred)?)
}

fn check_lengths(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<()> {
    if y_true.is_empty() {
        return Err(FoldwiseError::invalid("cannot score an empty label vector"));
    }
    if y_true.len() != y_pred.len() {
        return Err(FoldwiseError::invalid(format!(
            "expected {} predictions, got {}",
            y_true.len(),
            y_pred.len()
        )));
    }
    Ok(())
}

fn check_binary(what: &str, values: &Array1<f64>) -> Result<()> {
    if let Some((row, v)) = values.iter().enumerate().find(|(_, &v)| v != 0.0 && v != 1.0) {
        return Err(FoldwiseError::invalid(format!(
            "{} {} at row {} is not a class label (expected 0 or 1)",
            what, v, row
        )));
    }
    Ok(())
}
