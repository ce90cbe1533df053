//! Labeled binary-classification datasets
//!
//! A [`Dataset`] is a feature matrix paired with a `{0, 1}` label vector.
//! Construction validates the shape and label invariants once so that the
//! cross-validator and the models can index rows freely afterwards.
//!
//! Inputs arrive either as dense `ndarray` arrays or as a polars
//! [`DataFrame`] with a named target column; [`IntoDataset`] normalizes both.

mod synthetic;

pub use synthetic::{make_classification, SyntheticConfig};

use crate::error::{FoldwiseError, Result};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use std::borrow::Cow;

/// Feature matrix plus binary labels
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    features: Array2<f64>,
    labels: Array1<f64>,
    feature_names: Option<Vec<String>>,
}

impl Dataset {
    /// Build a dataset, checking that rows line up, the matrix is non-empty,
    /// every feature is finite and every label is exactly 0 or 1.
    pub fn new(features: Array2<f64>, labels: Array1<f64>) -> Result<Self> {
        validate_shape(&features, &labels)?;
        validate_labels(&labels)?;
        if let Some(((row, col), _)) = features.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(FoldwiseError::invalid(format!(
                "feature at row {}, column {} is not finite",
                row, col
            )));
        }

        Ok(Self {
            features,
            labels,
            feature_names: None,
        })
    }

    /// Attach column names
    pub fn with_feature_names(mut self, names: Vec<String>) -> Result<Self> {
        if names.len() != self.n_features() {
            return Err(FoldwiseError::invalid(format!(
                "got {} feature names for {} feature columns",
                names.len(),
                self.n_features()
            )));
        }
        self.feature_names = Some(names);
        Ok(self)
    }

    /// Build a dataset from a frame. Every column except `target` becomes a
    /// feature, in frame order. Columns are cast to `f64`; nulls are rejected.
    pub fn from_dataframe(df: &DataFrame, target: &str) -> Result<Self> {
        let feature_cols: Vec<String> = df
            .get_column_names()
            .into_iter()
            .filter(|name| name.as_str() != target)
            .map(|name| name.to_string())
            .collect();

        if df.column(target).is_err() {
            return Err(FoldwiseError::invalid(format!(
                "target column '{}' not found",
                target
            )));
        }

        let labels = Array1::from_vec(column_to_f64(df, target)?);
        let features = columns_to_array2(df, &feature_cols)?;

        Self::new(features, labels)?.with_feature_names(feature_cols)
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn labels(&self) -> &Array1<f64> {
        &self.labels
    }

    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    /// Copy out the rows at `indices`, in that order
    pub fn select(&self, indices: &[usize]) -> (Array2<f64>, Array1<f64>) {
        let x = self.features.select(Axis(0), indices);
        let y = self.labels.select(Axis(0), indices);
        (x, y)
    }

    /// Number of examples per class, `[negatives, positives]`
    pub fn class_counts(&self) -> [usize; 2] {
        let positives = self.labels.iter().filter(|&&v| v == 1.0).count();
        [self.n_samples() - positives, positives]
    }
}

fn validate_shape(features: &Array2<f64>, labels: &Array1<f64>) -> Result<()> {
    if features.nrows() == 0 {
        return Err(FoldwiseError::invalid("dataset has no rows"));
    }
    if features.ncols() == 0 {
        return Err(FoldwiseError::invalid("dataset has no feature columns"));
    }
    if features.nrows() != labels.len() {
        return Err(FoldwiseError::invalid(format!(
            "feature matrix has {} rows but label vector has {}",
            features.nrows(),
            labels.len()
        )));
    }
    Ok(())
}

fn validate_labels(labels: &Array1<f64>) -> Result<()> {
    if let Some((idx, value)) = labels
        .iter()
        .enumerate()
        .find(|(_, &v)| v != 0.0 && v != 1.0)
    {
        return Err(FoldwiseError::invalid(format!(
            "label {} at row {} is not binary (expected 0 or 1)",
            value, idx
        )));
    }
    Ok(())
}

fn column_to_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = df
        .column(name)
        .map_err(|_| FoldwiseError::invalid(format!("column '{}' not found", name)))?;
    let series_f64 = series.cast(&DataType::Float64)?;

    series_f64
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| {
                FoldwiseError::invalid(format!("column '{}' has a null at row {}", name, row))
            })
        })
        .collect()
}

/// Extract named columns into a row-major matrix
fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|name| column_to_f64(df, name))
        .collect::<Result<Vec<_>>>()?;

    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_data[c][r]))
}

/// Anything the cross-validator accepts as input data.
///
/// Borrowed datasets pass through untouched; arrays and frames are validated
/// and converted.
pub trait IntoDataset<'a> {
    fn into_dataset(self) -> Result<Cow<'a, Dataset>>;
}

impl<'a> IntoDataset<'a> for &'a Dataset {
    fn into_dataset(self) -> Result<Cow<'a, Dataset>> {
        Ok(Cow::Borrowed(self))
    }
}

impl<'a> IntoDataset<'a> for Dataset {
    fn into_dataset(self) -> Result<Cow<'a, Dataset>> {
        Ok(Cow::Owned(self))
    }
}

impl<'a> IntoDataset<'a> for (Array2<f64>, Array1<f64>) {
    fn into_dataset(self) -> Result<Cow<'a, Dataset>> {
        Dataset::new(self.0, self.1).map(Cow::Owned)
    }
}

impl<'a, 'b> IntoDataset<'a> for (&'b Array2<f64>, &'b Array1<f64>) {
    fn into_dataset(self) -> Result<Cow<'a, Dataset>> {
        Dataset::new(self.0.to_owned(), self.1.to_owned()).map(Cow::Owned)
    }
}

impl<'a, 'b> IntoDataset<'a> for (&'b DataFrame, &'b str) {
    fn into_dataset(self) -> Result<Cow<'a, Dataset>> {
        Dataset::from_dataframe(self.0, self.1).map(Cow::Owned)
    }
}
