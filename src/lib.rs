//! Foldwise - seeded k-fold cross-validation for binary classifiers
//!
//! This crate estimates how well a classifier generalizes by training it on
//! k−1 folds of a dataset and scoring it on the held-out fold, k times over.
//!
//! # Modules
//!
//! - [`cross_validation`] - Fold generation and per-fold evaluation
//! - [`data`] - Validated datasets, frame conversion, synthetic data
//! - [`models`] - The [`Classifier`](models::Classifier) trait, trees,
//!   forests and boosted stumps
//! - [`metrics`] - 0-1 loss and confusion counts
//! - [`config`] - Serializable model, CV and sweep settings
//! - [`experiment`] - Model comparison and hyperparameter sweeps
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

pub mod config;
pub mod cross_validation;
pub mod data;
pub mod experiment;
pub mod metrics;
pub mod models;

pub mod cli;

pub use config::DEFAULT_SEED;
pub use cross_validation::evaluate;
pub use error::{FoldwiseError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{FoldwiseError, Result};

    // Cross-validation
    pub use crate::cross_validation::{evaluate, CVSplit, CVStrategy, CrossValidator, CvReport, FoldResult};

    // Data
    pub use crate::data::{make_classification, Dataset, IntoDataset, SyntheticConfig};

    // Models
    pub use crate::models::{BoostedStumps, Classifier, DecisionTree, MajorityClass, RandomForest};

    // Metrics
    pub use crate::metrics::{accuracy, zero_one_loss, ConfusionCounts};

    // Configuration and experiments
    pub use crate::config::{CvConfig, ExperimentConfig, ModelConfig, ModelType, SweepConfig, SweepParam, DEFAULT_SEED};
    pub use crate::experiment::{compare_models, run_sweep, ComparisonReport, SweepReport};
}
