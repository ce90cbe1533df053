//! Experiment configuration
//!
//! Plain serde structs with builder methods. An [`ExperimentConfig`] can be
//! stored as JSON and handed to the `foldwise` binary with `--config`.

use crate::cross_validation::CVStrategy;
use crate::error::{FoldwiseError, Result};
use crate::models::{BoostedStumps, Classifier, Criterion, DecisionTree, MajorityClass, MaxFeatures, RandomForest};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Seed used wherever the caller does not pass one
pub const DEFAULT_SEED: u64 = 42;

/// Model family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    /// Always predicts the most frequent training label
    MajorityClass,
    DecisionTree,
    RandomForest,
    /// AdaBoost over depth-1 trees
    BoostedStumps,
}

impl ModelType {
    pub fn display_name(self) -> &'static str {
        match self {
            ModelType::MajorityClass => "Majority Class",
            ModelType::DecisionTree => "Decision Tree",
            ModelType::RandomForest => "Random Forest",
            ModelType::BoostedStumps => "Boosted Stumps",
        }
    }
}

impl std::str::FromStr for ModelType {
    type Err = FoldwiseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "majority" | "majority_class" => Ok(ModelType::MajorityClass),
            "tree" | "decision_tree" => Ok(ModelType::DecisionTree),
            "forest" | "random_forest" => Ok(ModelType::RandomForest),
            "boosting" | "boosted_stumps" | "adaboost" => Ok(ModelType::BoostedStumps),
            _ => Err(FoldwiseError::ConfigError(format!("unknown model type: {}", s))),
        }
    }
}

/// Hyperparameters for one model. Fields that don't apply to the chosen
/// `model_type` are ignored by [`ModelConfig::build`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub model_type: ModelType,

    // Tree parameters
    /// Maximum number of split levels
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub criterion: Criterion,

    // Ensemble parameters
    /// Trees in a forest or boosting rounds
    pub n_estimators: usize,
    /// Boosting only
    pub learning_rate: f64,
    /// Forest only
    pub max_features: MaxFeatures,
    /// Forest only
    pub bootstrap: bool,
    /// Forest only
    pub oob_score: bool,

    /// Seed for forest bootstraps and feature sampling
    pub random_state: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_type: ModelType::DecisionTree,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: Criterion::Gini,
            n_estimators: 100,
            learning_rate: 1.0,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            oob_score: false,
            random_state: DEFAULT_SEED,
        }
    }
}

impl ModelConfig {
    /// Defaults for a model family. Boosting starts at 50 rounds.
    pub fn new(model_type: ModelType) -> Self {
        let n_estimators = match model_type {
            ModelType::BoostedStumps => 50,
            _ => 100,
        };
        Self {
            model_type,
            n_estimators,
            ..Default::default()
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_oob_score(mut self, oob_score: bool) -> Self {
        self.oob_score = oob_score;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn display_name(&self) -> &'static str {
        self.model_type.display_name()
    }

    /// Construct a fresh, untrained model. Hyperparameter ranges are checked
    /// by the model when it is fitted.
    pub fn build(&self) -> Box<dyn Classifier> {
        match self.model_type {
            ModelType::MajorityClass => Box::new(MajorityClass::new()),
            ModelType::DecisionTree => {
                let mut tree = DecisionTree::new()
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_criterion(self.criterion)
                    .with_random_state(self.random_state);
                if let Some(depth) = self.max_depth {
                    tree = tree.with_max_depth(depth);
                }
                Box::new(tree)
            }
            ModelType::RandomForest => {
                let mut forest = RandomForest::new(self.n_estimators)
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_criterion(self.criterion)
                    .with_max_features(self.max_features)
                    .with_bootstrap(self.bootstrap)
                    .with_oob_score(self.oob_score)
                    .with_random_state(self.random_state);
                if let Some(depth) = self.max_depth {
                    forest = forest.with_max_depth(depth);
                }
                Box::new(forest)
            }
            ModelType::BoostedStumps => {
                Box::new(BoostedStumps::new(self.n_estimators, self.learning_rate))
            }
        }
    }
}

/// Cross-validation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CvConfig {
    pub strategy: CVStrategy,
    /// Seed for the fold permutation
    pub random_state: u64,
    /// Evaluate folds on the rayon pool
    pub parallel: bool,
}

impl Default for CvConfig {
    fn default() -> Self {
        Self {
            strategy: CVStrategy::default(),
            random_state: DEFAULT_SEED,
            parallel: false,
        }
    }
}

impl CvConfig {
    /// Shuffled k-fold
    pub fn k_fold(n_splits: usize) -> Self {
        Self {
            strategy: CVStrategy::KFold { n_splits, shuffle: true },
            ..Default::default()
        }
    }

    pub fn with_strategy(mut self, strategy: CVStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Hyperparameter a sweep varies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepParam {
    /// Trees and forests
    MaxDepth,
    /// Trees and forests
    MinSamplesLeaf,
    /// Forests and boosting
    NEstimators,
    /// Forests: fixed number of features per split
    MaxFeatures,
}

impl SweepParam {
    pub fn as_str(self) -> &'static str {
        match self {
            SweepParam::MaxDepth => "max_depth",
            SweepParam::MinSamplesLeaf => "min_samples_leaf",
            SweepParam::NEstimators => "n_estimators",
            SweepParam::MaxFeatures => "max_features",
        }
    }

    fn applies_to(self, model_type: ModelType) -> bool {
        matches!(
            (self, model_type),
            (SweepParam::MaxDepth, ModelType::DecisionTree | ModelType::RandomForest)
                | (SweepParam::MinSamplesLeaf, ModelType::DecisionTree | ModelType::RandomForest)
                | (SweepParam::NEstimators, ModelType::RandomForest | ModelType::BoostedStumps)
                | (SweepParam::MaxFeatures, ModelType::RandomForest)
        )
    }

    /// Copy of `base` with this parameter set to `value`
    pub fn apply(self, base: &ModelConfig, value: usize) -> Result<ModelConfig> {
        if !self.applies_to(base.model_type) {
            return Err(FoldwiseError::invalid(format!(
                "{} does not apply to {}",
                self.as_str(),
                base.display_name()
            )));
        }

        let mut config = base.clone();
        match self {
            SweepParam::MaxDepth => config.max_depth = Some(value),
            SweepParam::MinSamplesLeaf => config.min_samples_leaf = value,
            SweepParam::NEstimators => config.n_estimators = value,
            SweepParam::MaxFeatures => config.max_features = MaxFeatures::Fixed(value),
        }
        Ok(config)
    }
}

impl std::fmt::Display for SweepParam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SweepParam {
    type Err = FoldwiseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "max_depth" => Ok(SweepParam::MaxDepth),
            "min_samples_leaf" => Ok(SweepParam::MinSamplesLeaf),
            "n_estimators" => Ok(SweepParam::NEstimators),
            "max_features" => Ok(SweepParam::MaxFeatures),
            _ => Err(FoldwiseError::ConfigError(format!("unknown sweep parameter: {}", s))),
        }
    }
}

/// One hyperparameter sweep: vary `param` over `values` on top of `model`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub model: ModelConfig,
    pub param: SweepParam,
    pub values: Vec<usize>,
}

impl SweepConfig {
    pub fn new(model: ModelConfig, param: SweepParam, values: Vec<usize>) -> Self {
        Self { model, param, values }
    }
}

/// A full run: which models to compare and which sweeps to perform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub cv: CvConfig,
    pub models: Vec<ModelConfig>,
    pub sweeps: Vec<SweepConfig>,
}

impl Default for ExperimentConfig {
    /// The three model families against the majority baseline, 5-fold CV
    fn default() -> Self {
        Self {
            cv: CvConfig::k_fold(5),
            models: vec![
                ModelConfig::new(ModelType::MajorityClass),
                ModelConfig::new(ModelType::DecisionTree),
                ModelConfig::new(ModelType::RandomForest),
                ModelConfig::new(ModelType::BoostedStumps),
            ],
            sweeps: Vec::new(),
        }
    }
}

impl ExperimentConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
