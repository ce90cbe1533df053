//! Experiment runner
//!
//! Model comparison runs one cross-validation per configured model over the
//! same folds. A sweep varies one hyperparameter of one model and records
//! both the held-out error and the training error at each value, which is
//! what exposes over- and under-fitting.

use crate::config::{CvConfig, ModelConfig, SweepConfig, SweepParam};
use crate::cross_validation::{CrossValidator, CvReport};
use crate::data::IntoDataset;
use crate::error::{FoldwiseError, Result};
use crate::metrics::zero_one_loss;
use crate::models::Classifier;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Model comparison entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelComparison {
    pub model_name: String,
    pub config: ModelConfig,
    pub report: CvReport,
    /// Wall-clock time of the whole cross-validation run
    pub elapsed_secs: f64,
}

/// Every model's result, in configuration order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub entries: Vec<ModelComparison>,
}

impl ComparisonReport {
    /// Lowest mean CV error; the first one listed wins a tie
    pub fn best(&self) -> Option<&ModelComparison> {
        self.entries.iter().fold(None, |best: Option<&ModelComparison>, entry| match best {
            Some(b) if b.report.mean_error <= entry.report.mean_error => Some(b),
            _ => Some(entry),
        })
    }
}

/// Cross-validate every model in `models` on the same folds
pub fn compare_models<'a, D: IntoDataset<'a>>(
    data: D,
    models: &[ModelConfig],
    cv: &CvConfig,
) -> Result<ComparisonReport> {
    if models.is_empty() {
        return Err(FoldwiseError::invalid("no models to compare"));
    }
    let dataset = data.into_dataset()?;
    let validator = CrossValidator::from_config(cv);

    let mut entries = Vec::with_capacity(models.len());
    for config in models {
        let start = Instant::now();
        let report = validator.evaluate(&dataset, || config.build())?;
        let elapsed_secs = start.elapsed().as_secs_f64();

        info!(
            model = config.display_name(),
            mean_error = report.mean_error,
            elapsed_secs,
            "model evaluated"
        );

        entries.push(ModelComparison {
            model_name: config.display_name().to_string(),
            config: config.clone(),
            report,
            elapsed_secs,
        });
    }

    Ok(ComparisonReport { entries })
}

/// One value of a swept hyperparameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepPoint {
    pub value: usize,
    pub report: CvReport,
    /// Error of a model fitted and scored on the full dataset
    pub train_error: f64,
}

/// Results of one hyperparameter sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub model_name: String,
    pub param: SweepParam,
    pub points: Vec<SweepPoint>,
}

impl SweepReport {
    /// Value with the lowest mean CV error. Ties keep the earliest value.
    pub fn best(&self) -> Option<&SweepPoint> {
        self.points.iter().fold(None, |best: Option<&SweepPoint>, point| match best {
            Some(b) if b.report.mean_error <= point.report.mean_error => Some(b),
            _ => Some(point),
        })
    }

    /// Gap between held-out and training error at each value
    pub fn generalization_gaps(&self) -> Vec<(usize, f64)> {
        self.points
            .iter()
            .map(|p| (p.value, p.report.mean_error - p.train_error))
            .collect()
    }
}

/// Cross-validate `sweep.model` once per entry of `sweep.values`
pub fn run_sweep<'a, D: IntoDataset<'a>>(
    data: D,
    sweep: &SweepConfig,
    cv: &CvConfig,
) -> Result<SweepReport> {
    if sweep.values.is_empty() {
        return Err(FoldwiseError::invalid(format!(
            "sweep over {} has no values",
            sweep.param
        )));
    }
    // Reject an inapplicable parameter before any work is done
    let configs: Vec<ModelConfig> = sweep
        .values
        .iter()
        .map(|&v| sweep.param.apply(&sweep.model, v))
        .collect::<Result<_>>()?;

    let dataset = data.into_dataset()?;
    let validator = CrossValidator::from_config(cv);

    let mut points = Vec::with_capacity(configs.len());
    for (config, &value) in configs.iter().zip(sweep.values.iter()) {
        let report = validator.evaluate(&dataset, || config.build())?;

        let mut model = config.build();
        model.fit(dataset.features(), dataset.labels())?;
        let train_error = zero_one_loss(dataset.labels(), &model.predict(dataset.features())?)?;

        info!(
            model = config.display_name(),
            param = %sweep.param,
            value,
            cv_error = report.mean_error,
            train_error,
            "sweep point evaluated"
        );

        points.push(SweepPoint {
            value,
            report,
            train_error,
        });
    }

    Ok(SweepReport {
        model_name: sweep.model.display_name().to_string(),
        param: sweep.param,
        points,
    })
}
