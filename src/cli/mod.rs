//! Foldwise CLI Module
//!
//! Command-line interface for model comparison and hyperparameter sweeps on
//! seeded synthetic data.

use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::time::Instant;

use crate::config::{CvConfig, ExperimentConfig, ModelConfig, ModelType, SweepConfig, SweepParam};
use crate::data::{make_classification, Dataset, SyntheticConfig};
use crate::experiment::{compare_models, run_sweep, SweepReport};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "foldwise")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Seeded k-fold cross-validation for binary classifiers")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Cross-validate every configured model on the same folds
    Compare {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Cross-validate one model at each value of one hyperparameter
    Sweep {
        #[command(flatten)]
        run: RunArgs,

        /// Model type (majority, tree, forest, boosting)
        #[arg(short, long, default_value = "tree")]
        model: ModelType,

        /// Hyperparameter (max_depth, min_samples_leaf, n_estimators, max_features)
        #[arg(short, long, default_value = "max_depth")]
        param: SweepParam,

        /// Comma-separated values to try
        #[arg(long, value_delimiter = ',', default_value = "1,2,3,4,6,8")]
        values: Vec<usize>,
    },
}

/// Options shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Number of synthetic samples
    #[arg(long, default_value = "200")]
    pub samples: usize,

    /// Number of synthetic features
    #[arg(long, default_value = "6")]
    pub features: usize,

    /// Distance between the class means
    #[arg(long, default_value = "2.0")]
    pub class_sep: f64,

    /// Number of cross-validation folds
    #[arg(short = 'k', long, default_value = "5")]
    pub folds: usize,

    /// Seed for the data, the folds and the models
    #[arg(short, long, default_value_t = crate::DEFAULT_SEED)]
    pub seed: u64,

    /// Evaluate folds in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Experiment file (JSON); its models, sweeps and CV settings replace
    /// the command-line ones
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl RunArgs {
    fn cv_config(&self) -> CvConfig {
        CvConfig::k_fold(self.folds)
            .with_random_state(self.seed)
            .with_parallel(self.parallel)
    }

    fn load_experiment(&self) -> anyhow::Result<Option<ExperimentConfig>> {
        match &self.config {
            Some(path) => {
                let mut config = ExperimentConfig::from_json_file(path)?;
                config.cv.parallel |= self.parallel;
                Ok(Some(config))
            }
            None => Ok(None),
        }
    }

    fn dataset(&self) -> anyhow::Result<Dataset> {
        step_run("Generating data");
        let start = Instant::now();
        let dataset = make_classification(
            &SyntheticConfig::new(self.samples, self.features)
                .with_class_sep(self.class_sep)
                .with_random_state(self.seed),
        )?;
        let [negatives, positives] = dataset.class_counts();
        step_done(&format!(
            "{} rows × {} features, {}/{} split ({:.2?})",
            dataset.n_samples(),
            dataset.n_features(),
            negatives,
            positives,
            start.elapsed()
        ));
        Ok(dataset)
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_compare(args: &RunArgs) -> anyhow::Result<()> {
    section("Model comparison");

    let (models, cv) = match args.load_experiment()? {
        Some(config) => (config.models, config.cv),
        None => {
            let models = ExperimentConfig::default()
                .models
                .into_iter()
                .map(|m| m.with_random_state(args.seed))
                .collect();
            (models, args.cv_config())
        }
    };

    let dataset = args.dataset()?;

    step_run("Cross-validating");
    let start = Instant::now();
    let report = compare_models(&dataset, &models, &cv)?;
    step_done(&format!("{} models ({:.2?})", models.len(), start.elapsed()));

    println!();
    println!(
        "  {:<18} {:>10} {:>10} {:>10} {:>10}",
        muted("Model"),
        muted("CV error"),
        muted("Std"),
        muted("F1"),
        muted("Time")
    );
    println!("  {}", dim(&"─".repeat(62)));

    for entry in &report.entries {
        println!(
            "  {:<18} {:>10.4} {:>10.4} {:>10.4} {:>9.2}s",
            entry.model_name,
            entry.report.mean_error,
            entry.report.std_error,
            entry.report.confusion.f1(),
            entry.elapsed_secs
        );
    }

    println!("  {}", dim(&"─".repeat(62)));

    if let Some(best) = report.best() {
        println!();
        println!(
            "  {} {} {} {:.4}",
            ok("best"),
            best.model_name.white().bold(),
            muted("CV error:"),
            best.report.mean_error
        );
    }
    println!();

    Ok(())
}

pub fn cmd_sweep(
    args: &RunArgs,
    model: ModelType,
    param: SweepParam,
    values: &[usize],
) -> anyhow::Result<()> {
    section("Hyperparameter sweep");

    let (sweeps, cv) = match args.load_experiment()? {
        Some(config) => {
            if config.sweeps.is_empty() {
                anyhow::bail!("experiment file defines no sweeps");
            }
            (config.sweeps, config.cv)
        }
        None => {
            let base = ModelConfig::new(model).with_random_state(args.seed);
            (vec![SweepConfig::new(base, param, values.to_vec())], args.cv_config())
        }
    };

    let dataset = args.dataset()?;

    for sweep in &sweeps {
        step_run(&format!("Sweeping {} over {}", sweep.model.display_name(), sweep.param));
        let start = Instant::now();
        let report = run_sweep(&dataset, sweep, &cv)?;
        step_done(&format!("{} values ({:.2?})", sweep.values.len(), start.elapsed()));
        print_sweep(&report);
    }

    Ok(())
}

fn print_sweep(report: &SweepReport) {
    let best_value = report.best().map(|p| p.value);
    let header = report.param.as_str();

    println!();
    println!(
        "  {:<18} {:>10} {:>10} {:>10}",
        muted(header),
        muted("CV error"),
        muted("Std"),
        muted("Train err")
    );
    println!("  {}", dim(&"─".repeat(51)));

    for point in &report.points {
        let marker = if Some(point.value) == best_value { ok("◆") } else { dim(" ") };
        println!(
            "{} {:<18} {:>10.4} {:>10.4} {:>10.4}",
            marker,
            point.value,
            point.report.mean_error,
            point.report.std_error,
            point.train_error
        );
    }

    println!("  {}", dim(&"─".repeat(51)));

    if let Some(best) = report.best() {
        println!();
        println!(
            "  {} {} {} {} {:.4}",
            ok("best"),
            format!("{} = {}", header, best.value).white().bold(),
            muted(&report.model_name),
            muted("CV error:"),
            best.report.mean_error
        );
    }
    println!();
}
