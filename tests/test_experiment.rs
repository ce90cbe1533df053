//! Integration test: comparisons, sweeps and experiment files

use foldwise::config::{CvConfig, ExperimentConfig, ModelConfig, ModelType, SweepConfig, SweepParam};
use foldwise::cross_validation::CVStrategy;
use foldwise::data::{make_classification, SyntheticConfig};
use foldwise::experiment::{compare_models, run_sweep};
use foldwise::models::MaxFeatures;
use foldwise::FoldwiseError;

#[test]
fn test_default_experiment_runs() {
    let ds = make_classification(&SyntheticConfig::new(100, 4).with_class_sep(3.0)).unwrap();
    let config = ExperimentConfig::default();

    let report = compare_models(&ds, &config.models, &config.cv).unwrap();
    assert_eq!(report.entries.len(), 4);
    assert_ne!(report.best().unwrap().model_name, "Majority Class");
    for entry in &report.entries {
        assert_eq!(entry.report.n_folds, 5);
        assert!(entry.elapsed_secs >= 0.0);
    }
}

#[test]
fn test_forest_sweep_over_estimators() {
    let ds = make_classification(&SyntheticConfig::new(80, 4)).unwrap();
    let sweep = SweepConfig::new(
        ModelConfig::new(ModelType::RandomForest),
        SweepParam::NEstimators,
        vec![1, 5, 15],
    );

    let report = run_sweep(&ds, &sweep, &CvConfig::k_fold(4)).unwrap();
    assert_eq!(report.model_name, "Random Forest");
    assert_eq!(report.points.iter().map(|p| p.value).collect::<Vec<_>>(), vec![1, 5, 15]);
    let best = report.best().unwrap();
    assert!(report.points.iter().all(|p| p.report.mean_error >= best.report.mean_error));
}

#[test]
fn test_boosting_sweep_rejects_tree_params() {
    let ds = make_classification(&SyntheticConfig::new(40, 2)).unwrap();
    let sweep = SweepConfig::new(
        ModelConfig::new(ModelType::BoostedStumps),
        SweepParam::MaxDepth,
        vec![1, 2],
    );
    let err = run_sweep(&ds, &sweep, &CvConfig::default()).unwrap_err();
    assert!(matches!(err, FoldwiseError::InvalidArgument(_)));
}

#[test]
fn test_experiment_config_json_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("experiment.json");

    let config = ExperimentConfig {
        cv: CvConfig::default()
            .with_strategy(CVStrategy::StratifiedKFold { n_splits: 3, shuffle: true })
            .with_random_state(7)
            .with_parallel(true),
        models: vec![ModelConfig::new(ModelType::RandomForest)
            .with_n_estimators(12)
            .with_max_features(MaxFeatures::Fraction(0.5))],
        sweeps: vec![SweepConfig::new(
            ModelConfig::new(ModelType::DecisionTree),
            SweepParam::MinSamplesLeaf,
            vec![1, 5, 10],
        )],
    };
    config.to_json_file(&path).unwrap();

    let loaded = ExperimentConfig::from_json_file(&path).unwrap();
    assert_eq!(loaded.cv.strategy, config.cv.strategy);
    assert_eq!(loaded.cv.random_state, 7);
    assert!(loaded.cv.parallel);
    assert_eq!(loaded.models, config.models);
    assert_eq!(loaded.sweeps, config.sweeps);
}

#[test]
fn test_partial_json_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.json");
    std::fs::write(&path, r#"{ "models": [ { "model_type": "boosted_stumps" } ] }"#).unwrap();

    let loaded = ExperimentConfig::from_json_file(&path).unwrap();
    assert_eq!(loaded.cv.random_state, foldwise::DEFAULT_SEED);
    assert_eq!(loaded.models.len(), 1);
    assert_eq!(loaded.models[0].model_type, ModelType::BoostedStumps);
    assert!(loaded.sweeps.is_empty());
}

#[test]
fn test_missing_config_file_is_io_error() {
    let err = ExperimentConfig::from_json_file("/nonexistent/foldwise.json").unwrap_err();
    assert!(matches!(err, FoldwiseError::IoError(_)));
}
