//! Integration test: each model family under cross-validation

use foldwise::config::{CvConfig, ModelConfig, ModelType};
use foldwise::cross_validation::{CVStrategy, CrossValidator};
use foldwise::data::{make_classification, Dataset, SyntheticConfig};
use foldwise::evaluate;
use foldwise::models::{BoostedStumps, Criterion, DecisionTree, MajorityClass, MaxFeatures, RandomForest};

fn separable() -> Dataset {
    make_classification(&SyntheticConfig::new(160, 6).with_class_sep(4.0)).unwrap()
}

#[test]
fn test_decision_tree_low_cv_error() {
    let report = evaluate(&separable(), 5, || DecisionTree::new().with_max_depth(4), None).unwrap();
    assert!(report.mean_error < 0.15, "tree error {}", report.mean_error);
}

#[test]
fn test_entropy_tree_low_cv_error() {
    let factory = || DecisionTree::new().with_criterion(Criterion::Entropy);
    let report = evaluate(&separable(), 5, factory, None).unwrap();
    assert!(report.mean_error < 0.15, "entropy tree error {}", report.mean_error);
}

#[test]
fn test_random_forest_low_cv_error() {
    let factory = || RandomForest::new(25).with_max_features(MaxFeatures::Sqrt);
    let report = evaluate(&separable(), 5, factory, None).unwrap();
    assert!(report.mean_error < 0.1, "forest error {}", report.mean_error);
}

#[test]
fn test_boosted_stumps_low_cv_error() {
    let report = evaluate(&separable(), 5, || BoostedStumps::new(30, 1.0), None).unwrap();
    assert!(report.mean_error < 0.15, "boosting error {}", report.mean_error);
}

#[test]
fn test_models_beat_majority_baseline() {
    let ds = separable();
    let baseline = evaluate(&ds, 5, MajorityClass::new, None).unwrap();
    let tree = evaluate(&ds, 5, DecisionTree::new, None).unwrap();
    assert!(baseline.mean_error >= 0.4);
    assert!(tree.mean_error < baseline.mean_error);
}

#[test]
fn test_tree_respects_max_depth() {
    let ds = make_classification(&SyntheticConfig::new(200, 4).with_flip_y(0.3)).unwrap();
    for depth in [0, 1, 3, 5] {
        let mut tree = DecisionTree::new().with_max_depth(depth);
        tree.fit(ds.features(), ds.labels()).unwrap();
        assert!(tree.get_depth() <= depth);
        assert!(tree.get_n_leaves() <= 1 << depth);
    }
}

#[test]
fn test_forest_oob_error() {
    let ds = separable();
    let mut forest = RandomForest::new(30).with_oob_score(true);
    forest.fit(ds.features(), ds.labels()).unwrap();

    let oob = forest.oob_error().unwrap();
    assert!((0.0..0.2).contains(&oob), "oob error {}", oob);
    assert_eq!(forest.n_trees(), 30);
}

#[test]
fn test_configured_models_match_concrete_models() {
    let ds = separable();
    let cv = CvConfig::k_fold(4).with_random_state(5);
    let validator = CrossValidator::from_config(&cv);

    let config = ModelConfig::new(ModelType::DecisionTree).with_max_depth(3);
    let boxed = validator.evaluate(&ds, || config.build()).unwrap();
    let concrete = validator
        .evaluate(&ds, || DecisionTree::new().with_max_depth(3))
        .unwrap();

    assert_eq!(boxed, concrete);
}

#[test]
fn test_different_seeds_change_folds_not_validity() {
    let ds = separable();
    let a = CrossValidator::new(CVStrategy::KFold { n_splits: 5, shuffle: true })
        .with_random_state(1)
        .evaluate(&ds, DecisionTree::new)
        .unwrap();
    let b = CrossValidator::new(CVStrategy::KFold { n_splits: 5, shuffle: true })
        .with_random_state(2)
        .evaluate(&ds, DecisionTree::new)
        .unwrap();

    assert_eq!(a.n_folds, b.n_folds);
    assert_eq!(a.confusion.total(), b.confusion.total());
}
