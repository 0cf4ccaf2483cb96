//! Integration tests for configuration files and environment overrides.

use foldeval::config::{ConfigFormat, DEFAULT_CONFIG_FILE};
use foldeval::*;
use std::path::Path;
use tempfile::tempdir;

fn sample_config() -> EvaluationConfig {
    EvaluationConfigBuilder::new()
        .num_folds(4)
        .apply_threshold_selection(true)
        .thresholds(vec![0.2, 0.4, 0.6])
        .empty_fold_policy(EmptyFoldPolicy::Skip)
        .shuffle_within_strata(99)
        .dataset(DatasetConfig::new().with_group_column("date").with_delimiter(';'))
        .build()
        .unwrap()
}

#[test]
fn test_json_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("eval.json");
    let config = sample_config();

    config.save_to_file(&path).unwrap();
    let loaded = EvaluationConfig::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_toml_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(DEFAULT_CONFIG_FILE);
    let config = sample_config();

    config.save_to_file(&path).unwrap();
    let loaded = EvaluationConfig::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(ConfigFormat::from_path(&path).unwrap(), ConfigFormat::Toml);
}

#[test]
fn test_partial_toml_uses_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("partial.toml");
    std::fs::write(
        &path,
        "num_folds = 3\nempty_fold_policy = \"skip\"\n\n[dataset]\nlabel_column = \"target\"\n",
    )
    .unwrap();

    let config = EvaluationConfig::load_from_file(&path).unwrap();
    assert_eq!(config.num_folds, 3);
    assert_eq!(config.empty_fold_policy, EmptyFoldPolicy::Skip);
    assert_eq!(config.dataset.label_column, "target");
    assert_eq!(config.dataset.fold_column, "fold");
    assert_eq!(config.thresholds, default_thresholds());
}

#[test]
fn test_invalid_file_contents_rejected() {
    let dir = tempdir().unwrap();

    let path = dir.path().join("bad.json");
    std::fs::write(&path, "{\"num_folds\": 0}").unwrap();
    let err = EvaluationConfig::load_from_file(&path).unwrap_err();
    assert_eq!(err.category(), "invalid_argument");

    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "num_folds = [").unwrap();
    assert!(matches!(
        EvaluationConfig::load_from_file(&path),
        Err(FoldEvalError::Config { .. })
    ));
}

#[test]
fn test_discover_default_file() {
    let dir = tempdir().unwrap();
    assert_eq!(EvaluationConfig::discover(dir.path()).unwrap(), EvaluationConfig::default());

    std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "num_folds = 4\nnormalize_confusion_matrix = true\n")
        .unwrap();
    let config = EvaluationConfig::discover(dir.path()).unwrap();
    assert_eq!(config.num_folds, 4);
    assert!(config.normalize_confusion_matrix);
}

#[test]
fn test_unsupported_extension() {
    let config = EvaluationConfig::default();
    assert!(config.save_to_file(Path::new("config.yaml")).is_err());
    assert!(EvaluationConfig::load_from_file("missing.json").is_err());
}

// the only test in this binary that touches FOLDEVAL_* variables
#[test]
fn test_environment_overrides() {
    std::env::set_var("FOLDEVAL_NUM_FOLDS", "7");
    std::env::set_var("FOLDEVAL_APPLY_THRESHOLD_SELECTION", "true");
    std::env::set_var("FOLDEVAL_THRESHOLDS", "0.25, 0.75");
    std::env::set_var("FOLDEVAL_PARALLEL_FOLDS", "0");
    std::env::set_var("FOLDEVAL_NUM_THREADS", "2");
    std::env::set_var("FOLDEVAL_RANDOM_SEED", "1234");

    let config = EvaluationConfig::load_from_environment().unwrap();
    assert_eq!(config.num_folds, 7);
    assert!(config.apply_threshold_selection);
    assert_eq!(config.thresholds, vec![0.25, 0.75]);
    assert!(!config.parallel_folds);
    assert_eq!(config.num_threads, 2);
    assert_eq!(config.random_seed, 1234);

    std::env::set_var("FOLDEVAL_NUM_FOLDS", "zero");
    assert!(EvaluationConfig::load_from_environment().is_err());

    for name in [
        "NUM_FOLDS",
        "APPLY_THRESHOLD_SELECTION",
        "THRESHOLDS",
        "PARALLEL_FOLDS",
        "NUM_THREADS",
        "RANDOM_SEED",
    ] {
        std::env::remove_var(format!("FOLDEVAL_{}", name));
    }
    assert_eq!(EvaluationConfig::load_from_environment().unwrap(), EvaluationConfig::default());
}
