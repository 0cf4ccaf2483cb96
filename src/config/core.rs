//! Evaluation configuration and its builder.

use crate::config::{ConfigFormat, DEFAULT_CONFIG_FILE};
use crate::core::constants::*;
use crate::core::error::{FoldEvalError, Result};
use crate::core::types::*;
use crate::dataset::DatasetConfig;
use crate::metrics::ThresholdGrid;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Settings for fold assignment, metric computation and cross-fold averaging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    // Fold assignment
    /// Number of cross-validation folds
    pub num_folds: usize,
    /// Shuffle each stratum before taking running indices
    pub shuffle_within_strata: bool,
    /// Seed for the stratum shuffle
    pub random_seed: u64,

    // Metrics
    /// Run the threshold sweep on every fold
    pub apply_threshold_selection: bool,
    /// Candidate thresholds for the sweep
    pub thresholds: Vec<f64>,
    /// Column-normalize the confusion matrix of standalone metric reports
    pub normalize_confusion_matrix: bool,

    // Aggregation
    /// Evaluate folds concurrently
    pub parallel_folds: bool,
    /// Worker threads for fold evaluation (0 = rayon global pool)
    pub num_threads: usize,
    /// Handling of folds without rows
    pub empty_fold_policy: EmptyFoldPolicy,

    /// Tabular column layout
    pub dataset: DatasetConfig,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        EvaluationConfig {
            num_folds: DEFAULT_NUM_FOLDS,
            shuffle_within_strata: false,
            random_seed: DEFAULT_RANDOM_SEED,
            apply_threshold_selection: false,
            thresholds: default_thresholds(),
            normalize_confusion_matrix: false,
            parallel_folds: true,
            num_threads: 0,
            empty_fold_policy: EmptyFoldPolicy::default(),
            dataset: DatasetConfig::default(),
        }
    }
}

impl EvaluationConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.num_folds == 0 {
            return Err(FoldEvalError::invalid_argument(
                "num_folds",
                self.num_folds.to_string(),
                "must be a positive integer",
            ));
        }

        // same checks the sweep applies
        ThresholdGrid::new(self.thresholds.clone())?;

        if self.num_threads > num_cpus::get() * 2 {
            log::warn!(
                "num_threads = {} is more than twice the {} available cores",
                self.num_threads,
                num_cpus::get()
            );
        }

        if self.dataset.label_column.is_empty() {
            return Err(FoldEvalError::invalid_argument(
                "label_column",
                "\"\"",
                "must name a column",
            ));
        }

        if !self.dataset.delimiter.is_ascii() {
            return Err(FoldEvalError::invalid_argument(
                "delimiter",
                self.dataset.delimiter.to_string(),
                "must be a single ASCII character",
            ));
        }

        let reserved = self.dataset.reserved_columns();
        for (i, name) in reserved.iter().enumerate() {
            if reserved[..i].contains(name) {
                return Err(FoldEvalError::invalid_argument(
                    "dataset",
                    name.to_string(),
                    "reserved column names must be distinct",
                ));
            }
        }

        Ok(())
    }

    /// The validated threshold grid
    pub fn threshold_grid(&self) -> Result<ThresholdGrid> {
        ThresholdGrid::new(self.thresholds.clone())
    }

    /// Shuffle seed handed to the fold assigner, if shuffling is on
    pub fn shuffle_seed(&self) -> Option<u64> {
        self.shuffle_within_strata.then_some(self.random_seed)
    }

    /// Get the effective number of threads (0 means use all available cores)
    pub fn effective_num_threads(&self) -> usize {
        if self.num_threads == 0 {
            num_cpus::get()
        } else {
            self.num_threads
        }
    }

    /// Load configuration from a `.json` or `.toml` file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| FoldEvalError::config(format!("Failed to read config file: {}", e)))?;

        let config: EvaluationConfig = match ConfigFormat::from_path(path)? {
            ConfigFormat::Json => serde_json::from_str(&content)
                .map_err(|e| FoldEvalError::config(format!("Failed to parse JSON config: {}", e)))?,
            ConfigFormat::Toml => toml::from_str(&content)
                .map_err(|e| FoldEvalError::config(format!("Failed to parse TOML config: {}", e)))?,
        };

        config.validate()?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load `foldeval.toml` from `dir` if it exists, defaults otherwise.
    pub fn discover<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let path = dir.as_ref().join(DEFAULT_CONFIG_FILE);
        if path.is_file() {
            log::info!("Using configuration {}", path.display());
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a `.json` or `.toml` file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match ConfigFormat::from_path(path)? {
            ConfigFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| FoldEvalError::config(format!("Failed to serialize to JSON: {}", e)))?,
            ConfigFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| FoldEvalError::config(format!("Failed to serialize to TOML: {}", e)))?,
        };

        std::fs::write(path, content)
            .map_err(|e| FoldEvalError::config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Load configuration from `FOLDEVAL_*` environment variables on top of
    /// the defaults.
    pub fn load_from_environment() -> Result<Self> {
        let mut config = EvaluationConfig::default();
        config.apply_environment_overrides()?;
        Ok(config)
    }

    /// Overwrite fields whose `FOLDEVAL_*` variable is set
    pub fn apply_environment_overrides(&mut self) -> Result<()> {
        if let Some(val) = env_value("NUM_FOLDS")? {
            self.num_folds = val;
        }
        if let Some(val) = env_flag("APPLY_THRESHOLD_SELECTION")? {
            self.apply_threshold_selection = val;
        }
        if let Some(raw) = env_raw("THRESHOLDS") {
            self.thresholds = parse_threshold_list(&raw)
                .map_err(|_| FoldEvalError::config(format!("Invalid {}THRESHOLDS", ENV_PREFIX)))?;
        }
        if let Some(val) = env_flag("PARALLEL_FOLDS")? {
            self.parallel_folds = val;
        }
        if let Some(val) = env_value("NUM_THREADS")? {
            self.num_threads = val;
        }
        if let Some(val) = env_value("RANDOM_SEED")? {
            self.random_seed = val;
        }

        self.validate()
    }
}

/// Parse a comma separated threshold list such as `0.2,0.5,0.8`.
pub fn parse_threshold_list(raw: &str) -> Result<Vec<f64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>().map_err(|_| {
                FoldEvalError::invalid_argument("thresholds", s, "not a number")
            })
        })
        .collect()
}

fn env_raw(name: &str) -> Option<String> {
    std::env::var(format!("{}{}", ENV_PREFIX, name)).ok()
}

fn env_value<T: FromStr>(name: &str) -> Result<Option<T>> {
    env_raw(name)
        .map(|val| {
            val.trim()
                .parse()
                .map_err(|_| FoldEvalError::config(format!("Invalid {}{}", ENV_PREFIX, name)))
        })
        .transpose()
}

fn env_flag(name: &str) -> Result<Option<bool>> {
    env_raw(name)
        .map(|val| match val.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(FoldEvalError::config(format!("Invalid {}{}", ENV_PREFIX, name))),
        })
        .transpose()
}

/// Configuration builder for fluent configuration creation
#[derive(Debug, Clone)]
pub struct EvaluationConfigBuilder {
    config: EvaluationConfig,
    validation_errors: Vec<String>,
}

impl EvaluationConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        EvaluationConfigBuilder {
            config: EvaluationConfig::default(),
            validation_errors: Vec::new(),
        }
    }

    /// Set the number of folds
    pub fn num_folds(mut self, num_folds: usize) -> Self {
        if num_folds == 0 {
            self.validation_errors
                .push("num_folds must be a positive integer".to_string());
        }
        self.config.num_folds = num_folds;
        self
    }

    /// Enable the threshold sweep
    pub fn apply_threshold_selection(mut self, apply: bool) -> Self {
        self.config.apply_threshold_selection = apply;
        self
    }

    /// Set the candidate thresholds
    pub fn thresholds(mut self, thresholds: Vec<f64>) -> Self {
        if thresholds.is_empty() {
            self.validation_errors
                .push("thresholds must not be empty".to_string());
        }
        if thresholds.iter().any(|&t| !(t > 0.0 && t < 1.0)) {
            self.validation_errors
                .push("thresholds must lie strictly between 0 and 1".to_string());
        }
        self.config.thresholds = thresholds;
        self
    }

    pub fn normalize_confusion_matrix(mut self, normalize: bool) -> Self {
        self.config.normalize_confusion_matrix = normalize;
        self
    }

    pub fn parallel_folds(mut self, parallel: bool) -> Self {
        self.config.parallel_folds = parallel;
        self
    }

    /// Set the number of worker threads
    pub fn num_threads(mut self, threads: usize) -> Self {
        self.config.num_threads = threads;
        self
    }

    pub fn empty_fold_policy(mut self, policy: EmptyFoldPolicy) -> Self {
        self.config.empty_fold_policy = policy;
        self
    }

    /// Shuffle strata with `seed` before assigning folds
    pub fn shuffle_within_strata(mut self, seed: u64) -> Self {
        self.config.shuffle_within_strata = true;
        self.config.random_seed = seed;
        self
    }

    /// Set the column layout
    pub fn dataset(mut self, dataset: DatasetConfig) -> Self {
        self.config.dataset = dataset;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<EvaluationConfig> {
        if !self.validation_errors.is_empty() {
            return Err(FoldEvalError::config(format!(
                "Configuration validation failed: {}",
                self.validation_errors.join(", ")
            )));
        }

        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for EvaluationConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
