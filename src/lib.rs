//! # foldeval
//!
//! Evaluation engine for multiclass classifiers trained with k-fold
//! cross-validation over a hyperparameter search.
//!
//! ## Features
//!
//! - **Stratified folds**: rows are spread over folds per `(group, label)`
//!   stratum, and the input row order is kept.
//! - **Class-balancing weights**: inverse class frequency, so every class
//!   carries the same total weight.
//! - **Multiclass metrics**: accuracy, per-class and macro F1, and a confusion
//!   matrix with optional column normalization.
//! - **Threshold calibration**: one-vs-rest F1 across a sweep of
//!   probability-ratio thresholds, with the best threshold per class.
//! - **Cross-fold aggregation**: best configuration selection and fold
//!   averaging, evaluated in parallel with Rayon.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use foldeval::{assign_folds, assign_weights, Dataset, GroupKey, Row};
//!
//! # fn main() -> foldeval::Result<()> {
//! foldeval::init()?;
//!
//! let dataset: Dataset = (0..100)
//!     .map(|i| Row::new(i % 2, vec![i as f64]).with_group(GroupKey::Int(0)))
//!     .collect();
//!
//! let weighted = assign_weights(&dataset)?;
//! let folded = assign_folds(&weighted, 5)?;
//! assert_eq!(folded.fold_sizes(5), vec![20; 5]);
//! # Ok(())
//! # }
//! ```
//!
//! Evaluating a search result only needs an implementation of [`FitResult`]:
//!
//! ```rust,no_run
//! use foldeval::{average_validation_results, default_thresholds, Dataset, FitResult};
//!
//! # fn example<F: FitResult>(fit: &F, folded: &Dataset) -> foldeval::Result<()> {
//! let report = average_validation_results(fit, folded, true, &default_thresholds())?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: fundamental types, constants, error handling and collaborator traits
//! - [`config`]: evaluation configuration with file and environment loading
//! - [`dataset`]: rows, class sets, weights, fold assignment and CSV I/O
//! - [`metrics`]: classification metrics and threshold calibration
//! - [`cross_validation`]: best configuration selection and fold averaging
//! - [`report`]: text rendering of results

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    non_snake_case,
    non_upper_case_globals
)]

// Core infrastructure module - always available
pub mod core;

// Configuration management module
pub mod config;

// Dataset management module
pub mod dataset;

// Metrics module
pub mod metrics;

// Cross-fold aggregation module
pub mod cross_validation;

// Presentation module
pub mod report;

// Re-export core functionality for convenience
pub use self::core::{
    constants::*,
    error::{FoldEvalError, Result},
    traits::*,
    types::*,
};

// Re-export configuration functionality
pub use config::{EvaluationConfig, EvaluationConfigBuilder};

// Re-export dataset functionality
pub use dataset::{
    assign_folds, assign_weights, ClassSet, Dataset, DatasetConfig, Row, StratifiedFoldAssigner,
};
#[cfg(feature = "csv")]
pub use dataset::{load_csv, write_csv};

// Re-export metrics functionality
pub use metrics::{
    compute_metrics, compute_metrics_with_classes, f1_by_threshold, f1_by_threshold_with_classes,
    ConfusionMatrix, MetricsReport, ThresholdGrid, ThresholdTable,
};

// Re-export aggregation functionality
pub use cross_validation::{
    average_validation_results, select_best_index, AggregateReport, CrossValidationEvaluator,
    FoldReport, PrecomputedFit, PrecomputedModel,
};

pub use report::print_results;

// Version information
pub use self::core::constants::FOLDEVAL_VERSION as VERSION;

/// Initialize logging.
///
/// Optional: the library only logs through the `log` facade, so a host
/// application with its own logger can skip this.
pub fn init() -> Result<()> {
    self::core::initialize_core()
}

/// Check if the library has been initialized.
pub fn is_initialized() -> bool {
    self::core::is_core_initialized()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_initialization() {
        assert!(init().is_ok());
        assert!(is_initialized());
    }

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
