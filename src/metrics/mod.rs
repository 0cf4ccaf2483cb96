//! Evaluation metrics for multiclass predictions.
//!
//! - [`classification`]: accuracy, per-class and macro F1 and the confusion
//!   matrix from hard predictions.
//! - [`threshold`]: one-vs-rest F1 across a sweep of decision thresholds
//!   applied to class probabilities.
//!
//! # Examples
//!
//! ```rust,no_run
//! use foldeval::dataset::{Dataset, Row};
//! use foldeval::metrics::{compute_metrics, f1_by_threshold};
//!
//! # fn example() -> foldeval::Result<()> {
//! let predictions: Dataset = vec![
//!     Row::new(0, vec![]).with_prediction(0, vec![0.8, 0.2]),
//!     Row::new(1, vec![]).with_prediction(0, vec![0.6, 0.4]),
//! ]
//! .into_iter()
//! .collect();
//!
//! let report = compute_metrics(&predictions, true)?;
//! println!("Accuracy: {:.3}", report.accuracy);
//!
//! let table = f1_by_threshold(&predictions, &[0.3, 0.5, 0.7])?;
//! println!("{:?}", table.best_thresholds());
//! # Ok(())
//! # }
//! ```

pub mod classification;
pub mod threshold;

pub use classification::{
    compute_metrics, compute_metrics_with_classes, f1_from_counts, ConfusionMatrix, MetricsReport,
};
pub use threshold::{
    f1_by_threshold, f1_by_threshold_with_classes, is_positive, ThresholdChoice, ThresholdGrid,
    ThresholdTable,
};
