//! Multiclass classification metrics from hard predictions.
//!
//! The confusion matrix is indexed `[actual][predicted]` along the axes of a
//! [`ClassSet`]. Its normalized form divides every cell by the sum of its
//! column, giving the distribution of true classes for each predicted class.

use crate::core::error::{FoldEvalError, Result};
use crate::core::types::ClassId;
use crate::dataset::{ClassSet, Dataset};

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// F1 from binary counts. Zero when precision and recall are both
/// zero or undefined.
pub fn f1_from_counts(tp: f64, fp: f64, fn_: f64) -> f64 {
    let precision = if tp + fp > 0.0 { tp / (tp + fp) } else { 0.0 };
    let recall = if tp + fn_ > 0.0 { tp / (tp + fn_) } else { 0.0 };
    if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    }
}

/// Square confusion matrix over a class set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    classes: ClassSet,
    matrix: Array2<f64>,
    normalized: bool,
}

impl ConfusionMatrix {
    /// All-zero count matrix
    pub fn zeros(classes: &ClassSet) -> Self {
        let n = classes.len();
        ConfusionMatrix {
            classes: classes.clone(),
            matrix: Array2::zeros((n, n)),
            normalized: false,
        }
    }

    /// Count `(label, prediction)` pairs. Every label and prediction must be
    /// in `classes`.
    pub fn from_predictions(predictions: &Dataset, classes: &ClassSet) -> Result<Self> {
        predictions.validate_predictions(classes)?;
        let mut cm = Self::zeros(classes);
        for row in predictions.rows() {
            // both positions exist: validated above
            if let (Some(actual), Some(predicted)) = (
                classes.position(row.label),
                row.prediction.and_then(|p| classes.position(p)),
            ) {
                cm.matrix[[actual, predicted]] += 1.0;
            }
        }
        Ok(cm)
    }

    /// Class set along both axes
    pub fn classes(&self) -> &ClassSet {
        &self.classes
    }

    /// Raw cells, `[actual][predicted]`
    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    /// Whether cells hold column-normalized rates rather than counts
    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    /// Cell for an `(actual, predicted)` label pair
    pub fn get(&self, actual: ClassId, predicted: ClassId) -> Option<f64> {
        let i = self.classes.position(actual)?;
        let j = self.classes.position(predicted)?;
        Some(self.matrix[[i, j]])
    }

    /// Sum of all cells
    pub fn total(&self) -> f64 {
        self.matrix.sum()
    }

    /// Fraction of counts on the diagonal
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total > 0.0 {
            self.matrix.diag().sum() / total
        } else {
            0.0
        }
    }

    /// Element-wise sum of two count matrices over the same classes.
    pub fn add(&self, other: &ConfusionMatrix) -> Result<ConfusionMatrix> {
        if self.classes != other.classes {
            return Err(FoldEvalError::inconsistent_schema(format!(
                "cannot add confusion matrices over {:?} and {:?}",
                self.classes.labels(),
                other.classes.labels()
            )));
        }
        if self.normalized || other.normalized {
            return Err(FoldEvalError::invalid_argument(
                "confusion_matrix",
                "normalized",
                "only count matrices can be summed",
            ));
        }
        Ok(ConfusionMatrix {
            classes: self.classes.clone(),
            matrix: &self.matrix + &other.matrix,
            normalized: false,
        })
    }

    /// Divide each cell by the sum of its column.
    ///
    /// A column with no predictions stays all zero.
    pub fn normalized_by_column(&self) -> ConfusionMatrix {
        let mut matrix = self.matrix.clone();
        let column_sums = self.matrix.sum_axis(Axis(0));
        for (j, mut column) in matrix.axis_iter_mut(Axis(1)).enumerate() {
            let sum = column_sums[j];
            if sum > 0.0 {
                column.mapv_inplace(|v| v / sum);
            } else {
                log::debug!(
                    "class {:?} was never predicted; its column stays zero",
                    self.classes.labels().get(j)
                );
            }
        }
        ConfusionMatrix {
            classes: self.classes.clone(),
            matrix,
            normalized: true,
        }
    }

    /// One-vs-rest F1 of `label`, zero if the label is unknown or degenerate.
    pub fn f1(&self, label: ClassId) -> f64 {
        let Some(k) = self.classes.position(label) else {
            return 0.0;
        };
        let tp = self.matrix[[k, k]];
        let fp = self.matrix.column(k).sum() - tp;
        let fn_ = self.matrix.row(k).sum() - tp;
        f1_from_counts(tp, fp, fn_)
    }
}

/// Metrics for one set of predictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Fraction of rows predicted correctly
    pub accuracy: f64,
    /// Unweighted mean of `f1_by_label`
    pub f1_macro: f64,
    /// One-vs-rest F1 per label, ascending by label
    pub f1_by_label: BTreeMap<ClassId, f64>,
    /// Confusion matrix, counts unless normalization was requested
    pub confusion_matrix: ConfusionMatrix,
}

/// Compute accuracy, per-class and macro F1 and the confusion matrix.
///
/// Matrix axes cover every label seen as either truth or prediction; F1 is
/// reported for the labels seen as truth.
pub fn compute_metrics(predictions: &Dataset, normalize_confusion_matrix: bool) -> Result<MetricsReport> {
    let observed = predictions.class_set();
    let axes = observed.union(&predictions.predicted_class_set());
    build_report(predictions, &axes, &observed, normalize_confusion_matrix)
}

/// Like [`compute_metrics`] with caller-fixed matrix axes, so matrices from
/// different subsets of one dataset can be summed.
///
/// F1 and macro F1 still cover only the labels seen as truth in
/// `predictions`; a class of `classes` with no rows has no F1 entry.
pub fn compute_metrics_with_classes(
    predictions: &Dataset,
    classes: &ClassSet,
    normalize_confusion_matrix: bool,
) -> Result<MetricsReport> {
    build_report(
        predictions,
        classes,
        &predictions.class_set(),
        normalize_confusion_matrix,
    )
}

fn build_report(
    predictions: &Dataset,
    axes: &ClassSet,
    reported: &ClassSet,
    normalize: bool,
) -> Result<MetricsReport> {
    if predictions.is_empty() {
        return Err(FoldEvalError::invalid_argument(
            "predictions",
            "0 rows",
            "metrics need at least one row",
        ));
    }

    let counts = ConfusionMatrix::from_predictions(predictions, axes)?;
    let accuracy = counts.accuracy();

    let f1_by_label: BTreeMap<ClassId, f64> =
        reported.iter().map(|label| (label, counts.f1(label))).collect();
    let f1_macro = if f1_by_label.is_empty() {
        0.0
    } else {
        f1_by_label.values().sum::<f64>() / f1_by_label.len() as f64
    };

    let confusion_matrix = if normalize {
        counts.normalized_by_column()
    } else {
        counts
    };

    Ok(MetricsReport {
        accuracy,
        f1_macro,
        f1_by_label,
        confusion_matrix,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Row;
    use approx::assert_relative_eq;

    fn predictions(pairs: &[(ClassId, ClassId)]) -> Dataset {
        pairs
            .iter()
            .map(|&(label, prediction)| Row::new(label, vec![]).with_prediction(prediction, vec![]))
            .collect()
    }

    #[test]
    fn test_f1_from_counts_degenerate() {
        assert_eq!(f1_from_counts(0.0, 0.0, 0.0), 0.0);
        assert_eq!(f1_from_counts(0.0, 3.0, 0.0), 0.0);
        assert_eq!(f1_from_counts(0.0, 0.0, 2.0), 0.0);
        assert_relative_eq!(f1_from_counts(2.0, 1.0, 1.0), 2.0 / 3.0);
    }

    #[test]
    fn test_perfect_classifier() {
        let report = compute_metrics(&predictions(&[(0, 0), (1, 1), (2, 2), (1, 1)]), false).unwrap();
        assert_eq!(report.accuracy, 1.0);
        assert_eq!(report.f1_macro, 1.0);
        assert!(report.f1_by_label.values().all(|&f| f == 1.0));

        let m = report.confusion_matrix.matrix();
        for i in 0..3 {
            for j in 0..3 {
                if i != j {
                    assert_eq!(m[[i, j]], 0.0);
                }
            }
        }
        assert_eq!(report.confusion_matrix.get(1, 1), Some(2.0));
    }

    #[test]
    fn test_constant_classifier() {
        // always predicts 0; class 0 prevalence is 3/5
        let report =
            compute_metrics(&predictions(&[(0, 0), (0, 0), (0, 0), (1, 0), (2, 0)]), false).unwrap();
        assert_relative_eq!(report.accuracy, 0.6);
        assert_eq!(report.f1_by_label[&1], 0.0);
        assert_eq!(report.f1_by_label[&2], 0.0);
        assert_relative_eq!(report.f1_by_label[&0], 0.75);
        assert_relative_eq!(report.f1_macro, 0.25);
    }

    #[test]
    fn test_matrix_layout_actual_by_predicted() {
        let report = compute_metrics(&predictions(&[(0, 1), (0, 1), (1, 0)]), false).unwrap();
        let cm = &report.confusion_matrix;
        assert_eq!(cm.get(0, 1), Some(2.0));
        assert_eq!(cm.get(1, 0), Some(1.0));
        assert_eq!(cm.get(0, 0), Some(0.0));
    }

    #[test]
    fn test_column_normalization() {
        // predicted 0: actual {0, 0, 1}; predicted 1: actual {1}
        let report = compute_metrics(&predictions(&[(0, 0), (0, 0), (1, 0), (1, 1)]), true).unwrap();
        let cm = &report.confusion_matrix;
        assert!(cm.is_normalized());
        assert_relative_eq!(cm.get(0, 0).unwrap(), 2.0 / 3.0);
        assert_relative_eq!(cm.get(1, 0).unwrap(), 1.0 / 3.0);
        assert_relative_eq!(cm.get(0, 1).unwrap(), 0.0);
        assert_relative_eq!(cm.get(1, 1).unwrap(), 1.0);
        for column in cm.matrix().axis_iter(Axis(1)) {
            assert_relative_eq!(column.sum(), 1.0);
        }
        // accuracy is computed from counts
        assert_relative_eq!(report.accuracy, 0.75);
    }

    #[test]
    fn test_never_predicted_column_stays_zero() {
        let classes = ClassSet::from_labels(vec![0, 1]);
        let report =
            compute_metrics_with_classes(&predictions(&[(0, 0), (1, 0)]), &classes, true).unwrap();
        let cm = &report.confusion_matrix;
        assert_eq!(cm.get(0, 1), Some(0.0));
        assert_eq!(cm.get(1, 1), Some(0.0));
        assert!(cm.matrix().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_prediction_only_class_widens_axes() {
        let report = compute_metrics(&predictions(&[(0, 0), (1, 2)]), false).unwrap();
        assert_eq!(report.confusion_matrix.classes().labels(), &[0, 1, 2]);
        // F1 keys come from actual labels only
        assert_eq!(report.f1_by_label.keys().copied().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_fixed_axes_keep_macro_over_observed_labels() {
        let classes = ClassSet::from_labels(vec![0, 1, 2]);
        let report =
            compute_metrics_with_classes(&predictions(&[(0, 0), (1, 1)]), &classes, false).unwrap();
        assert_eq!(report.confusion_matrix.classes().labels(), &[0, 1, 2]);
        assert_eq!(report.f1_by_label.keys().copied().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(report.f1_macro, 1.0);
    }

    #[test]
    fn test_fixed_classes_reject_unknown_label() {
        let classes = ClassSet::from_labels(vec![0, 1]);
        let result = compute_metrics_with_classes(&predictions(&[(0, 3)]), &classes, false);
        assert!(matches!(result, Err(FoldEvalError::InconsistentSchema { .. })));
    }

    #[test]
    fn test_empty_predictions_rejected() {
        assert!(compute_metrics(&Dataset::default(), false).is_err());
    }

    #[test]
    fn test_add_matrices() {
        let classes = ClassSet::from_labels(vec![0, 1]);
        let a = ConfusionMatrix::from_predictions(&predictions(&[(0, 0), (1, 0)]), &classes).unwrap();
        let b = ConfusionMatrix::from_predictions(&predictions(&[(1, 1)]), &classes).unwrap();
        let sum = a.add(&b).unwrap();
        assert_eq!(sum.total(), 3.0);
        assert_eq!(sum.get(1, 1), Some(1.0));
        assert!(a.normalized_by_column().add(&b).is_err());
    }
}
