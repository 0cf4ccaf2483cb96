//! Cross-fold aggregation of evaluation results.
//!
//! Given the output of a cross-validated hyperparameter search, the
//! evaluator picks the configuration with the highest aggregate score, runs
//! each fold's model for that configuration on the fold's rows and averages
//! the per-fold metrics:
//!
//! - accuracy and macro F1 are arithmetic means over folds, each fold's macro
//!   F1 covering the labels present in that fold;
//! - per-class F1 is averaged over the class set of the whole dataset, a fold
//!   without rows of a class counting as 0 for it;
//! - confusion matrices are summed as counts and column-normalized once;
//! - threshold tables, when requested, are averaged cell by cell.
//!
//! Folds are independent, so they are evaluated in parallel with rayon and
//! reduced in fold order.

use crate::config::EvaluationConfig;
use crate::core::error::{FoldEvalError, Result};
use crate::core::traits::{FitResult, FittedModel};
use crate::core::types::*;
use crate::dataset::{ClassSet, Dataset, Row};
use crate::metrics::{
    compute_metrics, compute_metrics_with_classes, f1_by_threshold_with_classes, ConfusionMatrix,
    MetricsReport, ThresholdChoice, ThresholdGrid, ThresholdTable,
};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Index of the highest score; the first one wins a tie and NaN never wins.
pub fn select_best_index(scores: &[f64]) -> Result<ConfigIndex> {
    let mut best: Option<(ConfigIndex, f64)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, b)| score > b) {
            best = Some((i, score));
        }
    }
    best.map(|(i, _)| i).ok_or_else(|| {
        FoldEvalError::invalid_argument(
            "avg_metrics",
            format!("{:?}", scores),
            "need at least one comparable score",
        )
    })
}

/// Metrics of one fold's predictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldReport {
    pub fold: FoldIndex,
    pub num_rows: usize,
    /// Metrics with an unnormalized confusion matrix
    pub metrics: MetricsReport,
    pub threshold_table: Option<ThresholdTable>,
}

/// Cross-fold averages for the selected configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    /// Configuration whose models were evaluated
    pub best_index: ConfigIndex,
    /// Folds that contributed, ascending
    pub folds: Vec<FoldIndex>,
    /// Folds left out because they had no rows
    pub skipped_folds: Vec<FoldIndex>,
    pub accuracy: f64,
    pub f1_macro: f64,
    pub f1_by_label: BTreeMap<ClassId, f64>,
    /// Summed counts, column-normalized
    pub confusion_matrix: ConfusionMatrix,
    /// Summed counts
    pub confusion_counts: ConfusionMatrix,
    /// Mean F1 per (class, threshold); present only when the sweep ran
    pub threshold_table: Option<ThresholdTable>,
}

impl AggregateReport {
    /// Number of folds averaged
    pub fn num_folds(&self) -> usize {
        self.folds.len()
    }

    /// F1-maximizing threshold per class, empty without a sweep
    pub fn best_thresholds(&self) -> BTreeMap<ClassId, ThresholdChoice> {
        self.threshold_table
            .as_ref()
            .map(ThresholdTable::best_thresholds)
            .unwrap_or_default()
    }
}

/// Average fold reports computed over the same class set.
pub fn aggregate_fold_reports(
    reports: &[FoldReport],
    classes: &ClassSet,
    best_index: ConfigIndex,
) -> Result<AggregateReport> {
    if reports.is_empty() {
        return Err(FoldEvalError::empty_partition("fold set", 0));
    }
    let n = reports.len() as f64;

    let accuracy = reports.iter().map(|r| r.metrics.accuracy).sum::<f64>() / n;
    let f1_macro = reports.iter().map(|r| r.metrics.f1_macro).sum::<f64>() / n;

    let f1_by_label = classes
        .iter()
        .map(|label| {
            let total: f64 = reports
                .iter()
                .map(|r| r.metrics.f1_by_label.get(&label).copied().unwrap_or(0.0))
                .sum();
            (label, total / n)
        })
        .collect();

    let mut counts = ConfusionMatrix::zeros(classes);
    for report in reports {
        counts = counts.add(&report.metrics.confusion_matrix)?;
    }

    let tables: Vec<ThresholdTable> = reports
        .iter()
        .filter_map(|r| r.threshold_table.clone())
        .collect();
    let threshold_table = if tables.is_empty() {
        None
    } else if tables.len() != reports.len() {
        return Err(FoldEvalError::inconsistent_schema(
            "threshold tables are missing for some folds",
        ));
    } else {
        Some(ThresholdTable::mean(&tables)?)
    };

    Ok(AggregateReport {
        best_index,
        folds: reports.iter().map(|r| r.fold).collect(),
        skipped_folds: Vec::new(),
        accuracy,
        f1_macro,
        f1_by_label,
        confusion_matrix: counts.normalized_by_column(),
        confusion_counts: counts,
        threshold_table,
    })
}

/// Runs and averages per-fold evaluation of a fit result.
#[derive(Debug, Clone)]
pub struct CrossValidationEvaluator {
    config: EvaluationConfig,
}

impl CrossValidationEvaluator {
    /// Create an evaluator, validating `config` first.
    pub fn new(config: EvaluationConfig) -> Result<Self> {
        config.validate()?;
        Ok(CrossValidationEvaluator { config })
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Evaluate the best configuration of `fit` on the fold-tagged `dataset`.
    pub fn evaluate<F: FitResult>(&self, fit: &F, dataset: &Dataset) -> Result<AggregateReport> {
        let grid = if self.config.apply_threshold_selection {
            Some(self.config.threshold_grid()?)
        } else {
            None
        };

        let num_folds = fit.num_folds();
        if num_folds == 0 {
            return Err(FoldEvalError::invalid_argument(
                "num_folds",
                "0",
                "fit result has no folds",
            ));
        }
        if num_folds != self.config.num_folds {
            log::warn!(
                "fit result has {} folds, configuration says {}; using the fit result",
                num_folds,
                self.config.num_folds
            );
        }
        check_fold_column(dataset, num_folds)?;

        let best_index = select_best_index(fit.avg_metrics())?;
        log::info!(
            "Best configuration: index {} with score {:.6}",
            best_index,
            fit.avg_metrics()[best_index]
        );

        let classes = dataset.class_set();
        let (partitions, skipped_folds) = self.partition(dataset, num_folds)?;

        let evaluate_one = |(fold, subset): &(FoldIndex, Dataset)| {
            evaluate_fold(fit, best_index, *fold, subset, &classes, grid.as_ref())
        };
        let reports: Vec<FoldReport> = if self.config.parallel_folds {
            self.run_parallel(|| {
                partitions
                    .par_iter()
                    .map(evaluate_one)
                    .collect::<Result<Vec<_>>>()
            })?
        } else {
            partitions.iter().map(evaluate_one).collect::<Result<Vec<_>>>()?
        };

        let mut report = aggregate_fold_reports(&reports, &classes, best_index)?;
        report.skipped_folds = skipped_folds;
        log::info!(
            "Averaged {} folds: accuracy {:.4}, macro F1 {:.4}",
            report.num_folds(),
            report.accuracy,
            report.f1_macro
        );
        Ok(report)
    }

    /// Metrics over all out-of-fold predictions at once, ignoring fold
    /// boundaries. The confusion matrix is column-normalized when
    /// `normalize_confusion_matrix` is set.
    pub fn evaluate_pooled(&self, predictions: &Dataset) -> Result<MetricsReport> {
        let report = compute_metrics(predictions, self.config.normalize_confusion_matrix)?;
        log::info!(
            "Pooled {} predictions: accuracy {:.4}, macro F1 {:.4}",
            predictions.len(),
            report.accuracy,
            report.f1_macro
        );
        Ok(report)
    }

    /// Split `dataset` by fold, applying the empty-fold policy.
    fn partition(
        &self,
        dataset: &Dataset,
        num_folds: usize,
    ) -> Result<(Vec<(FoldIndex, Dataset)>, Vec<FoldIndex>)> {
        let mut partitions = Vec::with_capacity(num_folds);
        let mut skipped = Vec::new();

        for fold in 0..num_folds {
            let subset = dataset.fold(fold);
            if !subset.is_empty() {
                partitions.push((fold, subset));
                continue;
            }
            match self.config.empty_fold_policy {
                EmptyFoldPolicy::Reject => return Err(FoldEvalError::empty_partition("fold", fold)),
                EmptyFoldPolicy::Skip => {
                    log::warn!("fold {} has no rows; leaving it out of the averages", fold);
                    skipped.push(fold);
                }
            }
        }

        if partitions.is_empty() {
            return Err(FoldEvalError::empty_partition("fold", 0));
        }
        Ok((partitions, skipped))
    }

    fn run_parallel<T, OP>(&self, op: OP) -> Result<T>
    where
        OP: FnOnce() -> Result<T> + Send,
        T: Send,
    {
        if self.config.num_threads == 0 {
            return op();
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.num_threads)
            .build()
            .map_err(|e| FoldEvalError::threading(format!("Failed to create thread pool: {}", e)))?;
        pool.install(op)
    }
}

fn check_fold_column(dataset: &Dataset, num_folds: usize) -> Result<()> {
    if dataset.is_empty() {
        return Err(FoldEvalError::invalid_argument(
            "dataset",
            "0 rows",
            "nothing to evaluate",
        ));
    }
    for (i, row) in dataset.iter().enumerate() {
        match row.fold {
            None => {
                return Err(FoldEvalError::inconsistent_schema(format!(
                    "row {} has no fold",
                    i
                )))
            }
            Some(fold) if fold >= num_folds => {
                return Err(FoldEvalError::inconsistent_schema(format!(
                    "row {} has fold {} outside [0, {})",
                    i, fold, num_folds
                )))
            }
            Some(_) => {}
        }
    }
    Ok(())
}

fn evaluate_fold<F: FitResult>(
    fit: &F,
    config_index: ConfigIndex,
    fold: FoldIndex,
    subset: &Dataset,
    classes: &ClassSet,
    grid: Option<&ThresholdGrid>,
) -> Result<FoldReport> {
    let model = fit.sub_model(fold, config_index).ok_or_else(|| {
        FoldEvalError::prediction(format!(
            "no model for fold {} under configuration {}",
            fold, config_index
        ))
    })?;

    let predictions = model.transform(subset)?;
    if predictions.len() != subset.len() {
        return Err(FoldEvalError::prediction(format!(
            "model for fold {} returned {} rows for {} inputs",
            fold,
            predictions.len(),
            subset.len()
        )));
    }

    let metrics = compute_metrics_with_classes(&predictions, classes, false)?;
    let threshold_table = grid
        .map(|grid| f1_by_threshold_with_classes(&predictions, classes, grid))
        .transpose()?;

    log::debug!(
        "Fold {}: {} rows, accuracy {:.4}, macro F1 {:.4}",
        fold,
        subset.len(),
        metrics.accuracy,
        metrics.f1_macro
    );

    Ok(FoldReport {
        fold,
        num_rows: subset.len(),
        metrics,
        threshold_table,
    })
}

/// Evaluate the best configuration of `fit` with default settings.
pub fn average_validation_results<F: FitResult>(
    fit: &F,
    dataset: &Dataset,
    apply_threshold_selection: bool,
    thresholds: &[f64],
) -> Result<AggregateReport> {
    let config = EvaluationConfig {
        num_folds: fit.num_folds(),
        apply_threshold_selection,
        thresholds: thresholds.to_vec(),
        ..EvaluationConfig::default()
    };
    CrossValidationEvaluator::new(config)?.evaluate(fit, dataset)
}

/// Replays stored out-of-fold predictions for one fold.
#[derive(Debug, Clone, PartialEq)]
pub struct PrecomputedModel {
    predictions: Vec<(ClassId, Option<Vec<f64>>)>,
}

impl PrecomputedModel {
    pub fn new(predictions: Vec<(ClassId, Option<Vec<f64>>)>) -> Self {
        PrecomputedModel { predictions }
    }
}

impl FittedModel for PrecomputedModel {
    fn transform(&self, dataset: &Dataset) -> Result<Dataset> {
        if dataset.len() != self.predictions.len() {
            return Err(FoldEvalError::prediction(format!(
                "{} stored predictions for {} rows",
                self.predictions.len(),
                dataset.len()
            )));
        }
        let rows = dataset
            .iter()
            .zip(&self.predictions)
            .map(|(row, (prediction, probability))| Row {
                prediction: Some(*prediction),
                probability: probability.clone(),
                ..row.clone()
            })
            .collect();
        Ok(dataset.with_rows(rows))
    }
}

/// A fit result backed by stored predictions rather than live models.
#[derive(Debug, Clone)]
pub struct PrecomputedFit {
    avg_metrics: Vec<f64>,
    /// `[fold][config_index]`
    models: Vec<Vec<PrecomputedModel>>,
}

impl PrecomputedFit {
    /// Build from scores and a `[fold][config_index]` model grid.
    pub fn new(avg_metrics: Vec<f64>, models: Vec<Vec<PrecomputedModel>>) -> Result<Self> {
        if let Some((fold, row)) = models
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != avg_metrics.len())
        {
            return Err(FoldEvalError::inconsistent_schema(format!(
                "fold {} has {} models for {} configurations",
                fold,
                row.len(),
                avg_metrics.len()
            )));
        }
        Ok(PrecomputedFit {
            avg_metrics,
            models,
        })
    }

    /// Single-configuration fit from a dataset whose rows already carry
    /// `fold`, `prediction` and optionally `probability`.
    pub fn from_predictions(dataset: &Dataset, num_folds: usize) -> Result<Self> {
        check_fold_column(dataset, num_folds)?;
        let mut per_fold: Vec<Vec<(ClassId, Option<Vec<f64>>)>> = vec![Vec::new(); num_folds];
        for (i, row) in dataset.iter().enumerate() {
            let prediction = row.prediction.ok_or_else(|| {
                FoldEvalError::inconsistent_schema(format!("row {} has no prediction", i))
            })?;
            // fold presence checked above
            if let Some(fold) = row.fold {
                per_fold[fold].push((prediction, row.probability.clone()));
            }
        }
        let models = per_fold
            .into_iter()
            .map(|predictions| vec![PrecomputedModel::new(predictions)])
            .collect();
        PrecomputedFit::new(vec![0.0], models)
    }
}

impl FitResult for PrecomputedFit {
    type Model = PrecomputedModel;

    fn avg_metrics(&self) -> &[f64] {
        &self.avg_metrics
    }

    fn num_folds(&self) -> usize {
        self.models.len()
    }

    fn sub_model(&self, fold: FoldIndex, config_index: ConfigIndex) -> Option<&Self::Model> {
        self.models.get(fold)?.get(config_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvaluationConfigBuilder;
    use approx::assert_relative_eq;

    #[test]
    fn test_select_best_index_first_wins() {
        assert_eq!(select_best_index(&[0.7, 0.9, 0.9, 0.5]).unwrap(), 1);
        assert_eq!(select_best_index(&[0.3]).unwrap(), 0);
    }

    #[test]
    fn test_select_best_index_ignores_nan() {
        assert_eq!(select_best_index(&[f64::NAN, 0.2, 0.1]).unwrap(), 1);
        assert!(select_best_index(&[f64::NAN]).is_err());
        assert!(matches!(
            select_best_index(&[]),
            Err(FoldEvalError::InvalidArgument { .. })
        ));
    }

    fn folded(rows: &[(ClassId, FoldIndex, ClassId)]) -> Dataset {
        rows.iter()
            .map(|&(label, fold, prediction)| {
                let mut probability = vec![0.0, 0.0];
                probability[prediction as usize] = 1.0;
                Row::new(label, vec![]).with_fold(fold).with_prediction(prediction, probability)
            })
            .collect()
    }

    #[test]
    fn test_precomputed_fit_replays_predictions() {
        let ds = folded(&[(0, 0, 0), (1, 1, 0), (1, 0, 1), (0, 1, 0)]);
        let fit = PrecomputedFit::from_predictions(&ds, 2).unwrap();
        assert_eq!(fit.num_folds(), 2);
        let fold1 = fit.sub_model(1, 0).unwrap().transform(&ds.fold(1)).unwrap();
        assert_eq!(fold1.rows()[0].prediction, Some(0));
        assert!(fit.sub_model(0, 1).is_none());
        assert!(fit.sub_model(0, 0).unwrap().transform(&ds).is_err());
    }

    #[test]
    fn test_precomputed_model_keeps_row_features() {
        let ds: Dataset = (0..4)
            .map(|i| Row::new(i % 2, vec![i as f64]).with_fold(0))
            .collect();
        let model = PrecomputedModel::new((0..4).map(|i| (i % 2, Some(vec![0.5, 0.5]))).collect());
        let predicted = model.transform(&ds).unwrap();
        assert_eq!(predicted.rows()[3].features, vec![3.0]);
        assert_eq!(predicted.rows()[3].prediction, Some(1));
    }

    #[test]
    fn test_evaluate_precomputed() {
        let ds = folded(&[(0, 0, 0), (1, 0, 1), (0, 1, 0), (1, 1, 0)]);
        let fit = PrecomputedFit::from_predictions(&ds, 2).unwrap();
        let report = average_validation_results(&fit, &ds, true, &[0.5]).unwrap();

        // fold 0 perfect, fold 1 half right
        assert_relative_eq!(report.accuracy, 0.75);
        assert_eq!(report.folds, vec![0, 1]);
        assert_eq!(report.confusion_counts.get(1, 0), Some(1.0));
        assert_relative_eq!(report.confusion_matrix.get(0, 0).unwrap(), 2.0 / 3.0);
        assert_relative_eq!(report.confusion_matrix.get(1, 1).unwrap(), 1.0);

        // one-hot probabilities at t = 0.5 match hard-label F1
        let table = report.threshold_table.as_ref().unwrap();
        for (&label, &f1) in &report.f1_by_label {
            assert_relative_eq!(table.get(label, 0.5).unwrap(), f1);
        }
    }

    #[test]
    fn test_empty_fold_policy() {
        let ds = folded(&[(0, 0, 0), (1, 0, 1), (0, 2, 0), (1, 2, 1)]);
        let fit = PrecomputedFit::from_predictions(&ds, 3).unwrap();

        let strict = CrossValidationEvaluator::new(
            EvaluationConfigBuilder::new().num_folds(3).build().unwrap(),
        )
        .unwrap();
        assert!(matches!(
            strict.evaluate(&fit, &ds),
            Err(FoldEvalError::EmptyPartition { index: 1, .. })
        ));

        let lenient = CrossValidationEvaluator::new(
            EvaluationConfigBuilder::new()
                .num_folds(3)
                .empty_fold_policy(EmptyFoldPolicy::Skip)
                .build()
                .unwrap(),
        )
        .unwrap();
        let report = lenient.evaluate(&fit, &ds).unwrap();
        assert_eq!(report.folds, vec![0, 2]);
        assert_eq!(report.skipped_folds, vec![1]);
        assert_eq!(report.accuracy, 1.0);
    }

    #[test]
    fn test_rows_without_fold_rejected() {
        let ds: Dataset = vec![Row::new(0, vec![]).with_prediction(0, vec![1.0])]
            .into_iter()
            .collect();
        assert!(matches!(
            PrecomputedFit::from_predictions(&ds, 1),
            Err(FoldEvalError::InconsistentSchema { .. })
        ));
    }

    #[test]
    fn test_pooled_metrics_follow_normalize_setting() {
        let ds = folded(&[(0, 0, 0), (1, 0, 0), (0, 1, 0), (1, 1, 1)]);
        let evaluator = |normalize: bool| {
            CrossValidationEvaluator::new(
                EvaluationConfigBuilder::new()
                    .num_folds(2)
                    .normalize_confusion_matrix(normalize)
                    .build()
                    .unwrap(),
            )
            .unwrap()
        };

        let counts = evaluator(false).evaluate_pooled(&ds).unwrap();
        assert!(!counts.confusion_matrix.is_normalized());
        assert_eq!(counts.confusion_matrix.get(0, 0), Some(2.0));
        assert_relative_eq!(counts.accuracy, 0.75);

        let rates = evaluator(true).evaluate_pooled(&ds).unwrap();
        assert!(rates.confusion_matrix.is_normalized());
        assert_relative_eq!(rates.confusion_matrix.get(0, 0).unwrap(), 2.0 / 3.0);
        assert_relative_eq!(rates.confusion_matrix.get(1, 1).unwrap(), 1.0);
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let ds = folded(&[(0, 0, 0), (1, 0, 0), (0, 1, 1), (1, 1, 1), (1, 2, 1), (0, 2, 0)]);
        let fit = PrecomputedFit::from_predictions(&ds, 3).unwrap();
        let run = |parallel: bool, threads: usize| {
            let config = EvaluationConfigBuilder::new()
                .num_folds(3)
                .parallel_folds(parallel)
                .num_threads(threads)
                .build()
                .unwrap();
            CrossValidationEvaluator::new(config).unwrap().evaluate(&fit, &ds).unwrap()
        };
        let sequential = run(false, 0);
        assert_eq!(sequential, run(true, 0));
        assert_eq!(sequential, run(true, 2));
    }
}
