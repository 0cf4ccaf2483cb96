//! One-vs-rest threshold calibration.
//!
//! For a class `l` with probability `p_l` and remaining mass `p_rest`, a row
//! is predicted positive at threshold `t` when `p_l / t >= p_rest / 0.5`.
//! Lower thresholds make positive predictions easier to trigger. The sweep
//! records binary F1 for every (class, threshold) pair.

use crate::core::constants::{default_thresholds, REST_REFERENCE_THRESHOLD};
use crate::core::error::{FoldEvalError, Result};
use crate::core::types::ClassId;
use crate::dataset::{ClassSet, Dataset};
use crate::metrics::classification::f1_from_counts;

use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Validated list of candidate thresholds, each in the open interval (0, 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdGrid {
    values: Vec<f64>,
}

impl ThresholdGrid {
    /// Build a grid. Rejects an empty list, values outside (0, 1) and duplicates.
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(FoldEvalError::invalid_argument(
                "thresholds",
                "[]",
                "at least one threshold is required",
            ));
        }
        for (i, &t) in values.iter().enumerate() {
            if !(t.is_finite() && t > 0.0 && t < 1.0) {
                return Err(FoldEvalError::invalid_argument(
                    "thresholds",
                    t.to_string(),
                    "every threshold must lie strictly between 0 and 1",
                ));
            }
            if values[..i].contains(&t) {
                return Err(FoldEvalError::invalid_argument(
                    "thresholds",
                    t.to_string(),
                    "thresholds must be distinct",
                ));
            }
        }
        Ok(ThresholdGrid { values })
    }

    /// Thresholds in the order given
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of thresholds
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false for a validated grid
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Position of an exact threshold value
    pub fn position(&self, threshold: f64) -> Option<usize> {
        self.values.iter().position(|&t| t == threshold)
    }
}

impl Default for ThresholdGrid {
    fn default() -> Self {
        ThresholdGrid {
            values: default_thresholds(),
        }
    }
}

/// The threshold that maximizes F1 for one class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdChoice {
    pub threshold: f64,
    pub f1: f64,
}

/// F1 score per (class, threshold), rows in class order, columns in grid order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTable {
    classes: ClassSet,
    thresholds: ThresholdGrid,
    scores: Array2<f64>,
}

impl ThresholdTable {
    /// Table with every cell zero
    pub fn zeros(classes: &ClassSet, thresholds: &ThresholdGrid) -> Self {
        ThresholdTable {
            classes: classes.clone(),
            thresholds: thresholds.clone(),
            scores: Array2::zeros((classes.len(), thresholds.len())),
        }
    }

    pub fn classes(&self) -> &ClassSet {
        &self.classes
    }

    pub fn thresholds(&self) -> &ThresholdGrid {
        &self.thresholds
    }

    pub fn scores(&self) -> &Array2<f64> {
        &self.scores
    }

    /// F1 of `label` at `threshold`
    pub fn get(&self, label: ClassId, threshold: f64) -> Option<f64> {
        let i = self.classes.position(label)?;
        let j = self.thresholds.position(threshold)?;
        Some(self.scores[[i, j]])
    }

    /// F1 of `label` across the grid
    pub fn row(&self, label: ClassId) -> Option<ArrayView1<'_, f64>> {
        self.classes.position(label).map(|i| self.scores.row(i))
    }

    /// Highest-F1 threshold for `label`; the first one wins a tie.
    pub fn best_threshold(&self, label: ClassId) -> Option<ThresholdChoice> {
        let row = self.row(label)?;
        let mut best: Option<ThresholdChoice> = None;
        for (&threshold, &f1) in self.thresholds.values().iter().zip(row.iter()) {
            if best.map_or(true, |b| f1 > b.f1) {
                best = Some(ThresholdChoice { threshold, f1 });
            }
        }
        best
    }

    /// Highest-F1 threshold for every class
    pub fn best_thresholds(&self) -> BTreeMap<ClassId, ThresholdChoice> {
        self.classes
            .iter()
            .filter_map(|label| self.best_threshold(label).map(|choice| (label, choice)))
            .collect()
    }

    /// `label -> [(threshold, f1)]` view for reporting
    pub fn to_map(&self) -> BTreeMap<ClassId, Vec<(f64, f64)>> {
        self.classes
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let cells = self
                    .thresholds
                    .values()
                    .iter()
                    .copied()
                    .zip(self.scores.row(i).iter().copied())
                    .collect();
                (label, cells)
            })
            .collect()
    }

    /// Cell-wise mean of tables sharing classes and thresholds.
    pub fn mean(tables: &[ThresholdTable]) -> Result<ThresholdTable> {
        let first = tables.first().ok_or_else(|| {
            FoldEvalError::invalid_argument("tables", "[]", "cannot average zero threshold tables")
        })?;
        let mut sum = Array2::<f64>::zeros(first.scores.raw_dim());
        for table in tables {
            if table.classes != first.classes || table.thresholds != first.thresholds {
                return Err(FoldEvalError::inconsistent_schema(
                    "threshold tables cover different classes or thresholds",
                ));
            }
            sum += &table.scores;
        }
        Ok(ThresholdTable {
            classes: first.classes.clone(),
            thresholds: first.thresholds.clone(),
            scores: sum / tables.len() as f64,
        })
    }
}

/// The probability-ratio decision rule.
#[inline]
pub fn is_positive(p_class: f64, p_rest: f64, threshold: f64) -> bool {
    p_class / threshold >= p_rest / REST_REFERENCE_THRESHOLD
}

/// Sweep `thresholds` over every observed class of `predictions`.
pub fn f1_by_threshold(predictions: &Dataset, thresholds: &[f64]) -> Result<ThresholdTable> {
    let grid = ThresholdGrid::new(thresholds.to_vec())?;
    f1_by_threshold_with_classes(predictions, &predictions.class_set(), &grid)
}

/// Sweep `grid` over a caller-fixed class set. Classes with no rows in
/// `predictions` get F1 = 0 at every threshold.
pub fn f1_by_threshold_with_classes(
    predictions: &Dataset,
    classes: &ClassSet,
    grid: &ThresholdGrid,
) -> Result<ThresholdTable> {
    let mut table = ThresholdTable::zeros(classes, grid);
    let Some(max_label) = classes.max_label() else {
        return Ok(table);
    };

    predictions.validate_probabilities(max_label)?;
    if let Some(row) = predictions.rows().iter().find(|r| !classes.contains(r.label)) {
        return Err(FoldEvalError::inconsistent_schema(format!(
            "label {} is outside the class set {:?}",
            row.label,
            classes.labels()
        )));
    }

    // (is_positive_class, p_l, p_rest) per row, per class
    let scores: Vec<Vec<f64>> = classes
        .labels()
        .par_iter()
        .map(|&label| {
            let binarized: Vec<(bool, f64, f64)> = predictions
                .rows()
                .iter()
                .filter_map(|row| {
                    let probability = row.probability.as_ref()?;
                    let p_class = probability[label as usize];
                    let p_rest = probability
                        .iter()
                        .enumerate()
                        .filter(|&(class, _)| class != label as usize)
                        .map(|(_, p)| p)
                        .sum::<f64>();
                    Some((row.label == label, p_class, p_rest))
                })
                .collect();

            grid.values()
                .iter()
                .map(|&t| {
                    let (mut tp, mut fp, mut fn_) = (0.0, 0.0, 0.0);
                    for &(actual, p_class, p_rest) in &binarized {
                        match (actual, is_positive(p_class, p_rest, t)) {
                            (true, true) => tp += 1.0,
                            (false, true) => fp += 1.0,
                            (true, false) => fn_ += 1.0,
                            (false, false) => {}
                        }
                    }
                    f1_from_counts(tp, fp, fn_)
                })
                .collect()
        })
        .collect();

    for (i, row) in scores.into_iter().enumerate() {
        for (j, f1) in row.into_iter().enumerate() {
            table.scores[[i, j]] = f1;
        }
    }

    log::debug!(
        "Threshold sweep: {} classes x {} thresholds over {} rows",
        classes.len(),
        grid.len(),
        predictions.len()
    );
    Ok(table)
}
