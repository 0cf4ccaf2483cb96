//! Row and dataset structures.
//!
//! [`Dataset`] is a small in-memory table: an ordered list of [`Row`]s sharing
//! one feature schema. It provides the filtering, grouping, union, ordering and
//! column-derivation operations that fold assignment and evaluation rely on.

use crate::core::constants::PROBABILITY_SUM_TOLERANCE;
use crate::core::error::{FoldEvalError, Result};
use crate::core::types::*;
use crate::dataset::ClassSet;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One labeled observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// True class label
    pub label: ClassId,
    /// Feature values; opaque to evaluation
    pub features: Vec<f64>,
    /// Secondary stratification key
    pub group_key: GroupKey,
    /// Class-balancing weight
    pub weight: Option<f64>,
    /// Cross-validation fold
    pub fold: Option<FoldIndex>,
    /// Hard label predicted by a model
    pub prediction: Option<ClassId>,
    /// Class probabilities indexed by class id
    pub probability: Option<Vec<f64>>,
}

impl Row {
    /// Create a row with a label and features
    pub fn new(label: ClassId, features: Vec<f64>) -> Self {
        Row {
            label,
            features,
            group_key: GroupKey::None,
            weight: None,
            fold: None,
            prediction: None,
            probability: None,
        }
    }

    /// Set the group key
    pub fn with_group(mut self, group_key: impl Into<GroupKey>) -> Self {
        self.group_key = group_key.into();
        self
    }

    /// Set the fold
    pub fn with_fold(mut self, fold: FoldIndex) -> Self {
        self.fold = Some(fold);
        self
    }

    /// Set the hard prediction and probability vector
    pub fn with_prediction(mut self, prediction: ClassId, probability: Vec<f64>) -> Self {
        self.prediction = Some(prediction);
        self.probability = Some(probability);
        self
    }

    /// Probability assigned to `class`, if the vector is long enough
    pub fn probability_of(&self, class: ClassId) -> Option<f64> {
        self.probability
            .as_ref()
            .and_then(|p| p.get(class as usize).copied())
    }
}

/// Ordered collection of rows sharing a schema.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dataset {
    rows: Vec<Row>,
    feature_names: Vec<String>,
}

impl Dataset {
    /// Create a dataset from rows without named features
    pub fn new(rows: Vec<Row>) -> Self {
        Dataset {
            rows,
            feature_names: Vec::new(),
        }
    }

    /// Create a dataset whose rows all carry one value per named feature
    pub fn with_feature_names(rows: Vec<Row>, feature_names: Vec<String>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.features.len() != feature_names.len() {
                return Err(FoldEvalError::inconsistent_schema(format!(
                    "row {} has {} features, schema has {}",
                    i,
                    row.features.len(),
                    feature_names.len()
                )));
            }
        }
        Ok(Dataset {
            rows,
            feature_names,
        })
    }

    /// New rows under this dataset's schema. Callers derive `rows` from
    /// this dataset's own rows, so feature counts already match.
    pub(crate) fn with_rows(&self, rows: Vec<Row>) -> Dataset {
        Dataset {
            rows,
            feature_names: self.feature_names.clone(),
        }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in order
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Iterate over rows in order
    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Consume the dataset, returning its rows
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Feature names, empty when the schema is anonymous
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Rows matching `predicate`, order preserved
    pub fn filter<F>(&self, predicate: F) -> Dataset
    where
        F: Fn(&Row) -> bool,
    {
        Dataset {
            rows: self.rows.iter().filter(|r| predicate(r)).cloned().collect(),
            feature_names: self.feature_names.clone(),
        }
    }

    /// Rows assigned to `fold`
    pub fn fold(&self, fold: FoldIndex) -> Dataset {
        self.filter(|row| row.fold == Some(fold))
    }

    /// Row count per label (group-by + count)
    pub fn label_counts(&self) -> BTreeMap<ClassId, usize> {
        let mut counts = BTreeMap::new();
        for row in &self.rows {
            *counts.entry(row.label).or_insert(0) += 1;
        }
        counts
    }

    /// Distinct labels, sorted
    pub fn class_set(&self) -> ClassSet {
        self.rows.iter().map(|r| r.label).collect()
    }

    /// Distinct predicted labels, sorted
    pub fn predicted_class_set(&self) -> ClassSet {
        self.rows.iter().filter_map(|r| r.prediction).collect()
    }

    /// Distinct group keys, sorted
    pub fn group_keys(&self) -> BTreeSet<GroupKey> {
        self.rows.iter().map(|r| r.group_key.clone()).collect()
    }

    /// Row count of each fold in `[0, num_folds)`; rows without a fold are ignored
    pub fn fold_sizes(&self, num_folds: usize) -> Vec<usize> {
        let mut sizes = vec![0; num_folds];
        for fold in self.rows.iter().filter_map(|r| r.fold) {
            if fold < num_folds {
                sizes[fold] += 1;
            }
        }
        sizes
    }

    /// Whether every row carries a weight
    pub fn has_weights(&self) -> bool {
        self.rows.iter().all(|r| r.weight.is_some())
    }

    /// Whether every row carries a fold
    pub fn has_folds(&self) -> bool {
        self.rows.iter().all(|r| r.fold.is_some())
    }

    /// Append the rows of `other`; both datasets must share feature names.
    pub fn union(&self, other: &Dataset) -> Result<Dataset> {
        if self.feature_names != other.feature_names {
            return Err(FoldEvalError::inconsistent_schema(format!(
                "cannot union datasets with features {:?} and {:?}",
                self.feature_names, other.feature_names
            )));
        }
        let mut rows = Vec::with_capacity(self.len() + other.len());
        rows.extend_from_slice(&self.rows);
        rows.extend_from_slice(&other.rows);
        Ok(Dataset {
            rows,
            feature_names: self.feature_names.clone(),
        })
    }

    /// Stable sort of rows by a derived key
    pub fn sort_by_key<K, F>(&mut self, f: F)
    where
        K: Ord,
        F: FnMut(&Row) -> K,
    {
        self.rows.sort_by_key(f);
    }

    /// Same rows with a derived value written into each one
    pub fn map_rows<F>(&self, f: F) -> Dataset
    where
        F: Fn(&Row) -> Row,
    {
        Dataset {
            rows: self.rows.iter().map(f).collect(),
            feature_names: self.feature_names.clone(),
        }
    }

    /// Attach `(prediction, probability)` pairs, one per row in order.
    pub fn with_predictions(&self, predictions: Vec<(ClassId, Vec<f64>)>) -> Result<Dataset> {
        if predictions.len() != self.rows.len() {
            return Err(FoldEvalError::inconsistent_schema(format!(
                "{} predictions for {} rows",
                predictions.len(),
                self.rows.len()
            )));
        }
        let rows = self
            .rows
            .iter()
            .zip(predictions)
            .map(|(row, (prediction, probability))| Row {
                prediction: Some(prediction),
                probability: Some(probability),
                ..row.clone()
            })
            .collect();
        Ok(Dataset {
            rows,
            feature_names: self.feature_names.clone(),
        })
    }

    /// Check that every row has a hard prediction and that labels and
    /// predictions all fall inside `classes`.
    pub fn validate_predictions(&self, classes: &ClassSet) -> Result<()> {
        for (i, row) in self.rows.iter().enumerate() {
            let prediction = row.prediction.ok_or_else(|| {
                FoldEvalError::inconsistent_schema(format!("row {} has no prediction", i))
            })?;
            if !classes.contains(row.label) {
                return Err(FoldEvalError::inconsistent_schema(format!(
                    "row {} has label {} outside the class set {:?}",
                    i,
                    row.label,
                    classes.labels()
                )));
            }
            if !classes.contains(prediction) {
                return Err(FoldEvalError::inconsistent_schema(format!(
                    "row {} has prediction {} outside the class set {:?}",
                    i,
                    prediction,
                    classes.labels()
                )));
            }
        }
        Ok(())
    }

    /// Check that every row carries a probability vector covering labels
    /// `0..=max_label`, with entries in `[0, 1]` summing to one.
    pub fn validate_probabilities(&self, max_label: ClassId) -> Result<()> {
        let required = max_label as usize + 1;
        for (i, row) in self.rows.iter().enumerate() {
            let probability = row.probability.as_ref().ok_or_else(|| {
                FoldEvalError::inconsistent_schema(format!("row {} has no probability vector", i))
            })?;
            if probability.len() < required {
                return Err(FoldEvalError::inconsistent_schema(format!(
                    "row {} has {} probabilities, expected at least {}",
                    i,
                    probability.len(),
                    required
                )));
            }
            if probability
                .iter()
                .any(|&p| !p.is_finite() || !(0.0..=1.0).contains(&p))
            {
                return Err(FoldEvalError::inconsistent_schema(format!(
                    "row {} has a probability outside [0, 1]",
                    i
                )));
            }
            let total: f64 = probability.iter().sum();
            if (total - 1.0).abs() > PROBABILITY_SUM_TOLERANCE * probability.len() as f64 {
                return Err(FoldEvalError::inconsistent_schema(format!(
                    "row {} probabilities sum to {}",
                    i, total
                )));
            }
        }
        Ok(())
    }
}

impl FromIterator<Row> for Dataset {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        Dataset::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
