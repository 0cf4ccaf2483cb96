//! Dataset management module for foldeval.
//!
//! This module holds the in-memory row store, the class set, the two dataset
//! derivations that prepare data for cross-validation (class-balancing weights
//! and stratified folds), and CSV loading.

pub mod class_set;
pub mod dataset;
#[cfg(feature = "csv")]
#[cfg_attr(docsrs, doc(cfg(feature = "csv")))]
pub mod loader;
pub mod partition;
pub mod weighting;

pub use class_set::ClassSet;
pub use dataset::{Dataset, Row};
#[cfg(feature = "csv")]
pub use loader::{load_csv, write_csv};
pub use partition::{assign_folds, stratify, stratum_fold_counts, StratifiedFoldAssigner};
pub use weighting::{assign_weights, class_weights};

use crate::core::constants::*;
use serde::{Deserialize, Serialize};

/// Column layout of tabular input and output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Column holding the class label (required)
    pub label_column: String,
    /// Column holding the stratification group key
    pub group_column: String,
    /// Column holding the fold index
    pub fold_column: String,
    /// Column holding the class-balancing weight
    pub weight_column: String,
    /// Column holding the hard prediction
    pub prediction_column: String,
    /// Prefix of the per-class probability columns, followed by the class id
    pub probability_prefix: String,
    /// Field delimiter
    pub delimiter: char,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        DatasetConfig {
            label_column: DEFAULT_LABEL_COLUMN.to_string(),
            group_column: DEFAULT_GROUP_COLUMN.to_string(),
            fold_column: DEFAULT_FOLD_COLUMN.to_string(),
            weight_column: DEFAULT_WEIGHT_COLUMN.to_string(),
            prediction_column: DEFAULT_PREDICTION_COLUMN.to_string(),
            probability_prefix: DEFAULT_PROBABILITY_PREFIX.to_string(),
            delimiter: ',',
        }
    }
}

impl DatasetConfig {
    /// Create a new dataset configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set label column name
    pub fn with_label_column<S: Into<String>>(mut self, column: S) -> Self {
        self.label_column = column.into();
        self
    }

    /// Set group column name
    pub fn with_group_column<S: Into<String>>(mut self, column: S) -> Self {
        self.group_column = column.into();
        self
    }

    /// Set fold column name
    pub fn with_fold_column<S: Into<String>>(mut self, column: S) -> Self {
        self.fold_column = column.into();
        self
    }

    /// Set field delimiter
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Names of the columns that are not features
    pub fn reserved_columns(&self) -> [&str; 5] {
        [
            self.label_column.as_str(),
            self.group_column.as_str(),
            self.fold_column.as_str(),
            self.weight_column.as_str(),
            self.prediction_column.as_str(),
        ]
    }

    /// Class id encoded in a probability column name, if it is one
    pub fn probability_class(&self, column: &str) -> Option<crate::core::types::ClassId> {
        column
            .strip_prefix(self.probability_prefix.as_str())
            .and_then(|suffix| suffix.parse().ok())
    }
}
