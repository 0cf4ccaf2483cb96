//! Inverse class-frequency weights.
//!
//! Each row gets `total_rows / (num_labels * rows_with_this_label)`, so every
//! class carries the same total weight under a weighted loss.

use crate::core::error::Result;
use crate::core::types::ClassId;
use crate::dataset::{Dataset, Row};

use std::collections::BTreeMap;

/// Weight of each observed label.
///
/// Labels come from the data, so every count is at least one.
pub fn class_weights(dataset: &Dataset) -> BTreeMap<ClassId, f64> {
    let counts = dataset.label_counts();
    let total = dataset.len() as f64;
    let num_labels = counts.len() as f64;

    counts
        .into_iter()
        .map(|(label, count)| (label, total / (num_labels * count as f64)))
        .collect()
}

/// Return a copy of `dataset` with the `weight` field filled in on every row.
///
/// The input is left untouched. An empty dataset yields an empty dataset.
pub fn assign_weights(dataset: &Dataset) -> Result<Dataset> {
    let weights = class_weights(dataset);
    log::debug!("class weights: {:?}", weights);

    Ok(dataset.map_rows(|row| Row {
        // present by construction: weights were built from these labels
        weight: weights.get(&row.label).copied(),
        ..row.clone()
    }))
}
