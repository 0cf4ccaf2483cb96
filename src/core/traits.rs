//! Collaborator traits.
//!
//! Model fitting and the hyperparameter search loop live outside this crate.
//! These traits are the whole surface the aggregator needs from them.

use crate::core::error::Result;
use crate::core::types::FoldIndex;
use crate::dataset::Dataset;

use std::fmt::Debug;

/// A model fitted on the training part of one fold under one configuration.
pub trait FittedModel: Send + Sync + Debug {
    /// Attach `prediction` and `probability` to every row of `dataset`.
    ///
    /// The returned dataset must have the same rows, in the same order,
    /// with both fields populated.
    fn transform(&self, dataset: &Dataset) -> Result<Dataset>;
}

impl<M: FittedModel + ?Sized> FittedModel for Box<M> {
    fn transform(&self, dataset: &Dataset) -> Result<Dataset> {
        (**self).transform(dataset)
    }
}

/// Output of a cross-validated hyperparameter search.
pub trait FitResult: Send + Sync {
    /// Model type produced per fold and configuration
    type Model: FittedModel;

    /// Aggregate validation score of each configuration, higher is better.
    fn avg_metrics(&self) -> &[f64];

    /// Number of folds the search was run with.
    fn num_folds(&self) -> usize;

    /// Model fitted for `fold` under configuration `config_index`.
    fn sub_model(&self, fold: FoldIndex, config_index: usize) -> Option<&Self::Model>;
}
