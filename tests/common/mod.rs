//! Common test utilities for foldeval integration tests.

#![allow(dead_code)]

use foldeval::*;
use rand::prelude::*;

/// Labeled rows with random labels and integer groups. The single feature is
/// the row ordinal, so order can be checked after any derivation.
pub fn random_dataset(num_rows: usize, num_classes: u32, num_groups: i64, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..num_rows)
        .map(|i| {
            Row::new(rng.gen_range(0..num_classes), vec![i as f64])
                .with_group(GroupKey::Int(rng.gen_range(0..num_groups)))
        })
        .collect()
}

/// `per_label` rows of every label in `0..num_labels`, one group, labels interleaved.
pub fn balanced_dataset(per_label: usize, num_labels: u32) -> Dataset {
    (0..per_label * num_labels as usize)
        .map(|i| {
            Row::new((i % num_labels as usize) as ClassId, vec![i as f64])
                .with_group(GroupKey::Int(0))
        })
        .collect()
}

/// Attach random probability vectors and their argmax as the prediction.
pub fn with_random_scores(dataset: &Dataset, num_classes: u32, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let predictions = dataset
        .iter()
        .map(|row| {
            // bias toward the true label so metrics are not trivially zero
            let mut raw: Vec<f64> = (0..num_classes).map(|_| rng.gen_range(0.01..1.0)).collect();
            raw[row.label as usize] += rng.gen_range(0.0..1.0);
            let total: f64 = raw.iter().sum();
            let probability: Vec<f64> = raw.iter().map(|p| p / total).collect();
            (argmax(&probability), probability)
        })
        .collect();
    dataset
        .with_predictions(predictions)
        .expect("one prediction per row")
}

pub fn argmax(values: &[f64]) -> ClassId {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best as ClassId
}

/// Predicts the true label except for every `flip_every`-th row (by the
/// ordinal feature), which it shifts to the next class.
#[derive(Debug, Clone)]
pub struct LabelNoiseModel {
    pub num_classes: u32,
    pub flip_every: usize,
}

impl LabelNoiseModel {
    pub fn perfect(num_classes: u32) -> Self {
        LabelNoiseModel {
            num_classes,
            flip_every: 0,
        }
    }
}

impl FittedModel for LabelNoiseModel {
    fn transform(&self, dataset: &Dataset) -> Result<Dataset> {
        let k = self.num_classes as usize;
        let predictions = dataset
            .iter()
            .map(|row| {
                let ordinal = row.features[0] as usize;
                let predicted = if self.flip_every > 0 && ordinal % self.flip_every == 0 {
                    (row.label + 1) % self.num_classes
                } else {
                    row.label
                };
                let mut probability = vec![0.3 / (k - 1) as f64; k];
                probability[predicted as usize] = 0.7;
                (predicted, probability)
            })
            .collect();
        dataset.with_predictions(predictions)
    }
}

/// Always fails, standing in for a broken model.
#[derive(Debug, Clone)]
pub struct FailingModel;

impl FittedModel for FailingModel {
    fn transform(&self, _dataset: &Dataset) -> Result<Dataset> {
        Err(FoldEvalError::prediction("model exploded"))
    }
}

/// In-memory search result: scores per configuration and a
/// `[fold][config_index]` model grid.
#[derive(Debug)]
pub struct SearchResult<M> {
    pub scores: Vec<f64>,
    pub models: Vec<Vec<M>>,
}

impl<M: FittedModel> FitResult for SearchResult<M> {
    type Model = M;

    fn avg_metrics(&self) -> &[f64] {
        &self.scores
    }

    fn num_folds(&self) -> usize {
        self.models.len()
    }

    fn sub_model(&self, fold: FoldIndex, config_index: usize) -> Option<&M> {
        self.models.get(fold)?.get(config_index)
    }
}

/// The same model for every fold and configuration.
pub fn uniform_search<M: FittedModel + Clone>(scores: Vec<f64>, num_folds: usize, model: M) -> SearchResult<M> {
    let models = (0..num_folds)
        .map(|_| vec![model.clone(); scores.len()])
        .collect();
    SearchResult { scores, models }
}
