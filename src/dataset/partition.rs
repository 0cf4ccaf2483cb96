//! Stratified fold assignment.
//!
//! Rows are partitioned into strata by `(group_key, label)`. Within a stratum
//! of `n` rows, the row with running index `i` goes to fold
//! `floor(i / (n / k))`, which in exact integer form is `i * k / n`. Each
//! stratum is thereby spread across the folds as evenly as integer division
//! allows, and every fold approximates the class and group balance of the
//! whole dataset.
//!
//! Strata are processed independently and recombined, so each row is tagged
//! with its original ordinal first and the recombined rows are sorted back
//! by that ordinal before it is dropped.

use crate::core::error::{FoldEvalError, Result};
use crate::core::types::*;
use crate::dataset::{Dataset, Row};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

/// Key of one stratum
pub type StratumKey = (GroupKey, ClassId);

/// Assigns stratified fold indices to a dataset.
#[derive(Debug, Clone)]
pub struct StratifiedFoldAssigner {
    num_folds: usize,
    shuffle_seed: Option<u64>,
}

impl StratifiedFoldAssigner {
    /// Create an assigner producing `num_folds` folds.
    pub fn new(num_folds: usize) -> Result<Self> {
        if num_folds == 0 {
            return Err(FoldEvalError::invalid_argument(
                "num_folds",
                num_folds.to_string(),
                "must be a positive integer",
            ));
        }
        Ok(StratifiedFoldAssigner {
            num_folds,
            shuffle_seed: None,
        })
    }

    /// Shuffle each stratum with a seeded RNG before taking running indices.
    ///
    /// Without a seed the running index follows input order.
    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    /// Number of folds produced
    pub fn num_folds(&self) -> usize {
        self.num_folds
    }

    /// Fold for running index `index` inside a stratum of `size` rows.
    pub fn fold_for(&self, index: usize, size: usize) -> FoldIndex {
        index * self.num_folds / size
    }

    /// Return a copy of `dataset` with `fold` set on every row, rows in their
    /// original order.
    pub fn assign(&self, dataset: &Dataset) -> Result<Dataset> {
        let strata = stratify(dataset);
        log::info!(
            "Assigning {} rows from {} strata to {} folds",
            dataset.len(),
            strata.len(),
            self.num_folds
        );

        let mut rng = self.shuffle_seed.map(StdRng::seed_from_u64);
        let mut tagged: Vec<(usize, Row)> = Vec::with_capacity(dataset.len());

        for ((group_key, label), mut ordinals) in strata {
            if let Some(rng) = rng.as_mut() {
                ordinals.shuffle(rng);
            }
            let size = ordinals.len();
            if size < self.num_folds {
                log::debug!(
                    "stratum ({}, {}) has {} rows for {} folds; some folds get none of it",
                    group_key,
                    label,
                    size,
                    self.num_folds
                );
            }
            for (index, ordinal) in ordinals.into_iter().enumerate() {
                let mut row = dataset.rows()[ordinal].clone();
                row.fold = Some(self.fold_for(index, size));
                tagged.push((ordinal, row));
            }
        }

        tagged.sort_by_key(|(ordinal, _)| *ordinal);
        let rows = tagged.into_iter().map(|(_, row)| row).collect();

        Ok(dataset.with_rows(rows))
    }
}

/// Row ordinals of each `(group_key, label)` stratum, in input order.
pub fn stratify(dataset: &Dataset) -> BTreeMap<StratumKey, Vec<usize>> {
    let mut strata: BTreeMap<StratumKey, Vec<usize>> = BTreeMap::new();
    for (ordinal, row) in dataset.rows().iter().enumerate() {
        strata
            .entry((row.group_key.clone(), row.label))
            .or_default()
            .push(ordinal);
    }
    strata
}

/// Per-stratum row count of each fold. Rows without a fold are ignored.
pub fn stratum_fold_counts(
    dataset: &Dataset,
    num_folds: usize,
) -> BTreeMap<StratumKey, Vec<usize>> {
    let mut counts: BTreeMap<StratumKey, Vec<usize>> = BTreeMap::new();
    for row in dataset.rows() {
        let entry = counts
            .entry((row.group_key.clone(), row.label))
            .or_insert_with(|| vec![0; num_folds]);
        if let Some(fold) = row.fold.filter(|&f| f < num_folds) {
            entry[fold] += 1;
        }
    }
    counts
}

/// Add a stratified `fold` column with `n_folds` folds.
pub fn assign_folds(dataset: &Dataset, n_folds: usize) -> Result<Dataset> {
    StratifiedFoldAssigner::new(n_folds)?.assign(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(rows: &[(i64, ClassId)]) -> Dataset {
        rows.iter()
            .enumerate()
            .map(|(i, &(group, label))| Row::new(label, vec![i as f64]).with_group(GroupKey::Int(group)))
            .collect()
    }

    #[test]
    fn test_zero_folds_rejected() {
        let ds = dataset(&[(0, 0)]);
        assert!(matches!(
            assign_folds(&ds, 0),
            Err(FoldEvalError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_floor_division_within_stratum() {
        // one stratum of 7 rows, 3 folds: i * 3 / 7
        let ds = dataset(&[(0, 1); 7]);
        let folded = assign_folds(&ds, 3).unwrap();
        let folds: Vec<_> = folded.rows().iter().map(|r| r.fold.unwrap()).collect();
        assert_eq!(folds, vec![0, 0, 0, 1, 1, 2, 2]);
    }

    #[test]
    fn test_small_stratum_leaves_folds_empty() {
        let ds = dataset(&[(0, 0), (0, 0)]);
        let folded = assign_folds(&ds, 5).unwrap();
        let folds: Vec<_> = folded.rows().iter().map(|r| r.fold.unwrap()).collect();
        assert_eq!(folds, vec![0, 2]);
    }

    #[test]
    fn test_order_restored_after_recombination() {
        let ds = dataset(&[(1, 0), (0, 1), (1, 1), (0, 0), (1, 0), (0, 1)]);
        let folded = assign_folds(&ds, 2).unwrap();
        let before: Vec<_> = ds.rows().iter().map(|r| r.features[0]).collect();
        let after: Vec<_> = folded.rows().iter().map(|r| r.features[0]).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_strata_balanced() {
        let mut rows = Vec::new();
        for group in 0..3 {
            for label in 0..2 {
                for _ in 0..(10 + group as usize) {
                    rows.push((group, label));
                }
            }
        }
        let folded = assign_folds(&dataset(&rows), 4).unwrap();
        for counts in stratum_fold_counts(&folded, 4).values() {
            let max = counts.iter().max().unwrap();
            let min = counts.iter().min().unwrap();
            assert!(max - min <= 1, "unbalanced stratum: {:?}", counts);
        }
    }

    #[test]
    fn test_features_and_schema_survive_assignment() {
        let collected: Dataset = (0..14)
            .map(|i| Row::new((i % 2) as ClassId, vec![i as f64, 1.0]))
            .collect();
        let folded = assign_folds(&collected, 6).unwrap();
        assert_eq!(folded.len(), 14);
        assert!(folded.has_folds());
        assert_eq!(folded.rows()[5].features, vec![5.0, 1.0]);

        let named = Dataset::with_feature_names(
            vec![Row::new(0, vec![1.0]), Row::new(1, vec![2.0])],
            vec!["x".to_string()],
        )
        .unwrap();
        assert_eq!(assign_folds(&named, 2).unwrap().feature_names(), &["x".to_string()]);
    }

    #[test]
    fn test_shuffle_is_seeded() {
        let ds = dataset(&[(0, 0); 20]);
        let a = StratifiedFoldAssigner::new(4).unwrap().with_shuffle_seed(7).assign(&ds).unwrap();
        let b = StratifiedFoldAssigner::new(4).unwrap().with_shuffle_seed(7).assign(&ds).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.fold_sizes(4), vec![5, 5, 5, 5]);
    }
}
