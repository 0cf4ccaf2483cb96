//! The set of distinct class labels observed in a dataset.

use crate::core::types::ClassId;
use serde::{Deserialize, Serialize};

/// Sorted, de-duplicated class labels.
///
/// Every place where iteration order reaches the output (confusion matrix
/// axes, per-class F1 keys, threshold tables) goes through a `ClassSet`, so
/// the order is always ascending by label.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClassSet {
    labels: Vec<ClassId>,
}

impl ClassSet {
    /// Build a class set from any sequence of labels.
    pub fn from_labels<I: IntoIterator<Item = ClassId>>(labels: I) -> Self {
        let mut labels: Vec<ClassId> = labels.into_iter().collect();
        labels.sort_unstable();
        labels.dedup();
        ClassSet { labels }
    }

    /// Labels in ascending order
    pub fn labels(&self) -> &[ClassId] {
        &self.labels
    }

    /// Iterate over labels in ascending order
    pub fn iter(&self) -> impl Iterator<Item = ClassId> + '_ {
        self.labels.iter().copied()
    }

    /// Number of distinct labels
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether no label was observed
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Position of `label` along matrix axes, if present
    pub fn position(&self, label: ClassId) -> Option<usize> {
        self.labels.binary_search(&label).ok()
    }

    /// Whether `label` belongs to the set
    pub fn contains(&self, label: ClassId) -> bool {
        self.position(label).is_some()
    }

    /// Largest label, if any
    pub fn max_label(&self) -> Option<ClassId> {
        self.labels.last().copied()
    }

    /// Labels present in either set
    pub fn union(&self, other: &ClassSet) -> ClassSet {
        ClassSet::from_labels(self.iter().chain(other.iter()))
    }
}

impl FromIterator<ClassId> for ClassSet {
    fn from_iter<I: IntoIterator<Item = ClassId>>(iter: I) -> Self {
        ClassSet::from_labels(iter)
    }
}
