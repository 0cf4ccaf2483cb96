//! Core data types for foldeval.
//!
//! This module defines the fundamental value types shared by fold assignment,
//! metric computation and cross-validation aggregation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Class identifier. Labels are non-negative integers and double as the
/// index into a row's probability vector.
pub type ClassId = u32;

/// Zero-based fold index in `[0, num_folds)`.
pub type FoldIndex = usize;

/// Index of a hyperparameter configuration inside a search grid.
pub type ConfigIndex = usize;

/// Secondary stratification key (for example the date a row was observed).
///
/// Keys are totally ordered so strata can be enumerated deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GroupKey {
    /// Row has no group; all such rows share one stratum per label
    None,
    /// Integer key
    Int(i64),
    /// Calendar date key
    Date(NaiveDate),
    /// Free-form text key
    Text(String),
}

impl GroupKey {
    /// Parse a group key from its textual form.
    ///
    /// ISO dates (`YYYY-MM-DD`) win over integers, integers over free text.
    /// Blank input yields [`GroupKey::None`].
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return GroupKey::None;
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return GroupKey::Date(date);
        }
        if let Ok(value) = raw.parse::<i64>() {
            return GroupKey::Int(value);
        }
        GroupKey::Text(raw.to_string())
    }

    /// Whether this key carries a value
    pub fn is_none(&self) -> bool {
        matches!(self, GroupKey::None)
    }
}

impl Default for GroupKey {
    fn default() -> Self {
        GroupKey::None
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::None => Ok(()),
            GroupKey::Int(value) => write!(f, "{}", value),
            GroupKey::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            GroupKey::Text(text) => write!(f, "{}", text),
        }
    }
}

impl From<NaiveDate> for GroupKey {
    fn from(date: NaiveDate) -> Self {
        GroupKey::Date(date)
    }
}

impl From<i64> for GroupKey {
    fn from(value: i64) -> Self {
        GroupKey::Int(value)
    }
}

impl From<&str> for GroupKey {
    fn from(value: &str) -> Self {
        GroupKey::Text(value.to_string())
    }
}

/// What to do with a fold that received no rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyFoldPolicy {
    /// Fail the whole aggregation
    Reject,
    /// Average over the non-empty folds only
    Skip,
}

impl Default for EmptyFoldPolicy {
    fn default() -> Self {
        EmptyFoldPolicy::Reject
    }
}

impl fmt::Display for EmptyFoldPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyFoldPolicy::Reject => write!(f, "reject"),
            EmptyFoldPolicy::Skip => write!(f, "skip"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_key_parse() {
        assert_eq!(GroupKey::parse(""), GroupKey::None);
        assert_eq!(GroupKey::parse("  "), GroupKey::None);
        assert_eq!(
            GroupKey::parse("2021-03-04"),
            GroupKey::Date(NaiveDate::from_ymd_opt(2021, 3, 4).unwrap())
        );
        assert_eq!(GroupKey::parse("17"), GroupKey::Int(17));
        assert_eq!(GroupKey::parse("north"), GroupKey::Text("north".to_string()));
    }

    #[test]
    fn test_group_key_display_roundtrip() {
        for raw in ["2020-01-31", "-4", "site-a"] {
            assert_eq!(GroupKey::parse(raw).to_string(), raw);
        }
    }

    #[test]
    fn test_group_key_ordering() {
        let mut keys = vec![
            GroupKey::Text("b".into()),
            GroupKey::Int(3),
            GroupKey::None,
            GroupKey::Int(1),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                GroupKey::None,
                GroupKey::Int(1),
                GroupKey::Int(3),
                GroupKey::Text("b".into())
            ]
        );
    }

    #[test]
    fn test_empty_fold_policy_default() {
        assert_eq!(EmptyFoldPolicy::default(), EmptyFoldPolicy::Reject);
        assert_eq!(EmptyFoldPolicy::Skip.to_string(), "skip");
    }
}
