//! Configuration management for foldeval.
//!
//! [`EvaluationConfig`] gathers every knob of fold assignment, metric
//! computation and aggregation. It can be built fluently, read from JSON or
//! TOML files and overridden from `FOLDEVAL_*` environment variables.

pub mod core;

pub use self::core::{parse_threshold_list, EvaluationConfig, EvaluationConfigBuilder};

use crate::core::error::{FoldEvalError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration file looked up by the command line tool when none is given
pub const DEFAULT_CONFIG_FILE: &str = "foldeval.toml";

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigFormat {
    /// TOML configuration format
    Toml,
    /// JSON configuration format
    Json,
}

impl Default for ConfigFormat {
    fn default() -> Self {
        ConfigFormat::Toml
    }
}

impl ConfigFormat {
    /// Format implied by a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("json") => Ok(ConfigFormat::Json),
            Some("toml") => Ok(ConfigFormat::Toml),
            _ => Err(FoldEvalError::config(
                "Unsupported config file format. Use .json or .toml",
            )),
        }
    }
}
