//! Default values and fixed parameters for foldeval.

/// Library version string
pub const FOLDEVAL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default number of cross-validation folds.
pub const DEFAULT_NUM_FOLDS: usize = 5;

/// Number of thresholds in the default calibration sweep.
pub const DEFAULT_NUM_THRESHOLDS: usize = 9;

/// Reference scale applied to the rest-class probability in the
/// one-vs-rest ratio test: positive when `p / t >= p_rest / REST_REFERENCE_THRESHOLD`.
pub const REST_REFERENCE_THRESHOLD: f64 = 0.5;

/// Default random seed for within-stratum shuffling.
pub const DEFAULT_RANDOM_SEED: u64 = 0;

/// Prefix of the environment variables read by
/// [`EvaluationConfig::load_from_environment`](crate::config::EvaluationConfig::load_from_environment).
pub const ENV_PREFIX: &str = "FOLDEVAL_";

/// Default CSV column holding the class label.
pub const DEFAULT_LABEL_COLUMN: &str = "label";

/// Default CSV column holding the stratification group key.
pub const DEFAULT_GROUP_COLUMN: &str = "group";

/// Default CSV column holding the fold index.
pub const DEFAULT_FOLD_COLUMN: &str = "fold";

/// Default CSV column holding the class-balancing weight.
pub const DEFAULT_WEIGHT_COLUMN: &str = "weight";

/// Default CSV column holding the hard predicted label.
pub const DEFAULT_PREDICTION_COLUMN: &str = "prediction";

/// Default prefix of the per-class probability columns (`probability_0`, ...).
pub const DEFAULT_PROBABILITY_PREFIX: &str = "probability_";

/// Tolerance used when checking that a probability vector sums to one.
pub const PROBABILITY_SUM_TOLERANCE: f64 = 1e-6;

/// Default threshold sweep: nine evenly spaced values strictly inside (0, 1).
pub fn default_thresholds() -> Vec<f64> {
    (1..=DEFAULT_NUM_THRESHOLDS)
        .map(|i| i as f64 / (DEFAULT_NUM_THRESHOLDS + 1) as f64)
        .collect()
}
