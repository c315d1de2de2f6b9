//! Preprocessing configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::scaler::DEFAULT_EPSILON;

/// Configuration for dataset preprocessing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    /// Root of the raw dataset (contains `train/` and `test/`)
    pub raw_dir: PathBuf,

    /// Directory the normalized arrays are written to
    pub processed_dir: PathBuf,

    /// Added to every standard deviation before dividing
    pub epsilon: f64,

    /// Expected number of features per sample; `None` accepts any width
    pub expected_features: Option<usize>,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw/UCI HAR Dataset"),
            processed_dir: PathBuf::from("data/processed"),
            epsilon: DEFAULT_EPSILON,
            expected_features: Some(crate::activity::NUM_FEATURES),
        }
    }
}

impl PreprocessingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the raw dataset directory
    pub fn with_raw_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.raw_dir = dir.into();
        self
    }

    /// Builder method to set the output directory
    pub fn with_processed_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.processed_dir = dir.into();
        self
    }

    /// Builder method to set the standard-deviation epsilon
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Builder method to set (or disable) the feature-count check
    pub fn with_expected_features(mut self, n: Option<usize>) -> Self {
        self.expected_features = n;
        self
    }
}
