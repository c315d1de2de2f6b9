//! Model architecture configuration

use crate::activity::{NUM_CLASSES, NUM_FEATURES, NUM_TIMESTEPS};
use crate::error::{HarError, Result};
use serde::{Deserialize, Serialize};

/// Architecture of the recurrent classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Sequence length
    pub timesteps: usize,
    /// Features per step
    pub n_features: usize,
    /// Units of each GRU layer; every layer but the last returns its full sequence
    pub gru_units: Vec<usize>,
    /// Hidden dense layers (ReLU) between the GRU stack and the output
    pub dense_units: Vec<usize>,
    /// Dropout rate after the GRU stack and after every hidden dense layer
    pub dropout: f32,
    /// Output classes
    pub n_classes: usize,
    /// Seed for weight initialization
    pub seed: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            timesteps: NUM_TIMESTEPS,
            n_features: NUM_FEATURES,
            gru_units: vec![64],
            dense_units: vec![64],
            dropout: 0.3,
            n_classes: NUM_CLASSES,
            seed: Some(42),
        }
    }
}

impl ModelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Two stacked GRU layers (64 → 32) with a 32-unit dense head
    pub fn stacked() -> Self {
        Self {
            gru_units: vec![64, 32],
            dense_units: vec![32],
            ..Self::default()
        }
    }

    pub fn with_input(mut self, timesteps: usize, n_features: usize) -> Self {
        self.timesteps = timesteps;
        self.n_features = n_features;
        self
    }

    pub fn with_gru_units(mut self, units: Vec<usize>) -> Self {
        self.gru_units = units;
        self
    }

    pub fn with_dense_units(mut self, units: Vec<usize>) -> Self {
        self.dense_units = units;
        self
    }

    pub fn with_dropout(mut self, rate: f32) -> Self {
        self.dropout = rate;
        self
    }

    pub fn with_classes(mut self, n_classes: usize) -> Self {
        self.n_classes = n_classes;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.gru_units.is_empty() || self.gru_units.len() > 2 {
            return Err(HarError::ConfigError(format!(
                "expected one or two GRU layers, got {}",
                self.gru_units.len()
            )));
        }
        if self.timesteps == 0 || self.n_features == 0 || self.n_classes < 2 {
            return Err(HarError::ConfigError(format!(
                "invalid shape: timesteps={}, n_features={}, n_classes={}",
                self.timesteps, self.n_features, self.n_classes
            )));
        }
        if self.gru_units.iter().chain(self.dense_units.iter()).any(|&u| u == 0) {
            return Err(HarError::ConfigError("layer sizes must be positive".to_string()));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(HarError::ConfigError(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        Ok(())
    }
}
