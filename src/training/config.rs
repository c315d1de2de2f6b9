//! Training configuration

use crate::error::{HarError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for fitting the classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Passes over the training samples
    pub epochs: usize,

    /// Mini-batch size
    pub batch_size: usize,

    /// Trailing fraction of the training samples held out for validation
    pub validation_split: f64,

    /// Adam step size
    pub learning_rate: f32,

    /// Adam first-moment decay
    pub beta1: f32,

    /// Adam second-moment decay
    pub beta2: f32,

    /// Adam numerical stability term
    pub epsilon: f32,

    /// Seed for shuffling and dropout
    pub random_state: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 20,
            batch_size: 32,
            validation_split: 0.2,
            learning_rate: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            random_state: Some(42),
        }
    }
}

impl TrainingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the number of epochs
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Builder method to set the batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Builder method to set the validation split
    pub fn with_validation_split(mut self, split: f64) -> Self {
        self.validation_split = split;
        self
    }

    /// Builder method to set the learning rate
    pub fn with_learning_rate(mut self, lr: f32) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Builder method to set the random seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 || self.batch_size == 0 {
            return Err(HarError::ConfigError(format!(
                "epochs and batch_size must be positive (epochs={}, batch_size={})",
                self.epochs, self.batch_size
            )));
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            return Err(HarError::ConfigError(format!(
                "validation_split must be in [0, 1), got {}",
                self.validation_split
            )));
        }
        if self.learning_rate <= 0.0 {
            return Err(HarError::ConfigError(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrainingConfig::default();
        assert_eq!(config.epochs, 20);
        assert_eq!(config.batch_size, 32);
        assert!((config.validation_split - 0.2).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = TrainingConfig::new()
            .with_epochs(5)
            .with_batch_size(64)
            .with_validation_split(0.0)
            .with_learning_rate(0.01);

        assert_eq!(config.epochs, 5);
        assert_eq!(config.batch_size, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects() {
        assert!(TrainingConfig::new().with_epochs(0).validate().is_err());
        assert!(TrainingConfig::new().with_validation_split(1.0).validate().is_err());
        assert!(TrainingConfig::new().with_learning_rate(0.0).validate().is_err());
    }
}
