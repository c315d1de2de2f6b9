//! Inference configuration

use serde::{Deserialize, Serialize};

/// Configuration for model inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Rows per forward pass in batch prediction
    pub batch_size: usize,

    /// Number of parallel workers for batch prediction
    pub n_workers: Option<usize>,

    /// Run one all-zero prediction right after loading
    pub warmup: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            batch_size: 256,
            n_workers: None,
            warmup: true,
        }
    }
}

impl InferenceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set batch size
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Builder method to set number of workers
    pub fn with_workers(mut self, n: usize) -> Self {
        self.n_workers = Some(n);
        self
    }

    pub fn with_warmup(mut self, warmup: bool) -> Self {
        self.warmup = warmup;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = InferenceConfig::new().with_batch_size(0).with_workers(2).with_warmup(false);
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.n_workers, Some(2));
        assert!(!config.warmup);
    }
}
