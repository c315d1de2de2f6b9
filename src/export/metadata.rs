//! Descriptive metadata stored next to exported weights

use crate::activity::Activity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How the weights of an artifact are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightFormat {
    Float32,
    Int8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Model name
    pub name: String,
    /// Model version
    pub version: String,
    /// Export timestamp
    pub created_at: DateTime<Utc>,
    /// Class names in output order
    pub labels: Vec<String>,
    pub weight_format: WeightFormat,
    pub n_params: usize,
    /// Training and evaluation metrics
    pub metrics: BTreeMap<String, f64>,
}

impl Default for ArtifactMetadata {
    fn default() -> Self {
        Self {
            name: "har_gru".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: Utc::now(),
            labels: Activity::names(),
            weight_format: WeightFormat::Float32,
            n_params: 0,
            metrics: BTreeMap::new(),
        }
    }
}

impl ArtifactMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_params(mut self, n_params: usize) -> Self {
        self.n_params = n_params;
        self
    }

    pub fn with_weight_format(mut self, format: WeightFormat) -> Self {
        self.weight_format = format;
        self
    }

    pub fn add_metric(mut self, key: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(key.into(), value);
        self
    }
}
