//! Trained-model persistence
//!
//! Weights are stored inference-only: the optimizer state is dropped.

use super::{Evaluation, TrainingConfig, TrainingHistory};
use crate::error::{HarError, Result};
use crate::model::HarNetwork;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

/// Default file name of a trained checkpoint
pub const CHECKPOINT_FILE: &str = "har_gru_model.bin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    pub network: HarNetwork,
    pub training: TrainingConfig,
    pub history: TrainingHistory,
    /// Held-out test metrics, when a test split was evaluated
    pub test_evaluation: Option<Evaluation>,
    pub trained_at: DateTime<Utc>,
}

impl TrainedModel {
    pub fn new(network: HarNetwork, training: TrainingConfig, history: TrainingHistory) -> Self {
        Self {
            network,
            training,
            history,
            test_evaluation: None,
            trained_at: Utc::now(),
        }
    }

    pub fn with_test_evaluation(mut self, evaluation: Evaluation) -> Self {
        self.test_evaluation = Some(evaluation);
        self
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(writer, self)?;
        info!(path = %path.display(), params = self.network.n_params(), "Saved trained model");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path).map_err(|e| {
            HarError::ModelLoadFailure(format!("cannot open {}: {}", path.display(), e))
        })?);
        let model: Self = bincode::deserialize_from(reader)
            .map_err(|e| HarError::ModelLoadFailure(format!("{}: {}", path.display(), e)))?;
        let network = HarNetwork::from_parts(
            model.network.config().clone(),
            model.network.gru_layers().to_vec(),
            model.network.dense_layers().to_vec(),
        )
        .map_err(|e| HarError::ModelLoadFailure(format!("{}: {}", path.display(), e)))?;
        Ok(Self { network, ..model })
    }
}
