//! Inference engine implementation
//!
//! Serving-side wrapper around a loaded artifact:
//! - Immutable network shared read-only across requests
//! - Input validation against the serving signature
//! - Parallel batch prediction via rayon
//! - Lock-free request/error/latency counters

use super::{InferenceConfig, Prediction};
use crate::error::{HarError, Result};
use crate::export::{load_artifact, ArtifactMetadata, LoadedArtifact, ServingSignature};
use crate::model::HarNetwork;
use ndarray::{Array2, Array3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Inference statistics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceStats {
    pub total_predictions: u64,
    pub error_count: u64,
    pub avg_latency_ms: f64,
}

#[derive(Debug, Default)]
struct StatsCollector {
    predictions: AtomicU64,
    errors: AtomicU64,
    latency_us: AtomicU64,
}

impl StatsCollector {
    fn record(&self, rows: u64, started: Instant) {
        self.predictions.fetch_add(rows, Ordering::Relaxed);
        self.latency_us.fetch_add(started.elapsed().as_micros() as u64, Ordering::Relaxed);
    }

    fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> InferenceStats {
        let total = self.predictions.load(Ordering::Relaxed);
        let latency_us = self.latency_us.load(Ordering::Relaxed);
        InferenceStats {
            total_predictions: total,
            error_count: self.errors.load(Ordering::Relaxed),
            avg_latency_ms: if total > 0 { latency_us as f64 / total as f64 / 1000.0 } else { 0.0 },
        }
    }
}

/// Loaded classifier ready to answer prediction requests
pub struct InferenceEngine {
    config: InferenceConfig,
    network: HarNetwork,
    signature: ServingSignature,
    metadata: ArtifactMetadata,
    stats: StatsCollector,
}

impl std::fmt::Debug for InferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("config", &self.config)
            .field("signature", &self.signature.name)
            .field("model", &self.metadata.name)
            .field("params", &self.network.n_params())
            .finish()
    }
}

impl InferenceEngine {
    /// Load an artifact (serving directory or quantized file)
    pub fn load(path: impl AsRef<Path>, config: InferenceConfig) -> Result<Self> {
        let path = path.as_ref();
        let start = Instant::now();
        let engine = Self::from_artifact(load_artifact(path)?, config)?;
        info!(
            path = %path.display(),
            model = %engine.metadata.name,
            format = ?engine.metadata.weight_format,
            params = engine.network.n_params(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model loaded"
        );
        Ok(engine)
    }

    pub fn from_artifact(artifact: LoadedArtifact, config: InferenceConfig) -> Result<Self> {
        let LoadedArtifact { network, signature, metadata } = artifact;
        signature.check_matches(network.config())?;
        let engine = Self {
            config,
            network,
            signature,
            metadata,
            stats: StatsCollector::default(),
        };
        if engine.config.warmup {
            engine.warmup()?;
        }
        Ok(engine)
    }

    /// Wrap an in-memory network, e.g. straight after training
    pub fn from_network(network: HarNetwork, config: InferenceConfig) -> Result<Self> {
        let signature = ServingSignature::for_config(network.config());
        let metadata = ArtifactMetadata::default().with_params(network.n_params());
        Self::from_artifact(LoadedArtifact { network, signature, metadata }, config)
    }

    /// One all-zero forward pass; a failure here means the model is unusable
    fn warmup(&self) -> Result<()> {
        let (steps, features) = self.network.input_shape();
        let probs = self
            .network
            .forward(&Array3::zeros((1, steps, features)))
            .map_err(|e| HarError::ModelLoadFailure(format!("warmup failed: {}", e)))?;
        let row = probs.row(0).to_vec();
        Prediction::from_probabilities(&row)
            .map_err(|e| HarError::ModelLoadFailure(format!("warmup failed: {}", e)))?;
        Ok(())
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    pub fn signature(&self) -> &ServingSignature {
        &self.signature
    }

    pub fn metadata(&self) -> &ArtifactMetadata {
        &self.metadata
    }

    pub fn network(&self) -> &HarNetwork {
        &self.network
    }

    /// Features expected per request
    pub fn n_features(&self) -> usize {
        let (steps, features) = self.network.input_shape();
        steps * features
    }

    pub fn stats(&self) -> InferenceStats {
        self.stats.snapshot()
    }

    /// Classify one feature vector
    pub fn predict(&self, features: &[f32]) -> Result<Prediction> {
        let start = Instant::now();
        let result = self.validate(features).and_then(|x| self.run(&x)).and_then(|probs| {
            let row = probs.row(0).to_vec();
            Prediction::from_probabilities(&row)
        });
        match &result {
            Ok(p) => {
                self.stats.record(1, start);
                debug!(label = %p.label, confidence = p.confidence, "Prediction");
            }
            Err(e) => {
                self.stats.record_error();
                debug!(error = %e, "Prediction rejected");
            }
        }
        result
    }

    /// Classify many vectors; the whole batch fails if any row is invalid
    pub fn predict_batch(&self, rows: &[Vec<f32>]) -> Result<Vec<Prediction>> {
        let start = Instant::now();
        let result = self.predict_batch_inner(rows);
        match &result {
            Ok(preds) => self.stats.record(preds.len() as u64, start),
            Err(e) => {
                self.stats.record_error();
                warn!(rows = rows.len(), error = %e, "Batch prediction failed");
            }
        }
        result
    }

    fn predict_batch_inner(&self, rows: &[Vec<f32>]) -> Result<Vec<Prediction>> {
        let chunk_size = self.config.batch_size.max(1);
        let predict_chunk = |chunk: &[Vec<f32>]| -> Result<Vec<Prediction>> {
            let x = self.stack(chunk)?;
            let probs = self.run(&x)?;
            probs
                .rows()
                .into_iter()
                .map(|row| Prediction::from_probabilities(&row.to_vec()))
                .collect()
        };

        let parts: Vec<Vec<Prediction>> = match self.config.n_workers {
            Some(n) if n > 1 => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| HarError::InferenceFailure(e.to_string()))?;
                pool.install(|| rows.par_chunks(chunk_size).map(predict_chunk).collect::<Result<_>>())?
            }
            Some(_) => rows.chunks(chunk_size).map(predict_chunk).collect::<Result<_>>()?,
            None => rows.par_chunks(chunk_size).map(predict_chunk).collect::<Result<_>>()?,
        };
        Ok(parts.into_iter().flatten().collect())
    }

    fn validate(&self, features: &[f32]) -> Result<Array3<f32>> {
        self.check_features(features)?;
        let (steps, n) = self.network.input_shape();
        Ok(Array3::from_shape_vec((1, steps, n), features.to_vec())?)
    }

    fn check_features(&self, features: &[f32]) -> Result<()> {
        let expected = self.n_features();
        if features.len() != expected {
            return Err(HarError::InvalidInput(format!(
                "expected {} features, got {}",
                expected,
                features.len()
            )));
        }
        if let Some(i) = features.iter().position(|v| !v.is_finite()) {
            return Err(HarError::InvalidInput(format!("feature {} is not a finite number", i)));
        }
        Ok(())
    }

    fn stack(&self, rows: &[Vec<f32>]) -> Result<Array3<f32>> {
        let (steps, n) = self.network.input_shape();
        let mut data = Vec::with_capacity(rows.len() * steps * n);
        for (i, row) in rows.iter().enumerate() {
            self.check_features(row)
                .map_err(|e| HarError::InvalidInput(format!("row {}: {}", i, e)))?;
            data.extend_from_slice(row);
        }
        Ok(Array3::from_shape_vec((rows.len(), steps, n), data)?)
    }

    fn run(&self, x: &Array3<f32>) -> Result<Array2<f32>> {
        self.network
            .forward(x)
            .map_err(|e| HarError::InferenceFailure(e.to_string()))
    }
}
