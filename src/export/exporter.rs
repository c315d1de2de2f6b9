//! Trained checkpoint → servable artifacts

use super::artifact::{save_quantized, save_serving_dir, QUANTIZED_FILE, SERVING_DIR};
use super::metadata::ArtifactMetadata;
use super::signature::ServingSignature;
use crate::error::{HarError, Result};
use crate::model::HarNetwork;
use crate::training::TrainedModel;
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory receiving both artifacts
    pub output_dir: PathBuf,
    pub serving_dir_name: String,
    pub quantized_file_name: String,
    /// Also write the int8 artifact
    pub quantize: bool,
    pub model_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("models"),
            serving_dir_name: SERVING_DIR.to_string(),
            quantized_file_name: QUANTIZED_FILE.to_string(),
            quantize: true,
            model_name: "har_gru".to_string(),
        }
    }
}

impl ExportConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_quantize(mut self, quantize: bool) -> Self {
        self.quantize = quantize;
        self
    }

    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    pub fn serving_dir(&self) -> PathBuf {
        self.output_dir.join(&self.serving_dir_name)
    }

    pub fn quantized_path(&self) -> PathBuf {
        self.output_dir.join(&self.quantized_file_name)
    }
}

/// Paths written by an export
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub serving_dir: PathBuf,
    pub quantized: Option<PathBuf>,
    pub n_params: usize,
    /// Int8 weight bytes, when quantized
    pub quantized_bytes: Option<usize>,
}

pub struct Exporter {
    config: ExportConfig,
}

impl Exporter {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Export a checkpoint, carrying its final metrics into the metadata
    pub fn export(&self, model: &TrainedModel) -> Result<ExportReport> {
        let mut metadata = ArtifactMetadata::new(&self.config.model_name);
        if let Some(last) = model.history.last() {
            metadata = metadata.add_metric("train_loss", last.loss).add_metric("train_accuracy", last.accuracy);
            if let Some(v) = last.val_accuracy {
                metadata = metadata.add_metric("val_accuracy", v);
            }
        }
        if let Some(eval) = model.test_evaluation {
            metadata = metadata
                .add_metric("test_loss", eval.loss)
                .add_metric("test_accuracy", eval.accuracy);
        }
        self.export_network(&model.network, metadata)
    }

    pub fn export_network(&self, network: &HarNetwork, metadata: ArtifactMetadata) -> Result<ExportReport> {
        let signature = ServingSignature::for_config(network.config());
        if signature != ServingSignature::canonical() {
            return Err(HarError::ConfigError(format!(
                "model input/output {:?} -> {:?} does not match the serving contract",
                signature.inputs[0].shape, signature.outputs[0].shape
            )));
        }
        sanity_check(network)?;

        let metadata = metadata.with_params(network.n_params());
        let serving_dir = self.config.serving_dir();
        save_serving_dir(&serving_dir, network, &signature, &metadata)?;

        let (quantized, quantized_bytes) = if self.config.quantize {
            let path = self.config.quantized_path();
            let bytes = save_quantized(&path, network, &signature, &metadata)?;
            (Some(path), Some(bytes))
        } else {
            (None, None)
        };

        info!(
            serving_dir = %serving_dir.display(),
            quantized = self.config.quantize,
            params = network.n_params(),
            "Export complete"
        );
        Ok(ExportReport {
            serving_dir,
            quantized,
            n_params: network.n_params(),
            quantized_bytes,
        })
    }
}

/// Forward an all-zero input and require a valid distribution
pub fn sanity_check(network: &HarNetwork) -> Result<()> {
    let (steps, features) = network.input_shape();
    let probs = network.forward(&Array3::zeros((1, steps, features)))?;
    let valid = probs.dim() == (1, network.n_classes())
        && probs.iter().all(|p| p.is_finite() && *p >= 0.0)
        && (probs.sum() - 1.0).abs() < 1e-4;
    if !valid {
        return Err(HarError::InferenceFailure(format!(
            "zero-input sanity check produced {:?}",
            probs.as_slice()
        )));
    }
    Ok(())
}
