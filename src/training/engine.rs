//! Training engine implementation
//!
//! Mini-batch training with:
//! - Per-epoch shuffling of the training portion
//! - Trailing validation split evaluated after every epoch
//! - Adam updates over all network parameters
//! - Parallel batched evaluation via rayon

use crate::error::{HarError, Result};
use crate::model::{loss_and_accuracy, HarNetwork, ModelConfig};
use super::optimizer::Adam;
use super::TrainingConfig;
use ndarray::{s, Array1, Array2, Array3, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Metrics recorded at the end of an epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub loss: f64,
    pub accuracy: f64,
    pub val_loss: Option<f64>,
    pub val_accuracy: Option<f64>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochMetrics>,
}

impl TrainingHistory {
    pub fn last(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }
}

/// Loss and accuracy over a labelled set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub loss: f64,
    pub accuracy: f64,
    pub n_samples: usize,
}

/// Fits a [`HarNetwork`] with sparse categorical cross-entropy
pub struct Trainer {
    config: TrainingConfig,
    network: HarNetwork,
    optimizer: Adam,
    history: TrainingHistory,
    is_fitted: bool,
}

impl std::fmt::Debug for Trainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trainer")
            .field("config", &self.config)
            .field("model", self.network.config())
            .field("epochs_run", &self.history.len())
            .field("is_fitted", &self.is_fitted)
            .finish()
    }
}

impl Trainer {
    /// Build a trainer around a freshly initialized network
    pub fn new(model_config: ModelConfig, config: TrainingConfig) -> Result<Self> {
        Self::with_network(HarNetwork::new(model_config)?, config)
    }

    /// Continue training an existing network
    pub fn with_network(network: HarNetwork, config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        let optimizer = Adam::new(config.learning_rate, config.beta1, config.beta2, config.epsilon);
        Ok(Self {
            config,
            network,
            optimizer,
            history: TrainingHistory::default(),
            is_fitted: false,
        })
    }

    pub fn network(&self) -> &HarNetwork {
        &self.network
    }

    pub fn into_network(self) -> HarNetwork {
        self.network
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn history(&self) -> &TrainingHistory {
        &self.history
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Fit on `(samples, timesteps, features)` inputs and 0-based labels
    pub fn fit(&mut self, x: &Array3<f32>, y: &Array1<u8>) -> Result<&TrainingHistory> {
        self.check_data(x, y)?;

        let n_samples = x.dim().0;
        let train_size = (n_samples as f64 * (1.0 - self.config.validation_split)) as usize;
        if train_size == 0 {
            return Err(HarError::TrainingError(format!(
                "validation split {} leaves no training samples out of {}",
                self.config.validation_split, n_samples
            )));
        }

        let x_train = x.slice(s![..train_size, .., ..]).to_owned();
        let y_train = y.slice(s![..train_size]).to_owned();
        let validation = (train_size < n_samples).then(|| {
            (
                x.slice(s![train_size.., .., ..]).to_owned(),
                y.slice(s![train_size..]).to_owned(),
            )
        });

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        info!(
            train_samples = train_size,
            val_samples = n_samples - train_size,
            epochs = self.config.epochs,
            batch_size = self.config.batch_size,
            params = self.network.n_params(),
            "Starting training"
        );

        let mut indices: Vec<usize> = (0..train_size).collect();
        for epoch in 1..=self.config.epochs {
            let start = Instant::now();
            indices.shuffle(&mut rng);

            let mut loss_sum = 0.0;
            let mut correct = 0.0;
            for batch in indices.chunks(self.config.batch_size) {
                let x_batch = x_train.select(Axis(0), batch);
                let y_batch: Vec<u8> = batch.iter().map(|&i| y_train[i]).collect();

                let (probs, cache) = self.network.forward_train(&x_batch, &mut rng)?;
                let (loss, acc) = loss_and_accuracy(&probs, &y_batch);
                if !loss.is_finite() {
                    return Err(HarError::TrainingError(format!("loss diverged at epoch {}", epoch)));
                }
                loss_sum += loss * batch.len() as f64;
                correct += acc * batch.len() as f64;

                let grads = self.network.backward(&cache, &probs, &y_batch)?;
                self.optimizer.step(self.network.parameters_mut(), grads.views())?;
            }

            let (val_loss, val_accuracy) = match &validation {
                Some((x_val, y_val)) => {
                    let eval = self.evaluate(x_val, y_val)?;
                    (Some(eval.loss), Some(eval.accuracy))
                }
                None => (None, None),
            };

            let metrics = EpochMetrics {
                epoch,
                loss: loss_sum / train_size as f64,
                accuracy: correct / train_size as f64,
                val_loss,
                val_accuracy,
                duration_ms: start.elapsed().as_millis() as u64,
            };
            info!(
                epoch,
                loss = metrics.loss,
                accuracy = metrics.accuracy,
                val_loss = ?metrics.val_loss,
                val_accuracy = ?metrics.val_accuracy,
                duration_ms = metrics.duration_ms,
                "Epoch complete"
            );
            self.history.epochs.push(metrics);
        }

        self.is_fitted = true;
        Ok(&self.history)
    }

    /// Loss and accuracy of the current network on a labelled set
    pub fn evaluate(&self, x: &Array3<f32>, y: &Array1<u8>) -> Result<Evaluation> {
        evaluate(&self.network, x, y, self.config.batch_size)
    }

    fn check_data(&self, x: &Array3<f32>, y: &Array1<u8>) -> Result<()> {
        let (n, steps, features) = x.dim();
        if n != y.len() {
            return Err(HarError::shape(n, y.len()));
        }
        if n == 0 {
            return Err(HarError::TrainingError("no training samples".to_string()));
        }
        if (steps, features) != self.network.input_shape() {
            return Err(HarError::shape(self.network.input_shape(), (steps, features)));
        }
        check_labels(y, self.network.n_classes())
    }
}

fn check_labels(y: &Array1<u8>, n_classes: usize) -> Result<()> {
    if let Some(&bad) = y.iter().find(|&&label| label as usize >= n_classes) {
        return Err(HarError::InvalidInput(format!("label {} out of range 0..{}", bad, n_classes)));
    }
    Ok(())
}

/// Batched probabilities for a whole set; batches run in parallel
pub fn predict_proba(network: &HarNetwork, x: &Array3<f32>, batch_size: usize) -> Result<Array2<f32>> {
    let n = x.dim().0;
    let batch_size = batch_size.max(1);
    let starts: Vec<usize> = (0..n).step_by(batch_size).collect();

    let parts = starts
        .par_iter()
        .map(|&start| {
            let end = (start + batch_size).min(n);
            network.forward(&x.slice(s![start..end, .., ..]).to_owned())
        })
        .collect::<Result<Vec<_>>>()?;

    if parts.is_empty() {
        return Ok(Array2::zeros((0, network.n_classes())));
    }
    let views: Vec<_> = parts.iter().map(|p| p.view()).collect();
    Ok(ndarray::concatenate(Axis(0), &views)?)
}

/// Loss and accuracy of `network` on a labelled set
pub fn evaluate(network: &HarNetwork, x: &Array3<f32>, y: &Array1<u8>, batch_size: usize) -> Result<Evaluation> {
    if x.dim().0 != y.len() {
        return Err(HarError::shape(x.dim().0, y.len()));
    }
    check_labels(y, network.n_classes())?;
    let start = Instant::now();
    let probs = predict_proba(network, x, batch_size)?;
    let labels = y.to_vec();
    let (loss, accuracy) = loss_and_accuracy(&probs, &labels);
    debug!(
        samples = y.len(),
        loss,
        accuracy,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Evaluated"
    );
    Ok(Evaluation { loss, accuracy, n_samples: y.len() })
}
