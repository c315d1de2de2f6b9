//! Model training
//!
//! Fits the recurrent classifier with sparse categorical cross-entropy:
//! - Adam optimizer over every parameter tensor
//! - Shuffled mini-batches and a trailing validation split
//! - Inference-only checkpoints

mod checkpoint;
mod config;
mod engine;
mod optimizer;

pub use checkpoint::{TrainedModel, CHECKPOINT_FILE};
pub use config::TrainingConfig;
pub use engine::{evaluate, predict_proba, EpochMetrics, Evaluation, Trainer, TrainingHistory};
pub use optimizer::Adam;
